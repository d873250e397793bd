use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::engine::round2;
use super::policy_resolver::resolve_payroll_policy;
use crate::error::PayrollError;
use crate::model::payroll::{
    AttendanceSummary, PayrollFigures, PayrollRecord, SalaryStructure, month_range,
};
use crate::model::policy::PayrollPolicy;
use crate::store::PayrollStore;

const HOURS_PER_WORKING_DAY: f64 = 8.0;
const THRESHOLD_LOP_DAYS: f64 = 0.5;

/// Intermediate amounts behind a payroll row.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollBreakdown {
    pub per_day_salary: f64,
    pub hourly_rate: f64,
    pub deductions: f64,
    pub excess_late_minutes: i64,
    pub excess_early_minutes: i64,
    pub threshold_lop_days: f64,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayrollOutcome {
    pub payroll: PayrollRecord,
    pub breakdown: Option<PayrollBreakdown>,
    pub policy: PayrollPolicy,
    /// Set when the row was written without a computation.
    pub reason: Option<String>,
}

/// One employee's result within a bulk run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkPayrollEntry {
    pub employee_id: u64,
    pub success: bool,
    pub net_salary: Option<f64>,
    pub error: Option<String>,
}

/// Payroll figures from a month summary. Returns `None` for the breakdown when
/// the month has no working days.
pub fn compute_payroll(
    employee_id: u64,
    year: i32,
    month: u32,
    policy: &PayrollPolicy,
    salary: &SalaryStructure,
    summary: &AttendanceSummary,
) -> (PayrollFigures, Option<PayrollBreakdown>) {
    let gross = salary.gross_monthly();
    let mut figures = PayrollFigures {
        employee_id,
        month,
        year,
        working_days: 0,
        present_days: 0,
        total_hours: 0.0,
        gross_salary: round2(gross),
        net_salary: 0.0,
        basic_pay: round2(salary.basic),
        hra_pay: round2(salary.hra),
        allowances_pay: round2(salary.allowances),
        overtime_hours: 0.0,
        overtime_pay: 0.0,
        lop_days: 0.0,
        lop_deduction: 0.0,
        late_penalty: 0.0,
        early_penalty: 0.0,
        holiday_pay: 0.0,
        night_shift_allowance: 0.0,
        is_finalized: false,
    };

    if summary.working_days <= 0 {
        return (figures, None);
    }

    let working_days = summary.working_days as f64;
    let per_day = gross / working_days;
    let hourly_rate = gross / (working_days * HOURS_PER_WORKING_DAY);

    let excess_late = (summary.total_late_minutes - policy.late_grace_minutes).max(0);
    let excess_early = (summary.total_early_minutes - policy.early_exit_grace_minutes).max(0);
    let threshold_lop_days = if excess_late + excess_early >= policy.late_lop_threshold_minutes {
        THRESHOLD_LOP_DAYS
    } else {
        0.0
    };
    let lop_days = summary.lop_days_from_absence as f64 + threshold_lop_days;
    let lop_amount = lop_days * per_day;

    let (overtime_hours, overtime_pay) = if policy.overtime_enabled {
        let hours = summary.total_overtime_minutes as f64 / 60.0;
        (hours, hours * hourly_rate * policy.overtime_multiplier)
    } else {
        (0.0, 0.0)
    };

    let holiday_pay = if policy.holiday_double_pay {
        summary.holiday_count as f64 * per_day
    } else {
        0.0
    };
    let night_bonus = summary.night_shift_days as f64 * policy.night_shift_allowance;

    let net = gross - salary.deductions - lop_amount + overtime_pay + holiday_pay + night_bonus;

    figures.working_days = summary.working_days;
    figures.present_days = summary.paid_days;
    figures.total_hours = round2(summary.total_net_hours);
    figures.net_salary = round2(net);
    figures.overtime_hours = round2(overtime_hours);
    figures.overtime_pay = round2(overtime_pay);
    figures.lop_days = lop_days;
    figures.lop_deduction = round2(lop_amount);
    figures.late_penalty = excess_late as f64;
    figures.early_penalty = excess_early as f64;
    figures.holiday_pay = round2(holiday_pay);
    figures.night_shift_allowance = round2(night_bonus);

    let breakdown = PayrollBreakdown {
        per_day_salary: round2(per_day),
        hourly_rate: round2(hourly_rate),
        deductions: round2(salary.deductions),
        excess_late_minutes: excess_late,
        excess_early_minutes: excess_early,
        threshold_lop_days,
        summary: summary.clone(),
    };

    (figures, Some(breakdown))
}

pub struct PayrollService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> PayrollService<S>
where
    S: PayrollStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Compute and persist one employee's payroll, then lock the month's
    /// attendance. Configuration problems abort before anything is written.
    #[instrument(skip(self))]
    pub async fn generate_payroll(
        &self,
        employee_id: u64,
        year: i32,
        month: u32,
    ) -> Result<PayrollOutcome, PayrollError> {
        let (first_day, last_day) =
            month_range(year, month).ok_or(PayrollError::InvalidPeriod { year, month })?;

        let policy = resolve_payroll_policy(self.store.as_ref()).await?;
        let salary = self.salary_for(employee_id, first_day).await?;

        let records = self
            .store
            .attendance_between(employee_id, first_day, last_day)
            .await?;
        let summary = AttendanceSummary::from_records(&records);

        let (figures, breakdown) =
            compute_payroll(employee_id, year, month, &policy, &salary, &summary);

        let (lock_period, reason) = if breakdown.is_some() {
            (Some((first_day, last_day)), None)
        } else {
            warn!("no working days in period, attendance left unlocked");
            (None, Some("no working days".to_string()))
        };

        let payroll = self.store.save_payroll(&figures, lock_period).await?;
        info!(net_salary = payroll.figures.net_salary, "payroll generated");

        Ok(PayrollOutcome {
            payroll,
            breakdown,
            policy,
            reason,
        })
    }

    /// Run payroll for every active employee. A failing employee is reported
    /// and the batch carries on.
    #[instrument(skip(self))]
    pub async fn generate_bulk(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<BulkPayrollEntry>, PayrollError> {
        if month_range(year, month).is_none() {
            return Err(PayrollError::InvalidPeriod { year, month });
        }

        let employees = self.store.active_employee_ids().await?;
        let mut results = Vec::with_capacity(employees.len());

        for employee_id in employees {
            let entry = match self.generate_payroll(employee_id, year, month).await {
                Ok(outcome) => BulkPayrollEntry {
                    employee_id,
                    success: true,
                    net_salary: Some(outcome.payroll.figures.net_salary),
                    error: None,
                },
                Err(e) => {
                    if matches!(e, PayrollError::Store(_)) {
                        error!(employee_id, error = %e, "payroll failed");
                    } else {
                        warn!(employee_id, error = %e, "payroll skipped");
                    }
                    BulkPayrollEntry {
                        employee_id,
                        success: false,
                        net_salary: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(entry);
        }

        Ok(results)
    }

    async fn salary_for(
        &self,
        employee_id: u64,
        first_day: NaiveDate,
    ) -> Result<SalaryStructure, PayrollError> {
        if let Some(salary) = self.store.salary_structure_for(employee_id, first_day).await? {
            return Ok(salary);
        }
        self.store
            .base_salary(employee_id)
            .await?
            .map(SalaryStructure::from_base_salary)
            .ok_or(PayrollError::NoSalary { employee_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceRecord, AttendanceStatus, DailyAttendance};
    use crate::store::memory::MemoryStore;
    use crate::store::{AttendanceStore, PayrollStore};
    use chrono::{Datelike, Weekday};

    fn policy() -> PayrollPolicy {
        PayrollPolicy {
            late_grace_minutes: 10,
            late_lop_threshold_minutes: 120,
            early_exit_grace_minutes: 10,
            early_exit_lop_threshold_minutes: 120,
            overtime_enabled: true,
            overtime_multiplier: 1.5,
            holiday_double_pay: true,
            weekend_paid_only_if_worked: false,
            night_shift_allowance: 200.0,
        }
    }

    fn salary(gross: f64) -> SalaryStructure {
        SalaryStructure {
            basic: gross * 0.5,
            hra: gross * 0.3,
            allowances: gross * 0.2,
            deductions: 0.0,
        }
    }

    fn summary(working: i64, absent: i64) -> AttendanceSummary {
        AttendanceSummary {
            working_days: working,
            paid_days: working - absent,
            lop_days_from_absence: absent,
            ..AttendanceSummary::default()
        }
    }

    fn day(date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            attendance: DailyAttendance {
                employee_id: 1,
                date,
                shift_id: Some(1),
                check_in: None,
                check_out: None,
                total_hours: 0.0,
                net_hours: if status == AttendanceStatus::Present { 8.0 } else { 0.0 },
                break_minutes: 0,
                overtime_minutes: 0,
                late_minutes: 0,
                early_exit_minutes: 0,
                is_late: false,
                is_early_checkout: false,
                is_overtime: false,
                is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                is_holiday: false,
                is_night_shift: false,
                status,
            },
            is_payroll_locked: false,
            locked_at: None,
        }
    }

    /// February 2026 has 20 weekdays; the first `absent` of them are absences.
    fn seed_february(store: &MemoryStore, absent: usize) {
        let (first, last) = month_range(2026, 2).unwrap();
        let mut weekday_index = 0;
        for date in first.iter_days().take_while(|d| *d <= last) {
            let record = if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                day(date, AttendanceStatus::WeekOff)
            } else {
                weekday_index += 1;
                if weekday_index <= absent {
                    day(date, AttendanceStatus::Absent)
                } else {
                    day(date, AttendanceStatus::Present)
                }
            };
            store.put_attendance(record);
        }
    }

    #[test]
    fn absences_become_lop_days() {
        let (figures, breakdown) =
            compute_payroll(1, 2026, 3, &policy(), &salary(26_000.0), &summary(26, 6));

        assert_eq!(breakdown.unwrap().per_day_salary, 1000.0);
        assert_eq!(figures.present_days, 20);
        assert_eq!(figures.lop_days, 6.0);
        assert_eq!(figures.lop_deduction, 6000.0);
        assert_eq!(figures.net_salary, 20_000.0);
    }

    #[test]
    fn late_and_early_minutes_past_threshold_cost_half_a_day() {
        let mut s = summary(20, 0);
        s.total_late_minutes = 100;
        s.total_early_minutes = 40;
        let (figures, breakdown) =
            compute_payroll(1, 2026, 3, &policy(), &salary(20_000.0), &s);

        // (100 - 10) + (40 - 10) = 120 reaches the threshold.
        let breakdown = breakdown.unwrap();
        assert_eq!(breakdown.threshold_lop_days, 0.5);
        assert_eq!(figures.late_penalty, 90.0);
        assert_eq!(figures.early_penalty, 30.0);
        assert_eq!(figures.lop_deduction, 500.0);
        assert_eq!(figures.net_salary, 19_500.0);

        s.total_early_minutes = 39;
        let (figures, _) = compute_payroll(1, 2026, 3, &policy(), &salary(20_000.0), &s);
        assert_eq!(figures.lop_days, 0.0);
    }

    #[test]
    fn overtime_holiday_and_night_shifts_are_paid() {
        let mut s = summary(20, 0);
        s.total_overtime_minutes = 120;
        s.holiday_count = 1;
        s.night_shift_days = 3;
        let (figures, _) = compute_payroll(1, 2026, 3, &policy(), &salary(16_000.0), &s);

        // hourly = 16000 / 160 = 100, two hours at 1.5x.
        assert_eq!(figures.overtime_hours, 2.0);
        assert_eq!(figures.overtime_pay, 300.0);
        assert_eq!(figures.holiday_pay, 800.0);
        assert_eq!(figures.night_shift_allowance, 600.0);
        assert_eq!(figures.net_salary, 16_000.0 + 300.0 + 800.0 + 600.0);

        let plain = PayrollPolicy {
            overtime_enabled: false,
            holiday_double_pay: false,
            ..policy()
        };
        let (figures, _) = compute_payroll(1, 2026, 3, &plain, &salary(16_000.0), &s);
        assert_eq!(figures.overtime_pay, 0.0);
        assert_eq!(figures.holiday_pay, 0.0);
    }

    #[test]
    fn fixed_deductions_reduce_net() {
        let structure = SalaryStructure {
            deductions: 1_500.0,
            ..salary(20_000.0)
        };
        let (figures, _) = compute_payroll(1, 2026, 3, &policy(), &structure, &summary(20, 0));
        assert_eq!(figures.net_salary, 18_500.0);
    }

    #[test]
    fn zero_working_days_keeps_only_salary_components() {
        let (figures, breakdown) =
            compute_payroll(1, 2026, 3, &policy(), &salary(10_000.0), &summary(0, 0));
        assert!(breakdown.is_none());
        assert_eq!(figures.gross_salary, 10_000.0);
        assert_eq!(figures.basic_pay, 5_000.0);
        assert_eq!(figures.net_salary, 0.0);
        assert_eq!(figures.lop_deduction, 0.0);
    }

    #[actix_web::test]
    async fn generation_persists_and_locks_the_month() {
        let store = Arc::new(MemoryStore::new());
        store.set_payroll_policy(policy());
        store.set_salary(1, salary(20_000.0));
        seed_february(&store, 4);
        let svc = PayrollService::new(store.clone());

        let outcome = svc.generate_payroll(1, 2026, 2).await.unwrap();
        assert_eq!(outcome.payroll.figures.working_days, 20);
        assert_eq!(outcome.payroll.figures.lop_days, 4.0);
        assert_eq!(outcome.payroll.figures.net_salary, 16_000.0);
        assert!(outcome.reason.is_none());

        let (first, last) = month_range(2026, 2).unwrap();
        let rows = store.attendance_between(1, first, last).await.unwrap();
        assert_eq!(rows.len(), 28);
        assert!(rows.iter().all(|r| r.is_payroll_locked));

        // Regenerating overwrites the same row.
        svc.generate_payroll(1, 2026, 2).await.unwrap();
        assert_eq!(store.payroll_rows(), 1);
    }

    #[actix_web::test]
    async fn base_salary_is_split_when_no_structure_exists() {
        let store = Arc::new(MemoryStore::new());
        store.set_payroll_policy(policy());
        store.set_base_salary(1, 30_000.0);
        seed_february(&store, 0);
        let svc = PayrollService::new(store.clone());

        let outcome = svc.generate_payroll(1, 2026, 2).await.unwrap();
        assert_eq!(outcome.payroll.figures.basic_pay, 15_000.0);
        assert_eq!(outcome.payroll.figures.hra_pay, 12_000.0);
        assert_eq!(outcome.payroll.figures.allowances_pay, 3_000.0);
    }

    #[actix_web::test]
    async fn configuration_errors_persist_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed_february(&store, 0);
        let svc = PayrollService::new(store.clone());

        let err = svc.generate_payroll(1, 2026, 2).await.unwrap_err();
        assert!(matches!(err, PayrollError::NoActivePolicy));

        store.set_payroll_policy(policy());
        let err = svc.generate_payroll(1, 2026, 2).await.unwrap_err();
        assert!(matches!(err, PayrollError::NoSalary { employee_id: 1 }));

        let err = svc.generate_payroll(1, 2026, 13).await.unwrap_err();
        assert!(matches!(err, PayrollError::InvalidPeriod { month: 13, .. }));

        assert_eq!(store.payroll_rows(), 0);
        let day = store
            .attendance_for(1, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!day.is_payroll_locked);
    }

    #[actix_web::test]
    async fn empty_month_is_saved_unlocked_with_reason() {
        let store = Arc::new(MemoryStore::new());
        store.set_payroll_policy(policy());
        store.set_salary(1, salary(10_000.0));
        let svc = PayrollService::new(store.clone());

        let outcome = svc.generate_payroll(1, 2026, 2).await.unwrap();
        assert_eq!(outcome.reason.as_deref(), Some("no working days"));
        assert_eq!(outcome.payroll.figures.gross_salary, 10_000.0);
        assert_eq!(store.payroll_rows(), 1);
    }

    #[actix_web::test]
    async fn bulk_run_reports_each_employee() {
        let store = Arc::new(MemoryStore::new());
        store.set_payroll_policy(policy());
        store.add_employee(1);
        store.add_employee(2);
        store.set_salary(1, salary(20_000.0));
        seed_february(&store, 0);
        let svc = PayrollService::new(store.clone());

        let results = svc.generate_bulk(2026, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert_eq!(results[0].net_salary, Some(20_000.0));
        assert!(!results[1].success);
        assert_eq!(
            results[1].error.as_deref(),
            Some("No salary found for employee_id=2")
        );

        assert!(matches!(
            svc.generate_bulk(2026, 0).await,
            Err(PayrollError::InvalidPeriod { .. })
        ));
    }
}
