use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

/// Monthly salary components of an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryStructure {
    pub basic: f64,
    pub hra: f64,
    pub allowances: f64,
    pub deductions: f64,
}

impl SalaryStructure {
    /// 50/40/10 split used when only a flat base salary is on file.
    pub fn from_base_salary(base_salary: f64) -> Self {
        Self {
            basic: base_salary * 0.5,
            hra: base_salary * 0.4,
            allowances: base_salary * 0.1,
            deductions: 0.0,
        }
    }

    pub fn gross_monthly(&self) -> f64 {
        self.basic + self.hra + self.allowances
    }
}

/// Aggregate over one employee's attendance rows for a payroll period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub working_days: i64,
    pub paid_days: i64,
    pub lop_days_from_absence: i64,
    pub total_net_hours: f64,
    pub total_late_minutes: i64,
    pub total_early_minutes: i64,
    pub total_overtime_minutes: i64,
    pub holiday_count: i64,
    pub night_shift_days: i64,
}

impl AttendanceSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        records
            .iter()
            .map(|r| &r.attendance)
            .fold(Self::default(), |mut acc, day| {
                if !day.is_weekend {
                    acc.working_days += 1;
                    if day.status.counts_as_paid() {
                        acc.paid_days += 1;
                    } else {
                        acc.lop_days_from_absence += 1;
                    }
                }
                acc.total_net_hours += day.net_hours;
                acc.total_late_minutes += day.late_minutes;
                acc.total_early_minutes += day.early_exit_minutes;
                acc.total_overtime_minutes += day.overtime_minutes;
                if day.is_holiday {
                    acc.holiday_count += 1;
                }
                if day.is_night_shift {
                    acc.night_shift_days += 1;
                }
                acc
            })
    }
}

/// Computed payroll amounts for one employee and month.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollFigures {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub working_days: i64,
    pub present_days: i64,
    pub total_hours: f64,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub basic_pay: f64,
    pub hra_pay: f64,
    pub allowances_pay: f64,
    pub overtime_hours: f64,
    pub overtime_pay: f64,
    pub lop_days: f64,
    pub lop_deduction: f64,
    pub late_penalty: f64,
    pub early_penalty: f64,
    pub holiday_pay: f64,
    pub night_shift_allowance: f64,
    pub is_finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollRecord {
    pub payroll_id: u64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub figures: PayrollFigures,
    #[schema(value_type = String, format = "date-time")]
    pub generated_at: NaiveDateTime,
}

/// First and last calendar day of a month.
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_range_handles_december_and_leap_years() {
        assert_eq!(
            month_range(2025, 12),
            Some((
                NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
            ))
        );
        assert_eq!(
            month_range(2028, 2).map(|(_, last)| last),
            NaiveDate::from_ymd_opt(2028, 2, 29)
        );
        assert_eq!(month_range(2026, 13), None);
    }

    #[test]
    fn flat_salary_split() {
        let s = SalaryStructure::from_base_salary(1000.0);
        assert_eq!((s.basic, s.hra, s.allowances, s.deductions), (500.0, 400.0, 100.0, 0.0));
        assert_eq!(s.gross_monthly(), 1000.0);
    }
}
