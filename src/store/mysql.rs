use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use sqlx::types::Json;

use super::{AttendanceStore, PayrollStore, WriteOutcome};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, DailyAttendance};
use crate::model::payroll::{PayrollFigures, PayrollRecord, SalaryStructure};
use crate::model::policy::{AttendancePolicy, PayrollPolicy};
use crate::model::punch::{NewPunchEvent, PunchEvent, PunchEventRow};
use crate::model::shift::ShiftDefinition;

const ATTENDANCE_COLUMNS: &str = r#"
    employee_id, shift_id, date, check_in, check_out,
    total_hours, net_hours, break_minutes, overtime_minutes, late_minutes, early_exit_minutes,
    is_late, is_early_checkout, is_overtime, is_weekend, is_holiday, is_night_shift,
    status, is_payroll_locked, locked_at
"#;

const PAYROLL_COLUMNS: &str = r#"
    payroll_id, employee_id, month, year,
    working_days, present_days, total_hours,
    gross_salary, net_salary, basic_pay, hra_pay, allowances_pay,
    overtime_hours, overtime_pay, lop_days, lop_deduction,
    late_penalty, early_penalty, holiday_pay, night_shift_allowance,
    is_finalized, generated_at
"#;

/// MySQL-backed store used by the running service.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn shift_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, StoreError> {
        // Deactivated shifts still govern the dates they were assigned for.
        let shift = sqlx::query_as::<_, ShiftDefinition>(
            r#"
            SELECT s.shift_id, s.shift_name, s.start_time, s.end_time,
                   s.is_night_shift, s.break_minutes, s.is_active
            FROM employee_shifts es
            JOIN shifts s ON s.shift_id = es.shift_id
            WHERE es.employee_id = ?
              AND es.effective_from <= ?
              AND (es.effective_to IS NULL OR es.effective_to >= ?)
            ORDER BY es.effective_from DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM holidays WHERE holiday_date = ?",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn has_approved_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM leave_requests
            WHERE employee_id = ?
              AND status = 'approved'
              AND start_date <= ?
              AND end_date >= ?
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn attendance_policy_as_of(
        &self,
        as_of: NaiveDateTime,
    ) -> Result<Option<AttendancePolicy>, StoreError> {
        let policy = sqlx::query_as::<_, AttendancePolicy>(
            r#"
            SELECT late_grace_minutes, early_exit_grace_minutes,
                   early_checkin_grace_minutes, late_checkout_grace_minutes,
                   full_day_fraction, half_day_fraction,
                   night_shift_enabled, overtime_enabled
            FROM attendance_policies
            WHERE created_at <= ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(as_of)
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<PunchEvent>, StoreError> {
        let rows = sqlx::query_as::<_, PunchEventRow>(
            r#"
            SELECT event_id, employee_id, event_type, event_time, source, meta
            FROM attendance_events
            WHERE employee_id = ?
              AND event_time BETWEEN ? AND ?
            ORDER BY event_time ASC, event_id ASC
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PunchEvent::try_from).collect()
    }

    async fn append_event(&self, event: NewPunchEvent) -> Result<PunchEvent, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_events (employee_id, event_type, event_time, source, meta)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.employee_id)
        .bind(event.kind.as_ref())
        .bind(event.event_time)
        .bind(event.source.as_ref())
        .bind(event.meta.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(PunchEvent {
            event_id: result.last_insert_id(),
            employee_id: event.employee_id,
            kind: event.kind,
            event_time: event.event_time,
            source: event.source,
            meta: event.meta,
        })
    }

    async fn upsert_unless_locked(
        &self,
        attendance: &DailyAttendance,
    ) -> Result<WriteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Every assignment is guarded by the row's own lock flag, which this
        // statement never touches.
        sqlx::query(
            r#"
            INSERT INTO attendance (
                employee_id, date, shift_id, check_in, check_out,
                total_hours, net_hours, break_minutes, overtime_minutes,
                late_minutes, early_exit_minutes,
                is_late, is_early_checkout, is_overtime,
                is_weekend, is_holiday, is_night_shift, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                shift_id = IF(is_payroll_locked, shift_id, VALUES(shift_id)),
                check_in = IF(is_payroll_locked, check_in, VALUES(check_in)),
                check_out = IF(is_payroll_locked, check_out, VALUES(check_out)),
                total_hours = IF(is_payroll_locked, total_hours, VALUES(total_hours)),
                net_hours = IF(is_payroll_locked, net_hours, VALUES(net_hours)),
                break_minutes = IF(is_payroll_locked, break_minutes, VALUES(break_minutes)),
                overtime_minutes = IF(is_payroll_locked, overtime_minutes, VALUES(overtime_minutes)),
                late_minutes = IF(is_payroll_locked, late_minutes, VALUES(late_minutes)),
                early_exit_minutes = IF(is_payroll_locked, early_exit_minutes, VALUES(early_exit_minutes)),
                is_late = IF(is_payroll_locked, is_late, VALUES(is_late)),
                is_early_checkout = IF(is_payroll_locked, is_early_checkout, VALUES(is_early_checkout)),
                is_overtime = IF(is_payroll_locked, is_overtime, VALUES(is_overtime)),
                is_weekend = IF(is_payroll_locked, is_weekend, VALUES(is_weekend)),
                is_holiday = IF(is_payroll_locked, is_holiday, VALUES(is_holiday)),
                is_night_shift = IF(is_payroll_locked, is_night_shift, VALUES(is_night_shift)),
                status = IF(is_payroll_locked, status, VALUES(status))
            "#,
        )
        .bind(attendance.employee_id)
        .bind(attendance.date)
        .bind(attendance.shift_id)
        .bind(attendance.check_in)
        .bind(attendance.check_out)
        .bind(attendance.total_hours)
        .bind(attendance.net_hours)
        .bind(attendance.break_minutes)
        .bind(attendance.overtime_minutes)
        .bind(attendance.late_minutes)
        .bind(attendance.early_exit_minutes)
        .bind(attendance.is_late)
        .bind(attendance.is_early_checkout)
        .bind(attendance.is_overtime)
        .bind(attendance.is_weekend)
        .bind(attendance.is_holiday)
        .bind(attendance.is_night_shift)
        .bind(attendance.status.as_ref())
        .execute(&mut *tx)
        .await?;

        // The upsert holds the row lock until commit, so this read reflects
        // the flag the write was guarded by.
        let locked = sqlx::query_scalar::<_, bool>(
            "SELECT is_payroll_locked FROM attendance WHERE employee_id = ? AND date = ?",
        )
        .bind(attendance.employee_id)
        .bind(attendance.date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if locked {
            WriteOutcome::Locked
        } else {
            WriteOutcome::Written
        })
    }

    async fn attendance_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
            ATTENDANCE_COLUMNS
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn set_day_lock(
        &self,
        employee_id: u64,
        date: NaiveDate,
        locked: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET is_payroll_locked = ?,
                locked_at = IF(?, NOW(), NULL)
            WHERE employee_id = ? AND date = ? AND is_payroll_locked <> ?
            "#,
        )
        .bind(locked)
        .bind(locked)
        .bind(employee_id)
        .bind(date)
        .bind(locked)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Already in the requested state, or no row at all.
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE employee_id = ? AND date = ?",
        )
        .bind(employee_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

#[async_trait]
impl PayrollStore for MySqlStore {
    async fn active_payroll_policy(&self) -> Result<Option<PayrollPolicy>, StoreError> {
        let policy = sqlx::query_as::<_, PayrollPolicy>(
            r#"
            SELECT late_grace_minutes, late_lop_threshold_minutes,
                   early_exit_grace_minutes, early_exit_lop_threshold_minutes,
                   overtime_enabled, overtime_multiplier,
                   holiday_double_pay, weekend_paid_only_if_worked,
                   night_shift_allowance
            FROM payroll_policies
            WHERE active = TRUE
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn salary_structure_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<SalaryStructure>, StoreError> {
        let salary = sqlx::query_as::<_, SalaryStructure>(
            r#"
            SELECT basic, hra, allowances, deductions
            FROM salary_structure
            WHERE employee_id = ?
              AND effective_from <= ?
              AND (effective_to IS NULL OR effective_to >= ?)
            ORDER BY effective_from DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salary)
    }

    async fn base_salary(&self, employee_id: u64) -> Result<Option<f64>, StoreError> {
        let base = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT base_salary FROM employees WHERE id = ?",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(base.flatten())
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date",
            ATTENDANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn save_payroll(
        &self,
        figures: &PayrollFigures,
        lock_period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<PayrollRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payroll (
                employee_id, month, year,
                working_days, present_days, total_hours,
                gross_salary, net_salary, basic_pay, hra_pay, allowances_pay,
                overtime_hours, overtime_pay, lop_days, lop_deduction,
                late_penalty, early_penalty, holiday_pay, night_shift_allowance,
                is_finalized, generated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NOW())
            ON DUPLICATE KEY UPDATE
                working_days = VALUES(working_days),
                present_days = VALUES(present_days),
                total_hours = VALUES(total_hours),
                gross_salary = VALUES(gross_salary),
                net_salary = VALUES(net_salary),
                basic_pay = VALUES(basic_pay),
                hra_pay = VALUES(hra_pay),
                allowances_pay = VALUES(allowances_pay),
                overtime_hours = VALUES(overtime_hours),
                overtime_pay = VALUES(overtime_pay),
                lop_days = VALUES(lop_days),
                lop_deduction = VALUES(lop_deduction),
                late_penalty = VALUES(late_penalty),
                early_penalty = VALUES(early_penalty),
                holiday_pay = VALUES(holiday_pay),
                night_shift_allowance = VALUES(night_shift_allowance),
                is_finalized = VALUES(is_finalized),
                generated_at = NOW()
            "#,
        )
        .bind(figures.employee_id)
        .bind(figures.month)
        .bind(figures.year)
        .bind(figures.working_days)
        .bind(figures.present_days)
        .bind(figures.total_hours)
        .bind(figures.gross_salary)
        .bind(figures.net_salary)
        .bind(figures.basic_pay)
        .bind(figures.hra_pay)
        .bind(figures.allowances_pay)
        .bind(figures.overtime_hours)
        .bind(figures.overtime_pay)
        .bind(figures.lop_days)
        .bind(figures.lop_deduction)
        .bind(figures.late_penalty)
        .bind(figures.early_penalty)
        .bind(figures.holiday_pay)
        .bind(figures.night_shift_allowance)
        .bind(figures.is_finalized)
        .execute(&mut *tx)
        .await?;

        if let Some((first_day, last_day)) = lock_period {
            sqlx::query(
                r#"
                UPDATE attendance
                SET is_payroll_locked = TRUE, locked_at = NOW()
                WHERE employee_id = ?
                  AND date BETWEEN ? AND ?
                  AND is_payroll_locked = FALSE
                "#,
            )
            .bind(figures.employee_id)
            .bind(first_day)
            .bind(last_day)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            "SELECT {} FROM payroll WHERE employee_id = ? AND month = ? AND year = ?",
            PAYROLL_COLUMNS
        );
        let record = sqlx::query_as::<_, PayrollRecord>(&sql)
            .bind(figures.employee_id)
            .bind(figures.month)
            .bind(figures.year)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn active_employee_ids(&self) -> Result<Vec<u64>, StoreError> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
