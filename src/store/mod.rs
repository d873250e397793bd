//! Storage seams for the attendance and payroll pipeline.
//!
//! The services only talk to these traits, so the MySQL store can be swapped
//! for the in-memory one in tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, DailyAttendance};
use crate::model::payroll::{PayrollFigures, PayrollRecord, SalaryStructure};
use crate::model::policy::{AttendancePolicy, PayrollPolicy};
use crate::model::punch::{NewPunchEvent, PunchEvent};
use crate::model::shift::ShiftDefinition;

pub mod mysql;

#[cfg(test)]
pub mod memory;

/// Result of a guarded attendance write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    /// The row is payroll-locked and was left untouched.
    Locked,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Shift whose assignment covers `date`, active or not.
    async fn shift_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, StoreError>;

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, StoreError>;

    async fn has_approved_leave(&self, employee_id: u64, date: NaiveDate)
    -> Result<bool, StoreError>;

    /// Latest policy created on or before `as_of`.
    async fn attendance_policy_as_of(
        &self,
        as_of: NaiveDateTime,
    ) -> Result<Option<AttendancePolicy>, StoreError>;

    /// Events with `from <= event_time <= to`, ordered by instant.
    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<PunchEvent>, StoreError>;

    async fn append_event(&self, event: NewPunchEvent) -> Result<PunchEvent, StoreError>;

    /// Insert or overwrite the day's row unless it is payroll-locked. The lock
    /// check and the write happen in the same statement.
    async fn upsert_unless_locked(
        &self,
        attendance: &DailyAttendance,
    ) -> Result<WriteOutcome, StoreError>;

    async fn attendance_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Set or clear the payroll lock of one day. Returns false if no row exists.
    async fn set_day_lock(
        &self,
        employee_id: u64,
        date: NaiveDate,
        locked: bool,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn active_payroll_policy(&self) -> Result<Option<PayrollPolicy>, StoreError>;

    async fn salary_structure_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<SalaryStructure>, StoreError>;

    async fn base_salary(&self, employee_id: u64) -> Result<Option<f64>, StoreError>;

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Upsert the payroll row and, when `lock_period` is given, lock every
    /// attendance row of the employee inside it. Both happen atomically.
    async fn save_payroll(
        &self,
        figures: &PayrollFigures,
        lock_period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<PayrollRecord, StoreError>;

    async fn active_employee_ids(&self) -> Result<Vec<u64>, StoreError>;
}
