use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::StoreError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
    ShortHours,
    Absent,
    OnLeave,
    Holiday,
    WeekOff,
}

impl AttendanceStatus {
    /// Statuses that count as a paid day when the row is not a weekend.
    pub fn counts_as_paid(self) -> bool {
        !matches!(self, AttendanceStatus::Absent)
    }
}

/// Derived, one-per-employee-per-date attendance summary.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyAttendance {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub shift_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<NaiveDateTime>,
    pub total_hours: f64,
    pub net_hours: f64,
    pub break_minutes: i64,
    pub overtime_minutes: i64,
    pub late_minutes: i64,
    pub early_exit_minutes: i64,
    pub is_late: bool,
    pub is_early_checkout: bool,
    pub is_overtime: bool,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub is_night_shift: bool,
    pub status: AttendanceStatus,
}

/// Stored attendance row including its payroll lock.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[serde(flatten)]
    pub attendance: DailyAttendance,
    pub is_payroll_locked: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub locked_at: Option<NaiveDateTime>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub employee_id: u64,
    pub shift_id: Option<u64>,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub total_hours: f64,
    pub net_hours: f64,
    pub break_minutes: i64,
    pub overtime_minutes: i64,
    pub late_minutes: i64,
    pub early_exit_minutes: i64,
    pub is_late: bool,
    pub is_early_checkout: bool,
    pub is_overtime: bool,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub is_night_shift: bool,
    pub status: String,
    pub is_payroll_locked: bool,
    pub locked_at: Option<NaiveDateTime>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status).map_err(|_| StoreError::Decode {
            column: "attendance.status",
            value: row.status.clone(),
        })?;

        Ok(AttendanceRecord {
            attendance: DailyAttendance {
                employee_id: row.employee_id,
                date: row.date,
                shift_id: row.shift_id,
                check_in: row.check_in,
                check_out: row.check_out,
                total_hours: row.total_hours,
                net_hours: row.net_hours,
                break_minutes: row.break_minutes,
                overtime_minutes: row.overtime_minutes,
                late_minutes: row.late_minutes,
                early_exit_minutes: row.early_exit_minutes,
                is_late: row.is_late,
                is_early_checkout: row.is_early_checkout,
                is_overtime: row.is_overtime,
                is_weekend: row.is_weekend,
                is_holiday: row.is_holiday,
                is_night_shift: row.is_night_shift,
                status,
            },
            is_payroll_locked: row.is_payroll_locked,
            locked_at: row.locked_at,
        })
    }
}
