use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Attendance rules. Rows form an append-only history; the one with the latest
/// `created_at` on or before a date governs that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendancePolicy {
    #[schema(example = 10)]
    pub late_grace_minutes: i64,
    #[schema(example = 10)]
    pub early_exit_grace_minutes: i64,
    /// How long before shift start a punch still belongs to that shift.
    #[schema(example = 0)]
    pub early_checkin_grace_minutes: i64,
    /// How long after shift end a punch still belongs to that shift.
    #[schema(example = 240)]
    pub late_checkout_grace_minutes: i64,
    #[schema(example = 0.75)]
    pub full_day_fraction: f64,
    #[schema(example = 0.5)]
    pub half_day_fraction: f64,
    #[schema(example = true)]
    pub night_shift_enabled: bool,
    #[schema(example = true)]
    pub overtime_enabled: bool,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            late_grace_minutes: 10,
            early_exit_grace_minutes: 10,
            early_checkin_grace_minutes: 0,
            late_checkout_grace_minutes: 240,
            full_day_fraction: 0.75,
            half_day_fraction: 0.5,
            night_shift_enabled: true,
            overtime_enabled: true,
        }
    }
}

impl AttendancePolicy {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.late_grace_minutes < 0
            || self.early_exit_grace_minutes < 0
            || self.early_checkin_grace_minutes < 0
            || self.late_checkout_grace_minutes < 0
        {
            return Err("grace minutes must not be negative");
        }
        if !(0.0..=1.0).contains(&self.full_day_fraction)
            || !(0.0..=1.0).contains(&self.half_day_fraction)
        {
            return Err("day fractions must be between 0 and 1");
        }
        if self.half_day_fraction > self.full_day_fraction {
            return Err("half_day_fraction cannot exceed full_day_fraction");
        }
        Ok(())
    }
}

/// A stored attendance policy version.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendancePolicyVersion {
    pub id: u64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub policy: AttendancePolicy,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

/// Payroll rules. Only the active row is ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PayrollPolicy {
    #[schema(example = 10)]
    pub late_grace_minutes: i64,
    #[schema(example = 120)]
    pub late_lop_threshold_minutes: i64,
    #[schema(example = 10)]
    pub early_exit_grace_minutes: i64,
    #[schema(example = 120)]
    pub early_exit_lop_threshold_minutes: i64,
    #[schema(example = true)]
    pub overtime_enabled: bool,
    #[schema(example = 1.5)]
    pub overtime_multiplier: f64,
    #[schema(example = true)]
    pub holiday_double_pay: bool,
    #[schema(example = false)]
    pub weekend_paid_only_if_worked: bool,
    #[schema(example = 200.0)]
    pub night_shift_allowance: f64,
}

impl PayrollPolicy {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.late_grace_minutes < 0
            || self.late_lop_threshold_minutes < 0
            || self.early_exit_grace_minutes < 0
            || self.early_exit_lop_threshold_minutes < 0
        {
            return Err("minute thresholds must not be negative");
        }
        if self.overtime_multiplier < 0.0 || self.night_shift_allowance < 0.0 {
            return Err("overtime_multiplier and night_shift_allowance must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PayrollPolicyVersion {
    pub id: u64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub policy: PayrollPolicy,
    pub active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        let policy = AttendancePolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.early_checkin_grace_minutes, 0);
        assert_eq!(policy.late_checkout_grace_minutes, 240);
    }

    #[test]
    fn rejects_inverted_fractions() {
        let policy = AttendancePolicy {
            full_day_fraction: 0.5,
            half_day_fraction: 0.6,
            ..AttendancePolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err("half_day_fraction cannot exceed full_day_fraction")
        );
    }
}
