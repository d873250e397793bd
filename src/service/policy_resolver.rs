use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::error::PayrollError;
use crate::model::policy::{AttendancePolicy, PayrollPolicy};
use crate::store::{AttendanceStore, PayrollStore};

/// Attendance policy governing `date`. Never fails: a missing history or an
/// unreadable store falls back to the built-in defaults.
pub async fn resolve_attendance_policy<S>(store: &S, date: NaiveDate) -> AttendancePolicy
where
    S: AttendanceStore + ?Sized,
{
    let as_of = date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));

    match store.attendance_policy_as_of(as_of).await {
        Ok(Some(policy)) => policy,
        Ok(None) => {
            debug!(%date, "no attendance policy on record, using defaults");
            AttendancePolicy::default()
        }
        Err(e) => {
            warn!(%date, error = %e, "attendance policy lookup failed, using defaults");
            AttendancePolicy::default()
        }
    }
}

/// The active payroll policy. Unlike attendance, payroll refuses to run
/// without one.
pub async fn resolve_payroll_policy<S>(store: &S) -> Result<PayrollPolicy, PayrollError>
where
    S: PayrollStore + ?Sized,
{
    store
        .active_payroll_policy()
        .await?
        .ok_or(PayrollError::NoActivePolicy)
}
