use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::model::policy::{
    AttendancePolicy, AttendancePolicyVersion, PayrollPolicy, PayrollPolicyVersion,
};

const PAYROLL_POLICY_COLUMNS: &str = r#"
    id, late_grace_minutes, late_lop_threshold_minutes,
    early_exit_grace_minutes, early_exit_lop_threshold_minutes,
    overtime_enabled, overtime_multiplier, holiday_double_pay,
    weekend_paid_only_if_worked, night_shift_allowance, active, created_at
"#;

const ATTENDANCE_POLICY_COLUMNS: &str = r#"
    id, late_grace_minutes, early_exit_grace_minutes,
    early_checkin_grace_minutes, late_checkout_grace_minutes,
    full_day_fraction, half_day_fraction,
    night_shift_enabled, overtime_enabled, created_at
"#;

/// Attendance policy governing today, stored or built in.
#[derive(Serialize, ToSchema)]
pub struct EffectiveAttendancePolicy {
    #[serde(flatten)]
    pub policy: AttendancePolicy,
    /// Absent when the built-in defaults apply.
    pub version_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<NaiveDateTime>,
}

fn internal_error(e: sqlx::Error, what: &'static str) -> actix_web::Error {
    tracing::error!(error = %e, "{what}");
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

#[utoipa::path(
    get,
    path = "/api/settings/payroll-policy",
    responses(
        (status = 200, body = PayrollPolicyVersion),
        (status = 404, description = "No active payroll policy")
    ),
    tag = "Settings"
)]
pub async fn get_payroll_policy(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let sql = format!(
        "SELECT {} FROM payroll_policies WHERE active = TRUE ORDER BY created_at DESC, id DESC LIMIT 1",
        PAYROLL_POLICY_COLUMNS
    );
    let policy = sqlx::query_as::<_, PayrollPolicyVersion>(&sql)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| internal_error(e, "Failed to fetch payroll policy"))?;

    match policy {
        Some(policy) => Ok(HttpResponse::Ok().json(policy)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "No active payroll policy found"
        }))),
    }
}

/// Store a new payroll policy and make it the only active one
#[utoipa::path(
    put,
    path = "/api/settings/payroll-policy",
    request_body = PayrollPolicy,
    responses(
        (status = 200, description = "Policy stored and activated", body = PayrollPolicyVersion),
        (status = 400, description = "Invalid policy values")
    ),
    tag = "Settings"
)]
pub async fn update_payroll_policy(
    pool: web::Data<MySqlPool>,
    payload: web::Json<PayrollPolicy>,
) -> actix_web::Result<impl Responder> {
    if let Err(message) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": message })));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| internal_error(e, "Failed to open transaction"))?;

    sqlx::query("UPDATE payroll_policies SET active = FALSE WHERE active = TRUE")
        .execute(&mut *tx)
        .await
        .map_err(|e| internal_error(e, "Failed to deactivate payroll policies"))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO payroll_policies (
            late_grace_minutes, late_lop_threshold_minutes,
            early_exit_grace_minutes, early_exit_lop_threshold_minutes,
            overtime_enabled, overtime_multiplier, holiday_double_pay,
            weekend_paid_only_if_worked, night_shift_allowance, active
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(payload.late_grace_minutes)
    .bind(payload.late_lop_threshold_minutes)
    .bind(payload.early_exit_grace_minutes)
    .bind(payload.early_exit_lop_threshold_minutes)
    .bind(payload.overtime_enabled)
    .bind(payload.overtime_multiplier)
    .bind(payload.holiday_double_pay)
    .bind(payload.weekend_paid_only_if_worked)
    .bind(payload.night_shift_allowance)
    .execute(&mut *tx)
    .await
    .map_err(|e| internal_error(e, "Failed to insert payroll policy"))?;

    let sql = format!(
        "SELECT {} FROM payroll_policies WHERE id = ?",
        PAYROLL_POLICY_COLUMNS
    );
    let policy = sqlx::query_as::<_, PayrollPolicyVersion>(&sql)
        .bind(inserted.last_insert_id())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| internal_error(e, "Failed to read back payroll policy"))?;

    tx.commit()
        .await
        .map_err(|e| internal_error(e, "Failed to commit payroll policy"))?;

    tracing::info!(policy_id = policy.id, "Payroll policy activated");
    Ok(HttpResponse::Ok().json(policy))
}

#[utoipa::path(
    get,
    path = "/api/settings/attendance-policy",
    responses(
        (status = 200, body = EffectiveAttendancePolicy)
    ),
    tag = "Settings"
)]
pub async fn get_attendance_policy(
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let sql = format!(
        "SELECT {} FROM attendance_policies WHERE created_at <= NOW() ORDER BY created_at DESC, id DESC LIMIT 1",
        ATTENDANCE_POLICY_COLUMNS
    );
    let version = sqlx::query_as::<_, AttendancePolicyVersion>(&sql)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| internal_error(e, "Failed to fetch attendance policy"))?;

    let effective = match version {
        Some(v) => EffectiveAttendancePolicy {
            policy: v.policy,
            version_id: Some(v.id),
            created_at: Some(v.created_at),
        },
        None => EffectiveAttendancePolicy {
            policy: AttendancePolicy::default(),
            version_id: None,
            created_at: None,
        },
    };

    Ok(HttpResponse::Ok().json(effective))
}

/// Append a new attendance policy version. Earlier dates keep the version
/// that governed them.
#[utoipa::path(
    post,
    path = "/api/settings/attendance-policy",
    request_body = AttendancePolicy,
    responses(
        (status = 201, description = "Policy version stored", body = AttendancePolicyVersion),
        (status = 400, description = "Invalid policy values")
    ),
    tag = "Settings"
)]
pub async fn create_attendance_policy(
    pool: web::Data<MySqlPool>,
    payload: web::Json<AttendancePolicy>,
) -> actix_web::Result<impl Responder> {
    if let Err(message) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": message })));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO attendance_policies (
            late_grace_minutes, early_exit_grace_minutes,
            early_checkin_grace_minutes, late_checkout_grace_minutes,
            full_day_fraction, half_day_fraction,
            night_shift_enabled, overtime_enabled
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.late_grace_minutes)
    .bind(payload.early_exit_grace_minutes)
    .bind(payload.early_checkin_grace_minutes)
    .bind(payload.late_checkout_grace_minutes)
    .bind(payload.full_day_fraction)
    .bind(payload.half_day_fraction)
    .bind(payload.night_shift_enabled)
    .bind(payload.overtime_enabled)
    .execute(pool.get_ref())
    .await
    .map_err(|e| internal_error(e, "Failed to insert attendance policy"))?;

    let sql = format!(
        "SELECT {} FROM attendance_policies WHERE id = ?",
        ATTENDANCE_POLICY_COLUMNS
    );
    let version = sqlx::query_as::<_, AttendancePolicyVersion>(&sql)
        .bind(inserted.last_insert_id())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| internal_error(e, "Failed to read back attendance policy"))?;

    tracing::info!(policy_id = version.id, "Attendance policy version added");
    Ok(HttpResponse::Created().json(version))
}
