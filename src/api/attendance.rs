use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::error::AttendanceError;
use crate::model::attendance::AttendanceRecord;
use crate::model::punch::PunchSource;
use crate::service::attendance::PunchReceipt;

use super::AttendanceSvc;

#[derive(Deserialize, ToSchema)]
pub struct PunchRequest {
    #[schema(example = 1001)]
    pub employee_id: u64,
    pub source: Option<PunchSource>,
    #[schema(value_type = Object, nullable = true)]
    pub meta: Option<Value>,
}

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    #[param(value_type = String, format = "date", example = "2026-01-05")]
    pub date: NaiveDate,
}

fn log_failure(err: &AttendanceError) {
    if let AttendanceError::Store(e) = err {
        tracing::error!(error = %e, "Attendance store failure");
    }
}

fn punch_response(
    result: Result<PunchReceipt, AttendanceError>,
) -> Result<HttpResponse, AttendanceError> {
    let receipt = result.inspect_err(log_failure)?;
    Ok(HttpResponse::Ok().json(receipt))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Punch recorded", body = PunchReceipt),
        (status = 400, description = "Already checked in", body = Object, example = json!({
            "message": "Employee already checked in for this session."
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    service: AttendanceSvc,
    body: web::Json<PunchRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let PunchRequest { employee_id, source, meta } = body.into_inner();
    punch_response(
        service
            .check_in(employee_id, source.unwrap_or_default(), meta)
            .await,
    )
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Punch recorded", body = PunchReceipt),
        (status = 400, description = "No active check-in", body = Object, example = json!({
            "message": "No active check-in for this session."
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    service: AttendanceSvc,
    body: web::Json<PunchRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let PunchRequest { employee_id, source, meta } = body.into_inner();
    punch_response(
        service
            .check_out(employee_id, source.unwrap_or_default(), meta)
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/api/attendance/break/start",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Break started", body = PunchReceipt),
        (status = 400, description = "Not checked in or break already running"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn break_start(
    service: AttendanceSvc,
    body: web::Json<PunchRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let PunchRequest { employee_id, source, meta } = body.into_inner();
    punch_response(
        service
            .break_start(employee_id, source.unwrap_or_default(), meta)
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/api/attendance/break/end",
    request_body = PunchRequest,
    responses(
        (status = 200, description = "Break ended", body = PunchReceipt),
        (status = 400, description = "No active break"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn break_end(
    service: AttendanceSvc,
    body: web::Json<PunchRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let PunchRequest { employee_id, source, meta } = body.into_inner();
    punch_response(
        service
            .break_end(employee_id, source.unwrap_or_default(), meta)
            .await,
    )
}

/// Re-derive one day from its stored punches
#[utoipa::path(
    post,
    path = "/api/attendance/recalculate/{employee_id}",
    params(
        ("employee_id", description = "Employee ID"),
        DateQuery
    ),
    responses(
        (status = 200, description = "Day recomputed", body = AttendanceRecord),
        (status = 423, description = "Day is locked for payroll", body = Object, example = json!({
            "message": "Attendance for employee 1001 on 2026-01-05 is locked for payroll."
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn recalculate(
    service: AttendanceSvc,
    path: web::Path<u64>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let record = service
        .recalculate_for_date(path.into_inner(), query.date)
        .await
        .inspect_err(log_failure)?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    post,
    path = "/api/attendance/lock/{employee_id}",
    params(
        ("employee_id", description = "Employee ID"),
        DateQuery
    ),
    responses(
        (status = 200, description = "Day locked"),
        (status = 404, description = "No attendance record for that day")
    ),
    tag = "Attendance"
)]
pub async fn lock_day(
    service: AttendanceSvc,
    path: web::Path<u64>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = path.into_inner();
    let found = service
        .lock_day(employee_id, query.date)
        .await
        .inspect_err(log_failure)?;
    Ok(lock_response(found, "Attendance locked"))
}

#[utoipa::path(
    post,
    path = "/api/attendance/unlock/{employee_id}",
    params(
        ("employee_id", description = "Employee ID"),
        DateQuery
    ),
    responses(
        (status = 200, description = "Day unlocked"),
        (status = 404, description = "No attendance record for that day")
    ),
    tag = "Attendance"
)]
pub async fn unlock_day(
    service: AttendanceSvc,
    path: web::Path<u64>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = path.into_inner();
    let found = service
        .unlock_day(employee_id, query.date)
        .await
        .inspect_err(log_failure)?;
    Ok(lock_response(found, "Attendance unlocked"))
}

fn lock_response(found: bool, message: &str) -> HttpResponse {
    if found {
        HttpResponse::Ok().json(serde_json::json!({ "message": message }))
    } else {
        HttpResponse::NotFound().json(serde_json::json!({
            "message": "Attendance record not found"
        }))
    }
}
