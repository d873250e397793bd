use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::model::shift::{ShiftAssignment, ShiftDefinition, closing_date_for};

#[derive(Deserialize, ToSchema)]
pub struct CreateShift {
    #[schema(example = "Night")]
    pub shift_name: String,
    #[schema(example = "22:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "06:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = true)]
    pub is_night_shift: Option<bool>,
    #[schema(example = 30)]
    pub break_minutes: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignShift {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = 3)]
    pub shift_id: u64,
    #[schema(example = "2026-02-01", format = "date", value_type = String)]
    pub effective_from: NaiveDate,
}

fn internal_error(e: sqlx::Error, what: &'static str) -> actix_web::Error {
    error!(error = %e, "{what}");
    actix_web::error::ErrorInternalServerError("Internal Server Error")
}

#[utoipa::path(
    post,
    path = "/api/shifts",
    request_body = CreateShift,
    responses(
        (status = 201, description = "Shift created", body = ShiftDefinition),
        (status = 400, description = "Invalid shift times", body = Object, example = json!({
            "message": "start_time and end_time must differ"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shifts"
)]
pub async fn create_shift(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateShift>,
) -> actix_web::Result<impl Responder> {
    if payload.shift_name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "shift_name is required"
        })));
    }
    if payload.start_time == payload.end_time {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_time and end_time must differ"
        })));
    }
    let break_minutes = payload.break_minutes.unwrap_or(0);
    if break_minutes < 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "break_minutes must not be negative"
        })));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO shifts (shift_name, start_time, end_time, is_night_shift, break_minutes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.shift_name.trim())
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.is_night_shift.unwrap_or(false))
    .bind(break_minutes)
    .execute(pool.get_ref())
    .await
    .map_err(|e| internal_error(e, "Failed to create shift"))?;

    let shift = sqlx::query_as::<_, ShiftDefinition>(
        r#"
        SELECT shift_id, shift_name, start_time, end_time, is_night_shift, break_minutes, is_active
        FROM shifts
        WHERE shift_id = ?
        "#,
    )
    .bind(inserted.last_insert_id())
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| internal_error(e, "Failed to read back shift"))?;

    info!(shift_id = shift.shift_id, "Shift created");
    Ok(HttpResponse::Created().json(shift))
}

/// Soft-delete a shift. Dates it was already assigned for keep using it.
#[utoipa::path(
    delete,
    path = "/api/shifts/{shift_id}",
    params(
        ("shift_id", description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift deactivated"),
        (status = 404, description = "Shift not found or already inactive")
    ),
    tag = "Shifts"
)]
pub async fn deactivate_shift(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let shift_id = path.into_inner();

    let result = sqlx::query("UPDATE shifts SET is_active = FALSE WHERE shift_id = ? AND is_active = TRUE")
        .bind(shift_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| internal_error(e, "Failed to deactivate shift"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Shift not found or already inactive"
        })));
    }

    info!(shift_id, "Shift deactivated");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Shift deactivated"
    })))
}

/// Assign a shift from a date on, closing the employee's open assignment the
/// day before.
#[utoipa::path(
    post,
    path = "/api/shifts/assign",
    request_body = AssignShift,
    responses(
        (status = 201, description = "Shift assigned", body = ShiftAssignment),
        (status = 400, description = "Inactive shift or overlapping start date"),
        (status = 404, description = "Shift not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Shifts"
)]
pub async fn assign_shift(
    pool: web::Data<MySqlPool>,
    payload: web::Json<AssignShift>,
) -> actix_web::Result<impl Responder> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| internal_error(e, "Failed to open transaction"))?;

    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM shifts WHERE shift_id = ?")
        .bind(payload.shift_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| internal_error(e, "Failed to fetch shift"))?;

    match active {
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Shift not found"
            })));
        }
        Some(false) => {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": "Shift is inactive"
            })));
        }
        Some(true) => {}
    }

    let open = sqlx::query_as::<_, ShiftAssignment>(
        r#"
        SELECT id, employee_id, shift_id, effective_from, effective_to
        FROM employee_shifts
        WHERE employee_id = ? AND effective_to IS NULL
        ORDER BY effective_from DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(payload.employee_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| internal_error(e, "Failed to fetch open shift assignment"))?;

    let close_on = match closing_date_for(open.as_ref(), payload.effective_from) {
        Ok(date) => date,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
        }
    };

    if let (Some(open), Some(close_on)) = (open.as_ref(), close_on) {
        sqlx::query("UPDATE employee_shifts SET effective_to = ? WHERE id = ?")
            .bind(close_on)
            .bind(open.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| internal_error(e, "Failed to close shift assignment"))?;
    }

    let inserted = sqlx::query(
        "INSERT INTO employee_shifts (employee_id, shift_id, effective_from) VALUES (?, ?, ?)",
    )
    .bind(payload.employee_id)
    .bind(payload.shift_id)
    .bind(payload.effective_from)
    .execute(&mut *tx)
    .await
    .map_err(|e| internal_error(e, "Failed to insert shift assignment"))?;

    let assignment = sqlx::query_as::<_, ShiftAssignment>(
        "SELECT id, employee_id, shift_id, effective_from, effective_to FROM employee_shifts WHERE id = ?",
    )
    .bind(inserted.last_insert_id())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| internal_error(e, "Failed to read back shift assignment"))?;

    tx.commit()
        .await
        .map_err(|e| internal_error(e, "Failed to commit shift assignment"))?;

    info!(
        employee_id = assignment.employee_id,
        shift_id = assignment.shift_id,
        "Shift assigned"
    );
    Ok(HttpResponse::Created().json(assignment))
}
