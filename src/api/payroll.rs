use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::service::payroll::{BulkPayrollEntry, PayrollOutcome};

use super::PayrollSvc;

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 1)]
    pub month: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateBulkPayroll {
    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 1)]
    pub month: u32,
}

fn log_failure(err: &PayrollError) {
    match err {
        PayrollError::Store(e) => tracing::error!(error = %e, "Payroll store failure"),
        other => tracing::warn!(reason = %other, "Payroll refused"),
    }
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 200, description = "Payroll generated and attendance locked", body = PayrollOutcome),
        (status = 422, description = "Missing policy or salary, or invalid month", body = Object, example = json!({
            "message": "No active payroll policy found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    service: PayrollSvc,
    payload: web::Json<GeneratePayroll>,
) -> Result<HttpResponse, PayrollError> {
    let outcome = service
        .generate_payroll(payload.employee_id, payload.year, payload.month)
        .await
        .inspect_err(log_failure)?;

    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/payroll/generate-bulk",
    request_body = GenerateBulkPayroll,
    responses(
        (status = 200, description = "Per-employee results", body = [BulkPayrollEntry]),
        (status = 422, description = "Invalid month"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payroll"
)]
pub async fn generate_bulk(
    service: PayrollSvc,
    payload: web::Json<GenerateBulkPayroll>,
) -> Result<HttpResponse, PayrollError> {
    let results = service
        .generate_bulk(payload.year, payload.month)
        .await
        .inspect_err(log_failure)?;

    let failed = results.iter().filter(|r| !r.success).count();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "processed": results.len(),
        "failed": failed,
        "results": results,
    })))
}
