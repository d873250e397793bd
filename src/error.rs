use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;

/// Failures of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed {column} value '{value}'")]
    Decode { column: &'static str, value: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by punch actions and day recomputation.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Employee already checked in for this session.")]
    AlreadyCheckedIn,
    #[error("No active check-in for this session.")]
    NoActiveCheckIn,
    #[error("Break already running.")]
    BreakAlreadyRunning,
    #[error("No active break to end.")]
    NoActiveBreak,
    #[error("Attendance for employee {employee_id} on {date} is locked for payroll.")]
    AttendanceLocked { employee_id: u64, date: NaiveDate },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::AttendanceLocked { .. } => StatusCode::LOCKED,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Store(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

/// Errors raised by payroll generation. Configuration errors abort before
/// anything is persisted.
#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("No active payroll policy found")]
    NoActivePolicy,
    #[error("No salary found for employee_id={employee_id}")]
    NoSalary { employee_id: u64 },
    #[error("Invalid payroll period {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            PayrollError::Store(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
