use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ShiftDefinition {
    #[schema(example = 3)]
    pub shift_id: u64,
    #[schema(example = "Night")]
    pub shift_name: String,
    #[schema(example = "22:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "06:00:00", value_type = String)]
    pub end_time: NaiveTime,
    pub is_night_shift: bool,
    #[schema(example = 30)]
    pub break_minutes: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct ShiftAssignment {
    pub id: u64,
    pub employee_id: u64,
    pub shift_id: u64,
    #[schema(value_type = String, format = "date")]
    pub effective_from: NaiveDate,
    #[schema(value_type = Option<String>, format = "date")]
    pub effective_to: Option<NaiveDate>,
}

/// Date on which the currently open assignment must be closed so that a new
/// one starting `effective_from` does not overlap it.
pub fn closing_date_for(
    open: Option<&ShiftAssignment>,
    effective_from: NaiveDate,
) -> Result<Option<NaiveDate>, &'static str> {
    let Some(open) = open else {
        return Ok(None);
    };
    if effective_from <= open.effective_from {
        return Err("effective_from must be after the current assignment's effective_from");
    }
    effective_from
        .checked_sub_days(Days::new(1))
        .map(Some)
        .ok_or("effective_from out of range")
}
