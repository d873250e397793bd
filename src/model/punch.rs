use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::StoreError;

/// Kind of a raw attendance punch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    CheckIn,
    CheckOut,
    BreakStart,
    BreakEnd,
}

/// Where a punch came from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PunchSource {
    #[default]
    Manual,
    Device,
    Biometric,
}

/// Immutable punch fact, ordered by `event_time` within an employee.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PunchEvent {
    #[schema(example = 1)]
    pub event_id: u64,
    #[schema(example = 1001)]
    pub employee_id: u64,
    pub kind: EventKind,
    #[schema(example = "2026-01-05T09:02:11", value_type = String, format = "date-time")]
    pub event_time: NaiveDateTime,
    pub source: PunchSource,
    #[schema(value_type = Object, nullable = true)]
    pub meta: Option<Value>,
}

/// A punch that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewPunchEvent {
    pub employee_id: u64,
    pub kind: EventKind,
    pub event_time: NaiveDateTime,
    pub source: PunchSource,
    pub meta: Option<Value>,
}

/// `attendance_events` row as stored.
#[derive(Debug, sqlx::FromRow)]
pub struct PunchEventRow {
    pub event_id: u64,
    pub employee_id: u64,
    pub event_type: String,
    pub event_time: NaiveDateTime,
    pub source: String,
    pub meta: Option<Json<Value>>,
}

impl TryFrom<PunchEventRow> for PunchEvent {
    type Error = StoreError;

    fn try_from(row: PunchEventRow) -> Result<Self, Self::Error> {
        let kind = EventKind::from_str(&row.event_type).map_err(|_| StoreError::Decode {
            column: "attendance_events.event_type",
            value: row.event_type.clone(),
        })?;
        let source = PunchSource::from_str(&row.source).map_err(|_| StoreError::Decode {
            column: "attendance_events.source",
            value: row.source.clone(),
        })?;

        Ok(PunchEvent {
            event_id: row.event_id,
            employee_id: row.employee_id,
            kind,
            event_time: row.event_time,
            source,
            meta: row.meta.map(|Json(v)| v),
        })
    }
}
