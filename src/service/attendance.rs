use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::engine::{CalendarFacts, compute_day};
use super::policy_resolver::resolve_attendance_policy;
use super::session::SessionState;
use super::shift_window::{
    DayFrame, SessionScope, ShiftWindow, attribution_date, day_boundary, punch_range,
};
use crate::error::{AttendanceError, StoreError};
use crate::model::attendance::{AttendanceRecord, DailyAttendance};
use crate::model::policy::AttendancePolicy;
use crate::model::punch::{EventKind, NewPunchEvent, PunchEvent, PunchSource};
use crate::store::{AttendanceStore, WriteOutcome};

/// What a punch produced: the stored event, the date it was attributed to and
/// whether the day's record could be rewritten.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PunchReceipt {
    pub event: PunchEvent,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    pub outcome: WriteOutcome,
    pub attendance: Option<AttendanceRecord>,
}

struct DayContext {
    window: ShiftWindow,
    policy: AttendancePolicy,
    range: SessionScope,
}

pub struct AttendanceService<S: ?Sized> {
    store: Arc<S>,
    weekend_days: Vec<Weekday>,
}

impl<S> AttendanceService<S>
where
    S: AttendanceStore + ?Sized,
{
    pub fn new(store: Arc<S>, weekend_days: Vec<Weekday>) -> Self {
        Self {
            store,
            weekend_days,
        }
    }

    pub async fn check_in(
        &self,
        employee_id: u64,
        source: PunchSource,
        meta: Option<Value>,
    ) -> Result<PunchReceipt, AttendanceError> {
        self.punch_at(employee_id, EventKind::CheckIn, source, meta, now())
            .await
    }

    pub async fn check_out(
        &self,
        employee_id: u64,
        source: PunchSource,
        meta: Option<Value>,
    ) -> Result<PunchReceipt, AttendanceError> {
        self.punch_at(employee_id, EventKind::CheckOut, source, meta, now())
            .await
    }

    pub async fn break_start(
        &self,
        employee_id: u64,
        source: PunchSource,
        meta: Option<Value>,
    ) -> Result<PunchReceipt, AttendanceError> {
        self.punch_at(employee_id, EventKind::BreakStart, source, meta, now())
            .await
    }

    pub async fn break_end(
        &self,
        employee_id: u64,
        source: PunchSource,
        meta: Option<Value>,
    ) -> Result<PunchReceipt, AttendanceError> {
        self.punch_at(employee_id, EventKind::BreakEnd, source, meta, now())
            .await
    }

    /// Record a punch taken at `at` and recompute the day it belongs to.
    ///
    /// The action is checked against the session first; a refused action
    /// appends nothing. A locked day still keeps the event, only its record
    /// stays frozen.
    #[instrument(skip(self, meta))]
    pub async fn punch_at(
        &self,
        employee_id: u64,
        kind: EventKind,
        source: PunchSource,
        meta: Option<Value>,
        at: NaiveDateTime,
    ) -> Result<PunchReceipt, AttendanceError> {
        let today = at.date();
        let pending = Some((at, kind));
        let opens_today = self.boundary(employee_id, today, pending).await?;
        let opens_tomorrow = self.boundary(employee_id, next_day(today), pending).await?;
        let date = attribution_date(at, opens_today, opens_tomorrow);
        let ctx = self.day_context(employee_id, date, pending).await?;

        let events = self
            .store
            .events_between(employee_id, ctx.range.start, ctx.range.end)
            .await?;
        SessionState::from_events(events.iter().filter(|e| e.event_time <= at))
            .validate(kind)
            .inspect_err(|e| info!(%date, reason = %e, "punch refused"))?;

        let event = self
            .store
            .append_event(NewPunchEvent {
                employee_id,
                kind,
                event_time: at,
                source,
                meta,
            })
            .await?;

        let (_, outcome) = self.recompute(employee_id, date, &ctx).await?;
        if outcome == WriteOutcome::Locked {
            info!(%date, "attendance locked, punch kept but record unchanged");
        }
        let attendance = self.store.attendance_for(employee_id, date).await?;

        Ok(PunchReceipt {
            event,
            attendance_date: date,
            outcome,
            attendance,
        })
    }

    /// Re-derive one day from its stored events.
    #[instrument(skip(self))]
    pub async fn recalculate_for_date(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let ctx = self.day_context(employee_id, date, None).await?;
        match self.recompute(employee_id, date, &ctx).await? {
            (attendance, WriteOutcome::Written) => Ok(AttendanceRecord {
                attendance,
                is_payroll_locked: false,
                locked_at: None,
            }),
            (_, WriteOutcome::Locked) => {
                info!("recalculation refused, day is locked");
                Err(AttendanceError::AttendanceLocked { employee_id, date })
            }
        }
    }

    /// Freeze one day's record. Returns false when the day has no record.
    #[instrument(skip(self))]
    pub async fn lock_day(&self, employee_id: u64, date: NaiveDate) -> Result<bool, AttendanceError> {
        Ok(self.store.set_day_lock(employee_id, date, true).await?)
    }

    #[instrument(skip(self))]
    pub async fn unlock_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<bool, AttendanceError> {
        Ok(self.store.set_day_lock(employee_id, date, false).await?)
    }

    async fn window_and_policy(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<(ShiftWindow, AttendancePolicy), StoreError> {
        let shift = self.store.shift_for(employee_id, date).await?;
        let policy = resolve_attendance_policy(self.store.as_ref(), date).await;
        Ok((ShiftWindow::resolve(shift.as_ref(), date), policy))
    }

    async fn frame(&self, employee_id: u64, date: NaiveDate) -> Result<DayFrame, StoreError> {
        let (window, policy) = self.window_and_policy(employee_id, date).await?;
        Ok(DayFrame::new(window, &policy))
    }

    /// First instant attributed to `date`. A `pending` punch not yet stored
    /// is weighed as if it were.
    async fn boundary(
        &self,
        employee_id: u64,
        date: NaiveDate,
        pending: Option<(NaiveDateTime, EventKind)>,
    ) -> Result<NaiveDateTime, StoreError> {
        let previous = self.frame(employee_id, previous_day(date)).await?;
        let own = self.frame(employee_id, date).await?;
        let mut punches: Vec<(NaiveDateTime, EventKind)> = self
            .store
            .events_between(employee_id, previous.scope.start, previous.scope.end)
            .await?
            .iter()
            .map(|e| (e.event_time, e.kind))
            .collect();
        if let Some(punch) = pending.filter(|(time, _)| {
            previous.scope.start <= *time && *time <= previous.scope.end
        }) {
            let at = punches.partition_point(|(time, _)| *time <= punch.0);
            punches.insert(at, punch);
        }
        Ok(day_boundary(date, &previous, &own, punches))
    }

    async fn day_context(
        &self,
        employee_id: u64,
        date: NaiveDate,
        pending: Option<(NaiveDateTime, EventKind)>,
    ) -> Result<DayContext, StoreError> {
        let (window, policy) = self.window_and_policy(employee_id, date).await?;
        let opens = self.boundary(employee_id, date, pending).await?;
        let opens_next = self.boundary(employee_id, next_day(date), pending).await?;

        Ok(DayContext {
            window,
            policy,
            range: punch_range(opens, opens_next),
        })
    }

    async fn calendar_facts(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<CalendarFacts, StoreError> {
        Ok(CalendarFacts {
            is_weekend: self.weekend_days.contains(&date.weekday()),
            is_holiday: self.store.is_holiday(date).await?,
            has_approved_leave: self.store.has_approved_leave(employee_id, date).await?,
        })
    }

    async fn recompute(
        &self,
        employee_id: u64,
        date: NaiveDate,
        ctx: &DayContext,
    ) -> Result<(DailyAttendance, WriteOutcome), StoreError> {
        let events = self
            .store
            .events_between(employee_id, ctx.range.start, ctx.range.end)
            .await?;
        let facts = self.calendar_facts(employee_id, date).await?;
        let attendance = compute_day(employee_id, date, &events, &ctx.window, &ctx.policy, facts);
        let outcome = self.store.upsert_unless_locked(&attendance).await?;
        Ok((attendance, outcome))
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}
