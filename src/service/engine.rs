//! Pure derivation of a daily attendance record from punch events.
//!
//! Nothing in here touches the store: the same events, window, policy and
//! calendar facts always produce the same record.

use chrono::{NaiveDate, NaiveDateTime};

use super::shift_window::ShiftWindow;
use crate::model::attendance::{AttendanceStatus, DailyAttendance};
use crate::model::policy::AttendancePolicy;
use crate::model::punch::{EventKind, PunchEvent};

/// Calendar facts supplied by collaborators for one employee-date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarFacts {
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub has_approved_leave: bool,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default, PartialEq)]
struct Spans {
    work_seconds: i64,
    break_seconds: i64,
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
}

/// Accumulates work and break spans. A break edge without its matching open
/// span is ignored so skewed device clocks cannot corrupt the totals.
fn walk(events: &[&PunchEvent]) -> Spans {
    let mut spans = Spans::default();
    let mut work_open: Option<NaiveDateTime> = None;
    let mut break_open: Option<NaiveDateTime> = None;
    let mut last_check_out = None;

    for event in events {
        let at = event.event_time;
        match event.kind {
            EventKind::CheckIn => {
                spans.check_in.get_or_insert(at);
                work_open.get_or_insert(at);
                break_open = None;
            }
            EventKind::BreakStart => {
                if let Some(started) = work_open.take() {
                    spans.work_seconds += (at - started).num_seconds();
                    break_open = Some(at);
                }
            }
            EventKind::BreakEnd => {
                if let Some(started) = break_open.take() {
                    spans.break_seconds += (at - started).num_seconds();
                    work_open = Some(at);
                }
            }
            EventKind::CheckOut => {
                if let Some(started) = work_open.take() {
                    spans.work_seconds += (at - started).num_seconds();
                }
                break_open = None;
                last_check_out = Some(at);
            }
        }
    }

    // An unterminated session ends at its last punch.
    spans.check_out = last_check_out.or_else(|| events.last().map(|e| e.event_time));
    spans
}

fn positive_minutes(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_minutes().max(0)
}

pub fn classify(net_hours: f64, required_hours: f64, policy: &AttendancePolicy) -> AttendanceStatus {
    if net_hours >= required_hours * policy.full_day_fraction {
        AttendanceStatus::Present
    } else if net_hours >= required_hours * policy.half_day_fraction {
        AttendanceStatus::HalfDay
    } else {
        AttendanceStatus::ShortHours
    }
}

fn absence_status(facts: CalendarFacts) -> AttendanceStatus {
    if facts.is_holiday {
        AttendanceStatus::Holiday
    } else if facts.has_approved_leave {
        AttendanceStatus::OnLeave
    } else if facts.is_weekend {
        AttendanceStatus::WeekOff
    } else {
        AttendanceStatus::Absent
    }
}

/// Derive the day's record from the events scoped to `window`.
pub fn compute_day(
    employee_id: u64,
    date: NaiveDate,
    events: &[PunchEvent],
    window: &ShiftWindow,
    policy: &AttendancePolicy,
    facts: CalendarFacts,
) -> DailyAttendance {
    let mut day = DailyAttendance {
        employee_id,
        date,
        shift_id: window.shift_id,
        check_in: None,
        check_out: None,
        total_hours: 0.0,
        net_hours: 0.0,
        break_minutes: 0,
        overtime_minutes: 0,
        late_minutes: 0,
        early_exit_minutes: 0,
        is_late: false,
        is_early_checkout: false,
        is_overtime: false,
        is_weekend: facts.is_weekend,
        is_holiday: facts.is_holiday,
        is_night_shift: window.is_night_shift,
        status: absence_status(facts),
    };

    if events.is_empty() {
        return day;
    }

    let mut ordered: Vec<&PunchEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.event_time, e.event_id));
    let spans = walk(&ordered);

    day.check_in = spans.check_in;
    day.check_out = spans.check_out;
    day.total_hours = match (spans.check_in, spans.check_out) {
        (Some(check_in), Some(check_out)) => {
            round2((check_out - check_in).num_seconds().max(0) as f64 / 3600.0)
        }
        _ => 0.0,
    };
    day.net_hours = round2(spans.work_seconds as f64 / 3600.0);
    day.break_minutes = spans.break_seconds / 60;

    if window.has_shift() {
        if let Some(check_in) = spans.check_in {
            day.late_minutes = positive_minutes(window.start, check_in);
            day.is_late = day.late_minutes > policy.late_grace_minutes;
        }
        // Without a check-in there is no session to leave early or extend.
        if let (Some(_), Some(check_out)) = (spans.check_in, spans.check_out) {
            day.early_exit_minutes = positive_minutes(check_out, window.end);
            day.is_early_checkout = day.early_exit_minutes > policy.early_exit_grace_minutes;

            if policy.overtime_enabled {
                day.overtime_minutes = positive_minutes(window.end, check_out);
                day.is_overtime = day.overtime_minutes > 0;
            }
        }
    }

    day.status = classify(day.net_hours, window.required_hours, policy);
    day
}
