use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::engine::round2;
use super::session::SessionState;
use crate::model::policy::AttendancePolicy;
use crate::model::punch::EventKind;
use crate::model::shift::ShiftDefinition;

const DEFAULT_REQUIRED_HOURS: f64 = 8.0;

/// Absolute working window of one employee on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShiftWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub required_hours: f64,
    pub is_night_shift: bool,
    pub shift_id: Option<u64>,
}

/// Closed interval of instants whose punches belong to one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionScope {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A shift rolls into the next day when flagged as night shift or when its
/// end is not after its start.
pub fn rolls_over(shift: &ShiftDefinition) -> bool {
    shift.is_night_shift || shift.end_time <= shift.start_time
}

impl ShiftWindow {
    pub fn resolve(shift: Option<&ShiftDefinition>, date: NaiveDate) -> Self {
        let Some(shift) = shift else {
            return ShiftWindow {
                start: date.and_time(NaiveTime::MIN),
                end: date.and_hms_opt(23, 59, 0).unwrap_or(date.and_time(NaiveTime::MIN)),
                required_hours: DEFAULT_REQUIRED_HOURS,
                is_night_shift: false,
                shift_id: None,
            };
        };

        let start = date.and_time(shift.start_time);
        let end_date = if rolls_over(shift) {
            date.checked_add_days(Days::new(1)).unwrap_or(date)
        } else {
            date
        };
        let end = end_date.and_time(shift.end_time);

        ShiftWindow {
            start,
            end,
            required_hours: round2((end - start).num_seconds() as f64 / 3600.0),
            is_night_shift: shift.is_night_shift,
            shift_id: Some(shift.shift_id),
        }
    }

    pub fn has_shift(&self) -> bool {
        self.shift_id.is_some()
    }

    /// Instants the window's date may claim punches from. Without a shift the
    /// scope is the calendar day. With one, it widens by the policy's
    /// check-in/check-out graces but never spans 24 hours. Neighbouring scopes
    /// may overlap; [`day_boundary`] decides who keeps what.
    pub fn session_scope(&self, policy: &AttendancePolicy) -> SessionScope {
        if !self.has_shift() {
            let day = self.start.date();
            return SessionScope {
                start: self.start,
                end: day.and_hms_opt(23, 59, 59).unwrap_or(self.end),
            };
        }

        let start = self.start - Duration::minutes(policy.early_checkin_grace_minutes.max(0));
        let widened = self.end + Duration::minutes(policy.late_checkout_grace_minutes.max(0));
        let ceiling = start + Duration::hours(24) - Duration::seconds(1);

        SessionScope {
            start,
            end: widened.min(ceiling),
        }
    }
}

/// Shift window of a date together with its session scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayFrame {
    pub window: ShiftWindow,
    pub scope: SessionScope,
}

impl DayFrame {
    pub fn new(window: ShiftWindow, policy: &AttendancePolicy) -> Self {
        Self {
            window,
            scope: window.session_scope(policy),
        }
    }
}

/// First instant whose punches belong to `date` rather than to the day before.
///
/// `previous_punches` are the previous date's scoped punches in instant order.
/// A date without a shift yields to a neighbour that has one. Between two
/// shifts, a gap is cut at midnight when it can be. Where the previous late
/// check-out grace overlaps today's scope, the previous date keeps only the
/// punches that continue its open session before today's shift starts; the
/// first check-in or the first punch after that session closed starts today.
pub fn day_boundary(
    date: NaiveDate,
    previous: &DayFrame,
    own: &DayFrame,
    previous_punches: impl IntoIterator<Item = (NaiveDateTime, EventKind)>,
) -> NaiveDateTime {
    let midnight = date.and_time(NaiveTime::MIN);
    let claimed_until = previous.scope.end + Duration::seconds(1);

    if !previous.window.has_shift() {
        return own.scope.start.min(midnight);
    }
    if !own.window.has_shift() {
        return midnight.max(claimed_until);
    }
    if claimed_until <= own.scope.start {
        return midnight.clamp(claimed_until, own.scope.start);
    }

    let contested_from = own.scope.start.min(previous.window.end);
    let mut state = SessionState::default();
    for (instant, kind) in previous_punches {
        if instant >= claimed_until {
            break;
        }
        if instant >= contested_from
            && (kind == EventKind::CheckIn || !state.checked_in || instant >= own.window.start)
        {
            return instant;
        }
        state = state.apply(kind);
    }
    claimed_until
}

/// Date a punch at `instant` belongs to, given the boundaries that open its
/// calendar date and the next one.
pub fn attribution_date(
    instant: NaiveDateTime,
    opens_today: NaiveDateTime,
    opens_tomorrow: NaiveDateTime,
) -> NaiveDate {
    let today = instant.date();
    if instant < opens_today {
        today.pred_opt().unwrap_or(today)
    } else if instant >= opens_tomorrow {
        today.succ_opt().unwrap_or(today)
    } else {
        today
    }
}

/// Instants attributed to a date, between the boundary that opens it and the
/// one that opens the next date.
pub fn punch_range(opens: NaiveDateTime, opens_next: NaiveDateTime) -> SessionScope {
    SessionScope {
        start: opens,
        end: opens_next - Duration::seconds(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: (u32, u32), end: (u32, u32), night: bool) -> ShiftDefinition {
        ShiftDefinition {
            shift_id: 5,
            shift_name: "test".into(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            is_night_shift: night,
            break_minutes: 0,
            is_active: true,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn day_shift_stays_on_the_same_date() {
        let w = ShiftWindow::resolve(Some(&shift((9, 0), (18, 0), false)), date(5));
        assert_eq!(w.start, date(5).and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(w.end, date(5).and_hms_opt(18, 0, 0).unwrap());
        assert_eq!(w.required_hours, 9.0);
        assert_eq!(w.shift_id, Some(5));
        assert!(!w.is_night_shift);
    }

    #[test]
    fn end_before_start_rolls_over_even_without_flag() {
        let w = ShiftWindow::resolve(Some(&shift((22, 0), (6, 0), false)), date(5));
        assert_eq!(w.end, date(6).and_hms_opt(6, 0, 0).unwrap());
        assert_eq!(w.required_hours, 8.0);
        assert!(!w.is_night_shift);
    }

    #[test]
    fn night_flag_rolls_over() {
        let w = ShiftWindow::resolve(Some(&shift((20, 0), (23, 0), true)), date(5));
        assert_eq!(w.end, date(6).and_hms_opt(23, 0, 0).unwrap());
        assert!(w.is_night_shift);
    }

    #[test]
    fn missing_shift_uses_whole_day() {
        let w = ShiftWindow::resolve(None, date(5));
        assert_eq!(w.start, date(5).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end, date(5).and_hms_opt(23, 59, 0).unwrap());
        assert_eq!(w.required_hours, 8.0);
        assert_eq!(w.shift_id, None);

        let scope = w.session_scope(&AttendancePolicy::default());
        assert_eq!(scope.end, date(5).and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn scope_is_widened_by_graces_and_capped() {
        let policy = AttendancePolicy {
            early_checkin_grace_minutes: 60,
            late_checkout_grace_minutes: 240,
            ..AttendancePolicy::default()
        };
        let w = ShiftWindow::resolve(Some(&shift((9, 0), (18, 0), false)), date(5));
        let scope = w.session_scope(&policy);
        assert_eq!(scope.start, date(5).and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(scope.end, date(5).and_hms_opt(22, 0, 0).unwrap());

        let greedy = AttendancePolicy {
            late_checkout_grace_minutes: 24 * 60,
            ..policy
        };
        assert_eq!(
            w.session_scope(&greedy).end,
            date(6).and_hms_opt(7, 59, 59).unwrap()
        );
    }

    fn frame(shift: Option<&ShiftDefinition>, d: u32, policy: &AttendancePolicy) -> DayFrame {
        DayFrame::new(ShiftWindow::resolve(shift, date(d)), policy)
    }

    const NONE: [(NaiveDateTime, EventKind); 0] = [];

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn night_checkout_is_attributed_to_shift_start_date() {
        let policy = AttendancePolicy::default();
        let night = shift((22, 0), (6, 0), true);
        let d5 = frame(Some(&night), 5, &policy);
        let d6 = frame(Some(&night), 6, &policy);
        let d7 = frame(Some(&night), 7, &policy);

        let punches = [(at(5, 22, 0), EventKind::CheckIn)];
        let opens_6 = day_boundary(date(6), &d5, &d6, punches);
        let opens_7 = day_boundary(date(7), &d6, &d7, NONE);
        assert_eq!(opens_6, at(6, 10, 0) + Duration::seconds(1));

        assert_eq!(attribution_date(at(6, 5, 30), opens_6, opens_7), date(5));
        assert_eq!(attribution_date(at(6, 21, 0), opens_6, opens_7), date(6));
    }

    #[test]
    fn early_grace_before_midnight_belongs_to_the_shift() {
        let policy = AttendancePolicy {
            early_checkin_grace_minutes: 120,
            ..AttendancePolicy::default()
        };
        let graveyard = shift((1, 0), (9, 0), false);
        let day = shift((9, 0), (18, 0), false);

        // A calendar day before it yields the pre-midnight grace.
        let free = frame(None, 4, &policy);
        let d5 = frame(Some(&graveyard), 5, &policy);
        assert_eq!(day_boundary(date(5), &free, &d5, NONE), at(4, 23, 0));

        // So does a day shift whose late grace ends earlier.
        let d4 = frame(Some(&day), 4, &policy);
        assert_eq!(day_boundary(date(5), &d4, &d5, NONE), at(4, 23, 0));

        let opens_5 = day_boundary(date(5), &free, &d5, NONE);
        let opens_4 = day_boundary(date(4), &frame(None, 3, &policy), &free, NONE);
        assert_eq!(attribution_date(at(4, 23, 30), opens_4, opens_5), date(5));
        assert_eq!(attribution_date(at(4, 22, 30), opens_4, opens_5), date(4));
    }

    #[test]
    fn closed_night_session_hands_the_morning_to_the_day_shift() {
        let policy = AttendancePolicy::default();
        let night = frame(Some(&shift((22, 0), (6, 0), true)), 5, &policy);
        let day = frame(Some(&shift((9, 0), (18, 0), false)), 6, &policy);

        let closed = [
            (at(5, 22, 0), EventKind::CheckIn),
            (at(6, 6, 0), EventKind::CheckOut),
            (at(6, 8, 55), EventKind::CheckIn),
        ];
        assert_eq!(day_boundary(date(6), &night, &day, closed), at(6, 8, 55));

        // Still checked in: an overstay keeps its checkout on the night.
        let overstay = [
            (at(5, 22, 0), EventKind::CheckIn),
            (at(6, 7, 30), EventKind::CheckOut),
        ];
        assert_eq!(
            day_boundary(date(6), &night, &day, overstay),
            at(6, 10, 0) + Duration::seconds(1)
        );

        // Once the day shift has started, the punch is the day's.
        let forgotten = [
            (at(5, 22, 0), EventKind::CheckIn),
            (at(6, 9, 5), EventKind::BreakStart),
        ];
        assert_eq!(day_boundary(date(6), &night, &day, forgotten), at(6, 9, 5));

        // A check-in never continues the night.
        let reopened = [
            (at(5, 22, 0), EventKind::CheckIn),
            (at(6, 8, 40), EventKind::CheckIn),
        ];
        assert_eq!(day_boundary(date(6), &night, &day, reopened), at(6, 8, 40));
    }

    #[test]
    fn punch_ranges_of_consecutive_days_meet_without_overlap() {
        let policy = AttendancePolicy::default();
        let night = shift((22, 0), (6, 0), true);
        let day = shift((9, 0), (18, 0), false);

        let d4 = frame(None, 4, &policy);
        let d5 = frame(Some(&night), 5, &policy);
        let d6 = frame(Some(&day), 6, &policy);
        let d7 = frame(Some(&day), 7, &policy);

        let opens_5 = day_boundary(date(5), &d4, &d5, NONE);
        let opens_6 = day_boundary(date(6), &d5, &d6, NONE);
        let opens_7 = day_boundary(date(7), &d6, &d7, NONE);

        let r5 = punch_range(opens_5, opens_6);
        let r6 = punch_range(opens_6, opens_7);
        assert_eq!(r5.start, at(5, 0, 0));
        assert_eq!(r5.end, at(6, 10, 0));
        assert_eq!(r6.start, at(6, 10, 0) + Duration::seconds(1));
        assert_eq!(r6.end, date(6).and_hms_opt(23, 59, 59).unwrap());

        // A night shift followed by a free day keeps its late grace.
        let free = frame(None, 6, &policy);
        assert_eq!(day_boundary(date(6), &d5, &free, NONE), r6.start);
    }
}
