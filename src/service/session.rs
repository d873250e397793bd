use crate::error::AttendanceError;
use crate::model::punch::{EventKind, PunchEvent};

/// Where an employee stands within the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub checked_in: bool,
    pub on_break: bool,
}

impl SessionState {
    /// Fold over events already ordered by instant.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a PunchEvent>) -> Self {
        events
            .into_iter()
            .fold(SessionState::default(), |state, event| state.apply(event.kind))
    }

    pub fn apply(self, kind: EventKind) -> Self {
        match kind {
            EventKind::CheckIn => SessionState {
                checked_in: true,
                ..self
            },
            EventKind::CheckOut => SessionState::default(),
            EventKind::BreakStart => SessionState {
                on_break: true,
                ..self
            },
            EventKind::BreakEnd => SessionState {
                on_break: false,
                ..self
            },
        }
    }

    /// Refuse an action that does not fit the current state.
    pub fn validate(&self, next: EventKind) -> Result<(), AttendanceError> {
        match next {
            EventKind::CheckIn if self.checked_in => Err(AttendanceError::AlreadyCheckedIn),
            EventKind::CheckOut if !self.checked_in => Err(AttendanceError::NoActiveCheckIn),
            EventKind::BreakStart if !self.checked_in => Err(AttendanceError::NoActiveCheckIn),
            EventKind::BreakStart if self.on_break => Err(AttendanceError::BreakAlreadyRunning),
            EventKind::BreakEnd if !self.on_break => Err(AttendanceError::NoActiveBreak),
            _ => Ok(()),
        }
    }
}
