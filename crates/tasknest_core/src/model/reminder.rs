//! Reminder delivery state machine.
//!
//! # Responsibility
//! - Enumerate reminder states and the events that move between them.
//! - Reject transitions that the delivery flow does not allow.
//!
//! # Invariants
//! - `Snoozed` is transient: the only way out is `Schedule`.
//! - `Stop` is accepted only for a fired reminder.

use crate::model::task::Task;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Delay applied when the user snoozes a fired reminder.
pub const DEFAULT_SNOOZE_DELAY_MS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderState {
    Unscheduled,
    Scheduled,
    Fired,
    Snoozed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderEvent {
    /// A reminder was requested from the scheduler.
    Schedule,
    /// The outstanding reminder was cancelled by delete/edit.
    Cancel,
    /// The scheduler delivered the reminder.
    Fire,
    /// The user postponed a fired reminder.
    Snooze,
    /// The user dismissed a fired reminder.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderTransitionError {
    pub from: ReminderState,
    pub event: ReminderEvent,
}

impl Display for ReminderTransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reminder event {:?} is not allowed in state {:?}",
            self.event, self.from
        )
    }
}

impl Error for ReminderTransitionError {}

impl ReminderState {
    /// Applies one event and returns the next state.
    pub fn apply(self, event: ReminderEvent) -> Result<Self, ReminderTransitionError> {
        use ReminderEvent as E;
        use ReminderState as S;

        match (self, event) {
            (S::Unscheduled, E::Schedule) | (S::Snoozed, E::Schedule) => Ok(S::Scheduled),
            (S::Scheduled, E::Cancel) => Ok(S::Unscheduled),
            (S::Scheduled, E::Fire) => Ok(S::Fired),
            (S::Fired, E::Snooze) => Ok(S::Snoozed),
            (S::Fired, E::Stop) => Ok(S::Unscheduled),
            (from, event) => Err(ReminderTransitionError { from, event }),
        }
    }

    /// Derives the state of a stored task at `now_ms`.
    ///
    /// A task without a handle is unscheduled. With a handle, the due date
    /// decides between scheduled (still ahead) and fired (reached).
    pub fn of_task(task: &Task, now_ms: i64) -> Self {
        match (&task.notification_id, task.due_date) {
            (None, _) => Self::Unscheduled,
            (Some(_), Some(due)) if due > now_ms => Self::Scheduled,
            (Some(_), _) => Self::Fired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReminderEvent, ReminderState};
    use crate::model::task::{NotificationId, Priority, Task};

    const ALL_STATES: [ReminderState; 4] = [
        ReminderState::Unscheduled,
        ReminderState::Scheduled,
        ReminderState::Fired,
        ReminderState::Snoozed,
    ];
    const ALL_EVENTS: [ReminderEvent; 5] = [
        ReminderEvent::Schedule,
        ReminderEvent::Cancel,
        ReminderEvent::Fire,
        ReminderEvent::Snooze,
        ReminderEvent::Stop,
    ];

    #[test]
    fn snooze_cycle_returns_to_scheduled() {
        let state = ReminderState::Unscheduled
            .apply(ReminderEvent::Schedule)
            .and_then(|s| s.apply(ReminderEvent::Fire))
            .and_then(|s| s.apply(ReminderEvent::Snooze))
            .and_then(|s| s.apply(ReminderEvent::Schedule))
            .expect("snooze cycle is valid");
        assert_eq!(state, ReminderState::Scheduled);
    }

    #[test]
    fn stop_is_only_valid_after_fire() {
        assert_eq!(
            ReminderState::Fired.apply(ReminderEvent::Stop),
            Ok(ReminderState::Unscheduled)
        );
        assert!(ReminderState::Scheduled.apply(ReminderEvent::Stop).is_err());
        assert!(ReminderState::Unscheduled.apply(ReminderEvent::Stop).is_err());
    }

    #[test]
    fn exactly_six_state_event_pairs_are_allowed() {
        let allowed = ALL_STATES
            .iter()
            .flat_map(|state| ALL_EVENTS.iter().map(move |event| state.apply(*event)))
            .filter(Result::is_ok)
            .count();
        // Schedule is accepted from both unscheduled and snoozed.
        assert_eq!(allowed, 6);
    }

    #[test]
    fn derived_state_follows_handle_and_due_date() {
        let mut task = Task::new("water plants", Priority::Low).unwrap();
        assert_eq!(ReminderState::of_task(&task, 1_000), ReminderState::Unscheduled);

        task.due_date = Some(2_000);
        task.notification_id = Some(NotificationId::new("n-1"));
        assert_eq!(ReminderState::of_task(&task, 1_000), ReminderState::Scheduled);
        assert_eq!(ReminderState::of_task(&task, 2_000), ReminderState::Fired);
    }
}
