//! Reminder scheduler contract and the command-queue adapter.
//!
//! # Invariants
//! - `schedule` returns the handle under which the reminder is registered;
//!   when the request carries a handle, schedulers reuse it.
//! - `cancel` of an unknown handle is not an error.

use crate::model::task::{NotificationId, TaskId};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

/// Notification title for a reminder reaching its due date.
pub const REMINDER_TITLE: &str = "Task reminder";
/// Notification title for a reminder re-armed by snooze.
pub const SNOOZED_REMINDER_TITLE: &str = "Task reminder (snoozed)";
/// Platform channel hosts register reminders under.
pub const REMINDER_CHANNEL_ID: &str = "alarms";

/// Content delivered back when the reminder fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub title: String,
    /// Task title at scheduling time, shown on the alarm screen.
    pub body: String,
    pub task_id: TaskId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// Handle to reuse; `None` lets the scheduler pick one.
    pub handle: Option<NotificationId>,
    /// Unix epoch milliseconds.
    pub fire_at_ms: i64,
    pub payload: ReminderPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The platform refused the request (permissions, quota, ...).
    Rejected(String),
    /// The scheduler could not be reached.
    Unavailable(String),
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "reminder rejected: {message}"),
            Self::Unavailable(message) => write!(f, "reminder scheduler unavailable: {message}"),
        }
    }
}

impl Error for SchedulerError {}

/// Platform reminder service.
pub trait ReminderScheduler {
    fn schedule(&self, request: ReminderRequest) -> Result<NotificationId, SchedulerError>;
    fn cancel(&self, handle: &NotificationId) -> Result<(), SchedulerError>;
}

impl<T: ReminderScheduler + ?Sized> ReminderScheduler for &T {
    fn schedule(&self, request: ReminderRequest) -> Result<NotificationId, SchedulerError> {
        (**self).schedule(request)
    }

    fn cancel(&self, handle: &NotificationId) -> Result<(), SchedulerError> {
        (**self).cancel(handle)
    }
}

/// One instruction for the host's notification API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderCommand {
    Schedule {
        handle: NotificationId,
        fire_at_ms: i64,
        payload: ReminderPayload,
    },
    Cancel {
        handle: NotificationId,
    },
}

/// Scheduler that records commands for a host to execute later.
///
/// Handles are generated here so the task record can store them before the
/// host has talked to the platform.
#[derive(Debug, Default)]
pub struct CommandQueueScheduler {
    commands: Mutex<VecDeque<ReminderCommand>>,
}

impl CommandQueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all queued commands in issue order.
    pub fn drain(&self) -> Vec<ReminderCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, command: ReminderCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(command);
    }
}

impl ReminderScheduler for CommandQueueScheduler {
    fn schedule(&self, request: ReminderRequest) -> Result<NotificationId, SchedulerError> {
        let handle = request.handle.unwrap_or_else(NotificationId::generate);
        self.push(ReminderCommand::Schedule {
            handle: handle.clone(),
            fire_at_ms: request.fire_at_ms,
            payload: request.payload,
        });
        Ok(handle)
    }

    fn cancel(&self, handle: &NotificationId) -> Result<(), SchedulerError> {
        self.push(ReminderCommand::Cancel {
            handle: handle.clone(),
        });
        Ok(())
    }
}
