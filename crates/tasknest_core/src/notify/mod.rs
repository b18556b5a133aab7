//! Reminder scheduling port and fired-reminder routing.
//!
//! # Responsibility
//! - Define the contract core uses to request and cancel reminders.
//! - Interpret fired notification payloads for the alarm screen.
//!
//! # Invariants
//! - Core never talks to the platform notification API directly; hosts
//!   implement `ReminderScheduler` or execute queued `ReminderCommand`s.

pub mod delivery;
pub mod scheduler;
