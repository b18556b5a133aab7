//! Domain model for tasks, reminders and the theme preference.
//!
//! # Responsibility
//! - Define the canonical records persisted by core.
//! - Keep reminder state transitions next to the record they describe.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion is a hard removal from the task list.
//!
//! # See also
//! - `crate::repo::task_list_repo` for the stored JSON shape

pub mod reminder;
pub mod task;
pub mod theme;
