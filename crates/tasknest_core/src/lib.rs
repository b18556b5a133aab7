//! Core domain logic for TaskNest.
//! This crate is the single source of truth for task and reminder invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::reminder::{
    ReminderEvent, ReminderState, ReminderTransitionError, DEFAULT_SNOOZE_DELAY_MS,
};
pub use model::task::{NotificationId, Priority, Task, TaskId, TaskValidationError};
pub use model::theme::ThemePreference;
pub use notify::delivery::{route_fired_reminder, AlarmRoute, FiredReminder, TASK_ID_DATA_KEY};
pub use notify::scheduler::{
    CommandQueueScheduler, ReminderCommand, ReminderPayload, ReminderRequest, ReminderScheduler,
    SchedulerError, REMINDER_CHANNEL_ID, REMINDER_TITLE, SNOOZED_REMINDER_TITLE,
};
pub use repo::kv_store::{
    InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore, StoreError, StoreResult,
};
pub use repo::task_list_repo::{TaskListError, TaskListLoad, TASKS_KEY};
pub use service::task_store::{
    AddTaskRequest, EditTaskRequest, RecoverableError, TaskStore, TaskStoreError,
    TaskStoreResult,
};
pub use service::theme_service::{ThemeService, THEME_KEY};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
