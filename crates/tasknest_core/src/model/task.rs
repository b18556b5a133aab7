//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical to-do record persisted under the task list key.
//! - Validate record-level invariants on construction and deserialization.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `title` is never blank; write paths store it trimmed.
//! - `notification_id` is set only while a reminder is outstanding.
//!
//! # See also
//! - `crate::service::task_store` for reminder bookkeeping

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier.
///
/// Generated ids are UUID v4 text. Ids written by older app builds
/// (millisecond timestamps) are accepted unchanged, so the value is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an externally supplied identifier.
    ///
    /// Returns `None` for blank input.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle of a scheduled reminder, as understood by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Generates a fresh handle for schedulers that let the caller pick one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for NotificationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-selected task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses the lowercase wire label, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty after trimming whitespace.
    EmptyTitle,
    /// Identifier is empty after trimming whitespace.
    EmptyId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be blank"),
            Self::EmptyId => write!(f, "task id must not be blank"),
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do record.
///
/// Field names serialize in camelCase to stay readable by the mobile app's
/// existing stored payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub image_uri: Option<String>,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
    pub notification_id: Option<NotificationId>,
}

impl Task {
    /// Creates an open task with a generated id and no reminder.
    ///
    /// # Errors
    /// - `EmptyTitle` when `title` is blank after trimming.
    pub fn new(title: &str, priority: Priority) -> Result<Self, TaskValidationError> {
        let title = normalize_title(title)?;
        Ok(Self {
            id: TaskId::generate(),
            title,
            completed: false,
            priority,
            image_uri: None,
            due_date: None,
            notification_id: None,
        })
    }

    /// Validates invariants that must hold for every stored record.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Returns whether a reminder handle is currently attached.
    pub fn has_active_reminder(&self) -> bool {
        self.notification_id.is_some()
    }
}

/// Trims a user-supplied title and rejects blank input.
pub fn normalize_title(title: &str) -> Result<String, TaskValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskWire {
    id: TaskId,
    title: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    image_uri: Option<String>,
    #[serde(default)]
    due_date: Option<i64>,
    #[serde(default)]
    notification_id: Option<NotificationId>,
}

impl TryFrom<TaskWire> for Task {
    type Error = TaskValidationError;

    fn try_from(wire: TaskWire) -> Result<Self, Self::Error> {
        let task = Self {
            id: wire.id,
            title: wire.title,
            completed: wire.completed,
            priority: wire.priority,
            image_uri: wire.image_uri,
            due_date: wire.due_date,
            notification_id: wire.notification_id,
        };
        task.validate()?;
        Ok(task)
    }
}
