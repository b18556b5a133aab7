//! Task list persistence over the key-value store.
//!
//! # Responsibility
//! - Encode the full task list as one JSON document under `TASKS_KEY`.
//! - Decode it at startup, classifying absent and malformed payloads.
//!
//! # Invariants
//! - Writes always replace the whole list (no partial updates).
//! - Decoded lists preserve stored order and contain unique ids.

use crate::model::task::{Task, TaskId};
use crate::repo::kv_store::{KeyValueStore, StoreError};
use log::warn;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the serialized task list.
pub const TASKS_KEY: &str = "@tasks";

/// Result of reading the stored task list.
#[derive(Debug)]
pub enum TaskListLoad {
    /// A valid list was stored (possibly empty).
    Loaded(Vec<Task>),
    /// Nothing has been stored yet.
    Missing,
    /// A payload exists but could not be decoded.
    Malformed(String),
}

#[derive(Debug)]
pub enum TaskListError {
    Store(StoreError),
    Encode(serde_json::Error),
}

impl Display for TaskListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "task list encode failed: {err}"),
        }
    }
}

impl Error for TaskListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StoreError> for TaskListError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Reads and decodes the stored task list.
///
/// # Errors
/// - Returns the store error when the read itself fails. Decode failures are
///   not errors; they are reported as `TaskListLoad::Malformed`.
pub fn load_task_list(store: &impl KeyValueStore) -> Result<TaskListLoad, StoreError> {
    let Some(bytes) = store.get(TASKS_KEY)? else {
        return Ok(TaskListLoad::Missing);
    };
    Ok(match decode_task_list(&bytes) {
        Ok(tasks) => TaskListLoad::Loaded(tasks),
        Err(message) => TaskListLoad::Malformed(message),
    })
}

/// Serializes and stores the full task list.
pub fn save_task_list(store: &impl KeyValueStore, tasks: &[Task]) -> Result<(), TaskListError> {
    let bytes = encode_task_list(tasks)?;
    store.set(TASKS_KEY, &bytes)?;
    Ok(())
}

/// Encodes a task list into its stored JSON form.
pub fn encode_task_list(tasks: &[Task]) -> Result<Vec<u8>, TaskListError> {
    serde_json::to_vec(tasks).map_err(TaskListError::Encode)
}

/// Decodes a stored JSON task list.
///
/// Duplicate ids keep the first occurrence; later copies are dropped with a
/// warning so one bad record does not discard the whole list.
pub fn decode_task_list(bytes: &[u8]) -> Result<Vec<Task>, String> {
    let decoded: Vec<Task> = serde_json::from_slice(bytes).map_err(|err| err.to_string())?;

    let mut seen: HashSet<TaskId> = HashSet::with_capacity(decoded.len());
    let mut tasks = Vec::with_capacity(decoded.len());
    let mut dropped = 0_usize;
    for task in decoded {
        if seen.insert(task.id.clone()) {
            tasks.push(task);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!("event=task_list_decode module=repo status=partial duplicate_ids_dropped={dropped}");
    }
    Ok(tasks)
}
