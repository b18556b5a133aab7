//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the key-value store port and its SQLite/in-memory adapters.
//! - Own the stored representation of the task list.
//!
//! # Invariants
//! - Absent keys are `None`, not errors.
//! - Malformed stored payloads are reported, never silently repaired on disk.

pub mod kv_store;
pub mod task_list_repo;
