//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate persistence and reminder ports into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage and scheduler details.

pub mod task_store;
pub mod theme_service;
