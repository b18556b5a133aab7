//! Flutter bridge for TaskNest core.

pub mod api;
