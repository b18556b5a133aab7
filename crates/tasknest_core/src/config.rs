//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Gather database path, logging and reminder settings in one place.
//! - Resolve through an injectable lookup so tests never touch process env.
//!
//! # Invariants
//! - Blank variables behave as unset.
//! - Invalid values fall back to defaults instead of failing startup.

use crate::logging::default_log_level;
use crate::model::reminder::DEFAULT_SNOOZE_DELAY_MS;
use log::warn;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TASKNEST_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TASKNEST_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TASKNEST_LOG_DIR";
pub const SNOOZE_MINUTES_ENV: &str = "TASKNEST_SNOOZE_MINUTES";

const DEFAULT_DB_FILE_NAME: &str = "tasknest.sqlite3";
const MAX_SNOOZE_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is enabled only when a directory is configured.
    pub log_dir: Option<PathBuf>,
    pub snooze_delay_ms: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            snooze_delay_ms: DEFAULT_SNOOZE_DELAY_MS,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let snooze_delay_ms = match read(SNOOZE_MINUTES_ENV) {
            None => defaults.snooze_delay_ms,
            Some(raw) => match raw.parse::<i64>() {
                Ok(minutes) if (1..=MAX_SNOOZE_MINUTES).contains(&minutes) => {
                    minutes * 60 * 1000
                }
                _ => {
                    warn!(
                        "event=config_resolve module=config status=fallback key={SNOOZE_MINUTES_ENV}"
                    );
                    defaults.snooze_delay_ms
                }
            },
        };

        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
            snooze_delay_ms,
        }
    }
}
