//! Theme preference use-case service.
//!
//! # Invariants
//! - A stored value that does not parse is ignored, never rewritten on load.
//! - Toggle flips the in-memory value even when the write fails.

use crate::model::theme::ThemePreference;
use crate::repo::kv_store::{KeyValueStore, StoreError};
use log::{info, warn};

/// Storage key of the theme preference.
pub const THEME_KEY: &str = "@theme";

pub struct ThemeService<K: KeyValueStore> {
    kv: K,
    current: ThemePreference,
}

impl<K: KeyValueStore> ThemeService<K> {
    /// Resolves the active theme: stored value, then the system scheme,
    /// then light.
    pub fn load(kv: K, system_default: Option<ThemePreference>) -> Self {
        let stored = match kv.get(THEME_KEY) {
            Ok(Some(bytes)) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(ThemePreference::parse),
            Ok(None) => None,
            Err(err) => {
                warn!("event=theme_load module=theme status=error error={err}");
                None
            }
        };
        let current = stored.or(system_default).unwrap_or_default();
        info!(
            "event=theme_load module=theme status=ok theme={} source={}",
            current,
            if stored.is_some() { "stored" } else { "default" }
        );
        Self { kv, current }
    }

    pub fn current(&self) -> ThemePreference {
        self.current
    }

    /// Flips the theme and persists it.
    ///
    /// Returns the new theme together with the write failure, if any.
    pub fn toggle(&mut self) -> (ThemePreference, Option<StoreError>) {
        self.current = self.current.toggled();
        let write = self.kv.set(THEME_KEY, self.current.as_str().as_bytes());
        if let Err(err) = &write {
            warn!(
                "event=theme_toggle module=theme status=error theme={} error={err}",
                self.current
            );
        }
        (self.current, write.err())
    }
}
