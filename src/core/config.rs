//! Engine Configuration
//!
//! Tick period, scheduling mode and arena naming, read from the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default period between two arena ticks (one host game tick).
pub const DEFAULT_TICK_PERIOD_MS: u64 = 50;

/// Default prefix of generated arena names.
pub const DEFAULT_NAME_PREFIX: &str = "arena";

/// How arenas are mapped onto scheduler tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingMode {
    /// One loop ticks every arena in turn.
    Shared,
    /// Every arena gets its own periodic task.
    Dedicated,
}

/// Engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Period between two ticks of the same arena.
    pub tick_period: Duration,
    /// Task layout used by the scheduler.
    pub scheduling: SchedulingMode,
    /// Prefix of generated arena names (`<prefix>-<uuid>`).
    pub name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(DEFAULT_TICK_PERIOD_MS),
            scheduling: SchedulingMode::Dedicated,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// - `ARENA_PERIOD_MS`: tick period in milliseconds
    /// - `ARENA_DEDICATED`: `true`/`1` for one task per arena, `false`/`0` for a shared loop
    /// - `ARENA_NAME_PREFIX`: prefix of generated arena names
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset or unparsable keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tick_period = lookup("ARENA_PERIOD_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_period);

        let scheduling = lookup("ARENA_DEDICATED")
            .map(|v| {
                if v == "true" || v == "1" {
                    SchedulingMode::Dedicated
                } else {
                    SchedulingMode::Shared
                }
            })
            .unwrap_or(defaults.scheduling);

        let name_prefix = lookup("ARENA_NAME_PREFIX")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.name_prefix);

        Self {
            tick_period,
            scheduling,
            name_prefix,
        }
    }
}
