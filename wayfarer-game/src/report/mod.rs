//! Report domain primitives shared by the orchestrator and its callers.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_BIG_EVENT_INTERVAL_MINS, DEFAULT_COOLDOWN_MILLIS, DEFAULT_REACTION_TIMEOUT_SECS,
    DEFAULT_SMALL_EVENT_COUNT, DEFAULT_TIME_LIMIT_MINS, DEFAULT_TIME_MAX_MINS,
};
use crate::outcome::{DeltaSet, OutcomeError};
use crate::random::SelectionError;

pub mod orchestrator;
pub use orchestrator::ReportEngine;

/// Pacing configuration for the report loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Minutes of travel before a destination arrival (big event).
    #[serde(default = "ReportConfig::default_big_event_interval_mins")]
    pub big_event_interval_mins: i64,
    /// Small-event slots per travel leg.
    #[serde(default = "ReportConfig::default_small_event_count")]
    pub small_event_count: u8,
    /// Seconds to wait for a reaction before the `end` outcome applies.
    #[serde(default = "ReportConfig::default_reaction_timeout_secs")]
    pub reaction_timeout_secs: u64,
    /// Double-submission guard window, in milliseconds.
    #[serde(default = "ReportConfig::default_cooldown_millis")]
    pub cooldown_millis: u64,
    /// Hard cap on elapsed minutes credited toward rewards.
    #[serde(default = "ReportConfig::default_time_limit_mins")]
    pub time_limit_mins: i64,
    /// Elapsed minutes assigned to a forced event, before the cap.
    #[serde(default = "ReportConfig::default_time_max_mins")]
    pub time_max_mins: i64,
}

impl ReportConfig {
    const fn default_big_event_interval_mins() -> i64 {
        DEFAULT_BIG_EVENT_INTERVAL_MINS
    }

    const fn default_small_event_count() -> u8 {
        DEFAULT_SMALL_EVENT_COUNT
    }

    const fn default_reaction_timeout_secs() -> u64 {
        DEFAULT_REACTION_TIMEOUT_SECS
    }

    const fn default_cooldown_millis() -> u64 {
        DEFAULT_COOLDOWN_MILLIS
    }

    const fn default_time_limit_mins() -> i64 {
        DEFAULT_TIME_LIMIT_MINS
    }

    const fn default_time_max_mins() -> i64 {
        DEFAULT_TIME_MAX_MINS
    }

    /// The big-event interval as a duration.
    #[must_use]
    pub fn big_event_interval(&self) -> Duration {
        Duration::minutes(self.big_event_interval_mins)
    }

    /// The reaction-await timeout handed to the transport.
    #[must_use]
    pub const fn reaction_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.reaction_timeout_secs)
    }

    /// The cooldown-lock window handed to access control.
    #[must_use]
    pub const fn cooldown_window(&self) -> StdDuration {
        StdDuration::from_millis(self.cooldown_millis)
    }

    /// Validate configuration invariants before sanitization.
    ///
    /// # Errors
    ///
    /// Returns `ReportConfigError` when any field violates the documented
    /// bounds.
    pub fn validate(&self) -> Result<(), ReportConfigError> {
        if self.big_event_interval_mins < 1 {
            return Err(ReportConfigError::MinViolation {
                field: "big_event_interval_mins",
                min: 1,
                value: self.big_event_interval_mins,
            });
        }
        if self.small_event_count == 0 {
            return Err(ReportConfigError::MinViolation {
                field: "small_event_count",
                min: 1,
                value: 0,
            });
        }
        if self.time_limit_mins < 1 {
            return Err(ReportConfigError::MinViolation {
                field: "time_limit_mins",
                min: 1,
                value: self.time_limit_mins,
            });
        }
        if self.time_max_mins > self.time_limit_mins {
            return Err(ReportConfigError::TimeMaxExceedsLimit {
                max: self.time_max_mins,
                limit: self.time_limit_mins,
            });
        }
        Ok(())
    }

    /// Clamp degenerate values that validation tolerates.
    pub fn sanitize(&mut self) {
        if self.reaction_timeout_secs == 0 {
            self.reaction_timeout_secs = Self::default_reaction_timeout_secs();
        }
        if self.time_max_mins < 1 {
            self.time_max_mins = Self::default_time_max_mins().min(self.time_limit_mins);
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            big_event_interval_mins: Self::default_big_event_interval_mins(),
            small_event_count: Self::default_small_event_count(),
            reaction_timeout_secs: Self::default_reaction_timeout_secs(),
            cooldown_millis: Self::default_cooldown_millis(),
            time_limit_mins: Self::default_time_limit_mins(),
            time_max_mins: Self::default_time_max_mins(),
        }
    }
}

/// Errors raised when report configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("time_max_mins {max} exceeds time_limit_mins {limit}")]
    TimeMaxExceedsLimit { max: i64, limit: i64 },
}

/// Result of one report invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The player was idle; a destination was chosen and travel started.
    DestinationPrompt { destination: u32 },
    /// A big event ran end to end.
    BigEventResolved { event_id: u32, deltas: DeltaSet },
    /// A small flavor event fired for one slot.
    SmallEventResolved { event_id: String },
    /// Nothing was due; travel progression was displayed.
    ProgressShown { percent: f64 },
}

/// Test/ops overrides for a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub force_big_event: Option<u32>,
    pub force_small_event: Option<String>,
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("player is blocked from reporting")]
    Blocked,
    #[error("player is rate limited")]
    RateLimited,
    #[error("a report is already in flight for this player")]
    CooldownHeld,
    #[error("no reachable destination from map {map_id}")]
    NoDestination { map_id: u32 },
    #[error(transparent)]
    Config(#[from] ReportConfigError),
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Opaque localization key plus parameters; the transport renders it.
///
/// The engine never emits user-facing text directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKey {
    pub key: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl MessageKey {
    #[must_use]
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: ReportConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(cfg, ReportConfig::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn validation_rejects_zero_interval() {
        let cfg = ReportConfig {
            big_event_interval_mins: 0,
            ..ReportConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ReportConfigError::MinViolation { field, .. }) if field == "big_event_interval_mins"
        ));
    }

    #[test]
    fn validation_rejects_inverted_time_caps() {
        let cfg = ReportConfig {
            time_max_mins: 2000,
            time_limit_mins: 1440,
            ..ReportConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ReportConfigError::TimeMaxExceedsLimit { .. })
        ));
    }

    #[test]
    fn sanitize_restores_degenerate_timeouts() {
        let mut cfg = ReportConfig {
            reaction_timeout_secs: 0,
            time_max_mins: 0,
            ..ReportConfig::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.reaction_timeout_secs, 120);
        assert_eq!(cfg.time_max_mins, 120);
    }

    #[test]
    fn message_keys_collect_parameters_in_order() {
        let key = MessageKey::new("report.travel.path")
            .with("percent", 42.5)
            .with("from", 3_u32);
        assert_eq!(key.key, "report.travel.path");
        assert_eq!(
            key.params,
            vec![("percent", "42.5".to_string()), ("from", "3".to_string())]
        );
    }
}
