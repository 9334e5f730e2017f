//! Runtime options for the sync engine
//!
//! Every timer the engine runs is a knob here. Hosts may load a partial JSON
//! fragment; missing fields take the defaults from `constants::timing`.
//! Values are validated with warn-and-clamp semantics: a degenerate option
//! never aborts startup, it is corrected and logged.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{timing, validation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Settle time before a parameter edit commits to the backend (ms)
    #[serde(default = "default_param_debounce_ms")]
    pub param_debounce_ms: u64,

    /// Offsets after a lifecycle event at which the foreground app is
    /// re-read and re-reported (ms, ascending)
    #[serde(default = "default_confirm_delays_ms")]
    pub confirm_delays_ms: Vec<u64>,

    /// Foreground poll period when no lifecycle event source exists (ms)
    #[serde(default = "default_context_poll_ms")]
    pub context_poll_ms: u64,

    /// Visible-content poll period for app changes and flag refreshes (ms)
    #[serde(default = "default_visible_poll_ms")]
    pub visible_poll_ms: u64,

    /// Lockout after a manual force-apply (ms)
    #[serde(default = "default_apply_cooldown_ms")]
    pub apply_cooldown_ms: u64,
}

fn default_param_debounce_ms() -> u64 {
    timing::PARAM_DEBOUNCE_MS
}

fn default_confirm_delays_ms() -> Vec<u64> {
    timing::CONFIRM_DELAYS_MS.to_vec()
}

fn default_context_poll_ms() -> u64 {
    timing::CONTEXT_POLL_MS
}

fn default_visible_poll_ms() -> u64 {
    timing::VISIBLE_POLL_MS
}

fn default_apply_cooldown_ms() -> u64 {
    timing::APPLY_COOLDOWN_MS
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            param_debounce_ms: default_param_debounce_ms(),
            confirm_delays_ms: default_confirm_delays_ms(),
            context_poll_ms: default_context_poll_ms(),
            visible_poll_ms: default_visible_poll_ms(),
            apply_cooldown_ms: default_apply_cooldown_ms(),
        }
    }
}

impl SyncOptions {
    /// Validate and clamp every option to its safe range
    ///
    /// Called once by the engine at spawn; the returned options are what
    /// actually runs.
    pub fn normalized(mut self) -> Self {
        self.param_debounce_ms = clamp_ms(
            "param_debounce_ms",
            self.param_debounce_ms,
            validation::MIN_DELAY_MS,
            validation::MAX_DELAY_MS,
        );
        self.context_poll_ms = clamp_ms(
            "context_poll_ms",
            self.context_poll_ms,
            validation::MIN_POLL_MS,
            validation::MAX_POLL_MS,
        );
        self.visible_poll_ms = clamp_ms(
            "visible_poll_ms",
            self.visible_poll_ms,
            validation::MIN_POLL_MS,
            validation::MAX_POLL_MS,
        );
        self.apply_cooldown_ms = clamp_ms(
            "apply_cooldown_ms",
            self.apply_cooldown_ms,
            validation::MIN_DELAY_MS,
            validation::MAX_DELAY_MS,
        );

        // The confirmation schedule must be ascending offsets; an empty or
        // zero-only list falls back to the default schedule
        self.confirm_delays_ms.retain(|&d| {
            if d == 0 || d > validation::MAX_DELAY_MS {
                warn!(delay_ms = d, "dropping out-of-range confirmation delay");
                false
            } else {
                true
            }
        });
        self.confirm_delays_ms.sort_unstable();
        self.confirm_delays_ms.dedup();
        if self.confirm_delays_ms.is_empty() {
            warn!("confirmation schedule empty, using default");
            self.confirm_delays_ms = default_confirm_delays_ms();
        }

        self
    }

    pub fn param_debounce(&self) -> Duration {
        Duration::from_millis(self.param_debounce_ms)
    }

    pub fn context_poll(&self) -> Duration {
        Duration::from_millis(self.context_poll_ms)
    }

    pub fn visible_poll(&self) -> Duration {
        Duration::from_millis(self.visible_poll_ms)
    }

    pub fn apply_cooldown(&self) -> Duration {
        Duration::from_millis(self.apply_cooldown_ms)
    }

    /// Confirmation offsets as durations, ascending
    pub fn confirm_delays(&self) -> Vec<Duration> {
        self.confirm_delays_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms))
            .collect()
    }
}

fn clamp_ms(name: &str, value: u64, min: u64, max: u64) -> u64 {
    if value < min {
        warn!(option = name, value, min, "option below minimum, clamping");
        min
    } else if value > max {
        warn!(option = name, value, max, "option exceeds maximum, clamping");
        max
    } else {
        value
    }
}
