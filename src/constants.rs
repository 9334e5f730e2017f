//! Engine-wide constants
//!
//! This module is the single source of truth for the timing schedule,
//! sentinel strings, and slider fallbacks shared across the sync engine.

/// Timing constants for debounce, polling, and confirmation schedules
pub mod timing {
    /// Settle time before a parameter edit is committed to the backend (ms)
    pub const PARAM_DEBOUNCE_MS: u64 = 500;

    /// Offsets after a lifecycle event at which the foreground app is
    /// re-read and re-reported, compensating for host routing lag (ms)
    pub const CONFIRM_DELAYS_MS: [u64; 3] = [250, 500, 1500];

    /// Foreground poll period when no lifecycle event source exists (ms)
    pub const CONTEXT_POLL_MS: u64 = 2000;

    /// Visible-content poll period for app changes and flag refreshes (ms)
    pub const VISIBLE_POLL_MS: u64 = 5000;

    /// Lockout after a manual force-apply (ms)
    pub const APPLY_COOLDOWN_MS: u64 = 1000;
}

/// Package / category constants
pub mod packages {
    /// Reserved root package holding unscoped shaders
    pub const DEFAULT_PACKAGE: &str = "Default";

    /// Separator between a package prefix and the shader file name
    pub const SEPARATOR: char = '/';
}

/// Shader selection sentinels (wire format)
pub mod shader {
    /// Wire sentinel for "no shader selected"
    pub const NONE_SENTINEL: &str = "None";

    /// Sentinel some backend revisions report instead of "None"
    pub const LEGACY_NONE: &str = "0";

    /// Label shown for the empty selection
    pub const NO_SHADER_LABEL: &str = "No Shader";

    /// Shader source file extension
    pub const FX_EXTENSION: &str = ".fx";
}

/// Host context sentinels
pub mod context {
    /// Identifier and name reported when no application is foreground
    pub const UNKNOWN: &str = "Unknown";
}

/// Slider fallbacks for parameters missing UI annotations
pub mod sliders {
    /// Minimum when ui_min is absent
    pub const DEFAULT_MIN: f64 = 0.0;

    /// Maximum when ui_max is absent
    pub const DEFAULT_MAX: f64 = 2.0;

    /// Step when ui_step is absent
    pub const DEFAULT_STEP: f64 = 0.01;
}

/// Engine plumbing constants
pub mod engine {
    /// Command queue capacity; panel traffic is low-volume
    pub const COMMAND_BUFFER: usize = 64;
}

/// Validation bounds for runtime options
pub mod validation {
    /// Smallest accepted debounce/cooldown delay (ms)
    pub const MIN_DELAY_MS: u64 = 10;

    /// Largest accepted debounce/cooldown delay (ms)
    pub const MAX_DELAY_MS: u64 = 60_000;

    /// Smallest accepted poll period (ms)
    pub const MIN_POLL_MS: u64 = 250;

    /// Largest accepted poll period (ms)
    pub const MAX_POLL_MS: u64 = 600_000;
}
