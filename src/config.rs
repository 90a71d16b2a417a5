//! Editor configuration parsed from environment variables.

use crate::error::ErrorCode;

pub const DEFAULT_PAGE_INSET_PX: f64 = 5.0;
pub const DEFAULT_GRID_PX: f64 = 8.0;
pub const DEFAULT_FORGIVENESS_PX: f64 = 12.0;
pub const DEFAULT_SNAP_PX: f64 = 6.0;
pub const DEFAULT_HANDLE_RADIUS_PX: f64 = 8.0;
pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 4.0;
pub const DEFAULT_ROTATE_STEP_DEG: f64 = 5.0;
pub const DEFAULT_RELEASE_COOLDOWN_MS: u64 = 150;
pub const DEFAULT_DELETE_COOLDOWN_MS: u64 = 300;
pub const DEFAULT_PLACE_DEBOUNCE_MS: u64 = 200;
pub const DEFAULT_FONT_TIMEOUT_SECS: u64 = 15;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The variable is set but does not parse as a number.
    #[error("config parse failed: {var}={value}")]
    Parse { var: String, value: String },

    /// The variable parsed but is zero or negative.
    #[error("config value out of range: {var} must be positive")]
    OutOfRange { var: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "E_CONFIG_PARSE",
            Self::OutOfRange { .. } => "E_CONFIG_RANGE",
        }
    }
}

/// Pixel tolerances and timing windows used by the interaction engine.
///
/// All pixel values are screen pixels of the rendered page, so they stay
/// constant while the page zooms; normalized equivalents are derived per
/// event from the page rect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Margin that keeps every overlay off the page edge.
    pub page_inset_px: f64,
    /// Grid that placement clicks snap to.
    pub grid_px: f64,
    /// Slop around item bounds for grabbing and for suppressing placement.
    pub forgiveness_px: f64,
    /// Center-to-center distance at which a dragged item snaps to a sibling.
    pub snap_px: f64,
    /// Hit radius of the resize corner handles.
    pub handle_radius_px: f64,
    /// Movement needed before an armed press becomes a drag.
    pub drag_threshold_px: f64,
    /// Rotation applied per wheel tick.
    pub rotate_step_deg: f64,
    /// Quiet window after a gesture ends during which clicks do not place.
    pub release_cooldown_ms: u64,
    /// Quiet window after deleting an item.
    pub delete_cooldown_ms: u64,
    /// Minimum spacing between two placements.
    pub place_debounce_ms: u64,
    /// Timeout for remote font downloads.
    pub font_timeout_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            page_inset_px: DEFAULT_PAGE_INSET_PX,
            grid_px: DEFAULT_GRID_PX,
            forgiveness_px: DEFAULT_FORGIVENESS_PX,
            snap_px: DEFAULT_SNAP_PX,
            handle_radius_px: DEFAULT_HANDLE_RADIUS_PX,
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            rotate_step_deg: DEFAULT_ROTATE_STEP_DEG,
            release_cooldown_ms: DEFAULT_RELEASE_COOLDOWN_MS,
            delete_cooldown_ms: DEFAULT_DELETE_COOLDOWN_MS,
            place_debounce_ms: DEFAULT_PLACE_DEBOUNCE_MS,
            font_timeout_secs: DEFAULT_FONT_TIMEOUT_SECS,
        }
    }
}

impl EditorConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `SIGNET_PAGE_INSET_PX`: default 5
    /// - `SIGNET_GRID_PX`: default 8
    /// - `SIGNET_FORGIVENESS_PX`: default 12
    /// - `SIGNET_SNAP_PX`: default 6
    /// - `SIGNET_HANDLE_RADIUS_PX`: default 8
    /// - `SIGNET_DRAG_THRESHOLD_PX`: default 4
    /// - `SIGNET_ROTATE_STEP_DEG`: default 5
    /// - `SIGNET_RELEASE_COOLDOWN_MS`: default 150
    /// - `SIGNET_DELETE_COOLDOWN_MS`: default 300
    /// - `SIGNET_PLACE_DEBOUNCE_MS`: default 200
    /// - `SIGNET_FONT_TIMEOUT_SECS`: default 15
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to a value that does not
    /// parse or is not positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            page_inset_px: env_positive_f64("SIGNET_PAGE_INSET_PX", DEFAULT_PAGE_INSET_PX)?,
            grid_px: env_positive_f64("SIGNET_GRID_PX", DEFAULT_GRID_PX)?,
            forgiveness_px: env_positive_f64("SIGNET_FORGIVENESS_PX", DEFAULT_FORGIVENESS_PX)?,
            snap_px: env_positive_f64("SIGNET_SNAP_PX", DEFAULT_SNAP_PX)?,
            handle_radius_px: env_positive_f64("SIGNET_HANDLE_RADIUS_PX", DEFAULT_HANDLE_RADIUS_PX)?,
            drag_threshold_px: env_positive_f64("SIGNET_DRAG_THRESHOLD_PX", DEFAULT_DRAG_THRESHOLD_PX)?,
            rotate_step_deg: env_positive_f64("SIGNET_ROTATE_STEP_DEG", DEFAULT_ROTATE_STEP_DEG)?,
            release_cooldown_ms: env_positive_u64("SIGNET_RELEASE_COOLDOWN_MS", DEFAULT_RELEASE_COOLDOWN_MS)?,
            delete_cooldown_ms: env_positive_u64("SIGNET_DELETE_COOLDOWN_MS", DEFAULT_DELETE_COOLDOWN_MS)?,
            place_debounce_ms: env_positive_u64("SIGNET_PLACE_DEBOUNCE_MS", DEFAULT_PLACE_DEBOUNCE_MS)?,
            font_timeout_secs: env_positive_u64("SIGNET_FONT_TIMEOUT_SECS", DEFAULT_FONT_TIMEOUT_SECS)?,
        })
    }
}

fn env_positive_f64(key: &str, default: f64) -> Result<f64, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::Parse { var: key.into(), value: raw.clone() })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::OutOfRange { var: key.into() });
    }
    Ok(value)
}

fn env_positive_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Parse { var: key.into(), value: raw.clone() })?;
    if value == 0 {
        return Err(ConfigError::OutOfRange { var: key.into() });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
