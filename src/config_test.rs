#![allow(clippy::float_cmp)]

use super::*;

const VARS: [&str; 11] = [
    "SIGNET_PAGE_INSET_PX",
    "SIGNET_GRID_PX",
    "SIGNET_FORGIVENESS_PX",
    "SIGNET_SNAP_PX",
    "SIGNET_HANDLE_RADIUS_PX",
    "SIGNET_DRAG_THRESHOLD_PX",
    "SIGNET_ROTATE_STEP_DEG",
    "SIGNET_RELEASE_COOLDOWN_MS",
    "SIGNET_DELETE_COOLDOWN_MS",
    "SIGNET_PLACE_DEBOUNCE_MS",
    "SIGNET_FONT_TIMEOUT_SECS",
];

/// # Safety
/// Every env-touching assertion lives in the single test below so parallel
/// test threads never race on these variables.
unsafe fn clear_signet_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn default_matches_documented_constants() {
    let cfg = EditorConfig::default();
    assert_eq!(cfg.page_inset_px, 5.0);
    assert_eq!(cfg.grid_px, 8.0);
    assert_eq!(cfg.forgiveness_px, 12.0);
    assert_eq!(cfg.snap_px, 6.0);
    assert_eq!(cfg.drag_threshold_px, 4.0);
    assert_eq!(cfg.rotate_step_deg, 5.0);
    assert_eq!(cfg.release_cooldown_ms, 150);
    assert_eq!(cfg.delete_cooldown_ms, 300);
}

#[test]
fn from_env_defaults_overrides_and_errors() {
    unsafe { clear_signet_env() };
    assert_eq!(EditorConfig::from_env().unwrap(), EditorConfig::default());

    unsafe {
        std::env::set_var("SIGNET_GRID_PX", "10");
        std::env::set_var("SIGNET_RELEASE_COOLDOWN_MS", " 250 ");
    }
    let cfg = EditorConfig::from_env().unwrap();
    assert_eq!(cfg.grid_px, 10.0);
    assert_eq!(cfg.release_cooldown_ms, 250);
    assert_eq!(cfg.snap_px, DEFAULT_SNAP_PX);

    unsafe { std::env::set_var("SIGNET_SNAP_PX", "wide") };
    let err = EditorConfig::from_env().unwrap_err();
    assert_eq!(err.error_code(), "E_CONFIG_PARSE");
    assert!(err.to_string().contains("SIGNET_SNAP_PX=wide"));

    unsafe { std::env::set_var("SIGNET_SNAP_PX", "-3") };
    let err = EditorConfig::from_env().unwrap_err();
    assert_eq!(err.error_code(), "E_CONFIG_RANGE");

    unsafe {
        std::env::remove_var("SIGNET_SNAP_PX");
        std::env::set_var("SIGNET_PLACE_DEBOUNCE_MS", "0");
    }
    let err = EditorConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { ref var } if var == "SIGNET_PLACE_DEBOUNCE_MS"));

    unsafe { clear_signet_env() };
}
