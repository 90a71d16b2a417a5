//! Error codes shared by every fallible surface of the crate.

/// Grepable error code and retryable flag for host-facing errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
