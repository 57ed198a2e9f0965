//! Tracing subscriber setup for the embedding host.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"` or
/// `"app_limiter=debug"`) is used.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing(default_directive: &str) {
    fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .without_time()
        .init();
}

/// Like [`init_tracing`], but returns false instead of panicking if a
/// subscriber is already installed.
pub fn try_init_tracing(default_directive: &str) -> bool {
    fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .without_time()
        .try_init()
        .is_ok()
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}
