//! Conditional logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Chatty modules (the HTTP client, the recorder controller) route their
//! diagnostics through these so a single const silences them while the rest of
//! the crate keeps logging through `log` directly.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info, log_warn};
//!
//! log_info!("confirmed location {id}");
//! ```

/// Info-level log when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level log when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level log when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Debug-level log when the calling module's `ENABLE_LOGS` is true.
///
/// Request/response tracing goes here so `RUST_LOG=meetmap_lib=debug` shows
/// the wire traffic without touching the info stream.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}
