//! Logging macros gated on a per-module `ENABLE_LOGS` switch.
//!
//! Tick loops fire every second, so the modules that own them can silence
//! their chatter without touching the global `RUST_LOG` filter:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_info};
//!
//! log_info!("rest timer started for {}s", 90);
//! ```

/// Info-level log that only fires when the calling module's
/// `ENABLE_LOGS` is `true`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level counterpart of [`log_info!`].
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level counterpart of [`log_info!`].
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Debug-level counterpart of [`log_info!`], used by the per-second tickers.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}
