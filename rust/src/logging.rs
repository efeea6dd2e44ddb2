//! Logging macros for the planner with verbosity level control.
//!
//! Messages are forwarded to the `log` facade so the host picks the sink.
//! Nothing is emitted at verbosity 0 regardless of the logger's own filter.
//! - 0: SILENT
//! - 1: CHANGES (placements, relaxation decisions)
//! - 2: CHECKS (slot rejections, split attempts)
//! - 3: DEBUG (scores, slot-set sizes)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1), forwarded as `info`.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            log::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2), forwarded as `debug`.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            log::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3), forwarded as `trace`.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            log::trace!($($arg)*);
        }
    };
}
