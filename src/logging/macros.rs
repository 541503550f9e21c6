// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros for convenient logging
//
// The level is checked before the arguments are formatted, so a filtered
// call costs one atomic load.

/// Log at an explicit level, capturing file, line and module path
///
/// # Examples
/// ```ignore
/// log_at!(logger, Level::Warn, "queue at {}%", fill);
/// ```
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.should_log(level) {
            logger.log(
                level,
                $crate::logging::SourceLocation::new(file!(), line!(), module_path!()),
                format_args!($($arg)+),
            );
        }
    }};
}

/// Log a message with trace level
///
/// # Examples
/// ```ignore
/// log_trace!(logger, "entering poll loop");
/// ```
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Trace, $($arg)+)
    };
}

/// Log a message with debug level
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Debug, $($arg)+)
    };
}

/// Log a message with info level
///
/// # Examples
/// ```ignore
/// log_info!(logger, "listening on {}", addr);
/// ```
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Info, $($arg)+)
    };
}

/// Log a message with warn level
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Warn, $($arg)+)
    };
}

/// Log a message with error level
///
/// # Examples
/// ```ignore
/// log_error!(logger, "write to {} failed: {}", path, err);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Error, $($arg)+)
    };
}

/// Log a message with critical level
#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logging::Level::Critical, $($arg)+)
    };
}
