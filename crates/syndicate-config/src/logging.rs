//! Structured logging utilities for the Syndicate bindings.
//!
//! Provides consistent logging with component prefixes and structured fields.
//!
//! # Usage
//!
//! ```ignore
//! use syndicate_config::{log_ug_debug, log_cli_info};
//!
//! log_ug_debug!("open", path = "/hello.txt", mode = "r");
//! log_cli_info!("listing directory", entries = 12);
//! ```

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const UG: &'static str = "UG";
    pub const LOADER: &'static str = "LOADER";
    pub const CLI: &'static str = "CLI";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a `-v` style verbosity count to a level (0 = warn).
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// === UG (high-level client) logging macros ===

#[macro_export]
macro_rules! log_ug_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = $crate::logging::Component::UG, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_ug_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = $crate::logging::Component::UG, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_ug_trace {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::trace!(component = $crate::logging::Component::UG, $($key = $value,)* $msg)
    };
}

// === LOADER logging macros ===

#[macro_export]
macro_rules! log_loader_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = $crate::logging::Component::LOADER, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_loader_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::LOADER, $($key = $value,)* $msg)
    };
}

// === CLI logging macros ===

#[macro_export]
macro_rules! log_cli_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = $crate::logging::Component::CLI, $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_cli_error {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::error!(component = $crate::logging::Component::CLI, $($key = $value,)* $msg)
    };
}

/// Initialize logging with the given level filter.
/// Call this once at application startup.
///
/// `SYNDICATE_LOG`, then `RUST_LOG`, take precedence over `level`.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_env("SYNDICATE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    // Logs go to stderr; stdout carries file data for syndicate-cat.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
