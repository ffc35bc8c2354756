//! # syndicate-cli
//!
//! Shared plumbing for the `syndicate-cat`, `syndicate-ls` and
//! `syndicate-mkdir` tools: gateway flags, a shutdown-guaranteeing session
//! scope, and the commands themselves (generic over [`UgApi`] so tests can
//! drive them against a mock).
//!
//! [`UgApi`]: syndicate_ug::UgApi

pub mod args;
pub mod commands;
pub mod session;

pub use args::GatewayArgs;
pub use session::{connect, with_client};

/// Common start-up for every tool: default SIGPIPE handling and logging.
pub fn init(verbose: u8) {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
    syndicate_config::logging::init_logging(syndicate_config::logging::LogLevel::from_verbosity(verbose));
}
