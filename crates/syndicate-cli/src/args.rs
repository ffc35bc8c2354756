//! Gateway identity flags shared by every tool.

use std::path::PathBuf;

use clap::Args;
use syndicate_config::Config;
use syndicate_sys::LibraryPaths;
use syndicate_ug::InitOptions;

/// Flags handed to `UG_init`, layered over `~/.syndicate/config.toml`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayArgs {
    /// Syndicate user
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Volume to attach to
    #[arg(short = 'v', long)]
    pub volume: Option<String>,

    /// Name of this user gateway
    #[arg(short = 'g', long)]
    pub gateway: Option<String>,

    /// Connect anonymously
    #[arg(short = 'A', long)]
    pub anonymous: bool,

    /// Native debug level
    #[arg(short = 'd', long = "debug-level")]
    pub debug_level: Option<u8>,

    /// Directory containing libfskit, libsyndicate and libsyndicate-ug
    #[arg(long, value_name = "DIR")]
    pub lib_dir: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GatewayArgs {
    /// Command-line values win; anything unset comes from `config`.
    pub fn init_options(&self, config: &Config, program: &str) -> InitOptions {
        let mut opts = InitOptions::from(&config.gateway).program(program);
        if let Some(user) = &self.user {
            opts.user = user.clone();
        }
        if let Some(volume) = &self.volume {
            opts.volume = volume.clone();
        }
        if let Some(gateway) = &self.gateway {
            opts.gateway = gateway.clone();
        }
        if self.anonymous {
            opts.anonymous = true;
        }
        if self.debug_level.is_some() {
            opts.debug_level = self.debug_level;
        }
        opts
    }

    pub fn library_paths(&self, config: &Config) -> LibraryPaths {
        match &self.lib_dir {
            Some(dir) => LibraryPaths::in_dir(dir),
            None => config.library.paths(),
        }
    }
}
