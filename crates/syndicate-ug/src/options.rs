//! Gateway start-up options and per-call flags.

use std::str::FromStr;

use libc::{c_int, mode_t};
use nix::sys::stat::{umask, Mode};
use once_cell::sync::Lazy;
use syndicate_config::GatewayConfig;
use syndicate_sys::{O_RDONLY, O_RDWR, O_WRONLY, XATTR_CREATE, XATTR_REPLACE};

use crate::error::SyndicateError;

/// Program name handed to `UG_init` as `argv[0]`
pub const DEFAULT_PROGRAM: &str = "syndicate-ug";

/// Mode for files created by [`OpenMode::Write`] and [`OpenMode::Append`]
pub const CREATE_MODE: mode_t = 0o540;

/// Identity and verbosity for `UG_init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub program: String,
    pub user: String,
    pub volume: String,
    pub gateway: String,
    pub anonymous: bool,
    pub debug_level: Option<u8>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            user: String::new(),
            volume: String::new(),
            gateway: String::new(),
            anonymous: false,
            debug_level: None,
        }
    }
}

impl InitOptions {
    pub fn new(user: impl Into<String>, volume: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            volume: volume.into(),
            gateway: gateway.into(),
            ..Self::default()
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    pub fn debug_level(mut self, level: Option<u8>) -> Self {
        self.debug_level = level;
        self
    }

    /// Command line the native option parser sees.
    ///
    /// Empty strings, `false` and `None` leave their flag out.
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = vec![self.program.clone()];
        for (flag, value) in [("-u", &self.user), ("-v", &self.volume), ("-g", &self.gateway)] {
            if !value.is_empty() {
                argv.push(flag.to_string());
                argv.push(value.clone());
            }
        }
        if self.anonymous {
            argv.push("-A".to_string());
        }
        if let Some(level) = self.debug_level {
            argv.push(format!("-d{}", level));
        }
        argv
    }
}

impl From<&GatewayConfig> for InitOptions {
    fn from(cfg: &GatewayConfig) -> Self {
        Self {
            user: cfg.user.clone(),
            volume: cfg.volume.clone(),
            gateway: cfg.gateway.clone(),
            anonymous: cfg.anonymous,
            debug_level: cfg.debug_level,
            ..Self::default()
        }
    }
}

/// How [`Client::open`](crate::Client::open) treats the target file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `"r"`: existing file, read-only
    Read,
    /// `"w"`: create or truncate, write-only
    Write,
    /// `"a"`: create if missing, read-write, positioned at the end
    Append,
}

impl OpenMode {
    pub(crate) fn flags(self) -> c_int {
        match self {
            OpenMode::Read => O_RDONLY,
            OpenMode::Write => O_WRONLY,
            OpenMode::Append => O_RDWR,
        }
    }

    pub(crate) fn creates(self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::Write => "w",
            OpenMode::Append => "a",
        }
    }
}

impl FromStr for OpenMode {
    type Err = SyndicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::Write),
            "a" => Ok(OpenMode::Append),
            _ => Err(SyndicateError::InvalidArgument("open mode must be one of \"r\", \"w\", \"a\"")),
        }
    }
}

/// `setxattr` creation semantics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XattrFlags {
    /// Create or replace
    #[default]
    Any,
    /// Fail with `EEXIST` if the attribute exists
    Create,
    /// Fail with `ENOATTR` if the attribute is missing
    Replace,
}

impl XattrFlags {
    pub(crate) fn bits(self) -> c_int {
        match self {
            XattrFlags::Any => 0,
            XattrFlags::Create => XATTR_CREATE,
            XattrFlags::Replace => XATTR_REPLACE,
        }
    }
}

/// Umask sampled once, for kernels without `Umask:` in `/proc/self/status`.
/// umask(2) can only be read by setting it, so this must not run per call.
static STARTUP_UMASK: Lazy<mode_t> = Lazy::new(|| {
    let old = umask(Mode::empty());
    umask(old);
    old.bits()
});

/// Parse the `Umask:` line of a `/proc/<pid>/status` file.
fn parse_status_umask(status: &str) -> Option<mode_t> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|v| mode_t::from_str_radix(v.trim(), 8).ok())
}

/// Current process umask, read without modifying it when the kernel allows.
pub fn process_umask() -> mode_t {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| parse_status_umask(&s))
        .unwrap_or_else(|| *STARTUP_UMASK)
}

/// `0o777` masked by the process umask.
pub fn default_dir_mode() -> mode_t {
    0o777 & !process_umask()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_identity() {
        let opts = InitOptions::new("alice", "v1", "g1").program("prog");
        assert_eq!(opts.to_argv(), vec!["prog", "-u", "alice", "-v", "v1", "-g", "g1"]);
    }

    #[test]
    fn test_argv_omits_empty_values() {
        let opts = InitOptions::default();
        assert_eq!(opts.to_argv(), vec![DEFAULT_PROGRAM]);

        let opts = InitOptions::new("", "v1", "").anonymous(true).debug_level(Some(2));
        assert_eq!(opts.to_argv(), vec![DEFAULT_PROGRAM, "-v", "v1", "-A", "-d2"]);
    }

    #[test]
    fn test_from_gateway_config() {
        let cfg = GatewayConfig {
            user: "bob".into(),
            volume: "vol".into(),
            gateway: "gw".into(),
            anonymous: false,
            debug_level: Some(1),
        };
        let opts = InitOptions::from(&cfg);
        assert_eq!(opts.user, "bob");
        assert_eq!(opts.debug_level, Some(1));
        assert_eq!(opts.program, DEFAULT_PROGRAM);
    }

    #[test]
    fn test_open_mode_parse() {
        assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::Read);
        assert_eq!("w".parse::<OpenMode>().unwrap(), OpenMode::Write);
        assert_eq!("a".parse::<OpenMode>().unwrap(), OpenMode::Append);
        assert!(matches!(
            "rw".parse::<OpenMode>(),
            Err(SyndicateError::InvalidArgument(_))
        ));
        assert_eq!(OpenMode::Append.flags(), O_RDWR);
        assert!(!OpenMode::Read.creates());
    }

    #[test]
    fn test_xattr_flag_bits() {
        assert_eq!(XattrFlags::default().bits(), 0);
        assert_eq!(XattrFlags::Create.bits(), 1);
        assert_eq!(XattrFlags::Replace.bits(), 2);
    }

    #[test]
    fn test_parse_status_umask() {
        let status = "Name:\tug\nUmask:\t0027\nState:\tR (running)\n";
        assert_eq!(parse_status_umask(status), Some(0o027));
        assert_eq!(parse_status_umask("Name:\tug\n"), None);
        assert_eq!(parse_status_umask("Umask:\tzz\n"), None);
    }

    /// Many threads asking for the mode at once must leave the umask alone
    #[test]
    fn test_default_dir_mode_concurrent_keeps_umask() {
        let before = process_umask();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    for _ in 0..20_000 {
                        assert_eq!(default_dir_mode() & !0o777, 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(process_umask(), before);
        assert_eq!(default_dir_mode(), 0o777 & !before);
    }

    #[test]
    fn test_default_dir_mode_within_0777() {
        let mode = default_dir_mode();
        assert_eq!(mode & !0o777, 0);
        // calling twice must not disturb the process umask
        assert_eq!(default_dir_mode(), mode);
    }
}
