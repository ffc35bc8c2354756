//! Error type for the high-level client.

use syndicate_sys::{errno, LoadError};
use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) and its handles
#[derive(Error, Debug)]
pub enum SyndicateError {
    /// Rejected before any native call was made
    #[error("Invalid arguments: {0}")]
    InvalidArgument(&'static str),

    /// A native call returned a negative code
    #[error("{context}: {description}")]
    Native {
        context: String,
        errno: i32,
        description: String,
    },

    #[error("Failed to allocate a buffer of {requested} bytes: Out of memory")]
    OutOfMemory { requested: usize },

    #[error("UG_init failed")]
    InitFailed,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyndicateError {
    /// Build a native error from a UG return code (`-errno`).
    pub fn native(context: impl Into<String>, rc: i64) -> Self {
        let errno = errno::from_return_code(rc);
        SyndicateError::Native {
            context: context.into(),
            errno,
            description: errno::strerror(errno).into_owned(),
        }
    }

    /// Positive errno carried by a native failure
    pub fn errno(&self) -> Option<i32> {
        match self {
            SyndicateError::Native { errno, .. } => Some(*errno),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.errno() == Some(libc::ENOENT)
    }
}

pub type Result<T> = std::result::Result<T, SyndicateError>;
