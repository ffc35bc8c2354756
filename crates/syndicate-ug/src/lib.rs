//! # syndicate-ug
//!
//! Safe client for the Syndicate User Gateway (UG).
//!
//! ```text
//! Client<A: UgApi>        ← owns one UG_state, shut down on drop
//!   ├── FileHandle        ← open/read/write/seek/truncate, closed on drop
//!   ├── ReadDir           ← batched UG_readdir, closedir exactly once
//!   └── AsyncClient       ← the same calls on tokio's blocking pool
//! ```
//!
//! Every operation validates its arguments before any native call and maps
//! negative return codes to [`SyndicateError::Native`].
//!
//! ```ignore
//! use syndicate_ug::{Client, InitOptions, OpenMode};
//!
//! let cfg = syndicate_config::config();
//! let client = Client::load(&cfg.library.paths(), &InitOptions::new("alice", "v1", "g1"))?;
//! let mut fh = client.open("/hello.txt", OpenMode::Read)?;
//! let data = fh.read(4096)?;
//! fh.close()?;
//! client.shutdown()?;
//! ```

pub mod client;
pub mod dir;
pub mod entry;
pub mod error;
pub mod file;
pub mod nonblocking;
pub mod options;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::Client;
pub use dir::{DirBatch, ReadDir};
pub use entry::{DirEntry, Stat, Statvfs};
pub use error::{Result, SyndicateError};
pub use file::FileHandle;
pub use nonblocking::AsyncClient;
pub use options::{default_dir_mode, InitOptions, OpenMode, XattrFlags, CREATE_MODE};
pub use syndicate_sys::{LibraryPaths, UgApi, UgLibrary};
