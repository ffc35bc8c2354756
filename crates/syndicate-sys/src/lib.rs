//! # syndicate-sys
//!
//! Raw bindings to the Syndicate User Gateway (UG) client libraries.
//!
//! ## Layers
//!
//! ```text
//! UgApi (trait)            ← what syndicate-ug calls
//!   └── UgLibrary          ← loaded stack: libfskit + libsyndicate + libsyndicate-ug
//!         ├── LibSyndicate     typed function table (eagerly resolved)
//!         └── LibSyndicateUg   typed function table (eagerly resolved)
//! types                    ← #[repr(C)] mirrors: md_entry, UG_handle_t, UG_state, md_opts
//! errno                    ← POSIX errno → description table
//! ```
//!
//! Nothing in this crate validates arguments. Use `syndicate-ug` for the
//! safe API.

#![allow(clippy::missing_safety_doc)]

pub mod api;
pub mod errno;
pub mod ffi;
pub mod loader;
pub mod types;

pub use api::UgApi;
pub use ffi::{LibSyndicate, LibSyndicateUg, LibraryPaths, UgLibrary, DEFAULT_LIB_DIR};
pub use loader::{LoadError, NativeLibrary};
pub use types::*;
