//! Low-level binding surface.
//!
//! One table per native library, each entry the exact C signature. Nothing
//! here validates arguments or translates errors: return codes are raw
//! `-errno` values and every pointer is the caller's responsibility.

use std::path::{Path, PathBuf};

use libc::{c_char, c_int, c_void, mode_t, off_t, size_t};
use tracing::info;

use crate::loader::{LoadError, NativeLibrary};
use crate::native_table;
use crate::types::*;

/// Default install prefix of the Syndicate libraries
pub const DEFAULT_LIB_DIR: &str = "/usr/local/lib";

native_table! {
    /// libsyndicate: shared gateway core
    pub struct LibSyndicate {
        fn md_entry_to_string(ent: *const MdEntry, data: *mut *mut c_char) -> c_int;
        fn md_entry_free(ent: *mut MdEntry) -> c_int;
        fn SG_gateway_first_arg_optind(gateway: *mut SgGateway) -> c_int;
    }
}

native_table! {
    /// libsyndicate-ug: the user gateway client
    pub struct LibSyndicateUg {
        // core.h
        fn UG_state_list_replica_gateway_ids(state: *mut UgState, ids: *mut *mut u64, num_ids: *mut size_t) -> c_int;
        fn UG_state_reload_replica_gateway_ids(state: *mut UgState) -> c_int;
        fn UG_RG_context_new() -> *mut UgRgContext;
        fn UG_state_rlock(state: *mut UgState) -> c_int;
        fn UG_state_wlock(state: *mut UgState) -> c_int;
        fn UG_state_unlock(state: *mut UgState) -> c_int;

        // init and shutdown
        fn UG_init(argc: c_int, argv: *mut *mut c_char, client: bool) -> *mut UgState;
        fn UG_init_ex(argc: c_int, argv: *mut *mut c_char, overrides: *mut MdOpts, cls: *mut c_void) -> *mut UgState;
        fn UG_start(state: *mut UgState) -> c_int;
        fn UG_main(state: *mut UgState) -> c_int;
        fn UG_shutdown(state: *mut UgState) -> c_int;

        // getters
        fn UG_state_gateway(state: *mut UgState) -> *mut SgGateway;
        fn UG_state_fs(state: *mut UgState) -> *mut FskitCore;
        fn UG_state_vacuumer(state: *mut UgState) -> *mut UgVacuumer;
        fn UG_state_owner_id(state: *mut UgState) -> u64;
        fn UG_state_volume_id(state: *mut UgState) -> u64;
        fn UG_state_wq(state: *mut UgState) -> *mut MdWq;
        fn UG_state_driver(state: *mut UgState) -> *mut SgDriver;
        fn UG_state_cls(state: *mut UgState) -> *mut c_void;
        fn UG_state_stat_rh(state: *mut UgState) -> c_int;
        fn UG_state_creat_rh(state: *mut UgState) -> c_int;
        fn UG_state_mkdir_rh(state: *mut UgState) -> c_int;
        fn UG_state_open_rh(state: *mut UgState) -> c_int;
        fn UG_state_read_rh(state: *mut UgState) -> c_int;
        fn UG_state_write_rh(state: *mut UgState) -> c_int;
        fn UG_state_trunc_rh(state: *mut UgState) -> c_int;
        fn UG_state_close_rh(state: *mut UgState) -> c_int;
        fn UG_state_sync_rh(state: *mut UgState) -> c_int;
        fn UG_state_detach_rh(state: *mut UgState) -> c_int;
        fn UG_state_rename_rh(state: *mut UgState) -> c_int;

        // setters
        fn UG_state_set_cls(state: *mut UgState, cls: *mut c_void);
        fn UG_state_set_stat_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_creat_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_mkdir_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_open_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_read_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_write_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_trunc_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_close_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_sync_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_detach_rh(state: *mut UgState, rh: c_int) -> c_int;
        fn UG_state_set_rename_rh(state: *mut UgState, rh: c_int) -> c_int;

        // client.h: metadata
        fn UG_stat(state: *mut UgState, path: *const c_char, statbuf: *mut libc::stat) -> c_int;
        fn UG_stat_raw(state: *mut UgState, path: *const c_char, ent: *mut MdEntry) -> c_int;
        fn UG_mkdir(state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
        fn UG_unlink(state: *mut UgState, path: *const c_char) -> c_int;
        fn UG_rmdir(state: *mut UgState, path: *const c_char) -> c_int;
        fn UG_rename(state: *mut UgState, path: *const c_char, newpath: *const c_char) -> c_int;
        fn UG_chmod(state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
        fn UG_chown(state: *mut UgState, path: *const c_char, new_owner: u64) -> c_int;
        fn UG_utime(state: *mut UgState, path: *const c_char, ubuf: *mut libc::utimbuf) -> c_int;
        fn UG_chcoord(state: *mut UgState, path: *const c_char, new_coordinator: *mut u64) -> c_int;
        fn UG_truncate(state: *mut UgState, path: *const c_char, newsize: off_t) -> c_int;
        fn UG_access(state: *mut UgState, path: *const c_char, mask: c_int) -> c_int;
        fn UG_invalidate(state: *mut UgState, path: *const c_char) -> c_int;
        fn UG_refresh(state: *mut UgState, path: *const c_char) -> c_int;

        // client.h: file data
        fn UG_open(state: *mut UgState, path: *const c_char, flags: c_int, rc: *mut c_int) -> *mut UgHandle;
        fn UG_create(state: *mut UgState, path: *const c_char, mode: mode_t, rc: *mut c_int) -> *mut UgHandle;
        fn UG_publish(state: *mut UgState, path: *const c_char, ent: *mut MdEntry, rc: *mut c_int) -> *mut UgHandle;
        fn UG_read(state: *mut UgState, buf: *mut c_char, size: size_t, fi: *mut UgHandle) -> c_int;
        fn UG_write(state: *mut UgState, buf: *const c_char, size: size_t, fi: *mut UgHandle) -> c_int;
        fn UG_getblockinfo(state: *mut UgState, block_id: u64, block_version: *mut i64, block_hash: *mut c_char, fi: *mut UgHandle) -> c_int;
        fn UG_putblockinfo(state: *mut UgState, block_id: u64, block_version: u64, block_hash: *const c_char, fi: *mut UgHandle) -> c_int;
        fn UG_seek(fi: *mut UgHandle, pos: off_t, whence: c_int) -> off_t;
        fn UG_close(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        fn UG_fsync(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        fn UG_ftruncate(state: *mut UgState, new_size: off_t, fi: *mut UgHandle) -> c_int;
        fn UG_fstat(state: *mut UgState, statbuf: *mut libc::stat, fi: *mut UgHandle) -> c_int;

        // client.h: directory data
        fn UG_opendir(state: *mut UgState, path: *const c_char, rc: *mut c_int) -> *mut UgHandle;
        fn UG_readdir(state: *mut UgState, listing: *mut *mut *mut MdEntry, num_children: size_t, fi: *mut UgHandle) -> c_int;
        fn UG_rewinddir(fi: *mut UgHandle) -> c_int;
        fn UG_telldir(fi: *mut UgHandle) -> off_t;
        fn UG_seekdir(fi: *mut UgHandle, loc: off_t) -> c_int;
        fn UG_closedir(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        fn UG_free_dir_listing(listing: *mut *mut MdEntry);

        // client.h: xattrs
        fn UG_setxattr(state: *mut UgState, path: *const c_char, name: *const c_char, value: *const c_char, size: size_t, flags: c_int) -> c_int;
        fn UG_getxattr(state: *mut UgState, path: *const c_char, name: *const c_char, value: *mut c_char, size: size_t) -> c_int;
        fn UG_listxattr(state: *mut UgState, path: *const c_char, list: *mut c_char, size: size_t) -> c_int;
        fn UG_removexattr(state: *mut UgState, path: *const c_char, name: *const c_char) -> c_int;

        // client.h: filesystem
        fn UG_statvfs(state: *mut UgState, buf: *mut libc::statvfs) -> c_int;
        fn UG_vacuum_begin(state: *mut UgState, path: *const c_char, vctx: *mut *mut UgVacuumContext) -> c_int;
        fn UG_vacuum_wait(vctx: *mut UgVacuumContext) -> c_int;
    }
}

/// Locations of the three native libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub fskit: PathBuf,
    pub syndicate: PathBuf,
    pub ug: PathBuf,
}

impl LibraryPaths {
    /// All three libraries under one directory.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            fskit: dir.join("libfskit"),
            syndicate: dir.join("libsyndicate"),
            ug: dir.join("libsyndicate-ug"),
        }
    }
}

impl Default for LibraryPaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_LIB_DIR)
    }
}

/// The loaded native UG stack.
///
/// Holds the libraries open for as long as the function tables are
/// reachable.
#[derive(Debug)]
pub struct UgLibrary {
    pub syndicate: LibSyndicate,
    pub ug: LibSyndicateUg,
    // Dropped last: fskit, syndicate, ug (field order).
    _libs: [NativeLibrary; 3],
}

impl UgLibrary {
    /// Load libfskit, libsyndicate and libsyndicate-ug, resolving every
    /// declared symbol.
    pub fn load(paths: &LibraryPaths) -> Result<Self, LoadError> {
        // fskit exports nothing we call directly; it is opened RTLD_GLOBAL so
        // libsyndicate-ug can bind against it.
        let fskit = NativeLibrary::open(&paths.fskit)?;
        let syndicate_lib = NativeLibrary::open(&paths.syndicate)?;
        let ug_lib = NativeLibrary::open(&paths.ug)?;

        // SAFETY: the tables declare the signatures from the installed
        // headers, and `_libs` keeps every library alive alongside them.
        let syndicate = unsafe { LibSyndicate::load(&syndicate_lib)? };
        let ug = unsafe { LibSyndicateUg::load(&ug_lib)? };

        info!(
            syndicate = ?syndicate_lib.path(),
            ug = ?ug_lib.path(),
            "loaded syndicate UG libraries"
        );

        Ok(Self {
            syndicate,
            ug,
            _libs: [fskit, syndicate_lib, ug_lib],
        })
    }

    /// Load from the default install prefix.
    pub fn load_default() -> Result<Self, LoadError> {
        Self::load(&LibraryPaths::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = LibraryPaths::default();
        assert_eq!(paths.fskit, PathBuf::from("/usr/local/lib/libfskit"));
        assert_eq!(paths.syndicate, PathBuf::from("/usr/local/lib/libsyndicate"));
        assert_eq!(paths.ug, PathBuf::from("/usr/local/lib/libsyndicate-ug"));
    }

    #[test]
    fn test_symbol_tables_declared() {
        assert_eq!(LibSyndicate::SYMBOLS.len(), 3);
        assert!(LibSyndicateUg::SYMBOLS.contains(&"UG_init"));
        assert!(LibSyndicateUg::SYMBOLS.contains(&"UG_free_dir_listing"));
        assert!(LibSyndicateUg::SYMBOLS.contains(&"UG_vacuum_wait"));

        let mut seen = std::collections::HashSet::new();
        for sym in LibSyndicateUg::SYMBOLS {
            assert!(sym.starts_with("UG_"), "{sym}");
            assert!(seen.insert(*sym), "duplicate symbol {sym}");
        }
    }

    #[test]
    fn test_load_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let err = UgLibrary::load(&LibraryPaths::in_dir(temp.path())).unwrap_err();
        match err {
            LoadError::Open { path, .. } => assert!(path.ends_with("libfskit.so")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
