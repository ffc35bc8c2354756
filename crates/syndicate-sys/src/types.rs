//! `#[repr(C)]` mirrors of the native UG structures.
//!
//! These layouts must match what the native compiler produced for
//! libsyndicate / libsyndicate-ug. Field order and widths follow the C
//! headers; padding is implicit and pinned by the assertions at the bottom
//! of this file (LP64 Linux only).

use libc::{c_char, c_int, c_void, off_t, size_t};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `md_entry.type` for a regular file
pub const MD_ENTRY_FILE: c_int = 1;
/// `md_entry.type` for a directory
pub const MD_ENTRY_DIRECTORY: c_int = 2;

/// `UG_handle_t.type` for an open file
pub const UG_TYPE_FILE: c_int = 1;
/// `UG_handle_t.type` for an open directory
pub const UG_TYPE_DIR: c_int = 2;

pub const O_RDONLY: c_int = 0;
pub const O_WRONLY: c_int = 1;
pub const O_RDWR: c_int = 2;

pub const SEEK_SET: c_int = 0;
pub const SEEK_CUR: c_int = 1;
pub const SEEK_END: c_int = 2;

/// setxattr: fail if the attribute already exists
pub const XATTR_CREATE: c_int = 1;
/// setxattr: fail if the attribute does not exist
pub const XATTR_REPLACE: c_int = 2;

// ---------------------------------------------------------------------------
// Opaque native types (only ever seen behind a pointer)
// ---------------------------------------------------------------------------

macro_rules! opaque {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
                _marker: core::marker::PhantomData<(*mut u8, core::marker::PhantomPinned)>,
            }
        )*
    };
}

opaque! {
    /// `struct SG_gateway`
    SgGateway;
    /// `struct fskit_core`
    FskitCore;
    /// `struct fskit_file_handle`
    FskitFileHandle;
    /// `struct fskit_dir_handle`
    FskitDirHandle;
    /// `struct UG_vacuumer`
    UgVacuumer;
    /// `struct UG_vacuum_context`
    UgVacuumContext;
    /// `struct UG_RG_context`
    UgRgContext;
    /// `struct md_wq`
    MdWq;
    /// `struct SG_driver`
    SgDriver;
}

// ---------------------------------------------------------------------------
// md_entry
// ---------------------------------------------------------------------------

/// Native metadata record for one filesystem object (`struct md_entry`).
///
/// Strings (`name`, `ent_sig`, `xattr_hash`) are owned by the native
/// allocator. Release a filled entry with `md_entry_free`, or the whole
/// listing with `UG_free_dir_listing`.
///
/// Layout (208 bytes):
/// ```text
/// offset  field                  size
/// ------  --------------------   ----
///   0     type                   4   (+4 pad)
///   8     name                   8
///  16     file_id                8
///  24     ctime_sec              8
///  32     ctime_nsec             4   (+4 pad)
///  40     mtime_sec              8
///  48     mtime_nsec             4   (+4 pad)
///  56     manifest_mtime_sec     8
///  64     manifest_mtime_nsec    4   (+4 pad)
///  72     write_nonce            8
///  80     xattr_nonce            8
///  88     version                8
///  96     max_read_freshness     4
/// 100     max_write_freshness    4
/// 104     owner                  8
/// 112     coordinator            8
/// 120     volume                 8
/// 128     mode                   4   (+4 pad)
/// 136     size                   8
/// 144     error                  4   (+4 pad)
/// 152     generation             8
/// 160     num_children           8
/// 168     capacity               8
/// 176     ent_sig                8
/// 184     ent_sig_len            8
/// 192     parent_id              8
/// 200     xattr_hash             8
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MdEntry {
    pub entry_type: c_int,
    pub name: *mut c_char,
    pub file_id: u64,
    pub ctime_sec: i64,
    pub ctime_nsec: i32,
    pub mtime_sec: i64,
    pub mtime_nsec: i32,
    /// Actual last-write time, regardless of utime
    pub manifest_mtime_sec: i64,
    pub manifest_mtime_nsec: i32,
    pub write_nonce: i64,
    pub xattr_nonce: i64,
    pub version: i64,
    pub max_read_freshness: i32,
    pub max_write_freshness: i32,
    pub owner: u64,
    pub coordinator: u64,
    pub volume: u64,
    pub mode: libc::mode_t,
    pub size: off_t,
    pub error: i32,
    /// n, as in the nth item ever created in the parent directory
    pub generation: i64,
    pub num_children: i64,
    /// Maximum index a child can have
    pub capacity: i64,
    pub ent_sig: *mut c_char,
    pub ent_sig_len: size_t,
    pub parent_id: u64,
    pub xattr_hash: *mut c_char,
}

impl MdEntry {
    /// An all-zero entry, suitable as an out-parameter.
    pub const fn zeroed() -> Self {
        Self {
            entry_type: 0,
            name: std::ptr::null_mut(),
            file_id: 0,
            ctime_sec: 0,
            ctime_nsec: 0,
            mtime_sec: 0,
            mtime_nsec: 0,
            manifest_mtime_sec: 0,
            manifest_mtime_nsec: 0,
            write_nonce: 0,
            xattr_nonce: 0,
            version: 0,
            max_read_freshness: 0,
            max_write_freshness: 0,
            owner: 0,
            coordinator: 0,
            volume: 0,
            mode: 0,
            size: 0,
            error: 0,
            generation: 0,
            num_children: 0,
            capacity: 0,
            ent_sig: std::ptr::null_mut(),
            ent_sig_len: 0,
            parent_id: 0,
            xattr_hash: std::ptr::null_mut(),
        }
    }
}

impl Default for MdEntry {
    fn default() -> Self {
        Self::zeroed()
    }
}

// ---------------------------------------------------------------------------
// UG_handle_t
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy)]
pub union UgHandleInner {
    pub fh: *mut FskitFileHandle,
    pub dh: *mut FskitDirHandle,
}

/// Open file or directory handle (`UG_handle_t`).
///
/// Layout (24 bytes): `type` at 0, `offset` at 8, `fh`/`dh` union at 16.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct UgHandle {
    pub handle_type: c_int,
    pub offset: off_t,
    pub inner: UgHandleInner,
}

impl std::fmt::Debug for UgHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // SAFETY: both union arms are plain pointers of the same width.
        let ptr = unsafe { self.inner.fh } as *const c_void;
        f.debug_struct("UgHandle")
            .field("handle_type", &self.handle_type)
            .field("offset", &self.offset)
            .field("inner", &ptr)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// UG_state
// ---------------------------------------------------------------------------

/// Global UG state (`struct UG_state`).
///
/// Callers treat this as opaque and go through the `UG_state_*` getters;
/// the mirror exists so the layout is pinned alongside the native version.
///
/// Layout (168 bytes, glibc):
/// ```text
/// offset  field                     size
///   0     gateway                   8
///   8     replica_gateway_ids       8
///  16     num_replica_gateway_ids   8
///  24     fs                        8
///  32     vacuumer                  8
///  40     lock (pthread_rwlock_t)  56
///  96..   11 x route handle (int)  44
/// 140     running_thread            1   (+3 pad)
/// 144     thread (pthread_t)        8
/// 152     wq                        8
/// 160     cls                       8
/// ```
#[repr(C)]
pub struct UgState {
    pub gateway: *mut SgGateway,
    pub replica_gateway_ids: *mut u64,
    pub num_replica_gateway_ids: size_t,
    pub fs: *mut FskitCore,
    pub vacuumer: *mut UgVacuumer,
    pub lock: libc::pthread_rwlock_t,
    pub stat_rh: c_int,
    pub creat_rh: c_int,
    pub mkdir_rh: c_int,
    pub open_rh: c_int,
    pub read_rh: c_int,
    pub write_rh: c_int,
    pub trunc_rh: c_int,
    pub close_rh: c_int,
    pub sync_rh: c_int,
    pub detach_rh: c_int,
    pub rename_rh: c_int,
    pub running_thread: bool,
    pub thread: libc::pthread_t,
    pub wq: *mut MdWq,
    pub cls: *mut c_void,
}

// ---------------------------------------------------------------------------
// md_opts
// ---------------------------------------------------------------------------

/// Gateway options consumed by `UG_init_ex` (`struct md_opts`).
///
/// Layout (80 bytes): five string pointers, `debug_level` at 40, three
/// bools at 44..47, `gateway_type` at 48, `driver_exec_str` at 56,
/// `driver_roles` at 64, `num_driver_roles` at 72.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MdOpts {
    pub config_file: *mut c_char,
    pub username: *mut c_char,
    pub volume_name: *mut c_char,
    pub ms_url: *mut c_char,
    pub gateway_name: *mut c_char,
    pub debug_level: c_int,
    pub foreground: bool,

    // not set by the parser
    pub client: bool,
    /// If true, no attempt to load the driver is made
    pub ignore_driver: bool,
    pub gateway_type: u64,

    pub driver_exec_str: *const c_char,
    pub driver_roles: *mut *const c_char,
    pub num_driver_roles: size_t,
}

impl Default for MdOpts {
    fn default() -> Self {
        Self {
            config_file: std::ptr::null_mut(),
            username: std::ptr::null_mut(),
            volume_name: std::ptr::null_mut(),
            ms_url: std::ptr::null_mut(),
            gateway_name: std::ptr::null_mut(),
            debug_level: 0,
            foreground: false,
            client: false,
            ignore_driver: false,
            gateway_type: 0,
            driver_exec_str: std::ptr::null(),
            driver_roles: std::ptr::null_mut(),
            num_driver_roles: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout assertions (LP64 Linux)
// ---------------------------------------------------------------------------

/// Size of `struct md_entry`
pub const MD_ENTRY_SIZE: usize = std::mem::size_of::<MdEntry>();
/// Size of `UG_handle_t`
pub const UG_HANDLE_SIZE: usize = std::mem::size_of::<UgHandle>();

#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
const _: () = {
    assert!(std::mem::size_of::<MdEntry>() == 208);
    assert!(std::mem::size_of::<UgHandle>() == 24);
    assert!(std::mem::size_of::<MdOpts>() == 80);
    assert!(std::mem::size_of::<libc::utimbuf>() == 16);
};

#[cfg(all(target_os = "linux", target_env = "gnu", target_pointer_width = "64"))]
const _: () = {
    assert!(std::mem::size_of::<UgState>() == 168);
    assert!(std::mem::size_of::<libc::statvfs>() == 112);
};
