//! `UgApi`: the native calls the high-level client is built on.
//!
//! Every method has the C signature of the function it names. The real
//! implementation is [`UgLibrary`]; tests substitute a recording mock.

use libc::{c_char, c_int, mode_t, off_t, size_t};

use crate::ffi::UgLibrary;
use crate::types::*;

/// Native UG entry points used by the convenience layer.
///
/// # Safety
///
/// All methods forward raw pointers to native code. Callers must uphold the
/// C contracts: valid NUL-terminated strings, live state and handle
/// pointers, and buffers of at least the stated size.
#[allow(clippy::missing_safety_doc)]
pub trait UgApi: Send + Sync {
    unsafe fn init(&self, argc: c_int, argv: *mut *mut c_char, client: bool) -> *mut UgState;
    unsafe fn shutdown(&self, state: *mut UgState) -> c_int;

    unsafe fn state_gateway(&self, state: *mut UgState) -> *mut SgGateway;
    unsafe fn state_owner_id(&self, state: *mut UgState) -> u64;
    unsafe fn state_volume_id(&self, state: *mut UgState) -> u64;
    unsafe fn gateway_first_arg_optind(&self, gateway: *mut SgGateway) -> c_int;

    unsafe fn md_entry_free(&self, ent: *mut MdEntry) -> c_int;

    unsafe fn stat(&self, state: *mut UgState, path: *const c_char, buf: *mut libc::stat) -> c_int;
    unsafe fn stat_raw(&self, state: *mut UgState, path: *const c_char, ent: *mut MdEntry) -> c_int;
    unsafe fn statvfs(&self, state: *mut UgState, buf: *mut libc::statvfs) -> c_int;
    unsafe fn mkdir(&self, state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
    unsafe fn unlink(&self, state: *mut UgState, path: *const c_char) -> c_int;
    unsafe fn rmdir(&self, state: *mut UgState, path: *const c_char) -> c_int;
    unsafe fn rename(&self, state: *mut UgState, path: *const c_char, newpath: *const c_char) -> c_int;
    unsafe fn chmod(&self, state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
    unsafe fn chown(&self, state: *mut UgState, path: *const c_char, new_owner: u64) -> c_int;
    unsafe fn utime(&self, state: *mut UgState, path: *const c_char, ubuf: *mut libc::utimbuf) -> c_int;
    unsafe fn truncate(&self, state: *mut UgState, path: *const c_char, size: off_t) -> c_int;
    unsafe fn access(&self, state: *mut UgState, path: *const c_char, mask: c_int) -> c_int;
    unsafe fn invalidate(&self, state: *mut UgState, path: *const c_char) -> c_int;
    unsafe fn refresh(&self, state: *mut UgState, path: *const c_char) -> c_int;

    unsafe fn open(&self, state: *mut UgState, path: *const c_char, flags: c_int, rc: *mut c_int) -> *mut UgHandle;
    unsafe fn create(&self, state: *mut UgState, path: *const c_char, mode: mode_t, rc: *mut c_int) -> *mut UgHandle;
    unsafe fn read(&self, state: *mut UgState, buf: *mut c_char, size: size_t, fi: *mut UgHandle) -> c_int;
    unsafe fn write(&self, state: *mut UgState, buf: *const c_char, size: size_t, fi: *mut UgHandle) -> c_int;
    unsafe fn seek(&self, fi: *mut UgHandle, pos: off_t, whence: c_int) -> off_t;
    unsafe fn close(&self, state: *mut UgState, fi: *mut UgHandle) -> c_int;
    unsafe fn fsync(&self, state: *mut UgState, fi: *mut UgHandle) -> c_int;
    unsafe fn ftruncate(&self, state: *mut UgState, size: off_t, fi: *mut UgHandle) -> c_int;

    unsafe fn opendir(&self, state: *mut UgState, path: *const c_char, rc: *mut c_int) -> *mut UgHandle;
    unsafe fn readdir(&self, state: *mut UgState, listing: *mut *mut *mut MdEntry, num: size_t, fi: *mut UgHandle) -> c_int;
    unsafe fn closedir(&self, state: *mut UgState, fi: *mut UgHandle) -> c_int;
    unsafe fn free_dir_listing(&self, listing: *mut *mut MdEntry);

    unsafe fn setxattr(&self, state: *mut UgState, path: *const c_char, name: *const c_char, value: *const c_char, size: size_t, flags: c_int) -> c_int;
    unsafe fn getxattr(&self, state: *mut UgState, path: *const c_char, name: *const c_char, value: *mut c_char, size: size_t) -> c_int;
    unsafe fn listxattr(&self, state: *mut UgState, path: *const c_char, list: *mut c_char, size: size_t) -> c_int;
    unsafe fn removexattr(&self, state: *mut UgState, path: *const c_char, name: *const c_char) -> c_int;

    unsafe fn vacuum_begin(&self, state: *mut UgState, path: *const c_char, vctx: *mut *mut UgVacuumContext) -> c_int;
    unsafe fn vacuum_wait(&self, vctx: *mut UgVacuumContext) -> c_int;
}

/// Forward each trait method to the matching table entry.
macro_rules! forward {
    ($($method:ident => $table:ident . $sym:ident ( $($arg:ident : $aty:ty),* ) -> $ret:ty;)*) => {
        $(
            unsafe fn $method(&self, $($arg: $aty),*) -> $ret {
                (self.$table.$sym)($($arg),*)
            }
        )*
    };
}

impl UgApi for UgLibrary {
    forward! {
        init => ug.UG_init(argc: c_int, argv: *mut *mut c_char, client: bool) -> *mut UgState;
        shutdown => ug.UG_shutdown(state: *mut UgState) -> c_int;

        state_gateway => ug.UG_state_gateway(state: *mut UgState) -> *mut SgGateway;
        state_owner_id => ug.UG_state_owner_id(state: *mut UgState) -> u64;
        state_volume_id => ug.UG_state_volume_id(state: *mut UgState) -> u64;
        gateway_first_arg_optind => syndicate.SG_gateway_first_arg_optind(gateway: *mut SgGateway) -> c_int;

        md_entry_free => syndicate.md_entry_free(ent: *mut MdEntry) -> c_int;

        stat => ug.UG_stat(state: *mut UgState, path: *const c_char, buf: *mut libc::stat) -> c_int;
        stat_raw => ug.UG_stat_raw(state: *mut UgState, path: *const c_char, ent: *mut MdEntry) -> c_int;
        statvfs => ug.UG_statvfs(state: *mut UgState, buf: *mut libc::statvfs) -> c_int;
        mkdir => ug.UG_mkdir(state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
        unlink => ug.UG_unlink(state: *mut UgState, path: *const c_char) -> c_int;
        rmdir => ug.UG_rmdir(state: *mut UgState, path: *const c_char) -> c_int;
        rename => ug.UG_rename(state: *mut UgState, path: *const c_char, newpath: *const c_char) -> c_int;
        chmod => ug.UG_chmod(state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int;
        chown => ug.UG_chown(state: *mut UgState, path: *const c_char, new_owner: u64) -> c_int;
        utime => ug.UG_utime(state: *mut UgState, path: *const c_char, ubuf: *mut libc::utimbuf) -> c_int;
        truncate => ug.UG_truncate(state: *mut UgState, path: *const c_char, size: off_t) -> c_int;
        access => ug.UG_access(state: *mut UgState, path: *const c_char, mask: c_int) -> c_int;
        invalidate => ug.UG_invalidate(state: *mut UgState, path: *const c_char) -> c_int;
        refresh => ug.UG_refresh(state: *mut UgState, path: *const c_char) -> c_int;

        open => ug.UG_open(state: *mut UgState, path: *const c_char, flags: c_int, rc: *mut c_int) -> *mut UgHandle;
        create => ug.UG_create(state: *mut UgState, path: *const c_char, mode: mode_t, rc: *mut c_int) -> *mut UgHandle;
        read => ug.UG_read(state: *mut UgState, buf: *mut c_char, size: size_t, fi: *mut UgHandle) -> c_int;
        write => ug.UG_write(state: *mut UgState, buf: *const c_char, size: size_t, fi: *mut UgHandle) -> c_int;
        seek => ug.UG_seek(fi: *mut UgHandle, pos: off_t, whence: c_int) -> off_t;
        close => ug.UG_close(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        fsync => ug.UG_fsync(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        ftruncate => ug.UG_ftruncate(state: *mut UgState, size: off_t, fi: *mut UgHandle) -> c_int;

        opendir => ug.UG_opendir(state: *mut UgState, path: *const c_char, rc: *mut c_int) -> *mut UgHandle;
        readdir => ug.UG_readdir(state: *mut UgState, listing: *mut *mut *mut MdEntry, num: size_t, fi: *mut UgHandle) -> c_int;
        closedir => ug.UG_closedir(state: *mut UgState, fi: *mut UgHandle) -> c_int;
        free_dir_listing => ug.UG_free_dir_listing(listing: *mut *mut MdEntry) -> ();

        setxattr => ug.UG_setxattr(state: *mut UgState, path: *const c_char, name: *const c_char, value: *const c_char, size: size_t, flags: c_int) -> c_int;
        getxattr => ug.UG_getxattr(state: *mut UgState, path: *const c_char, name: *const c_char, value: *mut c_char, size: size_t) -> c_int;
        listxattr => ug.UG_listxattr(state: *mut UgState, path: *const c_char, list: *mut c_char, size: size_t) -> c_int;
        removexattr => ug.UG_removexattr(state: *mut UgState, path: *const c_char, name: *const c_char) -> c_int;

        vacuum_begin => ug.UG_vacuum_begin(state: *mut UgState, path: *const c_char, vctx: *mut *mut UgVacuumContext) -> c_int;
        vacuum_wait => ug.UG_vacuum_wait(vctx: *mut UgVacuumContext) -> c_int;
    }
}
