//! Owned UG session and the path-based operations.

use std::ffi::{CStr, CString};
use std::ptr::{self, NonNull};

use libc::{c_char, c_int, mode_t, off_t};
use syndicate_config::{log_loader_info, log_ug_debug, log_ug_warn};
use syndicate_sys::{LibraryPaths, MdEntry, UgApi, UgLibrary, UgState, UgVacuumContext};

use crate::entry::{DirEntry, Stat, Statvfs};
use crate::error::{Result, SyndicateError};
use crate::options::{default_dir_mode, InitOptions, XattrFlags};

struct StatePtr(NonNull<UgState>);

// SAFETY: UG_state guards itself with its own rwlock; the pointer is only
// handed back to the native library.
unsafe impl Send for StatePtr {}
unsafe impl Sync for StatePtr {}

/// argv given to `UG_init`. The native option parser may permute `ptrs` and
/// keep pointers into `strings`, so both live as long as the session.
struct Argv {
    strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

unsafe impl Send for Argv {}
unsafe impl Sync for Argv {}

impl Argv {
    fn new(args: &[String]) -> Result<Self> {
        let strings = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| SyndicateError::InvalidArgument("option contains a NUL byte"))?;
        let mut ptrs: Vec<*mut c_char> = strings.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        ptrs.push(ptr::null_mut());
        Ok(Self { strings, ptrs })
    }

    fn argc(&self) -> c_int {
        self.strings.len() as c_int
    }
}

/// A running User Gateway.
///
/// Every method validates its arguments before touching native code. The
/// session is shut down by [`Client::shutdown`] or, failing that, on drop.
pub struct Client<A: UgApi = UgLibrary> {
    api: A,
    state: Option<StatePtr>,
    argv: Option<Argv>,
    pub(crate) readdir_batch: usize,
}

impl Client<UgLibrary> {
    /// Load the native libraries from `paths` and start a gateway.
    pub fn load(paths: &LibraryPaths, opts: &InitOptions) -> Result<Self> {
        let lib = UgLibrary::load(paths)?;
        log_loader_info!("native libraries loaded", ug = paths.ug.display().to_string());
        Self::init(lib, opts)
    }
}

impl<A: UgApi> Client<A> {
    /// Start a gateway with `opts` translated to a command line.
    pub fn init(api: A, opts: &InitOptions) -> Result<Self> {
        let mut argv = Argv::new(&opts.to_argv())?;
        log_ug_debug!("UG_init", argc = argv.argc(), anonymous = opts.anonymous);

        let state = unsafe { api.init(argv.argc(), argv.ptrs.as_mut_ptr(), opts.anonymous) };
        let state = NonNull::new(state).ok_or(SyndicateError::InitFailed)?;

        Ok(Self {
            api,
            state: Some(StatePtr(state)),
            argv: Some(argv),
            readdir_batch: 1,
        })
    }

    /// Adopt a state created elsewhere. The client takes over shutting it down.
    ///
    /// # Safety
    ///
    /// `state` must be null or a live `UG_state` produced by the same library
    /// `api` wraps, not owned by anything else.
    pub unsafe fn from_raw(api: A, state: *mut UgState) -> Result<Self> {
        let state = NonNull::new(state).ok_or(SyndicateError::InvalidArgument("null UG state"))?;
        Ok(Self {
            api,
            state: Some(StatePtr(state)),
            argv: None,
            readdir_batch: 1,
        })
    }

    /// Entries requested per `UG_readdir` call (at least 1).
    pub fn with_readdir_batch(mut self, batch: usize) -> Self {
        self.readdir_batch = batch.max(1);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Raw state pointer, null once shut down.
    pub fn as_raw(&self) -> *mut UgState {
        self.state.as_ref().map_or(ptr::null_mut(), |s| s.0.as_ptr())
    }

    pub(crate) fn state(&self) -> Result<*mut UgState> {
        self.state
            .as_ref()
            .map(|s| s.0.as_ptr())
            .ok_or(SyndicateError::InvalidArgument("client is shut down"))
    }

    /// Run `f` against the live state. For calls this type does not wrap.
    pub fn with_raw<R>(&self, f: impl FnOnce(&A, *mut UgState) -> R) -> Result<R> {
        let state = self.state()?;
        Ok(f(&self.api, state))
    }

    /// Stop the gateway.
    pub fn shutdown(mut self) -> Result<()> {
        let state = self.state()?;
        self.state = None;
        log_ug_debug!("UG_shutdown");
        let rc = unsafe { self.api.shutdown(state) };
        check(rc, || "Failed to shut down the gateway".to_string())
    }

    // === identity ===

    /// Index of the first command-line argument the gateway did not consume.
    pub fn first_arg_optind(&self) -> Result<usize> {
        let state = self.state()?;
        let gateway = unsafe { self.api.state_gateway(state) };
        if gateway.is_null() {
            return Err(SyndicateError::native("Failed to get the gateway", -libc::EINVAL as i64));
        }
        let optind = unsafe { self.api.gateway_first_arg_optind(gateway) };
        if optind < 0 {
            return Err(SyndicateError::native("Failed to get the first argument index", optind as i64));
        }
        Ok(optind as usize)
    }

    /// Arguments left after the gateway's own options, as the native parser
    /// ordered them. Empty for clients built with [`Client::from_raw`].
    pub fn remaining_args(&self) -> Result<Vec<String>> {
        let Some(argv) = self.argv.as_ref() else {
            return Ok(Vec::new());
        };
        let start = self.first_arg_optind()?;
        let end = argv.strings.len();
        Ok(argv.ptrs[start.min(end)..end]
            .iter()
            .filter(|p| !p.is_null())
            .map(|&p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
            .collect())
    }

    pub fn owner_id(&self) -> Result<u64> {
        let state = self.state()?;
        Ok(unsafe { self.api.state_owner_id(state) })
    }

    pub fn volume_id(&self) -> Result<u64> {
        let state = self.state()?;
        Ok(unsafe { self.api.state_volume_id(state) })
    }

    // === metadata ===

    /// Full metadata record for `path`.
    pub fn stat_raw(&self, path: &str) -> Result<DirEntry> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let mut ent = MdEntry::zeroed();

        let rc = unsafe { self.api.stat_raw(state, cpath.as_ptr(), &mut ent) };
        check(rc, || format!("Failed to stat a file '{}'", path))?;

        let entry = unsafe { DirEntry::from_raw(&ent) };
        let rc = unsafe { self.api.md_entry_free(&mut ent) };
        if rc != 0 {
            log_ug_warn!("md_entry_free failed", path = path, rc = rc);
        }
        Ok(entry)
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        let rc = unsafe { self.api.stat(state, cpath.as_ptr(), &mut st) };
        check(rc, || format!("Failed to stat a file '{}'", path))?;
        Ok(Stat::from(&st))
    }

    pub fn statvfs(&self) -> Result<Statvfs> {
        let state = self.state()?;
        let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { self.api.statvfs(state, &mut st) };
        check(rc, || "Failed to stat the volume".to_string())?;
        Ok(Statvfs::from(&st))
    }

    // === namespace ===

    /// Create a directory. `None` uses `0o777` masked by the umask.
    pub fn mkdir(&self, path: &str, mode: Option<mode_t>) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let mode = mode.unwrap_or_else(default_dir_mode);
        log_ug_debug!("mkdir", path = path, mode = mode);
        let rc = unsafe { self.api.mkdir(state, cpath.as_ptr(), mode) };
        check(rc, || format!("Failed to make a directory '{}'", path))
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.rmdir(state, cpath.as_ptr()) };
        check(rc, || format!("Failed to remove a directory '{}'", path))
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.unlink(state, cpath.as_ptr()) };
        check(rc, || format!("Failed to unlink a file '{}'", path))
    }

    pub fn rename(&self, path: &str, new_path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let cnew = c_arg(new_path, "new path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.rename(state, cpath.as_ptr(), cnew.as_ptr()) };
        check(rc, || format!("Failed to rename '{}' to '{}'", path, new_path))
    }

    pub fn chmod(&self, path: &str, mode: mode_t) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.chmod(state, cpath.as_ptr(), mode) };
        check(rc, || format!("Failed to change the mode of '{}'", path))
    }

    /// Hand `path` to another gateway owner.
    pub fn chown(&self, path: &str, new_owner: u64) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.chown(state, cpath.as_ptr(), new_owner) };
        check(rc, || format!("Failed to change the owner of '{}'", path))
    }

    /// Set access and modification times (seconds since the epoch).
    pub fn utime(&self, path: &str, atime: i64, mtime: i64) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let mut times = libc::utimbuf {
            actime: atime as libc::time_t,
            modtime: mtime as libc::time_t,
        };
        let rc = unsafe { self.api.utime(state, cpath.as_ptr(), &mut times) };
        check(rc, || format!("Failed to set the times of '{}'", path))
    }

    pub fn truncate(&self, path: &str, len: i64) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        if len < 0 {
            return Err(SyndicateError::InvalidArgument("length must not be negative"));
        }
        let state = self.state()?;
        let rc = unsafe { self.api.truncate(state, cpath.as_ptr(), len as off_t) };
        check(rc, || format!("Failed to truncate a file '{}'", path))
    }

    /// `access(2)` check with `mask` built from `libc::{R_OK, W_OK, X_OK, F_OK}`.
    pub fn access(&self, path: &str, mask: c_int) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.access(state, cpath.as_ptr(), mask) };
        check(rc, || format!("Failed to access '{}'", path))
    }

    /// Drop cached metadata for `path`.
    pub fn invalidate(&self, path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.invalidate(state, cpath.as_ptr()) };
        check(rc, || format!("Failed to invalidate '{}'", path))
    }

    /// Re-fetch metadata for `path` from the metadata service.
    pub fn refresh(&self, path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.refresh(state, cpath.as_ptr()) };
        check(rc, || format!("Failed to refresh '{}'", path))
    }

    /// Garbage-collect old write data for `path` and wait for it to finish.
    pub fn vacuum(&self, path: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let mut vctx: *mut UgVacuumContext = ptr::null_mut();
        let rc = unsafe { self.api.vacuum_begin(state, cpath.as_ptr(), &mut vctx) };
        check(rc, || format!("Failed to start vacuuming '{}'", path))?;
        if vctx.is_null() {
            return Ok(());
        }
        let rc = unsafe { self.api.vacuum_wait(vctx) };
        check(rc, || format!("Failed to vacuum '{}'", path))
    }

    // === xattrs ===

    pub fn set_xattr(&self, path: &str, key: &str, value: &[u8], flags: XattrFlags) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let ckey = c_arg(key, "key must not be empty")?;
        if value.is_empty() {
            return Err(SyndicateError::InvalidArgument("value must not be empty"));
        }
        let state = self.state()?;
        let rc = unsafe {
            self.api.setxattr(
                state,
                cpath.as_ptr(),
                ckey.as_ptr(),
                value.as_ptr() as *const c_char,
                value.len(),
                flags.bits(),
            )
        };
        check(rc, || format!("Failed to set an extended attribute '{}' of '{}'", key, path))
    }

    /// Value of `key`. The size is probed first; an empty value costs one call.
    pub fn get_xattr(&self, path: &str, key: &str) -> Result<Vec<u8>> {
        let cpath = c_arg(path, "path must not be empty")?;
        let ckey = c_arg(key, "key must not be empty")?;
        let state = self.state()?;
        let context = || format!("Failed to get an extended attribute '{}' of '{}'", key, path);

        let size = unsafe { self.api.getxattr(state, cpath.as_ptr(), ckey.as_ptr(), ptr::null_mut(), 0) };
        let size = length(size, context)?;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = alloc_buffer(size)?;
        let got = unsafe {
            self.api.getxattr(state, cpath.as_ptr(), ckey.as_ptr(), buf.as_mut_ptr() as *mut c_char, size)
        };
        buf.truncate(length(got, context)?.min(size));
        Ok(buf)
    }

    /// Names of all extended attributes of `path`.
    pub fn list_xattr(&self, path: &str) -> Result<Vec<String>> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        let context = || format!("Failed to list extended attributes of '{}'", path);

        let size = unsafe { self.api.listxattr(state, cpath.as_ptr(), ptr::null_mut(), 0) };
        let size = length(size, context)?;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = alloc_buffer(size)?;
        let got = unsafe { self.api.listxattr(state, cpath.as_ptr(), buf.as_mut_ptr() as *mut c_char, size) };
        buf.truncate(length(got, context)?.min(size));
        Ok(split_xattr_names(&buf))
    }

    pub fn remove_xattr(&self, path: &str, key: &str) -> Result<()> {
        let cpath = c_arg(path, "path must not be empty")?;
        let ckey = c_arg(key, "key must not be empty")?;
        let state = self.state()?;
        let rc = unsafe { self.api.removexattr(state, cpath.as_ptr(), ckey.as_ptr()) };
        check(rc, || format!("Failed to remove an extended attribute '{}' of '{}'", key, path))
    }
}

impl<A: UgApi> Drop for Client<A> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            let rc = unsafe { self.api.shutdown(state.0.as_ptr()) };
            if rc != 0 {
                log_ug_warn!("UG_shutdown failed on drop", rc = rc);
            }
        }
    }
}

impl<A: UgApi> std::fmt::Debug for Client<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.as_raw())
            .field("readdir_batch", &self.readdir_batch)
            .finish()
    }
}

/// Non-empty, NUL-free C string or `InvalidArgument(what)`.
pub(crate) fn c_arg(value: &str, what: &'static str) -> Result<CString> {
    if value.is_empty() {
        return Err(SyndicateError::InvalidArgument(what));
    }
    CString::new(value).map_err(|_| SyndicateError::InvalidArgument("argument contains a NUL byte"))
}

/// Status-returning UG calls succeed with exactly 0.
pub(crate) fn check(rc: c_int, context: impl FnOnce() -> String) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(SyndicateError::native(context(), rc as i64))
    }
}

/// Length-returning UG calls fail with a negative errno.
pub(crate) fn length(rc: c_int, context: impl FnOnce() -> String) -> Result<usize> {
    if rc < 0 {
        Err(SyndicateError::native(context(), rc as i64))
    } else {
        Ok(rc as usize)
    }
}

/// Zero-filled buffer of `size` bytes, reporting allocation failure.
pub(crate) fn alloc_buffer(size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| SyndicateError::OutOfMemory { requested: size })?;
    buf.resize(size, 0);
    Ok(buf)
}

/// Split a `listxattr` buffer of NUL-terminated names.
fn split_xattr_names(buf: &[u8]) -> Vec<String> {
    buf.split(|&b| b == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_arg_validation() {
        assert!(matches!(c_arg("", "empty"), Err(SyndicateError::InvalidArgument("empty"))));
        assert!(matches!(c_arg("a\0b", "x"), Err(SyndicateError::InvalidArgument(_))));
        assert_eq!(c_arg("/a", "x").unwrap().as_bytes(), b"/a");
    }

    #[test]
    fn test_check_and_length() {
        assert!(check(0, || unreachable!()).is_ok());
        let err = check(-13, || "ctx".into()).unwrap_err();
        assert_eq!(err.errno(), Some(libc::EACCES));
        assert_eq!(length(7, || unreachable!()).unwrap(), 7);
        assert_eq!(length(-5, || "ctx".into()).unwrap_err().errno(), Some(libc::EIO));
    }

    #[test]
    fn test_split_xattr_names() {
        assert_eq!(
            split_xattr_names(b"user.a\0user.bb\0"),
            vec!["user.a".to_string(), "user.bb".to_string()]
        );
        assert!(split_xattr_names(b"").is_empty());
    }

    #[test]
    fn test_argv_is_null_terminated() {
        let argv = Argv::new(&["prog".into(), "-u".into(), "alice".into()]).unwrap();
        assert_eq!(argv.argc(), 3);
        assert_eq!(argv.ptrs.len(), 4);
        assert!(argv.ptrs[3].is_null());
        assert!(Argv::new(&["bad\0arg".into()]).is_err());
    }
}
