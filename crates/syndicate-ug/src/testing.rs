//! In-memory stand-in for the native UG stack.
//!
//! `MockUg` implements [`UgApi`] over a small path → node map, records every
//! call by its native symbol name, and tracks every allocation it hands out
//! so tests can assert that handles and listings are released.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ffi::{CStr, CString};
use std::ptr::{self, NonNull};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use libc::{c_char, c_int, mode_t, off_t, size_t};
use syndicate_sys::{
    MdEntry, SgGateway, UgApi, UgHandle, UgHandleInner, UgState, UgVacuumContext, MD_ENTRY_DIRECTORY,
    MD_ENTRY_FILE, O_RDONLY, SEEK_CUR, SEEK_END, SEEK_SET, UG_TYPE_DIR, UG_TYPE_FILE, XATTR_CREATE,
    XATTR_REPLACE,
};

use crate::entry::XATTR_HASH_LEN;

pub const MOCK_OWNER_ID: u64 = 1000;
pub const MOCK_VOLUME_ID: u64 = 7;

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mode: mode_t },
    Dir { mode: mode_t },
}

struct OpenFile {
    path: String,
    flags: c_int,
}

struct OpenDir {
    remaining: VecDeque<String>,
    batches: usize,
}

#[derive(Default)]
struct MockState {
    calls: Vec<&'static str>,
    argv: Vec<String>,
    client_flag: Option<bool>,
    init_fails: bool,
    first_arg_optind: c_int,

    nodes: BTreeMap<String, Node>,
    ids: HashMap<String, u64>,
    next_id: u64,
    xattrs: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    owners: HashMap<String, u64>,
    times: HashMap<String, (i64, i64)>,

    failures: HashMap<&'static str, VecDeque<c_int>>,
    read_chunk: Option<usize>,
    write_chunk: Option<usize>,
    null_listing_after: Option<usize>,
    last_readdir_batch: Option<usize>,

    files: HashMap<usize, OpenFile>,
    dirs: HashMap<usize, OpenDir>,
    live_states: usize,
    live_batches: usize,
    live_vacuums: usize,
    entries_freed: usize,
}

impl MockState {
    fn record(&mut self, symbol: &'static str) -> Option<c_int> {
        self.calls.push(symbol);
        self.failures.get_mut(symbol).and_then(VecDeque::pop_front)
    }

    fn id_of(&mut self, path: &str) -> u64 {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }
        self.next_id += 1;
        self.ids.insert(path.to_string(), self.next_id);
        self.next_id
    }

    fn children(&self, dir: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|p| p.as_str() != "/" && parent_of(p) == dir)
            .cloned()
            .collect()
    }

    fn fill_entry(&mut self, path: &str, ent: &mut MdEntry) {
        let Some(node) = self.nodes.get(path).cloned() else {
            return;
        };
        let file_id = self.id_of(path);
        let parent_id = self.id_of(parent_of(path));
        let name = if path == "/" { "/" } else { basename(path) };

        *ent = MdEntry::zeroed();
        ent.name = CString::new(name).unwrap_or_default().into_raw();
        ent.file_id = file_id;
        ent.parent_id = parent_id;
        ent.owner = self.owners.get(path).copied().unwrap_or(MOCK_OWNER_ID);
        ent.volume = MOCK_VOLUME_ID;
        ent.version = 1;
        if let Some((atime, mtime)) = self.times.get(path) {
            ent.ctime_sec = *atime;
            ent.mtime_sec = *mtime;
        }
        match node {
            Node::File { data, mode } => {
                ent.entry_type = MD_ENTRY_FILE;
                ent.size = data.len() as off_t;
                ent.mode = mode;
            }
            Node::Dir { mode } => {
                ent.entry_type = MD_ENTRY_DIRECTORY;
                ent.mode = mode;
                ent.num_children = self.children(path).len() as i64;
            }
        }

        let sig: Box<[u8]> = format!("sig:{}", name).into_bytes().into_boxed_slice();
        ent.ent_sig_len = sig.len();
        ent.ent_sig = Box::into_raw(sig) as *mut c_char;
        if self.xattrs.get(path).is_some_and(|x| !x.is_empty()) {
            let hash = Box::new([0x11u8; XATTR_HASH_LEN]);
            ent.xattr_hash = Box::into_raw(hash) as *mut c_char;
        }
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Release what `fill_entry` allocated inside `ent`.
unsafe fn free_entry_fields(ent: &mut MdEntry) {
    if !ent.name.is_null() {
        drop(CString::from_raw(ent.name));
        ent.name = ptr::null_mut();
    }
    if !ent.ent_sig.is_null() {
        let slice = ptr::slice_from_raw_parts_mut(ent.ent_sig as *mut u8, ent.ent_sig_len);
        drop(Box::from_raw(slice));
        ent.ent_sig = ptr::null_mut();
        ent.ent_sig_len = 0;
    }
    if !ent.xattr_hash.is_null() {
        drop(Box::from_raw(ent.xattr_hash as *mut [u8; XATTR_HASH_LEN]));
        ent.xattr_hash = ptr::null_mut();
    }
}

unsafe fn c_str(p: *const c_char) -> String {
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

fn new_handle(handle_type: c_int) -> *mut UgHandle {
    Box::into_raw(Box::new(UgHandle {
        handle_type,
        offset: 0,
        inner: UgHandleInner { fh: ptr::null_mut() },
    }))
}

/// Recording, in-memory [`UgApi`].
///
/// Clones share state, so a test can keep one clone while a `Client` owns
/// another.
#[derive(Clone, Default)]
pub struct MockUg {
    state: Arc<Mutex<MockState>>,
}

impl MockUg {
    /// An empty volume containing only `/`.
    pub fn new() -> Self {
        let mock = Self::default();
        mock.lock().nodes.insert("/".into(), Node::Dir { mode: 0o755 });
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === setup ===

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        self.lock().nodes.insert(
            path.into(),
            Node::File {
                data: data.to_vec(),
                mode: 0o644,
            },
        );
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.lock().nodes.insert(path.into(), Node::Dir { mode: 0o755 });
        self
    }

    pub fn with_xattr(self, path: &str, key: &str, value: &[u8]) -> Self {
        self.lock()
            .xattrs
            .entry(path.into())
            .or_default()
            .insert(key.into(), value.to_vec());
        self
    }

    /// Make the next call to `symbol` fail with `-errno`.
    pub fn fail_next(&self, symbol: &'static str, errno: i32) {
        self.lock().failures.entry(symbol).or_default().push_back(-errno);
    }

    /// Cap the bytes a single `UG_read` returns.
    pub fn set_read_chunk(&self, chunk: Option<usize>) {
        self.lock().read_chunk = chunk;
    }

    /// Cap the bytes a single `UG_write` accepts. `Some(0)` makes writes stall.
    pub fn set_write_chunk(&self, chunk: Option<usize>) {
        self.lock().write_chunk = chunk;
    }

    /// After `batches` batches on a handle, `UG_readdir` succeeds but
    /// leaves the listing null.
    pub fn set_null_listing_after(&self, batches: Option<usize>) {
        self.lock().null_listing_after = batches;
    }

    pub fn set_first_arg_optind(&self, optind: c_int) {
        self.lock().first_arg_optind = optind;
    }

    pub fn set_init_fails(&self, fails: bool) {
        self.lock().init_fails = fails;
    }

    // === inspection ===

    /// Native symbols called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn count(&self, symbol: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == symbol).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// argv seen by the last `UG_init`.
    pub fn argv(&self) -> Vec<String> {
        self.lock().argv.clone()
    }

    pub fn client_flag(&self) -> Option<bool> {
        self.lock().client_flag
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(path)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.lock().nodes.get(path), Some(Node::Dir { .. }))
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn mode_of(&self, path: &str) -> Option<mode_t> {
        match self.lock().nodes.get(path)? {
            Node::File { mode, .. } | Node::Dir { mode } => Some(*mode),
        }
    }

    pub fn owner_of(&self, path: &str) -> Option<u64> {
        self.lock().owners.get(path).copied()
    }

    pub fn times_of(&self, path: &str) -> Option<(i64, i64)> {
        self.lock().times.get(path).copied()
    }

    pub fn xattr(&self, path: &str, key: &str) -> Option<Vec<u8>> {
        self.lock().xattrs.get(path)?.get(key).cloned()
    }

    /// File and directory handles not yet closed.
    pub fn live_handles(&self) -> usize {
        let st = self.lock();
        st.files.len() + st.dirs.len()
    }

    /// Directory batches not yet freed.
    pub fn live_batches(&self) -> usize {
        self.lock().live_batches
    }

    /// The `num` argument of the most recent `UG_readdir`.
    pub fn last_readdir_batch(&self) -> Option<usize> {
        self.lock().last_readdir_batch
    }

    pub fn live_states(&self) -> usize {
        self.lock().live_states
    }

    pub fn live_vacuums(&self) -> usize {
        self.lock().live_vacuums
    }

    /// Entries whose strings were released via `md_entry_free`.
    pub fn entries_freed(&self) -> usize {
        self.lock().entries_freed
    }
}

macro_rules! fail_or {
    ($st:ident, $symbol:literal) => {
        if let Some(rc) = $st.record($symbol) {
            return rc;
        }
    };
}

impl UgApi for MockUg {
    unsafe fn init(&self, argc: c_int, argv: *mut *mut c_char, client: bool) -> *mut UgState {
        let mut st = self.lock();
        st.calls.push("UG_init");
        st.argv = (0..argc as usize).map(|i| c_str(*argv.add(i))).collect();
        st.client_flag = Some(client);
        if st.init_fails {
            return ptr::null_mut();
        }
        st.live_states += 1;
        Box::into_raw(Box::new(std::mem::zeroed::<UgState>()))
    }

    unsafe fn shutdown(&self, state: *mut UgState) -> c_int {
        let mut st = self.lock();
        st.calls.push("UG_shutdown");
        drop(Box::from_raw(state));
        st.live_states -= 1;
        0
    }

    unsafe fn state_gateway(&self, _state: *mut UgState) -> *mut SgGateway {
        self.lock().calls.push("UG_state_gateway");
        NonNull::<SgGateway>::dangling().as_ptr()
    }

    unsafe fn state_owner_id(&self, _state: *mut UgState) -> u64 {
        self.lock().calls.push("UG_state_owner_id");
        MOCK_OWNER_ID
    }

    unsafe fn state_volume_id(&self, _state: *mut UgState) -> u64 {
        self.lock().calls.push("UG_state_volume_id");
        MOCK_VOLUME_ID
    }

    unsafe fn gateway_first_arg_optind(&self, _gateway: *mut SgGateway) -> c_int {
        let mut st = self.lock();
        st.calls.push("SG_gateway_first_arg_optind");
        st.first_arg_optind
    }

    unsafe fn md_entry_free(&self, ent: *mut MdEntry) -> c_int {
        let mut st = self.lock();
        st.calls.push("md_entry_free");
        free_entry_fields(&mut *ent);
        st.entries_freed += 1;
        0
    }

    unsafe fn stat(&self, _state: *mut UgState, path: *const c_char, buf: *mut libc::stat) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_stat");
        let path = c_str(path);
        let buf = &mut *buf;
        match st.nodes.get(&path) {
            Some(Node::File { data, mode }) => {
                buf.st_mode = libc::S_IFREG | mode;
                buf.st_size = data.len() as off_t;
            }
            Some(Node::Dir { mode }) => buf.st_mode = libc::S_IFDIR | mode,
            None => return -libc::ENOENT,
        }
        buf.st_nlink = 1;
        buf.st_ino = st.id_of(&path) as libc::ino_t;
        0
    }

    unsafe fn stat_raw(&self, _state: *mut UgState, path: *const c_char, ent: *mut MdEntry) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_stat_raw");
        let path = c_str(path);
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        st.fill_entry(&path, &mut *ent);
        0
    }

    unsafe fn statvfs(&self, _state: *mut UgState, buf: *mut libc::statvfs) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_statvfs");
        let buf = &mut *buf;
        buf.f_bsize = 4096;
        buf.f_frsize = 4096;
        buf.f_blocks = 1024;
        buf.f_files = st.nodes.len() as libc::fsfilcnt_t;
        buf.f_namemax = 255;
        0
    }

    unsafe fn mkdir(&self, _state: *mut UgState, path: *const c_char, mode: mode_t) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_mkdir");
        let path = c_str(path);
        if st.nodes.contains_key(&path) {
            return -libc::EEXIST;
        }
        if !matches!(st.nodes.get(parent_of(&path)), Some(Node::Dir { .. })) {
            return -libc::ENOENT;
        }
        st.nodes.insert(path, Node::Dir { mode });
        0
    }

    unsafe fn unlink(&self, _state: *mut UgState, path: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_unlink");
        let path = c_str(path);
        match st.nodes.get(&path) {
            Some(Node::File { .. }) => {
                st.nodes.remove(&path);
                st.xattrs.remove(&path);
                0
            }
            Some(Node::Dir { .. }) => -libc::EISDIR,
            None => -libc::ENOENT,
        }
    }

    unsafe fn rmdir(&self, _state: *mut UgState, path: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_rmdir");
        let path = c_str(path);
        match st.nodes.get(&path) {
            Some(Node::Dir { .. }) if !st.children(&path).is_empty() => -libc::ENOTEMPTY,
            Some(Node::Dir { .. }) => {
                st.nodes.remove(&path);
                0
            }
            Some(Node::File { .. }) => -libc::ENOTDIR,
            None => -libc::ENOENT,
        }
    }

    unsafe fn rename(&self, _state: *mut UgState, path: *const c_char, newpath: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_rename");
        let (from, to) = (c_str(path), c_str(newpath));
        if !st.nodes.contains_key(&from) {
            return -libc::ENOENT;
        }
        let prefix = format!("{}/", from);
        let moved: Vec<String> = st
            .nodes
            .keys()
            .filter(|p| **p == from || p.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            let new = format!("{}{}", to, &old[from.len()..]);
            if let Some(node) = st.nodes.remove(&old) {
                st.nodes.insert(new.clone(), node);
            }
            if let Some(x) = st.xattrs.remove(&old) {
                st.xattrs.insert(new, x);
            }
        }
        0
    }

    unsafe fn chmod(&self, _state: *mut UgState, path: *const c_char, new_mode: mode_t) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_chmod");
        match st.nodes.get_mut(&c_str(path)) {
            Some(Node::File { mode, .. }) | Some(Node::Dir { mode }) => {
                *mode = new_mode;
                0
            }
            None => -libc::ENOENT,
        }
    }

    unsafe fn chown(&self, _state: *mut UgState, path: *const c_char, new_owner: u64) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_chown");
        let path = c_str(path);
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        st.owners.insert(path, new_owner);
        0
    }

    unsafe fn utime(&self, _state: *mut UgState, path: *const c_char, ubuf: *mut libc::utimbuf) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_utime");
        let path = c_str(path);
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        let times = &*ubuf;
        st.times.insert(path, (times.actime as i64, times.modtime as i64));
        0
    }

    unsafe fn truncate(&self, _state: *mut UgState, path: *const c_char, size: off_t) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_truncate");
        match st.nodes.get_mut(&c_str(path)) {
            Some(Node::File { data, .. }) => {
                data.resize(size as usize, 0);
                0
            }
            Some(Node::Dir { .. }) => -libc::EISDIR,
            None => -libc::ENOENT,
        }
    }

    unsafe fn access(&self, _state: *mut UgState, path: *const c_char, _mask: c_int) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_access");
        if st.nodes.contains_key(&c_str(path)) {
            0
        } else {
            -libc::ENOENT
        }
    }

    unsafe fn invalidate(&self, _state: *mut UgState, path: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_invalidate");
        if st.nodes.contains_key(&c_str(path)) {
            0
        } else {
            -libc::ENOENT
        }
    }

    unsafe fn refresh(&self, _state: *mut UgState, path: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_refresh");
        if st.nodes.contains_key(&c_str(path)) {
            0
        } else {
            -libc::ENOENT
        }
    }

    unsafe fn open(&self, _state: *mut UgState, path: *const c_char, flags: c_int, rc: *mut c_int) -> *mut UgHandle {
        let mut st = self.lock();
        if let Some(fail) = st.record("UG_open") {
            *rc = fail;
            return ptr::null_mut();
        }
        let path = c_str(path);
        match st.nodes.get(&path) {
            Some(Node::File { .. }) => {}
            Some(Node::Dir { .. }) => {
                *rc = -libc::EISDIR;
                return ptr::null_mut();
            }
            None => {
                *rc = -libc::ENOENT;
                return ptr::null_mut();
            }
        }
        let fh = new_handle(UG_TYPE_FILE);
        st.files.insert(fh as usize, OpenFile { path, flags });
        *rc = 0;
        fh
    }

    unsafe fn create(&self, _state: *mut UgState, path: *const c_char, mode: mode_t, rc: *mut c_int) -> *mut UgHandle {
        let mut st = self.lock();
        if let Some(fail) = st.record("UG_create") {
            *rc = fail;
            return ptr::null_mut();
        }
        let path = c_str(path);
        if st.nodes.contains_key(&path) {
            *rc = -libc::EEXIST;
            return ptr::null_mut();
        }
        if !matches!(st.nodes.get(parent_of(&path)), Some(Node::Dir { .. })) {
            *rc = -libc::ENOENT;
            return ptr::null_mut();
        }
        st.nodes.insert(path.clone(), Node::File { data: Vec::new(), mode });
        let fh = new_handle(UG_TYPE_FILE);
        st.files.insert(fh as usize, OpenFile { path, flags: libc::O_WRONLY });
        *rc = 0;
        fh
    }

    unsafe fn read(&self, _state: *mut UgState, buf: *mut c_char, size: size_t, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_read");
        let Some(path) = st.files.get(&(fi as usize)).map(|f| f.path.clone()) else {
            return -libc::EBADF;
        };
        let cap = st.read_chunk.unwrap_or(size).min(size);
        let Some(Node::File { data, .. }) = st.nodes.get(&path) else {
            return -libc::ENOENT;
        };
        let offset = ((*fi).offset as usize).min(data.len());
        let n = cap.min(data.len() - offset);
        ptr::copy_nonoverlapping(data[offset..].as_ptr(), buf as *mut u8, n);
        (*fi).offset += n as off_t;
        n as c_int
    }

    unsafe fn write(&self, _state: *mut UgState, buf: *const c_char, size: size_t, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_write");
        let Some((path, flags)) = st.files.get(&(fi as usize)).map(|f| (f.path.clone(), f.flags)) else {
            return -libc::EBADF;
        };
        if flags == O_RDONLY {
            return -libc::EBADF;
        }
        let n = st.write_chunk.unwrap_or(size).min(size);
        let Some(Node::File { data, .. }) = st.nodes.get_mut(&path) else {
            return -libc::ENOENT;
        };
        let offset = (*fi).offset as usize;
        if data.len() < offset + n {
            data.resize(offset + n, 0);
        }
        ptr::copy_nonoverlapping(buf as *const u8, data[offset..].as_mut_ptr(), n);
        (*fi).offset += n as off_t;
        n as c_int
    }

    unsafe fn seek(&self, fi: *mut UgHandle, pos: off_t, whence: c_int) -> off_t {
        let mut st = self.lock();
        if let Some(rc) = st.record("UG_seek") {
            return rc as off_t;
        }
        let Some(path) = st.files.get(&(fi as usize)).map(|f| f.path.clone()) else {
            return -libc::EBADF as off_t;
        };
        let len = match st.nodes.get(&path) {
            Some(Node::File { data, .. }) => data.len() as off_t,
            _ => return -libc::ENOENT as off_t,
        };
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => (*fi).offset,
            SEEK_END => len,
            _ => return -libc::EINVAL as off_t,
        };
        (*fi).offset = base + pos;
        (*fi).offset
    }

    unsafe fn close(&self, _state: *mut UgState, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        st.calls.push("UG_close");
        if st.files.remove(&(fi as usize)).is_none() {
            return -libc::EBADF;
        }
        drop(Box::from_raw(fi));
        0
    }

    unsafe fn fsync(&self, _state: *mut UgState, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_fsync");
        if st.files.contains_key(&(fi as usize)) {
            0
        } else {
            -libc::EBADF
        }
    }

    unsafe fn ftruncate(&self, _state: *mut UgState, size: off_t, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_ftruncate");
        let Some(path) = st.files.get(&(fi as usize)).map(|f| f.path.clone()) else {
            return -libc::EBADF;
        };
        match st.nodes.get_mut(&path) {
            Some(Node::File { data, .. }) => {
                data.resize(size as usize, 0);
                0
            }
            _ => -libc::ENOENT,
        }
    }

    unsafe fn opendir(&self, _state: *mut UgState, path: *const c_char, rc: *mut c_int) -> *mut UgHandle {
        let mut st = self.lock();
        if let Some(fail) = st.record("UG_opendir") {
            *rc = fail;
            return ptr::null_mut();
        }
        let path = c_str(path);
        match st.nodes.get(&path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => {
                *rc = -libc::ENOTDIR;
                return ptr::null_mut();
            }
            None => {
                *rc = -libc::ENOENT;
                return ptr::null_mut();
            }
        }
        let remaining = st.children(&path).into();
        let dh = new_handle(UG_TYPE_DIR);
        st.dirs.insert(dh as usize, OpenDir { remaining, batches: 0 });
        *rc = 0;
        dh
    }

    unsafe fn readdir(
        &self,
        _state: *mut UgState,
        listing: *mut *mut *mut MdEntry,
        num: size_t,
        fi: *mut UgHandle,
    ) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_readdir");
        st.last_readdir_batch = Some(num);
        let null_after = st.null_listing_after;
        let Some(dir) = st.dirs.get_mut(&(fi as usize)) else {
            return -libc::EBADF;
        };
        if null_after.is_some_and(|n| dir.batches >= n) {
            *listing = ptr::null_mut();
            return 0;
        }
        dir.batches += 1;
        let take = num.max(1).min(dir.remaining.len());
        let batch: Vec<String> = dir.remaining.drain(..take).collect();

        let mut ptrs: Vec<*mut MdEntry> = Vec::with_capacity(batch.len() + 1);
        for path in &batch {
            let mut ent = MdEntry::zeroed();
            st.fill_entry(path, &mut ent);
            ptrs.push(Box::into_raw(Box::new(ent)));
        }
        ptrs.push(ptr::null_mut());
        st.live_batches += 1;
        *listing = Box::into_raw(ptrs.into_boxed_slice()) as *mut *mut MdEntry;
        0
    }

    unsafe fn closedir(&self, _state: *mut UgState, fi: *mut UgHandle) -> c_int {
        let mut st = self.lock();
        st.calls.push("UG_closedir");
        if st.dirs.remove(&(fi as usize)).is_none() {
            return -libc::EBADF;
        }
        drop(Box::from_raw(fi));
        0
    }

    unsafe fn free_dir_listing(&self, listing: *mut *mut MdEntry) {
        let mut st = self.lock();
        st.calls.push("UG_free_dir_listing");
        let mut len = 0;
        while !(*listing.add(len)).is_null() {
            let mut ent = Box::from_raw(*listing.add(len));
            free_entry_fields(&mut ent);
            len += 1;
        }
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(listing, len + 1)));
        st.live_batches -= 1;
    }

    unsafe fn setxattr(
        &self,
        _state: *mut UgState,
        path: *const c_char,
        name: *const c_char,
        value: *const c_char,
        size: size_t,
        flags: c_int,
    ) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_setxattr");
        let (path, name) = (c_str(path), c_str(name));
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        let attrs = st.xattrs.entry(path).or_default();
        let exists = attrs.contains_key(&name);
        if flags == XATTR_CREATE && exists {
            return -libc::EEXIST;
        }
        if flags == XATTR_REPLACE && !exists {
            return -libc::ENODATA;
        }
        let value = std::slice::from_raw_parts(value as *const u8, size).to_vec();
        attrs.insert(name, value);
        0
    }

    unsafe fn getxattr(
        &self,
        _state: *mut UgState,
        path: *const c_char,
        name: *const c_char,
        value: *mut c_char,
        size: size_t,
    ) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_getxattr");
        let (path, name) = (c_str(path), c_str(name));
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        let Some(data) = st.xattrs.get(&path).and_then(|x| x.get(&name)) else {
            return -libc::ENODATA;
        };
        if size == 0 {
            return data.len() as c_int;
        }
        if size < data.len() {
            return -libc::ERANGE;
        }
        ptr::copy_nonoverlapping(data.as_ptr(), value as *mut u8, data.len());
        data.len() as c_int
    }

    unsafe fn listxattr(&self, _state: *mut UgState, path: *const c_char, list: *mut c_char, size: size_t) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_listxattr");
        let path = c_str(path);
        if !st.nodes.contains_key(&path) {
            return -libc::ENOENT;
        }
        let mut names = Vec::new();
        for key in st.xattrs.get(&path).into_iter().flat_map(|x| x.keys()) {
            names.extend_from_slice(key.as_bytes());
            names.push(0);
        }
        if size == 0 {
            return names.len() as c_int;
        }
        if size < names.len() {
            return -libc::ERANGE;
        }
        ptr::copy_nonoverlapping(names.as_ptr(), list as *mut u8, names.len());
        names.len() as c_int
    }

    unsafe fn removexattr(&self, _state: *mut UgState, path: *const c_char, name: *const c_char) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_removexattr");
        let (path, name) = (c_str(path), c_str(name));
        match st.xattrs.get_mut(&path).and_then(|x| x.remove(&name)) {
            Some(_) => 0,
            None => -libc::ENODATA,
        }
    }

    unsafe fn vacuum_begin(&self, _state: *mut UgState, path: *const c_char, vctx: *mut *mut UgVacuumContext) -> c_int {
        let mut st = self.lock();
        fail_or!(st, "UG_vacuum_begin");
        if !st.nodes.contains_key(&c_str(path)) {
            return -libc::ENOENT;
        }
        st.live_vacuums += 1;
        *vctx = Box::into_raw(Box::new(0u64)) as *mut UgVacuumContext;
        0
    }

    unsafe fn vacuum_wait(&self, vctx: *mut UgVacuumContext) -> c_int {
        let mut st = self.lock();
        st.calls.push("UG_vacuum_wait");
        drop(Box::from_raw(vctx as *mut u64));
        st.live_vacuums -= 1;
        0
    }
}
