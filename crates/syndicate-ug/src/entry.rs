//! Owned snapshots of native metadata records.

use std::ffi::CStr;

use serde::{Deserialize, Serialize};
use syndicate_sys::{MdEntry, MD_ENTRY_DIRECTORY, MD_ENTRY_FILE};

/// Length of the SHA-256 digest `md_entry.xattr_hash` points at
pub const XATTR_HASH_LEN: usize = 32;

/// Decoded copy of an `md_entry`.
///
/// Holds no native memory: the source entry may be freed once this is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    #[serde(rename = "type")]
    pub entry_type: i32,
    pub name: String,
    pub file_id: u64,
    pub ctime_sec: i64,
    pub ctime_nsec: i32,
    pub mtime_sec: i64,
    pub mtime_nsec: i32,
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
    pub mode: u32,
    pub size: i64,
    pub error: i32,
    pub generation: i64,
    pub num_children: i64,
    pub capacity: i64,
    #[serde(with = "hex_bytes")]
    pub ent_sig: Vec<u8>,
    pub parent_id: u64,
    pub xattr_hash: Option<String>,
}

impl DirEntry {
    /// Copy everything out of `ent`.
    ///
    /// # Safety
    ///
    /// `ent.name` must be null or NUL-terminated, `ent.ent_sig` must be null
    /// or point at `ent.ent_sig_len` bytes, and `ent.xattr_hash` must be null
    /// or point at [`XATTR_HASH_LEN`] bytes.
    #[allow(clippy::unnecessary_cast)]
    pub unsafe fn from_raw(ent: &MdEntry) -> Self {
        let name = if ent.name.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ent.name).to_string_lossy().into_owned()
        };
        let ent_sig = if ent.ent_sig.is_null() || ent.ent_sig_len == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(ent.ent_sig as *const u8, ent.ent_sig_len).to_vec()
        };
        let xattr_hash = (!ent.xattr_hash.is_null()).then(|| {
            hex::encode(std::slice::from_raw_parts(ent.xattr_hash as *const u8, XATTR_HASH_LEN))
        });

        Self {
            entry_type: ent.entry_type,
            name,
            file_id: ent.file_id,
            ctime_sec: ent.ctime_sec,
            ctime_nsec: ent.ctime_nsec,
            mtime_sec: ent.mtime_sec,
            mtime_nsec: ent.mtime_nsec,
            manifest_mtime_sec: ent.manifest_mtime_sec,
            manifest_mtime_nsec: ent.manifest_mtime_nsec,
            write_nonce: ent.write_nonce,
            xattr_nonce: ent.xattr_nonce,
            version: ent.version,
            max_read_freshness: ent.max_read_freshness,
            max_write_freshness: ent.max_write_freshness,
            owner: ent.owner,
            coordinator: ent.coordinator,
            volume: ent.volume,
            mode: ent.mode as u32,
            size: ent.size as i64,
            error: ent.error,
            generation: ent.generation,
            num_children: ent.num_children,
            capacity: ent.capacity,
            ent_sig,
            parent_id: ent.parent_id,
            xattr_hash,
        }
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == MD_ENTRY_FILE
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == MD_ENTRY_DIRECTORY
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// POSIX `stat` result for a UG path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: i64,
    pub blksize: i64,
    pub blocks: i64,
    pub atime: i64,
    pub atime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub ctime: i64,
    pub ctime_nsec: i64,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFDIR as u32
    }

    pub fn is_file(&self) -> bool {
        self.mode & libc::S_IFMT as u32 == libc::S_IFREG as u32
    }
}

#[allow(clippy::unnecessary_cast)]
impl From<&libc::stat> for Stat {
    fn from(st: &libc::stat) -> Self {
        Self {
            dev: st.st_dev as u64,
            ino: st.st_ino as u64,
            mode: st.st_mode as u32,
            nlink: st.st_nlink as u64,
            uid: st.st_uid,
            gid: st.st_gid,
            rdev: st.st_rdev as u64,
            size: st.st_size as i64,
            blksize: st.st_blksize as i64,
            blocks: st.st_blocks as i64,
            atime: st.st_atime as i64,
            atime_nsec: st.st_atime_nsec as i64,
            mtime: st.st_mtime as i64,
            mtime_nsec: st.st_mtime_nsec as i64,
            ctime: st.st_ctime as i64,
            ctime_nsec: st.st_ctime_nsec as i64,
        }
    }
}

/// Volume statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statvfs {
    pub bsize: u64,
    pub frsize: u64,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub favail: u64,
    pub fsid: u64,
    pub flag: u64,
    pub namemax: u64,
}

#[allow(clippy::unnecessary_cast)]
impl From<&libc::statvfs> for Statvfs {
    fn from(st: &libc::statvfs) -> Self {
        Self {
            bsize: st.f_bsize as u64,
            frsize: st.f_frsize as u64,
            blocks: st.f_blocks as u64,
            bfree: st.f_bfree as u64,
            bavail: st.f_bavail as u64,
            files: st.f_files as u64,
            ffree: st.f_ffree as u64,
            favail: st.f_favail as u64,
            fsid: st.f_fsid as u64,
            flag: st.f_flag as u64,
            namemax: st.f_namemax as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_decode_entry() {
        let name = CString::new("hello.txt").unwrap();
        let mut sig = vec![0xde, 0xad, 0xbe, 0xef];
        let mut hash = [0xabu8; XATTR_HASH_LEN];

        let mut ent = MdEntry::zeroed();
        ent.entry_type = MD_ENTRY_FILE;
        ent.name = name.as_ptr() as *mut _;
        ent.file_id = 0x1234;
        ent.size = 42;
        ent.mode = 0o644;
        ent.ent_sig = sig.as_mut_ptr() as *mut _;
        ent.ent_sig_len = sig.len();
        ent.xattr_hash = hash.as_mut_ptr() as *mut _;

        let decoded = unsafe { DirEntry::from_raw(&ent) };
        assert_eq!(decoded.name, "hello.txt");
        assert!(decoded.is_file());
        assert!(!decoded.is_dir());
        assert_eq!(decoded.size, 42);
        assert_eq!(decoded.ent_sig, sig);
        assert_eq!(decoded.xattr_hash.as_deref(), Some("ab".repeat(32).as_str()));
    }

    #[test]
    fn test_decode_null_pointers() {
        let mut ent = MdEntry::zeroed();
        ent.entry_type = MD_ENTRY_DIRECTORY;
        let decoded = unsafe { DirEntry::from_raw(&ent) };
        assert!(decoded.is_dir());
        assert!(decoded.name.is_empty());
        assert!(decoded.ent_sig.is_empty());
        assert_eq!(decoded.xattr_hash, None);
    }

    #[test]
    fn test_json_uses_hex_signature() {
        let entry = DirEntry {
            entry_type: MD_ENTRY_FILE,
            name: "a".into(),
            ent_sig: vec![1, 2, 255],
            ..Default::default()
        };
        let json = entry.to_json().unwrap();
        assert!(json.contains("\"type\":1"));
        assert!(json.contains("\"ent_sig\":\"0102ff\""));

        let back: DirEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_stat_kind() {
        let st = Stat {
            mode: libc::S_IFDIR as u32 | 0o755,
            ..Default::default()
        };
        assert!(st.is_dir());
        assert!(!st.is_file());
    }
}
