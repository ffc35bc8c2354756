//! File handles: open semantics and the read/write loops.

use std::ptr::NonNull;

use libc::{c_char, c_int, off_t};
use syndicate_config::{log_ug_debug, log_ug_trace, log_ug_warn};
use syndicate_sys::{UgApi, UgHandle, SEEK_END, SEEK_SET};

use crate::client::{alloc_buffer, c_arg, check, Client};
use crate::error::{Result, SyndicateError};
use crate::options::{OpenMode, CREATE_MODE};

impl<A: UgApi> Client<A> {
    /// Open `path`.
    ///
    /// [`OpenMode::Write`] and [`OpenMode::Append`] create the file with mode
    /// `0o540`, falling back to opening it when it already exists. Write mode
    /// then truncates an existing file; append mode seeks to its end.
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle<'_, A>> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;
        log_ug_debug!("open", path = path, mode = mode.as_str());

        let mut rc: c_int = 0;
        let mut existed = false;
        let raw = if mode.creates() {
            let fh = unsafe { self.api().create(state, cpath.as_ptr(), CREATE_MODE, &mut rc) };
            if rc == -libc::EEXIST {
                existed = true;
                rc = 0;
                unsafe { self.api().open(state, cpath.as_ptr(), mode.flags(), &mut rc) }
            } else if rc != 0 {
                return Err(SyndicateError::native(format!("Failed to create a file '{}'", path), rc as i64));
            } else {
                fh
            }
        } else {
            unsafe { self.api().open(state, cpath.as_ptr(), mode.flags(), &mut rc) }
        };

        if rc != 0 {
            return Err(SyndicateError::native(format!("Failed to open a file '{}'", path), rc as i64));
        }
        let raw = NonNull::new(raw)
            .ok_or_else(|| SyndicateError::native(format!("Failed to open a file '{}'", path), -libc::EIO as i64))?;

        // From here on an error drops `handle`, which closes it.
        let mut handle = FileHandle {
            client: self,
            raw: Some(raw),
            path: path.to_string(),
        };
        match mode {
            OpenMode::Write if existed => handle.truncate(0)?,
            OpenMode::Append => {
                handle.seek_raw(0, SEEK_END)?;
            }
            _ => {}
        }
        Ok(handle)
    }
}

/// An open UG file. Closed by [`FileHandle::close`] or on drop.
pub struct FileHandle<'a, A: UgApi> {
    client: &'a Client<A>,
    raw: Option<NonNull<UgHandle>>,
    path: String,
}

impl<'a, A: UgApi> FileHandle<'a, A> {
    pub fn path(&self) -> &str {
        &self.path
    }

    fn raw(&self) -> Result<*mut UgHandle> {
        self.raw
            .map(NonNull::as_ptr)
            .ok_or(SyndicateError::InvalidArgument("file handle is closed"))
    }

    /// Read up to `size` bytes. Fewer are returned only at end of file.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let fh = self.raw()?;
        let state = self.client.state()?;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        out.try_reserve_exact(size)
            .map_err(|_| SyndicateError::OutOfMemory { requested: size })?;
        let mut scratch = alloc_buffer(size)?;

        while out.len() < size {
            let want = size - out.len();
            let n = unsafe {
                self.client
                    .api()
                    .read(state, scratch.as_mut_ptr() as *mut c_char, want, fh)
            };
            if n < 0 {
                return Err(SyndicateError::native(format!("Failed to read a file '{}'", self.path), n as i64));
            }
            if n == 0 {
                break;
            }
            let n = (n as usize).min(want);
            out.extend_from_slice(&scratch[..n]);
            log_ug_trace!("read chunk", path = self.path.as_str(), bytes = n);
        }
        Ok(out)
    }

    /// Read `chunk` bytes at a time until end of file.
    pub fn read_to_end(&mut self, chunk: usize) -> Result<Vec<u8>> {
        if chunk == 0 {
            return Err(SyndicateError::InvalidArgument("chunk size must not be zero"));
        }
        let mut out = Vec::new();
        loop {
            let buf = self.read(chunk)?;
            let short = buf.len() < chunk;
            out.extend_from_slice(&buf);
            if short {
                return Ok(out);
            }
        }
    }

    /// Write all of `buf`, returning the number of bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let fh = self.raw()?;
        let state = self.client.state()?;

        let mut written = 0;
        while written < buf.len() {
            let rest = &buf[written..];
            let n = unsafe {
                self.client
                    .api()
                    .write(state, rest.as_ptr() as *const c_char, rest.len(), fh)
            };
            if n < 0 {
                return Err(SyndicateError::native(format!("Failed to write a file '{}'", self.path), n as i64));
            }
            if n == 0 {
                return Err(SyndicateError::native(
                    format!("Failed to write a file '{}'", self.path),
                    -libc::EIO as i64,
                ));
            }
            written += (n as usize).min(rest.len());
        }
        Ok(written)
    }

    /// Move to absolute `offset`, returning the new position.
    pub fn seek(&mut self, offset: i64) -> Result<u64> {
        if offset < 0 {
            return Err(SyndicateError::InvalidArgument("offset must not be negative"));
        }
        self.seek_raw(offset as off_t, SEEK_SET)
    }

    fn seek_raw(&mut self, offset: off_t, whence: c_int) -> Result<u64> {
        let fh = self.raw()?;
        self.client.state()?;
        let pos = unsafe { self.client.api().seek(fh, offset, whence) };
        if pos < 0 {
            return Err(SyndicateError::native(format!("Failed to seek a file '{}'", self.path), pos as i64));
        }
        Ok(pos as u64)
    }

    pub fn fsync(&mut self) -> Result<()> {
        let fh = self.raw()?;
        let state = self.client.state()?;
        let rc = unsafe { self.client.api().fsync(state, fh) };
        check(rc, || format!("Failed to fsync a file '{}'", self.path))
    }

    pub fn truncate(&mut self, len: i64) -> Result<()> {
        if len < 0 {
            return Err(SyndicateError::InvalidArgument("length must not be negative"));
        }
        let fh = self.raw()?;
        let state = self.client.state()?;
        let rc = unsafe { self.client.api().ftruncate(state, len as off_t, fh) };
        check(rc, || format!("Failed to truncate a file '{}'", self.path))
    }

    pub fn close(mut self) -> Result<()> {
        let fh = self.raw()?;
        self.raw = None;
        let state = self.client.state()?;
        let rc = unsafe { self.client.api().close(state, fh) };
        check(rc, || format!("Failed to close a file '{}'", self.path))
    }
}

impl<A: UgApi> Drop for FileHandle<'_, A> {
    fn drop(&mut self) {
        let (Some(fh), Ok(state)) = (self.raw.take(), self.client.state()) else {
            return;
        };
        let rc = unsafe { self.client.api().close(state, fh.as_ptr()) };
        if rc != 0 {
            log_ug_warn!("UG_close failed on drop", path = self.path.as_str(), rc = rc);
        }
    }
}

impl<A: UgApi> std::fmt::Debug for FileHandle<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("open", &self.raw.is_some())
            .finish()
    }
}
