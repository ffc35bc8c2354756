//! Directory listing.
//!
//! `UG_readdir` hands back batches: null-terminated arrays of `md_entry`
//! pointers owned by the caller. Each batch is wrapped in a [`DirBatch`] so
//! it is released with `UG_free_dir_listing` however decoding ends.

use std::collections::VecDeque;
use std::ptr::{self, NonNull};

use libc::c_int;
use syndicate_config::{log_ug_debug, log_ug_warn};
use syndicate_sys::{MdEntry, UgApi, UgHandle};

use crate::client::{c_arg, check, Client};
use crate::entry::DirEntry;
use crate::error::{Result, SyndicateError};

impl<A: UgApi> Client<A> {
    /// Stream the entries of directory `path`.
    pub fn read_dir(&self, path: &str) -> Result<ReadDir<'_, A>> {
        let cpath = c_arg(path, "path must not be empty")?;
        let state = self.state()?;

        let mut rc: c_int = 0;
        let dh = unsafe { self.api().opendir(state, cpath.as_ptr(), &mut rc) };
        if rc != 0 {
            return Err(SyndicateError::native(format!("Failed to open a directory '{}'", path), rc as i64));
        }
        let dh = NonNull::new(dh).ok_or_else(|| {
            SyndicateError::native(format!("Failed to open a directory '{}'", path), -libc::EIO as i64)
        })?;

        Ok(ReadDir {
            client: self,
            raw: Some(dh),
            path: path.to_string(),
            pending: VecDeque::new(),
            done: false,
        })
    }

    /// All entries of directory `path`.
    ///
    /// The directory is closed before returning, also when a read fails; the
    /// read error wins over a close error.
    pub fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let mut dir = self.read_dir(path)?;
        let mut entries = Vec::new();
        let mut failure = None;
        for item in dir.by_ref() {
            match item {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let closed = dir.close();
        if let Some(e) = failure {
            return Err(e);
        }
        closed?;
        log_ug_debug!("list_dir", path = path, entries = entries.len());
        Ok(entries)
    }
}

/// Iterator over a UG directory. Closed by [`ReadDir::close`] or on drop.
pub struct ReadDir<'a, A: UgApi> {
    client: &'a Client<A>,
    raw: Option<NonNull<UgHandle>>,
    path: String,
    pending: VecDeque<DirEntry>,
    done: bool,
}

impl<'a, A: UgApi> ReadDir<'a, A> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fetch the next batch. `Ok(false)` at the end of the listing.
    fn fill(&mut self) -> Result<bool> {
        let dh = self
            .raw
            .map(NonNull::as_ptr)
            .ok_or(SyndicateError::InvalidArgument("directory handle is closed"))?;
        let state = self.client.state()?;
        let api = self.client.api();

        let mut listing: *mut *mut MdEntry = ptr::null_mut();
        let rc = unsafe { api.readdir(state, &mut listing, self.client.readdir_batch, dh) };
        check(rc, || format!("Failed to read a directory '{}'", self.path))?;

        let Some(batch) = (unsafe { DirBatch::new(api, listing) }) else {
            return Ok(false);
        };
        if batch.is_empty() {
            return Ok(false);
        }
        self.pending
            .extend(batch.iter().map(|ent| unsafe { DirEntry::from_raw(ent) }));
        Ok(true)
    }

    /// Close the directory handle.
    pub fn close(mut self) -> Result<()> {
        self.close_raw()
    }

    fn close_raw(&mut self) -> Result<()> {
        let Some(dh) = self.raw.take() else {
            return Ok(());
        };
        let state = self.client.state()?;
        let rc = unsafe { self.client.api().closedir(state, dh.as_ptr()) };
        check(rc, || format!("Failed to close a directory '{}'", self.path))
    }
}

impl<A: UgApi> Iterator for ReadDir<'_, A> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }
            match self.fill() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<A: UgApi> Drop for ReadDir<'_, A> {
    fn drop(&mut self) {
        if let Err(e) = self.close_raw() {
            log_ug_warn!("UG_closedir failed on drop", path = self.path.as_str(), error = e.to_string());
        }
    }
}

/// One `UG_readdir` result, freed on drop.
pub struct DirBatch<'a, A: UgApi> {
    api: &'a A,
    listing: NonNull<*mut MdEntry>,
}

impl<'a, A: UgApi> DirBatch<'a, A> {
    /// Take ownership of `listing`. A null listing yields `None`.
    ///
    /// # Safety
    ///
    /// `listing` must be null or a null-terminated array produced by
    /// `UG_readdir` through `api`, not freed elsewhere.
    pub unsafe fn new(api: &'a A, listing: *mut *mut MdEntry) -> Option<Self> {
        NonNull::new(listing).map(|listing| Self { api, listing })
    }

    /// Entries up to the null sentinel.
    pub fn iter(&self) -> BatchIter<'_> {
        BatchIter {
            cursor: self.listing.as_ptr(),
            _batch: std::marker::PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<A: UgApi> Drop for DirBatch<'_, A> {
    fn drop(&mut self) {
        unsafe { self.api.free_dir_listing(self.listing.as_ptr()) };
    }
}

/// Walks a batch until the null entry.
pub struct BatchIter<'b> {
    cursor: *mut *mut MdEntry,
    _batch: std::marker::PhantomData<&'b MdEntry>,
}

impl<'b> Iterator for BatchIter<'b> {
    type Item = &'b MdEntry;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: the cursor never moves past the sentinel, and the batch
        // outlives 'b.
        unsafe {
            let ent = *self.cursor;
            if ent.is_null() {
                return None;
            }
            self.cursor = self.cursor.add(1);
            Some(&*ent)
        }
    }
}
