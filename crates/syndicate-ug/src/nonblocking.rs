//! Async facade over [`Client`].
//!
//! Native calls block, so each operation runs on tokio's blocking pool.
//! Every call resolves its future exactly once; a native call that has been
//! issued always runs to completion even if the future is dropped.

use std::sync::Arc;

use libc::mode_t;
use syndicate_sys::{UgApi, UgLibrary, UgState};

use crate::client::Client;
use crate::entry::{DirEntry, Statvfs};
use crate::error::{Result, SyndicateError};
use crate::options::OpenMode;

/// Shared client whose operations return futures.
pub struct AsyncClient<A: UgApi + 'static = UgLibrary> {
    client: Arc<Client<A>>,
}

impl<A: UgApi + 'static> Clone for AsyncClient<A> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<A: UgApi + 'static> AsyncClient<A> {
    pub fn new(client: Client<A>) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Client<A> {
        &self.client
    }

    /// Shut the gateway down. Fails if other clones are still alive.
    pub fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.client) {
            Ok(client) => client.shutdown(),
            Err(_) => Err(SyndicateError::InvalidArgument("client is still shared")),
        }
    }

    async fn run<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Client<A>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client)).await?
    }

    /// Run an arbitrary native call on the blocking pool.
    pub async fn call_raw<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&A, *mut UgState) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.run(move |c| c.with_raw(f)).await
    }

    pub async fn stat_raw(&self, path: &str) -> Result<DirEntry> {
        let path = path.to_owned();
        self.run(move |c| c.stat_raw(&path)).await
    }

    pub async fn statvfs(&self) -> Result<Statvfs> {
        self.run(|c| c.statvfs()).await
    }

    pub async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = path.to_owned();
        self.run(move |c| c.list_dir(&path)).await
    }

    pub async fn mkdir(&self, path: &str, mode: Option<mode_t>) -> Result<()> {
        let path = path.to_owned();
        self.run(move |c| c.mkdir(&path, mode)).await
    }

    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let path = path.to_owned();
        self.run(move |c| c.rmdir(&path)).await
    }

    pub async fn unlink(&self, path: &str) -> Result<()> {
        let path = path.to_owned();
        self.run(move |c| c.unlink(&path)).await
    }

    pub async fn rename(&self, path: &str, new_path: &str) -> Result<()> {
        let (path, new_path) = (path.to_owned(), new_path.to_owned());
        self.run(move |c| c.rename(&path, &new_path)).await
    }

    pub async fn get_xattr(&self, path: &str, key: &str) -> Result<Vec<u8>> {
        let (path, key) = (path.to_owned(), key.to_owned());
        self.run(move |c| c.get_xattr(&path, &key)).await
    }

    pub async fn list_xattr(&self, path: &str) -> Result<Vec<String>> {
        let path = path.to_owned();
        self.run(move |c| c.list_xattr(&path)).await
    }

    /// Whole contents of `path`, read `chunk` bytes at a time.
    pub async fn read_file(&self, path: &str, chunk: usize) -> Result<Vec<u8>> {
        let path = path.to_owned();
        self.run(move |c| {
            let mut fh = c.open(&path, OpenMode::Read)?;
            let data = fh.read_to_end(chunk)?;
            fh.close()?;
            Ok(data)
        })
        .await
    }
}
