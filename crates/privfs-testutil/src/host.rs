//! A storage host wrapper that injects failures and records calls.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use privfs_kernel::host::{DirEntry, DirHandle, EntryName, FileHandle, StorageHost, WriteStream};

/// A host call, as seen by [`FaultyHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveRoot,
    GetDirectory,
    GetFile,
    OpenWrite,
    Write,
    Close,
    Abort,
    ReadAll,
    Remove,
    List,
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<Step>,
    fail_at: Option<Step>,
}

impl Journal {
    fn enter(&mut self, step: Step) -> io::Result<()> {
        self.calls.push(step);
        if self.fail_at == Some(step) {
            Err(io::Error::other(format!("injected failure at {step:?}")))
        } else {
            Ok(())
        }
    }
}

/// Wraps another host. Every call is recorded; the step set with
/// [`fail_at`](FaultyHost::fail_at) fails every time it is reached.
#[derive(Clone)]
pub struct FaultyHost {
    inner: Arc<dyn StorageHost>,
    journal: Arc<Mutex<Journal>>,
}

impl FaultyHost {
    pub fn new(inner: Arc<dyn StorageHost>) -> Self {
        Self {
            inner,
            journal: Arc::default(),
        }
    }

    /// Fail whenever `step` is reached.
    pub fn fail_at(&self, step: Step) {
        self.journal().fail_at = Some(step);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.journal().fail_at = None;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Step> {
        self.journal().calls.clone()
    }

    /// How many times `step` was reached.
    pub fn count(&self, step: Step) -> usize {
        self.journal().calls.iter().filter(|s| **s == step).count()
    }

    pub fn clear_calls(&self) {
        self.journal().calls.clear();
    }

    fn journal(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, step: Step) -> io::Result<()> {
        self.journal().enter(step)
    }
}

#[async_trait]
impl StorageHost for FaultyHost {
    async fn resolve_root(&self) -> io::Result<DirHandle> {
        self.enter(Step::ResolveRoot)?;
        self.inner.resolve_root().await
    }

    async fn get_directory(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<DirHandle> {
        self.enter(Step::GetDirectory)?;
        self.inner.get_directory(parent, name, create).await
    }

    async fn get_file(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<FileHandle> {
        self.enter(Step::GetFile)?;
        self.inner.get_file(parent, name, create).await
    }

    async fn open_write(&self, file: &FileHandle) -> io::Result<Box<dyn WriteStream>> {
        self.enter(Step::OpenWrite)?;
        let inner = self.inner.open_write(file).await?;
        Ok(Box::new(FaultyStream {
            inner,
            journal: Arc::clone(&self.journal),
        }))
    }

    async fn read_all(&self, file: &FileHandle) -> io::Result<Vec<u8>> {
        self.enter(Step::ReadAll)?;
        self.inner.read_all(file).await
    }

    async fn remove(&self, parent: &DirHandle, name: &EntryName) -> io::Result<()> {
        self.enter(Step::Remove)?;
        self.inner.remove(parent, name).await
    }

    async fn list(&self, dir: &DirHandle) -> io::Result<Vec<DirEntry>> {
        self.enter(Step::List)?;
        self.inner.list(dir).await
    }
}

struct FaultyStream {
    inner: Box<dyn WriteStream>,
    journal: Arc<Mutex<Journal>>,
}

impl FaultyStream {
    fn enter(&self, step: Step) -> io::Result<()> {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .enter(step)
    }
}

#[async_trait]
impl WriteStream for FaultyStream {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.enter(Step::Write)?;
        self.inner.write(data).await
    }

    /// An injected close failure discards the data, like a host that
    /// could not commit.
    async fn close(self: Box<Self>) -> io::Result<()> {
        if let Err(e) = self.enter(Step::Close) {
            self.inner.abort().await?;
            return Err(e);
        }
        self.inner.close().await
    }

    async fn abort(self: Box<Self>) -> io::Result<()> {
        self.enter(Step::Abort)?;
        self.inner.abort().await
    }
}
