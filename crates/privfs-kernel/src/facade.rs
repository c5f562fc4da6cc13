//! FileStore: the façade every front-end action goes through.
//!
//! Each operation is one linear sequence of host calls. The storage root
//! is resolved from scratch every time, the first failing step aborts the
//! rest, and the result is a single status string:
//!
//! ```text
//! write_file("notes.txt", "abc")  -> File "notes.txt" written successfully!
//! read_file("notes.txt")          -> File content: abc
//! delete_file("notes.txt")        -> File "notes.txt" deleted successfully!
//! read_file("notes.txt")          -> Error reading file: not found: notes.txt
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{broadcast, OwnedMutexGuard};

use crate::error::{Action, OperationError, OperationResult};
use crate::export::{ExportKind, ExportStrategy};
use crate::host::{DirEntryKind, EntryName, StorageHost, WriteStream};
use crate::locks::NameLocks;

/// Chunk size used when streaming an import into storage (64 KiB).
pub const IMPORT_CHUNK_SIZE: usize = 64 * 1024;

/// Notifications published by the façade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A file was imported; front-ends treat it as the new working file.
    Imported { file_name: String, directory: String },
}

/// A file from outside storage, to be imported.
pub struct ImportSource {
    name: String,
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl ImportSource {
    pub fn new(name: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// An in-memory source.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, io::Cursor::new(data.into()))
    }

    /// Open a file on the host OS. The source keeps the file's own name.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                )
            })?;
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(name, file))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ImportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportSource").field("name", &self.name).finish_non_exhaustive()
    }
}

/// The file-store façade.
pub struct FileStore {
    host: Arc<dyn StorageHost>,
    export: Arc<dyn ExportStrategy>,
    locks: Option<NameLocks>,
    events: broadcast::Sender<StoreEvent>,
}

impl FileStore {
    pub fn new(host: Arc<dyn StorageHost>, export: Arc<dyn ExportStrategy>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            host,
            export,
            locks: None,
            events,
        }
    }

    /// Serialise operations on the same entry name.
    ///
    /// Changes behaviour: without it, concurrent same-name operations
    /// finish in whatever order the host decides.
    pub fn with_name_locks(mut self) -> Self {
        self.locks = Some(NameLocks::new());
        self
    }

    pub fn serializes_same_name(&self) -> bool {
        self.locks.is_some()
    }

    pub fn export_kind(&self) -> ExportKind {
        self.export.kind()
    }

    /// Subscribe to [`StoreEvent`]s published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    async fn lock(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(key).await),
            None => None,
        }
    }

    /// Replace the contents of `name` (created if missing).
    pub async fn write_file(&self, name: &str, contents: &[u8]) -> OperationResult {
        let _guard = self.lock(name).await;
        tracing::debug!(name, bytes = contents.len(), "write_file");
        self.try_write_file(name, contents)
            .await
            .map(|()| format!("File \"{name}\" written successfully!"))
            .map_err(|e| OperationError::from_io(Action::WritingFile, e))
    }

    async fn try_write_file(&self, name: &str, contents: &[u8]) -> io::Result<()> {
        let name = EntryName::new(name)?;
        let root = self.host.resolve_root().await?;
        let file = self.host.get_file(&root, &name, true).await?;
        let mut stream = self.host.open_write(&file).await?;
        if let Err(e) = stream.write(contents).await {
            abort_stream(stream).await;
            return Err(e);
        }
        stream.close().await
    }

    /// Read `name` as text.
    pub async fn read_file(&self, name: &str) -> OperationResult {
        let _guard = self.lock(name).await;
        tracing::debug!(name, "read_file");
        self.read_bytes(name)
            .await
            .map(|data| format!("File content: {}", String::from_utf8_lossy(&data)))
            .map_err(|e| OperationError::from_io(Action::ReadingFile, e))
    }

    async fn read_bytes(&self, name: &str) -> io::Result<Vec<u8>> {
        let name = EntryName::new(name)?;
        let root = self.host.resolve_root().await?;
        let file = self.host.get_file(&root, &name, false).await?;
        self.host.read_all(&file).await
    }

    /// Remove the entry `name` from the storage root.
    pub async fn delete_file(&self, name: &str) -> OperationResult {
        let _guard = self.lock(name).await;
        tracing::debug!(name, "delete_file");
        self.try_delete(name)
            .await
            .map(|()| format!("File \"{name}\" deleted successfully!"))
            .map_err(|e| OperationError::from_io(Action::DeletingFile, e))
    }

    async fn try_delete(&self, name: &str) -> io::Result<()> {
        let name = EntryName::new(name)?;
        let root = self.host.resolve_root().await?;
        self.host.remove(&root, &name).await
    }

    /// Create directory `name` under the root. Succeeds if it already exists.
    pub async fn create_directory(&self, name: &str) -> OperationResult {
        let _guard = self.lock(name).await;
        tracing::debug!(name, "create_directory");
        self.try_create_directory(name)
            .await
            .map(|()| format!("Directory \"{name}\" created successfully!"))
            .map_err(|e| OperationError::from_io(Action::CreatingDirectory, e))
    }

    async fn try_create_directory(&self, name: &str) -> io::Result<()> {
        let name = EntryName::new(name)?;
        let root = self.host.resolve_root().await?;
        self.host.get_directory(&root, &name, true).await?;
        Ok(())
    }

    /// Hand `name`'s contents to the export strategy.
    pub async fn export_to_host(&self, name: &str) -> OperationResult {
        let _guard = self.lock(name).await;
        tracing::debug!(name, kind = ?self.export.kind(), "export_to_host");
        let exported = async {
            let payload = self.read_bytes(name).await?;
            self.export.export(name, &payload).await
        }
        .await;

        match exported {
            Ok(()) => Ok(match self.export.kind() {
                ExportKind::InteractivePicker => format!("File \"{name}\" saved to OS!"),
                ExportKind::DownloadLink => format!("File \"{name}\" downloaded!"),
            }),
            Err(e) => Err(OperationError::from_io(Action::SavingFile, e)),
        }
    }

    /// Copy `source` into `directory` (created if missing) under the
    /// source's own name, then publish [`StoreEvent::Imported`].
    pub async fn import_file(&self, source: ImportSource, directory: &str) -> OperationResult {
        let ImportSource { name, reader } = source;
        let key = PathBuf::from(directory).join(&name);
        let _guard = self.lock(&key.to_string_lossy()).await;
        tracing::debug!(name, directory, "import_file");

        self.try_import(&name, reader, directory)
            .await
            .map_err(|e| OperationError::from_io(Action::ImportingFile, e))?;

        // Nobody listening is fine
        let _ = self.events.send(StoreEvent::Imported {
            file_name: name.clone(),
            directory: directory.to_string(),
        });
        Ok(format!(
            "File \"{name}\" imported successfully into \"{directory}\"!"
        ))
    }

    async fn try_import(
        &self,
        name: &str,
        mut reader: Box<dyn AsyncRead + Send + Unpin>,
        directory: &str,
    ) -> io::Result<()> {
        let file_name = EntryName::new(name)?;
        let dir_name = EntryName::new(directory)?;
        let root = self.host.resolve_root().await?;
        let dir = self.host.get_directory(&root, &dir_name, true).await?;
        let file = self.host.get_file(&dir, &file_name, true).await?;
        let mut stream = self.host.open_write(&file).await?;

        let mut chunk = vec![0u8; IMPORT_CHUNK_SIZE];
        loop {
            let copied = match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => stream.write(&chunk[..n]).await,
                Err(e) => Err(e),
            };
            if let Err(e) = copied {
                abort_stream(stream).await;
                return Err(e);
            }
        }
        stream.close().await
    }

    /// List the root, or the directory `name` under it.
    ///
    /// One line per entry; directories end in `/`.
    pub async fn list_directory(&self, name: Option<&str>) -> OperationResult {
        tracing::debug!(name, "list_directory");
        let entries = async {
            let root = self.host.resolve_root().await?;
            let dir = match name {
                Some(name) => {
                    let name = EntryName::new(name)?;
                    self.host.get_directory(&root, &name, false).await?
                }
                None => root,
            };
            self.host.list(&dir).await
        }
        .await
        .map_err(|e| OperationError::from_io(Action::ListingDirectory, e))?;

        if entries.is_empty() {
            return Ok("(empty)".to_string());
        }
        let lines: Vec<String> = entries
            .iter()
            .map(|entry| match entry.kind {
                DirEntryKind::Directory => format!("{}/", entry.name),
                DirEntryKind::File => entry.name.clone(),
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Release a stream on a failure path. The original error wins.
async fn abort_stream(stream: Box<dyn WriteStream>) {
    if let Err(e) = stream.abort().await {
        tracing::warn!(error = %e, "failed to abort write stream");
    }
}
