//! In-memory storage host.
//!
//! Used by tests and by `privfs --memory`. All data is ephemeral.

use super::traits::{DirEntry, DirHandle, EntryName, FileHandle, StorageHost, WriteStream};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Entry in the memory host.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8> },
    Directory,
}

type Entries = Arc<RwLock<HashMap<PathBuf, Entry>>>;

/// In-memory storage host.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    entries: Entries,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Create a new empty in-memory host.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(PathBuf::new(), Entry::Directory);
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {}", path.display()),
        )
    }

    async fn require_directory(&self, dir: &DirHandle) -> io::Result<()> {
        let entries = self.entries.read().await;
        match entries.get(dir.path()) {
            Some(Entry::Directory) => Ok(()),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.path().display()),
            )),
            None => Err(Self::not_found(dir.path())),
        }
    }
}

#[async_trait]
impl StorageHost for MemoryHost {
    async fn resolve_root(&self) -> io::Result<DirHandle> {
        Ok(DirHandle::root())
    }

    async fn get_directory(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<DirHandle> {
        self.require_directory(parent).await?;
        let handle = parent.child(name);
        let mut entries = self.entries.write().await;

        match entries.get(handle.path()) {
            Some(Entry::Directory) => Ok(handle),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", handle.path().display()),
            )),
            None if create => {
                entries.insert(handle.path().to_path_buf(), Entry::Directory);
                Ok(handle)
            }
            None => Err(Self::not_found(handle.path())),
        }
    }

    async fn get_file(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<FileHandle> {
        self.require_directory(parent).await?;
        let handle = FileHandle::new(parent, name);
        let mut entries = self.entries.write().await;

        match entries.get(handle.path()) {
            Some(Entry::File { .. }) => Ok(handle),
            Some(Entry::Directory) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", handle.path().display()),
            )),
            None if create => {
                entries.insert(handle.path().to_path_buf(), Entry::File { data: Vec::new() });
                Ok(handle)
            }
            None => Err(Self::not_found(handle.path())),
        }
    }

    async fn open_write(&self, file: &FileHandle) -> io::Result<Box<dyn WriteStream>> {
        let entries = self.entries.read().await;
        match entries.get(file.path()) {
            Some(Entry::File { .. }) => Ok(Box::new(MemoryWriteStream {
                entries: Arc::clone(&self.entries),
                path: file.path().to_path_buf(),
                buffer: Vec::new(),
            })),
            Some(Entry::Directory) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", file.path().display()),
            )),
            None => Err(Self::not_found(file.path())),
        }
    }

    async fn read_all(&self, file: &FileHandle) -> io::Result<Vec<u8>> {
        let entries = self.entries.read().await;
        match entries.get(file.path()) {
            Some(Entry::File { data }) => Ok(data.clone()),
            Some(Entry::Directory) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", file.path().display()),
            )),
            None => Err(Self::not_found(file.path())),
        }
    }

    async fn remove(&self, parent: &DirHandle, name: &EntryName) -> io::Result<()> {
        self.require_directory(parent).await?;
        let target = parent.path().join(name.as_str());
        let mut entries = self.entries.write().await;

        // Check if it's a non-empty directory
        if let Some(Entry::Directory) = entries.get(&target) {
            let has_children = entries.keys().any(|k| k.parent() == Some(target.as_path()));
            if has_children {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {}", target.display()),
                ));
            }
        }

        entries
            .remove(&target)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(&target))
    }

    async fn list(&self, dir: &DirHandle) -> io::Result<Vec<DirEntry>> {
        self.require_directory(dir).await?;
        let entries = self.entries.read().await;

        let mut result: Vec<DirEntry> = entries
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir.path()))
            .filter_map(|(path, entry)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(match entry {
                    Entry::File { .. } => DirEntry::file(name),
                    Entry::Directory => DirEntry::directory(name),
                })
            })
            .collect();

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }
}

/// Buffers writes and swaps them into the entry map on close.
struct MemoryWriteStream {
    entries: Entries,
    path: PathBuf,
    buffer: Vec<u8>,
}

#[async_trait]
impl WriteStream for MemoryWriteStream {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        let Self { entries, path, buffer } = *self;
        let mut entries = entries.write().await;
        match entries.get_mut(&path) {
            Some(Entry::File { data }) => {
                *data = buffer;
                Ok(())
            }
            Some(Entry::Directory) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            // Removed while the stream was open
            None => Err(MemoryHost::not_found(&path)),
        }
    }

    async fn abort(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}
