//! Host capability traits and handle types.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirEntryKind {
    File,
    Directory,
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    /// Kind of entry.
    pub kind: DirEntryKind,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::Directory,
        }
    }

    /// Create a new file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::File,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryKind::Directory
    }
}

/// A single path component accepted by the storage host.
///
/// Rejects empty names, `.`, `..`, and anything containing a separator
/// or NUL, so a name can never address more than one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryName(String);

impl EntryName {
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let allowed = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if allowed {
            Ok(Self(name))
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("name is not allowed: {name:?}"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a directory inside the storage namespace.
///
/// The root handle has an empty path. Handles are only meaningful to the
/// host that issued them and are not kept across operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirHandle {
    path: PathBuf,
}

impl DirHandle {
    pub fn root() -> Self {
        Self {
            path: PathBuf::new(),
        }
    }

    /// Handle for the child directory `name` of this directory.
    pub fn child(&self, name: &EntryName) -> Self {
        Self {
            path: self.path.join(name.as_str()),
        }
    }

    /// Path relative to the storage root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

/// Handle to a file inside the storage namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    name: EntryName,
}

impl FileHandle {
    pub fn new(parent: &DirHandle, name: &EntryName) -> Self {
        Self {
            path: parent.path().join(name.as_str()),
            name: name.clone(),
        }
    }

    /// Path relative to the storage root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &EntryName {
        &self.name
    }
}

/// An open-until-closed channel for replacing a file's contents.
///
/// Data written is not visible until [`close`](WriteStream::close)
/// succeeds. [`abort`](WriteStream::abort) releases the stream without
/// committing anything.
#[async_trait]
pub trait WriteStream: Send {
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Commit everything written so far.
    async fn close(self: Box<Self>) -> io::Result<()>;

    /// Discard everything written so far.
    async fn abort(self: Box<Self>) -> io::Result<()>;
}

/// The sandboxed storage capability provided by the host.
///
/// Every façade operation starts with [`resolve_root`](StorageHost::resolve_root)
/// and walks down from there by name.
#[async_trait]
pub trait StorageHost: Send + Sync {
    /// Resolve the top-level handle of the private namespace.
    async fn resolve_root(&self) -> io::Result<DirHandle>;

    /// Look up (or create, when `create` is set) a directory under `parent`.
    ///
    /// Creating a directory that already exists returns the existing one.
    async fn get_directory(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<DirHandle>;

    /// Look up (or create empty, when `create` is set) a file under `parent`.
    async fn get_file(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<FileHandle>;

    /// Open a write stream that will replace the file's contents on close.
    async fn open_write(&self, file: &FileHandle) -> io::Result<Box<dyn WriteStream>>;

    /// Read the entire contents of a file.
    async fn read_all(&self, file: &FileHandle) -> io::Result<Vec<u8>>;

    /// Remove a file or empty directory named `name` under `parent`.
    async fn remove(&self, parent: &DirHandle, name: &EntryName) -> io::Result<()>;

    /// List the direct children of a directory, sorted by name.
    async fn list(&self, dir: &DirHandle) -> io::Result<Vec<DirEntry>>;
}
