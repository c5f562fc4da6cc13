//! On-disk storage host.
//!
//! Keeps the private namespace in a directory owned by privfs. Nothing
//! outside that directory is reachable through it.

use super::traits::{DirEntry, DirHandle, EntryName, FileHandle, StorageHost, WriteStream};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Prefix of in-flight write stream files. Hidden from listings.
const PARTIAL_PREFIX: &str = ".privfs-partial-";

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk storage host.
///
/// All handles are relative to `root`. For example, if `root` is
/// `~/.local/share/privfs/origin`, the file handle `docs/a.txt` lives at
/// `~/.local/share/privfs/origin/docs/a.txt`.
#[derive(Debug, Clone)]
pub struct LocalHost {
    root: PathBuf,
}

impl LocalHost {
    /// Create a host rooted at the given path.
    ///
    /// The directory is created on first [`resolve_root`](StorageHost::resolve_root).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative path to an absolute path within the root.
    ///
    /// Returns an error if the path escapes the root (via a symlink).
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let full = self.root.join(path);

        // Canonicalize to resolve symlinks.
        // For non-existent paths, we need to check parent
        let canonical = if full.exists() {
            full.canonicalize()?
        } else {
            let parent = full
                .parent()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
            let filename = full
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;

            if parent.exists() {
                parent.canonicalize()?.join(filename)
            } else {
                // Parent doesn't exist, the operation itself will fail
                full
            }
        };

        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "path escapes root: {} is not under {}",
                    canonical.display(),
                    canonical_root.display()
                ),
            ));
        }

        Ok(canonical)
    }

    async fn require_directory(&self, dir: &DirHandle) -> io::Result<PathBuf> {
        let full = self.resolve(dir.path())?;
        let meta = fs::metadata(&full).await?;
        if meta.is_dir() {
            Ok(full)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.path().display()),
            ))
        }
    }

    /// Names under [`PARTIAL_PREFIX`] belong to in-flight write streams.
    fn check_name(name: &EntryName) -> io::Result<()> {
        if name.as_str().starts_with(PARTIAL_PREFIX) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("name is reserved: {:?}", name.as_str()),
            ));
        }
        Ok(())
    }

    fn partial_path(target: &Path) -> io::Result<PathBuf> {
        let parent = target
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
        let id = PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed);
        Ok(parent.join(format!("{PARTIAL_PREFIX}{}-{id}", std::process::id())))
    }
}

#[async_trait]
impl StorageHost for LocalHost {
    async fn resolve_root(&self) -> io::Result<DirHandle> {
        fs::create_dir_all(&self.root).await?;
        Ok(DirHandle::root())
    }

    async fn get_directory(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<DirHandle> {
        Self::check_name(name)?;
        self.require_directory(parent).await?;
        let handle = parent.child(name);
        let full = self.resolve(handle.path())?;

        match fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok(handle),
            Ok(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", handle.path().display()),
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound && create => {
                match fs::create_dir(&full).await {
                    Ok(()) => Ok(handle),
                    // Lost a creation race to another caller; same directory
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && full.is_dir() => {
                        Ok(handle)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn get_file(
        &self,
        parent: &DirHandle,
        name: &EntryName,
        create: bool,
    ) -> io::Result<FileHandle> {
        Self::check_name(name)?;
        self.require_directory(parent).await?;
        let handle = FileHandle::new(parent, name);
        let full = self.resolve(handle.path())?;

        match fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", handle.path().display()),
            )),
            Ok(_) => Ok(handle),
            Err(e) if e.kind() == io::ErrorKind::NotFound && create => {
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&full)
                    .await?;
                Ok(handle)
            }
            Err(e) => Err(e),
        }
    }

    async fn open_write(&self, file: &FileHandle) -> io::Result<Box<dyn WriteStream>> {
        let target = self.resolve(file.path())?;
        if fs::metadata(&target).await?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", file.path().display()),
            ));
        }
        let stream = AtomicFileStream::create(target).await?;
        Ok(Box::new(stream))
    }

    async fn read_all(&self, file: &FileHandle) -> io::Result<Vec<u8>> {
        let full = self.resolve(file.path())?;
        fs::read(&full).await
    }

    async fn remove(&self, parent: &DirHandle, name: &EntryName) -> io::Result<()> {
        Self::check_name(name)?;
        // The entry itself is not followed: removing a symlink removes the link
        let full = self.require_directory(parent).await?.join(name.as_str());
        let meta = fs::symlink_metadata(&full).await?;

        if meta.is_dir() {
            fs::remove_dir(&full).await
        } else {
            fs::remove_file(&full).await
        }
    }

    async fn list(&self, dir: &DirHandle) -> io::Result<Vec<DirEntry>> {
        let full = self.require_directory(dir).await?;
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&full).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(PARTIAL_PREFIX) {
                continue;
            }
            let metadata = entry.metadata().await?;
            entries.push(if metadata.is_dir() {
                DirEntry::directory(name)
            } else {
                DirEntry::file(name)
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Write stream that writes to a hidden sibling file and renames it over
/// the target on close.
///
/// Also used for destinations picked on the host OS, so a cancelled or
/// failed export never leaves a truncated file behind.
#[derive(Debug)]
pub struct AtomicFileStream {
    file: fs::File,
    partial: PathBuf,
    target: PathBuf,
}

impl AtomicFileStream {
    /// Start replacing `target`. Its parent directory must exist.
    pub async fn create(target: PathBuf) -> io::Result<Self> {
        let partial = LocalHost::partial_path(&target)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
            .await?;
        Ok(Self {
            file,
            partial,
            target,
        })
    }
}

#[async_trait]
impl WriteStream for AtomicFileStream {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data).await
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        let Self {
            mut file,
            partial,
            target,
        } = *self;

        let committed = async {
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &target).await
        }
        .await;

        if committed.is_err() {
            // Explicitly ignored: the partial file is garbage either way
            let _ = fs::remove_file(&partial).await;
        }
        committed
    }

    async fn abort(self: Box<Self>) -> io::Result<()> {
        let Self { file, partial, .. } = *self;
        drop(file);
        fs::remove_file(&partial).await
    }
}
