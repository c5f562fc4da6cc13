//! Exporting a stored file to the host operating system.
//!
//! Two strategies, chosen once at startup:
//!
//! - **InteractivePicker**: ask the user where to save, then stream the
//!   payload into the chosen destination.
//! - **DownloadLink**: stage the payload as a transient resource, hand it
//!   to a download sink, then release the resource.
//!
//! The capability probe decides which one applies; the façade never
//! branches on capabilities per call.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::host::{AtomicFileStream, WriteStream};

/// Which export strategy is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    InteractivePicker,
    DownloadLink,
}

/// Strategy for handing a payload to the host OS.
#[async_trait]
pub trait ExportStrategy: Send + Sync {
    fn kind(&self) -> ExportKind;

    async fn export(&self, file_name: &str, payload: &[u8]) -> io::Result<()>;
}

/// An interactive "save as" dialog.
#[async_trait]
pub trait SavePicker: Send + Sync {
    /// Ask for a destination, suggesting `suggested_name`.
    ///
    /// Returns `None` when the user dismisses the dialog.
    async fn show(&self, suggested_name: &str) -> io::Result<Option<Box<dyn WriteStream>>>;
}

/// Receives downloads triggered by [`DownloadLink`].
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Deliver the staged resource under `file_name`.
    async fn download(&self, resource: &TransientResource, file_name: &str) -> io::Result<()>;
}

/// Export through a [`SavePicker`].
pub struct InteractivePicker {
    picker: Arc<dyn SavePicker>,
}

impl InteractivePicker {
    pub fn new(picker: Arc<dyn SavePicker>) -> Self {
        Self { picker }
    }
}

#[async_trait]
impl ExportStrategy for InteractivePicker {
    fn kind(&self) -> ExportKind {
        ExportKind::InteractivePicker
    }

    async fn export(&self, file_name: &str, payload: &[u8]) -> io::Result<()> {
        let Some(mut stream) = self.picker.show(file_name).await? else {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "the user aborted a request",
            ));
        };

        if let Err(e) = stream.write(payload).await {
            if let Err(abort_err) = stream.abort().await {
                tracing::warn!(error = %abort_err, "failed to abort export stream");
            }
            return Err(e);
        }
        stream.close().await
    }
}

/// A payload staged for download. Removed from disk when dropped.
#[derive(Debug)]
pub struct TransientResource {
    file: tempfile::TempPath,
}

impl TransientResource {
    /// Stage `payload` in a fresh temporary file.
    pub async fn stage(payload: &[u8]) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("privfs-download-")
            .tempfile()?
            .into_temp_path();
        fs::write(&file, payload).await?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Release the resource now instead of on drop.
    pub fn release(self) -> io::Result<()> {
        self.file.close()
    }
}

/// Export by staging a transient resource and triggering a download.
pub struct DownloadLink {
    sink: Arc<dyn DownloadSink>,
}

impl DownloadLink {
    pub fn new(sink: Arc<dyn DownloadSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ExportStrategy for DownloadLink {
    fn kind(&self) -> ExportKind {
        ExportKind::DownloadLink
    }

    async fn export(&self, file_name: &str, payload: &[u8]) -> io::Result<()> {
        let resource = TransientResource::stage(payload).await?;
        let delivered = self.sink.download(&resource, file_name).await;
        if let Err(e) = resource.release() {
            tracing::warn!(error = %e, "failed to release transient download resource");
        }
        delivered
    }
}

/// Saves downloads into a directory, browser style.
///
/// If `name.txt` already exists, the download becomes `name (1).txt`,
/// then `name (2).txt`, and so on. A name is claimed by creating the file,
/// so two downloads never end up in the same file.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the first free file for `file_name` in the downloads directory.
    pub async fn claim(&self, file_name: &str) -> io::Result<(PathBuf, fs::File)> {
        let as_path = Path::new(file_name);
        let stem = as_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        let ext = as_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        for n in 0..u32::MAX {
            let candidate = match n {
                0 => self.dir.join(file_name),
                n => self.dir.join(format!("{stem} ({n}){ext}")),
            };
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await;
            match opened {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free download name for {file_name:?}"),
        ))
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn download(&self, resource: &TransientResource, file_name: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let (target, mut file) = self.claim(file_name).await?;

        let copied = async {
            let mut source = fs::File::open(resource.path()).await?;
            tokio::io::copy(&mut source, &mut file).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = copied {
            // Explicitly ignored: the half-written download is useless either way
            let _ = fs::remove_file(&target).await;
            return Err(e);
        }

        tracing::info!(path = %target.display(), "download saved");
        Ok(())
    }
}

/// Saves to a path the user types at a terminal prompt.
///
/// An empty answer dismisses the dialog. Relative answers resolve
/// against `base_dir`.
pub struct PromptPicker {
    base_dir: PathBuf,
}

impl PromptPicker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Turn the user's answer into a destination, or `None` for cancel.
    pub fn destination(&self, answer: &str) -> Option<PathBuf> {
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }
        Some(self.base_dir.join(answer))
    }
}

#[async_trait]
impl SavePicker for PromptPicker {
    async fn show(&self, suggested_name: &str) -> io::Result<Option<Box<dyn WriteStream>>> {
        let prompt = format!(
            "Save \"{suggested_name}\" as [{}] (empty to cancel): ",
            self.base_dir.join(suggested_name).display()
        );
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            use std::io::Write as _;
            let mut stderr = io::stderr();
            stderr.write_all(prompt.as_bytes())?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(io::Error::other)??;

        let Some(target) = self.destination(&answer) else {
            return Ok(None);
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let stream = AtomicFileStream::create(target).await?;
        Ok(Some(Box::new(stream)))
    }
}

/// Export strategy requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Picker when the capability probe finds one, download otherwise.
    #[default]
    Auto,
    Picker,
    Download,
}

impl std::str::FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ExportMode::Auto),
            "picker" => Ok(ExportMode::Picker),
            "download" => Ok(ExportMode::Download),
            other => Err(format!("unknown export mode: {other} (expected auto, picker or download)")),
        }
    }
}

/// What the host environment can do, as found by [`ExportCapabilities::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCapabilities {
    /// An interactive save dialog can be shown.
    pub save_picker: bool,
}

impl ExportCapabilities {
    /// Detect capabilities of the current process.
    ///
    /// A save dialog needs a terminal on stdin to ask the question.
    pub fn probe() -> Self {
        use std::io::IsTerminal as _;
        Self {
            save_picker: io::stdin().is_terminal(),
        }
    }
}

/// Pick the strategy kind for a mode and a set of capabilities.
pub fn select_kind(mode: ExportMode, caps: ExportCapabilities) -> ExportKind {
    match mode {
        ExportMode::Picker => ExportKind::InteractivePicker,
        ExportMode::Download => ExportKind::DownloadLink,
        ExportMode::Auto if caps.save_picker => ExportKind::InteractivePicker,
        ExportMode::Auto => ExportKind::DownloadLink,
    }
}

/// Build the strategy for a mode and a set of capabilities.
pub fn select_strategy(
    mode: ExportMode,
    caps: ExportCapabilities,
    picker: Arc<dyn SavePicker>,
    sink: Arc<dyn DownloadSink>,
) -> Arc<dyn ExportStrategy> {
    match select_kind(mode, caps) {
        ExportKind::InteractivePicker => Arc::new(InteractivePicker::new(picker)),
        ExportKind::DownloadLink => Arc::new(DownloadLink::new(sink)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExportMode::Auto, true, ExportKind::InteractivePicker)]
    #[case(ExportMode::Auto, false, ExportKind::DownloadLink)]
    #[case(ExportMode::Picker, false, ExportKind::InteractivePicker)]
    #[case(ExportMode::Download, true, ExportKind::DownloadLink)]
    fn selection_follows_mode_and_capability(
        #[case] mode: ExportMode,
        #[case] save_picker: bool,
        #[case] expected: ExportKind,
    ) {
        let caps = ExportCapabilities { save_picker };
        assert_eq!(select_kind(mode, caps), expected);
        // Same inputs, same answer
        assert_eq!(select_kind(mode, caps), select_kind(mode, caps));
    }

    #[test]
    fn export_mode_parses() {
        assert_eq!("auto".parse::<ExportMode>(), Ok(ExportMode::Auto));
        assert_eq!("picker".parse::<ExportMode>(), Ok(ExportMode::Picker));
        assert_eq!("download".parse::<ExportMode>(), Ok(ExportMode::Download));
        assert!("dialog".parse::<ExportMode>().is_err());
    }

    #[tokio::test]
    async fn claim_numbers_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = DirectoryDownloads::new(dir.path());

        let (first, _) = downloads.claim("a.txt").await.unwrap();
        assert_eq!(first, dir.path().join("a.txt"));
        let (second, _) = downloads.claim("a.txt").await.unwrap();
        assert_eq!(second, dir.path().join("a (1).txt"));
        let (third, _) = downloads.claim("a.txt").await.unwrap();
        assert_eq!(third, dir.path().join("a (2).txt"));

        std::fs::write(dir.path().join("README"), "x").unwrap();
        let (readme, _) = downloads.claim("README").await.unwrap();
        assert_eq!(readme, dir.path().join("README (1)"));
        assert_eq!(std::fs::read(dir.path().join("README")).unwrap(), b"x");
    }

    #[tokio::test]
    async fn concurrent_downloads_never_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(DirectoryDownloads::new(dir.path().join("dl")));
        let strategy = Arc::new(DownloadLink::new(sink));

        let exports: Vec<_> = (0..6)
            .map(|i| {
                let strategy = Arc::clone(&strategy);
                tokio::spawn(async move {
                    strategy
                        .export("notes.txt", format!("copy-{i}").as_bytes())
                        .await
                })
            })
            .collect();
        for export in exports {
            export.await.unwrap().unwrap();
        }

        let mut contents: Vec<String> = std::fs::read_dir(dir.path().join("dl"))
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        contents.sort();
        let expected: Vec<String> = (0..6).map(|i| format!("copy-{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[tokio::test]
    async fn download_link_delivers_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = DownloadLink::new(Arc::new(DirectoryDownloads::new(dir.path().join("dl"))));

        strategy.export("notes.txt", b"abc").await.unwrap();
        strategy.export("notes.txt", b"def").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("dl/notes.txt")).unwrap(), b"abc");
        assert_eq!(std::fs::read(dir.path().join("dl/notes (1).txt")).unwrap(), b"def");
    }

    #[tokio::test]
    async fn transient_resource_removed_on_release() {
        let resource = TransientResource::stage(b"payload").await.unwrap();
        let path = resource.path().to_path_buf();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        resource.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn prompt_picker_answers() {
        let picker = PromptPicker::new("/home/user");
        assert_eq!(picker.destination("  \n"), None);
        assert_eq!(
            picker.destination("out.txt\n"),
            Some(PathBuf::from("/home/user/out.txt"))
        );
        assert_eq!(
            picker.destination("/tmp/x.txt"),
            Some(PathBuf::from("/tmp/x.txt"))
        );
    }
}
