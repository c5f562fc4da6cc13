//! Export fakes: a save picker with scripted answers and a download sink
//! that remembers what it received.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use privfs_kernel::export::{DownloadSink, SavePicker, TransientResource};
use privfs_kernel::host::WriteStream;

/// How the fake user answers the next save dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResponse {
    /// Accept the suggested name.
    Accept,
    /// Choose a different name.
    SaveAs(String),
    /// Dismiss the dialog.
    Cancel,
    /// Accept, but the destination fails on the first write.
    FailWrite,
}

/// A file saved through [`ScriptedPicker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A save picker that answers from a script. Accepts once the script
/// runs out.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPicker {
    responses: Arc<Mutex<VecDeque<PickerResponse>>>,
    saved: Arc<Mutex<Vec<SavedFile>>>,
    shown: Arc<Mutex<Vec<String>>>,
    aborted: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: PickerResponse) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Files committed through the picker, in order.
    pub fn saved(&self) -> Vec<SavedFile> {
        lock(&self.saved).clone()
    }

    /// Suggested names of every dialog shown.
    pub fn shown(&self) -> Vec<String> {
        lock(&self.shown).clone()
    }

    /// Destinations whose stream was aborted instead of closed.
    pub fn aborted(&self) -> Vec<String> {
        lock(&self.aborted).clone()
    }
}

#[async_trait]
impl SavePicker for ScriptedPicker {
    async fn show(&self, suggested_name: &str) -> io::Result<Option<Box<dyn WriteStream>>> {
        lock(&self.shown).push(suggested_name.to_string());
        let response = lock(&self.responses)
            .pop_front()
            .unwrap_or(PickerResponse::Accept);
        let (name, fail_write) = match response {
            PickerResponse::Accept => (suggested_name.to_string(), false),
            PickerResponse::SaveAs(name) => (name, false),
            PickerResponse::FailWrite => (suggested_name.to_string(), true),
            PickerResponse::Cancel => return Ok(None),
        };
        Ok(Some(Box::new(CaptureStream {
            name,
            buffer: Vec::new(),
            fail_write,
            saved: Arc::clone(&self.saved),
            aborted: Arc::clone(&self.aborted),
        })))
    }
}

struct CaptureStream {
    name: String,
    buffer: Vec<u8>,
    fail_write: bool,
    saved: Arc<Mutex<Vec<SavedFile>>>,
    aborted: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl WriteStream for CaptureStream {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_write {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "destination full"));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn close(self: Box<Self>) -> io::Result<()> {
        let Self {
            name,
            buffer,
            saved,
            ..
        } = *self;
        lock(&saved).push(SavedFile { name, data: buffer });
        Ok(())
    }

    async fn abort(self: Box<Self>) -> io::Result<()> {
        lock(&self.aborted).push(self.name.clone());
        Ok(())
    }
}

/// A download as seen by [`RecordingDownloads`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub data: Vec<u8>,
    /// Where the transient resource lived while the download ran.
    pub resource_path: PathBuf,
}

/// A download sink that keeps every download in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingDownloads {
    downloads: Arc<Mutex<Vec<Download>>>,
    failure: Option<String>,
}

impl RecordingDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records each download, then fails it with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Every download handed to the sink, failed ones included.
    pub fn downloads(&self) -> Vec<Download> {
        lock(&self.downloads).clone()
    }
}

#[async_trait]
impl DownloadSink for RecordingDownloads {
    async fn download(&self, resource: &TransientResource, file_name: &str) -> io::Result<()> {
        let data = tokio::fs::read(resource.path()).await?;
        lock(&self.downloads).push(Download {
            file_name: file_name.to_string(),
            data,
            resource_path: resource.path().to_path_buf(),
        });
        match &self.failure {
            Some(message) => Err(io::Error::other(message.clone())),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
