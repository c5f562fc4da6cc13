//! Session: the front-end's working state.
//!
//! Holds what the user has typed (file name, content, directory name) and
//! the last status line. Actions run a façade operation with that state
//! and record its rendered outcome. Façade events are applied after every
//! action; an import makes the imported file the working file.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::config::{Backend, Config, SessionConfig};
use crate::error::{render, OperationResult};
use crate::export::{self, DirectoryDownloads, ExportCapabilities, PromptPicker};
use crate::facade::{FileStore, ImportSource, StoreEvent};
use crate::host::{LocalHost, MemoryHost, StorageHost};

/// Build a [`FileStore`] as configured.
///
/// The export strategy is chosen here, once, from `caps`.
pub fn open_store(config: &Config, caps: ExportCapabilities) -> FileStore {
    let host: Arc<dyn StorageHost> = match config.storage.backend {
        Backend::Local => Arc::new(LocalHost::new(&config.storage.root)),
        Backend::Memory => Arc::new(MemoryHost::new()),
    };
    let downloads = Arc::new(DirectoryDownloads::new(&config.export.download_dir));
    let picker = Arc::new(PromptPicker::new(&config.export.download_dir));
    let strategy = export::select_strategy(config.export.mode, caps, picker, downloads);

    tracing::info!(
        backend = ?config.storage.backend,
        export = ?strategy.kind(),
        serialize_same_name = config.storage.serialize_same_name,
        "file store ready"
    );

    let store = FileStore::new(host, strategy);
    if config.storage.serialize_same_name {
        store.with_name_locks()
    } else {
        store
    }
}

/// Front-end state around a [`FileStore`].
pub struct Session {
    store: FileStore,
    events: broadcast::Receiver<StoreEvent>,
    file_name: String,
    file_content: String,
    directory_name: String,
    output: Option<String>,
}

impl Session {
    pub fn new(store: FileStore, initial: &SessionConfig) -> Self {
        let events = store.subscribe();
        Self {
            store,
            events,
            file_name: initial.file_name.clone(),
            file_content: initial.file_content.clone(),
            directory_name: initial.directory_name.clone(),
            output: None,
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn file_content(&self) -> &str {
        &self.file_content
    }

    pub fn set_file_content(&mut self, content: impl Into<String>) {
        self.file_content = content.into();
    }

    pub fn directory_name(&self) -> &str {
        &self.directory_name
    }

    pub fn set_directory_name(&mut self, name: impl Into<String>) {
        self.directory_name = name.into();
    }

    /// The last status line, if any action has run.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub async fn write(&mut self) -> &str {
        let result = self
            .store
            .write_file(&self.file_name, self.file_content.as_bytes())
            .await;
        self.finish(result)
    }

    pub async fn read(&mut self) -> &str {
        let result = self.store.read_file(&self.file_name).await;
        self.finish(result)
    }

    pub async fn save_to_os(&mut self) -> &str {
        let result = self.store.export_to_host(&self.file_name).await;
        self.finish(result)
    }

    pub async fn delete(&mut self) -> &str {
        let result = self.store.delete_file(&self.file_name).await;
        self.finish(result)
    }

    pub async fn create_directory(&mut self) -> &str {
        let result = self.store.create_directory(&self.directory_name).await;
        self.finish(result)
    }

    pub async fn import(&mut self, source: ImportSource) -> &str {
        let result = self.store.import_file(source, &self.directory_name).await;
        self.finish(result)
    }

    pub async fn list(&mut self, directory: Option<&str>) -> &str {
        let result = self.store.list_directory(directory).await;
        self.finish(result)
    }

    /// Record a status line that did not come from the store, e.g. a
    /// host file that could not be opened for import.
    pub fn report(&mut self, message: impl Into<String>) -> &str {
        self.output.insert(message.into())
    }

    fn finish(&mut self, result: OperationResult) -> &str {
        self.apply_events();
        self.output.insert(render(&result))
    }

    fn apply_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(StoreEvent::Imported { file_name, .. }) => self.file_name = file_name,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session missed store events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
