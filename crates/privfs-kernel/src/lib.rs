//! privfs-kernel: the core of privfs.
//!
//! This crate provides:
//!
//! - **Hosts**: the sandboxed storage capability (`StorageHost`), in memory
//!   or in a private directory on disk
//! - **FileStore**: the façade turning "write / read / delete / mkdir /
//!   import / export" into host calls and one status string
//! - **Export**: picker and download strategies for getting a file out
//! - **Session**: the front-end's working state around a `FileStore`
//! - **Config**: TOML configuration and XDG paths

pub mod config;
pub mod error;
pub mod export;
pub mod facade;
pub mod host;
pub mod locks;
pub mod paths;
pub mod session;

pub use config::Config;
pub use error::{Action, OperationError, OperationResult};
pub use export::{ExportCapabilities, ExportKind, ExportMode, ExportStrategy};
pub use facade::{FileStore, ImportSource, StoreEvent};
pub use session::{open_store, Session};
