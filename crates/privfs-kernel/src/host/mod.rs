//! Storage hosts: the sandboxed capability the façade is built on.
//!
//! - **MemoryHost**: in-memory ephemeral storage (tests, `--memory`)
//! - **LocalHost**: a private directory on disk
//!
//! # Design
//!
//! A host hands out handles by name, one level at a time:
//!
//! ```text
//! resolve_root()                      -> /
//! get_directory(/, "docs", create)    -> /docs
//! get_file(/docs, "a.txt", create)    -> /docs/a.txt
//! open_write(/docs/a.txt)             -> stream; write ...; close
//! ```
//!
//! Handles are not cached between operations.

mod local;
mod memory;
mod traits;

pub use local::{AtomicFileStream, LocalHost};
pub use memory::MemoryHost;
pub use traits::{DirEntry, DirEntryKind, DirHandle, EntryName, FileHandle, StorageHost, WriteStream};
