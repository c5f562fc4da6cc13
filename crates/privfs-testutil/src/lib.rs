//! Test utilities for privfs.
//!
//! - `host`: `FaultyHost`, a storage host wrapper that fails on demand
//!   and records every call
//! - `export`: `ScriptedPicker` and `RecordingDownloads`, either of which
//!   can be told to fail
//! - `source`: `BrokenSource`, an import source that fails mid-read
//! - `scenario`: `tests/scenarios/*.test` files, command scripts with
//!   expected status lines

pub mod export;
pub mod host;
pub mod scenario;
pub mod source;

pub use export::{Download, PickerResponse, RecordingDownloads, SavedFile, ScriptedPicker};
pub use host::{FaultyHost, Step};
pub use scenario::{ScenarioOutcome, ScenarioReport};
pub use source::BrokenSource;
