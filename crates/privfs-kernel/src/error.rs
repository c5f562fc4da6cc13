//! OperationError: the single failure type of every façade operation.
//!
//! Host failures of any kind (not found, permission denied, I/O) collapse
//! into one error that only carries display text:
//!
//! ```text
//! Error reading file: not found: notes.txt
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

/// Which façade operation failed. Only used to phrase the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    WritingFile,
    ReadingFile,
    DeletingFile,
    CreatingDirectory,
    SavingFile,
    ImportingFile,
    ListingDirectory,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::WritingFile => "writing file",
            Action::ReadingFile => "reading file",
            Action::DeletingFile => "deleting file",
            Action::CreatingDirectory => "creating directory",
            Action::SavingFile => "saving file",
            Action::ImportingFile => "importing file",
            Action::ListingDirectory => "listing directory",
        })
    }
}

/// A failed façade operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error {action}: {message}")]
pub struct OperationError {
    pub action: Action,
    pub message: String,
}

impl OperationError {
    pub fn new(action: Action, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
        }
    }

    /// Wrap a host failure, keeping only its text.
    pub fn from_io(action: Action, err: io::Error) -> Self {
        Self::new(action, err.to_string())
    }
}

/// Outcome of a façade operation: a success message or an error.
pub type OperationResult = Result<String, OperationError>;

/// Render an outcome as the single status line shown to the user.
pub fn render(result: &OperationResult) -> String {
    match result {
        Ok(message) => message.clone(),
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_action() {
        let err = OperationError::from_io(
            Action::ReadingFile,
            io::Error::new(io::ErrorKind::NotFound, "not found: notes.txt"),
        );
        assert_eq!(err.to_string(), "Error reading file: not found: notes.txt");
    }

    #[test]
    fn render_both_branches() {
        assert_eq!(render(&Ok("done".into())), "done");
        let err = OperationError::new(Action::SavingFile, "the user aborted a request");
        assert_eq!(render(&Err(err)), "Error saving file: the user aborted a request");
    }
}
