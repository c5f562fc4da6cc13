//! Integration tests for the privfs REPL.
//!
//! These tests run scripts through the REPL and verify behavior.

use std::sync::Arc;

use privfs_kernel::config::SessionConfig;
use privfs_kernel::export::{DownloadLink, ExportStrategy, InteractivePicker};
use privfs_kernel::host::MemoryHost;
use privfs_kernel::FileStore;
use privfs_repl::Repl;
use privfs_testutil::{PickerResponse, RecordingDownloads, ScriptedPicker};

fn repl_with(strategy: Arc<dyn ExportStrategy>) -> Repl {
    let store = FileStore::new(Arc::new(MemoryHost::new()), strategy);
    Repl::with_store(store, &SessionConfig::default()).expect("Failed to create REPL")
}

fn download_repl() -> (Repl, RecordingDownloads) {
    let downloads = RecordingDownloads::new();
    let repl = repl_with(Arc::new(DownloadLink::new(Arc::new(downloads.clone()))));
    (repl, downloads)
}

fn picker_repl() -> (Repl, ScriptedPicker) {
    let picker = ScriptedPicker::new();
    let repl = repl_with(Arc::new(InteractivePicker::new(Arc::new(picker.clone()))));
    (repl, picker)
}

/// Helper to run multiple lines through a REPL and collect outputs.
fn run_script(repl: &mut Repl, script: &str) -> Vec<String> {
    let mut outputs = Vec::new();

    for line in script.lines() {
        // Skip comments and empty lines
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match repl.process_line(trimmed) {
            Ok(Some(output)) => outputs.push(output),
            Ok(None) => {}
            Err(e) => outputs.push(format!("ERROR: {}", e)),
        }
    }

    outputs
}

// ============================================================================
// Basic actions
// ============================================================================

#[test]
fn write_then_read_default_file() {
    let (mut repl, _) = download_repl();
    let outputs = run_script(&mut repl, "write\nread");
    assert_eq!(
        outputs,
        [
            "File \"example.txt\" written successfully!",
            "File content: Hello, OPFS!",
        ]
    );
}

#[test]
fn setters_are_silent_and_change_state() {
    let (mut repl, _) = download_repl();
    let outputs = run_script(
        &mut repl,
        r#"
        name notes.txt
        content abc
        dir docs
        "#,
    );
    assert!(outputs.is_empty(), "{outputs:?}");
    let session = repl.session();
    assert_eq!(session.file_name(), "notes.txt");
    assert_eq!(session.file_content(), "abc");
    assert_eq!(session.directory_name(), "docs");
}

#[test]
fn content_keeps_inner_spacing() {
    let (mut repl, _) = download_repl();
    repl.process_line("content a  b   c").unwrap();
    assert_eq!(repl.session().file_content(), "a  b   c");
}

#[test]
fn read_after_delete_is_an_error() {
    let (mut repl, _) = download_repl();
    let outputs = run_script(
        &mut repl,
        r#"
        name notes.txt
        content abc
        write
        delete
        read
        "#,
    );
    assert_eq!(outputs[1], "File \"notes.txt\" deleted successfully!");
    assert!(
        outputs[2].starts_with("Error reading file: "),
        "{}",
        outputs[2]
    );
    assert_eq!(repl.session().output(), Some(outputs[2].as_str()));
}

#[test]
fn mkdir_then_list() {
    let (mut repl, _) = download_repl();
    let outputs = run_script(&mut repl, "mkdir\nmkdir\nwrite\nls\nls myDirectory");
    assert_eq!(outputs[0], "Directory \"myDirectory\" created successfully!");
    assert_eq!(outputs[1], outputs[0]);
    assert_eq!(outputs[3], "example.txt\nmyDirectory/");
    assert_eq!(outputs[4], "(empty)");
}

#[test]
fn invalid_name_is_reported_not_raised() {
    let (mut repl, _) = download_repl();
    let outputs = run_script(&mut repl, "name a/b\nwrite");
    assert_eq!(outputs.len(), 1);
    assert!(outputs[0].starts_with("Error writing file: "), "{}", outputs[0]);
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn import_host_file_switches_working_file() {
    let (mut repl, _) = download_repl();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("photo.txt");
    std::fs::write(&source, "pixels").unwrap();

    let outputs = run_script(
        &mut repl,
        &format!("dir inbox\nimport {}\nls inbox", source.display()),
    );
    assert_eq!(
        outputs[0],
        "File \"photo.txt\" imported successfully into \"inbox\"!"
    );
    assert_eq!(outputs[1], "photo.txt");
    assert_eq!(repl.session().file_name(), "photo.txt");
}

#[test]
fn import_missing_host_file_is_reported() {
    let (mut repl, _) = download_repl();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.txt");

    let outputs = run_script(&mut repl, &format!("import {}", missing.display()));
    assert!(outputs[0].starts_with("Error importing file: "), "{}", outputs[0]);
    assert_eq!(repl.session().file_name(), "example.txt");
}

#[test]
fn import_without_path_shows_usage() {
    let (mut repl, _) = download_repl();
    assert_eq!(
        repl.process_line("import").unwrap().as_deref(),
        Some("Usage: import <path>")
    );
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn save_downloads_when_no_picker() {
    let (mut repl, downloads) = download_repl();
    let outputs = run_script(&mut repl, "write\nsave");
    assert_eq!(outputs[1], "File \"example.txt\" downloaded!");

    let got = downloads.downloads();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].data, b"Hello, OPFS!");
    assert!(!got[0].resource_path.exists());
}

#[test]
fn save_through_picker() {
    let (mut repl, picker) = picker_repl();
    let outputs = run_script(&mut repl, "write\nsave");
    assert_eq!(outputs[1], "File \"example.txt\" saved to OS!");
    assert_eq!(picker.saved()[0].data, b"Hello, OPFS!");
}

#[test]
fn cancelled_picker_is_an_error() {
    let (mut repl, picker) = picker_repl();
    picker.respond(PickerResponse::Cancel);
    let outputs = run_script(&mut repl, "write\nsave");
    assert_eq!(outputs[1], "Error saving file: the user aborted a request");
    assert!(picker.saved().is_empty());
}

#[test]
fn save_missing_file_never_opens_picker() {
    let (mut repl, picker) = picker_repl();
    let outputs = run_script(&mut repl, "save");
    assert!(outputs[0].starts_with("Error saving file: "), "{}", outputs[0]);
    assert!(picker.shown().is_empty());
}

// ============================================================================
// Meta-commands
// ============================================================================

#[test]
fn state_shows_session() {
    let (mut repl, _) = download_repl();
    let state = repl.process_line("/state").unwrap().unwrap();
    assert!(state.contains("example.txt"), "{state}");
    assert!(state.contains("myDirectory"), "{state}");
    assert!(state.contains("download"), "{state}");
    assert!(state.contains("(none)"), "{state}");
}

#[test]
fn help_lists_actions() {
    let (mut repl, _) = download_repl();
    let help = repl.process_line("/help").unwrap().unwrap();
    for action in ["write", "read", "save", "delete", "mkdir", "import", "ls"] {
        assert!(help.contains(action), "missing {action}");
    }
}

#[test]
fn quit_sets_flag() {
    let (mut repl, _) = download_repl();
    assert!(!repl.should_quit());
    repl.process_line("/quit").unwrap();
    assert!(repl.should_quit());
}

#[test]
fn unknown_commands() {
    let (mut repl, _) = download_repl();
    let out = repl.process_line("frobnicate").unwrap().unwrap();
    assert!(out.starts_with("Unknown command: frobnicate"), "{out}");
    let out = repl.process_line("/frobnicate").unwrap().unwrap();
    assert!(out.starts_with("Unknown command: /frobnicate"), "{out}");
}

#[test]
fn blank_lines_are_ignored() {
    let (mut repl, _) = download_repl();
    assert_eq!(repl.process_line("   ").unwrap(), None);
}
