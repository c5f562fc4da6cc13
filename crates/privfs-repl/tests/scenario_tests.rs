//! Runs the command scripts under `tests/scenarios/` through the REPL.

use std::sync::Arc;

use privfs_kernel::config::SessionConfig;
use privfs_kernel::export::DownloadLink;
use privfs_kernel::host::MemoryHost;
use privfs_kernel::FileStore;
use privfs_repl::Repl;
use privfs_testutil::scenario::{parse_scenarios, run_scenarios};
use privfs_testutil::RecordingDownloads;

const FILES_TEST: &str = include_str!("scenarios/files.test");
const DIRECTORIES_TEST: &str = include_str!("scenarios/directories.test");

fn fresh_repl() -> Repl {
    let store = FileStore::new(
        Arc::new(MemoryHost::new()),
        Arc::new(DownloadLink::new(Arc::new(RecordingDownloads::new()))),
    );
    Repl::with_store(store, &SessionConfig::default()).expect("Failed to create REPL")
}

fn run_file(content: &str) {
    let cases = parse_scenarios(content);
    assert!(!cases.is_empty(), "no scenarios parsed");

    let report = run_scenarios(&cases, || {
        let mut repl = fresh_repl();
        move |line: &str| repl.process_line(line).map_err(|e| format!("{e:#}"))
    });

    // Print the report for visibility
    println!("{report}");
    assert!(report.all_passed(), "{report}");
}

#[test]
fn file_scenarios() {
    run_file(FILES_TEST);
}

#[test]
fn directory_scenarios() {
    run_file(DIRECTORIES_TEST);
}
