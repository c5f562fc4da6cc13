//! Property tests for the façade: round-trips and directory idempotence.

use std::sync::Arc;

use privfs_kernel::export::DownloadLink;
use privfs_kernel::host::MemoryHost;
use privfs_kernel::FileStore;
use privfs_testutil::RecordingDownloads;
use proptest::prelude::*;

fn store() -> FileStore {
    FileStore::new(
        Arc::new(MemoryHost::new()),
        Arc::new(DownloadLink::new(Arc::new(RecordingDownloads::new()))),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// Names a host accepts: one path component, never `.` or `..`.
fn entry_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ .-]{1,24}".prop_filter("dot names are reserved", |n| n != "." && n != "..")
}

proptest! {
    #[test]
    fn write_then_read_returns_contents(name in entry_name(), contents in "\\PC{0,256}") {
        let rt = runtime();
        let store = store();
        let read = rt.block_on(async {
            store.write_file(&name, contents.as_bytes()).await.unwrap();
            store.read_file(&name).await.unwrap()
        });
        prop_assert_eq!(read, format!("File content: {contents}"));
    }

    #[test]
    fn create_directory_is_idempotent(name in entry_name(), repeats in 1usize..5) {
        let rt = runtime();
        let store = store();
        let listing = rt.block_on(async {
            for _ in 0..repeats {
                store.create_directory(&name).await.unwrap();
            }
            store.list_directory(None).await.unwrap()
        });
        prop_assert_eq!(listing, format!("{name}/"));
    }

    #[test]
    fn delete_then_read_never_returns_stale_content(name in entry_name(), contents in "\\PC{0,64}") {
        let rt = runtime();
        let store = store();
        let read = rt.block_on(async {
            store.write_file(&name, contents.as_bytes()).await.unwrap();
            store.delete_file(&name).await.unwrap();
            store.read_file(&name).await
        });
        prop_assert!(read.is_err());
    }
}
