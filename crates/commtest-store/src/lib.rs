#![forbid(unsafe_code)]
//! Ports to the external collaborators: test/result persistence with a
//! change feed, and blob storage.

mod backend;
mod blob;
mod error;
mod local;
mod memory;

pub use backend::{ChangeNotice, ChangeTable, TestBackend, CHANGE_FEED_CAPACITY};
pub use blob::{blob_segments, BlobStore, LocalBlobStore};
pub use error::{StoreError, StoreErrorCode};
pub use local::{LocalFsBackend, ASSETS_FILE, JOBS_FILE, RESULTS_DIR, TESTS_DIR};
pub use memory::InMemoryBackend;

pub const CRATE_NAME: &str = "commtest-store";
