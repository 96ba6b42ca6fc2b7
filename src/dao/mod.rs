/// Persisted document layout.
pub mod models;
/// Snapshot persistence backends.
pub mod snapshot_store;
/// Storage error types shared by every backend.
pub mod storage;
