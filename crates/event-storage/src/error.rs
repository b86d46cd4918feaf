/// Errors an [`crate::EventStorageEngine`] can report.
///
/// The in-memory reference engine can only ever report [`StorageError::Closed`]
/// — appends and reads against a `Mutex<Vec<_>>` do not fail — but the trait
/// is generic over a real engine's error type, so a durable backend (sled,
/// rocksdb, a remote service) can surface its own I/O failures through the
/// same `publish`/producer error paths.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The engine has been shut down and no longer accepts appends or reads.
    #[error("storage engine is closed")]
    Closed,
}
