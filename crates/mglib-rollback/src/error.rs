use mglib_types::CodecError;

/// Errors from logging or replaying changes.
///
/// Host failures while replaying a single record are not errors: they
/// are logged and the replay moves on.
#[derive(Debug, thiserror::Error)]
pub enum RollbackError {
    #[error("rollback log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rollback record could not be (de)serialized: {0}")]
    Codec(#[from] CodecError),

    /// Arena names become file names in durable stores.
    #[error("arena name {0:?} cannot be used as a log name")]
    InvalidArenaName(String),
}
