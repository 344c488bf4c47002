//! Error types for player persistence.

use mglib_types::CodecError;

/// Failure reading or writing a [`PlayerStore`](crate::PlayerStore).
///
/// A join or leave that hits one of these is aborted and leaves the
/// roster untouched.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("player store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("player record could not be (de)serialized: {0}")]
    Codec(#[from] CodecError),

    /// The store refused the write. Returned by test doubles that
    /// simulate a full disk or a read-only data directory.
    #[error("player store rejected the write: {0}")]
    Rejected(String),
}
