//! Error types for the codec layer.

/// Errors raised while turning persisted records into bytes and back.
///
/// Stores in the other crates wrap this in their own error enums, so a
/// corrupt snapshot file surfaces as "persistence failed" at the round
/// layer while still carrying the original serde message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed, truncated or mismatched data).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded fine but describe something impossible,
    /// e.g. a record for a different arena than the file it came from.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
