//! Codec trait and the JSON implementation used by the file stores.
//!
//! Stores don't care HOW a snapshot or change record is serialized:
//! they hold something that implements [`Codec`] and hand it values.
//! Swapping JSON for a compact binary format later only touches this
//! module.

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because stores are owned by the long-lived
/// [`Library`](../mglib/struct.Library.html) context, which the async
/// tick driver shares across tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps the on-disk snapshot and rollback files readable by a
/// server operator, which matters when a crash leaves an arena half
/// restored and someone has to look at what is pending.
///
/// Output never contains a raw newline, so one encoded value per line
/// is a valid append-only log format.
///
/// ```rust
/// use mglib_types::{Codec, JsonCodec, Location};
///
/// let codec = JsonCodec;
/// let spawn = Location::new("world", 1.5, 64.0, -3.0);
/// let bytes = codec.encode(&spawn).unwrap();
/// let back: Location = codec.decode(&bytes).unwrap();
/// assert_eq!(spawn, back);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}
