//! Canonical bincode encoding shared by persistence and content hashing.
//!
//! Every byte string that is stored or hashed goes through the same options:
//! fixed-width integers, a size ceiling, and no trailing garbage. A value
//! that decodes successfully therefore re-encodes to the exact same bytes.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Upper bound on an encoded value; guards decoding against corrupt length prefixes.
pub const MAX_ENCODED_SIZE: u64 = 32 * 1024 * 1024;

/// Errors raised while encoding or decoding persisted values.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(bincode::Error),

    #[error("decode error: {0}")]
    Decode(bincode::Error),
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_ENCODED_SIZE)
        .reject_trailing_bytes()
}

/// Encode a value into its canonical byte form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    options().serialize(value).map_err(CodecError::Encode)
}

/// Decode a value, failing on truncated, malformed or over-long input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    options().deserialize(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bytes_preserved() {
        let empty: Vec<u8> = Vec::new();
        let encoded = encode(&empty).unwrap();
        let decoded: Vec<u8> = decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_truncated_input_fails() {
        let encoded = encode(&(42u64, String::from("payload"))).unwrap();
        let result: Result<(u64, String), _> = decode(&encoded[..encoded.len() - 1]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = encode(&7u32).unwrap();
        encoded.push(0);
        let result: Result<u32, _> = decode(&encoded);
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        // A Vec<u8> whose length prefix claims u64::MAX elements.
        let bytes = u64::MAX.to_le_bytes();
        let result: Result<Vec<u8>, _> = decode(&bytes);
        assert!(result.is_err());
    }
}
