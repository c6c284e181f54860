//! Binary state envelope.
//!
//! Layout (all integers little-endian):
//!
//! | offset | size | content |
//! |-------:|-----:|---------|
//! | 0 | 4 | magic `PSTA` |
//! | 4 | 4 | format version (`u32`) |
//! | 8 | 4 | payload length `n` (`u32`) |
//! | 12 | n | [`StateNode`] tree as JSON |
//!
//! Bytes after the payload are ignored, so hosts that pad chunks still load.

use crate::error::CodecError;
use crate::tree::StateNode;

/// Envelope magic.
pub const MAGIC: [u8; 4] = *b"PSTA";

/// Format version written by [`encode`].
pub const VERSION: u32 = 1;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 12;

/// Wrap a state tree in an envelope.
pub fn encode(root: &StateNode) -> Result<Vec<u8>, CodecError> {
    let payload = serde_json::to_vec(root)?;
    let len =
        u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Unwrap an envelope produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<StateNode, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TooShort(bytes.len()));
    }

    let magic = read_array(bytes, 0);
    if magic != MAGIC {
        return Err(CodecError::BadMagic(magic));
    }

    let version = u32::from_le_bytes(read_array(bytes, 4));
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let expected = u32::from_le_bytes(read_array(bytes, 8)) as usize;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            available: payload.len(),
        });
    }

    Ok(serde_json::from_slice(&payload[..expected])?)
}

/// Copy four header bytes; callers have checked the length.
fn read_array(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[offset..offset + 4]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StateNode {
        StateNode::new("state").with_child(
            StateNode::new("parameters").with_child(
                StateNode::new("PARAM")
                    .with_attribute("id", "volume")
                    .with_attribute("value", "0.75"),
            ),
        )
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"PSTA");
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
        let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(len, bytes.len() - HEADER_LEN);
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut bytes = encode(&sample()).unwrap();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_rejects_short_input() {
        assert!(matches!(decode(b"PSTA"), Err(CodecError::TooShort(4))));
        assert!(matches!(decode(&[]), Err(CodecError::TooShort(0))));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(CodecError::BadMagic(m)) if &m == b"XSTA"));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CodecError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = encode(&sample()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode(cut),
            Err(CodecError::Truncated { expected, available }) if expected == available + 3
        ));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(b"{oops");
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
