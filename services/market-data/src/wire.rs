//! Snapshot wire format
//!
//! One MessagePack map per snapshot, self-describing keys:
//!
//! ```text
//! { "ts": u64, "seq": u64,
//!   "bids": [[f64 price, u64 size], ...],
//!   "asks": [[f64 price, u64 size], ...] }
//! ```
//!
//! Framing comes from the WebSocket binary message boundary; this module
//! only handles the payload bytes.

use crate::snapshot::DepthSnapshot;

/// Encode a snapshot as a named MessagePack map.
pub fn encode_snapshot(snapshot: &DepthSnapshot) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(snapshot)
}

/// Decode a snapshot frame.
pub fn decode_snapshot(bytes: &[u8]) -> Result<DepthSnapshot, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DepthSnapshot {
        DepthSnapshot {
            ts: 1_234_567,
            seq: 42,
            bids: vec![(10.00, 7), (9.99, 3)],
            asks: vec![(10.01, 4), (10.02, 11)],
        }
    }

    #[test]
    fn test_roundtrip_recovers_snapshot() {
        let snap = sample();
        let bytes = encode_snapshot(&snap).unwrap();
        let back = decode_snapshot(&bytes).unwrap();
        assert_eq!(snap, back);
    }

    #[test]
    fn test_encoding_is_self_describing() {
        let bytes = encode_snapshot(&sample()).unwrap();
        // Named maps embed their keys
        let payload = String::from_utf8_lossy(&bytes);
        for key in ["ts", "seq", "bids", "asks"] {
            assert!(payload.contains(key), "missing key {key:?} in frame");
        }
    }

    #[test]
    fn test_empty_sides_encode() {
        let snap = DepthSnapshot {
            ts: 0,
            seq: 1,
            bids: Vec::new(),
            asks: Vec::new(),
        };
        let back = decode_snapshot(&encode_snapshot(&snap).unwrap()).unwrap();
        assert_eq!(snap, back);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(decode_snapshot(&[0xc1, 0xff, 0x00]).is_err());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode_snapshot(&sample()).unwrap();
        let b = encode_snapshot(&sample()).unwrap();
        assert_eq!(a, b);
    }
}
