//! Binary array codec
//!
//! Deterministic, bit-exact encoding of numeric sequences into the
//! text-safe base64 blocks embedded in mzML. Two paths: 8-byte
//! little-endian doubles (m/z arrays) and 4-byte little-endian singles
//! (intensity arrays, narrowed from the store's doubles). Standard
//! alphabet, padded. An empty input yields an empty payload, which is
//! still a syntactically valid zero-length binary element.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{BufMut, BytesMut};

/// Encode values as concatenated 8-byte little-endian IEEE-754 doubles,
/// then base64.
pub fn encode_f64_base64(values: &[f64]) -> String {
    let mut buf = BytesMut::with_capacity(values.len() * 8);
    for v in values {
        buf.put_f64_le(*v);
    }
    STANDARD.encode(&buf)
}

/// Encode values narrowed to 4-byte little-endian IEEE-754 singles,
/// then base64.
pub fn encode_f32_base64(values: &[f64]) -> String {
    let mut buf = BytesMut::with_capacity(values.len() * 4);
    for v in values {
        buf.put_f32_le(*v as f32);
    }
    STANDARD.encode(&buf)
}
