//! `f64` arrays as little-endian byte blobs.

use forecast_core::{Error, Result};

const F64_BYTES: usize = std::mem::size_of::<f64>();

pub(crate) fn encode(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * F64_BYTES);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % F64_BYTES != 0 {
        return Err(Error::store(format!(
            "blob of {} bytes is not a whole number of f64 values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut buf = [0u8; F64_BYTES];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}
