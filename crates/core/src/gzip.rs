//! Gzip sniffing and (de)compression for sitemaps and artifacts.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on a decompressed body, matching the largest allowed `max_bytes`.
pub const MAX_INFLATED_BYTES: usize = 200 * 1024 * 1024;

/// True if `bytes` start with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Decompress `bytes` when they are gzip, by magic bytes or by a `.gz` name.
///
/// A `.gz` name whose body is not actually gzip is returned unchanged: servers
/// routinely decode transport encoding before handing the body over.
pub fn maybe_decompress(bytes: &[u8], name_hint: &str, limit: usize) -> Result<Vec<u8>, Error> {
    let suffix = name_hint
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if is_gzip(bytes) {
        return decompress(bytes, limit);
    }
    if suffix.ends_with(".gz") {
        tracing::debug!("{} has .gz suffix but no gzip header, using body as-is", name_hint);
    }
    Ok(bytes.to_vec())
}

/// Inflate a gzip body, failing with [`Error::FetchTooLarge`] past `limit` bytes.
pub fn decompress(bytes: &[u8], limit: usize) -> Result<Vec<u8>, Error> {
    let mut decoder = GzDecoder::new(bytes).take(limit as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::Format(format!("invalid gzip stream: {e}")))?;
    if out.len() > limit {
        return Err(Error::FetchTooLarge(format!("decompressed body exceeds {limit} bytes")));
    }
    Ok(out)
}

pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}
