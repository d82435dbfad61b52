//! Known-plaintext mask detection for trailer-bearing files (`mflac`, `mgg`).
//!
//! Lossless and Ogg streams carry long zero-filled regions (padding blocks,
//! silence), and XOR with zero exposes the keystream.  Every 128-byte aligned
//! block inside the first segment is therefore a candidate matrix.  A
//! candidate must fold back into a seed (see [`Key256Mask::seed`]) and must
//! decrypt the body head to the expected container magic.

use std::sync::Arc;

use tracing::debug;

use super::{Key256Mask, Mask, MaskDetector, MaskError, MATRIX_LEN, SEGMENT_LEN};
use crate::sniff;

/// Bytes of the body head decrypted when testing a candidate.
const PROBE_LEN: usize = 8;

pub struct FlacMaskDetector;

impl MaskDetector for FlacMaskDetector {
    fn detect(&self, body: &[u8]) -> Result<Arc<dyn Mask>, MaskError> {
        detect_by_header(body, "flac", sniff::is_flac)
    }
}

pub struct OggMaskDetector;

impl MaskDetector for OggMaskDetector {
    fn detect(&self, body: &[u8]) -> Result<Arc<dyn Mask>, MaskError> {
        detect_by_header(body, "ogg", sniff::is_ogg)
    }
}

fn detect_by_header(
    body:      &[u8],
    container: &'static str,
    accept:    fn(&[u8]) -> bool,
) -> Result<Arc<dyn Mask>, MaskError> {
    if body.len() < MATRIX_LEN {
        return Err(MaskError::BodyTooShort { len: body.len() });
    }
    let window = &body[..body.len().min(SEGMENT_LEN)];
    let head   = &body[..body.len().min(PROBE_LEN)];

    for (i, block) in window.chunks_exact(MATRIX_LEN).enumerate() {
        let Some(candidate) = Key256Mask::from_block(block) else { continue };
        if candidate.seed().is_some() && accept(&candidate.apply(head)) {
            debug!(container, offset = i * MATRIX_LEN, "mask candidate accepted");
            return Ok(Arc::new(candidate));
        }
    }
    Err(MaskError::NotFound { container })
}
