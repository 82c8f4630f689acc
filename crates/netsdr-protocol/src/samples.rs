//! Sample extraction from data item bodies.

use std::iter::FusedIterator;
use std::slice::ChunksExact;

use crate::codec::ProtocolError;

/// Widest supported sample, in bits.
pub const MAX_BITS_PER_SAMPLE: u32 = 32;

/// Split `payload` into little-endian integer samples of `bits_per_sample` bits.
///
/// Each sample is zero-extended to 32 bits. Trailing bytes that do not form a
/// complete sample are ignored. The returned iterator borrows `payload` and
/// can be cloned to walk the samples again.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidSampleSize`] unless `bits_per_sample` is a
/// non-zero multiple of 8 no larger than 32.
pub fn unpack(bits_per_sample: u32, payload: &[u8]) -> Result<Samples<'_>, ProtocolError> {
    if bits_per_sample == 0 || bits_per_sample % 8 != 0 || bits_per_sample > MAX_BITS_PER_SAMPLE
    {
        return Err(ProtocolError::InvalidSampleSize(bits_per_sample));
    }

    let chunk_size = (bits_per_sample / 8) as usize;
    Ok(Samples {
        chunks: payload.chunks_exact(chunk_size),
    })
}

/// Iterator over the samples of a data item body.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl Iterator for Samples<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.chunks.next().map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            i32::from_le_bytes(word)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Samples<'_> {}

impl FusedIterator for Samples<'_> {}
