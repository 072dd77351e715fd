//! Fixed-width sample extraction from data frame bodies.
//!
//! NetSDR data frames carry packed little-endian samples whose width is
//! negotiated out of band (8, 16, 24, or 32 bits). [`decode_samples`]
//! walks a body buffer lazily and yields each complete sample widened
//! into an `i32` container.
//!
//! Widening is **zero**-extension, not sign-extension: an 8-bit sample of
//! `0xFF` decodes to 255, not -1. That mirrors the wire semantics of the
//! capture FIFO rather than two's-complement PCM.

use netsdr_core::{Error, Result};

/// Create a lazy iterator over the samples packed in `body`.
///
/// `bits_per_sample` must be a multiple of 8 in `8..=32`; anything else
/// (including 0) fails with [`Error::InvalidSampleWidth`]. Trailing bytes
/// that do not complete one more sample are silently dropped.
pub fn decode_samples(bits_per_sample: u16, body: &[u8]) -> Result<Samples<'_>> {
    if bits_per_sample == 0 || bits_per_sample % 8 != 0 || bits_per_sample > 32 {
        return Err(Error::InvalidSampleWidth(bits_per_sample));
    }

    Ok(Samples {
        body,
        width: usize::from(bits_per_sample / 8),
    })
}

/// Lazy, non-restartable iterator over packed samples.
///
/// Produced by [`decode_samples`]. Re-decoding a body requires calling
/// [`decode_samples`] again.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    /// Remaining unread bytes.
    body: &'a [u8],
    /// Sample width in bytes (1..=4).
    width: usize,
}

impl Iterator for Samples<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.body.len() < self.width {
            return None;
        }

        let (chunk, rest) = self.body.split_at(self.width);
        self.body = rest;

        let mut raw = [0u8; 4];
        raw[..chunk.len()].copy_from_slice(chunk);
        Some(i32::from_le_bytes(raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.body.len() / self.width;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Samples<'_> {}
