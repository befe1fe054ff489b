//! Firmware integrity checksum
//!
//! The firmware family protects the image with a 16-bit summation checksum:
//! every byte except a 2-byte trailer is summed modulo 65536 and the result
//! is stored big-endian in the trailer. The trailer sits in the final two
//! bytes of the image in the legacy layout; revised layouts move it, so its
//! position is configuration rather than a constant.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::error::RomError;

/// Checksum layout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksumConfig {
    /// Byte offset of the 2-byte trailer. `None` means the final two bytes.
    pub trailer_offset: Option<usize>,

    /// Smallest buffer considered a plausible firmware image. Verification
    /// of anything shorter reports invalid rather than summing noise.
    pub min_size: usize,
}

impl Default for ChecksumConfig {
    fn default() -> Self {
        Self {
            trailer_offset: None,
            min_size: 16 * 1024,
        }
    }
}

impl ChecksumConfig {
    /// Resolve the trailer offset for a buffer of `len` bytes
    pub fn trailer_offset(&self, len: usize) -> usize {
        self.trailer_offset.unwrap_or(len.saturating_sub(2))
    }

    /// Sum every byte outside the trailer, modulo 65536
    pub fn calculate(&self, buf: &[u8]) -> u16 {
        let trailer = self.trailer_offset(buf.len());
        let trailer_end = trailer.saturating_add(2);
        let mut sum = 0u16;
        for (i, &b) in buf.iter().enumerate() {
            if i >= trailer && i < trailer_end {
                continue;
            }
            sum = sum.wrapping_add(b as u16);
        }
        sum
    }

    /// The big-endian checksum value currently stored in the trailer
    pub fn stored(&self, buf: &[u8]) -> u16 {
        let trailer = self.trailer_offset(buf.len());
        if trailer.checked_add(2).map_or(true, |end| end > buf.len()) {
            return 0;
        }
        BigEndian::read_u16(&buf[trailer..trailer + 2])
    }

    /// True if the stored trailer matches the computed sum.
    ///
    /// Buffers below [`ChecksumConfig::min_size`] always verify false; the
    /// sum over a truncated dump is not meaningful.
    pub fn verify(&self, buf: &[u8]) -> bool {
        if buf.len() < self.min_size {
            return false;
        }
        let trailer = self.trailer_offset(buf.len());
        if trailer.checked_add(2).map_or(true, |end| end > buf.len()) {
            return false;
        }
        self.calculate(buf) == self.stored(buf)
    }

    /// Recompute the checksum and overwrite the trailer, returning the new
    /// value. After this, [`ChecksumConfig::verify`] holds on the same
    /// buffer (length permitting).
    pub fn commit(&self, buf: &mut [u8]) -> Result<u16, RomError> {
        let trailer = self.trailer_offset(buf.len());
        if trailer.checked_add(2).map_or(true, |end| end > buf.len()) {
            return Err(RomError::TrailerOutOfRange {
                offset: trailer,
                len: buf.len(),
            });
        }
        let sum = self.calculate(buf);
        BigEndian::write_u16(&mut buf[trailer..trailer + 2], sum);
        Ok(sum)
    }
}
