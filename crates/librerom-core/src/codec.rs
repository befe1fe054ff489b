//! Raw value codec
//!
//! Reads and writes 8-bit and 16-bit unsigned integers at arbitrary byte
//! offsets. Reads degrade to zero for out-of-range offsets so that a scan
//! over a truncated or speculative region never aborts; writes are strict.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::RomError;

/// Byte order of stored 16-bit values
///
/// This firmware family is big-endian in its legacy layout, so that is the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// High byte at the lower address
    #[default]
    Big,
    /// Low byte at the lower address
    Little,
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endianness::Big => write!(f, "big"),
            Endianness::Little => write!(f, "little"),
        }
    }
}

/// Read an unsigned integer of `data_size` bits (8 or 16) at `offset`.
///
/// Out-of-range accesses return 0 rather than failing: heuristic map
/// candidates routinely carry speculative bounds and the extraction pipeline
/// must survive them. Unsupported widths are read as a single byte.
pub fn read_int(buf: &[u8], offset: usize, data_size: u8, endian: Endianness) -> u16 {
    match data_size {
        16 => {
            if offset.checked_add(2).map_or(true, |end| end > buf.len()) {
                return 0;
            }
            match endian {
                Endianness::Big => BigEndian::read_u16(&buf[offset..offset + 2]),
                Endianness::Little => LittleEndian::read_u16(&buf[offset..offset + 2]),
            }
        }
        _ => {
            if offset >= buf.len() {
                return 0;
            }
            buf[offset] as u16
        }
    }
}

/// Write an unsigned integer of `data_size` bits (8 or 16) at `offset`.
///
/// The value is clamped to the width's range (truncated to the nearest
/// bound, never wrapped). Writing past the end of the buffer is a caller
/// error and leaves the buffer untouched.
pub fn write_int(
    buf: &mut [u8],
    offset: usize,
    data_size: u8,
    endian: Endianness,
    value: i64,
) -> Result<(), RomError> {
    let size = match data_size {
        8 => 1,
        16 => 2,
        other => return Err(RomError::UnsupportedWidth(other)),
    };
    if offset.checked_add(size).map_or(true, |end| end > buf.len()) {
        return Err(RomError::OutOfRange {
            offset,
            size,
            len: buf.len(),
        });
    }

    match data_size {
        16 => {
            let clamped = value.clamp(0, u16::MAX as i64) as u16;
            match endian {
                Endianness::Big => BigEndian::write_u16(&mut buf[offset..offset + 2], clamped),
                Endianness::Little => {
                    LittleEndian::write_u16(&mut buf[offset..offset + 2], clamped)
                }
            }
        }
        _ => {
            buf[offset] = value.clamp(0, u8::MAX as i64) as u8;
        }
    }
    Ok(())
}
