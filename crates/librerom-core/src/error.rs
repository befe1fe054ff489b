//! Error types for ROM analysis

use thiserror::Error;

/// Errors that can occur while reading or writing ROM data
///
/// Read-side degradation (zero-fill, soft formula failures, missing identity
/// markers) is deliberately not represented here; only operations that would
/// corrupt or lose caller data return an error.
#[derive(Error, Debug)]
pub enum RomError {
    #[error("write of {size} byte(s) at offset {offset:#06x} exceeds ROM length {len}")]
    OutOfRange {
        offset: usize,
        size: usize,
        len: usize,
    },

    #[error("grid shape {got_rows}x{got_cols} does not match map {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("unsupported cell width: {0} bits")]
    UnsupportedWidth(u8),

    #[error("checksum trailer at {offset:#06x} does not fit in ROM of length {len}")]
    TrailerOutOfRange { offset: usize, len: usize },
}
