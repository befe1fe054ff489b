//! ROM image container
//!
//! A firmware dump loaded into memory. The buffer is fixed-length and
//! immutable for the lifetime of the value; edits go through an owned copy
//! (see [`crate::extract::commit_map_data`]).

use serde::{Deserialize, Serialize};

/// A complete firmware image with a display name
///
/// The name comes from whatever loaded the file (file picker, fetch); the
/// core only carries it through into diagnostics and results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RomImage {
    name: String,
    data: Vec<u8>,
}

impl RomImage {
    /// Wrap a loaded buffer. The length is fixed from here on.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Display name of the image
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length image
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take ownership of the bytes, consuming the image
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for RomImage {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
