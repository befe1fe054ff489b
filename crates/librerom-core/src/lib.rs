//! # LibreROM Core Library
//!
//! Binary analysis engine for automotive ECU firmware images.
//!
//! LibreROM takes a raw ROM dump (typically 32 or 64 KiB) and recovers its
//! internal structure: identity strings, the 16-bit summation checksum, and
//! the locations and shapes of calibration tables ("maps"). The surrounding
//! UI (hex grids, table editors, charts) lives elsewhere and consumes the
//! results through [`parse::ParseResult`] and [`map::MapDescriptor`].

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Identity extraction (part numbers, release codes)
//! - Integrity checksum computation and verification
//! - Heuristic structural discovery (self-referencing pointers, pointer
//!   lists, candidate map headers)
//! - Bidirectional raw-byte / engineering-value conversion for reading and
//!   writing calibration data
//!
//! The engine is synchronous, CPU-bound and stateless: each parse takes its
//! own buffer and returns a fresh result. Nothing here touches the
//! filesystem or the network.
//!
//! ## Example
//!
//! ```rust,ignore
//! use librerom_core::prelude::*;
//!
//! let rom = RomImage::new("dump.bin", bytes);
//! let result = parse_rom(&rom, &ParseConfig::default());
//! for map in &result.detected_maps {
//!     let grid = extract_map_data(rom.data(), map);
//!     println!("{}: {:?}", map.name, grid);
//! }
//! ```

pub mod checksum;
pub mod codec;
pub mod error;
pub mod extract;
pub mod formula;
pub mod identity;
pub mod map;
pub mod parse;
pub mod rom;
pub mod structure;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checksum::ChecksumConfig;
    pub use crate::codec::{read_int, write_int, Endianness};
    pub use crate::error::RomError;
    pub use crate::extract::{axis_values, commit_map_data, extract_map_data, write_map_data};
    pub use crate::formula::Formula;
    pub use crate::identity::{find_part_number_any, IdEncoding, IdMatch, IdentityPattern};
    pub use crate::map::{Axis, AxisSource, MapDescriptor, MapDimension};
    pub use crate::parse::{parse_rom, DiagnosticEntry, DiagnosticKind, ParseConfig, ParseResult};
    pub use crate::rom::RomImage;
    pub use crate::structure::{PointerBlock, StructureConfig};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
