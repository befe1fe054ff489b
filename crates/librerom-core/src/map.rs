//! Calibration map descriptors
//!
//! A map is a block of calibration data inside the ROM: a scalar, a 1D
//! curve, or a 2D/3D table, with optional axis descriptors and a scaling
//! formula. Descriptors come from heuristic discovery, from a definition
//! library, or from the user; the core only reads them to locate and
//! transform cell data; it never mutates one.
//!
//! The serialized shape is a compatibility surface: definition libraries are
//! stored as JSON and reloaded across sessions, so field renames here break
//! user data.

use serde::{Deserialize, Serialize};

use crate::codec::Endianness;

/// Where an axis gets its sample values from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AxisSource {
    /// Synthesized as `index * step`
    Step,
    /// Read from the ROM at [`Axis::offset`]
    RomAddress,
    /// Axis not present
    #[default]
    Disabled,
}

/// One dimension of a map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    /// Display label (opaque to the core)
    #[serde(default)]
    pub label: String,

    /// Display unit (opaque to the core)
    #[serde(default)]
    pub unit: String,

    /// Number of axis points
    pub size: usize,

    /// Sample source
    #[serde(default)]
    pub source: AxisSource,

    /// ROM byte address of the first sample (for [`AxisSource::RomAddress`])
    #[serde(default)]
    pub offset: usize,

    /// Step between synthesized samples (for [`AxisSource::Step`])
    #[serde(default = "default_step")]
    pub step: f64,

    /// Bit width of each stored sample: 8 or 16
    #[serde(default = "default_data_size")]
    pub data_size: u8,

    /// Byte order of 16-bit samples
    #[serde(default)]
    pub endian: Endianness,

    /// Scaling formula applied to each raw sample
    #[serde(default)]
    pub formula: String,

    /// Explicit sample override; non-empty bypasses every other field
    #[serde(default)]
    pub values: Vec<f64>,
}

fn default_step() -> f64 {
    1.0
}

fn default_data_size() -> u8 {
    8
}

impl Axis {
    /// A synthetic index axis of `size` points spaced `step` apart
    pub fn step(size: usize, step: f64) -> Self {
        Self {
            label: String::new(),
            unit: String::new(),
            size,
            source: AxisSource::Step,
            offset: 0,
            step,
            data_size: 8,
            endian: Endianness::default(),
            formula: String::new(),
            values: Vec::new(),
        }
    }

    /// An axis read from the ROM at `offset`
    pub fn rom(offset: usize, size: usize, data_size: u8) -> Self {
        Self {
            label: String::new(),
            unit: String::new(),
            size,
            source: AxisSource::RomAddress,
            offset,
            step: 1.0,
            data_size,
            endian: Endianness::default(),
            formula: String::new(),
            values: Vec::new(),
        }
    }

    /// Size in bytes of the stored axis data. Saturates rather than
    /// overflowing on absurd deserialized sizes.
    pub fn byte_len(&self) -> usize {
        self.size.saturating_mul((self.data_size as usize / 8).max(1))
    }
}

/// Descriptive shape tag, derived from a descriptor's dimensions.
///
/// Purely informational; extraction semantics depend only on
/// offset/rows/cols/width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapDimension {
    /// Single scalar cell
    Value,
    /// Single cell interpreted as a bitmask switch (user-assigned only)
    Flag,
    /// One row or one column of cells
    Curve1D,
    /// Rows and columns without full axis information
    Table2D,
    /// Rows and columns with both axes attached
    Surface3D,
}

/// A calibration table descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDescriptor {
    /// Identifier for display and library lookup
    #[serde(default)]
    pub name: String,

    /// ROM byte address of the first cell
    pub offset: usize,

    /// Number of rows (>= 1)
    pub rows: usize,

    /// Number of columns (>= 1)
    pub cols: usize,

    /// Bit width of each stored cell: 8 or 16
    #[serde(default = "default_data_size")]
    pub data_size: u8,

    /// Byte order of 16-bit cells
    #[serde(default)]
    pub endian: Endianness,

    /// Scaling formula applied to every cell
    #[serde(default)]
    pub formula: String,

    /// Engineering unit of the scaled cells (opaque to the core)
    #[serde(default)]
    pub unit: String,

    /// Decimal digits for display (opaque to the core)
    #[serde(default)]
    pub digits: u8,

    /// Column axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<Axis>,

    /// Row axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<Axis>,
}

impl MapDescriptor {
    /// A single scalar value at `offset`
    pub fn value(name: impl Into<String>, offset: usize, data_size: u8) -> Self {
        Self::table(name, offset, 1, 1, data_size)
    }

    /// A one-row curve of `cols` cells
    pub fn curve(name: impl Into<String>, offset: usize, cols: usize, data_size: u8) -> Self {
        Self::table(name, offset, 1, cols, data_size)
    }

    /// A `rows` x `cols` table of `data_size`-bit cells
    pub fn table(
        name: impl Into<String>,
        offset: usize,
        rows: usize,
        cols: usize,
        data_size: u8,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            rows: rows.max(1),
            cols: cols.max(1),
            data_size,
            endian: Endianness::default(),
            formula: String::new(),
            unit: String::new(),
            digits: 0,
            x_axis: None,
            y_axis: None,
        }
    }

    /// Bytes per cell (1 or 2)
    pub fn cell_size(&self) -> usize {
        if self.data_size == 16 {
            2
        } else {
            1
        }
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    /// Size in bytes of the stored cell block
    pub fn byte_len(&self) -> usize {
        self.cell_count().saturating_mul(self.cell_size())
    }

    /// Derived shape tag
    pub fn dimension(&self) -> MapDimension {
        if self.rows <= 1 && self.cols <= 1 {
            MapDimension::Value
        } else if self.rows <= 1 || self.cols <= 1 {
            MapDimension::Curve1D
        } else if self.x_axis.is_some() && self.y_axis.is_some() {
            MapDimension::Surface3D
        } else {
            MapDimension::Table2D
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dimension_tags() {
        assert_eq!(
            MapDescriptor::value("v", 0, 8).dimension(),
            MapDimension::Value
        );
        assert_eq!(
            MapDescriptor::curve("c", 0, 8, 8).dimension(),
            MapDimension::Curve1D
        );

        let mut t = MapDescriptor::table("t", 0, 8, 8, 8);
        assert_eq!(t.dimension(), MapDimension::Table2D);
        t.x_axis = Some(Axis::step(8, 1.0));
        t.y_axis = Some(Axis::step(8, 1.0));
        assert_eq!(t.dimension(), MapDimension::Surface3D);
    }

    #[test]
    fn test_byte_len() {
        let t = MapDescriptor::table("t", 0x100, 4, 6, 16);
        assert_eq!(t.cell_count(), 24);
        assert_eq!(t.byte_len(), 48);
        assert_eq!(Axis::rom(0, 10, 16).byte_len(), 20);
        assert_eq!(Axis::rom(0, 10, 8).byte_len(), 10);
    }

    #[test]
    fn test_descriptor_json_shape_is_stable() {
        // Definition libraries persist this exact shape; see DESIGN.md
        let json = r#"{
            "name": "ve_table",
            "offset": 4096,
            "rows": 16,
            "cols": 16,
            "data_size": 8,
            "endian": "big",
            "formula": "X/2",
            "x_axis": { "size": 16, "source": "rom_address", "offset": 4352 }
        }"#;
        let map: MapDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(map.offset, 4096);
        assert_eq!(map.x_axis.as_ref().unwrap().source, AxisSource::RomAddress);
        assert_eq!(map.x_axis.as_ref().unwrap().offset, 4352);
        assert!(map.y_axis.is_none());

        let round = serde_json::to_string(&map).unwrap();
        let back: MapDescriptor = serde_json::from_str(&round).unwrap();
        assert_eq!(back.rows, 16);
        assert_eq!(back.formula, "X/2");
    }
}
