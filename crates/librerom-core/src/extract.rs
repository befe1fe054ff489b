//! Map data extraction and writeback
//!
//! The read path turns a [`MapDescriptor`] plus the ROM bytes into a
//! row-major grid of engineering values; the write path converts an edited
//! grid back into raw bytes and fixes up the image checksum once at the end.
//!
//! Reads never fail: cells or axes that fall outside the image extract as
//! exact zeros, because heuristic candidates routinely carry speculative
//! bounds and one bad cell must not sink the whole grid. Writes are strict:
//! an edit that would land outside the image is rejected before any byte is
//! touched.

use crate::checksum::ChecksumConfig;
use crate::codec::{read_int, write_int};
use crate::error::RomError;
use crate::formula::Formula;
use crate::map::{Axis, AxisSource, MapDescriptor};

/// Extract a map into a `rows x cols` grid of engineering values.
///
/// Row-major; each in-range cell is read at the map's width/endianness and
/// run through the scaling formula. Out-of-range cells are exactly `0.0`.
/// The returned grid always has the descriptor's shape.
pub fn extract_map_data(buf: &[u8], map: &MapDescriptor) -> Vec<Vec<f64>> {
    let formula = Formula::parse(&map.formula);
    let cell_size = map.cell_size();

    let mut grid = Vec::with_capacity(map.rows);
    for row in 0..map.rows {
        let mut cells = Vec::with_capacity(map.cols);
        for col in 0..map.cols {
            // Checked arithmetic throughout: descriptors come from user
            // JSON and may carry offsets near usize::MAX
            let end = map
                .offset
                .checked_add((row * map.cols + col) * cell_size)
                .and_then(|o| o.checked_add(cell_size));
            match end {
                Some(end) if end <= buf.len() => {
                    let offset = end - cell_size;
                    let raw = read_int(buf, offset, map.data_size, map.endian);
                    cells.push(formula.forward(raw as f64));
                }
                _ => cells.push(0.0),
            }
        }
        grid.push(cells);
    }
    grid
}

/// Resolve an axis to its engineering-value samples.
///
/// Priority order: a non-empty `values` override is returned verbatim;
/// a disabled axis resolves to nothing; a step axis is synthesized as
/// `formula(i * step)`; a ROM axis is read like map cells, except that the
/// whole span is bounds-checked up front; an axis that overruns the image
/// resolves to all zeros of the declared size rather than a partial read.
pub fn axis_values(buf: &[u8], axis: &Axis) -> Vec<f64> {
    if !axis.values.is_empty() {
        return axis.values.clone();
    }

    match axis.source {
        AxisSource::Disabled => Vec::new(),
        AxisSource::Step => {
            let formula = Formula::parse(&axis.formula);
            (0..axis.size)
                .map(|i| formula.forward(i as f64 * axis.step))
                .collect()
        }
        AxisSource::RomAddress => {
            if axis
                .offset
                .checked_add(axis.byte_len())
                .map_or(true, |end| end > buf.len())
            {
                return vec![0.0; axis.size];
            }
            let formula = Formula::parse(&axis.formula);
            let sample_size = if axis.data_size == 16 { 2 } else { 1 };
            (0..axis.size)
                .map(|i| {
                    let raw = read_int(
                        buf,
                        axis.offset + i * sample_size,
                        axis.data_size,
                        axis.endian,
                    );
                    formula.forward(raw as f64)
                })
                .collect()
        }
    }
}

/// Write a grid of engineering values back into the image.
///
/// The grid must match the descriptor's shape and the whole cell block must
/// fit inside the buffer; both are checked before the first byte changes.
/// Each value is reverse-evaluated to a raw integer and clamped to the cell
/// width on write. The checksum trailer is NOT touched here; callers batch
/// edits and fix it up once via [`commit_map_data`].
pub fn write_map_data(
    buf: &mut [u8],
    map: &MapDescriptor,
    grid: &[Vec<f64>],
) -> Result<(), RomError> {
    if grid.len() != map.rows || grid.iter().any(|row| row.len() != map.cols) {
        return Err(RomError::ShapeMismatch {
            rows: map.rows,
            cols: map.cols,
            got_rows: grid.len(),
            got_cols: grid.first().map(|r| r.len()).unwrap_or(0),
        });
    }
    if map
        .offset
        .checked_add(map.byte_len())
        .map_or(true, |end| end > buf.len())
    {
        return Err(RomError::OutOfRange {
            offset: map.offset,
            size: map.byte_len(),
            len: buf.len(),
        });
    }

    let formula = Formula::parse(&map.formula);
    let cell_size = map.cell_size();

    for (row, cells) in grid.iter().enumerate() {
        for (col, &value) in cells.iter().enumerate() {
            let raw = formula.reverse(value, map.data_size);
            let offset = map.offset + (row * map.cols + col) * cell_size;
            write_int(buf, offset, map.data_size, map.endian, raw)?;
        }
    }
    Ok(())
}

/// Write a grid and then recompute the checksum trailer, so the image is
/// internally consistent after the call. Returns the new checksum.
pub fn commit_map_data(
    buf: &mut [u8],
    map: &MapDescriptor,
    grid: &[Vec<f64>],
    checksum: &ChecksumConfig,
) -> Result<u16, RomError> {
    write_map_data(buf, map, grid)?;
    checksum.commit(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Endianness;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_scaled_2x2() {
        let mut buf = vec![0u8; 14];
        buf[10..14].copy_from_slice(&[4, 8, 12, 16]);

        let mut map = MapDescriptor::table("t", 10, 2, 2, 8);
        map.formula = "X/4".to_string();

        assert_eq!(
            extract_map_data(&buf, &map),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
    }

    #[test]
    fn test_extract_overflow_cells_are_zero() {
        // Same map over a 12-byte buffer: the last two cells overflow
        let mut buf = vec![0u8; 12];
        buf[10..12].copy_from_slice(&[4, 8]);

        let mut map = MapDescriptor::table("t", 10, 2, 2, 8);
        map.formula = "X/4".to_string();

        let grid = extract_map_data(&buf, &map);
        assert_eq!(grid, vec![vec![1.0, 2.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_extract_entirely_out_of_range_keeps_shape() {
        let buf = vec![0xFFu8; 8];
        let map = MapDescriptor::table("t", 1000, 3, 5, 16);
        let grid = extract_map_data(&buf, &map);
        assert_eq!(grid.len(), 3);
        assert!(grid.iter().all(|row| row.len() == 5));
        assert!(grid.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extract_16bit_little_endian() {
        let mut buf = vec![0u8; 8];
        buf[2..6].copy_from_slice(&[0x10, 0x01, 0x20, 0x02]); // 0x0110, 0x0220 LE
        let mut map = MapDescriptor::curve("c", 2, 2, 16);
        map.endian = Endianness::Little;
        assert_eq!(extract_map_data(&buf, &map), vec![vec![272.0, 544.0]]);
    }

    #[test]
    fn test_huge_descriptor_offset_extracts_zeros() {
        // A descriptor deserialized from user JSON can claim any offset;
        // the whole read path must zero-fill instead of overflowing
        let buf = [0u8; 16];
        let map = MapDescriptor::table("adv", usize::MAX, 1, 1, 8);
        assert_eq!(extract_map_data(&buf, &map), vec![vec![0.0]]);

        let map16 = MapDescriptor::table("adv16", usize::MAX - 1, 2, 2, 16);
        let grid = extract_map_data(&buf, &map16);
        assert_eq!(grid, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);

        let axis = Axis::rom(usize::MAX, 4, 8);
        assert_eq!(axis_values(&buf, &axis), vec![0.0; 4]);
    }

    #[test]
    fn test_huge_descriptor_offset_rejects_write() {
        let mut buf = [0u8; 16];
        let map = MapDescriptor::table("adv", usize::MAX, 1, 1, 8);
        assert!(write_map_data(&mut buf, &map, &[vec![1.0]]).is_err());
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn test_write_then_extract_round_trip() {
        let mut buf = vec![0u8; 16];
        let mut map = MapDescriptor::table("t", 10, 2, 2, 8);
        map.formula = "X/4".to_string();

        let grid = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        write_map_data(&mut buf, &map, &grid).unwrap();
        assert_eq!(&buf[10..14], &[4, 8, 12, 16]);
        assert_eq!(extract_map_data(&buf, &map), grid);
    }

    #[test]
    fn test_write_clamps_8bit() {
        let mut buf = vec![0u8; 4];
        let map = MapDescriptor::curve("c", 0, 2, 8);
        write_map_data(&mut buf, &map, &[vec![300.0, -7.0]]).unwrap();
        assert_eq!(&buf[0..2], &[255, 0]);
    }

    #[test]
    fn test_write_out_of_range_rejected_untouched() {
        let mut buf = vec![9u8; 8];
        let map = MapDescriptor::table("t", 6, 2, 2, 8);
        let grid = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(write_map_data(&mut buf, &map, &grid).is_err());
        assert_eq!(buf, vec![9u8; 8]);
    }

    #[test]
    fn test_write_shape_mismatch_rejected() {
        let mut buf = vec![0u8; 16];
        let map = MapDescriptor::table("t", 0, 2, 2, 8);
        assert!(write_map_data(&mut buf, &map, &[vec![1.0, 2.0]]).is_err());
        assert!(write_map_data(&mut buf, &map, &[vec![1.0], vec![2.0]]).is_err());
    }

    #[test]
    fn test_write_16bit_big_endian_layout() {
        let mut buf = vec![0u8; 6];
        let map = MapDescriptor::value("v", 2, 16);
        write_map_data(&mut buf, &map, &[vec![0x1234 as f64]]).unwrap();
        assert_eq!(&buf[2..4], &[0x12, 0x34]);
    }

    #[test]
    fn test_commit_leaves_valid_checksum() {
        let cfg = ChecksumConfig::default();
        let mut buf = vec![0u8; 32 * 1024];
        buf[0x7FFE] = 0xDE;
        buf[0x7FFF] = 0xAD;
        assert!(!cfg.verify(&buf));

        let mut map = MapDescriptor::table("t", 0x1000, 2, 2, 8);
        map.formula = "X*2".to_string();
        let grid = vec![vec![10.0, 20.0], vec![30.0, 40.0]];
        commit_map_data(&mut buf, &map, &grid, &cfg).unwrap();

        assert_eq!(&buf[0x1000..0x1004], &[5, 10, 15, 20]);
        assert!(cfg.verify(&buf));
    }

    #[test]
    fn test_commit_with_empty_edit_set_fixes_trailer() {
        // Spec'd behavior of "save without edits": trailer gets rewritten
        let cfg = ChecksumConfig::default();
        let mut buf = vec![0u8; 64 * 1024];
        buf[0xFFFE] = 0x12;
        buf[0xFFFF] = 0x34;

        let map = MapDescriptor::curve("noop", 0, 1, 8);
        let sum = commit_map_data(&mut buf, &map, &[vec![0.0]], &cfg).unwrap();
        assert_eq!(sum, 0x0000);
        assert_eq!(&buf[0xFFFE..], &[0x00, 0x00]);
        assert!(cfg.verify(&buf));
    }

    #[test]
    fn test_axis_override_wins() {
        let axis = Axis {
            values: vec![5.0, 10.0, 15.0],
            ..Axis::rom(0, 3, 8)
        };
        assert_eq!(axis_values(&[], &axis), vec![5.0, 10.0, 15.0]);
    }

    #[test]
    fn test_axis_disabled_is_empty() {
        let axis = Axis {
            source: AxisSource::Disabled,
            ..Axis::step(8, 1.0)
        };
        assert!(axis_values(&[], &axis).is_empty());
    }

    #[test]
    fn test_axis_step_synthesis() {
        let mut axis = Axis::step(4, 250.0);
        axis.formula = "X*2".to_string();
        assert_eq!(axis_values(&[], &axis), vec![0.0, 500.0, 1000.0, 1500.0]);
    }

    #[test]
    fn test_axis_rom_read() {
        let mut buf = vec![0u8; 8];
        buf[2..6].copy_from_slice(&[0x01, 0x00, 0x02, 0x00]); // 256, 512 BE
        let mut axis = Axis::rom(2, 2, 16);
        axis.formula = "X/2".to_string();
        assert_eq!(axis_values(&buf, &axis), vec![128.0, 256.0]);
    }

    #[test]
    fn test_axis_rom_overrun_is_all_zeros() {
        let buf = vec![0xFFu8; 8];
        let axis = Axis::rom(6, 4, 8); // needs bytes 6..10
        assert_eq!(axis_values(&buf, &axis), vec![0.0; 4]);
    }
}
