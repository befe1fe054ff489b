//! Identity marker scanner
//!
//! Firmware images in this family carry ASCII identity strings: a 10-digit
//! part number opening with a fixed hardware-family prefix, plus free-form
//! markers like a software release code. Part numbers appear in two physical
//! encodings (written forward, or byte-reversed by the build tooling), and
//! digits may be interleaved with separator bytes (space, dot, dash, NUL).
//!
//! Every matcher returns `Option`: an image without a marker is a normal
//! input, not an error.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// How a part number is physically laid out in the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdEncoding {
    /// Digits stored in logical order
    Forward,
    /// The whole digit sequence stored back to front
    Reversed,
}

/// A located identity string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMatch {
    /// Reconstructed text in logical left-to-right order
    pub text: String,
    /// Lowest byte address of the matched region
    pub offset: usize,
    /// Byte extent of the matched region, separators included (can exceed
    /// the reconstructed text length)
    pub size: usize,
}

/// A named free-form marker pattern, matched as a regex over the raw bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityPattern {
    /// Name used in diagnostics (e.g. "sw_version")
    pub name: String,
    /// Regex source, matched against the ASCII bytes of the image
    pub pattern: String,
}

impl IdentityPattern {
    /// Create a named pattern
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

fn is_separator(b: u8) -> bool {
    matches!(b, b' ' | b'.' | b'-' | 0x00)
}

/// Find a part number with the given ASCII digit `prefix`, `total_len`
/// digits long, in the requested physical encoding. The first qualifying
/// match scanning from the lowest address wins.
pub fn find_part_number(
    buf: &[u8],
    prefix: &str,
    total_len: usize,
    encoding: IdEncoding,
) -> Option<IdMatch> {
    if prefix.is_empty() || prefix.len() > total_len {
        return None;
    }
    match encoding {
        IdEncoding::Forward => find_forward(buf, prefix.as_bytes(), total_len),
        IdEncoding::Reversed => find_reversed(buf, prefix.as_bytes(), total_len),
    }
}

/// Try the forward encoding first, then the reversed one
pub fn find_part_number_any(buf: &[u8], prefix: &str, total_len: usize) -> Option<IdMatch> {
    find_part_number(buf, prefix, total_len, IdEncoding::Forward)
        .or_else(|| find_part_number(buf, prefix, total_len, IdEncoding::Reversed))
}

fn find_forward(buf: &[u8], prefix: &[u8], total_len: usize) -> Option<IdMatch> {
    if buf.len() < prefix.len() {
        return None;
    }
    'candidates: for start in 0..=buf.len() - prefix.len() {
        if &buf[start..start + prefix.len()] != prefix {
            continue;
        }
        let mut digits: Vec<u8> = prefix.to_vec();
        let mut pos = start + prefix.len();
        while digits.len() < total_len {
            if pos >= buf.len() {
                continue 'candidates;
            }
            let b = buf[pos];
            if b.is_ascii_digit() {
                digits.push(b);
            } else if !is_separator(b) {
                continue 'candidates;
            }
            pos += 1;
        }
        return Some(IdMatch {
            text: String::from_utf8_lossy(&digits).into_owned(),
            offset: start,
            size: pos - start,
        });
    }
    None
}

/// Reversed layout: the mirrored prefix sits at the high-address end of the
/// stored sequence, and the remaining digits are collected walking toward
/// lower addresses. Walking the mirrored suffix back-to-front yields the
/// logical digit order directly. The walk stops at index 0; a candidate that
/// runs out of buffer before reaching `total_len` digits is no match.
fn find_reversed(buf: &[u8], prefix: &[u8], total_len: usize) -> Option<IdMatch> {
    if buf.len() < prefix.len() {
        return None;
    }
    let mirrored: Vec<u8> = prefix.iter().rev().copied().collect();

    'candidates: for start in 0..=buf.len() - mirrored.len() {
        if buf[start..start + mirrored.len()] != mirrored[..] {
            continue;
        }
        let mut digits: Vec<u8> = prefix.to_vec();
        let mut lowest = start;
        let mut pos = start;
        while digits.len() < total_len {
            if pos == 0 {
                continue 'candidates;
            }
            pos -= 1;
            let b = buf[pos];
            if b.is_ascii_digit() {
                digits.push(b);
                lowest = pos;
            } else if !is_separator(b) {
                continue 'candidates;
            }
        }
        return Some(IdMatch {
            text: String::from_utf8_lossy(&digits).into_owned(),
            offset: lowest,
            size: start + mirrored.len() - lowest,
        });
    }
    None
}

/// Find the first occurrence of a compiled pattern in the raw image.
///
/// Matching runs over the bytes themselves (`regex::bytes`), so the reported
/// offset is the exact byte address with no decode pass in between.
pub fn find_pattern(buf: &[u8], regex: &Regex) -> Option<IdMatch> {
    regex.find(buf).map(|m| IdMatch {
        text: String::from_utf8_lossy(m.as_bytes()).into_owned(),
        offset: m.start(),
        size: m.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forward_plain() {
        let mut buf = vec![0xAAu8; 64];
        buf[20..30].copy_from_slice(b"1267355123");
        let m = find_part_number(&buf, "1267", 10, IdEncoding::Forward).unwrap();
        assert_eq!(m.text, "1267355123");
        assert_eq!(m.offset, 20);
        assert_eq!(m.size, 10);
    }

    #[test]
    fn test_forward_with_separators() {
        let mut buf = vec![0xAAu8; 64];
        buf[10..23].copy_from_slice(b"1267 355.12-3");
        let m = find_part_number(&buf, "1267", 10, IdEncoding::Forward).unwrap();
        assert_eq!(m.text, "1267355123");
        assert_eq!(m.offset, 10);
        // The region spans the separators too, so it is wider than the text
        assert_eq!(m.size, 13);
    }

    #[test]
    fn test_forward_aborts_on_foreign_byte() {
        let mut buf = vec![0xAAu8; 64];
        buf[10..20].copy_from_slice(b"1267abc123");
        assert_eq!(find_part_number(&buf, "1267", 10, IdEncoding::Forward), None);
    }

    #[test]
    fn test_forward_first_match_wins() {
        let mut buf = vec![0xAAu8; 64];
        buf[8..18].copy_from_slice(b"1267000001");
        buf[40..50].copy_from_slice(b"1267999999");
        let m = find_part_number(&buf, "1267", 10, IdEncoding::Forward).unwrap();
        assert_eq!(m.text, "1267000001");
        assert_eq!(m.offset, 8);
    }

    #[test]
    fn test_reversed_reconstruction() {
        // "1267355123" stored back to front
        let stored: Vec<u8> = b"1267355123".iter().rev().copied().collect();
        let mut buf = vec![0xAAu8; 64];
        buf[30..40].copy_from_slice(&stored);
        let m = find_part_number(&buf, "1267", 10, IdEncoding::Reversed).unwrap();
        assert_eq!(m.text, "1267355123");
        assert_eq!(m.offset, 30);
        assert_eq!(m.size, 10);
    }

    #[test]
    fn test_reversed_with_separators() {
        let stored: Vec<u8> = b"126735.5123".iter().rev().copied().collect();
        let mut buf = vec![0xAAu8; 64];
        buf[30..41].copy_from_slice(&stored);
        let m = find_part_number(&buf, "1267", 10, IdEncoding::Reversed).unwrap();
        assert_eq!(m.text, "1267355123");
        assert_eq!(m.offset, 30);
        assert_eq!(m.size, 11);
    }

    #[test]
    fn test_reversed_at_buffer_start_is_no_match() {
        // Mirrored prefix at offset 0: the leftward walk has nowhere to go
        let mut buf = vec![0xAAu8; 16];
        buf[0..4].copy_from_slice(b"7621");
        assert_eq!(
            find_part_number(&buf, "1267", 10, IdEncoding::Reversed),
            None
        );
    }

    #[test]
    fn test_any_prefers_forward() {
        let mut buf = vec![0xAAu8; 64];
        buf[4..14].copy_from_slice(b"1267111111");
        let stored: Vec<u8> = b"1267222222".iter().rev().copied().collect();
        buf[40..50].copy_from_slice(&stored);
        let m = find_part_number_any(&buf, "1267", 10).unwrap();
        assert_eq!(m.text, "1267111111");
    }

    #[test]
    fn test_not_enough_digits() {
        let mut buf = vec![0xAAu8; 16];
        buf[2..8].copy_from_slice(b"126735");
        assert_eq!(find_part_number(&buf, "1267", 10, IdEncoding::Forward), None);
    }

    #[test]
    fn test_pattern_scan() {
        let mut buf = vec![0u8; 64];
        buf[12..18].copy_from_slice(b"123.45");
        let re = Regex::new(r"\d{3}\.\d{2}").unwrap();
        let m = find_pattern(&buf, &re).unwrap();
        assert_eq!(m.text, "123.45");
        assert_eq!(m.offset, 12);
        assert_eq!(m.size, 6);
    }

    #[test]
    fn test_pattern_no_match() {
        let buf = vec![0u8; 64];
        let re = Regex::new(r"\d{3}\.\d{2}").unwrap();
        assert_eq!(find_pattern(&buf, &re), None);
    }
}
