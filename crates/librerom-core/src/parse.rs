//! Parse orchestration
//!
//! One pass over a freshly loaded ROM: identity markers, integrity checksum,
//! structural anchors, heuristic map candidates. Each scanner runs
//! independently and degrades on its own: a ROM with no identity string and
//! a bad checksum still yields a complete [`ParseResult`].
//!
//! The engine is stateless: every call takes its own image and config and
//! returns a fresh result, so parses over different buffers can run
//! concurrently without coordination.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checksum::ChecksumConfig;
use crate::identity::{find_part_number_any, find_pattern, IdentityPattern};
use crate::map::MapDescriptor;
use crate::rom::RomImage;
use crate::structure::{
    anchor_addresses, find_map_headers, find_pointer_lists, find_self_referencing, StructureConfig,
};

/// Sentinel for identity fields with no match
pub const UNKNOWN: &str = "Unknown";

/// Category of a parse finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// An identity marker (part number, release code)
    Identity,
    /// The integrity checksum
    Integrity,
    /// A structurally derived anchor (self-references, pointer lists)
    Structure,
    /// A low-confidence signature hit (map header candidates)
    Heuristic,
}

/// One finding from a parse pass; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    /// Byte address of the finding
    pub offset: usize,

    /// Extent of the finding in bytes
    pub size: usize,

    /// Finding category
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,

    /// Human-readable description
    pub value: String,
}

/// Firmware identity recovered from the image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Hardware part number, or [`UNKNOWN`]
    pub hw: String,

    /// Software release code, or [`UNKNOWN`]
    pub sw: String,

    /// Secondary identifier, when a configured pattern found one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Free-text label, when a configured pattern found one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            hw: UNKNOWN.to_string(),
            sw: UNKNOWN.to_string(),
            id: None,
            label: None,
        }
    }
}

/// Configuration for one parse pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// ASCII digit prefix of the hardware part number family
    pub hw_prefix: String,

    /// Total digit count of a part number
    pub id_digits: usize,

    /// Named free-form identity patterns. Patterns named `sw`, `id` and
    /// `label` additionally populate the matching [`VersionInfo`] field.
    pub patterns: Vec<IdentityPattern>,

    /// Checksum layout
    pub checksum: ChecksumConfig,

    /// Structural scan tuning
    pub structure: StructureConfig,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            hw_prefix: "1267".to_string(),
            id_digits: 10,
            patterns: vec![IdentityPattern::new("sw", r"\d{3}\.\d{2}")],
            checksum: ChecksumConfig::default(),
            structure: StructureConfig::default(),
        }
    }
}

/// Everything recovered from one parse pass. Owned by the caller; the
/// engine keeps nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    /// The analyzed image
    pub rom: RomImage,

    /// Heuristically discovered map candidates (advisory until the caller
    /// promotes them)
    pub detected_maps: Vec<MapDescriptor>,

    /// Findings ledger, in pass order: identity, integrity, structure,
    /// heuristic
    pub diagnostics: Vec<DiagnosticEntry>,

    /// Computed summation checksum
    pub checksum16: u16,

    /// Whether the stored trailer matches the computed checksum
    pub checksum_valid: bool,

    /// Recovered firmware identity
    pub version: VersionInfo,
}

/// Run the full analysis pass over an image
pub fn parse_rom(rom: &RomImage, config: &ParseConfig) -> ParseResult {
    let buf = rom.data();
    let mut diagnostics = Vec::new();
    let mut version = VersionInfo::default();

    debug!(name = rom.name(), len = rom.len(), "parsing ROM image");

    // Identity: part number, then the configured free-form patterns. A
    // matcher that finds nothing never stops the rest of the pass.
    match find_part_number_any(buf, &config.hw_prefix, config.id_digits) {
        Some(m) => {
            diagnostics.push(DiagnosticEntry {
                offset: m.offset,
                size: m.size,
                kind: DiagnosticKind::Identity,
                value: format!("part number {}", m.text),
            });
            version.hw = m.text;
        }
        None => debug!(prefix = %config.hw_prefix, "no part number found"),
    }

    for pattern in &config.patterns {
        let regex = match Regex::new(&pattern.pattern) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(name = %pattern.name, "invalid identity pattern: {e}");
                continue;
            }
        };
        let Some(m) = find_pattern(buf, &regex) else {
            debug!(name = %pattern.name, "identity pattern not found");
            continue;
        };
        diagnostics.push(DiagnosticEntry {
            offset: m.offset,
            size: m.size,
            kind: DiagnosticKind::Identity,
            value: format!("{} {}", pattern.name, m.text),
        });
        match pattern.name.as_str() {
            "sw" => version.sw = m.text,
            "id" => version.id = Some(m.text),
            "label" => version.label = Some(m.text),
            _ => {}
        }
    }

    // Integrity
    let checksum16 = config.checksum.calculate(buf);
    let checksum_valid = config.checksum.verify(buf);
    let stored = config.checksum.stored(buf);
    if !checksum_valid {
        warn!("checksum mismatch: computed {checksum16:#06x}, stored {stored:#06x}");
    }
    diagnostics.push(DiagnosticEntry {
        offset: config.checksum.trailer_offset(buf.len()),
        size: 2,
        kind: DiagnosticKind::Integrity,
        value: format!(
            "checksum {:#06x} (stored {:#06x}, {})",
            checksum16,
            stored,
            if checksum_valid { "valid" } else { "INVALID" }
        ),
    });

    // Structure: self-referencing anchors feed the pointer-list pass
    let self_refs = find_self_referencing(buf, &config.structure);
    for block in &self_refs {
        diagnostics.push(DiagnosticEntry {
            offset: block.offset,
            size: block.length * 2,
            kind: DiagnosticKind::Structure,
            value: format!(
                "self-referencing run of {} word(s), {}-endian",
                block.length, block.endian
            ),
        });
    }

    let anchors = anchor_addresses(&self_refs);
    for block in find_pointer_lists(buf, &anchors, &config.structure) {
        diagnostics.push(DiagnosticEntry {
            offset: block.offset,
            size: block.length * 2,
            kind: DiagnosticKind::Structure,
            value: format!(
                "pointer list of {} word(s), {}-endian",
                block.length, block.endian
            ),
        });
    }

    // Heuristic map candidates, clearly tagged as such
    let detected_maps = find_map_headers(buf, &config.structure);
    for map in &detected_maps {
        diagnostics.push(DiagnosticEntry {
            offset: map.offset,
            size: map.byte_len(),
            kind: DiagnosticKind::Heuristic,
            value: format!("possible {}x{} table", map.rows, map.cols),
        });
    }

    debug!(
        maps = detected_maps.len(),
        findings = diagnostics.len(),
        checksum_valid,
        "parse pass complete"
    );

    ParseResult {
        rom: rom.clone(),
        detected_maps,
        diagnostics,
        checksum16,
        checksum_valid,
        version,
    }
}
