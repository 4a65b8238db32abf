//! Feature Annotation Parser Module
//!
//! Parses GFF-style 9-column annotation lines: seqid, source, type,
//! start, end, score, strand, phase, attributes. Attributes are
//! `;`-separated `key=value` pairs.
//!
//! A missing or garbled attribute column yields an empty attribute set
//! instead of an error, so one genome's annotation irregularities don't
//! abort a multi-genome run. Missing interval columns are still fatal.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::region::Strand;

/// One parsed annotation line.
#[derive(Debug, Clone)]
pub struct GffRecord {
    /// Contig or chromosome id (column 1).
    pub seqid: String,
    /// Feature start, 1-based inclusive (column 4).
    pub start: usize,
    /// Feature end, 1-based inclusive (column 5).
    pub end: usize,
    /// Feature strand (column 7).
    pub strand: Strand,
    /// Parsed `key=value` attributes (column 9); may be empty.
    pub attributes: FxHashMap<String, String>,
}

impl GffRecord {
    /// Parses one annotation line.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - a feature line
    /// - `Ok(None)` - blank line or `#` comment
    /// - `Err(e)` - fewer than 8 columns, or unparsable start/end
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            anyhow::bail!(
                "Invalid annotation line: expected at least 8 columns, found {}",
                fields.len()
            );
        }

        let start = fields[3].parse().context("Invalid feature start")?;
        let end = fields[4].parse().context("Invalid feature end")?;

        // Trailing-column tolerance: no attribute column -> empty set
        let attributes = fields.get(8).map(|raw| parse_attributes(raw)).unwrap_or_default();

        Ok(Some(Self {
            seqid: fields[0].to_string(),
            start,
            end,
            strand: Strand::from_symbol(fields[6]),
            attributes,
        }))
    }
}

/// Parses a `;`-separated `key=value` attribute column.
///
/// Fragments without a `=` are skipped, never fatal.
fn parse_attributes(raw: &str) -> FxHashMap<String, String> {
    let mut attrs = FxHashMap::default();
    for pair in raw.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some((key, value)) = pair.split_once('=') {
            attrs.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    attrs
}

// ============================================================================
// Tests
// ============================================================================
