//! Sequence Emitter Module
//!
//! Extracts a projected promoter window from the loaded assembly,
//! reverse-complements reverse-strand windows, and labels the record for
//! output.
//!
//! # Record Layout
//! ```text
//! ><resolved_id>_<mode><length> <contig>:<start>-<end> AltID=<external_id>
//! <sequence>
//! ```
//! The coordinate span in the description is always the genomic
//! (pre-reverse-complement) window.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::locate::FeatureRecord;
use crate::region::{PromoterWindow, RegionMode};

/// A labeled output sequence record.
#[derive(Debug, Clone)]
pub struct PromoterRecord {
    pub id: String,
    pub desc: String,
    pub seq: String,
}

/// Reverse-complements a nucleotide sequence. Ambiguity codes collapse
/// to N.
pub fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c.to_ascii_uppercase() {
            'A' => 'T',
            'T' => 'A',
            'G' => 'C',
            'C' => 'G',
            _ => 'N',
        })
        .collect()
}

/// Extracts the window subsequence and builds the labeled record.
///
/// The window must already be clamped to the contig (`end <= contig
/// length`), which `region::project` guarantees.
pub fn extract_promoter(
    resolved_id: &str,
    feature: &FeatureRecord,
    window: &PromoterWindow,
    mode: RegionMode,
    length: usize,
    contig_seq: &str,
) -> PromoterRecord {
    let bases = &contig_seq[window.start - 1..window.end];
    let seq = if window.strand.is_reverse() {
        reverse_complement(bases)
    } else {
        bases.to_string()
    };

    PromoterRecord {
        id: format!("{}_{}{}", resolved_id, mode.letter(), length),
        desc: format!(
            "{}:{}-{} AltID={}",
            feature.seqid, window.start, window.end, feature.alt_id
        ),
        seq,
    }
}

/// Writes all records to a FASTA file, one sequence line per record.
pub fn write_records(records: &[PromoterRecord], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        writeln!(writer, ">{} {}", record.id, record.desc)?;
        writeln!(writer, "{}", record.seq)?;
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
