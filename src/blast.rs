//! BLAST Tabular Parser Module
//!
//! Provides parsing capabilities for BLAST tabular output extended with
//! query and subject length columns (`-outfmt "6 std qlen slen"`).
//!
//! # Format (14 columns)
//! ```text
//! Col  Type    Description
//! 1    string  Query sequence id
//! 2    string  Subject sequence id
//! 3    float   Percent identity
//! 4    int     Alignment length
//! 5    int     Number of mismatches
//! 6    int     Number of gap openings
//! 7    int     Query start
//! 8    int     Query end
//! 9    int     Subject start
//! 10   int     Subject end
//! 11   float   E-value
//! 12   float   Bit score
//! 13   int     Query sequence length
//! 14   int     Subject sequence length
//! ```
//!
//! # Example Usage
//! ```no_run
//! use promex::blast::BlastReader;
//!
//! let mut reader = BlastReader::open("hits.tsv").unwrap();
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{} -> {} ({:.1}% query coverage)",
//!              record.query_id, record.subject_id, record.query_coverage());
//! }
//! ```

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::region::Strand;

/// Rounds to one decimal place, halves away from zero.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ============================================================================
// BLAST Record
// ============================================================================

/// A single BLAST tabular alignment record.
///
/// Contains the 12 standard columns plus the two appended length columns.
#[derive(Debug, Clone)]
pub struct BlastRecord {
    /// Query sequence id (column 1).
    pub query_id: String,
    /// Subject sequence id (column 2).
    pub subject_id: String,
    /// Percent identity (column 3).
    pub percent_identity: f64,
    /// Alignment length (column 4).
    pub alignment_length: usize,
    /// Number of mismatches (column 5).
    pub mismatches: usize,
    /// Number of gap openings (column 6).
    pub gap_opens: usize,
    /// Query start position (column 7).
    pub query_start: usize,
    /// Query end position (column 8).
    pub query_end: usize,
    /// Subject start position (column 9); may exceed subject end on minus hits.
    pub subject_start: usize,
    /// Subject end position (column 10).
    pub subject_end: usize,
    /// E-value (column 11).
    pub evalue: f64,
    /// Bit score (column 12).
    pub bit_score: f64,
    /// Query sequence length (column 13).
    pub query_length: usize,
    /// Subject sequence length (column 14).
    pub subject_length: usize,
}

impl BlastRecord {
    /// Parses a BLAST record from a tab-separated line.
    ///
    /// # Errors
    /// Returns an error if the line has fewer than 14 fields or any
    /// numeric field cannot be parsed.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 14 {
            anyhow::bail!(
                "Invalid BLAST line: expected 14 fields, found {}",
                fields.len()
            );
        }

        Ok(Self {
            query_id: fields[0].to_string(),
            subject_id: fields[1].to_string(),
            percent_identity: fields[2].parse().context("Invalid percent identity")?,
            alignment_length: fields[3].parse().context("Invalid alignment length")?,
            mismatches: fields[4].parse().context("Invalid mismatch count")?,
            gap_opens: fields[5].parse().context("Invalid gap open count")?,
            query_start: fields[6].parse().context("Invalid query start")?,
            query_end: fields[7].parse().context("Invalid query end")?,
            subject_start: fields[8].parse().context("Invalid subject start")?,
            subject_end: fields[9].parse().context("Invalid subject end")?,
            evalue: fields[10].parse().context("Invalid e-value")?,
            bit_score: fields[11].parse().context("Invalid bit score")?,
            query_length: fields[12].parse().context("Invalid query length")?,
            subject_length: fields[13].parse().context("Invalid subject length")?,
        })
    }

    /// Query coverage percentage, rounded to one decimal place.
    ///
    /// Coverage = (alignment length / query length) × 100, or 0 if the
    /// query length is 0.
    pub fn query_coverage(&self) -> f64 {
        if self.query_length == 0 {
            return 0.0;
        }
        round1(100.0 * self.alignment_length as f64 / self.query_length as f64)
    }

    /// Subject coverage percentage, rounded to one decimal place.
    pub fn subject_coverage(&self) -> f64 {
        if self.subject_length == 0 {
            return 0.0;
        }
        round1(100.0 * self.alignment_length as f64 / self.subject_length as f64)
    }

    /// Hit strand, derived from subject coordinate order: forward iff
    /// subject end > subject start.
    pub fn subject_strand(&self) -> Strand {
        if self.subject_end > self.subject_start {
            Strand::Forward
        } else {
            Strand::Reverse
        }
    }

    /// Subject interval normalized to (min, max) for downstream arithmetic.
    pub fn subject_interval(&self) -> (usize, usize) {
        if self.subject_start <= self.subject_end {
            (self.subject_start, self.subject_end)
        } else {
            (self.subject_end, self.subject_start)
        }
    }
}

// ============================================================================
// BLAST Reader
// ============================================================================

/// Sequential reader for BLAST tabular files.
///
/// Skips empty and `#`-comment lines (commented output, `-outfmt 7`,
/// shares the column layout).
pub struct BlastReader {
    reader: BufReader<File>,
    line_buf: String,
}

impl BlastReader {
    /// Opens a BLAST tabular file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open BLAST file: {}", path.as_ref().display()))?;
        Ok(Self {
            reader: BufReader::with_capacity(1024 * 1024, file),
            line_buf: String::with_capacity(512),
        })
    }

    /// Reads the next BLAST record from the file.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Successfully read a record
    /// - `Ok(None)` - End of file reached
    /// - `Err(e)` - I/O or parsing error
    pub fn read_next(&mut self) -> Result<Option<BlastRecord>> {
        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                return Ok(None);
            }

            let line = self.line_buf.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return Ok(Some(BlastRecord::parse_line(line)?));
        }
    }
}

impl Iterator for BlastReader {
    type Item = Result<BlastRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
