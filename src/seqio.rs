//! Sequence I/O Module
//!
//! Provides reading capabilities for genome assembly files.
//! Supports FASTA format, plain or gzip-compressed.
//!
//! # Examples
//! ```no_run
//! use promex::seqio::FastaFile;
//!
//! // Auto-detects gzip by extension
//! let mut reader = FastaFile::open("genome.fasta.gz").unwrap();
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{}: {} bp", record.name, record.seq.len());
//! }
//! ```

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

// ============================================================================
// FASTA Format
// ============================================================================

/// A FASTA record containing sequence name and nucleotide sequence.
///
/// # Fields
/// - `name`: Sequence identifier (text after '>' up to first whitespace)
/// - `seq`: Nucleotide sequence (concatenated from all sequence lines)
#[derive(Debug, Clone)]
pub struct FastaRecord {
    /// Sequence identifier extracted from the header line.
    pub name: String,
    /// Nucleotide sequence (may contain standard IUPAC codes).
    pub seq: String,
}

/// Generic FASTA reader supporting any Read source.
///
/// Reads records one at a time, handles multi-line sequences and strips
/// whitespace automatically. Use `FastaFile` for extension-based
/// compression detection.
pub struct FastaReader<R: Read> {
    reader: BufReader<R>,
    line_buf: String,
    current_name: Option<String>,
}

impl FastaReader<File> {
    /// Opens a plain (uncompressed) FASTA file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open FASTA: {}", path.as_ref().display()))?;
        Self::from_reader(file)
    }
}

impl FastaReader<MultiGzDecoder<File>> {
    /// Opens a gzip-compressed FASTA file.
    pub fn open_gz<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open FASTA.gz: {}", path.as_ref().display()))?;
        Self::from_reader(MultiGzDecoder::new(file))
    }
}

impl<R: Read> FastaReader<R> {
    fn from_reader(source: R) -> Result<Self> {
        let mut reader = Self {
            reader: BufReader::with_capacity(1024 * 1024, source),
            line_buf: String::with_capacity(256),
            current_name: None,
        };

        // Read first header line to initialise state
        reader.line_buf.clear();
        if reader.reader.read_line(&mut reader.line_buf)? > 0
            && reader.line_buf.starts_with('>') {
                reader.current_name = Some(
                    reader.line_buf[1..]
                        .split_whitespace()
                        .next()
                        .unwrap_or("")
                        .to_string(),
                );
            }

        Ok(reader)
    }

    /// Reads the next FASTA record from the file.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Successfully read a record
    /// - `Ok(None)` - End of file reached
    /// - `Err(e)` - I/O error occurred
    pub fn read_next(&mut self) -> Result<Option<FastaRecord>> {
        let name = match self.current_name.take() {
            Some(n) => n,
            None => return Ok(None),
        };

        let mut seq = String::with_capacity(10000);

        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                // End of file reached
                break;
            }

            if self.line_buf.starts_with('>') {
                // New record header encountered
                self.current_name = Some(
                    self.line_buf[1..]
                        .split_whitespace()
                        .next()
                        .unwrap_or("")
                        .to_string(),
                );
                break;
            } else {
                // Sequence line - append to current sequence
                seq.push_str(self.line_buf.trim_end());
            }
        }

        Ok(Some(FastaRecord { name, seq }))
    }
}

impl<R: Read> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Auto-detecting FASTA file reader.
///
/// Automatically selects plain or gzip reader based on file extension.
/// Files ending in `.gz` are treated as gzip-compressed.
pub enum FastaFile {
    /// Plain text FASTA file.
    Plain(FastaReader<File>),
    /// Gzip-compressed FASTA file.
    Gzipped(FastaReader<MultiGzDecoder<File>>),
}

impl FastaFile {
    /// Opens a FASTA file with automatic compression detection.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if ext == "gz" {
            Ok(FastaFile::Gzipped(FastaReader::open_gz(path)?))
        } else {
            Ok(FastaFile::Plain(FastaReader::open(path)?))
        }
    }

    /// Reads the next FASTA record.
    ///
    /// Delegates to the appropriate reader based on file type.
    pub fn read_next(&mut self) -> Result<Option<FastaRecord>> {
        match self {
            FastaFile::Plain(r) => r.read_next(),
            FastaFile::Gzipped(r) => r.read_next(),
        }
    }
}
