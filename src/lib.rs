//! promex - Promoter Sequence Extraction
//!
//! Extracts promoter (flanking) regions for genes matched by BLAST
//! searches, cross-referencing tabular alignment hits, per-genome GFF
//! annotations and genome assemblies.
//!
//! # Modules
//! - `seqio`: FASTA file I/O with gzip support
//! - `blast`: BLAST tabular (14-column) parsing
//! - `synonym`: bidirectional identifier synonym table
//! - `filter`: coverage/identity filtering and hit selection
//! - `gff`: feature-annotation line parsing
//! - `locate`: hit-to-feature resolution per genome
//! - `region`: strand-aware promoter window projection
//! - `emit`: subsequence extraction and FASTA output
//! - `pipeline`: whole-run orchestration

pub mod seqio;
pub mod blast;
pub mod synonym;
pub mod filter;
pub mod gff;
pub mod locate;
pub mod region;
pub mod emit;
pub mod pipeline;
