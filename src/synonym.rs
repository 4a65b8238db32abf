//! Synonym Table Module
//!
//! BLAST subject identifiers often come from a different release of an
//! annotation than the GFF files being scanned. An optional synonym table
//! bridges the two namespaces: each line maps an external (BLAST) id to a
//! feature id and, optionally, a prefix id (typically a taxon code).
//!
//! Both lookup directions are built once at load time and never mutated:
//! - forward: external id -> feature id (+ optional prefix)
//! - reverse: feature id / `<prefix>_<feature>` -> external id
//!
//! # Input Format
//! Tab-separated, 2 or 3 columns: external id, feature id, prefix id.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Alternate identifiers mapped from one external id.
#[derive(Debug, Clone)]
pub struct SynonymEntry {
    /// Feature id used in the annotation files.
    pub feature_id: String,
    /// Optional prefix id joined in front of the feature id in prefix mode.
    pub prefix_id: Option<String>,
}

impl SynonymEntry {
    /// The resolved spelling of this entry.
    ///
    /// In prefix mode the prefix id (when present) is joined in front of
    /// the feature id with an underscore.
    pub fn resolved(&self, use_prefix: bool) -> String {
        match (&self.prefix_id, use_prefix) {
            (Some(prefix), true) => format!("{}_{}", prefix, self.feature_id),
            _ => self.feature_id.clone(),
        }
    }
}

/// Immutable bidirectional synonym lookup.
pub struct SynonymTable {
    forward: FxHashMap<String, SynonymEntry>,
    reverse: FxHashMap<String, String>,
}

impl SynonymTable {
    /// Loads a synonym table from a 2-3 column tab-separated file.
    ///
    /// Blank lines and `#` comments are skipped. A duplicate external id
    /// is an input contract violation and aborts the load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open synonym table: {}", path.as_ref().display()))?;

        let mut forward: FxHashMap<String, SynonymEntry> = FxHashMap::default();
        let mut reverse: FxHashMap<String, String> = FxHashMap::default();

        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                anyhow::bail!(
                    "Invalid synonym line in {}: expected 2-3 tab-separated columns, found {}",
                    path.as_ref().display(),
                    fields.len()
                );
            }

            let external = fields[0].trim().to_string();
            let entry = SynonymEntry {
                feature_id: fields[1].trim().to_string(),
                prefix_id: fields.get(2).map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            };

            if forward.contains_key(&external) {
                anyhow::bail!(
                    "Duplicate external id '{}' in synonym table {}",
                    external,
                    path.as_ref().display()
                );
            }

            // Reverse entries under both spellings; first mapping wins
            reverse.entry(entry.feature_id.clone()).or_insert_with(|| external.clone());
            if entry.prefix_id.is_some() {
                reverse.entry(entry.resolved(true)).or_insert_with(|| external.clone());
            }
            forward.insert(external, entry);
        }

        Ok(Self { forward, reverse })
    }

    /// Resolves a BLAST subject id to the identifier used for annotation
    /// matching. Subjects without a synonym entry pass through unchanged.
    pub fn resolve(&self, subject_id: &str, use_prefix: bool) -> String {
        match self.forward.get(subject_id) {
            Some(entry) => entry.resolved(use_prefix),
            None => subject_id.to_string(),
        }
    }

    /// Recovers the external id a resolved identifier originated from.
    pub fn external_of(&self, resolved_id: &str) -> Option<&str> {
        self.reverse.get(resolved_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(content: &str) -> SynonymTable {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synonyms.tsv");
        let mut f = File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        drop(f);
        SynonymTable::load(&path).unwrap()
    }

    #[test]
    fn test_resolve_without_prefix() {
        let t = table("Gene1v2\tGene1\tTx1\nGene2v2\tGene2\n");
        assert_eq!(t.resolve("Gene1v2", false), "Gene1");
        assert_eq!(t.resolve("Gene2v2", false), "Gene2");
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_resolve_with_prefix() {
        let t = table("Gene1v2\tGene1\tTx1\n");
        assert_eq!(t.resolve("Gene1v2", true), "Tx1_Gene1");
    }

    #[test]
    fn test_prefix_mode_without_prefix_column() {
        // An entry with no prefix id falls back to the bare feature id.
        let t = table("Gene2v2\tGene2\n");
        assert_eq!(t.resolve("Gene2v2", true), "Gene2");
    }

    #[test]
    fn test_unknown_subject_passes_through() {
        let t = table("Gene1v2\tGene1\tTx1\n");
        assert_eq!(t.resolve("Unmapped", false), "Unmapped");
        assert_eq!(t.resolve("Unmapped", true), "Unmapped");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let t = table("Gene1v2\tGene1\tTx1\n");
        let first = t.resolve("Gene1v2", true);
        let second = t.resolve("Gene1v2", true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_reverse_lookup_both_spellings() {
        let t = table("Gene1v2\tGene1\tTx1\n");
        assert_eq!(t.external_of("Gene1"), Some("Gene1v2"));
        assert_eq!(t.external_of("Tx1_Gene1"), Some("Gene1v2"));
        assert_eq!(t.external_of("Gene9"), None);
    }

    #[test]
    fn test_duplicate_external_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synonyms.tsv");
        let mut f = File::create(&path).unwrap();
        write!(f, "Gene1v2\tGene1\nGene1v2\tGene9\n").unwrap();
        drop(f);
        assert!(SynonymTable::load(&path).is_err());
    }

    #[test]
    fn test_single_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synonyms.tsv");
        let mut f = File::create(&path).unwrap();
        write!(f, "Gene1v2\n").unwrap();
        drop(f);
        assert!(SynonymTable::load(&path).is_err());
    }
}
