//! Annotation Locator Module
//!
//! Scans one genome's feature-annotation file and resolves the selected
//! BLAST hits to genomic intervals. Each annotation line offers several
//! candidate identifier spellings; the first candidate found in the
//! selected-hit table claims the line.
//!
//! # Candidate Spellings
//! In priority order: the `Name` attribute, the `ID` attribute, and (in
//! alternate-suffix mode) `Name` with a literal `.p` appended - the
//! convention some annotation releases use for protein ids. In prefix
//! mode every candidate is additionally prefixed with `<taxon>_`.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::filter::SelectedHits;
use crate::gff::GffRecord;
use crate::region::Strand;
use crate::synonym::SynonymTable;

/// A located feature: the genomic interval a resolved hit maps to.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Contig or chromosome the feature sits on.
    pub seqid: String,
    /// Feature start, 1-based inclusive.
    pub start: usize,
    /// Feature end, 1-based inclusive.
    pub end: usize,
    /// Feature strand from the annotation.
    pub strand: Strand,
    /// Taxon the annotation file belongs to.
    pub taxon: String,
    /// Original external (BLAST) identifier, for output labeling.
    pub alt_id: String,
}

/// Matched features for one taxon, in encounter order.
///
/// A re-match for an already-seen resolved id updates the stored record
/// but keeps its original position in the order.
#[derive(Debug, Default)]
pub struct TaxonMatches {
    records: FxHashMap<String, FeatureRecord>,
    order: Vec<String>,
}

impl TaxonMatches {
    pub fn insert(&mut self, resolved_id: String, record: FeatureRecord) {
        if self.records.insert(resolved_id.clone(), record).is_none() {
            self.order.push(resolved_id);
        }
    }

    pub fn get(&self, resolved_id: &str) -> Option<&FeatureRecord> {
        self.records.get(resolved_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Groups matched features contig by contig, preserving the
    /// first-encounter order of contigs and of features within each.
    pub fn by_contig(&self) -> Vec<(String, Vec<(&str, &FeatureRecord)>)> {
        let mut groups: Vec<(String, Vec<(&str, &FeatureRecord)>)> = Vec::new();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();

        for id in &self.order {
            let record = &self.records[id];
            let slot = match index.get(record.seqid.as_str()) {
                Some(&i) => i,
                None => {
                    groups.push((record.seqid.clone(), Vec::new()));
                    index.insert(record.seqid.as_str(), groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].1.push((id.as_str(), record));
        }

        groups
    }
}

/// Candidate identifier spellings for one annotation line, in priority
/// order. Empty when the line has no `ID` attribute.
pub fn candidate_ids(
    attributes: &FxHashMap<String, String>,
    taxon: &str,
    use_prefix: bool,
    alt_suffix: bool,
) -> Vec<String> {
    if !attributes.contains_key("ID") {
        return Vec::new();
    }

    let mut candidates = Vec::with_capacity(3);
    if let Some(name) = attributes.get("Name") {
        candidates.push(name.clone());
    }
    if let Some(id) = attributes.get("ID") {
        candidates.push(id.clone());
    }
    if alt_suffix {
        if let Some(name) = attributes.get("Name") {
            candidates.push(format!("{}.p", name));
        }
    }

    if use_prefix {
        for candidate in &mut candidates {
            *candidate = format!("{}_{}", taxon, candidate);
        }
    }

    candidates
}

/// Scans a taxon's annotation file and collects the features whose
/// candidate spellings match selected hits.
///
/// # Arguments
/// * `path` - Annotation file for this taxon
/// * `taxon` - Taxon id from the annotation list file
/// * `hits` - Selected-hit table keyed by resolved id
/// * `synonyms` - Optional synonym table, for recovering external ids
/// * `use_prefix`, `alt_suffix` - Spelling modes; must match the settings
///   the hits were filtered with
pub fn scan_annotation(
    path: &Path,
    taxon: &str,
    hits: &SelectedHits,
    synonyms: Option<&SynonymTable>,
    use_prefix: bool,
    alt_suffix: bool,
) -> Result<TaxonMatches> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open annotation file: {}", path.display()))?;

    let mut matches = TaxonMatches::default();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let record = match GffRecord::parse_line(&line)? {
            Some(r) => r,
            None => continue,
        };

        for candidate in candidate_ids(&record.attributes, taxon, use_prefix, alt_suffix) {
            if !hits.contains(&candidate) {
                continue;
            }

            let alt_id = synonyms
                .and_then(|t| t.external_of(&candidate))
                .unwrap_or(&candidate)
                .to_string();

            matches.insert(
                candidate,
                FeatureRecord {
                    seqid: record.seqid.clone(),
                    start: record.start,
                    end: record.end,
                    strand: record.strand,
                    taxon: taxon.to_string(),
                    alt_id,
                },
            );
            // First matching candidate claims the line
            break;
        }
    }

    Ok(matches)
}

// ============================================================================
// Tests
// ============================================================================
