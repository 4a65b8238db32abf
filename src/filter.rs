//! BLAST Hit Filter Module
//!
//! Filters tabular BLAST records by query coverage, subject coverage and
//! percent identity, resolves subject ids through the optional synonym
//! table, and accumulates the surviving hits keyed by resolved id.
//!
//! Duplicate resolved ids follow a last-wins policy: a later record with
//! the same resolved id silently replaces the earlier one.

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

use crate::blast::{BlastReader, BlastRecord};
use crate::region::Strand;
use crate::synonym::SynonymTable;

/// Filtering thresholds and identifier-resolution settings.
///
/// All thresholds are inclusive lower bounds: a record sitting exactly on
/// a threshold is selected.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub min_query_coverage: f64,
    pub min_subject_coverage: f64,
    pub min_identity: f64,
    pub use_prefix: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_query_coverage: 10.0,
            min_subject_coverage: 10.0,
            min_identity: 10.0,
            use_prefix: false,
        }
    }
}

/// A hit surviving the filters, keyed externally by its resolved id.
#[derive(Debug, Clone)]
pub struct SelectedHit {
    /// Hit strand derived from subject coordinate order.
    pub strand: Strand,
    /// Normalized subject interval start (min of the raw pair).
    pub subject_start: usize,
    /// Normalized subject interval end (max of the raw pair).
    pub subject_end: usize,
}

/// Table of selected hits keyed by resolved identifier.
#[derive(Debug, Default)]
pub struct SelectedHits {
    map: FxHashMap<String, SelectedHit>,
}

impl SelectedHits {
    /// Inserts a hit, replacing any existing entry for the same resolved id.
    pub fn insert(&mut self, resolved_id: String, hit: SelectedHit) {
        self.map.insert(resolved_id, hit);
    }

    pub fn contains(&self, resolved_id: &str) -> bool {
        self.map.contains_key(resolved_id)
    }

    pub fn get(&self, resolved_id: &str) -> Option<&SelectedHit> {
        self.map.get(resolved_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SelectedHit)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Running aggregate statistics over all parsed alignment records.
#[derive(Debug, Default)]
pub struct FilterStats {
    /// Total records parsed.
    pub records: usize,
    /// Records passing all three thresholds.
    pub passed: usize,
    subjects: FxHashSet<String>,
    qcov_sum: f64,
    scov_sum: f64,
    identity_sum: f64,
}

impl FilterStats {
    fn observe(&mut self, rec: &BlastRecord, qcov: f64, scov: f64) {
        self.records += 1;
        self.subjects.insert(rec.subject_id.clone());
        self.qcov_sum += qcov;
        self.scov_sum += scov;
        self.identity_sum += rec.percent_identity;
    }

    /// Number of distinct subject ids seen.
    pub fn unique_subjects(&self) -> usize {
        self.subjects.len()
    }

    pub fn mean_query_coverage(&self) -> f64 {
        if self.records == 0 { 0.0 } else { self.qcov_sum / self.records as f64 }
    }

    pub fn mean_subject_coverage(&self) -> f64 {
        if self.records == 0 { 0.0 } else { self.scov_sum / self.records as f64 }
    }

    pub fn mean_identity(&self) -> f64 {
        if self.records == 0 { 0.0 } else { self.identity_sum / self.records as f64 }
    }
}

/// Reads a BLAST tabular file and returns the selected-hit table plus
/// aggregate statistics.
///
/// A malformed record is fatal; the whole run aborts.
pub fn filter_hits(
    path: &Path,
    opts: &FilterOptions,
    synonyms: Option<&SynonymTable>,
) -> Result<(SelectedHits, FilterStats)> {
    let reader = BlastReader::open(path)?;
    let mut hits = SelectedHits::default();
    let mut stats = FilterStats::default();

    for record in reader {
        let rec = record?;
        let qcov = rec.query_coverage();
        let scov = rec.subject_coverage();
        stats.observe(&rec, qcov, scov);

        if qcov < opts.min_query_coverage
            || scov < opts.min_subject_coverage
            || rec.percent_identity < opts.min_identity
        {
            continue;
        }
        stats.passed += 1;

        let resolved = match synonyms {
            Some(table) => table.resolve(&rec.subject_id, opts.use_prefix),
            None => rec.subject_id.clone(),
        };

        let (subject_start, subject_end) = rec.subject_interval();
        hits.insert(
            resolved,
            SelectedHit {
                strand: rec.subject_strand(),
                subject_start,
                subject_end,
            },
        );
    }

    Ok((hits, stats))
}

// ============================================================================
// Tests
// ============================================================================
