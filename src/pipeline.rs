//! Run Orchestration Module
//!
//! Drives a whole extraction run: filter the BLAST hits once, then walk
//! the genomes in annotation-list order - scan the annotation, load the
//! assembly, project and extract every matched feature - and write the
//! collected records to a single FASTA file at the end.
//!
//! Processing is strictly sequential. The selected-hit table is read-only
//! after filtering and the output collection is append-only, so nothing
//! else crosses taxon boundaries. A fatal error aborts immediately and
//! leaves any partially-written output behind; callers must treat a
//! non-zero exit as "discard output".

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::emit::{extract_promoter, write_records, PromoterRecord};
use crate::filter::{filter_hits, FilterOptions};
use crate::locate::scan_annotation;
use crate::region::{project, RegionMode};
use crate::seqio::FastaFile;
use crate::synonym::SynonymTable;

/// Everything one run needs, assembled from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub blast: PathBuf,
    pub annotations: PathBuf,
    pub sequences: PathBuf,
    pub synonyms: Option<PathBuf>,
    pub region: RegionMode,
    pub length: usize,
    pub min_coverage: f64,
    pub min_identity: f64,
    pub use_prefix: bool,
    pub alt_suffix: bool,
    pub outbase: String,
    pub verbose: bool,
}

/// Runs the full extraction and returns the output file path.
pub fn run(cfg: &RunConfig) -> Result<PathBuf> {
    let synonyms = match &cfg.synonyms {
        Some(path) => Some(SynonymTable::load(path)?),
        None => None,
    };
    if cfg.verbose {
        if let Some(table) = &synonyms {
            eprintln!("Loaded {} synonym entries", table.len());
        }
    }

    let opts = FilterOptions {
        min_query_coverage: cfg.min_coverage,
        min_subject_coverage: cfg.min_coverage,
        min_identity: cfg.min_identity,
        use_prefix: cfg.use_prefix,
    };
    let (hits, stats) = filter_hits(&cfg.blast, &opts, synonyms.as_ref())?;

    if cfg.verbose {
        eprintln!(
            "BLAST: {} records, {} unique subjects, {} passing filters ({} resolved ids)",
            stats.records,
            stats.unique_subjects(),
            stats.passed,
            hits.len()
        );
        eprintln!(
            "       mean coverage {:.1}%/{:.1}% (query/subject), mean identity {:.1}%",
            stats.mean_query_coverage(),
            stats.mean_subject_coverage(),
            stats.mean_identity()
        );
        for (id, hit) in hits.iter() {
            eprintln!(
                "  selected {} ({} {}..{})",
                id,
                hit.strand.symbol(),
                hit.subject_start,
                hit.subject_end
            );
        }
    }

    let annotations = load_list_file(&cfg.annotations)?;
    let sequences = load_list_file(&cfg.sequences)?;
    check_taxon_sets(&annotations, &sequences)?;

    let sequence_paths: FxHashMap<&str, &Path> = sequences
        .iter()
        .map(|(taxon, path)| (taxon.as_str(), path.as_path()))
        .collect();

    let mut records: Vec<PromoterRecord> = Vec::new();

    for (taxon, annotation_path) in &annotations {
        let matches = scan_annotation(
            annotation_path,
            taxon,
            &hits,
            synonyms.as_ref(),
            cfg.use_prefix,
            cfg.alt_suffix,
        )?;

        if cfg.verbose {
            eprintln!("{}: {} feature(s) matched", taxon, matches.len());
        }
        if matches.is_empty() {
            continue;
        }

        let assembly = load_assembly(sequence_paths[taxon.as_str()])?;

        for (contig, features) in matches.by_contig() {
            let contig_seq = match assembly.get(&contig) {
                Some(seq) => seq,
                None => {
                    eprintln!(
                        "Warning: contig {} not in {} assembly, skipping {} feature(s)",
                        contig,
                        taxon,
                        features.len()
                    );
                    continue;
                }
            };

            for (resolved_id, feature) in features {
                match project(
                    feature.strand,
                    cfg.region,
                    feature.start,
                    feature.end,
                    cfg.length,
                    contig_seq.len(),
                ) {
                    Some(window) => records.push(extract_promoter(
                        resolved_id,
                        feature,
                        &window,
                        cfg.region,
                        cfg.length,
                        contig_seq,
                    )),
                    None => eprintln!(
                        "Warning: window for {} on {}:{}-{} too small after clamping, skipped",
                        resolved_id, contig, feature.start, feature.end
                    ),
                }
            }
        }
    }

    let out_path = PathBuf::from(format!("{}_promotors.fasta", cfg.outbase));
    write_records(&records, &out_path)?;

    if cfg.verbose {
        eprintln!("Wrote {} promoter sequence(s) to {}", records.len(), out_path.display());
    }

    Ok(out_path)
}

/// Loads a 2-column (taxon id, file path) list file.
///
/// Blank lines and `#` comments are skipped. Wrong column counts and
/// duplicate taxon ids abort the run.
fn load_list_file(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open list file: {}", path.display()))?;

    let mut entries = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 2 {
            anyhow::bail!(
                "Invalid line in {}: expected 2 tab-separated columns, found {}",
                path.display(),
                fields.len()
            );
        }

        let taxon = fields[0].trim().to_string();
        if !seen.insert(taxon.clone()) {
            anyhow::bail!("Duplicate taxon id '{}' in {}", taxon, path.display());
        }
        entries.push((taxon, PathBuf::from(fields[1].trim())));
    }

    if entries.is_empty() {
        anyhow::bail!("No entries in list file: {}", path.display());
    }

    Ok(entries)
}

/// The annotation and sequence lists must cover exactly the same taxa.
fn check_taxon_sets(
    annotations: &[(String, PathBuf)],
    sequences: &[(String, PathBuf)],
) -> Result<()> {
    let ann: FxHashSet<&str> = annotations.iter().map(|(t, _)| t.as_str()).collect();
    let seq: FxHashSet<&str> = sequences.iter().map(|(t, _)| t.as_str()).collect();

    let mut missing_seq: Vec<&str> = ann.difference(&seq).copied().collect();
    let mut missing_ann: Vec<&str> = seq.difference(&ann).copied().collect();
    missing_seq.sort_unstable();
    missing_ann.sort_unstable();

    if !missing_seq.is_empty() || !missing_ann.is_empty() {
        anyhow::bail!(
            "Annotation and sequence lists cover different taxa \
             (no sequences for: [{}]; no annotations for: [{}])",
            missing_seq.join(", "),
            missing_ann.join(", ")
        );
    }

    Ok(())
}

/// Loads a whole genome assembly into a contig -> sequence map.
fn load_assembly(path: &Path) -> Result<FxHashMap<String, String>> {
    let mut reader = FastaFile::open(path)?;
    let mut assembly = FxHashMap::default();
    while let Some(record) = reader.read_next()? {
        assembly.insert(record.name, record.seq);
    }
    Ok(assembly)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        write!(f, "{}", content).unwrap();
        path
    }

    fn read_file(path: &Path) -> String {
        let mut content = String::new();
        File::open(path).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_load_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "list.tsv",
            "# genomes\nTx1\t/data/tx1.gff\nTx2\t/data/tx2.gff\n",
        );
        let entries = load_list_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Tx1");
        assert_eq!(entries[1].1, PathBuf::from("/data/tx2.gff"));
    }

    #[test]
    fn test_duplicate_taxon_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "list.tsv", "Tx1\ta.gff\nTx1\tb.gff\n");
        assert!(load_list_file(&path).is_err());
    }

    #[test]
    fn test_wrong_column_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "list.tsv", "Tx1\ta.gff\textra\n");
        assert!(load_list_file(&path).is_err());
    }

    #[test]
    fn test_taxon_set_mismatch_rejected() {
        let ann = vec![
            ("Tx1".to_string(), PathBuf::from("a")),
            ("Tx2".to_string(), PathBuf::from("b")),
        ];
        let seq = vec![
            ("Tx1".to_string(), PathBuf::from("c")),
            ("Tx3".to_string(), PathBuf::from("d")),
        ];
        let err = check_taxon_sets(&ann, &seq).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Tx2"));
        assert!(msg.contains("Tx3"));

        assert!(check_taxon_sets(&ann, &ann).is_ok());
    }

    fn genome_line(len: usize) -> String {
        "ACGTACGTGC".chars().cycle().take(len).collect()
    }

    #[test]
    fn test_end_to_end_prefix_mode() {
        let dir = tempfile::tempdir().unwrap();

        // One hit for subject Gene1v2, full-length, forward.
        let blast = write_file(
            dir.path(),
            "hits.tsv",
            "q1\tGene1v2\t95.0\t300\t5\t2\t1\t300\t1\t300\t1e-50\t500.0\t300\t300\n",
        );
        let synonyms = write_file(dir.path(), "synonyms.tsv", "Gene1v2\tGene1\tTx1\n");
        let gff = write_file(
            dir.path(),
            "tx1.gff",
            "##gff-version 3\nChr1\ttest\tgene\t3001\t3600\t.\t+\t.\tID=Gene1;Name=Gene1v2\n",
        );
        let genome = write_file(
            dir.path(),
            "tx1.fasta",
            &format!(">Chr1 test assembly\n{}\n", genome_line(6000)),
        );
        let ann_list = write_file(
            dir.path(),
            "annotations.tsv",
            &format!("Tx1\t{}\n", gff.display()),
        );
        let seq_list = write_file(
            dir.path(),
            "sequences.tsv",
            &format!("Tx1\t{}\n", genome.display()),
        );

        let cfg = RunConfig {
            blast,
            annotations: ann_list,
            sequences: seq_list,
            synonyms: Some(synonyms),
            region: RegionMode::Downstream,
            length: 2000,
            min_coverage: 10.0,
            min_identity: 10.0,
            use_prefix: true,
            alt_suffix: false,
            outbase: dir.path().join("run1").display().to_string(),
            verbose: false,
        };

        let out_path = run(&cfg).unwrap();
        assert_eq!(
            out_path.file_name().unwrap().to_str().unwrap(),
            "run1_promotors.fasta"
        );

        let content = read_file(&out_path);
        let headers: Vec<&str> = content.lines().filter(|l| l.starts_with('>')).collect();
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with(">Tx1_Gene1_D2000"));
        assert!(headers[0].contains("Chr1:1000-3000"));
        assert!(headers[0].contains("AltID=Gene1v2"));

        // Window [3001-2001, 3000] = [1000, 3000], inclusive span 2001 bases.
        let seq_line = content.lines().nth(1).unwrap();
        assert_eq!(seq_line.len(), 2001);
    }

    #[test]
    fn test_end_to_end_window_too_small_yields_empty_output() {
        let dir = tempfile::tempdir().unwrap();

        let blast = write_file(
            dir.path(),
            "hits.tsv",
            "q1\tGene1\t95.0\t300\t5\t2\t1\t300\t1\t300\t1e-50\t500.0\t300\t300\n",
        );
        // Feature starts at base 5: the downstream flank clamps to [1, 4].
        let gff = write_file(
            dir.path(),
            "tx1.gff",
            "Chr1\ttest\tgene\t5\t400\t.\t+\t.\tID=Gene1\n",
        );
        let genome = write_file(
            dir.path(),
            "tx1.fasta",
            &format!(">Chr1\n{}\n", genome_line(10000)),
        );
        let ann_list = write_file(dir.path(), "ann.tsv", &format!("Tx1\t{}\n", gff.display()));
        let seq_list = write_file(dir.path(), "seq.tsv", &format!("Tx1\t{}\n", genome.display()));

        let cfg = RunConfig {
            blast,
            annotations: ann_list,
            sequences: seq_list,
            synonyms: None,
            region: RegionMode::Downstream,
            length: 2000,
            min_coverage: 10.0,
            min_identity: 10.0,
            use_prefix: false,
            alt_suffix: false,
            outbase: dir.path().join("run2").display().to_string(),
            verbose: false,
        };

        let out_path = run(&cfg).unwrap();
        assert_eq!(read_file(&out_path), "");
    }

    #[test]
    fn test_end_to_end_reverse_strand_feature() {
        let dir = tempfile::tempdir().unwrap();

        let blast = write_file(
            dir.path(),
            "hits.tsv",
            "q1\tGene2\t88.0\t200\t5\t2\t1\t200\t200\t1\t1e-50\t300.0\t200\t200\n",
        );
        // Reverse-strand feature: Downstream flank sits after the feature
        // in genomic coordinates and comes back reverse-complemented.
        let gff = write_file(
            dir.path(),
            "tx1.gff",
            "Chr1\ttest\tgene\t100\t220\t.\t-\t.\tID=Gene2\n",
        );
        let genome = write_file(
            dir.path(),
            "tx1.fasta",
            &format!(">Chr1\n{}\n", genome_line(500)),
        );
        let ann_list = write_file(dir.path(), "ann.tsv", &format!("Tx1\t{}\n", gff.display()));
        let seq_list = write_file(dir.path(), "seq.tsv", &format!("Tx1\t{}\n", genome.display()));

        let cfg = RunConfig {
            blast,
            annotations: ann_list,
            sequences: seq_list,
            synonyms: None,
            region: RegionMode::Downstream,
            length: 100,
            min_coverage: 10.0,
            min_identity: 10.0,
            use_prefix: false,
            alt_suffix: false,
            outbase: dir.path().join("run3").display().to_string(),
            verbose: false,
        };

        let out_path = run(&cfg).unwrap();
        let content = read_file(&out_path);
        let header = content.lines().next().unwrap();
        // Window [221, 321], clamped inside the 500 bp contig.
        assert!(header.starts_with(">Gene2_D100"));
        assert!(header.contains("Chr1:221-321"));

        let seq_line = content.lines().nth(1).unwrap();
        assert_eq!(seq_line.len(), 101);

        // First emitted base is the complement of the window's last base.
        let genome_seq = genome_line(500);
        let expected_last = genome_seq.as_bytes()[320] as char; // base 321, 1-based
        let complement = match expected_last {
            'A' => 'T',
            'T' => 'A',
            'G' => 'C',
            _ => 'G',
        };
        assert_eq!(seq_line.chars().next().unwrap(), complement);
    }

    #[test]
    fn test_end_to_end_taxon_mismatch_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let blast = write_file(
            dir.path(),
            "hits.tsv",
            "q1\tGene1\t95.0\t300\t5\t2\t1\t300\t1\t300\t1e-50\t500.0\t300\t300\n",
        );
        let gff = write_file(dir.path(), "tx1.gff", "Chr1\tt\tgene\t10\t90\t.\t+\t.\tID=Gene1\n");
        let genome = write_file(dir.path(), "tx1.fasta", ">Chr1\nACGT\n");
        let ann_list = write_file(dir.path(), "ann.tsv", &format!("Tx1\t{}\n", gff.display()));
        let seq_list = write_file(dir.path(), "seq.tsv", &format!("Tx2\t{}\n", genome.display()));

        let cfg = RunConfig {
            blast,
            annotations: ann_list,
            sequences: seq_list,
            synonyms: None,
            region: RegionMode::Downstream,
            length: 2000,
            min_coverage: 10.0,
            min_identity: 10.0,
            use_prefix: false,
            alt_suffix: false,
            outbase: dir.path().join("run4").display().to_string(),
            verbose: false,
        };

        assert!(run(&cfg).is_err());
    }
}
