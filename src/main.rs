use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use promex::pipeline::{self, RunConfig};
use promex::region::RegionMode;

fn parse_region_mode(s: &str) -> Result<RegionMode, String> {
    RegionMode::from_code(s).map_err(|e| e.to_string())
}

fn parse_window_length(s: &str) -> Result<usize, String> {
    let val: usize = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if val == 0 {
        Err("Window length must be a positive integer".to_string())
    } else {
        Ok(val)
    }
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let val: f64 = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if !(0.0..=100.0).contains(&val) {
        Err(format!("Percentage must be between 0 and 100, got {}", val))
    } else {
        Ok(val)
    }
}

#[derive(Parser)]
#[command(name = "promex")]
#[command(version)]
#[command(about = "Promoter sequence extraction from BLAST hits, GFF annotations and genomes")]
#[command(long_about = r#"
promex - promoter region extraction

Cross-references three inputs to pull promoter sequences out of genome
assemblies:
  1. Filters tabular BLAST hits by coverage and identity
  2. Resolves hit identifiers against per-genome GFF annotations
     (optional synonym remapping, prefix/suffix spelling heuristics)
  3. Projects a strand-aware flanking window around each located feature
  4. Extracts the window from the assembly (reverse-complemented on the
     minus strand) into a single FASTA file

INPUT FILES:
  BLAST hits       14 columns: -outfmt "6 std qlen slen"
  Annotation list  taxon id <TAB> path to GFF file, one genome per line
  Sequence list    taxon id <TAB> path to FASTA file (.gz supported);
                   must cover exactly the same taxa as the annotation list
  Synonym table    external id <TAB> feature id [<TAB> prefix id]

OUTPUT:
  {outbase}_promotors.fasta

EXAMPLES:
  # Default: 2000 bp upstream of the transcription start
  promex -b hits.tsv -g annotations.tsv -s sequences.tsv

  # Feature plus both flanks, synonym remapping with taxon prefixes
  promex -b hits.tsv -g annotations.tsv -s sequences.tsv \
         -y synonyms.tsv -p -r B -l 1500 -o my_run
"#)]
struct Args {

    #[arg(short = 'b', long, value_name = "FILE", help_heading = "Input")]
    blast: PathBuf,

    #[arg(short = 'g', long, value_name = "FILE", help_heading = "Input")]
    annotations: PathBuf,

    #[arg(short = 's', long, value_name = "FILE", help_heading = "Input")]
    sequences: PathBuf,

    #[arg(short = 'y', long, value_name = "FILE", help_heading = "Input")]
    synonyms: Option<PathBuf>,

    #[arg(short = 'r', long, value_name = "D|U|B", default_value = "D",
          value_parser = parse_region_mode, help_heading = "Region")]
    region: RegionMode,

    #[arg(short = 'l', long, value_name = "BP", default_value = "2000",
          value_parser = parse_window_length, help_heading = "Region")]
    length: usize,

    #[arg(short = 'c', long = "min-coverage", value_name = "PERCENT", default_value = "10",
          value_parser = parse_percent, help_heading = "Filtering")]
    min_coverage: f64,

    #[arg(short = 'i', long = "min-identity", value_name = "PERCENT", default_value = "10",
          value_parser = parse_percent, help_heading = "Filtering")]
    min_identity: f64,

    #[arg(short = 'p', long = "use-prefix", help_heading = "Matching")]
    use_prefix: bool,

    #[arg(short = 'a', long = "alt-suffix", help_heading = "Matching")]
    alt_suffix: bool,

    #[arg(short = 'o', long, value_name = "BASE", default_value = "promoter_seqs", help_heading = "Output")]
    out: String,

    #[arg(short = 'v', long, help_heading = "Output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let config = RunConfig {
        blast: args.blast,
        annotations: args.annotations,
        sequences: args.sequences,
        synonyms: args.synonyms,
        region: args.region,
        length: args.length,
        min_coverage: args.min_coverage,
        min_identity: args.min_identity,
        use_prefix: args.use_prefix,
        alt_suffix: args.alt_suffix,
        outbase: args.out,
        verbose: args.verbose,
    };

    pipeline::run(&config)?;

    if config.verbose {
        eprintln!("Total time: {:.1}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}
