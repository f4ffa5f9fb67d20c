//! snpsea-rs: SNP set enrichment analysis.
//!
//! CLI entry point using clap for argument parsing. Tests whether the
//! genes near a set of GWAS SNPs are enriched for condition-specific
//! expression or annotation, against size-matched null SNP sets.

mod run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use snpsea_core::options::{RunOptions, UserSnpSource};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "snpsea",
    version,
    about = "SNPSEA-RS: enrichment of condition-specific gene annotations within disease loci",
    long_about = "Tests each column of a gene-by-condition matrix for enrichment of genes\n\
                  overlapping the given SNP intervals, against null SNP sets sampled from\n\
                  a supplied pool and matched on locus gene count."
)]
struct Cli {
    /// SNP identifier list, or 'randomN' for N random null SNPs
    #[arg(long)]
    snps: String,

    /// Gene matrix in GCT format (optionally gzipped)
    #[arg(long)]
    gene_matrix: PathBuf,

    /// BED file with gene intervals; names must match the matrix rows
    #[arg(long)]
    gene_intervals: PathBuf,

    /// BED file with SNP intervals for all known SNPs
    #[arg(long)]
    snp_intervals: PathBuf,

    /// SNP identifiers to sample for null matched or random SNP sets
    #[arg(long)]
    null_snps: PathBuf,

    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Matrix columns to condition on before testing
    #[arg(long)]
    condition: Option<PathBuf>,

    /// Extend a SNP interval this many bases when it overlaps no gene
    #[arg(long, default_value = "250000")]
    slop: u64,

    /// Number of threads to use
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Number of null matched SNP sets to test for comparison
    #[arg(long, default_value = "10")]
    null_snpsets: u64,

    /// Stop testing a column after this many null sets score at or
    /// above the user's score
    #[arg(long, default_value = "25")]
    min_observations: u64,

    /// Maximum null SNP sets tested against each column
    #[arg(long, default_value = "1000")]
    max_iterations: u64,

    /// Scoring method: 'single' or 'total'
    #[arg(long, default_value = "single")]
    score: String,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let options = RunOptions {
        snps: cli.snps,
        gene_matrix: cli.gene_matrix,
        gene_intervals: cli.gene_intervals,
        snp_intervals: cli.snp_intervals,
        null_snps: cli.null_snps,
        condition: cli.condition,
        out: cli.out,
        score: cli.score.parse()?,
        slop: cli.slop,
        threads: cli.threads.clamp(1, hardware),
        null_snpsets: cli.null_snpsets,
        min_observations: cli.min_observations,
        max_iterations: cli.max_iterations,
    };

    options.validate()?;
    check_input_files(&options)?;

    std::fs::create_dir_all(&options.out).with_context(|| {
        format!("Cannot create output directory: {}", options.out.display())
    })?;

    // Log to stderr and to <out>/log.txt.
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_file = std::fs::File::create(options.out.join("log.txt"))
        .with_context(|| format!("Cannot create log file in {}", options.out.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Arc::new(log_file)))
        .init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build_global()
        .ok();

    tracing::info!("snpsea-rs v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using {} threads", options.threads);

    run::run(&options)
}

/// Fail before anything is written if an input file is missing.
fn check_input_files(options: &RunOptions) -> Result<()> {
    let mut required = vec![
        options.gene_matrix.clone(),
        options.gene_intervals.clone(),
        options.snp_intervals.clone(),
        options.null_snps.clone(),
    ];
    if let Some(condition) = &options.condition {
        required.push(condition.clone());
    }
    if let UserSnpSource::File(path) = options.user_source()? {
        required.push(path);
    }
    for path in required {
        if !path.is_file() {
            bail!("Input file does not exist: {}", path.display());
        }
    }
    Ok(())
}
