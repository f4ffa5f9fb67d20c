//! One full enrichment run: load inputs, prepare the matrix, bin the
//! null pool, resolve and merge the user SNPs, then drive the
//! permutation scheduler over the null replicates and the user pass.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use snpsea_core::error::SnpseaError;
use snpsea_core::interval::{GeneIndex, GenomicInterval, SnpIntervalMap};
use snpsea_core::matrix::GeneMatrix;
use snpsea_core::options::{RunOptions, UserSnpSource};
use snpsea_core::permutation::{write_pvalues_header, Scheduler, SchedulerConfig};
use snpsea_core::report;
use snpsea_core::resolve::{merge_loci, resolve_user_snps};
use snpsea_core::sampler::NullPool;
use snpsea_core::score::Scorer;
use snpsea_core::MAX_GENES;
use snpsea_io::{bed, gct, names};

/// Fixed sampler seed so repeated runs draw the same null sets.
const SAMPLER_SEED: u64 = 12345;

pub fn run(options: &RunOptions) -> Result<()> {
    let out = &options.out;

    let mut args_file = File::create(out.join("args.txt"))
        .with_context(|| format!("Cannot write args.txt in {}", out.display()))?;
    options.write_to(&mut args_file)?;

    info!("Reading input files");

    let null_names = names::read_names(&options.null_snps)?;
    if null_names.is_empty() {
        return Err(SnpseaError::EmptyNullPool.into());
    }
    info!(
        "\"{}\" has {} identifiers",
        options.null_snps.display(),
        null_names.len()
    );

    let conditions = match &options.condition {
        Some(path) => {
            let conditions = names::read_names(path)?;
            if conditions.is_empty() {
                bail!("No condition names found in {}", path.display());
            }
            conditions
        }
        None => Vec::new(),
    };

    let snp_intervals: SnpIntervalMap = bed::read_bed(&options.snp_intervals)?
        .into_iter()
        .map(|r| {
            (
                r.name,
                GenomicInterval {
                    chrom: r.chrom,
                    start: r.start,
                    end: r.end,
                },
            )
        })
        .collect();
    info!(
        "\"{}\" has {} intervals",
        options.snp_intervals.display(),
        snp_intervals.len()
    );

    let gct = gct::read_gct(&options.gene_matrix)?;
    info!(
        "\"{}\" has {} rows, {} columns",
        options.gene_matrix.display(),
        gct.row_names.len(),
        gct.col_names.len()
    );

    let index = GeneIndex::build(
        bed::read_bed(&options.gene_intervals)?.into_iter().map(|r| {
            (
                r.name,
                GenomicInterval {
                    chrom: r.chrom,
                    start: r.start,
                    end: r.end,
                },
            )
        }),
        &gct.row_names,
    );
    info!(
        "Skipped {} gene intervals absent from the gene matrix",
        index.skipped_genes
    );
    info!(
        "{} genes from the gene matrix are absent from the gene intervals",
        index.missing_genes
    );

    let mut matrix = GeneMatrix::new(gct.row_names, gct.col_names, gct.values);
    matrix.prepare(&conditions)?;

    let pool = NullPool::build(&null_names, &snp_intervals, &index, options.slop)?;
    info!("{} null SNPs overlap at least one gene", pool.len());

    let mut rng = ChaCha8Rng::seed_from_u64(SAMPLER_SEED);

    let source = options.user_source()?;
    let (user_names, random_count) = match source {
        UserSnpSource::File(path) => {
            let user_names = names::read_names(&path)?;
            if user_names.is_empty() {
                return Err(SnpseaError::EmptyInputSnpSet.into());
            }
            info!("\"{}\" has {} identifiers", path.display(), user_names.len());
            (user_names, None)
        }
        UserSnpSource::Random(n) => {
            let user_names = pool.random_snps(n, &mut rng)?;
            info!("Drew {} random SNPs from the null pool", user_names.len());
            (user_names, Some(n))
        }
    };

    info!("Overlapping SNP intervals with gene intervals");
    let resolved = resolve_user_snps(&user_names, &snp_intervals, &index, options.slop);
    let loci = merge_loci(&resolved.mapped);

    let path = out.join("snp_genes.txt");
    info!("Writing \"{}\"", path.display());
    let mut writer = BufWriter::new(File::create(&path)?);
    report::write_snp_genes(
        &mut writer,
        &resolved,
        &loci,
        &snp_intervals,
        matrix.row_names(),
    )?;

    let sizes: Vec<usize> = loci.iter().map(|l| l.genes.len().min(MAX_GENES)).collect();
    pool.check_sizes(&sizes)?;
    pool.log_occupancy(&sizes);
    info!(
        "Computing up to {:e} iterations per condition with {} threads",
        options.max_iterations as f64,
        options.threads
    );

    let scorer = Scorer::new(&matrix, index.effective_rows, options.score);
    let scheduler = Scheduler::new(
        scorer,
        &pool,
        sizes.clone(),
        SchedulerConfig {
            min_observations: options.min_observations,
            max_iterations: options.max_iterations,
        },
    );
    let genesets: Vec<Vec<usize>> = loci.iter().map(|l| l.genes.clone()).collect();

    if options.null_snpsets > 0 {
        info!("Computing {} null SNP set replicates", options.null_snpsets);
        let path = out.join("null_pvalues.txt");
        let mut writer = BufWriter::new(File::create(&path)?);
        for replicate in 0..options.null_snpsets {
            let replicate_sets = match random_count {
                Some(n) => pool.random_genesets(n, &mut rng)?,
                None => pool.matched_set(&sizes, &mut rng),
            };
            scheduler.run_pass(&replicate_sets, &mut rng, &mut writer, Some(replicate))?;
        }
        info!("Null replicates done");
    }

    let path = out.join("snp_condition_scores.txt");
    info!("Writing \"{}\"", path.display());
    let mut writer = BufWriter::new(File::create(&path)?);
    report::write_condition_scores(&mut writer, &loci, &matrix)?;

    info!("Computing one condition at a time");
    let path = out.join("condition_pvalues.txt");
    let mut writer = BufWriter::new(File::create(&path)?);
    write_pvalues_header(&mut writer)?;
    scheduler.run_pass(&genesets, &mut rng, &mut writer, None)?;

    info!("done");
    Ok(())
}
