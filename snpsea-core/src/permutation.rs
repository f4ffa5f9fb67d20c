//! Adaptive permutation scheduler.
//!
//! For each condition column, scores the test genesets, then draws
//! size-matched null genesets in geometrically growing batches until
//! enough null scores meet or beat the test score, or the iteration
//! budget runs out. Each batch is statically partitioned across the
//! rayon pool; workers score with independent random substreams and
//! local exceedance counters that are summed per batch. Emits the
//! exact Monte-Carlo p-value (observed + 1) / (tested + 1).

use std::io::Write;

use anyhow::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::sampler::NullPool;
use crate::score::Scorer;

/// Draws in the first batch; later batches double until the budget.
const BATCH_START: u64 = 100;

/// Iteration sizes for one column: `start, 2*start, 4*start, ...`
/// with the last batch trimmed so the total equals `max`.
pub fn batch_sizes(start: u64, max: u64) -> Vec<u64> {
    if max <= start {
        return vec![max];
    }
    let mut result = vec![start];
    let mut sum = start;
    let mut step = start;
    while sum + step * 2 < max {
        step *= 2;
        result.push(step);
        sum += step;
    }
    if max > sum {
        result.push(max - sum);
    }
    result
}

/// Split `count` draws as evenly as possible over `workers`.
fn split_evenly(count: u64, workers: usize) -> Vec<u64> {
    let workers = workers.max(1) as u64;
    let base = count / workers;
    let rem = count % workers;
    (0..workers)
        .map(|i| base + u64::from(i < rem))
        .filter(|&share| share > 0)
        .collect()
}

/// Stopping rules for the iteration loop.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Stop a column once this many null sets scored at or above the
    /// test score. Zero means exactly one batch runs.
    pub min_observations: u64,
    /// Total null sets tested per column when never stopped early.
    pub max_iterations: u64,
}

/// One emitted p-value row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionResult {
    pub condition: String,
    pub pvalue: f64,
    pub nulls_observed: u64,
    pub nulls_tested: u64,
    /// Set for null-replicate passes; absent for the user pass.
    pub replicate: Option<u64>,
}

/// Header for `condition_pvalues.txt`. The null-replicate file carries
/// no header because replicates append to it.
pub fn write_pvalues_header(writer: &mut impl Write) -> Result<()> {
    writeln!(writer, "condition\tpvalue\tnulls_observed\tnulls_tested")?;
    Ok(())
}

/// Write one result row and flush it, so prior columns survive a kill.
pub fn write_pvalue_line(writer: &mut impl Write, result: &ConditionResult) -> Result<()> {
    match result.replicate {
        Some(rep) => writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            result.condition, result.pvalue, result.nulls_observed, result.nulls_tested, rep
        )?,
        None => writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            result.condition, result.pvalue, result.nulls_observed, result.nulls_tested
        )?,
    }
    writer.flush()?;
    Ok(())
}

/// Runs the exceedance-counting loop over every condition column.
pub struct Scheduler<'a> {
    scorer: Scorer<'a>,
    pool: &'a NullPool,
    /// Bin keys for the null draws: the test loci's geneset sizes,
    /// clamped to MAX_GENES.
    match_sizes: Vec<usize>,
    config: SchedulerConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        scorer: Scorer<'a>,
        pool: &'a NullPool,
        match_sizes: Vec<usize>,
        config: SchedulerConfig,
    ) -> Self {
        Scheduler {
            scorer,
            pool,
            match_sizes,
            config,
        }
    }

    /// Score one whole SNP-set pass: every column in order, writing
    /// and flushing one row per column.
    pub fn run_pass(
        &self,
        genesets: &[Vec<usize>],
        rng: &mut ChaCha8Rng,
        writer: &mut impl Write,
        replicate: Option<u64>,
    ) -> Result<Vec<ConditionResult>> {
        let matrix = self.scorer.matrix();
        let views: Vec<&[usize]> = genesets.iter().map(|g| g.as_slice()).collect();
        let mut results = Vec::with_capacity(matrix.ncols());

        for col in 0..matrix.ncols() {
            let condition = matrix.col_names()[col].clone();
            let user_score = self.scorer.column_score(col, &views);

            if user_score <= 0.0 {
                let result = ConditionResult {
                    condition,
                    pvalue: 1.0,
                    nulls_observed: 0,
                    nulls_tested: 0,
                    replicate,
                };
                write_pvalue_line(writer, &result)?;
                results.push(result);
                continue;
            }

            let (nulls_observed, nulls_tested) = self.iterate_column(col, user_score, rng);
            let pvalue = (nulls_observed as f64 + 1.0) / (nulls_tested as f64 + 1.0);

            debug!(
                "{}: pvalue={} observed={} tested={}",
                condition, pvalue, nulls_observed, nulls_tested
            );
            if replicate.is_none() && (col + 1) % 50 == 0 {
                info!("Scored {} of {} conditions", col + 1, matrix.ncols());
            }

            let result = ConditionResult {
                condition,
                pvalue,
                nulls_observed,
                nulls_tested,
                replicate,
            };
            write_pvalue_line(writer, &result)?;
            results.push(result);
        }

        Ok(results)
    }

    /// The doubling batch loop for one column. Returns
    /// (nulls_observed, nulls_tested).
    fn iterate_column(&self, col: usize, user_score: f64, rng: &mut ChaCha8Rng) -> (u64, u64) {
        let mut observed = 0u64;
        let mut tested = 0u64;

        for count in batch_sizes(BATCH_START, self.config.max_iterations) {
            let shares = split_evenly(count, rayon::current_num_threads());
            let seeds: Vec<u64> = shares.iter().map(|_| rng.gen()).collect();

            let scorer = self.scorer;
            let pool = self.pool;
            let sizes = &self.match_sizes;

            observed += shares
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(&share, &seed)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let mut draw: Vec<&[usize]> = Vec::with_capacity(sizes.len());
                    let mut local = 0u64;
                    for _ in 0..share {
                        pool.draw_matched(sizes, &mut rng, &mut draw);
                        if scorer.column_score(col, &draw) >= user_score {
                            local += 1;
                        }
                    }
                    local
                })
                .sum::<u64>();
            tested += count;

            if observed >= self.config.min_observations {
                break;
            }
        }

        (observed, tested)
    }
}
