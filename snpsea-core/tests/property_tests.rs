//! Property-based tests using proptest.
//!
//! These verify invariants that must hold for all valid inputs rather
//! than specific numerical values:
//!   - specificity percentiles stay in (0, 1] and are permutation
//!     invariant
//!   - ranking is idempotent
//!   - locus merging is a fixed point with disjoint genesets
//!   - the exact Monte-Carlo p-value identity and its bounds
//!   - hypergeometric terms behave like probabilities

use proptest::prelude::*;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use snpsea_core::matrix::{rank_descending, GeneMatrix};
use snpsea_core::permutation::{batch_sizes, Scheduler, SchedulerConfig};
use snpsea_core::resolve::merge_loci;
use snpsea_core::sampler::NullPool;
use snpsea_core::score::{hypergeometric_pmf, hypergeometric_upper_tail, Method, Scorer};
use snpsea_linalg::DenseMatrix;

// ---------------------------------------------------------------------------
// 1. Ranking: percentiles in (0, 1], rank sum fixed, ties averaged
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_rank_percentiles_in_unit_interval(
        values in prop::collection::vec(-100.0f64..100.0, 1..50),
    ) {
        let n = values.len() as f64;
        let ranks = rank_descending(&values);
        let mut sum = 0.0;
        for r in &ranks {
            let pct = r / n;
            prop_assert!(pct > 0.0 && pct <= 1.0, "percentile out of range: {}", pct);
            sum += r;
        }
        // Average tie ranks preserve the total 1 + 2 + ... + n.
        let expected = n * (n + 1.0) / 2.0;
        prop_assert!((sum - expected).abs() < 1e-6, "rank sum {} != {}", sum, expected);
    }

    #[test]
    fn prop_rank_permutation_invariant(
        values in prop::collection::vec(-10.0f64..10.0, 2..30),
        seed in 0u64..1000,
    ) {
        use rand::seq::SliceRandom;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut shuffled = values.clone();
        shuffled.shuffle(&mut rng);

        let mut a = rank_descending(&values);
        let mut b = rank_descending(&shuffled);
        a.sort_by(|x, y| x.partial_cmp(y).unwrap());
        b.sort_by(|x, y| x.partial_cmp(y).unwrap());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_rank_stable_under_reranking(
        values in prop::collection::vec(-10.0f64..10.0, 1..30),
    ) {
        // Descending ranks reverse the value order, so re-ranking
        // permutes the percentiles without changing their multiset,
        // and two re-rankings restore the first result exactly.
        let n = values.len() as f64;
        let once: Vec<f64> = rank_descending(&values).iter().map(|r| r / n).collect();
        let twice: Vec<f64> = rank_descending(&once).iter().map(|r| r / n).collect();
        let thrice: Vec<f64> = rank_descending(&twice).iter().map(|r| r / n).collect();

        let mut a = once.clone();
        let mut b = twice.clone();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap());
        b.sort_by(|x, y| x.partial_cmp(y).unwrap());
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert!((x - y).abs() < 1e-12);
        }
        for (x, y) in once.iter().zip(thrice.iter()) {
            prop_assert!((x - y).abs() < 1e-12, "third pass diverges: {} vs {}", x, y);
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Merging: fixed point, disjoint outputs, gene conservation
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_merge_fixed_point_and_disjoint(
        genesets in prop::collection::vec(
            prop::collection::btree_set(0usize..20, 1..5),
            1..12,
        ),
    ) {
        let mapped: Vec<(String, Vec<usize>)> = genesets
            .iter()
            .enumerate()
            .map(|(i, set)| (format!("rs{}", i), set.iter().copied().collect()))
            .collect();

        let once = merge_loci(&mapped);

        // No two loci share a gene.
        for i in 0..once.len() {
            for j in i + 1..once.len() {
                for g in &once[i].genes {
                    prop_assert!(!once[j].genes.contains(g));
                }
            }
        }

        // Merging again changes nothing.
        let again: Vec<(String, Vec<usize>)> = once
            .iter()
            .map(|l| (l.label.clone(), l.genes.clone()))
            .collect();
        let twice = merge_loci(&again);
        prop_assert_eq!(once.len(), twice.len());

        // The union of genes is conserved.
        let mut before: Vec<usize> = mapped.iter().flat_map(|(_, g)| g.clone()).collect();
        before.sort_unstable();
        before.dedup();
        let mut after: Vec<usize> = once.iter().flat_map(|l| l.genes.clone()).collect();
        after.sort_unstable();
        prop_assert_eq!(before, after);
    }
}

// ---------------------------------------------------------------------------
// 3. Batch schedule: totals and doubling
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_batch_sizes_sum_and_double(max in 1u64..2_000_000) {
        let batches = batch_sizes(100, max);
        let total: u64 = batches.iter().sum();
        prop_assert_eq!(total, max);

        // Every batch except the last doubles the previous one.
        for window in batches.windows(2).take(batches.len().saturating_sub(2)) {
            prop_assert_eq!(window[1], window[0] * 2);
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Hypergeometric terms are probabilities
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_hypergeometric_pmf_distribution(
        n1 in 0u64..30,
        n2 in 1u64..30,
        t_frac in 0u64..100,
    ) {
        let t = (n1 + n2) * t_frac / 100;
        let mut total = 0.0;
        for k in 0..=t {
            let p = hypergeometric_pmf(k, n1, n2, t);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&p));
            total += p;
        }
        prop_assert!((total - 1.0).abs() < 1e-8, "pmf sums to {}", total);

        // The upper tail at 0 is the whole mass.
        let q0 = hypergeometric_upper_tail(0, n1, n2, t);
        prop_assert!((q0 - 1.0).abs() < 1e-8);
    }
}

// ---------------------------------------------------------------------------
// 5. Scheduler: the exact Monte-Carlo identity holds for every row
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_pvalue_identity(
        seed in 0u64..500,
        min_observations in 0u64..40,
        expressed in prop::collection::btree_set(0usize..8, 1..8),
    ) {
        let max_iterations = 200u64;
        let nrows = 8;

        // Binary column with the chosen expressed rows.
        let col: Vec<f64> = (0..nrows)
            .map(|r| if expressed.contains(&r) { 1.0 } else { 0.0 })
            .collect();
        let matrix = GeneMatrix::new(
            (0..nrows).map(|i| format!("G{}", i)).collect(),
            vec!["c".to_string()],
            DenseMatrix::from_row_major(nrows, 1, &col),
        );

        let pool = NullPool::from_genesets((0..nrows).map(|r| vec![r]).collect());
        let scorer = Scorer::new(&matrix, nrows, Method::Single);
        let scheduler = Scheduler::new(
            scorer,
            &pool,
            vec![1],
            SchedulerConfig { min_observations, max_iterations },
        );

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut out = Vec::new();
        let first = expressed.iter().next().copied().unwrap();
        let results = scheduler
            .run_pass(&[vec![first]], &mut rng, &mut out, None)
            .unwrap();

        let r = &results[0];
        prop_assert!(r.nulls_observed <= r.nulls_tested);
        prop_assert!(r.nulls_tested <= max_iterations);
        let expected = (r.nulls_observed as f64 + 1.0) / (r.nulls_tested as f64 + 1.0);
        prop_assert!((r.pvalue - expected).abs() < 1e-12);
        prop_assert!(r.pvalue > 0.0 && r.pvalue <= 1.0);
    }
}

// ---------------------------------------------------------------------------
// 6. Scores are non-negative and finite for all four kernels
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_scores_nonnegative(
        seed in 0u64..1000,
        binary in any::<bool>(),
        total in any::<bool>(),
    ) {
        use rand::Rng;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let nrows = 12;

        let col: Vec<f64> = if binary {
            (0..nrows)
                .map(|_| if rng.gen::<f64>() < 0.4 { 1.0 } else { 0.0 })
                .collect()
        } else {
            // Already-ranked percentiles.
            let ranks = rank_descending(
                &(0..nrows).map(|_| rng.gen::<f64>()).collect::<Vec<_>>(),
            );
            ranks.iter().map(|r| r / nrows as f64).collect()
        };
        let matrix = GeneMatrix::new(
            (0..nrows).map(|i| format!("G{}", i)).collect(),
            vec!["c".to_string()],
            DenseMatrix::from_row_major(nrows, 1, &col),
        );
        prop_assert_eq!(matrix.is_binary(), binary);

        let method = if total { Method::Total } else { Method::Single };
        let scorer = Scorer::new(&matrix, nrows, method);

        for _ in 0..10 {
            let size = rng.gen_range(1..=4);
            let genes: Vec<usize> = (0..size).map(|_| rng.gen_range(0..nrows)).collect();
            let views: Vec<&[usize]> = vec![&genes];
            let score = scorer.column_score(0, &views);
            prop_assert!(score.is_finite());
            prop_assert!(score >= 0.0, "negative score {}", score);
        }
    }
}
