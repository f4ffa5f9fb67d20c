//! SNP to geneset resolution and locus merging.
//!
//! A SNP resolves to the row indices of the genes its interval
//! intersects. When the exact interval hits nothing, the query widens
//! by `slop` on both sides (clamped at coordinate 1) and runs once
//! more. User SNPs whose genesets share genes coalesce into loci.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::interval::{GeneIndex, SnpIntervalMap};

/// Gene row indices overlapping one SNP's interval, with the slop
/// fallback. Returns an empty vector when the SNP has no interval or
/// overlaps nothing even after widening.
pub fn snp_geneset(
    snp: &str,
    intervals: &SnpIntervalMap,
    index: &GeneIndex,
    slop: u64,
) -> Vec<usize> {
    let Some(iv) = intervals.get(snp) else {
        return Vec::new();
    };
    let mut hits = index.overlapping(&iv.chrom, iv.start, iv.end);
    if hits.is_empty() {
        let start = iv.start.saturating_sub(slop).max(1);
        hits = index.overlapping(&iv.chrom, start, iv.end + slop);
    }
    hits
}

/// User SNPs classified by how their resolution went.
#[derive(Debug, Default)]
pub struct ResolvedSnps {
    /// SNPs missing from the SNP-interval file, sorted.
    pub absent: Vec<String>,
    /// SNPs overlapping zero genes even after slop, sorted.
    pub naked: Vec<String>,
    /// SNPs with at least one overlapping gene, sorted by name.
    pub mapped: Vec<(String, Vec<usize>)>,
}

/// Resolve every user SNP, splitting them into absent / zero-gene /
/// mapped groups.
pub fn resolve_user_snps(
    snp_names: &[String],
    intervals: &SnpIntervalMap,
    index: &GeneIndex,
    slop: u64,
) -> ResolvedSnps {
    let mut resolved = ResolvedSnps::default();
    let names: BTreeSet<&String> = snp_names.iter().collect();

    for snp in names {
        if !intervals.contains_key(snp.as_str()) {
            info!("{} not found in the SNP interval file", snp);
            resolved.absent.push(snp.clone());
            continue;
        }
        let genes = snp_geneset(snp, intervals, index, slop);
        if genes.is_empty() {
            resolved.naked.push(snp.clone());
        } else {
            resolved.mapped.push((snp.clone(), genes));
        }
    }

    info!(
        "{} SNPs not found, {} SNPs overlap 0 genes",
        resolved.absent.len(),
        resolved.naked.len()
    );
    resolved
}

/// One user locus: a single SNP, or several SNPs merged because their
/// genesets overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLocus {
    /// Comma-joined member SNP names, sorted.
    pub label: String,
    /// Member SNP names, sorted.
    pub snps: Vec<String>,
    /// Union of the members' gene row indices, sorted and distinct.
    pub genes: Vec<usize>,
}

/// Coalesce SNPs sharing at least one gene into loci. The sharing
/// relation is applied transitively with union-find, so the result
/// does not depend on iteration order and no two output loci share a
/// gene.
pub fn merge_loci(mapped: &[(String, Vec<usize>)]) -> Vec<UserLocus> {
    let n = mapped.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    let mut first_owner: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, (_, genes)) in mapped.iter().enumerate() {
        for &g in genes {
            match first_owner.get(&g) {
                Some(&j) => {
                    let ri = find(&mut parent, i);
                    let rj = find(&mut parent, j);
                    if ri != rj {
                        parent[ri.max(rj)] = ri.min(rj);
                    }
                }
                None => {
                    first_owner.insert(g, i);
                }
            }
        }
    }

    let mut components: BTreeMap<usize, (Vec<String>, BTreeSet<usize>)> = BTreeMap::new();
    for (i, (snp, genes)) in mapped.iter().enumerate() {
        let root = find(&mut parent, i);
        let entry = components.entry(root).or_default();
        entry.0.push(snp.clone());
        entry.1.extend(genes.iter().copied());
    }

    let mut merged_snps = 0;
    let mut merged_loci = 0;
    let mut loci: Vec<UserLocus> = components
        .into_values()
        .map(|(mut snps, genes)| {
            snps.sort();
            if snps.len() > 1 {
                merged_snps += snps.len();
                merged_loci += 1;
            }
            UserLocus {
                label: snps.join(","),
                genes: genes.into_iter().collect(),
                snps,
            }
        })
        .collect();
    loci.sort_by(|a, b| a.label.cmp(&b.label));

    info!("Merged {} SNPs into {} loci", merged_snps, merged_loci);
    loci
}
