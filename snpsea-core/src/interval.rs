//! Per-chromosome interval index over gene loci.
//!
//! Each chromosome gets a centered interval tree stored as an arena of
//! nodes. Tree values are row indices into the gene matrix, so an
//! overlap query returns positions that can be used directly for
//! column lookups. Overlap is inclusive of both endpoints, matching
//! the coordinates as they appear in the BED file.

use std::collections::{HashMap, HashSet};

/// A genomic interval with half-open construction but inclusive
/// overlap semantics at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

/// Mapping from SNP identifier to its genomic interval.
pub type SnpIntervalMap = HashMap<String, GenomicInterval>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    start: u64,
    end: u64,
    row: usize,
}

#[derive(Debug)]
struct Node {
    center: u64,
    /// Entries whose interval spans this node's center.
    spanning: Vec<Entry>,
    left: Option<usize>,
    right: Option<usize>,
}

/// A centered interval tree over one chromosome.
#[derive(Debug, Default)]
pub struct IntervalTree {
    nodes: Vec<Node>,
}

impl IntervalTree {
    fn build(entries: Vec<Entry>) -> Self {
        let mut tree = IntervalTree { nodes: Vec::new() };
        if !entries.is_empty() {
            tree.build_node(entries);
        }
        tree
    }

    fn build_node(&mut self, mut entries: Vec<Entry>) -> usize {
        entries.sort_by_key(|e| (e.start + e.end) / 2);
        let center = {
            let mid = &entries[entries.len() / 2];
            (mid.start + mid.end) / 2
        };

        let mut spanning = Vec::new();
        let mut left_entries = Vec::new();
        let mut right_entries = Vec::new();
        for e in entries {
            if e.end < center {
                left_entries.push(e);
            } else if e.start > center {
                right_entries.push(e);
            } else {
                spanning.push(e);
            }
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            center,
            spanning,
            left: None,
            right: None,
        });
        if !left_entries.is_empty() {
            let child = self.build_node(left_entries);
            self.nodes[idx].left = Some(child);
        }
        if !right_entries.is_empty() {
            let child = self.build_node(right_entries);
            self.nodes[idx].right = Some(child);
        }
        idx
    }

    /// Collect the row indices of all intervals intersecting
    /// `[start, end]`, endpoints inclusive.
    pub fn overlapping(&self, start: u64, end: u64, hits: &mut Vec<usize>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            for e in &node.spanning {
                if e.start <= end && e.end >= start {
                    hits.push(e.row);
                }
            }
            if start < node.center {
                if let Some(l) = node.left {
                    stack.push(l);
                }
            }
            if end > node.center {
                if let Some(r) = node.right {
                    stack.push(r);
                }
            }
        }
    }
}

/// The full gene index: one interval tree per chromosome, plus the
/// bookkeeping needed downstream.
#[derive(Debug)]
pub struct GeneIndex {
    trees: HashMap<String, IntervalTree>,
    /// Rows in the matrix minus matrix genes with no interval; the
    /// population size for the hypergeometric denominators.
    pub effective_rows: usize,
    /// BED records whose gene is absent from the matrix.
    pub skipped_genes: usize,
    /// Matrix genes with no record in the BED file.
    pub missing_genes: usize,
}

impl GeneIndex {
    /// Build the index from (gene name, interval) records, keeping only
    /// genes present in `row_names`. Tree values are positions in
    /// `row_names`.
    pub fn build<I>(records: I, row_names: &[String]) -> Self
    where
        I: IntoIterator<Item = (String, GenomicInterval)>,
    {
        let index_of: HashMap<&str, usize> = row_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut per_chrom: HashMap<String, Vec<Entry>> = HashMap::new();
        let mut indexed_rows: HashSet<usize> = HashSet::new();
        let mut skipped_genes = 0;

        for (name, iv) in records {
            match index_of.get(name.as_str()) {
                Some(&row) => {
                    per_chrom.entry(iv.chrom).or_default().push(Entry {
                        start: iv.start,
                        end: iv.end,
                        row,
                    });
                    indexed_rows.insert(row);
                }
                None => skipped_genes += 1,
            }
        }

        let missing_genes = row_names.len() - indexed_rows.len();
        let trees = per_chrom
            .into_iter()
            .map(|(chrom, entries)| (chrom, IntervalTree::build(entries)))
            .collect();

        GeneIndex {
            trees,
            effective_rows: row_names.len() - missing_genes,
            skipped_genes,
            missing_genes,
        }
    }

    /// Row indices of all genes intersecting `[start, end]` on `chrom`.
    pub fn overlapping(&self, chrom: &str, start: u64, end: u64) -> Vec<usize> {
        let mut hits = Vec::new();
        if let Some(tree) = self.trees.get(chrom) {
            tree.overlapping(start, end, &mut hits);
        }
        hits
    }
}
