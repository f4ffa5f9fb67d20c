//! Identifier list parser for SNP lists, null-pool lists, and
//! condition-column lists.
//!
//! Identifiers live in one tab-delimited column. Lines starting with `#`
//! are comments. Rows are scanned until a cell equals one of the known
//! header labels (`SNP`, `snp`, `name`, `marker`); that row is consumed
//! as a header and fixes the identifier column for the rest of the file.
//! Until a header is seen, the first column is treated as data, so
//! headerless files work unchanged.

use std::io::BufRead;
use std::path::Path;

use anyhow::Result;

const HEADER_LABELS: [&str; 4] = ["SNP", "snp", "name", "marker"];

/// Read identifiers from a list file, optionally gzip-compressed.
///
/// Returns identifiers in file order with duplicates removed (first
/// occurrence wins). An empty result is not an error here; callers
/// decide whether an empty list is fatal.
pub fn read_names(path: &Path) -> Result<Vec<String>> {
    let reader = crate::open_text(path)?;

    let mut names: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut found_header = false;
    let mut id_col = 0;

    for line in reader.lines() {
        let line = line?;
        let cells: Vec<String> = line
            .split('\t')
            .map(|c| c.replace([' ', '\r'], ""))
            .collect();
        if cells.is_empty() || cells[0].is_empty() {
            continue;
        }
        if cells[0].starts_with('#') {
            continue;
        }

        if !found_header {
            if let Some(col) = cells
                .iter()
                .position(|c| HEADER_LABELS.contains(&c.as_str()))
            {
                found_header = true;
                id_col = col;
                continue;
            }
        }

        if let Some(cell) = cells.get(id_col) {
            if !cell.is_empty() && seen.insert(cell.clone()) {
                names.push(cell.clone());
            }
        }
    }

    Ok(names)
}
