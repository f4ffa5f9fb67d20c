//! GCT gene matrix parser.
//!
//! The GCT format (Broad Institute) is:
//! ```text
//! #1.2
//! <rows>\t<cols>
//! Name\tDescription\tcol1\t...\tcolC
//! gene1\tdesc\tv11\t...\tv1C
//! ...
//! ```
//! The Description column is read and discarded. Values after the first
//! two columns may be separated by tabs or runs of whitespace.

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context, Result};
use snpsea_linalg::DenseMatrix;

/// A parsed gene-by-condition matrix with its row and column names.
#[derive(Debug, Clone)]
pub struct GctMatrix {
    /// Gene identifiers, one per matrix row, in file order.
    pub row_names: Vec<String>,
    /// Condition identifiers, one per matrix column, in file order.
    pub col_names: Vec<String>,
    /// Dense values, rows = genes, columns = conditions.
    pub values: DenseMatrix,
}

/// Parse a GCT file, optionally gzip-compressed.
pub fn read_gct(path: &Path) -> Result<GctMatrix> {
    let reader = crate::open_text(path)?;
    let mut lines = reader.lines();

    let magic = lines
        .next()
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("Empty GCT file: {}", path.display()))?;
    if !magic.starts_with("#1.2") {
        bail!("Not a GCT file (missing #1.2 header): {}", path.display());
    }

    let dims = lines
        .next()
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("Truncated GCT file: {}", path.display()))?;
    let mut it = dims.split_whitespace();
    let nrows: usize = it
        .next()
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("Line 2 of GCT file is malformed: {}", path.display()))?;
    let ncols: usize = it
        .next()
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("Line 2 of GCT file is malformed: {}", path.display()))?;
    if nrows == 0 || ncols == 0 {
        bail!("Line 2 of GCT file is malformed: {}", path.display());
    }

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("Truncated GCT file: {}", path.display()))?;
    let fields: Vec<&str> = header.split('\t').map(|s| s.trim()).collect();
    if fields.len() < 2 + ncols {
        bail!(
            "GCT header has {} fields, expected {}: {}",
            fields.len(),
            2 + ncols,
            path.display()
        );
    }
    let col_names: Vec<String> = fields[2..2 + ncols].iter().map(|s| s.to_string()).collect();

    let mut row_names = Vec::with_capacity(nrows);
    let mut data = Vec::with_capacity(nrows * ncols);

    for r in 0..nrows {
        let line = lines
            .next()
            .transpose()?
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "GCT file ended after {} of {} data rows: {}",
                    r,
                    nrows,
                    path.display()
                )
            })?;
        // Name and Description are tab-delimited; the values tolerate
        // any whitespace, matching the original reader.
        let mut cells = line.splitn(3, '\t');
        let name = cells
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("GCT row {} has no Name field", r + 4))?;
        let _description = cells.next();
        let rest = cells.next().unwrap_or("");

        let mut n_values = 0;
        for tok in rest.split_whitespace() {
            let v: f64 = tok
                .parse()
                .with_context(|| format!("Bad value '{}' in GCT row {}", tok, r + 4))?;
            data.push(v);
            n_values += 1;
        }
        if n_values != ncols {
            bail!(
                "GCT row {} has {} values, expected {}: {}",
                r + 4,
                n_values,
                ncols,
                path.display()
            );
        }
        row_names.push(name);
    }

    Ok(GctMatrix {
        row_names,
        col_names,
        values: DenseMatrix::from_row_major(nrows, ncols, &data),
    })
}
