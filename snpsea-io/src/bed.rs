//! BED4 interval file parser.
//!
//! Tab- or whitespace-separated `chrom start end name` records; columns
//! past the fourth are ignored. The name column carries gene or SNP
//! identifiers that must match the other inputs.

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// One interval record from a BED file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedRecord {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub name: String,
}

/// Read all records from a BED4+ file, optionally gzip-compressed.
pub fn read_bed(path: &Path) -> Result<Vec<BedRecord>> {
    let reader = crate::open_text(path)?;
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (chrom, start, end, name) = match (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) {
            (Some(c), Some(s), Some(e), Some(n)) => (c, s, e, n),
            _ => bail!(
                "BED line {} has fewer than 4 columns: {}",
                line_num + 1,
                path.display()
            ),
        };
        let start: u64 = start.parse().with_context(|| {
            format!("Bad start coordinate on BED line {}: {}", line_num + 1, path.display())
        })?;
        let end: u64 = end.parse().with_context(|| {
            format!("Bad end coordinate on BED line {}: {}", line_num + 1, path.display())
        })?;
        records.push(BedRecord {
            chrom: chrom.to_string(),
            start,
            end,
            name: name.to_string(),
        });
    }

    Ok(records)
}
