//! snpsea-io: File-format parsers for SNPSEA-RS
//!
//! Reads the three input shapes the engine consumes: GCT gene-by-condition
//! matrices, BED4 interval files, and single-column identifier lists.
//! Every reader accepts gzip-compressed files keyed on the `.gz` extension.

pub mod bed;
pub mod gct;
pub mod names;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

/// Open a text file for buffered line reading, transparently
/// decompressing when the path ends in `.gz`.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open input file: {}", path.display()))?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
