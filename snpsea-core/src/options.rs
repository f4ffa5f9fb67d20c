//! Run parameters.
//!
//! Collected once from the CLI, validated before any output is
//! written, echoed to `args.txt` in `--flag value` lines, and
//! re-parseable from that file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::error::SnpseaError;
use crate::score::Method;

/// Where the user SNP set comes from: a list file, or `randomN` for
/// `N` random draws from the null pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSnpSource {
    File(PathBuf),
    Random(usize),
}

/// All parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// SNP list path, or `randomN`.
    pub snps: String,
    pub gene_matrix: PathBuf,
    pub gene_intervals: PathBuf,
    pub snp_intervals: PathBuf,
    pub null_snps: PathBuf,
    pub condition: Option<PathBuf>,
    pub out: PathBuf,
    pub score: Method,
    pub slop: u64,
    pub threads: usize,
    pub null_snpsets: u64,
    pub min_observations: u64,
    pub max_iterations: u64,
}

impl RunOptions {
    /// Classify the `--snps` argument. Anything starting with
    /// `random` is a request for random draws and must carry a
    /// positive integer suffix.
    pub fn user_source(&self) -> Result<UserSnpSource, SnpseaError> {
        match self.snps.strip_prefix("random") {
            Some(suffix) => match suffix.parse::<usize>() {
                Ok(n) if n > 0 => Ok(UserSnpSource::Random(n)),
                _ => Err(SnpseaError::InvalidParameter(format!(
                    "--snps {}: expected a file or 'randomN' with a positive N",
                    self.snps
                ))),
            },
            None => Ok(UserSnpSource::File(PathBuf::from(&self.snps))),
        }
    }

    /// Check the numeric parameters and the `--snps` form.
    pub fn validate(&self) -> Result<(), SnpseaError> {
        if self.max_iterations == 0 {
            return Err(SnpseaError::InvalidParameter(
                "--max-iterations must be positive".to_string(),
            ));
        }
        if self.min_observations >= self.max_iterations {
            return Err(SnpseaError::InvalidParameter(format!(
                "--min-observations {} must be below --max-iterations {}",
                self.min_observations, self.max_iterations
            )));
        }
        self.user_source()?;
        Ok(())
    }

    /// Echo the parameters in the `args.txt` format.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        writeln!(writer, "# snpsea-rs {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer, "--snps             {}", self.snps)?;
        writeln!(writer, "--gene-matrix      {}", self.gene_matrix.display())?;
        writeln!(writer, "--gene-intervals   {}", self.gene_intervals.display())?;
        writeln!(writer, "--snp-intervals    {}", self.snp_intervals.display())?;
        writeln!(writer, "--null-snps        {}", self.null_snps.display())?;
        if let Some(condition) = &self.condition {
            writeln!(writer, "--condition        {}", condition.display())?;
        }
        writeln!(writer, "--out              {}", self.out.display())?;
        writeln!(writer, "--score            {}", self.score)?;
        writeln!(writer, "--slop             {}", self.slop)?;
        writeln!(writer, "--threads          {}", self.threads)?;
        writeln!(writer, "--null-snpsets     {}", self.null_snpsets)?;
        writeln!(writer, "--min-observations {}", self.min_observations)?;
        writeln!(writer, "--max-iterations   {}", self.max_iterations)?;
        Ok(())
    }

    /// Parse an `args.txt` back into options.
    pub fn parse(text: &str) -> Result<RunOptions> {
        let mut snps = None;
        let mut gene_matrix = None;
        let mut gene_intervals = None;
        let mut snp_intervals = None;
        let mut null_snps = None;
        let mut condition = None;
        let mut out = None;
        let mut score = Method::Single;
        let mut slop = 250_000;
        let mut threads = 1;
        let mut null_snpsets = 10;
        let mut min_observations = 25;
        let mut max_iterations = 1000;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut it = line.split_whitespace();
            let (Some(key), Some(value)) = (it.next(), it.next()) else {
                anyhow::bail!("Malformed args line: {}", line);
            };
            match key {
                "--snps" => snps = Some(value.to_string()),
                "--gene-matrix" => gene_matrix = Some(PathBuf::from(value)),
                "--gene-intervals" => gene_intervals = Some(PathBuf::from(value)),
                "--snp-intervals" => snp_intervals = Some(PathBuf::from(value)),
                "--null-snps" => null_snps = Some(PathBuf::from(value)),
                "--condition" => condition = Some(PathBuf::from(value)),
                "--out" => out = Some(PathBuf::from(value)),
                "--score" => score = value.parse()?,
                "--slop" => slop = value.parse()?,
                "--threads" => threads = value.parse()?,
                "--null-snpsets" => null_snpsets = value.parse()?,
                "--min-observations" => min_observations = value.parse()?,
                "--max-iterations" => max_iterations = value.parse()?,
                other => anyhow::bail!("Unknown args key: {}", other),
            }
        }

        Ok(RunOptions {
            snps: snps.ok_or_else(|| anyhow::anyhow!("args missing --snps"))?,
            gene_matrix: gene_matrix.ok_or_else(|| anyhow::anyhow!("args missing --gene-matrix"))?,
            gene_intervals: gene_intervals
                .ok_or_else(|| anyhow::anyhow!("args missing --gene-intervals"))?,
            snp_intervals: snp_intervals
                .ok_or_else(|| anyhow::anyhow!("args missing --snp-intervals"))?,
            null_snps: null_snps.ok_or_else(|| anyhow::anyhow!("args missing --null-snps"))?,
            condition,
            out: out.ok_or_else(|| anyhow::anyhow!("args missing --out"))?,
            score,
            slop,
            threads,
            null_snpsets,
            min_observations,
            max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RunOptions {
        RunOptions {
            snps: "gwas_snps.txt".to_string(),
            gene_matrix: PathBuf::from("expression.gct.gz"),
            gene_intervals: PathBuf::from("genes.bed.gz"),
            snp_intervals: PathBuf::from("snps.bed.gz"),
            null_snps: PathBuf::from("null.txt"),
            condition: None,
            out: PathBuf::from("out"),
            score: Method::Single,
            slop: 250_000,
            threads: 2,
            null_snpsets: 10,
            min_observations: 25,
            max_iterations: 1000,
        }
    }

    #[test]
    fn test_args_round_trip() {
        let opts = options();
        let mut buf = Vec::new();
        opts.write_to(&mut buf).unwrap();
        let parsed = RunOptions::parse(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(parsed, opts);
    }

    #[test]
    fn test_args_round_trip_with_condition() {
        let mut opts = options();
        opts.condition = Some(PathBuf::from("conditions.txt"));
        opts.score = Method::Total;
        let mut buf = Vec::new();
        opts.write_to(&mut buf).unwrap();
        let parsed = RunOptions::parse(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(parsed, opts);
    }

    #[test]
    fn test_user_source() {
        let mut opts = options();
        assert_eq!(
            opts.user_source().unwrap(),
            UserSnpSource::File(PathBuf::from("gwas_snps.txt"))
        );

        opts.snps = "random20".to_string();
        assert_eq!(opts.user_source().unwrap(), UserSnpSource::Random(20));

        opts.snps = "random0".to_string();
        assert!(opts.user_source().is_err());

        opts.snps = "randomx".to_string();
        assert!(opts.user_source().is_err());
    }

    #[test]
    fn test_validate_iteration_bounds() {
        let mut opts = options();
        opts.min_observations = 1000;
        assert!(matches!(
            opts.validate(),
            Err(SnpseaError::InvalidParameter(_))
        ));

        opts.min_observations = 0;
        assert!(opts.validate().is_ok());

        opts.max_iterations = 0;
        assert!(opts.validate().is_err());
    }
}
