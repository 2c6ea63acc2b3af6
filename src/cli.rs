//! Command-line definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Deserialize;

use cmb_spectra::{
    bin_bundle, load_bundle, map_vars, BinEdges, BinningConfig, ReadOptions, Spacing,
    SpectrumBundle,
};

use crate::output::{OutputFormat, Table};

/// Bin, inspect and summarise CMB angular power spectra.
#[derive(Parser, Debug)]
#[command(name = "cmb-spectra", version)]
#[command(after_help = "\
Examples:
  cmb-spectra edges --bins 4 --lmin 2 --lmax 100
  cmb-spectra moments lensedCls.dat --lmax 3000 --bmode
  cmb-spectra bin scalCls.dat --bins 20 --lmax 2000 --spacing log10 -f json")]
pub struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// JSON config file providing `binning` and `read` defaults
    #[arg(long, global = true, env = "CMB_SPECTRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "csv")]
    pub format: OutputFormat,

    /// Output file path (default: stdout)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print bin edges and centers
    Edges {
        #[command(flatten)]
        bins: BinArgs,
    },

    /// Map variance and derivative variance of every spectrum in a file
    Moments {
        /// CAMB spectrum file
        file: PathBuf,
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Bin every spectrum in a file
    Bin {
        /// CAMB spectrum file
        file: PathBuf,
        #[command(flatten)]
        bins: BinArgs,
        #[command(flatten)]
        read: ReadArgs,
    },
}

#[derive(Args, Debug)]
pub struct RangeArgs {
    /// Lowest multipole
    #[arg(long)]
    pub lmin: Option<usize>,

    /// Highest multipole
    #[arg(long)]
    pub lmax: Option<usize>,
}

#[derive(Args, Debug)]
pub struct BinArgs {
    /// Number of bins
    #[arg(long)]
    pub bins: Option<usize>,

    /// Edge spacing: linear, log, log10, p2, p3
    #[arg(long)]
    pub spacing: Option<Spacing>,

    #[command(flatten)]
    pub range: RangeArgs,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Number of leading spectrum columns to read
    #[arg(long)]
    pub spectra: Option<usize>,

    /// File uses the TT, EE, BB, TE column layout
    #[arg(long, overrides_with = "no_bmode")]
    pub bmode: bool,

    /// File uses the TT, EE, TE, dd, Td, Ed column layout
    #[arg(long, overrides_with = "bmode")]
    pub no_bmode: bool,

    /// Values are raw Cl rather than l(l+1)Cl/2π
    #[arg(long, overrides_with = "no_raw")]
    pub raw: bool,

    /// Values are l(l+1)Cl/2π and are divided back to Cl
    #[arg(long, overrides_with = "raw")]
    pub no_raw: bool,
}

/// Defaults read from `--config`; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub binning: BinningConfig,
    pub read: ReadOptions,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

impl RangeArgs {
    fn apply(&self, cfg: &mut BinningConfig) {
        if let Some(l) = self.lmin {
            cfg.l_min = l;
        }
        if let Some(l) = self.lmax {
            cfg.l_max = l;
        }
    }
}

impl BinArgs {
    fn resolve(&self, base: &BinningConfig) -> BinningConfig {
        let mut cfg = base.clone();
        self.range.apply(&mut cfg);
        if let Some(n) = self.bins {
            cfg.num_bins = n;
        }
        if let Some(s) = self.spacing {
            cfg.spacing = s;
        }
        cfg
    }
}

impl ReadArgs {
    fn resolve(&self, base: &ReadOptions) -> ReadOptions {
        ReadOptions {
            num_spectra: self.spectra.unwrap_or(base.num_spectra),
            b_mode: flag_pair(self.bmode, self.no_bmode).unwrap_or(base.b_mode),
            l_squared: flag_pair(self.raw, self.no_raw).map_or(base.l_squared, |raw| !raw),
        }
    }
}

/// `Some(true)` for `--x`, `Some(false)` for `--no-x`, `None` when neither
/// was given. clap keeps only the last of the two.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub fn run(cli: Cli) -> Result<()> {
    let config = FileConfig::load(cli.config.as_deref())?;

    let table = match &cli.command {
        Commands::Edges { bins } => {
            let cfg = bins.resolve(&config.binning);
            let edges = cfg.edges().context("computing bin edges")?;
            edges_table(&edges)
        }
        Commands::Moments { file, range, read } => {
            let mut cfg = config.binning.clone();
            range.apply(&mut cfg);
            let bundle = read_file(file, &cfg, &read.resolve(&config.read))?;
            moments_table(&bundle)?
        }
        Commands::Bin { file, bins, read } => {
            let cfg = bins.resolve(&config.binning);
            let edges = cfg.edges().context("computing bin edges")?;
            let bundle = read_file(file, &cfg, &read.resolve(&config.read))?;
            let binned = bin_bundle(&edges.edges, &bundle)
                .with_context(|| format!("binning {}", file.display()))?;
            binned_table(&edges, &bundle, &binned)
        }
    };

    info!("writing {} rows as {:?}", table.len(), cli.format);
    table.write(cli.format, cli.output.as_deref())
}

fn read_file(path: &Path, cfg: &BinningConfig, opts: &ReadOptions) -> Result<SpectrumBundle> {
    let bundle = load_bundle(path, cfg.l_min, cfg.l_max, opts)
        .with_context(|| format!("loading {}", path.display()))?;
    info!(
        "loaded {} spectra over [{}, {}] from {}",
        bundle.len(),
        cfg.l_min,
        cfg.l_max,
        path.display()
    );
    Ok(bundle)
}

fn edges_table(edges: &BinEdges) -> Table {
    let mut table = Table::new("bin", ["l_lo", "l_hi", "l_center"]);
    for (i, c) in edges.centers.iter().enumerate() {
        let (lo, hi) = edges.bounds(i);
        table.push(i.to_string(), vec![lo, hi, *c]);
    }
    table
}

fn moments_table(bundle: &SpectrumBundle) -> Result<Table> {
    let mut table = Table::new("spectrum", ["variance", "derivative_variance"]);
    for (kind, row) in bundle.kinds().iter().zip(bundle.rows()) {
        let m = map_vars(bundle.l_max(), row).with_context(|| format!("moments of {kind}"))?;
        table.push(kind.to_string(), vec![m.variance, m.derivative_variance]);
    }
    Ok(table)
}

fn binned_table(edges: &BinEdges, bundle: &SpectrumBundle, binned: &[Vec<f64>]) -> Table {
    let columns = ["l_lo", "l_hi", "l_center"]
        .into_iter()
        .map(str::to_string)
        .chain(bundle.kinds().iter().map(|k| k.to_string()));
    let mut table = Table::new("bin", columns);
    for (i, c) in edges.centers.iter().enumerate() {
        let (lo, hi) = edges.bounds(i);
        let mut row = vec![lo, hi, *c];
        row.extend(binned.iter().map(|b| b[i]));
        table.push(i.to_string(), row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cmb_spectra::SpectrumKind;
    use std::f64::consts::PI;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "cmb-spectra",
            "bin",
            "cls.dat",
            "--bins",
            "5",
            "--spacing",
            "p2",
            "--raw",
        ]);
        let Commands::Bin { bins, read, .. } = cli.command else {
            panic!("expected bin subcommand");
        };
        let cfg = bins.resolve(&BinningConfig::default());
        assert_eq!(cfg.num_bins, 5);
        assert_eq!(cfg.spacing, Spacing::P2);
        assert_eq!(cfg.l_min, 2);
        let opts = read.resolve(&ReadOptions::default());
        assert!(!opts.l_squared);
        assert!(!opts.b_mode);
    }

    #[test]
    fn negated_flags_override_config() {
        let base = ReadOptions {
            num_spectra: 4,
            b_mode: true,
            l_squared: false,
        };
        let cli = Cli::parse_from(["cmb-spectra", "moments", "cls.dat", "--no-bmode", "--no-raw"]);
        let Commands::Moments { read, .. } = cli.command else {
            panic!("expected moments subcommand");
        };
        let opts = read.resolve(&base);
        assert!(!opts.b_mode);
        assert!(opts.l_squared);

        // without flags the config stands, and the last of a pair wins
        let cli = Cli::parse_from(["cmb-spectra", "moments", "cls.dat", "--raw", "--no-raw"]);
        let Commands::Moments { read, .. } = cli.command else {
            panic!("expected moments subcommand");
        };
        let opts = read.resolve(&base);
        assert!(opts.b_mode);
        assert!(opts.l_squared);
    }

    fn csv_text(table: &Table) -> String {
        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn binned_table_has_bounds_then_one_column_per_spectrum() {
        let bundle = SpectrumBundle::new(
            vec![SpectrumKind::TT, SpectrumKind::EE],
            vec![vec![0.0, 0.0, 1.0, 1.0, 1.0], vec![0.0, 0.0, 2.0, 2.0, 2.0]],
            2,
            4,
        )
        .unwrap();
        let edges = cmb_spectra::binning(2, (2, 4), Spacing::Linear).unwrap();
        let binned = bin_bundle(&edges.edges, &bundle).unwrap();
        let table = binned_table(&edges, &bundle, &binned);
        assert_eq!(
            csv_text(&table),
            "bin,l_lo,l_hi,l_center,TT,EE\n0,2,3,2.5,1,2\n1,3,4,3.5,1,2\n"
        );
    }

    #[test]
    fn moments_table_has_one_row_per_spectrum() {
        let bundle = SpectrumBundle::new(
            vec![SpectrumKind::TT, SpectrumKind::EE],
            vec![vec![0.0, 0.0, 3.0], vec![0.0, 0.0, 0.0]],
            2,
            2,
        )
        .unwrap();
        let table = moments_table(&bundle).unwrap();
        let mut buf = Vec::new();
        table.write_json(&mut buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(parsed[0]["spectrum"], "TT");
        assert_eq!(parsed[1]["spectrum"], "EE");
        let variance = parsed[0]["variance"].as_f64().unwrap();
        let dvar = parsed[0]["derivative_variance"].as_f64().unwrap();
        assert_relative_eq!(variance, 15.0 / (4.0 * PI), max_relative = 1e-12);
        assert_relative_eq!(dvar, 90.0 / (4.0 * PI), max_relative = 1e-12);
        assert_eq!(parsed[1]["variance"], 0.0);
    }

    #[test]
    fn edges_table_has_one_row_per_bin() {
        let edges = cmb_spectra::binning(4, (2, 100), Spacing::Linear).unwrap();
        let table = edges_table(&edges);
        assert_eq!(table.len(), 4);
    }
}
