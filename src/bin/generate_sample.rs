use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::prelude::*;
use rand_distr::StandardNormal;

/// Write a synthetic CAMB-layout spectrum file in l(l+1)Cl/2π units.
#[derive(Parser, Debug)]
struct Args {
    /// Highest multipole written (rows start at l = 2)
    #[arg(long, default_value_t = 2000)]
    lmax: usize,

    /// Write the TT, EE, BB, TE layout instead of TT, EE, TE, dd, Td
    #[arg(long)]
    bmode: bool,

    /// Relative noise amplitude
    #[arg(long, default_value_t = 0.01)]
    noise: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, short = 'o', default_value = "sample_cls.dat")]
    output: PathBuf,
}

/// Damped acoustic oscillation, roughly the shape of a TT `Dl`.
fn acoustic(l: f64, amplitude: f64, spacing: f64, phase: f64, damping: f64) -> f64 {
    let osc = 1.0 + 0.6 * (PI * l / spacing + phase).cos();
    amplitude * osc * (l / (l + 40.0)) * (-(l / damping).powi(2)).exp()
}

/// One row of Dl values in the requested layout.
fn row(l: usize, bmode: bool, noise: f64, rng: &mut StdRng) -> Vec<f64> {
    let al = l as f64;
    let tt = acoustic(al, 5000.0, 300.0, 0.0, 1800.0);
    let ee = acoustic(al, 40.0, 300.0, PI / 2.0, 1600.0);
    let te = 0.4 * (tt * ee).sqrt() * (PI * al / 300.0).sin();
    let mut clean = if bmode {
        let bb = 0.05 * al * al / (al * al + 1.0e6);
        vec![tt, ee, bb, te]
    } else {
        // lensing potential in CAMB's (l(l+1))^2 Cl^pp / 2π convention
        let dd = 1.0e-7 * 1.0e4 / (al + 100.0);
        let td = 1.0e-5 * (-(al / 100.0)).exp();
        vec![tt, ee, te, dd, td]
    };
    // scatter proportional to each value
    for v in &mut clean {
        let z: f64 = rng.sample(StandardNormal);
        *v += noise * v.abs() * z;
    }
    clean
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut out = BufWriter::new(file);

    for l in 2..=args.lmax {
        write!(out, "{l:>6}")?;
        for v in row(l, args.bmode, args.noise, &mut rng) {
            write!(out, " {v:>14.6E}")?;
        }
        writeln!(out)?;
    }
    out.flush().context("flushing output")?;

    info!(
        "wrote multipoles 2..={} ({} layout) to {}",
        args.lmax,
        if args.bmode { "B-mode" } else { "lensing" },
        args.output.display()
    );
    Ok(())
}
