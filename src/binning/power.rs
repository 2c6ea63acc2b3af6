use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use super::scheme::{binning, Spacing};
use crate::data::model::SpectrumBundle;
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Degeneracy-weighted bin averages
// ---------------------------------------------------------------------------

/// Reduce an unbinned spectrum to one value per bin.
///
/// `spectrum[k]` holds multipole `l_min + k`. Bin `i` averages the integer
/// multipoles with `edges[i] <= l < edges[i + 1]` (the last bin also takes
/// `l == edges[n]`), weighting each by its `2l + 1` modes. A bin without any
/// integer multipole inside `[l_min, l_max]` fails with
/// [`SpectraError::EmptyBin`].
pub fn power_bin(edges: &[f64], l_range: (usize, usize), spectrum: &[f64]) -> Result<Vec<f64>> {
    let (l_min, l_max) = l_range;
    validate_edges(edges)?;
    if l_min > l_max {
        return Err(SpectraError::invalid(
            "range_used",
            format!("l_min {l_min} exceeds l_max {l_max}"),
        ));
    }
    let expected = l_max - l_min + 1;
    if spectrum.len() != expected {
        return Err(SpectraError::invalid(
            "spectrum",
            format!(
                "has {} values but [{l_min}, {l_max}] spans {expected} multipoles",
                spectrum.len()
            ),
        ));
    }

    let num_bins = edges.len() - 1;
    (0..num_bins)
        .map(|i| -> Result<f64> {
            let (lo, hi) = (edges[i], edges[i + 1]);
            let last = i + 1 == num_bins;
            let (first, end) = multipoles_in(lo, hi, last, l_range)
                .ok_or(SpectraError::EmptyBin { bin: i, lo, hi })?;

            let (num, den) = (first..=end).fold((0.0, 0.0), |(num, den), l| {
                let w = (2 * l + 1) as f64;
                (num + w * spectrum[l - l_min], den + w)
            });
            Ok(num / den)
        })
        .collect()
}

/// Inclusive integer multipole range covered by `[lo, hi)` (or `[lo, hi]`
/// for the closing bin), clipped to `l_range`. `None` when empty.
fn multipoles_in(lo: f64, hi: f64, closed: bool, l_range: (usize, usize)) -> Option<(usize, usize)> {
    let start = lo.ceil().max(l_range.0 as f64);
    let end = if closed { hi.floor() } else { hi.ceil() - 1.0 };
    let end = end.min(l_range.1 as f64);
    (start <= end).then(|| (start as usize, end as usize))
}

fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(SpectraError::invalid(
            "edges",
            format!("need at least 2 edges, got {}", edges.len()),
        ));
    }
    if let Some(i) = edges.iter().position(|e| !e.is_finite()) {
        return Err(SpectraError::invalid(
            "edges",
            format!("edges[{i}] = {} is not finite", edges[i]),
        ));
    }
    if let Some(i) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SpectraError::invalid(
            "edges",
            format!(
                "not strictly increasing at index {i}: {} then {}",
                edges[i],
                edges[i + 1]
            ),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bundles and end-to-end binning
// ---------------------------------------------------------------------------

/// Bin every row of a bundle with the same edges. Rows are reduced in
/// parallel; row order of the output matches the bundle.
pub fn bin_bundle(edges: &[f64], bundle: &SpectrumBundle) -> Result<Vec<Vec<f64>>> {
    let (l_min, l_max) = (bundle.l_min(), bundle.l_max());
    bundle
        .rows()
        .par_iter()
        .zip(bundle.kinds())
        .map(|(row, kind)| -> Result<Vec<f64>> {
            let used = row.get(l_min..=l_max).ok_or_else(|| {
                SpectraError::invalid(
                    "rows",
                    format!("{kind} row has {} values, needs {}", row.len(), l_max + 1),
                )
            })?;
            power_bin(edges, (l_min, l_max), used)
        })
        .collect()
}

/// A spectrum reduced to bins, together with the bins themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedSpectrum {
    pub edges: Vec<f64>,
    pub centers: Vec<f64>,
    pub values: Vec<f64>,
}

/// Bin a dense spectrum `cl` over `[0, l_max]` into `num_bins` bins spanning
/// `[l_min, l_max]`.
pub fn cl2bcl(
    num_bins: usize,
    l_range: (usize, usize),
    cl: &[f64],
    spacing: Spacing,
) -> Result<BinnedSpectrum> {
    let (l_min, l_max) = l_range;
    if cl.len() <= l_max {
        return Err(SpectraError::invalid(
            "cl",
            format!("has {} values, needs l_max + 1 = {}", cl.len(), l_max + 1),
        ));
    }
    let bins = binning(num_bins, (l_min as i64, l_max as i64), spacing)?;
    let values = power_bin(&bins.edges, l_range, &cl[l_min..=l_max])?;
    debug!("binned [{l_min}, {l_max}] into {num_bins} {spacing} bins");

    Ok(BinnedSpectrum {
        edges: bins.edges,
        centers: bins.centers,
        values,
    })
}
