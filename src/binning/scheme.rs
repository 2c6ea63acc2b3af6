use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Spacing – the law that places bin edges between lo and hi
// ---------------------------------------------------------------------------

/// Bin-edge spacing law.
///
/// Every law is a monotone map `f` from multipole space into a space where
/// the edges are equally spaced. Edges and centers are both computed in that
/// space and mapped back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    /// Equally spaced in `l`.
    #[default]
    Linear,
    /// Equally spaced in `ln l`. Requires `lo > 0`.
    Log,
    /// Equally spaced in `log10 l`. Requires `lo > 0`.
    Log10,
    /// `edge_i = lo + (i * sqrt(hi - lo) / n)^2`.
    P2,
    /// `edge_i = lo + (i * cbrt(hi - lo) / n)^3`.
    P3,
}

impl Spacing {
    pub const ALL: [Spacing; 5] = [
        Spacing::Linear,
        Spacing::Log,
        Spacing::Log10,
        Spacing::P2,
        Spacing::P3,
    ];

    /// Selector string as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Spacing::Linear => "linear",
            Spacing::Log => "log",
            Spacing::Log10 => "log10",
            Spacing::P2 => "p2",
            Spacing::P3 => "p3",
        }
    }

    fn requires_positive_lower_bound(self) -> bool {
        matches!(self, Spacing::Log | Spacing::Log10)
    }

    /// Map a multipole into the equally spaced space of this law.
    fn forward(self, x: f64, lo: f64) -> f64 {
        match self {
            Spacing::Linear => x,
            Spacing::Log => x.ln(),
            Spacing::Log10 => x.log10(),
            Spacing::P2 => (x - lo).max(0.0).sqrt(),
            Spacing::P3 => (x - lo).max(0.0).cbrt(),
        }
    }

    fn inverse(self, t: f64, lo: f64) -> f64 {
        match self {
            Spacing::Linear => t,
            Spacing::Log => t.exp(),
            Spacing::Log10 => 10f64.powf(t),
            Spacing::P2 => lo + t * t,
            Spacing::P3 => lo + t * t * t,
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Spacing {
    type Err = SpectraError;

    /// An empty selector means the default (linear) spacing.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "linear" => Ok(Spacing::Linear),
            "log" => Ok(Spacing::Log),
            "log10" => Ok(Spacing::Log10),
            "p2" => Ok(Spacing::P2),
            "p3" => Ok(Spacing::P3),
            other => Err(SpectraError::invalid(
                "spacing",
                format!("unknown selector '{other}' (expected linear, log, log10, p2 or p3)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// BinEdges – output of the scheme
// ---------------------------------------------------------------------------

/// Bin boundaries and representative centers in multipole space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinEdges {
    /// `num_bins + 1` strictly increasing boundaries.
    pub edges: Vec<f64>,
    /// One center per bin, `edges[i] <= centers[i] <= edges[i + 1]`.
    pub centers: Vec<f64>,
}

impl BinEdges {
    pub fn num_bins(&self) -> usize {
        self.centers.len()
    }

    /// Lower and upper boundary of bin `i`.
    pub fn bounds(&self, i: usize) -> (f64, f64) {
        (self.edges[i], self.edges[i + 1])
    }
}

/// Compute `num_bins + 1` edges over `[lo, hi]` and the center of each bin.
pub fn binning(num_bins: usize, range: (i64, i64), spacing: Spacing) -> Result<BinEdges> {
    let (lo, hi) = range;
    if num_bins == 0 {
        return Err(SpectraError::invalid("num_bins", "must be at least 1"));
    }
    if lo >= hi {
        return Err(SpectraError::invalid(
            "edge_range",
            format!("lower bound {lo} must be below upper bound {hi}"),
        ));
    }
    if spacing.requires_positive_lower_bound() && lo <= 0 {
        return Err(SpectraError::Domain {
            name: "edge_range.lo",
            value: lo as f64,
            reason: "logarithmic spacing needs a positive lower bound",
        });
    }

    let (lo, hi) = (lo as f64, hi as f64);
    let t_lo = spacing.forward(lo, lo);
    let step = (spacing.forward(hi, lo) - t_lo) / num_bins as f64;

    let mut edges: Vec<f64> = (0..=num_bins)
        .map(|i| spacing.inverse(t_lo + step * i as f64, lo))
        .collect();
    // exp/powf round-trips are not exact at the endpoints
    edges[0] = lo;
    edges[num_bins] = hi;

    if let Some(i) = edges.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SpectraError::invalid(
            "num_bins",
            format!(
                "{num_bins} bins collapse edges {i} and {} in floating point",
                i + 1
            ),
        ));
    }

    let centers = edges
        .windows(2)
        .map(|w| {
            let mid = 0.5 * (spacing.forward(w[0], lo) + spacing.forward(w[1], lo));
            spacing.inverse(mid, lo).clamp(w[0], w[1])
        })
        .collect();

    debug!("{spacing} binning of [{lo}, {hi}] into {num_bins} bins: {edges:?}");
    Ok(BinEdges { edges, centers })
}

// ---------------------------------------------------------------------------
// BinningConfig – serializable request for a binning
// ---------------------------------------------------------------------------

/// A complete binning request, loadable from a JSON config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    pub num_bins: usize,
    pub l_min: usize,
    pub l_max: usize,
    pub spacing: Spacing,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            num_bins: 10,
            l_min: 2,
            l_max: 2000,
            spacing: Spacing::Linear,
        }
    }
}

impl BinningConfig {
    pub fn edges(&self) -> Result<BinEdges> {
        binning(
            self.num_bins,
            (self.l_min as i64, self.l_max as i64),
            self.spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_quarters() {
        let b = binning(4, (2, 100), Spacing::Linear).unwrap();
        assert_eq!(b.edges, vec![2.0, 26.5, 51.0, 75.5, 100.0]);
        assert_eq!(b.centers, vec![14.25, 38.75, 63.25, 87.75]);
    }

    #[test]
    fn log_centers_are_geometric_means() {
        let b = binning(2, (10, 1000), Spacing::Log10).unwrap();
        assert_relative_eq!(b.edges[1], 100.0, max_relative = 1e-12);
        for (i, c) in b.centers.iter().enumerate() {
            let (lo, hi) = b.bounds(i);
            assert_relative_eq!(*c, (lo * hi).sqrt(), max_relative = 1e-12);
        }
    }

    #[test]
    fn p2_edges_follow_square_law() {
        let b = binning(4, (0, 16), Spacing::P2).unwrap();
        assert_eq!(b.edges, vec![0.0, 1.0, 4.0, 9.0, 16.0]);
        // mean of sqrt(0) and sqrt(1) is 0.5 -> 0.25
        assert_relative_eq!(b.centers[0], 0.25);
    }

    #[test]
    fn p3_edges_follow_cube_law() {
        let b = binning(2, (1, 9), Spacing::P3).unwrap();
        assert_relative_eq!(b.edges[1], 2.0, max_relative = 1e-12);
        assert_eq!(b.edges[2], 9.0);
    }

    #[test]
    fn selectors_parse() {
        assert_eq!("".parse::<Spacing>().unwrap(), Spacing::Linear);
        for s in Spacing::ALL {
            assert_eq!(s.name().parse::<Spacing>().unwrap(), s);
        }
        assert!(matches!(
            "cubic".parse::<Spacing>(),
            Err(SpectraError::InvalidArgument { name: "spacing", .. })
        ));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: BinningConfig = serde_json::from_str(r#"{"spacing": "log10"}"#).unwrap();
        assert_eq!(cfg.spacing, Spacing::Log10);
        assert_eq!(cfg.num_bins, 10);
        assert_eq!(cfg.edges().unwrap().num_bins(), 10);
    }
}
