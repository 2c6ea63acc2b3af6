//! Variance moments of a map with a given angular power spectrum.

use std::f64::consts::PI;

use serde::Serialize;

use crate::error::{Result, SpectraError};

/// Variance of a map and of its gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapMoments {
    /// `Σ (2l+1) Cl / 4π`
    pub variance: f64,
    /// `Σ (2l+1) l(l+1) Cl / 4π`
    pub derivative_variance: f64,
}

/// Sum the degeneracy-weighted moments of `cl` over `1..=l_max`.
///
/// The monopole is excluded. NaN or infinite entries propagate into the
/// result unchanged.
pub fn map_vars(l_max: usize, cl: &[f64]) -> Result<MapMoments> {
    if cl.len() <= l_max {
        return Err(SpectraError::invalid(
            "cl",
            format!("has {} values, needs l_max + 1 = {}", cl.len(), l_max + 1),
        ));
    }

    let (variance, derivative_variance) = cl[..=l_max]
        .iter()
        .enumerate()
        .skip(1)
        .fold((0.0, 0.0), |(var, dvar), (l, c)| {
            let al = l as f64;
            let w = (2.0 * al + 1.0) * c;
            (var + w, dvar + w * (al * al + al))
        });

    Ok(MapMoments {
        variance: variance / (4.0 * PI),
        derivative_variance: derivative_variance / (4.0 * PI),
    })
}
