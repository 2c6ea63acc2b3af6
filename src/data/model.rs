use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// SpectrumKind – one named component of a bundle
// ---------------------------------------------------------------------------

/// A named auto- or cross-spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SpectrumKind {
    /// Temperature auto-spectrum.
    TT,
    /// E-mode polarization auto-spectrum.
    EE,
    /// B-mode polarization auto-spectrum.
    BB,
    /// Temperature / E-mode cross-spectrum.
    TE,
    /// Lensing deflection auto-spectrum.
    DD,
    /// Temperature / deflection cross-spectrum.
    TD,
    /// E-mode / deflection cross-spectrum.
    ED,
}

impl SpectrumKind {
    pub fn label(self) -> &'static str {
        match self {
            SpectrumKind::TT => "TT",
            SpectrumKind::EE => "EE",
            SpectrumKind::BB => "BB",
            SpectrumKind::TE => "TE",
            SpectrumKind::DD => "dd",
            SpectrumKind::TD => "Td",
            SpectrumKind::ED => "Ed",
        }
    }
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ColumnLayout – column order of a CAMB spectrum file
// ---------------------------------------------------------------------------

/// Column order after the leading multipole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// Scalar + lensing potential output: TT, EE, TE, dd, Td, Ed.
    Lensing,
    /// Lensed / tensor output carrying B-modes: TT, EE, BB, TE.
    BMode,
}

impl ColumnLayout {
    pub fn for_b_mode(b_mode: bool) -> Self {
        if b_mode {
            ColumnLayout::BMode
        } else {
            ColumnLayout::Lensing
        }
    }

    pub fn kinds(self) -> &'static [SpectrumKind] {
        use SpectrumKind::*;
        match self {
            ColumnLayout::Lensing => &[TT, EE, TE, DD, TD, ED],
            ColumnLayout::BMode => &[TT, EE, BB, TE],
        }
    }

    /// The first `num_spectra` kinds of this layout.
    pub fn select(self, num_spectra: usize) -> Result<&'static [SpectrumKind]> {
        let kinds = self.kinds();
        if num_spectra == 0 || num_spectra > kinds.len() {
            return Err(SpectraError::invalid(
                "num_spectra",
                format!(
                    "{num_spectra} requested, layout {self:?} provides 1 to {}",
                    kinds.len()
                ),
            ));
        }
        Ok(&kinds[..num_spectra])
    }
}

// ---------------------------------------------------------------------------
// ReadOptions – optional arguments of the reader
// ---------------------------------------------------------------------------

/// How to interpret a spectrum file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Number of leading layout columns to keep.
    pub num_spectra: usize,
    /// Use the B-mode column layout.
    pub b_mode: bool,
    /// Values in the file are `l(l+1)Cl/2π` and are converted back to `Cl`.
    pub l_squared: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            num_spectra: 4,
            b_mode: false,
            l_squared: true,
        }
    }
}

impl ReadOptions {
    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout::for_b_mode(self.b_mode)
    }
}

// ---------------------------------------------------------------------------
// Unit conversion between Cl and Dl = l(l+1)Cl/2π
// ---------------------------------------------------------------------------

/// `l(l+1)/2π`, the factor taking `Cl` to `Dl`.
pub fn cl_to_dl(l: usize) -> f64 {
    let l = l as f64;
    l * (l + 1.0) / (2.0 * PI)
}

/// `2π/(l(l+1))`, the factor taking `Dl` to `Cl`. Zero at `l = 0`, where
/// the conversion is undefined and the monopole is reserved.
pub fn dl_to_cl(l: usize) -> f64 {
    if l == 0 {
        0.0
    } else {
        1.0 / cl_to_dl(l)
    }
}

// ---------------------------------------------------------------------------
// SpectrumBundle – several spectra over one multipole range
// ---------------------------------------------------------------------------

/// Named spectra stacked along a leading axis. Every row is dense over
/// `[0, l_max]`; entries below `l_min` are zero. Fields stay private so the
/// shape checked by [`SpectrumBundle::new`] holds for every instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBundle {
    kinds: Vec<SpectrumKind>,
    rows: Vec<Vec<f64>>,
    l_min: usize,
    l_max: usize,
}

impl SpectrumBundle {
    pub fn new(
        kinds: Vec<SpectrumKind>,
        rows: Vec<Vec<f64>>,
        l_min: usize,
        l_max: usize,
    ) -> Result<Self> {
        if l_min > l_max {
            return Err(SpectraError::invalid(
                "l_min",
                format!("{l_min} exceeds l_max {l_max}"),
            ));
        }
        if kinds.len() != rows.len() {
            return Err(SpectraError::invalid(
                "rows",
                format!("{} rows for {} spectrum kinds", rows.len(), kinds.len()),
            ));
        }
        if let Some((k, row)) = kinds
            .iter()
            .zip(&rows)
            .find(|(_, row)| row.len() != l_max + 1)
        {
            return Err(SpectraError::invalid(
                "rows",
                format!("{k} row has {} values, expected {}", row.len(), l_max + 1),
            ));
        }
        Ok(Self {
            kinds,
            rows,
            l_min,
            l_max,
        })
    }

    pub fn kinds(&self) -> &[SpectrumKind] {
        &self.kinds
    }

    /// Dense rows over `[0, l_max]`, in the order of [`Self::kinds`].
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    pub fn l_min(&self) -> usize {
        self.l_min
    }

    pub fn l_max(&self) -> usize {
        self.l_max
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the bundle holds no spectra.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, kind: SpectrumKind) -> Option<&[f64]> {
        self.kinds
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.rows[i].as_slice())
    }

    /// Rescale every row from `Dl` to `Cl` in place.
    pub fn to_cl(&mut self) {
        self.rescale(dl_to_cl);
    }

    /// Rescale every row from `Cl` to `Dl` in place.
    pub fn to_dl(&mut self) {
        self.rescale(cl_to_dl);
    }

    fn rescale(&mut self, factor: fn(usize) -> f64) {
        for row in &mut self.rows {
            for (l, v) in row.iter_mut().enumerate() {
                *v *= factor(l);
            }
        }
    }
}
