//! Angular power spectrum tools for CMB analysis.
//!
//! The crate bins an unbinned spectrum `Cl` into a handful of multipole
//! bins, reads spectra written by CAMB, and computes the map variance and
//! derivative variance of a spectrum. Every operation is a pure function over
//! borrowed slices; the only I/O is the single read in [`read_cambcls`].
//!
//! The four entry points mirror the call surface scripting layers use:
//!
//! * [`binning`] – bin edges and centers for one of five spacing laws
//! * [`read_cambcls`] – dense spectra from a CAMB `*_cls.dat` file
//! * [`map_vars`] – variance and derivative variance of a spectrum
//! * [`cl2bcl`] – edges followed by the weighted reduction, end to end

pub mod binning;
pub mod data;
pub mod error;
pub mod moments;

pub use binning::power::{bin_bundle, cl2bcl, power_bin, BinnedSpectrum};
pub use binning::scheme::{binning, BinEdges, BinningConfig, Spacing};
pub use data::loader::{load_bundle, parse_cls, read_cambcls};
pub use data::model::{ColumnLayout, ReadOptions, SpectrumBundle, SpectrumKind};
pub use error::{Result, SpectraError};
pub use moments::{map_vars, MapMoments};
