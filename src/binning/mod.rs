/// Multipole binning: edge placement and weighted reduction.
///
/// ```text
///   (num_bins, [lo, hi], spacing)
///        │
///        ▼
///   ┌──────────┐
///   │  scheme  │  edges + centers
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  power   │  Σ (2l+1) Cl / Σ (2l+1) per bin
///   └──────────┘
/// ```

pub mod power;
pub mod scheme;
