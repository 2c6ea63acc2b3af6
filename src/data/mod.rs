/// Data layer: spectrum types and file loading.
///
/// Architecture:
/// ```text
///  *_cls.dat (CAMB text output)
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse rows → dense Cl over [0, l_max]
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ SpectrumBundle │  named rows sharing one multipole range
///   └────────────────┘
/// ```

pub mod loader;
pub mod model;
