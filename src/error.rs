use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SpectraError – every failure the library can report
// ---------------------------------------------------------------------------

/// Errors raised by binning, spectrum reading and moment computation.
///
/// Every variant carries enough context (argument name, offending value or
/// file line) to diagnose the failure without re-running the call.
#[derive(Debug, Error)]
pub enum SpectraError {
    /// Bad selector, zero bin count, zero-width range or mismatched lengths.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// A value lies outside the domain of the requested spacing law.
    #[error("domain error for `{name}` = {value}: {reason}")]
    Domain {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Malformed or incomplete spectrum file. `line` is 1-based, 0 when the
    /// problem is not tied to a single line.
    #[error("format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// A bin that contains no integer multipole.
    #[error("bin {bin} spanning [{lo}, {hi}) contains no integer multipole")]
    EmptyBin { bin: usize, lo: f64, hi: f64 },

    #[error("cannot read spectrum file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpectraError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SpectraError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        SpectraError::Format {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;
