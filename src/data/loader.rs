use std::path::Path;

use log::{debug, trace};

use super::model::{dl_to_cl, ReadOptions, SpectrumBundle};
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a CAMB-style spectrum file into `num_spectra` dense rows over
/// `[0, l_max]`.
///
/// Expected layout: whitespace-separated columns, one row per multipole in
/// ascending order, the multipole first:
///
/// ```text
///     2   1.0e3   2.1e-1   3.5e0   ...
///     3   1.1e3   2.0e-1   3.1e0   ...
/// ```
///
/// Column order after the multipole is TT, EE, TE, dd, Td, Ed, or TT, EE, BB,
/// TE when `b_mode` is set. Only the first `num_spectra` are kept. When
/// `l_squared` is set the stored values are divided by `l(l+1)/2π`.
///
/// Every multipole from `max(l_min, 2)` to `l_max` must have a row. CAMB
/// output starts at `l = 2`, so monopole and dipole rows are optional even
/// when `l_min` is 0 or 1. Index 0 is always zero. Index 1 holds the dipole
/// row when the file has one and stays zero otherwise.
pub fn read_cambcls(
    path: &Path,
    l_min: usize,
    l_max: usize,
    num_spectra: usize,
    b_mode: bool,
    l_squared: bool,
) -> Result<Vec<Vec<f64>>> {
    let opts = ReadOptions {
        num_spectra,
        b_mode,
        l_squared,
    };
    Ok(load_bundle(path, l_min, l_max, &opts)?.into_rows())
}

/// Same as [`read_cambcls`] but keeps the spectrum names.
pub fn load_bundle(
    path: &Path,
    l_min: usize,
    l_max: usize,
    opts: &ReadOptions,
) -> Result<SpectrumBundle> {
    let kinds = opts.layout().select(opts.num_spectra)?;
    let text = std::fs::read_to_string(path).map_err(|source| SpectraError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_cls(&text, l_min, l_max, opts)?;
    debug!(
        "read {} spectra ({:?}) over [{l_min}, {l_max}] from {}",
        rows.len(),
        kinds,
        path.display()
    );

    SpectrumBundle::new(kinds.to_vec(), rows, l_min, l_max)
}

// ---------------------------------------------------------------------------
// Text parsing
// ---------------------------------------------------------------------------

/// Lowest multipole a spectrum file must list when it falls inside the range.
const FIRST_REQUIRED_L: usize = 2;

/// Parse the full text of a spectrum file. Split out from the file read so
/// it can be driven from in-memory text.
pub fn parse_cls(text: &str, l_min: usize, l_max: usize, opts: &ReadOptions) -> Result<Vec<Vec<f64>>> {
    let num_spectra = opts.layout().select(opts.num_spectra)?.len();
    if l_min > l_max {
        return Err(SpectraError::invalid(
            "l_min",
            format!("{l_min} exceeds l_max {l_max}"),
        ));
    }
    let mut rows = vec![vec![0.0; l_max + 1]; num_spectra];
    let mut next_l = l_min.max(FIRST_REQUIRED_L);
    let mut last_l: Option<usize> = None;
    let mut skipped = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            trace!("line {line_no}: skipped");
            continue;
        }

        let mut fields = line.split_whitespace();
        let l = parse_multipole(fields.next().unwrap_or(""), line_no)?;
        let values = parse_values(fields, num_spectra, line_no)?;

        if let Some(prev) = last_l {
            if l <= prev {
                return Err(SpectraError::format(
                    line_no,
                    format!("multipole {l} does not follow {prev} in ascending order"),
                ));
            }
        }
        last_l = Some(l);

        if l < l_min || l > l_max {
            skipped += 1;
            continue;
        }
        // index 0 is the reserved monopole
        if l == 0 {
            continue;
        }
        if l >= FIRST_REQUIRED_L {
            if l != next_l {
                return Err(SpectraError::format(
                    line_no,
                    format!("multipole {next_l} is missing (found {l})"),
                ));
            }
            next_l += 1;
        }
        let scale = if opts.l_squared { dl_to_cl(l) } else { 1.0 };
        for (row, v) in rows.iter_mut().zip(values) {
            row[l] = v * scale;
        }
    }

    if next_l <= l_max {
        return Err(SpectraError::format(
            0,
            format!("incomplete spectrum: multipoles {next_l}..={l_max} are missing"),
        ));
    }
    if skipped > 0 {
        debug!("ignored {skipped} rows outside [{l_min}, {l_max}]");
    }
    Ok(rows)
}

/// Parse a finite float, accepting the Fortran `D` exponent marker.
fn parse_float(tok: &str) -> Option<f64> {
    let value = match tok.parse::<f64>() {
        Ok(v) => v,
        Err(_) => tok.replace(['D', 'd'], "E").parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn parse_multipole(tok: &str, line_no: usize) -> Result<usize> {
    let value = parse_float(tok).ok_or_else(|| {
        SpectraError::format(line_no, format!("multipole '{tok}' is not a number"))
    })?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(SpectraError::format(
            line_no,
            format!("multipole '{tok}' is not a non-negative integer"),
        ));
    }
    Ok(value as usize)
}

fn parse_values<'a>(
    fields: impl Iterator<Item = &'a str>,
    num_spectra: usize,
    line_no: usize,
) -> Result<Vec<f64>> {
    let values = fields
        .take(num_spectra)
        .enumerate()
        .map(|(j, tok)| {
            parse_float(tok).ok_or_else(|| {
                SpectraError::format(
                    line_no,
                    format!("column {}: '{tok}' is not a finite number", j + 2),
                )
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() < num_spectra {
        return Err(SpectraError::format(
            line_no,
            format!(
                "expected {} columns (multipole + {num_spectra} spectra), found {}",
                num_spectra + 1,
                values.len() + 1
            ),
        ));
    }
    Ok(values)
}
