//! Tests for map variance moments.

use std::f64::consts::PI;

use approx::assert_relative_eq;

use cmb_spectra::map_vars;

fn toy_spectrum(l_max: usize) -> Vec<f64> {
    (0..=l_max)
        .map(|l| if l == 0 { 0.0 } else { 1.0 / (l * (l + 1)) as f64 })
        .collect()
}

#[test]
fn test_zero_spectrum_has_zero_moments() {
    let m = map_vars(1000, &vec![0.0; 1001]).unwrap();
    assert_eq!(m.variance, 0.0);
    assert_eq!(m.derivative_variance, 0.0);
}

#[test]
fn test_moments_are_linear() {
    let cl = toy_spectrum(500);
    let base = map_vars(500, &cl).unwrap();
    for a in [-2.0, 0.5, 3.0e4] {
        let scaled: Vec<f64> = cl.iter().map(|c| a * c).collect();
        let m = map_vars(500, &scaled).unwrap();
        assert_relative_eq!(m.variance, a * base.variance, max_relative = 1e-12);
        assert_relative_eq!(
            m.derivative_variance,
            a * base.derivative_variance,
            max_relative = 1e-12
        );
    }
}

/// With Cl = 1/(l(l+1)), the derivative sum collapses to Σ(2l+1) = l_max² + 2 l_max.
#[test]
fn test_derivative_variance_closed_form() {
    let l_max = 300;
    let m = map_vars(l_max, &toy_spectrum(l_max)).unwrap();
    let expected = (l_max * l_max + 2 * l_max) as f64 / (4.0 * PI);
    assert_relative_eq!(m.derivative_variance, expected, max_relative = 1e-12);
}

#[test]
fn test_only_first_l_max_entries_used() {
    let mut cl = toy_spectrum(50);
    let m = map_vars(20, &cl).unwrap();
    cl[30] = f64::INFINITY;
    let again = map_vars(20, &cl).unwrap();
    assert_eq!(m, again);
}

#[test]
fn test_infinity_propagates() {
    let mut cl = toy_spectrum(10);
    cl[4] = f64::INFINITY;
    let m = map_vars(10, &cl).unwrap();
    assert!(m.variance.is_infinite());
}
