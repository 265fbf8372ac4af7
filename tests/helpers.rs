/// Get one Gaussian value at x (bell curve). `base` lifts the whole curve.
#[inline]
pub fn gaussian_value(x: f64, mu: f64, sigma: f64, amp: f64, base: f64) -> f64 {
    base + amp * (-0.5 * ((x - mu) / sigma).powi(2)).exp()
}

/// Build a signal made of one or more Gaussians on an integer grid, plus a
/// constant `base`, floored above zero (log-intensity regression needs it).
pub fn gaussian_mixture(n: usize, peaks: &[(f64, f64, f64)], base: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let mut y = base;
            for &(mu, sigma, amp) in peaks {
                y += gaussian_value(x, mu, sigma, amp, 0.0);
            }
            y.max(1e-6)
        })
        .collect()
}

/// Make an even grid from start to end with n points (inclusive).
pub fn make_grid(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![start];
    }
    (0..n)
        .map(|i| start + (end - start) * (i as f64) / ((n - 1) as f64))
        .collect()
}

/// Check two numbers are close within a simple absolute tolerance.
#[allow(dead_code)]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
