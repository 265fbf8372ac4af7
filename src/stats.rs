//! Special functions and critical-value tables used throughout the regression
//! validator: `erf`/`erfc` (via `statrs`), a hand-rolled Dawson integral, and
//! lazily-cached two-sided critical values at alpha = 0.01, indexed by `df - 5`.

use std::sync::{Mutex, OnceLock};

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};
pub use statrs::function::erf::{erf, erfc};

const ALPHA: f64 = 0.01;

/// Dawson's integral `D(x) = exp(-x^2) * integral_0^x exp(t^2) dt`.
///
/// Computed by composite Simpson's rule for `|x| <= 20`; beyond that the
/// integrand overflows `f64` well before it matters to the caller (the
/// area-prefilter in the validator keeps `b1 * apex` bounded, which keeps the
/// arguments passed here in a safe range), so the asymptotic tail expansion
/// `1/(2x) + 1/(4x^3) + 3/(8x^5)` is used instead.
pub fn dawson(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let sign = x.signum();
    let ax = x.abs();
    if ax > 20.0 {
        let x2 = ax * ax;
        return sign * (1.0 / (2.0 * ax) + 1.0 / (4.0 * ax * x2) + 3.0 / (8.0 * ax * x2 * x2));
    }

    let mut intervals = ((ax / 0.01).ceil() as usize).max(2);
    if intervals % 2 == 1 {
        intervals += 1;
    }
    let h = ax / intervals as f64;
    let f = |t: f64| (t * t).exp();

    let mut sum = f(0.0) + f(ax);
    for k in 1..intervals {
        let t = k as f64 * h;
        let coeff = if k % 2 == 0 { 2.0 } else { 4.0 };
        sum += coeff * f(t);
    }
    let integral = sum * h / 3.0;
    sign * integral * (-ax * ax).exp()
}

fn t_cache() -> &'static Mutex<std::collections::HashMap<usize, f64>> {
    static CACHE: OnceLock<Mutex<std::collections::HashMap<usize, f64>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

fn chi2_cache() -> &'static Mutex<std::collections::HashMap<usize, f64>> {
    static CACHE: OnceLock<Mutex<std::collections::HashMap<usize, f64>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(std::collections::HashMap::new()))
}

/// Two-sided Student's-t critical value at alpha = 0.01 for `df` degrees of
/// freedom, cached by `df - 5` the way `INV[s]` is cached by scale.
pub fn t_critical(df: usize) -> f64 {
    let idx = df.saturating_sub(5);
    let mut cache = t_cache().lock().expect("t-table cache poisoned");
    *cache.entry(idx).or_insert_with(|| {
        let dist = StudentsT::new(0.0, 1.0, df as f64).expect("valid Student's-t df");
        dist.inverse_cdf(1.0 - ALPHA / 2.0)
    })
}

/// Lower-tail chi-squared critical value at alpha = 0.01 for `df` degrees of
/// freedom: a fit whose chi-square statistic falls below this is implausibly
/// good and is rejected by the goodness-of-fit step.
pub fn chi2_critical(df: usize) -> f64 {
    let idx = df.saturating_sub(5);
    let mut cache = chi2_cache().lock().expect("chi2-table cache poisoned");
    *cache.entry(idx).or_insert_with(|| {
        let dist = ChiSquared::new(df as f64).expect("valid chi-squared df");
        dist.inverse_cdf(ALPHA)
    })
}

/// `erfc(ratio, sign)`: the numerically stable "experfc" combinator used for
/// `dqs_cen` — `sign = -1.0` folds the uncertainty-to-value ratio through
/// `erfc` so the result lands in `[0, 1]` regardless of how small `ratio` is.
pub fn experfc(ratio: f64, sign: f64) -> f64 {
    erfc(sign * ratio / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Dawson's integral is odd and has a known maximum near x=0.924 of about 0.5410.
    #[test]
    fn dawson_is_odd_and_peaks_near_known_value() {
        assert!((dawson(0.0)).abs() < 1e-12);
        assert!((dawson(1.0) + dawson(-1.0)).abs() < 1e-9);
        let peak = dawson(0.9241388730);
        assert!((peak - 0.5410442246).abs() < 1e-4);
    }

    // t critical values shrink toward the normal z(0.995) as df grows.
    #[test]
    fn t_critical_shrinks_toward_normal_quantile() {
        let small_df = t_critical(5);
        let large_df = t_critical(500);
        assert!(small_df > large_df);
        assert!((large_df - 2.5758).abs() < 0.05);
    }

    #[test]
    fn chi2_critical_increases_with_df() {
        assert!(chi2_critical(200) > chi2_critical(10));
    }
}
