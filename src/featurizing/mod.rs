//! Per-EIC feature extraction: the same regress -> validate -> merge pipeline
//! as centroiding, run along the retention-time axis of one EIC. Fanned out
//! across EICs the same way centroiding fans out across spectra.

use rayon::prelude::*;

use crate::model::bin::EIC;
use crate::model::feature::FeaturePeak;
use crate::model::raw::RawPoint;
use crate::model::regression::ValidRegression;
use crate::regress::kernel::{LogBuffer, MAX_SCALE, regress};
use crate::regress::merger::{merge_across_scales, merge_within_scale};
use crate::regress::validator::{area_dqs, validate};
use crate::stats::t_critical;

fn max_scale_for(n: usize) -> usize {
    if n < 3 {
        0
    } else {
        ((n - 1) / 2).min(MAX_SCALE)
    }
}

fn eic_points(eic: &EIC) -> Vec<RawPoint> {
    eic.int
        .iter()
        .zip(eic.df.iter())
        .map(|(&intensity, &measured)| RawPoint {
            mz: 0.0,
            intensity: intensity.max(1e-9),
            df: measured,
        })
        .collect()
}

/// Intensity-weighted mean over `[left, right]`, dividing weights by their
/// mean first for numerical stability, per spec.
fn weighted_mean(values: &[f64], weights: &[f64], left: usize, right: usize) -> f64 {
    let slice_w = &weights[left..=right];
    let mean_w = slice_w.iter().sum::<f64>() / slice_w.len() as f64;
    if mean_w <= 0.0 {
        return values[left..=right].iter().sum::<f64>() / (right - left + 1) as f64;
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for (j, idx) in (left..=right).enumerate() {
        let w = slice_w[j] / mean_w;
        num += w * values[idx];
        den += w;
    }
    num / den
}

/// Intensity-weighted mean and variance over `[left, right]`, the
/// `weightedMeanAndVariance` the original assigns to `peak.mz`/`peak.mzUncertainty`.
fn weighted_mean_and_variance(values: &[f64], weights: &[f64], left: usize, right: usize) -> (f64, f64) {
    let slice_w = &weights[left..=right];
    let mean_w = slice_w.iter().sum::<f64>() / slice_w.len() as f64;
    if mean_w <= 0.0 {
        let n = (right - left + 1) as f64;
        let mean = values[left..=right].iter().sum::<f64>() / n;
        let var = values[left..=right].iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        return (mean, var);
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for (j, idx) in (left..=right).enumerate() {
        let w = slice_w[j] / mean_w;
        num += w * values[idx];
        den += w;
    }
    let mean = num / den;
    let mut var_num = 0.0;
    for (j, idx) in (left..=right).enumerate() {
        let w = slice_w[j] / mean_w;
        var_num += w * (values[idx] - mean).powi(2);
    }
    (mean, var_num / den)
}

fn produce_feature(v: &ValidRegression, eic: &EIC) -> Option<FeaturePeak> {
    let apex = v.apex_position;
    let floor_idx = apex.floor().max(0.0) as usize;
    let ceil_idx = (floor_idx + 1).min(eic.rt.len() - 1);
    let frac = apex - floor_idx as f64;
    let rt = eic.rt[floor_idx] + (eic.rt[ceil_idx] - eic.rt[floor_idx]) * frac;
    let d_rt = eic.rt[ceil_idx] - eic.rt[floor_idx];

    let apex_local = apex - v.index_x0 as f64;
    let exp_b0 = v.coeffs.b0.exp();
    let height = (v.coeffs.b0 + apex_local * v.coeffs.b1 / 2.0).exp();
    let height_u = height * v.u_height;
    let area = v.area * exp_b0;
    let area_u = v.u_area * exp_b0;
    let rt_u = v.u_pos * d_rt.abs() * t_critical(v.df + 1) * (1.0 + 1.0 / (v.df as f64 + 4.0)).sqrt();
    let dqs_peak = area_dqs(v.u_area, v.area);

    let (mz, mz_u) = weighted_mean_and_variance(&eic.mz, &eic.int, v.left_limit, v.right_limit);
    let dqs_cen = weighted_mean(&eic.dqs_cen, &eic.int, v.left_limit, v.right_limit);
    let dqs_bin = weighted_mean(&eic.dqs_bin, &eic.int, v.left_limit, v.right_limit);

    if !(area > 0.0 && height > 0.0 && rt_u > 0.0 && mz_u > 0.0) {
        return None;
    }

    Some(FeaturePeak {
        mz,
        mz_u,
        rt,
        rt_u,
        area,
        area_u,
        height,
        height_u,
        dqs_cen: dqs_cen.clamp(0.0, 1.0),
        dqs_bin: dqs_bin.clamp(0.0, 1.0),
        dqs_peak: dqs_peak.clamp(0.0, 1.0),
        peak_start: v.left_limit,
        peak_end: v.right_limit,
    })
}

pub fn extract_features(eic: &EIC) -> Vec<FeaturePeak> {
    let max_scale = max_scale_for(eic.len());
    if max_scale == 0 {
        return Vec::new();
    }
    let points = eic_points(eic);
    let intensities: Vec<f64> = points.iter().map(|p| p.intensity).collect();
    let log_buf = LogBuffer::from_intensities(&intensities);
    let ylog = log_buf.as_slice();

    let mut by_scale = Vec::with_capacity(max_scale);
    for scale in 1..=max_scale {
        let candidates = regress(ylog, scale);
        let valid: Vec<ValidRegression> = candidates
            .iter()
            .filter_map(|c| validate(c, &points))
            .collect();
        by_scale.push(merge_within_scale(valid, &points));
    }
    let survivors = merge_across_scales(by_scale, &points);
    let mut peaks: Vec<FeaturePeak> = survivors
        .iter()
        .filter_map(|v| produce_feature(v, eic))
        .collect();
    peaks.sort_by(|a, b| a.rt.partial_cmp(&b.rt).unwrap());
    peaks
}

/// Fans feature extraction out across EICs.
pub fn extract_all(eics: &[EIC], cores: usize) -> Vec<Vec<FeaturePeak>> {
    if cores <= 1 || eics.len() < 2 {
        return eics.iter().map(extract_features).collect();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build()
        .expect("failed to build feature-extraction thread pool");
    pool.install(|| eics.par_iter().map(extract_features).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_eic(n: usize, mu: f64, sigma: f64, amp: f64) -> EIC {
        let rt: Vec<f64> = (0..n).map(|i| i as f64 * 2.0).collect();
        let int: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64;
                (amp * (-0.5 * ((x - mu) / sigma).powi(2)).exp()).max(1e-6)
            })
            .collect();
        // Small per-scan m/z jitter, as real centroided columns have, so the
        // weighted variance isn't exactly zero.
        let mz: Vec<f64> = (0..n)
            .map(|i| 100.0 + 1e-4 * ((i % 3) as f64 - 1.0))
            .collect();
        EIC {
            rt,
            int,
            mz,
            df: vec![true; n],
            dqs_cen: vec![0.95; n],
            dqs_bin: vec![0.9; n],
            mean_mz: 100.0,
            mean_error: 0.0001,
        }
    }

    // An isolated chromatographic peak produces at least one feature near
    // the expected retention time.
    #[test]
    fn isolated_eic_peak_is_extracted() {
        let eic = gaussian_eic(41, 20.0, 2.0, 1.0e6);
        let peaks = extract_features(&eic);
        assert!(!peaks.is_empty());
        let best = peaks
            .iter()
            .max_by(|a, b| a.dqs_peak.partial_cmp(&b.dqs_peak).unwrap())
            .unwrap();
        assert!((best.rt - 40.0).abs() < 8.0);
    }
}
