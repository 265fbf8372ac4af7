//! Per-spectrum centroiding: block -> regress -> validate -> merge -> centroid.
//! Spectra are fanned out with rayon the same way `get_peaks_from_eic.rs` fans
//! out over regions of interest; within one spectrum everything is sequential.

use rayon::prelude::*;

use crate::model::centroid::CentroidPeak;
use crate::model::raw::TreatedSpectrum;
use crate::model::regression::ValidRegression;
use crate::regress::kernel::{LogBuffer, MAX_SCALE, regress};
use crate::regress::merger::{merge_across_scales, merge_within_scale};
use crate::regress::validator::{area_dqs, validate};
use crate::stats::t_critical;

fn max_scale_for(block_len: usize) -> usize {
    if block_len < 3 {
        0
    } else {
        ((block_len - 1) / 2).min(MAX_SCALE)
    }
}

fn regress_and_validate_block(points: &[crate::model::raw::RawPoint]) -> Vec<ValidRegression> {
    let max_scale = max_scale_for(points.len());
    if max_scale == 0 {
        return Vec::new();
    }
    let intensities: Vec<f64> = points.iter().map(|p| p.intensity).collect();
    let log_buf = LogBuffer::from_intensities(&intensities);
    let ylog = log_buf.as_slice();

    let mut by_scale: Vec<Vec<ValidRegression>> = Vec::with_capacity(max_scale);
    for scale in 1..=max_scale {
        let candidates = regress(ylog, scale);
        let valid: Vec<ValidRegression> = candidates
            .iter()
            .filter_map(|c| validate(c, points))
            .collect();
        let merged = merge_within_scale(valid, points);
        by_scale.push(merged);
    }
    merge_across_scales(by_scale, points)
}

/// Converts one valid regression into a centroid peak. `raw_mz` must be the
/// same block's m/z axis the regression's apex position indexes into.
fn produce_centroid(v: &ValidRegression, scan: usize, raw_mz: &[f64]) -> Option<CentroidPeak> {
    let apex = v.apex_position;
    let floor_idx = apex.floor().max(0.0) as usize;
    let ceil_idx = (floor_idx + 1).min(raw_mz.len() - 1);
    let frac = apex - floor_idx as f64;
    let mz = raw_mz[floor_idx] + (raw_mz[ceil_idx] - raw_mz[floor_idx]) * frac;
    let dmz = raw_mz[ceil_idx] - raw_mz[floor_idx];

    let apex_local = apex - v.index_x0 as f64;
    let exp_b0 = v.coeffs.b0.exp();
    let height = (v.coeffs.b0 + apex_local * v.coeffs.b1 / 2.0).exp();
    let height_u = height * v.u_height;
    let area = v.area * exp_b0;
    let area_u = v.u_area * exp_b0;
    let mz_u = v.u_pos * dmz.abs() * t_critical(v.df + 1) * (1.0 + 1.0 / (v.df as f64 + 4.0)).sqrt();
    let dqs_cen = area_dqs(v.u_area, v.area);

    if !(area > 0.0 && height > 0.0 && mz_u > 0.0 && area.is_finite() && height.is_finite()) {
        return None;
    }

    Some(CentroidPeak {
        scan,
        mz,
        mz_u,
        area,
        area_u,
        height,
        height_u,
        dqs_cen: dqs_cen.clamp(0.0, 1.0),
    })
}

/// Centroids one spectrum, across all of its blocks, in apex order within
/// each block.
pub fn centroid_spectrum(spectrum: &TreatedSpectrum, scan: usize) -> Vec<CentroidPeak> {
    let mut out = Vec::new();
    for block in spectrum.blocks() {
        let points = &spectrum.points[block.clone()];
        if points.len() < 5 {
            continue;
        }
        let raw_mz: Vec<f64> = points.iter().map(|p| p.mz).collect();
        let survivors = regress_and_validate_block(points);
        let mut block_peaks: Vec<CentroidPeak> = survivors
            .iter()
            .filter_map(|v| produce_centroid(v, scan, &raw_mz))
            .collect();
        block_peaks.sort_by(|a, b| a.mz.partial_cmp(&b.mz).unwrap());
        out.extend(block_peaks);
    }
    out
}

/// Fans centroiding out across spectra, mirroring the
/// `ThreadPoolBuilder::new().num_threads(cores)` + `par_iter` pattern used for
/// per-EIC peak extraction.
pub fn centroid_spectra(spectra: &[(usize, TreatedSpectrum)], cores: usize) -> Vec<CentroidPeak> {
    if cores <= 1 || spectra.len() < 2 {
        return spectra
            .iter()
            .flat_map(|(scan, s)| centroid_spectrum(s, *scan))
            .collect();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores)
        .build()
        .expect("failed to build centroiding thread pool");
    pool.install(|| {
        spectra
            .par_iter()
            .flat_map(|(scan, s)| centroid_spectrum(s, *scan))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::raw::RawPoint;

    fn gaussian_spectrum(n: usize, mu: f64, sigma: f64, amp: f64) -> TreatedSpectrum {
        let points: Vec<RawPoint> = (0..n)
            .map(|i| {
                let x = i as f64;
                let y = amp * (-0.5 * ((x - mu) / sigma).powi(2)).exp();
                RawPoint::measured(x, y.max(1e-6))
            })
            .collect();
        TreatedSpectrum::new(points, vec![])
    }

    // One isolated Gaussian on a uniform grid produces a single centroid near
    // the true m/z with a high-confidence score.
    #[test]
    fn isolated_gaussian_produces_one_high_confidence_centroid() {
        let spectrum = gaussian_spectrum(41, 20.0, 2.0, 1.0e6);
        let peaks = centroid_spectrum(&spectrum, 1);
        assert!(!peaks.is_empty());
        let best = peaks
            .iter()
            .max_by(|a, b| a.dqs_cen.partial_cmp(&b.dqs_cen).unwrap())
            .unwrap();
        assert!((best.mz - 20.0).abs() < 2.0);
    }

    // A constant-intensity spectrum yields no centroids at all.
    #[test]
    fn constant_spectrum_yields_no_centroids() {
        let points: Vec<RawPoint> = (0..41).map(|i| RawPoint::measured(i as f64, 100.0)).collect();
        let spectrum = TreatedSpectrum::new(points, vec![]);
        assert!(centroid_spectrum(&spectrum, 1).is_empty());
    }

    // Fewer than five measured points in a block yields zero peaks, no panic.
    #[test]
    fn tiny_block_yields_no_peaks_without_error() {
        let points = vec![
            RawPoint::measured(1.0, 10.0),
            RawPoint::measured(2.0, 20.0),
        ];
        let spectrum = TreatedSpectrum::new(points, vec![]);
        assert!(centroid_spectrum(&spectrum, 1).is_empty());
    }
}
