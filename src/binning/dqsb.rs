use crate::model::bin::Bin;
use crate::model::centroid::CentroidedData;
use super::context::BinningContext;
use super::split::vcrit;

/// Mean m/z distance from each point to every other point in the bin,
/// computed in O(n) from prefix sums (the bin must already be m/z-sorted).
fn mid_values(bin: &Bin) -> Vec<f64> {
    let n = bin.len();
    if n <= 1 {
        return vec![0.0; n];
    }
    let mzs: Vec<f64> = bin.points.iter().map(|p| p.mz).collect();
    let mut prefix = vec![0.0; n + 1];
    for i in 0..n {
        prefix[i + 1] = prefix[i] + mzs[i];
    }
    (0..n)
        .map(|i| {
            let left_sum = mzs[i] * i as f64 - prefix[i];
            let right_sum = (prefix[n] - prefix[i + 1]) - mzs[i] * (n - i - 1) as f64;
            (left_sum + right_sum) / (n - 1) as f64
        })
        .collect()
}

/// Minimum outer distance: across every scan within `maxdist` of the bin's
/// scan range, the m/z distance to the nearest unbinned neighbour just
/// below `min_mz` or just above `max_mz`. `scaled` applies the Gaussian
/// scan-distance penalty from the weight table before taking the minimum.
fn min_outer_distance(bin: &Bin, data: &CentroidedData, ctx: &BinningContext, scaled: bool) -> f64 {
    let min_mz = bin.min_mz();
    let max_mz = bin.max_mz();
    let scan_lo = bin.points.iter().map(|p| p.scan).min().unwrap();
    let scan_hi = bin.points.iter().map(|p| p.scan).max().unwrap();
    let center = (scan_lo + scan_hi) / 2;

    let range_lo = scan_lo.saturating_sub(ctx.maxdist).max(1);
    let range_hi = (scan_hi + ctx.maxdist).min(data.scans.len().saturating_sub(1));

    let mut best = f64::INFINITY;
    for scan_idx in range_lo..=range_hi {
        if scan_idx >= data.scans.len() {
            continue;
        }
        let mut below = f64::NEG_INFINITY;
        let mut above = f64::INFINITY;
        for p in &data.scans[scan_idx] {
            if p.mz < min_mz && p.mz > below {
                below = p.mz;
            }
            if p.mz > max_mz && p.mz < above {
                above = p.mz;
            }
        }
        let offset = scan_idx as i64 - center as i64;
        let weight = if scaled { ctx.weight_for(offset) } else { 1.0 };
        if below.is_finite() {
            best = best.min((min_mz - below) * weight);
        }
        if above.is_finite() {
            best = best.min((above - max_mz) * weight);
        }
    }
    best
}

fn dqs_formula(mid: f64, modd: f64) -> f64 {
    let modd = if modd.is_finite() { modd } else { mid.max(1.0) * 1.0e6 };
    0.5 + (modd - mid) / (2.0 * mid.max(modd) * (1.0 + mid))
}

/// Computes `DQSB_base`/`DQSB_scaled` for one closed bin (m/z-sorted in
/// place) and the derived summary fields used by the error-code bitmask.
pub fn compute_dqsb(bin: &mut Bin, data: &CentroidedData, ctx: &BinningContext) {
    bin.sort_by_mz();
    let mid = mid_values(bin);
    let mod_base = min_outer_distance(bin, data, ctx, false);
    let mod_scaled = min_outer_distance(bin, data, ctx, true);

    bin.dqsb_base = mid.iter().map(|&m| dqs_formula(m, mod_base)).collect();
    bin.dqsb_scaled = mid.iter().map(|&m| dqs_formula(m, mod_scaled)).collect();

    let n = bin.len();
    bin.median_mz = median_mz(bin);
    let margin = 3.0 * bin.mean_error();
    bin.l_maxdist_abs = bin.min_mz() - margin;
    bin.r_maxdist_abs = bin.max_mz() + margin;

    let vcrit2 = vcrit(n + 1, bin.mean_error());
    let left_hypothetical = dqs_formula(mid[0], vcrit2);
    let right_hypothetical = dqs_formula(mid[n - 1], vcrit2);
    bin.l_maxdist_tooclose = bin.dqsb_base[0] < left_hypothetical;
    bin.r_maxdist_tooclose = bin.dqsb_base[n - 1] < right_hypothetical;
}

fn median_mz(bin: &Bin) -> f64 {
    let n = bin.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        bin.points[n / 2].mz
    } else {
        (bin.points[n / 2 - 1].mz + bin.points[n / 2].mz) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::centroid::qCentroid;

    fn make_data(clusters: &[(f64, usize, usize)]) -> CentroidedData {
        let mut data = CentroidedData::new();
        for &(mz, first_scan, count) in clusters {
            for s in first_scan..first_scan + count {
                data.push(qCentroid {
                    mz,
                    mz_error: mz * 5e-6,
                    scan: s,
                    intensity: 1000.0,
                    dqs_cen: 0.9,
                });
            }
        }
        data
    }

    // An isolated cluster's DQSB is higher than one with a close-by neighbour.
    #[test]
    fn isolated_cluster_scores_higher_than_adjacent_pair() {
        let data = make_data(&[(100.0, 1, 10), (100.05, 1, 10), (200.0, 1, 10)]);
        let ctx = BinningContext::new(6);

        let mut adjacent_bin = Bin::new(
            data.scans
                .iter()
                .flatten()
                .filter(|p| (p.mz - 100.0).abs() < 1e-6)
                .cloned()
                .collect(),
        );
        let mut isolated_bin = Bin::new(data.scans.iter().flatten().filter(|p| p.mz > 150.0).cloned().collect());

        compute_dqsb(&mut adjacent_bin, &data, &ctx);
        compute_dqsb(&mut isolated_bin, &data, &ctx);

        let adjacent_mean: f64 = adjacent_bin.dqsb_base.iter().sum::<f64>() / adjacent_bin.dqsb_base.len() as f64;
        let isolated_mean: f64 = isolated_bin.dqsb_base.iter().sum::<f64>() / isolated_bin.dqsb_base.len() as f64;
        assert!(isolated_mean > adjacent_mean);
    }
}
