use crate::model::bin::Bin;
use super::context::BinningContext;

const VCRIT_SCALE: f64 = 3.05037165842070;
const VCRIT_EXPONENT: f64 = -0.4771864667153;

/// The Chebyshev-style critical value used both for the m/z split and the
/// hot-end test (with different `cum_err` inputs).
pub fn vcrit(n: usize, cum_err: f64) -> f64 {
    if n < 2 {
        return f64::INFINITY;
    }
    VCRIT_SCALE * (n as f64).ln().powf(VCRIT_EXPONENT) * cum_err
}

/// Recursively splits a bin on m/z until every resulting segment is stable
/// under the `vcrit` cutoff. Segments shrinking below 5 points are sent to
/// `ctx.out_of_bins`. Returns m/z-stable segments (not yet scan-split).
pub fn split_mz(mut bin: Bin, ctx: &mut BinningContext) -> Vec<Bin> {
    if bin.len() < 5 {
        ctx.out_of_bins.append(&mut bin.points);
        return Vec::new();
    }
    bin.sort_by_mz();
    let n = bin.len();

    let os: Vec<f64> = (0..n - 1)
        .map(|i| (bin.points[i + 1].mz - bin.points[i].mz) * 1.0e6)
        .collect();
    let (split_idx, &max_os) = os
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .expect("bin has at least 2 points here");
    let max_val = max_os * n as f64;

    let cum_err: f64 = bin.points.iter().map(|p| p.mz_error.abs()).sum();
    let crit = vcrit(n, cum_err);

    if max_val < crit {
        return vec![bin];
    }

    let right_points = bin.points.split_off(split_idx + 1);
    let left = Bin::new(bin.points);
    let right = Bin::new(right_points);

    let mut out = split_mz(left, ctx);
    out.extend(split_mz(right, ctx));
    out
}

/// Cuts a m/z-stable segment wherever consecutive scan numbers differ by
/// more than `ctx.maxdist`. Sub-bins of fewer than 5 points are discarded to
/// `ctx.out_of_bins`; a same-scan pair sets `duplicate_scan` and increments
/// the global duplicate counter.
pub fn split_scan(mut bin: Bin, ctx: &mut BinningContext) -> Vec<Bin> {
    if bin.len() < 5 {
        ctx.out_of_bins.append(&mut bin.points);
        return Vec::new();
    }
    bin.sort_by_scan();

    let mut out = Vec::new();
    let mut start = 0usize;
    let mut duplicate_scan = false;
    for i in 1..bin.len() {
        let gap = bin.points[i].scan as i64 - bin.points[i - 1].scan as i64;
        if gap == 0 {
            duplicate_scan = true;
            ctx.duplicates_total += 1;
        }
        if gap.unsigned_abs() as usize > ctx.maxdist {
            let segment: Vec<_> = bin.points[start..i].to_vec();
            push_segment(segment, duplicate_scan, &mut out, ctx);
            start = i;
            duplicate_scan = false;
        }
    }
    let tail: Vec<_> = bin.points[start..].to_vec();
    push_segment(tail, duplicate_scan, &mut out, ctx);
    out
}

fn push_segment(points: Vec<crate::model::centroid::qCentroid>, duplicate_scan: bool, out: &mut Vec<Bin>, ctx: &mut BinningContext) {
    if points.len() < 5 {
        ctx.out_of_bins.extend(points);
        return;
    }
    let mut b = Bin::new(points);
    b.duplicate_scan = duplicate_scan;
    out.push(b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::centroid::qCentroid;

    fn pt(mz: f64, scan: usize) -> qCentroid {
        qCentroid {
            mz,
            mz_error: mz * 5e-6,
            scan,
            intensity: 1000.0,
            dqs_cen: 0.9,
        }
    }

    // Three well-separated m/z clusters split into three stable segments.
    #[test]
    fn three_clusters_split_into_three_segments() {
        let mut points = Vec::new();
        for scan in 1..=5 {
            points.push(pt(100.0 + scan as f64 * 1e-7, scan));
            points.push(pt(100.05 + scan as f64 * 1e-7, scan));
            points.push(pt(200.0 + scan as f64 * 1e-7, scan));
        }
        let mut ctx = BinningContext::new(6);
        let segments = split_mz(Bin::new(points), &mut ctx);
        assert_eq!(segments.len(), 3);
    }

    // A scan gap larger than maxdist splits one cluster into two bins.
    #[test]
    fn oversized_scan_gap_splits_into_two_bins() {
        let mut points: Vec<_> = (1..=5).map(|s| pt(100.0, s)).collect();
        points.extend((1..=5).map(|i| pt(100.0, 20 + i)));
        let mut ctx = BinningContext::new(6);
        let bins = split_scan(Bin::new(points), &mut ctx);
        assert_eq!(bins.len(), 2);
    }

    // maxdist = 0 collapses every scan-split to per-scan bins (here: none
    // survive the 5-point floor since each scan has exactly one point).
    #[test]
    fn zero_maxdist_collapses_to_per_scan_bins() {
        let points: Vec<_> = (1..=10).map(|s| pt(100.0, s)).collect();
        let mut ctx = BinningContext::new(0);
        let bins = split_scan(Bin::new(points), &mut ctx);
        assert!(bins.is_empty());
        assert_eq!(ctx.out_of_bins.len(), 10);
    }
}
