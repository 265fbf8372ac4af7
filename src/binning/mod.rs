pub mod context;
pub mod dqsb;
pub mod split;

pub use context::BinningContext;

use crate::model::bin::{Bin, EIC};
use crate::model::centroid::{CentroidedData, qCentroid};
use split::{split_mz, split_scan};

/// Runs one full m/z-then-scan subset pass over `bin`, pushing resulting
/// closed bins (>=5 points) into `out`.
fn subset_pass(bin: Bin, ctx: &mut BinningContext, out: &mut Vec<Bin>) {
    for segment in split_mz(bin, ctx) {
        out.extend(split_scan(segment, ctx));
    }
}

/// Partitions every centroid in `data` into closed bins: recursive m/z split,
/// scan-gap split, DQSB computation, hot-end detection, and exactly one
/// rebinning pass over the union of `out_of_bins` and any hot-end-flagged
/// bins.
pub fn bin_centroids(data: &CentroidedData, maxdist: usize) -> (Vec<Bin>, BinningContext) {
    let mut ctx = BinningContext::new(maxdist);
    let initial = Bin::new(data.all().copied().collect());

    let mut closed = Vec::with_capacity(data.total_points / 50 + 1);
    subset_pass(initial, &mut ctx, &mut closed);

    for bin in &mut closed {
        dqsb::compute_dqsb(bin, data, &ctx);
    }

    let mut kept = Vec::with_capacity(closed.len());
    let mut rebin_points = std::mem::take(&mut ctx.out_of_bins);
    for bin in closed {
        if bin.l_maxdist_tooclose || bin.r_maxdist_tooclose {
            rebin_points.extend(bin.points);
        } else {
            kept.push(bin);
        }
    }

    if !rebin_points.is_empty() {
        let mut rebinned = Vec::new();
        subset_pass(Bin::new(rebin_points), &mut ctx, &mut rebinned);
        for bin in &mut rebinned {
            dqsb::compute_dqsb(bin, data, &ctx);
        }
        kept.extend(rebinned);
    }

    (kept, ctx)
}

/// Builds an `EIC` from a closed bin, using `scan_to_rt` (indexed by scan
/// number) to convert scan numbers to retention times.
pub fn bin_to_eic(bin: &Bin, scan_to_rt: &[f64]) -> EIC {
    // `bin.dqsb_base` is aligned with `bin.points` in its current (m/z-sorted)
    // order, so pair each point with its DQSB before re-sorting by scan —
    // sorting the points alone would scramble that alignment.
    let mut paired: Vec<(qCentroid, f64)> = bin
        .points
        .iter()
        .copied()
        .zip(bin.dqsb_base.iter().copied())
        .collect();
    paired.sort_by_key(|(p, _)| p.scan);
    let n = paired.len();
    let mut eic = EIC {
        rt: Vec::with_capacity(n),
        int: Vec::with_capacity(n),
        mz: Vec::with_capacity(n),
        df: vec![true; n],
        dqs_cen: Vec::with_capacity(n),
        dqs_bin: Vec::with_capacity(n),
        mean_mz: 0.0,
        mean_error: bin.mean_error(),
    };
    for (p, dqsb) in &paired {
        let rt = scan_to_rt.get(p.scan).copied().unwrap_or(p.scan as f64);
        eic.rt.push(rt);
        eic.int.push(p.intensity);
        eic.mz.push(p.mz);
        eic.dqs_cen.push(p.dqs_cen);
        eic.dqs_bin.push(*dqsb);
    }
    eic.mean_mz = eic.mz.iter().sum::<f64>() / n.max(1) as f64;
    eic
}

/// Bin-summary error-code bitmask from SPEC_FULL.md section E: bit 0
/// duplicate scan, 1 left hot end, 2 right hot end, 3 mean/median drift, 4
/// 3-sigma window escape, 5 mean DQSB below 0.5, 6 monotonic intensity
/// profile, 7 always set.
pub fn errorcode(bin: &Bin) -> u8 {
    let mut code: u8 = 0;
    if bin.duplicate_scan {
        code |= 1 << 0;
    }
    if bin.l_maxdist_tooclose {
        code |= 1 << 1;
    }
    if bin.r_maxdist_tooclose {
        code |= 1 << 2;
    }

    let n = bin.len().max(1);
    let mean = bin.points.iter().map(|p| p.mz).sum::<f64>() / n as f64;
    let stdev = {
        let var = bin.points.iter().map(|p| (p.mz - mean).powi(2)).sum::<f64>() / n as f64;
        var.sqrt()
    };
    let mean_error = bin.mean_error();
    if (mean - bin.median_mz).abs() > 2.0 * mean_error {
        code |= 1 << 3;
    }
    if mean - 3.0 * stdev < bin.l_maxdist_abs || mean + 3.0 * stdev > bin.r_maxdist_abs {
        code |= 1 << 4;
    }
    let mean_dqsb = bin.dqsb_base.iter().sum::<f64>() / bin.dqsb_base.len().max(1) as f64;
    if mean_dqsb < 0.5 {
        code |= 1 << 5;
    }
    if is_monotonic(bin) {
        code |= 1 << 6;
    }
    code |= 1 << 7;
    code
}

fn is_monotonic(bin: &Bin) -> bool {
    let mut by_scan = bin.points.clone();
    by_scan.sort_by_key(|p| p.scan);
    let rising = by_scan.windows(2).all(|w| w[1].intensity >= w[0].intensity);
    let falling = by_scan.windows(2).all(|w| w[1].intensity <= w[0].intensity);
    rising || falling
}

pub fn mean_scans(bin: &Bin) -> f64 {
    bin.points.iter().map(|p| p.scan as f64).sum::<f64>() / bin.len().max(1) as f64
}

pub fn dqsc_min(bin: &Bin) -> f64 {
    bin.points
        .iter()
        .map(|p| p.dqs_cen)
        .fold(f64::INFINITY, f64::min)
}

pub fn mean_mz(bin: &Bin) -> f64 {
    bin.points.iter().map(|p| p.mz).sum::<f64>() / bin.len().max(1) as f64
}

pub fn stdev_mz(bin: &Bin) -> f64 {
    let mean = mean_mz(bin);
    let n = bin.len().max(1) as f64;
    (bin.points.iter().map(|p| (p.mz - mean).powi(2)).sum::<f64>() / n).sqrt()
}

pub fn mean_dqsb_scaled(bin: &Bin) -> f64 {
    bin.dqsb_scaled.iter().sum::<f64>() / bin.dqsb_scaled.len().max(1) as f64
}

pub fn mean_dqsb_base(bin: &Bin) -> f64 {
    bin.dqsb_base.iter().sum::<f64>() / bin.dqsb_base.len().max(1) as f64
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

    fn three_cluster_data() -> CentroidedData {
        let mut data = CentroidedData::new();
        for scan in 1..=10 {
            data.push(pt(100.0, scan));
            data.push(pt(100.05, scan));
            data.push(pt(200.0, scan));
        }
        data
    }

    // Three well-separated m/z clusters across ten scans close into three bins.
    #[test]
    fn three_clusters_close_into_three_bins() {
        let data = three_cluster_data();
        let (bins, _) = bin_centroids(&data, 6);
        assert_eq!(bins.len(), 3);
    }

    // A lone cluster with a scan gap bigger than maxdist splits into two bins.
    #[test]
    fn oversized_gap_splits_cluster_into_two_bins() {
        let mut data = CentroidedData::new();
        for scan in 1..=5 {
            data.push(pt(150.0, scan));
        }
        for scan in 12..=16 {
            data.push(pt(150.0, scan));
        }
        let (bins, _) = bin_centroids(&data, 6);
        assert_eq!(bins.len(), 2);
    }

    // Every closed bin's points remain sorted by scan and DQSB has one entry
    // per point.
    #[test]
    fn closed_bins_satisfy_dqsb_invariants() {
        let data = three_cluster_data();
        let (bins, _) = bin_centroids(&data, 6);
        for bin in &bins {
            assert_eq!(bin.dqsb_base.len(), bin.points.len());
            assert!(bin.min_mz() <= bin.max_mz());
        }
    }
}
