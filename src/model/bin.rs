use super::centroid::qCentroid;

/// An open or closed partition produced by binning. Holds copies of its member
/// centroids rather than raw pointers (see DESIGN.md's note on the
/// arena/indices redesign carried over from the original pointer-graph source).
#[derive(Clone, Debug, Default)]
pub struct Bin {
    pub points: Vec<qCentroid>,
    pub dqsb_base: Vec<f64>,
    pub dqsb_scaled: Vec<f64>,
    pub l_maxdist_tooclose: bool,
    pub r_maxdist_tooclose: bool,
    pub duplicate_scan: bool,
    pub median_mz: f64,
    pub l_maxdist_abs: f64,
    pub r_maxdist_abs: f64,
}

impl Bin {
    pub fn new(points: Vec<qCentroid>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn sort_by_mz(&mut self) {
        self.points
            .sort_by(|a, b| a.mz.partial_cmp(&b.mz).expect("mz must not be NaN"));
    }

    pub fn sort_by_scan(&mut self) {
        self.points.sort_by_key(|p| p.scan);
    }

    pub fn min_mz(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.mz)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_mz(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.mz)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean_error(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p.mz_error).sum::<f64>() / self.points.len() as f64
    }
}

/// A closed bin, re-ordered by retention time (scan), ready for feature
/// extraction. `rt` is populated by the caller from the scan-to-RT mapping;
/// binning itself only knows scan numbers.
#[derive(Clone, Debug, Default)]
pub struct EIC {
    pub rt: Vec<f64>,
    pub int: Vec<f64>,
    pub mz: Vec<f64>,
    pub df: Vec<bool>,
    pub dqs_cen: Vec<f64>,
    pub dqs_bin: Vec<f64>,
    pub mean_mz: f64,
    pub mean_error: f64,
}

impl EIC {
    pub fn len(&self) -> usize {
        self.rt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rt.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(mz: f64, scan: usize) -> qCentroid {
        qCentroid {
            mz,
            mz_error: 0.001,
            scan,
            intensity: 100.0,
            dqs_cen: 0.9,
        }
    }

    #[test]
    fn sort_by_mz_orders_points() {
        let mut bin = Bin::new(vec![pt(3.0, 1), pt(1.0, 2), pt(2.0, 3)]);
        bin.sort_by_mz();
        let mzs: Vec<f64> = bin.points.iter().map(|p| p.mz).collect();
        assert_eq!(mzs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn min_max_mz_match_bounds() {
        let bin = Bin::new(vec![pt(3.0, 1), pt(1.0, 2), pt(2.0, 3)]);
        assert_eq!(bin.min_mz(), 1.0);
        assert_eq!(bin.max_mz(), 3.0);
    }
}
