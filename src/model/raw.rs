/// One m/z-intensity pair within a scan.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawPoint {
    pub mz: f64,
    pub intensity: f64,
    /// true if measured, false if interpolated/extrapolated by zero-filling.
    pub df: bool,
}

impl RawPoint {
    pub fn measured(mz: f64, intensity: f64) -> Self {
        Self {
            mz,
            intensity,
            df: true,
        }
    }

    pub fn interpolated(mz: f64, intensity: f64) -> Self {
        Self {
            mz,
            intensity,
            df: false,
        }
    }
}

/// A single spectrum prepared for regression: an ordered sequence of points
/// plus the indices at which extrapolation has split it into contiguous
/// blocks. Regressions never cross a separator.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TreatedSpectrum {
    pub points: Vec<RawPoint>,
    pub separators: Vec<usize>,
}

impl TreatedSpectrum {
    pub fn new(points: Vec<RawPoint>, separators: Vec<usize>) -> Self {
        Self { points, separators }
    }

    /// Contiguous index ranges between separators, each a candidate block for
    /// the regression kernel.
    pub fn blocks(&self) -> Vec<std::ops::Range<usize>> {
        let mut bounds = Vec::with_capacity(self.separators.len() + 2);
        bounds.push(0usize);
        bounds.extend(self.separators.iter().copied());
        bounds.push(self.points.len());
        bounds.dedup();
        bounds
            .windows(2)
            .filter(|w| w[1] > w[0])
            .map(|w| w[0]..w[1])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_split_at_separators() {
        let points: Vec<RawPoint> = (0..10)
            .map(|i| RawPoint::measured(i as f64, 1.0))
            .collect();
        let spec = TreatedSpectrum::new(points, vec![4]);
        let blocks = spec.blocks();
        assert_eq!(blocks, vec![0..4, 4..10]);
    }

    #[test]
    fn no_separators_is_one_block() {
        let points: Vec<RawPoint> = (0..5).map(|i| RawPoint::measured(i as f64, 1.0)).collect();
        let spec = TreatedSpectrum::new(points, vec![]);
        assert_eq!(spec.blocks(), vec![0..5]);
    }
}
