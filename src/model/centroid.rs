#![allow(non_camel_case_types)]

/// Output of per-scan peak extraction.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CentroidPeak {
    pub scan: usize,
    pub mz: f64,
    pub mz_u: f64,
    pub area: f64,
    pub area_u: f64,
    pub height: f64,
    pub height_u: f64,
    pub dqs_cen: f64,
}

/// A centroid as consumed by binning. Named to match the domain vocabulary
/// (qCentroid, qBinning) used throughout this pipeline.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct qCentroid {
    pub mz: f64,
    pub mz_error: f64,
    pub scan: usize,
    pub intensity: f64,
    pub dqs_cen: f64,
}

impl From<CentroidPeak> for qCentroid {
    fn from(p: CentroidPeak) -> Self {
        qCentroid {
            mz: p.mz,
            mz_error: p.mz_u,
            scan: p.scan,
            intensity: p.area,
            dqs_cen: p.dqs_cen,
        }
    }
}

/// Binning input: an ordered-by-scan array of arrays of centroids. Index 0 is
/// always empty because scans are 1-indexed.
#[derive(Clone, Debug, Default)]
pub struct CentroidedData {
    pub scans: Vec<Vec<qCentroid>>,
    pub total_points: usize,
}

impl CentroidedData {
    pub fn new() -> Self {
        Self {
            scans: vec![Vec::new()],
            total_points: 0,
        }
    }

    /// Inserts a centroid, densely growing `scans` with empty sub-arrays for
    /// any scan numbers skipped so far.
    pub fn push(&mut self, c: qCentroid) {
        while self.scans.len() <= c.scan {
            self.scans.push(Vec::new());
        }
        self.scans[c.scan].push(c);
        self.total_points += 1;
    }

    pub fn all(&self) -> impl Iterator<Item = &qCentroid> {
        self.scans.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_scan_zero_empty_and_dense() {
        let mut data = CentroidedData::new();
        data.push(qCentroid {
            mz: 100.0,
            mz_error: 0.001,
            scan: 3,
            intensity: 500.0,
            dqs_cen: 0.9,
        });
        assert!(data.scans[0].is_empty());
        assert_eq!(data.scans.len(), 4);
        assert!(data.scans[1].is_empty());
        assert!(data.scans[2].is_empty());
        assert_eq!(data.scans[3].len(), 1);
        assert_eq!(data.total_points, 1);
    }
}
