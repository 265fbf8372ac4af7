use crate::model::centroid::{CentroidedData, qCentroid};

/// One row of a previously-centroided CSV, as read back in for binning-only
/// runs (the CLI's `-r`/`-f` flags accept either raw mzML or centroid CSVs).
#[derive(Clone, Copy, Debug)]
pub struct CentroidRow {
    pub scan: usize,
    pub mz: f64,
    pub mz_error: f64,
    pub intensity: f64,
    pub dqs_cen: f64,
}

impl From<CentroidRow> for qCentroid {
    fn from(r: CentroidRow) -> Self {
        qCentroid {
            mz: r.mz,
            mz_error: r.mz_error,
            scan: r.scan,
            intensity: r.intensity,
            dqs_cen: r.dqs_cen,
        }
    }
}

/// External collaborator interface for a centroid-table reader (CSV, or
/// whatever upstream format a caller uses in place of running centroiding
/// itself).
pub trait CentroidSource {
    fn rows(&self) -> Vec<CentroidRow>;
}

/// Folds rows from any `CentroidSource` into the scan-indexed structure
/// `binning` expects.
pub fn collect(source: &dyn CentroidSource) -> CentroidedData {
    let mut data = CentroidedData::new();
    for row in source.rows() {
        data.push(row.into());
    }
    data
}
