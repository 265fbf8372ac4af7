use crate::model::centroid::qCentroid;

/// Two-sided 99% z-bound used to lay out the scaled-distance weight table.
const X_AT_MAXDIST: f64 = 2.575829;

/// Re-models the original source's three process-wide globals (`maxdist`,
/// `outOfBins`, `duplicatesTotal`) plus the scaled-distance weight table as
/// one explicit value, threaded by `&mut` through the recursive splits (see
/// DESIGN.md's Open Question on the `BinningContext` redesign).
pub struct BinningContext {
    pub maxdist: usize,
    pub out_of_bins: Vec<qCentroid>,
    pub duplicates_total: usize,
    weight_table: Vec<f64>,
}

impl BinningContext {
    pub fn new(maxdist: usize) -> Self {
        let span = 2 * maxdist + 1;
        let weight_table = (0..span)
            .map(|j| {
                let x = if maxdist == 0 {
                    0.0
                } else {
                    -X_AT_MAXDIST + 2.0 * X_AT_MAXDIST * j as f64 / (span - 1) as f64
                };
                2.0 - (-0.5 * x * x).exp()
            })
            .collect();
        Self {
            maxdist,
            out_of_bins: Vec::new(),
            duplicates_total: 0,
            weight_table,
        }
    }

    /// Gaussian-shaped penalty weight for a candidate at `scan_offset` from
    /// the bin, in `[-maxdist, maxdist]`.
    pub fn weight_for(&self, scan_offset: i64) -> f64 {
        let idx = (scan_offset + self.maxdist as i64).clamp(0, self.weight_table.len() as i64 - 1);
        self.weight_table[idx as usize]
    }
}

impl Default for BinningContext {
    fn default() -> Self {
        Self::new(6)
    }
}
