/// A final extracted chromatographic feature: one row of the output table.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct FeaturePeak {
    pub mz: f64,
    pub mz_u: f64,
    pub rt: f64,
    pub rt_u: f64,
    pub area: f64,
    pub area_u: f64,
    pub height: f64,
    pub height_u: f64,
    pub dqs_cen: f64,
    pub dqs_bin: f64,
    pub dqs_peak: f64,
    pub peak_start: usize,
    pub peak_end: usize,
}
