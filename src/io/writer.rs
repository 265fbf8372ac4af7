use std::io::Write;

use crate::binning::{self, errorcode};
use crate::error::Result;
use crate::model::bin::Bin;
use crate::model::feature::FeaturePeak;

/// Debug dump of the feature table as JSON, one object per row. Mirrors the
/// teacher's `bin_to_json`/`mzml_to_json` debug-export pair, minus the WASM
/// transport layer those built on top of.
pub fn write_feature_table_json<W: Write>(out: W, features: &[(usize, FeaturePeak)]) -> Result<()> {
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row<'a> {
        bin_id: usize,
        #[serde(flatten)]
        feature: &'a FeaturePeak,
    }
    let rows: Vec<Row> = features
        .iter()
        .map(|(bin_id, feature)| Row {
            bin_id: *bin_id,
            feature,
        })
        .collect();
    serde_json::to_writer_pretty(out, &rows)?;
    Ok(())
}

/// Writes the feature table: one row per extracted peak.
pub fn write_feature_table<W: Write>(mut out: W, features: &[(usize, FeaturePeak)]) -> Result<()> {
    writeln!(
        out,
        "mz,rt,int,mzUncertainty,rtUncertainty,intUncertainty,dqs_cen,dqs_bin,dqs_peak"
    )?;
    for (_, f) in features {
        writeln!(
            out,
            "{:.6},{:.5},{:.3},{:.6},{:.5},{:.3},{:.4},{:.4},{:.4}",
            f.mz,
            f.rt,
            f.area,
            f.mz_u,
            f.rt_u,
            f.area_u,
            f.dqs_cen,
            f.dqs_bin,
            f.dqs_peak
        )?;
    }
    Ok(())
}

/// Writes `_summary.csv`: one row per closed bin, carrying the bin-summary
/// error-code bitmask (see SPEC_FULL.md section E).
pub fn write_bin_summary<W: Write>(mut out: W, bins: &[Bin]) -> Result<()> {
    writeln!(
        out,
        "ID,errorcode,size,mean_mz,median_mz,stdev_mz,mean_scans,DQSB_base,DQSB_scaled,DQSC_min,mean_error"
    )?;
    for (id, bin) in bins.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{:.6},{:.6},{:.8},{:.2},{:.4},{:.4},{:.4},{:.8}",
            id,
            errorcode(bin),
            bin.len(),
            binning::mean_mz(bin),
            bin.median_mz,
            binning::stdev_mz(bin),
            binning::mean_scans(bin),
            binning::mean_dqsb_base(bin),
            binning::mean_dqsb_scaled(bin),
            binning::dqsc_min(bin),
            bin.mean_error()
        )?;
    }
    Ok(())
}

/// Writes `_bins.csv`: every centroid assigned to a closed bin (the
/// `-pb`/`-printbins` dump from SPEC_FULL.md section E).
pub fn write_bins_dump<W: Write>(mut out: W, bins: &[Bin]) -> Result<()> {
    writeln!(out, "mz,scan,binID,DQSC,DQSB_base")?;
    for (id, bin) in bins.iter().enumerate() {
        for (i, p) in bin.points.iter().enumerate() {
            let dqsb = bin.dqsb_base.get(i).copied().unwrap_or(0.0);
            writeln!(out, "{:.6},{},{},{:.4},{:.4}", p.mz, p.scan, id, p.dqs_cen, dqsb)?;
        }
    }
    Ok(())
}
