use crate::model::raw::TreatedSpectrum;

/// External collaborator interface: something that can hand over treated MS1
/// spectra one scan at a time, in scan order starting at scan 1. Concrete
/// mzML parsing is out of scope here (see SPEC_FULL.md section E) — callers
/// supply their own reader, typically wrapping an mzML/mzXML decoder plus the
/// zero-filling/extrapolation step that produces `TreatedSpectrum::separators`.
pub trait SpectrumSource {
    /// Number of MS1 scans available, not counting the unused scan-0 slot.
    fn scan_count(&self) -> usize;

    /// Retention time, in minutes, for a given 1-indexed scan number.
    fn retention_time(&self, scan: usize) -> f64;

    /// Treated points for a given 1-indexed scan number, or `None` if the
    /// scan is missing/empty.
    fn spectrum(&self, scan: usize) -> Option<TreatedSpectrum>;
}

/// An in-memory `SpectrumSource` built from already-treated spectra, used by
/// tests and by callers who have already parsed and zero-filled their data.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpectra {
    pub retention_times: Vec<f64>,
    pub spectra: Vec<Option<TreatedSpectrum>>,
}

impl SpectrumSource for InMemorySpectra {
    fn scan_count(&self) -> usize {
        self.spectra.len().saturating_sub(1)
    }

    fn retention_time(&self, scan: usize) -> f64 {
        self.retention_times.get(scan).copied().unwrap_or(0.0)
    }

    fn spectrum(&self, scan: usize) -> Option<TreatedSpectrum> {
        self.spectra.get(scan).cloned().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::raw::RawPoint;

    #[test]
    fn in_memory_source_reports_scan_count_minus_slot_zero() {
        let src = InMemorySpectra {
            retention_times: vec![0.0, 1.0, 2.0],
            spectra: vec![
                None,
                Some(TreatedSpectrum::new(vec![RawPoint::measured(100.0, 1.0)], vec![])),
                None,
            ],
        };
        assert_eq!(src.scan_count(), 2);
        assert!(src.spectrum(1).is_some());
        assert!(src.spectrum(2).is_none());
    }
}
