pub mod bin;
pub mod centroid;
pub mod feature;
pub mod raw;
pub mod regression;

pub use bin::{Bin, EIC};
pub use centroid::{CentroidPeak, CentroidedData, qCentroid};
pub use feature::FeaturePeak;
pub use raw::{RawPoint, TreatedSpectrum};
pub use regression::{RegCoeffs, ValidRegression};
