pub mod centroid_source;
pub mod spectrum_source;
pub mod writer;

pub use centroid_source::{CentroidRow, CentroidSource};
pub use spectrum_source::{InMemorySpectra, SpectrumSource};
