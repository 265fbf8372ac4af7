//! Non-target LC-MS peak detection: per-scan centroiding, m/z binning into
//! extracted-ion chromatograms, and per-EIC feature extraction, each stage a
//! regress -> validate -> merge pipeline sharing one quadratic regression
//! kernel (see `regress::kernel`).
//!
//! The three top-level entry points are `centroiding::centroid_spectra`,
//! `binning::bin_centroids`, and `featurizing::extract_all`; `cli`/`io` wire
//! them to a mzML/CSV-reading binary.

pub mod binning;
pub mod centroiding;
pub mod cli;
pub mod error;
pub mod featurizing;
pub mod io;
pub mod model;
pub mod regress;
pub mod stats;

pub use error::{QalgoError, Result};
