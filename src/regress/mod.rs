pub mod kernel;
pub mod merger;
pub mod validator;

pub use kernel::{LogBuffer, RegressionCandidate, inv_matrix, regress};
pub use merger::{merge_across_scales, merge_within_scale};
pub use validator::{area_dqs, validate};
