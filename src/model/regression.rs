/// Raw fit result from the regression kernel: coefficients of
/// `ylog(x) = b0 + b1*x + b2*x^2*[x<0] + b3*x^2*[x>=0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
}

impl RegCoeffs {
    pub fn is_finite(&self) -> bool {
        self.b0.is_finite() && self.b1.is_finite() && self.b2.is_finite() && self.b3.is_finite()
    }

    pub fn is_nondegenerate(&self) -> bool {
        self.b2 != 0.0 && self.b3 != 0.0
    }
}

/// A regression that survived the full validator cascade.
#[derive(Clone, Copy, Debug)]
pub struct ValidRegression {
    pub coeffs: RegCoeffs,
    pub scale: usize,
    /// Apex-relative origin of the window, in block coordinates.
    pub index_x0: usize,
    /// Fractional apex position, in block coordinates.
    pub apex_position: f64,
    pub left_limit: usize,
    pub right_limit: usize,
    /// Measured points inside `[left_limit, right_limit]`.
    pub df: usize,
    pub area: f64,
    pub u_area: f64,
    pub u_pos: f64,
    pub u_height: f64,
    /// 0.0 means "not yet computed" (set by the merger).
    pub mse: f64,
    pub is_valid: bool,
}

impl ValidRegression {
    pub fn window(&self) -> std::ops::RangeInclusive<usize> {
        self.left_limit..=self.right_limit
    }
}
