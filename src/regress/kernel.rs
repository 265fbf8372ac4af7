//! Asymmetric quadratic regression kernel: for a window of width `2s+1`,
//! fits `ylog(x) = b0 + b1*x + b2*x^2*[x<0] + b3*x^2*[x>=0]` in log-intensity
//! space, for every valid window position in a block, for every scale.
//!
//! The fit reduces to a convolution: the normal-equation matrix `X^T X`
//! depends only on the scale `s`, so its inverse is computed once per scale
//! and cached; each position's coefficients are then a dot product between
//! the sliding `ylog` window and four fixed-per-scale kernels, the same
//! precompute-then-convolve shape as the Gram-polynomial table in
//! `sgg.rs`.

use std::sync::OnceLock;

use crate::model::RegCoeffs;

pub const MAX_SCALE: usize = 63;
const STATIC_CAPACITY: usize = 512;

/// The design-matrix inverse `INV[s]` for scale `s`, stored as a full 4x4
/// matrix (the six independent entries the matrix reduces to are an
/// implementation detail of its symmetry, not a distinct storage layout).
pub type InvMatrix = [[f64; 4]; 4];

fn inverse_table() -> &'static [InvMatrix; MAX_SCALE + 1] {
    static TABLE: OnceLock<[InvMatrix; MAX_SCALE + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[[0.0; 4]; 4]; MAX_SCALE + 1];
        for s in 1..=MAX_SCALE {
            table[s] = build_inverse(s);
        }
        table
    })
}

fn x_basis(x: i64) -> [f64; 4] {
    let xf = x as f64;
    let x2 = xf * xf;
    if x < 0 {
        [1.0, xf, x2, 0.0]
    } else {
        [1.0, xf, 0.0, x2]
    }
}

fn build_inverse(s: usize) -> InvMatrix {
    let si = s as i64;
    let mut m = [[0.0f64; 4]; 4];
    for x in -si..=si {
        let row = x_basis(x);
        for a in 0..4 {
            for b in 0..4 {
                m[a][b] += row[a] * row[b];
            }
        }
    }
    invert4(m)
}

/// Gauss-Jordan inversion of a 4x4 matrix.
fn invert4(mut m: [[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut inv = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    for col in 0..4 {
        let mut pivot_row = col;
        let mut best = m[col][col].abs();
        for r in (col + 1)..4 {
            if m[r][col].abs() > best {
                best = m[r][col].abs();
                pivot_row = r;
            }
        }
        if pivot_row != col {
            m.swap(col, pivot_row);
            inv.swap(col, pivot_row);
        }
        let pivot = m[col][col];
        assert!(pivot.abs() > 1e-300, "singular design matrix");
        for k in 0..4 {
            m[col][k] /= pivot;
            inv[col][k] /= pivot;
        }
        for r in 0..4 {
            if r == col {
                continue;
            }
            let factor = m[r][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..4 {
                m[r][k] -= factor * m[col][k];
                inv[r][k] -= factor * inv[col][k];
            }
        }
    }
    inv
}

/// Log-intensity buffer for a spectrum block: a stack array for blocks of
/// at most 512 samples, a heap `Vec` otherwise. Semantics are identical;
/// only the allocation strategy differs.
pub enum LogBuffer {
    Static([f64; STATIC_CAPACITY], usize),
    Dynamic(Vec<f64>),
}

impl LogBuffer {
    pub fn from_intensities(intensities: &[f64]) -> Self {
        let n = intensities.len();
        if n <= STATIC_CAPACITY {
            let mut arr = [0.0f64; STATIC_CAPACITY];
            for (slot, &y) in arr[..n].iter_mut().zip(intensities) {
                *slot = y.ln();
            }
            LogBuffer::Static(arr, n)
        } else {
            LogBuffer::Dynamic(intensities.iter().map(|y| y.ln()).collect())
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            LogBuffer::Static(arr, n) => &arr[..*n],
            LogBuffer::Dynamic(v) => v,
        }
    }
}

/// A candidate fit at one position of one block, before validation.
#[derive(Clone, Copy, Debug)]
pub struct RegressionCandidate {
    pub index_x0: usize,
    pub scale: usize,
    pub coeffs: RegCoeffs,
}

/// Fits the asymmetric quadratic at every position `i` in `[s, n-s)` of
/// `ylog`, for the given scale `s`. Panics (`InvalidInput`, a programmer
/// error) if `n < 2s+1`.
pub fn regress(ylog: &[f64], scale: usize) -> Vec<RegressionCandidate> {
    let n = ylog.len();
    let window = 2 * scale + 1;
    assert!(
        n >= window,
        "regression window ({window}) exceeds block length ({n})"
    );
    assert!(
        scale >= 1 && scale <= MAX_SCALE,
        "scale {scale} outside supported range 1..={MAX_SCALE}"
    );

    let inv = inverse_table()[scale];
    let si = scale as i64;
    let mut out = Vec::with_capacity(n.saturating_sub(window).saturating_add(1));

    for i in scale..(n - scale) {
        let mut xty = [0.0f64; 4];
        for (j, &y) in ylog[i - scale..=i + scale].iter().enumerate() {
            let x = j as i64 - si;
            let basis = x_basis(x);
            for k in 0..4 {
                xty[k] += basis[k] * y;
            }
        }
        let mut b = [0.0f64; 4];
        for (row, out_b) in inv.iter().zip(b.iter_mut()) {
            *out_b = row.iter().zip(xty.iter()).map(|(a, x)| a * x).sum();
        }
        out.push(RegressionCandidate {
            index_x0: i,
            scale,
            coeffs: RegCoeffs {
                b0: b[0],
                b1: b[1],
                b2: b[2],
                b3: b[3],
            },
        });
    }
    out
}

/// The `[4]` entry of `INV[s]` used by the validator's quadratic t-test:
/// the diagonal term shared by both `b2` and `b3` thanks to the basis split.
pub fn inv_quadratic_variance(scale: usize) -> f64 {
    let inv = inverse_table()[scale];
    inv[2][2].max(inv[3][3])
}

pub fn inv_matrix(scale: usize) -> InvMatrix {
    inverse_table()[scale]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_quadratic(scale: usize, b0: f64, b1: f64, b2: f64, b3: f64) -> Vec<f64> {
        let s = scale as i64;
        (-s..=s)
            .map(|x| {
                let xf = x as f64;
                if x < 0 {
                    b0 + b1 * xf + b2 * xf * xf
                } else {
                    b0 + b1 * xf + b3 * xf * xf
                }
            })
            .collect()
    }

    // Fitting exact synthetic data recovers the generating coefficients.
    #[test]
    fn recovers_exact_asymmetric_quadratic() {
        let scale = 5;
        let ylog = synthetic_quadratic(scale, 10.0, 0.2, -0.05, -0.08);
        let candidates = regress(&ylog, scale);
        assert_eq!(candidates.len(), 1);
        let c = candidates[0].coeffs;
        assert!((c.b0 - 10.0).abs() < 1e-8);
        assert!((c.b1 - 0.2).abs() < 1e-8);
        assert!((c.b2 - (-0.05)).abs() < 1e-8);
        assert!((c.b3 - (-0.08)).abs() < 1e-8);
    }

    #[test]
    fn multiple_positions_slide_across_block() {
        let scale = 3;
        let mut ylog = synthetic_quadratic(scale, 5.0, 0.0, -0.02, -0.02);
        ylog.extend(synthetic_quadratic(scale, 5.0, 0.0, -0.02, -0.02));
        let candidates = regress(&ylog, scale);
        assert_eq!(candidates.len(), ylog.len() - 2 * scale);
    }

    #[test]
    #[should_panic(expected = "regression window")]
    fn panics_when_block_too_short() {
        let ylog = vec![1.0, 2.0, 3.0];
        regress(&ylog, 5);
    }

    #[test]
    fn static_and_dynamic_log_buffers_agree() {
        let small: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let mut large = small.clone();
        large.extend(std::iter::repeat(1.0).take(600));
        let static_buf = LogBuffer::from_intensities(&small);
        let dynamic_buf = LogBuffer::from_intensities(&large);
        assert!(matches!(static_buf, LogBuffer::Static(_, 10)));
        assert!(matches!(dynamic_buf, LogBuffer::Dynamic(_)));
        for (a, b) in static_buf.as_slice().iter().zip(small.iter()) {
            assert!((a - b.ln()).abs() < 1e-12);
        }
    }
}
