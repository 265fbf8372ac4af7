//! De-duplicates regressions: within one scale by apex-proximity grouping and
//! MSE competition on the group-union window; across scales by window-overlap
//! grouping and extended-MSE competition. Mirrors the "keep the best-scoring
//! candidate, drop the rest" shape of the teacher's multi-window-size peak
//! merge passes (`find_peaks.rs`), generalized to this regression's MSE score.

use crate::model::raw::RawPoint;
use crate::model::regression::ValidRegression;

fn mse_on_window(v: &ValidRegression, block_points: &[RawPoint], left: usize, right: usize) -> f64 {
    let mut sse = 0.0;
    let mut df = 0usize;
    for (idx, p) in block_points.iter().enumerate().take(right + 1).skip(left) {
        let x = idx as f64 - v.index_x0 as f64;
        let y_hat = if x < 0.0 {
            v.coeffs.b0 + v.coeffs.b1 * x + v.coeffs.b2 * x * x
        } else {
            v.coeffs.b0 + v.coeffs.b1 * x + v.coeffs.b3 * x * x
        }
        .exp();
        let resid = p.intensity - y_hat;
        sse += resid * resid;
        if p.df {
            df += 1;
        }
    }
    if df == 0 {
        f64::INFINITY
    } else {
        sse / df as f64
    }
}

fn window_overlaps(a: &ValidRegression, b: &ValidRegression) -> bool {
    let a_contains_b = (a.left_limit..=a.right_limit).contains(&(b.apex_position.round() as usize));
    let b_contains_a = (b.left_limit..=b.right_limit).contains(&(a.apex_position.round() as usize));
    a_contains_b || b_contains_a
}

/// Within-scale deduplication. Input and output are all of the same scale.
pub fn merge_within_scale(mut candidates: Vec<ValidRegression>, block_points: &[RawPoint]) -> Vec<ValidRegression> {
    candidates.sort_by(|a, b| a.apex_position.partial_cmp(&b.apex_position).unwrap());
    let mut groups: Vec<Vec<ValidRegression>> = Vec::new();
    for cand in candidates {
        let mut placed = false;
        for group in groups.iter_mut() {
            let last = group.last().unwrap();
            let close = (last.apex_position - cand.apex_position).abs() <= 4.0;
            let overlapping = window_overlaps(last, &cand);
            if close && overlapping {
                group.push(cand);
                placed = true;
                break;
            }
        }
        if !placed {
            groups.push(vec![cand]);
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        if group.len() == 1 {
            out.push(group.into_iter().next().unwrap());
            continue;
        }
        let left = group.iter().map(|v| v.left_limit).min().unwrap();
        let right = group.iter().map(|v| v.right_limit).max().unwrap();
        let winner = group
            .into_iter()
            .map(|v| {
                let mse = mse_on_window(&v, block_points, left, right);
                (v, mse)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(mut v, mse)| {
                v.mse = mse;
                v
            })
            .unwrap();
        out.push(winner);
    }
    out
}

/// Across-scale merge. `by_scale` must already be partitioned and ordered
/// scale-ascending (the Open Question notes this must be restored if a
/// parallel producer changed the order).
pub fn merge_across_scales(
    by_scale: Vec<Vec<ValidRegression>>,
    block_points: &[RawPoint],
) -> Vec<ValidRegression> {
    let mut kept: Vec<ValidRegression> = Vec::new();
    for scale_group in by_scale {
        for candidate in scale_group {
            let overlapping_idx: Vec<usize> = kept
                .iter()
                .enumerate()
                .filter(|(_, k)| window_overlaps(k, &candidate))
                .map(|(i, _)| i)
                .collect();

            match overlapping_idx.len() {
                0 => kept.push(candidate),
                1 => {
                    let i = overlapping_idx[0];
                    let left = kept[i].left_limit.min(candidate.left_limit);
                    let right = kept[i].right_limit.max(candidate.right_limit);
                    let old_mse = mse_on_window(&kept[i], block_points, left, right);
                    let new_mse = mse_on_window(&candidate, block_points, left, right);
                    if new_mse < old_mse {
                        kept[i] = candidate;
                        kept[i].mse = new_mse;
                    }
                }
                _ => {
                    let left = overlapping_idx
                        .iter()
                        .map(|&i| kept[i].left_limit)
                        .min()
                        .unwrap()
                        .min(candidate.left_limit);
                    let right = overlapping_idx
                        .iter()
                        .map(|&i| kept[i].right_limit)
                        .max()
                        .unwrap()
                        .max(candidate.right_limit);
                    let mut sum_mse_df = 0.0;
                    let mut sum_df = 0.0;
                    for &i in &overlapping_idx {
                        let mse = mse_on_window(&kept[i], block_points, left, right);
                        sum_mse_df += mse * kept[i].df as f64;
                        sum_df += kept[i].df as f64;
                    }
                    let grouped_mse = if sum_df > 0.0 {
                        sum_mse_df / sum_df
                    } else {
                        f64::INFINITY
                    };
                    let new_mse = mse_on_window(&candidate, block_points, left, right);
                    if new_mse < grouped_mse {
                        for &i in overlapping_idx.iter().rev() {
                            kept.remove(i);
                        }
                        let mut winner = candidate;
                        winner.mse = new_mse;
                        kept.push(winner);
                    }
                }
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::regression::RegCoeffs;

    fn synthetic_regression(apex: f64, scale: usize) -> ValidRegression {
        ValidRegression {
            coeffs: RegCoeffs {
                b0: 10.0,
                b1: 0.0,
                b2: -0.1,
                b3: -0.1,
            },
            scale,
            index_x0: apex.round() as usize,
            apex_position: apex,
            left_limit: (apex as usize).saturating_sub(scale),
            right_limit: apex as usize + scale,
            df: scale * 2,
            area: 1.0,
            u_area: 0.01,
            u_pos: 0.01,
            u_height: 0.01,
            mse: 0.0,
            is_valid: true,
        }
    }

    fn flat_points(n: usize) -> Vec<RawPoint> {
        (0..n).map(|i| RawPoint::measured(i as f64, 100.0)).collect()
    }

    // A single candidate in its own group passes straight through.
    #[test]
    fn singleton_group_passes_through() {
        let points = flat_points(60);
        let merged = merge_within_scale(vec![synthetic_regression(30.0, 5)], &points);
        assert_eq!(merged.len(), 1);
    }

    // Two near-duplicate candidates at the same scale collapse to one.
    #[test]
    fn close_duplicates_collapse_to_one() {
        let points = flat_points(60);
        let merged = merge_within_scale(
            vec![synthetic_regression(30.0, 5), synthetic_regression(31.0, 5)],
            &points,
        );
        assert_eq!(merged.len(), 1);
    }

    // Merging an already-merged list changes nothing (idempotence).
    #[test]
    fn merge_is_idempotent() {
        let points = flat_points(60);
        let once = merge_within_scale(
            vec![synthetic_regression(30.0, 5), synthetic_regression(31.0, 5)],
            &points,
        );
        let twice = merge_within_scale(once.clone(), &points);
        assert_eq!(once.len(), twice.len());
    }
}
