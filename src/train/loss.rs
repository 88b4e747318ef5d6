//! Masked softmax cross-entropy over padded batches.

use ndarray::{Array1, Array2};

use crate::vocab::SymbolId;

/// Loss value plus the gradient with respect to the flat logits.
pub struct LossOutput {
    /// Mean negative log-likelihood over valid positions.
    pub loss: f32,
    /// `(softmax − onehot) / valid_count` at valid positions, zero at
    /// padded positions. Same shape as the logits.
    pub dlogits: Array2<f32>,
}

/// Numerically stable softmax.
fn softmax(x: &Array1<f32>) -> Array1<f32> {
    let max = x.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Array1<f32> = x.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Cross-entropy between flat per-position logits and padded tag targets.
///
/// `logits` has shape `(rows * max_len, n_classes)` in row-major batch
/// order; `tags` is the `(rows, max_len)` tag-id matrix; only positions
/// below each row's true length contribute. An empty batch (or all-zero
/// lengths) yields zero loss and a zero gradient.
pub fn masked_cross_entropy(
    logits: &Array2<f32>,
    tags: &Array2<SymbolId>,
    lengths: &[usize],
) -> LossOutput {
    let (rows, max_len) = tags.dim();
    debug_assert_eq!(logits.nrows(), rows * max_len);

    let valid: usize = lengths.iter().take(rows).map(|&l| l.min(max_len)).sum();
    let mut dlogits = Array2::zeros(logits.dim());
    if valid == 0 {
        return LossOutput { loss: 0.0, dlogits };
    }

    let scale = 1.0 / valid as f32;
    let mut loss = 0.0;

    for r in 0..rows {
        let len = lengths[r].min(max_len);
        for p in 0..len {
            let flat = r * max_len + p;
            let probs = softmax(&logits.row(flat).to_owned());
            let target = tags[[r, p]] as usize;

            loss -= (probs[target].max(f32::MIN_POSITIVE)).ln();

            let mut drow = probs;
            drow[target] -= 1.0;
            drow *= scale;
            dlogits.row_mut(flat).assign(&drow);
        }
    }

    LossOutput {
        loss: loss * scale,
        dlogits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_uniform_logits_give_log_n_classes() {
        let logits = Array2::zeros((4, 3));
        let tags = arr2(&[[0u32, 1], [2, 0]]);
        let out = masked_cross_entropy(&logits, &tags, &[2, 2]);
        assert_relative_eq!(out.loss, (3.0f32).ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let logits = arr2(&[[2.0, 1.0, 0.0], [0.5, 0.5, 0.5]]);
        let tags = arr2(&[[1u32, 0]]);
        let out = masked_cross_entropy(&logits, &tags, &[2]);
        for row in out.dlogits.rows() {
            let sum: f32 = row.sum();
            assert_relative_eq!(sum, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_padded_positions_get_zero_gradient() {
        let logits = Array2::from_elem((4, 2), 1.0);
        let tags = arr2(&[[0u32, 0], [0, 0]]);
        let out = masked_cross_entropy(&logits, &tags, &[1, 1]);
        // positions (0,1) and (1,1) are padding
        assert!(out.dlogits.row(1).iter().all(|&v| v == 0.0));
        assert!(out.dlogits.row(3).iter().all(|&v| v == 0.0));
        assert!(out.dlogits.row(0).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_perfect_prediction_has_low_loss() {
        let logits = arr2(&[[20.0, 0.0, 0.0]]);
        let tags = arr2(&[[0u32]]);
        let out = masked_cross_entropy(&logits, &tags, &[1]);
        assert!(out.loss < 1e-3);
    }

    #[test]
    fn test_empty_batch_degrades_to_zero_loss() {
        let logits = Array2::zeros((0, 3));
        let tags = Array2::zeros((0, 0));
        let out = masked_cross_entropy(&logits, &tags, &[]);
        assert_eq!(out.loss, 0.0);
    }

    #[test]
    fn test_loss_decreases_toward_target() {
        let tags = arr2(&[[1u32]]);
        let worse = masked_cross_entropy(&arr2(&[[1.0, 0.0]]), &tags, &[1]);
        let better = masked_cross_entropy(&arr2(&[[0.0, 1.0]]), &tags, &[1]);
        assert!(better.loss < worse.loss);
    }
}
