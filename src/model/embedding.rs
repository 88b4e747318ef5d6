//! Token embedding layer.

use ndarray::Array1;
use rand::Rng;

use super::Param;
use crate::vocab::SymbolId;

/// Id-to-vector lookup table, `(vocab_size, dim)`.
pub struct Embedding {
    weight: Param,
    vocab_size: usize,
    dim: usize,
}

impl Embedding {
    /// New embedding with uniform init scaled by `1/sqrt(dim)`.
    pub fn new<R: Rng>(vocab_size: usize, dim: usize, rng: &mut R) -> Self {
        let scale = (1.0 / dim as f32).sqrt();
        Self {
            weight: Param::uniform(vocab_size, dim, scale, rng),
            vocab_size,
            dim,
        }
    }

    /// Vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Look up one vector per id.
    ///
    /// Ids are always in range when they come from the vocabulary that sized
    /// this table; an out-of-range id degrades to a zero vector.
    pub fn forward(&self, ids: &[SymbolId]) -> Vec<Array1<f32>> {
        let data = self
            .weight
            .data()
            .as_slice()
            .expect("param storage is contiguous");
        ids.iter()
            .map(|&id| {
                let idx = id as usize;
                if idx >= self.vocab_size {
                    debug_assert!(false, "embedding id {idx} out of range");
                    Array1::zeros(self.dim)
                } else {
                    Array1::from_vec(data[idx * self.dim..(idx + 1) * self.dim].to_vec())
                }
            })
            .collect()
    }

    /// Scatter-add per-position gradients into the looked-up rows.
    pub fn backward(&mut self, ids: &[SymbolId], grads: &[Array1<f32>]) {
        debug_assert_eq!(ids.len(), grads.len());
        for (&id, grad) in ids.iter().zip(grads.iter()) {
            let idx = id as usize;
            if idx >= self.vocab_size {
                continue;
            }
            let row = self.weight.grad_row_mut(idx * self.dim, self.dim);
            for (g, v) in row.iter_mut().zip(grad.iter()) {
                *g += v;
            }
        }
    }

    /// The underlying parameter, for the optimizer.
    pub fn weight_mut(&mut self) -> &mut Param {
        &mut self.weight
    }

    /// The underlying parameter, read-only.
    pub fn weight(&self) -> &Param {
        &self.weight
    }
}
