//! BiLSTM tagger model.
//!
//! Layers keep their weights in flat [`Param`] buffers (value plus
//! accumulated gradient) so the optimizer can step over a uniform parameter
//! list. The [`TagScorer`] trait is the seam the evaluation code consumes:
//! anything that maps a padded token-id batch to flat per-position class
//! scores can sit behind it.

mod embedding;
mod lstm;
mod tagger;

pub use embedding::Embedding;
pub use lstm::{Lstm, LstmTrace};
pub use tagger::{SequenceTagger, TaggerConfig, TaggerTrace};

use ndarray::Array1;
use rand::Rng;

use crate::vocab::SymbolId;

/// A trainable parameter: a flat value buffer with a matching gradient
/// buffer, logically shaped `(rows, cols)`. Vectors use `cols == 1`.
#[derive(Debug, Clone)]
pub struct Param {
    data: Array1<f32>,
    grad: Array1<f32>,
    rows: usize,
    cols: usize,
}

impl Param {
    /// Zero-initialized parameter.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array1::zeros(rows * cols),
            grad: Array1::zeros(rows * cols),
            rows,
            cols,
        }
    }

    /// Uniform init in `(-scale, scale)`.
    pub fn uniform<R: Rng>(rows: usize, cols: usize, scale: f32, rng: &mut R) -> Self {
        let data = Array1::from_iter((0..rows * cols).map(|_| rng.gen_range(-scale..scale)));
        Self {
            data,
            grad: Array1::zeros(rows * cols),
            rows,
            cols,
        }
    }

    /// Logical shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-sized parameter.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat value buffer.
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Flat value buffer, mutable.
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Flat gradient buffer.
    pub fn grad(&self) -> &Array1<f32> {
        &self.grad
    }

    /// Reset the gradient buffer to zero.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Scale the gradient buffer in place.
    pub fn scale_grad(&mut self, factor: f32) {
        self.grad *= factor;
    }

    /// `W · x` for the `(rows, cols)` matrix view of this parameter.
    pub fn matvec(&self, x: &Array1<f32>) -> Array1<f32> {
        debug_assert_eq!(x.len(), self.cols);
        let data = self.data.as_slice().expect("param storage is contiguous");
        let mut out = Array1::zeros(self.rows);
        for r in 0..self.rows {
            let row = &data[r * self.cols..(r + 1) * self.cols];
            let mut acc = 0.0;
            for (w, xv) in row.iter().zip(x.iter()) {
                acc += w * xv;
            }
            out[r] = acc;
        }
        out
    }

    /// `Wᵀ · y` for the `(rows, cols)` matrix view of this parameter.
    pub fn matvec_t(&self, y: &Array1<f32>) -> Array1<f32> {
        debug_assert_eq!(y.len(), self.rows);
        let data = self.data.as_slice().expect("param storage is contiguous");
        let mut out = Array1::zeros(self.cols);
        for r in 0..self.rows {
            let row = &data[r * self.cols..(r + 1) * self.cols];
            let yv = y[r];
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += yv * w;
            }
        }
        out
    }

    /// Accumulate the outer product `y · xᵀ` into the gradient.
    pub fn add_outer(&mut self, y: &Array1<f32>, x: &Array1<f32>) {
        debug_assert_eq!(y.len(), self.rows);
        debug_assert_eq!(x.len(), self.cols);
        let grad = self
            .grad
            .as_slice_mut()
            .expect("param storage is contiguous");
        for r in 0..self.rows {
            let yv = y[r];
            let row = &mut grad[r * self.cols..(r + 1) * self.cols];
            for (g, xv) in row.iter_mut().zip(x.iter()) {
                *g += yv * xv;
            }
        }
    }

    /// Mutable slice of the flat gradient buffer, for row scatter-adds.
    pub(crate) fn grad_row_mut(&mut self, offset: usize, len: usize) -> &mut [f32] {
        let grad = self
            .grad
            .as_slice_mut()
            .expect("param storage is contiguous");
        &mut grad[offset..offset + len]
    }

    /// Accumulate `v` into the gradient of a vector-shaped parameter.
    pub fn add_grad(&mut self, v: &Array1<f32>) {
        debug_assert_eq!(v.len(), self.grad.len());
        self.grad += v;
    }

    /// The value buffer of a vector-shaped parameter.
    pub fn vec(&self) -> &Array1<f32> {
        debug_assert_eq!(self.cols, 1);
        &self.data
    }
}

/// Maps a padded token-id batch to flat per-position class scores.
pub trait TagScorer {
    /// Scores of shape `(rows * max_len, n_classes)`, one row per batch
    /// position in row-major order. Rows for padded positions are
    /// unspecified; callers crop by true length before reading them.
    fn scores(&self, tokens: &ndarray::Array2<SymbolId>, lengths: &[usize]) -> ndarray::Array2<f32>;

    /// Number of tag classes scored.
    fn n_classes(&self) -> usize;
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
