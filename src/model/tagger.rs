//! Bidirectional LSTM sequence tagger.
//!
//! Embedding lookup feeds a forward and a backward LSTM; their hidden
//! states are concatenated per position and projected to tag-class logits.
//! The flat logits layout is `(rows * max_len, n_classes)` in row-major
//! batch order — the shape the rest of the pipeline consumes.

use ndarray::{s, Array1, Array2};
use rand::Rng;

use super::{Embedding, Lstm, LstmTrace, Param, TagScorer};
use crate::vocab::SymbolId;

/// Tagger dimensions.
#[derive(Debug, Clone, Copy)]
pub struct TaggerConfig {
    /// Token vocabulary size, reserved symbols included.
    pub vocab_size: usize,
    /// Number of tag classes.
    pub n_tags: usize,
    /// Embedding vector size.
    pub embedding_dim: usize,
    /// Hidden state size of each LSTM direction.
    pub hidden_dim: usize,
}

struct RowTrace {
    ids: Vec<SymbolId>,
    fwd: LstmTrace,
    bwd: LstmTrace,
    features: Vec<Array1<f32>>,
}

/// Cached activations of one batch forward pass.
pub struct TaggerTrace {
    rows: Vec<RowTrace>,
    logits: Array2<f32>,
    max_len: usize,
}

impl TaggerTrace {
    /// Flat logits, shape `(rows * max_len, n_classes)`.
    pub fn logits(&self) -> &Array2<f32> {
        &self.logits
    }

    /// Consume the trace, keeping only the logits.
    pub fn into_logits(self) -> Array2<f32> {
        self.logits
    }
}

/// Embedding → BiLSTM → linear projection.
pub struct SequenceTagger {
    embedding: Embedding,
    forward_lstm: Lstm,
    backward_lstm: Lstm,
    out_w: Param, // (C, 2H)
    out_b: Param, // (C, 1)
    config: TaggerConfig,
}

impl SequenceTagger {
    /// New tagger with all layers initialized from `rng`.
    pub fn new<R: Rng>(config: TaggerConfig, rng: &mut R) -> Self {
        let scale = (1.0 / (2 * config.hidden_dim) as f32).sqrt();
        Self {
            embedding: Embedding::new(config.vocab_size, config.embedding_dim, rng),
            forward_lstm: Lstm::new(config.embedding_dim, config.hidden_dim, rng),
            backward_lstm: Lstm::new(config.embedding_dim, config.hidden_dim, rng),
            out_w: Param::uniform(config.n_tags, 2 * config.hidden_dim, scale, rng),
            out_b: Param::zeros(config.n_tags, 1),
            config,
        }
    }

    /// Tagger dimensions.
    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Forward pass over a padded batch, caching activations for backprop.
    ///
    /// Logit rows for padded positions stay zero; the loss masks them and
    /// decoding crops by true length, so they are never read.
    pub fn forward(&self, tokens: &Array2<SymbolId>, lengths: &[usize]) -> TaggerTrace {
        let (rows, max_len) = tokens.dim();
        debug_assert_eq!(rows, lengths.len());
        let h_dim = self.config.hidden_dim;
        let mut logits = Array2::zeros((rows * max_len, self.config.n_tags));
        let mut row_traces = Vec::with_capacity(rows);

        for r in 0..rows {
            let len = lengths[r].min(max_len);
            let ids: Vec<SymbolId> = tokens.row(r).iter().take(len).copied().collect();
            let xs = self.embedding.forward(&ids);

            let fwd = self.forward_lstm.forward(&xs);
            let reversed: Vec<Array1<f32>> = xs.iter().rev().cloned().collect();
            let bwd = self.backward_lstm.forward(&reversed);

            let mut features = Vec::with_capacity(len);
            for p in 0..len {
                let mut z = Array1::zeros(2 * h_dim);
                z.slice_mut(s![0..h_dim]).assign(fwd.hidden(p));
                z.slice_mut(s![h_dim..2 * h_dim]).assign(bwd.hidden(len - 1 - p));

                let y = self.out_w.matvec(&z) + self.out_b.vec();
                logits.row_mut(r * max_len + p).assign(&y);
                features.push(z);
            }

            row_traces.push(RowTrace {
                ids,
                fwd,
                bwd,
                features,
            });
        }

        TaggerTrace {
            rows: row_traces,
            logits,
            max_len,
        }
    }

    /// Backpropagate flat logit gradients through the whole model.
    ///
    /// `dlogits` must have the trace's `(rows * max_len, n_classes)` shape
    /// with zero rows at padded positions.
    pub fn backward(&mut self, trace: &TaggerTrace, dlogits: &Array2<f32>) {
        debug_assert_eq!(dlogits.dim(), trace.logits.dim());
        let h_dim = self.config.hidden_dim;

        for (r, row) in trace.rows.iter().enumerate() {
            let len = row.ids.len();
            let mut dh_fwd = vec![Array1::zeros(h_dim); len];
            let mut dh_bwd = vec![Array1::zeros(h_dim); len];

            for p in 0..len {
                let dy = dlogits.row(r * trace.max_len + p).to_owned();
                let dz = self.out_w.matvec_t(&dy);
                self.out_w.add_outer(&dy, &row.features[p]);
                self.out_b.add_grad(&dy);

                dh_fwd[p] = dz.slice(s![0..h_dim]).to_owned();
                // the backward LSTM saw the sequence reversed
                dh_bwd[len - 1 - p] = dz.slice(s![h_dim..2 * h_dim]).to_owned();
            }

            let dx_fwd = self.forward_lstm.backward(&row.fwd, &dh_fwd);
            let dx_bwd = self.backward_lstm.backward(&row.bwd, &dh_bwd);

            let dxs: Vec<Array1<f32>> = (0..len)
                .map(|p| &dx_fwd[p] + &dx_bwd[len - 1 - p])
                .collect();
            self.embedding.backward(&row.ids, &dxs);
        }
    }

    /// All parameters in stable order, for the optimizer.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = vec![self.embedding.weight_mut()];
        params.extend(self.forward_lstm.params_mut());
        params.extend(self.backward_lstm.params_mut());
        params.push(&mut self.out_w);
        params.push(&mut self.out_b);
        params
    }

    /// Reset every parameter gradient.
    pub fn zero_grad(&mut self) {
        for param in self.params_mut() {
            param.zero_grad();
        }
    }
}

impl TagScorer for SequenceTagger {
    fn scores(&self, tokens: &Array2<SymbolId>, lengths: &[usize]) -> Array2<f32> {
        self.forward(tokens, lengths).into_logits()
    }

    fn n_classes(&self) -> usize {
        self.config.n_tags
    }
}
