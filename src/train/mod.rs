//! Training loop for the BiLSTM tagger.
//!
//! One [`Trainer::train_epoch`] call is one pass over a [`BatchBuilder`]:
//! forward, masked cross-entropy, backprop, optional gradient clipping, SGD
//! step. Validation reuses the same loss with no parameter updates.

mod loss;
mod optim;

pub use loss::{masked_cross_entropy, LossOutput};
pub use optim::{clip_grad_norm, Optimizer, Sgd};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::batch::BatchBuilder;
use crate::model::SequenceTagger;

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of passes over the training corpus.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Examples per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Initial learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Per-epoch learning-rate divisor; 1.0 disables decay.
    #[serde(default = "default_lr_decay")]
    pub lr_decay: f32,
    /// SGD momentum; 0.0 disables it.
    #[serde(default = "default_momentum")]
    pub momentum: f32,
    /// Global gradient-norm ceiling; `None` disables clipping.
    #[serde(default = "default_clip_norm")]
    pub clip_norm: Option<f32>,
    /// Batches between progress lines.
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
    /// PRNG seed; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_epochs() -> usize {
    4
}
fn default_batch_size() -> usize {
    32
}
fn default_learning_rate() -> f32 {
    0.005
}
fn default_lr_decay() -> f32 {
    1.0
}
fn default_momentum() -> f32 {
    0.9
}
fn default_clip_norm() -> Option<f32> {
    Some(5.0)
}
fn default_log_interval() -> usize {
    50
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            lr_decay: default_lr_decay(),
            momentum: default_momentum(),
            clip_norm: default_clip_norm(),
            log_interval: default_log_interval(),
            seed: None,
        }
    }
}

/// Per-epoch training metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    losses: Vec<f32>,
    lrs: Vec<f32>,
}

impl MetricsTracker {
    /// Record one finished epoch.
    pub fn record_epoch(&mut self, loss: f32, lr: f32) {
        self.losses.push(loss);
        self.lrs.push(lr);
    }

    /// Number of recorded epochs.
    pub fn epoch(&self) -> usize {
        self.losses.len()
    }

    /// Mean training loss per epoch, in order.
    pub fn losses(&self) -> &[f32] {
        &self.losses
    }

    /// Learning rate used in each epoch, in order.
    pub fn lrs(&self) -> &[f32] {
        &self.lrs
    }
}

/// Drives epochs of SGD over a batch builder.
pub struct Trainer {
    config: TrainConfig,
    optimizer: Sgd,
    /// Per-epoch metrics, readable by the caller.
    pub metrics: MetricsTracker,
}

impl Trainer {
    /// New trainer from hyperparameters.
    pub fn new(config: TrainConfig) -> Self {
        let optimizer = Sgd::new(config.learning_rate, config.momentum);
        Self {
            config,
            optimizer,
            metrics: MetricsTracker::default(),
        }
    }

    /// Hyperparameters in use.
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Current learning rate.
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Train for one epoch; returns the mean loss over its batches.
    ///
    /// The pass order is re-drawn from `rng` per the builder's shuffle
    /// policy. After the epoch the learning rate is divided by `lr_decay`.
    pub fn train_epoch<R: Rng>(
        &mut self,
        model: &mut SequenceTagger,
        data: &BatchBuilder,
        rng: &mut R,
    ) -> f32 {
        let mut total_loss = 0.0;
        let mut num_batches = 0usize;

        for batch in data.pass(rng) {
            let trace = model.forward(&batch.tokens, &batch.lengths);
            let LossOutput { loss, dlogits } =
                masked_cross_entropy(trace.logits(), &batch.tags, &batch.lengths);

            model.zero_grad();
            model.backward(&trace, &dlogits);
            if let Some(max_norm) = self.config.clip_norm {
                clip_grad_norm(&mut model.params_mut(), max_norm);
            }
            self.optimizer.step(&mut model.params_mut());

            total_loss += loss;
            num_batches += 1;

            if self.config.log_interval > 0 && num_batches % self.config.log_interval == 0 {
                println!(
                    "Epoch {}, Step {}: loss={:.4}, lr={:.6}",
                    self.metrics.epoch() + 1,
                    num_batches,
                    total_loss / num_batches as f32,
                    self.lr()
                );
            }
        }

        let avg_loss = if num_batches > 0 {
            total_loss / num_batches as f32
        } else {
            0.0
        };
        self.metrics.record_epoch(avg_loss, self.lr());

        if self.config.lr_decay != 1.0 {
            let lr = self.optimizer.lr() / self.config.lr_decay;
            self.optimizer.set_lr(lr);
        }

        avg_loss
    }

    /// Mean loss over one ordered pass, without parameter updates.
    pub fn validation_loss(&self, model: &SequenceTagger, data: &BatchBuilder) -> f32 {
        let mut total_loss = 0.0;
        let mut num_batches = 0usize;

        for batch in data.ordered_pass() {
            let trace = model.forward(&batch.tokens, &batch.lengths);
            let out = masked_cross_entropy(trace.logits(), &batch.tags, &batch.lengths);
            total_loss += out.loss;
            num_batches += 1;
        }

        if num_batches > 0 {
            total_loss / num_batches as f32
        } else {
            0.0
        }
    }
}
