//! Optimizers and gradient clipping.

use crate::model::Param;

/// Trait for optimization algorithms.
///
/// The parameter list must keep a stable order across steps; per-parameter
/// optimizer state is indexed by position.
pub trait Optimizer {
    /// Apply one update from the accumulated gradients.
    fn step(&mut self, params: &mut [&mut Param]);

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

/// SGD with optional momentum.
pub struct Sgd {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<ndarray::Array1<f32>>>,
}

impl Sgd {
    /// Create a new SGD optimizer.
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    fn ensure_velocities(&mut self, n: usize) {
        if self.velocities.len() != n {
            self.velocities = (0..n).map(|_| None).collect();
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut Param]) {
        self.ensure_velocities(params.len());

        for (i, param) in params.iter_mut().enumerate() {
            if self.momentum > 0.0 {
                let velocity = self.velocities[i]
                    .get_or_insert_with(|| ndarray::Array1::zeros(param.len()));
                // v = momentum * v - lr * grad; param += v
                *velocity *= self.momentum;
                velocity.scaled_add(-self.lr, param.grad());
                let update = velocity.clone();
                *param.data_mut() += &update;
            } else {
                let grad = param.grad().clone();
                param.data_mut().scaled_add(-self.lr, &grad);
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}

/// Scale all gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(params: &mut [&mut Param], max_norm: f32) -> f32 {
    let total: f32 = params
        .iter()
        .map(|p| p.grad().iter().map(|g| g * g).sum::<f32>())
        .sum();
    let norm = total.sqrt();

    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for param in params.iter_mut() {
            param.scale_grad(scale);
        }
    }

    norm
}
