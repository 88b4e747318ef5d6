//! Single-direction LSTM over one sequence.
//!
//! Gate order in the stacked pre-activation is `i, f, g, o`:
//!
//! ```text
//! pre = W_x·x + W_h·h⁻ + b
//! i = σ(pre[0..H])    f = σ(pre[H..2H])
//! g = tanh(pre[2H..3H])    o = σ(pre[3H..4H])
//! c = f∘c⁻ + i∘g    h = o∘tanh(c)
//! ```
//!
//! [`Lstm::forward`] caches per-step activations in an [`LstmTrace`];
//! [`Lstm::backward`] walks the trace in reverse, accumulates parameter
//! gradients, and returns the gradient with respect to every input vector.

use ndarray::{s, Array1};
use rand::Rng;

use super::{sigmoid, Param};

/// LSTM parameters for one direction.
pub struct Lstm {
    w_x: Param, // (4H, D)
    w_h: Param, // (4H, H)
    b: Param,   // (4H, 1)
    input: usize,
    hidden: usize,
}

struct LstmStep {
    x: Array1<f32>,
    h_prev: Array1<f32>,
    c_prev: Array1<f32>,
    i: Array1<f32>,
    f: Array1<f32>,
    g: Array1<f32>,
    o: Array1<f32>,
    tanh_c: Array1<f32>,
    h: Array1<f32>,
}

/// Cached activations of one forward run, consumed by backpropagation.
pub struct LstmTrace {
    steps: Vec<LstmStep>,
}

impl LstmTrace {
    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for a zero-length trace.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Hidden state at step `t`.
    pub fn hidden(&self, t: usize) -> &Array1<f32> {
        &self.steps[t].h
    }
}

impl Lstm {
    /// New LSTM with uniform init scaled by `1/sqrt(hidden)`.
    pub fn new<R: Rng>(input: usize, hidden: usize, rng: &mut R) -> Self {
        let scale = (1.0 / hidden as f32).sqrt();
        Self {
            w_x: Param::uniform(4 * hidden, input, scale, rng),
            w_h: Param::uniform(4 * hidden, hidden, scale, rng),
            b: Param::zeros(4 * hidden, 1),
            input,
            hidden,
        }
    }

    /// Hidden state size.
    pub fn hidden_dim(&self) -> usize {
        self.hidden
    }

    /// Input vector size.
    pub fn input_dim(&self) -> usize {
        self.input
    }

    /// Run the cell over `inputs`, starting from zero states.
    pub fn forward(&self, inputs: &[Array1<f32>]) -> LstmTrace {
        let h_dim = self.hidden;
        let mut h = Array1::zeros(h_dim);
        let mut c = Array1::zeros(h_dim);
        let mut steps = Vec::with_capacity(inputs.len());

        for x in inputs {
            debug_assert_eq!(x.len(), self.input);
            let mut pre = self.w_x.matvec(x) + self.w_h.matvec(&h);
            pre += self.b.vec();

            let i = pre.slice(s![0..h_dim]).mapv(sigmoid);
            let f = pre.slice(s![h_dim..2 * h_dim]).mapv(sigmoid);
            let g = pre.slice(s![2 * h_dim..3 * h_dim]).mapv(f32::tanh);
            let o = pre.slice(s![3 * h_dim..4 * h_dim]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f32::tanh);
            let h_next = &o * &tanh_c;

            steps.push(LstmStep {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
                h: h_next.clone(),
            });

            h = h_next;
            c = c_next;
        }

        LstmTrace { steps }
    }

    /// Backpropagate through the trace.
    ///
    /// `dh` holds the loss gradient with respect to each step's hidden
    /// state as seen from the layers above; the recurrent chain is handled
    /// internally. Parameter gradients accumulate in place; the return
    /// value is the gradient with respect to each input vector.
    pub fn backward(&mut self, trace: &LstmTrace, dh: &[Array1<f32>]) -> Vec<Array1<f32>> {
        debug_assert_eq!(trace.len(), dh.len());
        let h_dim = self.hidden;
        let mut dxs = vec![Array1::zeros(self.input); trace.len()];
        let mut dh_next = Array1::zeros(h_dim);
        let mut dc_next: Array1<f32> = Array1::zeros(h_dim);

        for t in (0..trace.len()).rev() {
            let step = &trace.steps[t];
            let dh_t = &dh[t] + &dh_next;

            // h = o ∘ tanh(c)
            let d_o = &dh_t * &step.tanh_c;
            let dc = &dc_next + &(&dh_t * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v));

            // c = f ∘ c⁻ + i ∘ g
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            let d_f = &dc * &step.c_prev;
            dc_next = &dc * &step.f;

            // through the gate nonlinearities
            let dpre_i = &d_i * &step.i.mapv(|v| v * (1.0 - v));
            let dpre_f = &d_f * &step.f.mapv(|v| v * (1.0 - v));
            let dpre_g = &d_g * &step.g.mapv(|v| 1.0 - v * v);
            let dpre_o = &d_o * &step.o.mapv(|v| v * (1.0 - v));

            let mut dpre = Array1::zeros(4 * h_dim);
            dpre.slice_mut(s![0..h_dim]).assign(&dpre_i);
            dpre.slice_mut(s![h_dim..2 * h_dim]).assign(&dpre_f);
            dpre.slice_mut(s![2 * h_dim..3 * h_dim]).assign(&dpre_g);
            dpre.slice_mut(s![3 * h_dim..4 * h_dim]).assign(&dpre_o);

            dxs[t] = self.w_x.matvec_t(&dpre);
            dh_next = self.w_h.matvec_t(&dpre);

            self.w_x.add_outer(&dpre, &step.x);
            self.w_h.add_outer(&dpre, &step.h_prev);
            self.b.add_grad(&dpre);
        }

        dxs
    }

    /// Parameters in stable order, for the optimizer.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.w_x, &mut self.w_h, &mut self.b]
    }
}
