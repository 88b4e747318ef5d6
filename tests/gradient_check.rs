//! Finite-difference check of the tagger's backpropagation.
//!
//! For each parameter group, the largest-magnitude analytic gradient entry
//! is compared against a central finite difference of the masked
//! cross-entropy. Small-magnitude entries are skipped; f32 forward noise
//! would dominate their estimates.

use etiquetar::model::{SequenceTagger, TaggerConfig};
use etiquetar::train::masked_cross_entropy;
use ndarray::{arr2, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

const EPSILON: f32 = 1e-2;
const MIN_CHECKED_MAGNITUDE: f32 = 1e-3;
const MAX_RELATIVE_ERROR: f32 = 0.25;

fn batch() -> (Array2<u32>, Array2<u32>, Vec<usize>) {
    let tokens = arr2(&[[2u32, 3, 4], [5, 6, 1]]);
    let tags = arr2(&[[1u32, 0, 2], [0, 1, 0]]);
    (tokens, tags, vec![3, 2])
}

fn loss_of(model: &SequenceTagger, tokens: &Array2<u32>, tags: &Array2<u32>, lengths: &[usize]) -> f32 {
    let trace = model.forward(tokens, lengths);
    masked_cross_entropy(trace.logits(), tags, lengths).loss
}

#[test]
fn test_analytic_gradients_match_finite_differences() {
    let config = TaggerConfig {
        vocab_size: 9,
        n_tags: 3,
        embedding_dim: 4,
        hidden_dim: 3,
    };
    let mut rng = StdRng::seed_from_u64(23);
    let mut model = SequenceTagger::new(config, &mut rng);
    let (tokens, tags, lengths) = batch();

    // analytic gradients
    let trace = model.forward(&tokens, &lengths);
    let out = masked_cross_entropy(trace.logits(), &tags, &lengths);
    model.zero_grad();
    model.backward(&trace, &out.dlogits);
    let analytic: Vec<Vec<f32>> = model
        .params_mut()
        .iter()
        .map(|p| p.grad().to_vec())
        .collect();

    for (group, grads) in analytic.iter().enumerate() {
        // probe the strongest entry of this parameter group
        let (index, &value) = grads
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().partial_cmp(&b.1.abs()).unwrap())
            .unwrap();
        if value.abs() < MIN_CHECKED_MAGNITUDE {
            continue;
        }

        let plus = {
            model.params_mut()[group].data_mut()[index] += EPSILON;
            loss_of(&model, &tokens, &tags, &lengths)
        };
        let minus = {
            model.params_mut()[group].data_mut()[index] -= 2.0 * EPSILON;
            loss_of(&model, &tokens, &tags, &lengths)
        };
        model.params_mut()[group].data_mut()[index] += EPSILON;

        let numeric = (plus - minus) / (2.0 * EPSILON);
        let denom = value.abs().max(numeric.abs()).max(MIN_CHECKED_MAGNITUDE);
        let relative = (numeric - value).abs() / denom;
        assert!(
            relative < MAX_RELATIVE_ERROR,
            "group {group} entry {index}: analytic={value:.6}, numeric={numeric:.6}, relative error={relative:.3}"
        );
    }
}

#[test]
fn test_gradients_are_finite() {
    let config = TaggerConfig {
        vocab_size: 9,
        n_tags: 3,
        embedding_dim: 4,
        hidden_dim: 3,
    };
    let mut rng = StdRng::seed_from_u64(29);
    let mut model = SequenceTagger::new(config, &mut rng);
    let (tokens, tags, lengths) = batch();

    let trace = model.forward(&tokens, &lengths);
    let out = masked_cross_entropy(trace.logits(), &tags, &lengths);
    model.backward(&trace, &out.dlogits);

    assert!(out.loss.is_finite());
    for param in model.params_mut() {
        assert!(param.grad().iter().all(|g| g.is_finite()));
    }
}
