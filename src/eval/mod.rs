//! Span-level evaluation.
//!
//! The trainer only ever talks to the [`SpanScorer`] contract: parallel flat
//! sequences of true and predicted tag strings in, precision/recall/F1 over
//! reconstructed entity spans out. [`BioScorer`] is the bundled
//! implementation for the B-/I-/O scheme.
//!
//! Padding discipline lives here too: [`collect_tags`] crops every row to
//! its true length before decoding, so padded positions never leak into the
//! scorer and cannot inflate the no-entity count.

mod bio;
mod predict;

pub use bio::BioScorer;
pub use predict::predict_batch;

use crate::batch::BatchBuilder;
use crate::error::Result;
use crate::model::TagScorer;
use crate::vocab::Vocab;

/// Precision, recall and F1 over entity spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanScore {
    /// Fraction of predicted spans that are correct.
    pub precision: f64,
    /// Fraction of true spans that were found.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

/// Scores parallel flat tag sequences over reconstructed entity spans.
pub trait SpanScorer {
    /// Score `y_pred` against `y_true`; the sequences must have equal
    /// length.
    fn score(&self, y_true: &[String], y_pred: &[String]) -> Result<SpanScore>;

    /// Human-readable per-entity report for the same inputs.
    fn report(&self, y_true: &[String], y_pred: &[String]) -> Result<String>;
}

/// Flat true and predicted tag strings for one ordered pass, padding
/// stripped via the batch length vectors.
pub fn collect_tags<M: TagScorer>(
    model: &M,
    data: &BatchBuilder,
    tag_vocab: &Vocab,
) -> (Vec<String>, Vec<String>) {
    let mut y_true = Vec::new();
    let mut y_pred = Vec::new();

    for batch in data.ordered_pass() {
        let predictions = predict_batch(model, &batch, tag_vocab);
        for (r, row_pred) in predictions.into_iter().enumerate() {
            let len = batch.lengths[r];
            let true_ids: Vec<u32> = batch.tags.row(r).iter().take(len).copied().collect();
            y_true.extend(tag_vocab.decode(&true_ids).into_iter().map(String::from));
            y_pred.extend(row_pred);
        }
    }

    (y_true, y_pred)
}

/// Run one ordered pass and score it with `scorer`.
pub fn evaluate_corpus<M: TagScorer, S: SpanScorer>(
    model: &M,
    data: &BatchBuilder,
    tag_vocab: &Vocab,
    scorer: &S,
) -> Result<SpanScore> {
    let (y_true, y_pred) = collect_tags(model, data, tag_vocab);
    scorer.score(&y_true, &y_pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchConfig;
    use crate::corpus::{Corpus, Example};
    use crate::vocab::{TAG_RESERVED, TOKEN_RESERVED};
    use ndarray::Array2;

    /// Scorer stand-in that always predicts class 0.
    struct ZeroScorer {
        classes: usize,
    }

    impl TagScorer for ZeroScorer {
        fn scores(&self, tokens: &Array2<u32>, _lengths: &[usize]) -> Array2<f32> {
            let mut scores = Array2::zeros((tokens.len(), self.classes));
            scores.column_mut(0).fill(1.0);
            scores
        }

        fn n_classes(&self) -> usize {
            self.classes
        }
    }

    #[test]
    fn test_collect_tags_strips_padding() {
        let corpus = Corpus::from_examples(vec![
            Example::new(
                vec!["a".into(), "b".into(), "c".into()],
                vec!["O".into(), "B-x".into(), "O".into()],
            )
            .unwrap(),
            Example::new(vec!["d".into()], vec!["O".into()]).unwrap(),
        ]);
        let tokens = Vocab::build(corpus.token_groups(), &TOKEN_RESERVED);
        let tags = Vocab::build(corpus.tag_groups(), &TAG_RESERVED);
        let builder = BatchBuilder::new(
            &corpus,
            &tokens,
            &tags,
            BatchConfig {
                batch_size: 2,
                shuffle: false,
                allow_smaller_last: true,
            },
        )
        .unwrap();

        let model = ZeroScorer { classes: tags.len() };
        let (y_true, y_pred) = collect_tags(&model, &builder, &tags);

        // 3 + 1 real positions, padding gone
        assert_eq!(y_true.len(), 4);
        assert_eq!(y_pred.len(), 4);
        assert_eq!(y_true, vec!["O", "B-x", "O", "O"]);
        assert!(y_pred.iter().all(|t| t == "O"));
    }

    #[test]
    fn test_evaluate_corpus_scores_all_outside_as_zero_f1() {
        let corpus = Corpus::from_examples(vec![Example::new(
            vec!["a".into(), "b".into()],
            vec!["B-x".into(), "O".into()],
        )
        .unwrap()]);
        let tokens = Vocab::build(corpus.token_groups(), &TOKEN_RESERVED);
        let tags = Vocab::build(corpus.tag_groups(), &TAG_RESERVED);
        let builder =
            BatchBuilder::new(&corpus, &tokens, &tags, BatchConfig::default()).unwrap();

        let model = ZeroScorer { classes: tags.len() };
        let score = evaluate_corpus(&model, &builder, &tags, &BioScorer).unwrap();
        assert_eq!(score.f1, 0.0);
        assert_eq!(score.recall, 0.0);
    }
}
