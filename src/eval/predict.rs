//! Decoding per-position scores back to tag strings.

use crate::batch::Batch;
use crate::model::TagScorer;
use crate::vocab::Vocab;

/// Predicted tag strings for every row of a batch.
///
/// Each row is cropped to its true length *before* decoding, so padded
/// positions never produce tags. The argmax ties break toward the lowest
/// class id.
pub fn predict_batch<M: TagScorer>(model: &M, batch: &Batch, tag_vocab: &Vocab) -> Vec<Vec<String>> {
    let scores = model.scores(&batch.tokens, &batch.lengths);
    let max_len = batch.max_len();

    (0..batch.rows())
        .map(|r| {
            let len = batch.lengths[r].min(max_len);
            (0..len)
                .map(|p| {
                    let row = scores.row(r * max_len + p);
                    let mut best = 0usize;
                    let mut best_score = f32::NEG_INFINITY;
                    for (class, &score) in row.iter().enumerate() {
                        if score > best_score {
                            best = class;
                            best_score = score;
                        }
                    }
                    tag_vocab
                        .symbol(best as u32)
                        .unwrap_or_else(|| tag_vocab.symbols()[0].as_str())
                        .to_string()
                })
                .collect()
        })
        .collect()
}
