//! Padded mini-batch construction.
//!
//! [`BatchBuilder`] encodes a corpus once against its vocabularies, then
//! serves passes over it: each [`BatchBuilder::pass`] draws a fresh iteration
//! order (a uniform permutation when shuffling, identity otherwise) and
//! returns a lazy, finite iterator of rectangular [`Batch`]es. A batch pairs
//! a token-id matrix and a tag-id matrix of identical shape with the true
//! length of every row; unused trailing positions hold the pad id and the
//! no-entity id respectively.
//!
//! The pass is single-consumer and abortable: dropping the iterator mid-pass
//! releases everything. Restarting means calling `pass` again, which
//! re-shuffles.

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::corpus::Corpus;
use crate::error::Result;
use crate::vocab::{SymbolId, Vocab, FALLBACK_ID, PAD_TOKEN};

/// Slicing and ordering policy for one pass over the corpus.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Rows per batch; zero yields no batches.
    pub batch_size: usize,
    /// Draw a fresh random permutation per pass.
    pub shuffle: bool,
    /// Emit the short final batch when the corpus size is not a multiple of
    /// the batch size; otherwise the remainder examples are dropped.
    pub allow_smaller_last: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            allow_smaller_last: true,
        }
    }
}

/// One rectangular batch of encoded examples.
///
/// For row `i`, positions `< lengths[i]` hold real ids in original order;
/// positions `>= lengths[i]` hold the pad id (tokens) and the no-entity id
/// (tags). Rows of one batch share no storage with other batches.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Token ids, shape (rows, max length in this batch).
    pub tokens: Array2<SymbolId>,
    /// Tag ids, same shape as `tokens`.
    pub tags: Array2<SymbolId>,
    /// True (unpadded) length of each row.
    pub lengths: Vec<usize>,
}

impl Batch {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.tokens.nrows()
    }

    /// Padded width, the maximum true length in this batch.
    pub fn max_len(&self) -> usize {
        self.tokens.ncols()
    }
}

#[derive(Debug)]
struct EncodedExample {
    tokens: Vec<SymbolId>,
    tags: Vec<SymbolId>,
}

/// Serves padded batches over an encoded corpus.
#[derive(Debug)]
pub struct BatchBuilder {
    examples: Vec<EncodedExample>,
    pad_id: SymbolId,
    tag_fill_id: SymbolId,
    config: BatchConfig,
}

impl BatchBuilder {
    /// Encode `corpus` against the given vocabularies.
    ///
    /// Tokens encode with the unknown-id fallback; tags encode strictly, so
    /// a tag absent from `tag_vocab` fails here rather than mid-pass.
    pub fn new(
        corpus: &Corpus,
        token_vocab: &Vocab,
        tag_vocab: &Vocab,
        config: BatchConfig,
    ) -> Result<Self> {
        let mut examples = Vec::with_capacity(corpus.len());
        for example in corpus {
            examples.push(EncodedExample {
                tokens: token_vocab.encode(example.tokens()),
                tags: tag_vocab.encode_strict(example.tags())?,
            });
        }

        Ok(Self {
            examples,
            pad_id: token_vocab.get(PAD_TOKEN).unwrap_or(FALLBACK_ID),
            tag_fill_id: FALLBACK_ID,
            config,
        })
    }

    /// Number of encoded examples.
    pub fn num_examples(&self) -> usize {
        self.examples.len()
    }

    /// Batches one pass will yield under the configured policy.
    pub fn batches_per_pass(&self) -> usize {
        let b = self.config.batch_size;
        if b == 0 || self.examples.is_empty() {
            return 0;
        }
        let n = self.examples.len();
        let full = n / b;
        if n % b != 0 && self.config.allow_smaller_last {
            full + 1
        } else {
            full
        }
    }

    /// Start one pass over the corpus.
    ///
    /// The iteration order is re-drawn on every call when shuffling is
    /// enabled; nothing is cached across passes.
    pub fn pass<R: Rng>(&self, rng: &mut R) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.examples.len()).collect();
        if self.config.shuffle {
            order.shuffle(rng);
        }
        Batches {
            builder: self,
            order,
            cursor: 0,
        }
    }

    /// Start one pass in corpus order regardless of the shuffle flag.
    ///
    /// Evaluation uses this so predictions line up with the corpus.
    pub fn ordered_pass(&self) -> Batches<'_> {
        Batches {
            builder: self,
            order: (0..self.examples.len()).collect(),
            cursor: 0,
        }
    }

    fn assemble(&self, rows: &[usize]) -> Batch {
        let max_len = rows
            .iter()
            .map(|&i| self.examples[i].tokens.len())
            .max()
            .unwrap_or(0);

        // Pre-fill with the pad/no-entity ids so short rows are padded at
        // construction, not patched up afterwards.
        let mut tokens = Array2::from_elem((rows.len(), max_len), self.pad_id);
        let mut tags = Array2::from_elem((rows.len(), max_len), self.tag_fill_id);
        let mut lengths = Vec::with_capacity(rows.len());

        for (r, &index) in rows.iter().enumerate() {
            let example = &self.examples[index];
            for (c, &id) in example.tokens.iter().enumerate() {
                tokens[[r, c]] = id;
            }
            for (c, &id) in example.tags.iter().enumerate() {
                tags[[r, c]] = id;
            }
            lengths.push(example.tokens.len());
        }

        Batch {
            tokens,
            tags,
            lengths,
        }
    }
}

/// Lazy iterator over the batches of one pass.
pub struct Batches<'a> {
    builder: &'a BatchBuilder,
    order: Vec<usize>,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let b = self.builder.config.batch_size;
        if b == 0 || self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + b).min(self.order.len());
        if end - self.cursor < b && !self.builder.config.allow_smaller_last {
            // Remainder dropped by policy.
            self.cursor = self.order.len();
            return None;
        }

        let slice = &self.order[self.cursor..end];
        self.cursor = end;
        Some(self.builder.assemble(slice))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let b = self.builder.config.batch_size;
        if b == 0 {
            return (0, Some(0));
        }
        let left = self.order.len() - self.cursor.min(self.order.len());
        let full = left / b;
        let remaining = if left % b != 0 && self.builder.config.allow_smaller_last {
            full + 1
        } else {
            full
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}
