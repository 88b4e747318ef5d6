//! etiquetar — sequence-labeling trainer for social-media NER
//!
//! Reads pre-tokenized `token<TAB>tag` partitions, builds reserved-first
//! vocabularies, assembles padded mini-batches with true-length bookkeeping,
//! and trains a small bidirectional LSTM tagger with masked cross-entropy.
//! Predictions are scored at the span level through the [`eval::SpanScorer`]
//! contract.
//!
//! # Example
//!
//! ```no_run
//! use etiquetar::batch::{BatchBuilder, BatchConfig};
//! use etiquetar::corpus::read_corpus;
//! use etiquetar::vocab::{Vocab, TAG_RESERVED, TOKEN_RESERVED};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! fn example() -> etiquetar::Result<()> {
//!     let mut corpus = read_corpus("data/train.txt")?;
//!     corpus.normalize();
//!
//!     let tokens = Vocab::build(corpus.token_groups(), &TOKEN_RESERVED);
//!     let tags = Vocab::build(corpus.tag_groups(), &TAG_RESERVED);
//!
//!     let builder = BatchBuilder::new(&corpus, &tokens, &tags, BatchConfig::default())?;
//!     let mut rng = StdRng::seed_from_u64(42);
//!     for batch in builder.pass(&mut rng) {
//!         println!("{} rows, max len {}", batch.rows(), batch.max_len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod model;
pub mod train;
pub mod vocab;

pub use batch::{Batch, BatchBuilder, BatchConfig};
pub use corpus::{Corpus, Example};
pub use error::{Error, Result};
pub use vocab::Vocab;
