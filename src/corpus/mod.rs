//! Corpus types for labeled token sequences.
//!
//! A [`Corpus`] is an ordered collection of [`Example`]s, each a pair of
//! parallel token and tag sequences. The equal-length invariant is enforced
//! at construction; empty examples are rejected (the reader skips blank
//! groups before they get here).

mod normalize;
mod reader;

pub use normalize::{normalize_token, URL_TOKEN, USR_TOKEN};
pub use reader::{parse_corpus, read_corpus, read_corpus_with, ReaderOptions};

use crate::error::{Error, Result};

/// One labeled example: parallel token and tag sequences of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    tokens: Vec<String>,
    tags: Vec<String>,
}

impl Example {
    /// Create an example, enforcing the parallel-length invariant.
    pub fn new(tokens: Vec<String>, tags: Vec<String>) -> Result<Self> {
        if tokens.len() != tags.len() {
            return Err(Error::Shape(format!(
                "example has {} tokens but {} tags",
                tokens.len(),
                tags.len()
            )));
        }
        if tokens.is_empty() {
            return Err(Error::Shape("example must hold at least one token".into()));
        }
        Ok(Self { tokens, tags })
    }

    /// Token sequence.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tag sequence, parallel to the tokens.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Number of token/tag positions.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false: empty examples cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// An ordered sequence of examples.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    examples: Vec<Example>,
}

impl Corpus {
    /// Empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Corpus from pre-built examples.
    pub fn from_examples(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    /// Append one example.
    pub fn push(&mut self, example: Example) {
        self.examples.push(example);
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// True when the corpus holds no examples.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Examples in corpus order.
    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    /// Iterate examples in corpus order.
    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }

    /// Total token count across all examples.
    pub fn token_count(&self) -> usize {
        self.examples.iter().map(Example::len).sum()
    }

    /// Token sequences, one slice per example, for vocabulary construction.
    pub fn token_groups(&self) -> impl Iterator<Item = &[String]> {
        self.examples.iter().map(|e| e.tokens.as_slice())
    }

    /// Tag sequences, one slice per example, for vocabulary construction.
    pub fn tag_groups(&self) -> impl Iterator<Item = &[String]> {
        self.examples.iter().map(|e| e.tags.as_slice())
    }

    /// Replace URL-like and @-mention-like tokens with their placeholders.
    ///
    /// Applied before vocabulary construction so the placeholders are what
    /// the vocabulary sees.
    pub fn normalize(&mut self) {
        for example in &mut self.examples {
            for token in &mut example.tokens {
                if let Some(replacement) = normalize_token(token) {
                    *token = replacement.to_string();
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}
