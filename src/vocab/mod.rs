//! Vocabulary construction and sequence encoding.
//!
//! A [`Vocab`] is a bijective mapping between symbols and dense `u32` ids.
//! Reserved symbols are assigned ids `0..reserved.len()` in the order given;
//! every other distinct symbol gets the next id in order of first appearance
//! across the whole input. The first reserved symbol doubles as the fallback
//! for lookups of symbols that were never seen, so id 0 is the sentinel by
//! contract.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Symbol id type
pub type SymbolId = u32;

/// Id returned by [`Vocab::lookup`] for symbols absent from the vocabulary.
pub const FALLBACK_ID: SymbolId = 0;

/// Placeholder for tokens never seen during vocabulary construction.
pub const UNK_TOKEN: &str = "<UNK>";

/// Placeholder filling unused trailing positions of a padded batch row.
pub const PAD_TOKEN: &str = "<PAD>";

/// The no-entity tag of the B-/I-/O scheme.
pub const OUTSIDE_TAG: &str = "O";

/// Reserved token symbols, unknown first so it lands on id 0.
pub const TOKEN_RESERVED: [&str; 2] = [UNK_TOKEN, PAD_TOKEN];

/// Reserved tag symbols: the no-entity tag takes id 0.
pub const TAG_RESERVED: [&str; 1] = [OUTSIDE_TAG];

/// Immutable symbol <-> id mapping.
///
/// Built once from a training-time corpus and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Vocab {
    index: HashMap<String, SymbolId>,
    symbols: Vec<String>,
}

impl Vocab {
    /// Build a vocabulary from groups of symbols plus an ordered reserved list.
    ///
    /// Pure over its inputs: reserved symbols first, then the remaining
    /// distinct symbols in order of first appearance across all groups.
    pub fn build<'a, I>(groups: I, reserved: &[&str]) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut vocab = Self {
            index: HashMap::new(),
            symbols: Vec::new(),
        };

        for symbol in reserved {
            vocab.intern(symbol);
        }
        for group in groups {
            for symbol in group {
                vocab.intern(symbol);
            }
        }

        vocab
    }

    fn intern(&mut self, symbol: &str) -> SymbolId {
        if let Some(&id) = self.index.get(symbol) {
            return id;
        }
        let id = self.symbols.len() as SymbolId;
        self.index.insert(symbol.to_string(), id);
        self.symbols.push(symbol.to_string());
        id
    }

    /// Id for `symbol`, or [`FALLBACK_ID`] if it was never seen.
    ///
    /// The fallback is explicit: callers that must distinguish a miss from
    /// the id-0 symbol use [`Vocab::get`] instead.
    pub fn lookup(&self, symbol: &str) -> SymbolId {
        self.get(symbol).unwrap_or(FALLBACK_ID)
    }

    /// Id for `symbol`, if present.
    pub fn get(&self, symbol: &str) -> Option<SymbolId> {
        self.index.get(symbol).copied()
    }

    /// Symbol for `id`, if assigned.
    pub fn symbol(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }

    /// Number of distinct symbols, reserved included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// True when no symbols have been assigned.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in id order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Encode a sequence; unseen symbols map to [`FALLBACK_ID`].
    pub fn encode<S: AsRef<str>>(&self, sequence: &[S]) -> Vec<SymbolId> {
        sequence.iter().map(|s| self.lookup(s.as_ref())).collect()
    }

    /// Encode a sequence, failing on the first unseen symbol.
    ///
    /// Used for tags: a tag vocabulary is exhaustive over the corpus it was
    /// built from, so a miss means the caller encoded against the wrong
    /// vocabulary.
    pub fn encode_strict<S: AsRef<str>>(&self, sequence: &[S]) -> Result<Vec<SymbolId>> {
        sequence
            .iter()
            .map(|s| {
                let symbol = s.as_ref();
                self.get(symbol)
                    .ok_or_else(|| Error::UnknownTag(symbol.to_string()))
            })
            .collect()
    }

    /// Decode an id sequence; unassigned ids decode to the id-0 symbol.
    pub fn decode(&self, ids: &[SymbolId]) -> Vec<&str> {
        ids.iter()
            .map(|&id| {
                self.symbol(id)
                    .unwrap_or_else(|| self.symbols[FALLBACK_ID as usize].as_str())
            })
            .collect()
    }
}
