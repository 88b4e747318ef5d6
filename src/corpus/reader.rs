//! Partition reader for `token<TAB>tag` files.
//!
//! One token/tag pair per line, blank line between examples, UTF-8. A file
//! without a trailing blank line still closes its final example. Malformed
//! lines abort the load with file/line context by default; callers can opt
//! into skipping them instead, which changes the corpus size and is
//! therefore reported on stderr.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{Corpus, Example};
use crate::error::{Error, Result};

/// Reader behavior on malformed lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Skip malformed lines instead of aborting the load.
    pub skip_malformed: bool,
}

/// Read one partition with default options (malformed lines abort).
pub fn read_corpus(path: impl AsRef<Path>) -> Result<Corpus> {
    read_corpus_with(path, ReaderOptions::default())
}

/// Read one partition with explicit reader options.
pub fn read_corpus_with(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Corpus> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_corpus(BufReader::new(file), path, options)
}

/// Parse a partition from any buffered reader.
///
/// `path` is only used for error context.
pub fn parse_corpus<R: BufRead>(
    reader: R,
    path: impl AsRef<Path>,
    options: ReaderOptions,
) -> Result<Corpus> {
    let path = path.as_ref();
    let mut corpus = Corpus::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush_example(&mut corpus, &mut tokens, &mut tags)?;
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(token), Some(tag), None) => {
                tokens.push(token.to_string());
                tags.push(tag.to_string());
            }
            _ if options.skip_malformed => skipped += 1,
            _ => {
                return Err(Error::MalformedLine {
                    path: path.to_path_buf(),
                    line: index + 1,
                    text: line,
                })
            }
        }
    }

    // EOF closes a trailing example even without a blank line
    flush_example(&mut corpus, &mut tokens, &mut tags)?;

    if skipped > 0 {
        eprintln!("{}: skipped {skipped} malformed line(s)", path.display());
    }

    Ok(corpus)
}

fn flush_example(corpus: &mut Corpus, tokens: &mut Vec<String>, tags: &mut Vec<String>) -> Result<()> {
    if tokens.is_empty() {
        return Ok(());
    }
    corpus.push(Example::new(std::mem::take(tokens), std::mem::take(tags))?);
    Ok(())
}
