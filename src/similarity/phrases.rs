//! Phrase merging for multi-word ingredient terms.
//!
//! Known bigrams are joined into a single `a_b` token before scoring, so that
//! "olive oil" compares as one concept rather than as "olive" and "oil".

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

/// Delimiter used to join merged phrase tokens.
pub const PHRASE_DELIMITER: &str = "_";

/// A frozen table of known bigram phrases.
#[derive(Debug, Clone, Default)]
pub struct PhraseTable {
    bigrams: HashSet<(String, String)>,
}

impl PhraseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bigrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bigrams.is_empty()
    }

    pub fn insert(&mut self, first: &str, second: &str) {
        self.bigrams
            .insert((first.to_lowercase(), second.to_lowercase()));
    }

    pub fn contains(&self, first: &str, second: &str) -> bool {
        self.bigrams
            .contains(&(first.to_string(), second.to_string()))
    }

    /// Merge adjacent known bigrams, scanning left to right.
    ///
    /// A token consumed by a merge is not considered for the next pair, so
    /// "a b c" with phrases (a,b) and (b,c) yields ["a_b", "c"].
    pub fn apply(&self, tokens: &[&str]) -> Vec<String> {
        let mut merged = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            if i + 1 < tokens.len() && self.contains(tokens[i], tokens[i + 1]) {
                merged.push(format!("{}{PHRASE_DELIMITER}{}", tokens[i], tokens[i + 1]));
                i += 2;
            } else {
                merged.push(tokens[i].to_string());
                i += 1;
            }
        }

        merged
    }

    /// Parse a phrase table: one phrase per line, words separated by a space or `_`.
    ///
    /// Anything after a tab (e.g. a phrase score) is ignored, as are blank lines
    /// and lines starting with `#`. Lines that are not exactly two words are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut table = Self::new();

        for line in reader.lines() {
            let line = line?;
            let phrase = line.split('\t').next().unwrap_or_default().trim();
            if phrase.is_empty() || phrase.starts_with('#') {
                continue;
            }

            let words: Vec<&str> = phrase
                .split(|c: char| c.is_whitespace() || c == '_')
                .filter(|w| !w.is_empty())
                .collect();

            match words.as_slice() {
                [first, second] => table.insert(first, second),
                _ => log::debug!("skipping phrase '{phrase}': not a bigram"),
            }
        }

        Ok(table)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}
