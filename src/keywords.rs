//! Keyword tables
//!
//! Modes can classify bare words without dedicated child modes: buffered text
//! is split with a word pattern and each word is looked up in the mode's
//! keyword table. A hit classifies the word and contributes a relevance
//! weight; everything else stays plain text.

use crate::compile::GrammarError;
use std::collections::HashMap;

/// Word-splitting pattern used when a keyword set does not override it.
pub const DEFAULT_KEYWORD_PATTERN: &str = r"\w+";

/// A single keyword stops accruing relevance after this many hits in one
/// tokenization run.
pub(crate) const MAX_KEYWORD_HITS: u32 = 7;

/// Words so common across languages that a hit says nothing about grammar
/// fit. They classify normally but default to weight 0.
const COMMON_WORDS: &[&str] = &[
    "of", "and", "for", "in", "not", "or", "if", "then", "parent", "list", "value",
];

fn default_weight(word: &str) -> u32 {
    if COMMON_WORDS.contains(&word) {
        0
    } else {
        1
    }
}

/// Keyword declarations for one mode, as grammar data.
///
/// Each class pairs a category with its words; a word may carry an explicit
/// relevance weight as `word|weight`.
#[derive(Debug, Clone, Default)]
pub struct Keywords {
    /// Word-splitting pattern; `None` means [`DEFAULT_KEYWORD_PATTERN`]
    pub pattern: Option<String>,
    /// `(category, words)` groups
    pub classes: Vec<(String, Vec<String>)>,
}

impl Keywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single `keyword` class.
    pub fn keywords<S: AsRef<str>>(words: &[S]) -> Self {
        Self::new().class("keyword", words)
    }

    /// Add a word class.
    pub fn class<S: AsRef<str>>(mut self, category: &str, words: &[S]) -> Self {
        self.classes.push((
            category.to_string(),
            words.iter().map(|w| w.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Override the word-splitting pattern for this set.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }
}

/// A built keyword table: word → (category, weight), O(1) lookups.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    words: HashMap<String, (String, u32)>,
    case_insensitive: bool,
}

impl KeywordTable {
    /// Build a table from declarations. Case-insensitive tables fold both
    /// declarations and lookups to lowercase. Duplicate words keep the last
    /// declaration.
    pub(crate) fn build(keywords: &Keywords, case_insensitive: bool) -> Result<Self, GrammarError> {
        let mut words = HashMap::new();
        for (category, list) in &keywords.classes {
            for raw in list {
                let entry = if case_insensitive {
                    raw.to_lowercase()
                } else {
                    raw.clone()
                };
                let (word, weight_spec) = match entry.split_once('|') {
                    Some((word, spec)) => (word, Some(spec)),
                    None => (entry.as_str(), None),
                };
                if word.is_empty() {
                    return Err(GrammarError::InvalidKeyword {
                        word: raw.clone(),
                        detail: "empty word".to_string(),
                    });
                }
                let weight = match weight_spec {
                    Some(spec) => spec.parse::<u32>().map_err(|_| GrammarError::InvalidKeyword {
                        word: word.to_string(),
                        detail: format!("weight '{}' is not a number", spec),
                    })?,
                    None => default_weight(word),
                };
                words.insert(word.to_string(), (category.clone(), weight));
            }
        }
        Ok(Self {
            words,
            case_insensitive,
        })
    }

    /// Look a word up, folding case when the table is case-insensitive.
    pub fn lookup(&self, word: &str) -> Option<(&str, u32)> {
        let hit = if self.case_insensitive {
            self.words.get(&word.to_lowercase())
        } else {
            self.words.get(word)
        };
        hit.map(|(category, weight)| (category.as_str(), *weight))
    }

    /// Number of words in the table.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the table holds no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
