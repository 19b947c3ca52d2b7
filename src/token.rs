//! Token stream types
//!
//! The engine reports its work as a flat, ordered stream of [`Token`]s. Each
//! token is a byte span of the original input plus an optional category label
//! assigned by the grammar. Concatenating the token texts in order always
//! reproduces the input exactly; rendering layers rely on that.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A classified span of input text.
///
/// `span` addresses the original input in byte offsets and `text` is the
/// exact slice it covers. `category` is the grammar-assigned label
/// (`"keyword"`, `"string"`, `"title.class"`, ...) or `None` for plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Byte range of this token in the input
    pub span: Range<usize>,
    /// The text the span covers
    pub text: String,
    /// Category label, or `None` for unclassified text
    pub category: Option<String>,
}

impl Token {
    /// Create a token. Mostly useful when building expected values in tests.
    pub fn new(span: Range<usize>, text: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            span,
            text: text.into(),
            category: category.map(str::to_string),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(category) => write!(f, "{:?} ({})", self.text, category),
            None => write!(f, "{:?}", self.text),
        }
    }
}

/// Ordered token stream covering an entire input.
///
/// Beyond the tokens themselves the stream carries the accumulated relevance
/// score (how strongly the input resembled the grammar) and a `truncated`
/// marker set when a depth or step cap degraded part of the output to plain
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStream {
    tokens: Vec<Token>,
    relevance: u32,
    truncated: bool,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<Token>, relevance: u32, truncated: bool) -> Self {
        Self {
            tokens,
            relevance,
            truncated,
        }
    }

    /// The tokens, in input order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Consume the stream and take ownership of the tokens.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Number of tokens in the stream.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the stream holds no tokens (empty input).
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Accumulated relevance score.
    pub fn relevance(&self) -> u32 {
        self.relevance
    }

    /// True when a depth or step cap forced part of the output to plain text.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Reconstruct the input by concatenating token texts.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Iterate over the tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Serialize the stream as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl IntoIterator for TokenStream {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

/// Builds the token stream while the engine runs.
///
/// The emitter tracks the stack of open categories and a region serial so
/// that consecutive fragments flushed out of one grammar region fuse into a
/// single token, while identically-categorized text from *different* regions
/// stays separate. Every push must continue exactly where the previous one
/// ended; the stream is contiguous by construction.
pub(crate) struct Emitter<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    scopes: Vec<String>,
    serial: u64,
    last_serial: u64,
    next_offset: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: Vec::new(),
            scopes: Vec::new(),
            serial: 0,
            last_serial: u64::MAX,
            next_offset: 0,
        }
    }

    /// Open a category scope. Text emitted while the scope is on top carries
    /// its category.
    pub(crate) fn open(&mut self, category: &str) {
        self.scopes.push(category.to_string());
        self.serial += 1;
    }

    /// Close the innermost category scope.
    pub(crate) fn close(&mut self) {
        self.scopes.pop();
        self.serial += 1;
    }

    /// Emit `span` under the innermost open category.
    pub(crate) fn text(&mut self, span: Range<usize>) {
        let category = self.scopes.last().cloned();
        self.push(span, category);
    }

    /// Emit `span` with an explicit category, bypassing the scope stack.
    pub(crate) fn keyword(&mut self, span: Range<usize>, category: &str) {
        self.push(span, Some(category.to_string()));
    }

    /// Emit `span` as plain text regardless of open scopes. Used when a cap
    /// degrades classification.
    pub(crate) fn plain(&mut self, span: Range<usize>) {
        self.serial += 1;
        self.push(span, None);
        self.serial += 1;
    }

    /// Splice a delegated stream in, translating spans by `offset` into the
    /// host coordinate space.
    pub(crate) fn splice(&mut self, tokens: Vec<Token>, offset: usize) {
        self.serial += 1;
        for token in tokens {
            let span = token.span.start + offset..token.span.end + offset;
            debug_assert_eq!(span.start, self.next_offset, "spliced stream must stay contiguous");
            self.next_offset = span.end;
            self.tokens.push(Token {
                span,
                text: token.text,
                category: token.category,
            });
        }
        self.last_serial = self.serial;
        self.serial += 1;
    }

    fn push(&mut self, span: Range<usize>, category: Option<String>) {
        if span.start >= span.end {
            return;
        }
        debug_assert_eq!(span.start, self.next_offset, "token stream must stay contiguous");
        self.next_offset = span.end;
        let text = &self.input[span.clone()];
        if self.last_serial == self.serial {
            if let Some(last) = self.tokens.last_mut() {
                if last.category == category && last.span.end == span.start {
                    last.span.end = span.end;
                    last.text.push_str(text);
                    return;
                }
            }
        }
        self.tokens.push(Token {
            span,
            text: text.to_string(),
            category,
        });
        self.last_serial = self.serial;
    }

    pub(crate) fn finish(self) -> Vec<Token> {
        self.tokens
    }
}
