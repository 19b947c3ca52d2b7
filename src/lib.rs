//! # glint
//!
//! A grammar-driven tokenizer for syntax highlighting.
//!
//! Grammars describe a language as a tree of modes: patterns that tell the
//! engine where a construct begins and ends, which words are keywords, and
//! what may nest inside. The engine walks input once with a cursor and a
//! mode stack and produces a flat stream of categorized tokens that tiles
//! the input exactly.
//!
//! ## Usage
//!
//! ```rust
//! let stream = glint::tokenize("java", "int x = 42;").unwrap();
//! for token in &stream {
//!     println!("{:?}: {}", token.category, token.text);
//! }
//! ```
//!
//! The bundled grammars live in [`grammars`]; custom grammars are plain
//! [`Grammar`] values built from [`Mode`]s and registered in a
//! [`GrammarRegistry`].

pub mod compile;
pub mod engine;
pub mod grammar;
pub mod grammars;
pub mod keywords;
pub mod pattern;
pub mod registry;
pub mod token;

pub use compile::{compile, CompiledGrammar, GrammarError};
pub use engine::{TokenizeError, TokenizeOptions};
pub use grammar::{Begin, Child, Grammar, Mode, Part};
pub use keywords::Keywords;
pub use registry::{global, install, GrammarRegistry};
pub use token::{Token, TokenStream};

/// Tokenize `input` with a grammar from the global registry, under default
/// options.
pub fn tokenize(grammar: &str, input: &str) -> Result<TokenStream, TokenizeError> {
    registry::global().tokenize(grammar, input)
}

/// Tokenize `input` with a grammar from the global registry.
pub fn tokenize_with(
    grammar: &str,
    input: &str,
    options: &TokenizeOptions,
) -> Result<TokenStream, TokenizeError> {
    registry::global().tokenize_with(grammar, input, options)
}
