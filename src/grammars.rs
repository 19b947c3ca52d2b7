//! Bundled grammar definitions
//!
//! Each grammar is a plain function returning the uncompiled [`Grammar`]
//! value, so callers can register it as-is, tweak it, or mine it for parts.
//! The [`common`] module collects the building blocks most grammars share:
//! string and comment modes, escape sequences, identifier patterns.
//!
//! [`Grammar`]: crate::grammar::Grammar

pub mod common;

mod java;
mod xml;

pub use java::java;
pub use xml::xml;
