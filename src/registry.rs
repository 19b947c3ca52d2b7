//! Grammar registration and lookup
//!
//! A registry owns compiled grammars and resolves the names that delegating
//! modes and callers use. Grammars register once and are shared behind
//! `Arc`, so lookups hand out cheap clones that scans can hold across
//! threads.
//!
//! The crate ships a process-wide registry preloaded with the bundled
//! grammars. Embedders that want full control build their own
//! [`GrammarRegistry`] and either pass it around or [`install`] it as the
//! global one before first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::compile::{compile, CompiledGrammar, GrammarError};
use crate::engine::{tokenize, TokenizeError, TokenizeOptions};
use crate::grammar::Grammar;
use crate::token::TokenStream;

/// Compiled grammars indexed by name and alias.
///
/// Names are matched case-insensitively. Registering a grammar under a name
/// that is already taken replaces the earlier entry.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: HashMap<String, Arc<CompiledGrammar>>,
    names: Vec<String>,
    /// Aliases filed per canonical name, so replacing a grammar can retire
    /// the aliases the old one claimed.
    aliases: HashMap<String, Vec<String>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `grammar` and file it under its name and every alias.
    pub fn register(&mut self, grammar: &Grammar) -> Result<(), GrammarError> {
        let compiled = Arc::new(compile(grammar)?);
        let name = compiled.name().to_lowercase();
        if let Some(stale) = self.aliases.remove(&name) {
            for alias in stale {
                self.grammars.remove(&alias);
            }
        }
        if !self.names.contains(&name) {
            self.names.push(name.clone());
        }
        let mut aliases = Vec::with_capacity(compiled.aliases().len());
        for alias in compiled.aliases() {
            let alias = alias.to_lowercase();
            self.grammars.insert(alias.clone(), Arc::clone(&compiled));
            aliases.push(alias);
        }
        if !aliases.is_empty() {
            self.aliases.insert(name.clone(), aliases);
        }
        self.grammars.insert(name, compiled);
        Ok(())
    }

    /// Look up a grammar by name or alias.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledGrammar>> {
        self.grammars.get(&name.to_lowercase()).cloned()
    }

    /// Canonical names of every registered grammar, sorted. Aliases are not
    /// listed.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Tokenize `input` with the named grammar under default options.
    pub fn tokenize(&self, name: &str, input: &str) -> Result<TokenStream, TokenizeError> {
        self.tokenize_with(name, input, &TokenizeOptions::default())
    }

    /// Tokenize `input` with the named grammar.
    pub fn tokenize_with(
        &self,
        name: &str,
        input: &str,
        options: &TokenizeOptions,
    ) -> Result<TokenStream, TokenizeError> {
        let grammar = self
            .get(name)
            .ok_or_else(|| TokenizeError::UnknownGrammar(name.to_string()))?;
        tokenize(&grammar, self, input, options)
    }
}

static GLOBAL: OnceLock<GrammarRegistry> = OnceLock::new();

/// The process-wide registry, preloaded with the bundled grammars on first
/// use.
pub fn global() -> &'static GrammarRegistry {
    GLOBAL.get_or_init(|| {
        let mut registry = GrammarRegistry::new();
        registry
            .register(&crate::grammars::java())
            .expect("bundled java grammar compiles");
        registry
            .register(&crate::grammars::xml())
            .expect("bundled xml grammar compiles");
        registry
    })
}

/// Replace the default global registry with a caller-built one. Fails once
/// any call has touched the global registry, including this one succeeding
/// earlier.
pub fn install(registry: GrammarRegistry) -> Result<(), AlreadyInitialized> {
    GLOBAL.set(registry).map_err(|_| AlreadyInitialized)
}

/// The global registry was already initialized when [`install`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyInitialized;

impl fmt::Display for AlreadyInitialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the global grammar registry is already initialized")
    }
}

impl std::error::Error for AlreadyInitialized {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Mode;

    fn demo_grammar() -> Grammar {
        Grammar::new(
            "Demo",
            Mode {
                contains: vec![Mode {
                    category: Some("string".to_string()),
                    begin: Some("\"".into()),
                    end: Some("\"".to_string()),
                    ..Mode::default()
                }
                .into()],
                ..Mode::default()
            },
        )
        .with_aliases(&["dm", "demoscript"])
    }

    #[test]
    fn test_lookup_by_name_and_alias_is_case_insensitive() {
        let mut registry = GrammarRegistry::new();
        registry.register(&demo_grammar()).unwrap();
        assert!(registry.get("demo").is_some());
        assert!(registry.get("Demo").is_some());
        assert!(registry.get("DM").is_some());
        assert!(registry.get("demoscript").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_names_lists_canonical_names_sorted() {
        let mut registry = GrammarRegistry::new();
        registry.register(&demo_grammar()).unwrap();
        registry
            .register(&Grammar::new("Alpha", Mode::default()))
            .unwrap();
        assert_eq!(registry.names(), vec!["alpha", "demo"]);
    }

    #[test]
    fn test_tokenize_unknown_name_fails() {
        let registry = GrammarRegistry::new();
        let err = registry.tokenize("ghost", "input").unwrap_err();
        assert_eq!(err, TokenizeError::UnknownGrammar("ghost".to_string()));
    }

    #[test]
    fn test_tokenize_resolves_through_alias() {
        let mut registry = GrammarRegistry::new();
        registry.register(&demo_grammar()).unwrap();
        let stream = registry.tokenize("dm", "a \"b\" c").unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.tokens()[1].category.as_deref(), Some("string"));
    }

    #[test]
    fn test_reregistering_a_name_replaces_the_grammar() {
        let mut registry = GrammarRegistry::new();
        registry.register(&demo_grammar()).unwrap();
        registry
            .register(&Grammar::new("demo", Mode::default()))
            .unwrap();
        let stream = registry.tokenize("demo", "say \"hi\"").unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(registry.names(), vec!["demo"]);
    }

    #[test]
    fn test_replacing_a_grammar_retires_its_old_aliases() {
        let mut registry = GrammarRegistry::new();
        registry.register(&demo_grammar()).unwrap();
        registry
            .register(&Grammar::new("demo", Mode::default()).with_aliases(&["d2"]))
            .unwrap();
        assert!(registry.get("dm").is_none());
        assert!(registry.get("demoscript").is_none());
        assert!(registry.get("d2").is_some());
        let stream = registry.tokenize("d2", "say \"hi\"").unwrap();
        assert_eq!(stream.len(), 1);
    }
}
