//! Grammar data model
//!
//! A grammar is a tree of [`Mode`]s and nothing else: no callbacks, no code,
//! just patterns, keyword declarations, and structural flags. Grammars are
//! written as struct literals over [`Mode::default`] so definitions read like
//! declarative data, and [`compile`](crate::compile::compile) turns the tree
//! into its immutable runtime form.

use crate::keywords::Keywords;

/// How a mode's entry pattern is declared.
#[derive(Debug, Clone)]
pub enum Begin {
    /// A single pattern source.
    Pattern(String),
    /// An ordered fragment list composed into one pattern. Each fragment may
    /// categorize the text it matches by itself, which is how one match can
    /// yield several differently-labeled tokens.
    Parts(Vec<Part>),
}

impl From<&str> for Begin {
    fn from(source: &str) -> Self {
        Begin::Pattern(source.to_string())
    }
}

impl From<String> for Begin {
    fn from(source: String) -> Self {
        Begin::Pattern(source)
    }
}

/// One fragment of a composite begin pattern.
#[derive(Debug, Clone)]
pub struct Part {
    pub pattern: String,
    pub category: Option<String>,
}

impl Part {
    /// An uncategorized fragment; its text goes through the enclosing mode's
    /// keyword processing.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: None,
        }
    }

    /// A fragment that labels its own text.
    pub fn tagged(pattern: impl Into<String>, category: &str) -> Self {
        Self {
            pattern: pattern.into(),
            category: Some(category.to_string()),
        }
    }
}

/// A child slot in a mode's `contains` list.
#[derive(Debug, Clone)]
pub enum Child {
    Mode(Mode),
    /// The enclosing mode itself, for recursive structure (nested parens,
    /// nested brackets) without writing the mode twice.
    SelfReference,
}

impl From<Mode> for Child {
    fn from(mode: Mode) -> Self {
        Child::Mode(mode)
    }
}

/// One lexical context in a grammar tree.
///
/// Every field has a neutral default so definitions spell out only what they
/// use. A mode with no `begin` starts at any position; a mode with neither
/// `end` nor `ends_with_parent` ends at the first boundary after its begin
/// text.
#[derive(Debug, Clone, Default)]
pub struct Mode {
    /// Category label for text inside this mode
    pub category: Option<String>,
    /// Entry pattern
    pub begin: Option<Begin>,
    /// Exit pattern
    pub end: Option<String>,
    /// Sugar: space-separated words that both begin the mode and populate its
    /// keyword set; a match directly preceded by `.` is ignored
    pub begin_keywords: Option<String>,
    /// Keyword declarations applied to text buffered in this mode
    pub keywords: Option<Keywords>,
    /// Pattern whose match aborts tokenization as a grammar mismatch
    pub illegal: Option<String>,
    /// Child modes, tried in declaration order
    pub contains: Vec<Child>,
    /// Mode to enter immediately after this one ends
    pub starts: Option<Box<Mode>>,
    /// Delegate buffered text to the first registered grammar named here
    pub sub_languages: Vec<String>,
    /// Expand this mode into one sibling per variant (field-level overrides)
    pub variants: Vec<Mode>,
    /// Relevance added when the mode closes cleanly; defaults to 1
    pub relevance: Option<u32>,
    /// Leave the begin text for the new mode's own rules to re-scan
    pub return_begin: bool,
    /// Leave the end text for the parent's rules to re-scan
    pub return_end: bool,
    /// Attribute the begin text to the parent mode instead of this one
    pub exclude_begin: bool,
    /// Attribute the end text to the parent mode instead of this one
    pub exclude_end: bool,
    /// When this mode ends, its parent ends with it
    pub ends_parent: bool,
    /// This mode ends wherever its parent would end
    pub ends_with_parent: bool,
}

impl Mode {
    /// Merge `patch` over `base`: fields set on the patch win, everything
    /// else carries over. Boolean flags can be set but not cleared by a
    /// patch, and variants never survive a merge (they are expanded exactly
    /// where the mode is used).
    pub fn inherit(base: &Mode, patch: Mode) -> Mode {
        Mode {
            category: patch.category.or_else(|| base.category.clone()),
            begin: patch.begin.or_else(|| base.begin.clone()),
            end: patch.end.or_else(|| base.end.clone()),
            begin_keywords: patch.begin_keywords.or_else(|| base.begin_keywords.clone()),
            keywords: patch.keywords.or_else(|| base.keywords.clone()),
            illegal: patch.illegal.or_else(|| base.illegal.clone()),
            contains: if patch.contains.is_empty() {
                base.contains.clone()
            } else {
                patch.contains
            },
            starts: patch.starts.or_else(|| base.starts.clone()),
            sub_languages: if patch.sub_languages.is_empty() {
                base.sub_languages.clone()
            } else {
                patch.sub_languages
            },
            variants: Vec::new(),
            relevance: patch.relevance.or(base.relevance),
            return_begin: patch.return_begin || base.return_begin,
            return_end: patch.return_end || base.return_end,
            exclude_begin: patch.exclude_begin || base.exclude_begin,
            exclude_end: patch.exclude_end || base.exclude_end,
            ends_parent: patch.ends_parent || base.ends_parent,
            ends_with_parent: patch.ends_with_parent || base.ends_with_parent,
        }
    }
}

/// A complete grammar definition: a named, optionally case-insensitive mode
/// tree. The root mode runs from the start of input to its end and must not
/// declare an exit.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: String,
    pub aliases: Vec<String>,
    pub case_insensitive: bool,
    pub root: Mode,
}

impl Grammar {
    pub fn new(name: &str, root: Mode) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            case_insensitive: false,
            root,
        }
    }

    /// Register additional lookup names.
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Compile every pattern (and fold keyword lookups) case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_patch_fields_win() {
        let base = Mode {
            category: Some("string".to_string()),
            begin: Some("'".into()),
            end: Some("'".to_string()),
            relevance: Some(0),
            ..Mode::default()
        };
        let merged = Mode::inherit(
            &base,
            Mode {
                begin: Some(r"\(".into()),
                end: Some(r"\)".to_string()),
                ..Mode::default()
            },
        );
        assert_eq!(merged.category.as_deref(), Some("string"));
        assert!(matches!(merged.begin, Some(Begin::Pattern(ref p)) if p == r"\("));
        assert_eq!(merged.end.as_deref(), Some(r"\)"));
        assert_eq!(merged.relevance, Some(0));
    }

    #[test]
    fn test_inherit_keeps_base_children_when_patch_has_none() {
        let base = Mode {
            contains: vec![Mode::default().into()],
            ..Mode::default()
        };
        let merged = Mode::inherit(&base, Mode::default());
        assert_eq!(merged.contains.len(), 1);
    }

    #[test]
    fn test_inherit_flags_accumulate() {
        let base = Mode {
            ends_with_parent: true,
            ..Mode::default()
        };
        let merged = Mode::inherit(
            &base,
            Mode {
                ends_parent: true,
                ..Mode::default()
            },
        );
        assert!(merged.ends_with_parent);
        assert!(merged.ends_parent);
    }

    #[test]
    fn test_inherit_drops_variants() {
        let base = Mode {
            variants: vec![Mode::default()],
            ..Mode::default()
        };
        let merged = Mode::inherit(&base, Mode::default());
        assert!(merged.variants.is_empty());
    }

    #[test]
    fn test_grammar_builders() {
        let grammar = Grammar::new("xml", Mode::default())
            .with_aliases(&["html", "svg"])
            .case_insensitive();
        assert_eq!(grammar.name, "xml");
        assert_eq!(grammar.aliases, vec!["html", "svg"]);
        assert!(grammar.case_insensitive);
    }
}
