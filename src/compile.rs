//! Grammar compilation
//!
//! Turns a [`Grammar`] tree into the flat, immutable form the engine scans
//! with. All sugar is resolved here so the scanning loop only ever sees
//! ready patterns.
//!
//! ## Design
//!
//! 1. **Arena layout**: compiled modes live in a `Vec` indexed by `ModeId`.
//!    A mode's slot is reserved before its children compile, which lets a
//!    `SelfReference` child point back at a mode that is still being built.
//! 2. **Defaults are materialized**: a missing `begin` or `end` becomes the
//!    zero-width boundary pattern, `begin_keywords` becomes a real begin
//!    pattern plus a keyword table, and variants expand into plain siblings.
//! 3. **Validation is eager**: every pattern compiles here, so a bad grammar
//!    fails at registration with an error naming the faulty pattern instead
//!    of surfacing mid-scan.

use std::fmt;

use crate::grammar::{Begin, Child, Grammar, Mode};
use crate::keywords::{KeywordTable, Keywords, DEFAULT_KEYWORD_PATTERN};
use crate::pattern::join_fragments;

/// Index of a mode in its grammar's arena.
pub(crate) type ModeId = usize;

/// Matches zero-width at every position: any position is either a word
/// boundary or not one.
const BOUNDARY: &str = r"\B|\b";

/// Why a grammar failed to compile.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// A pattern source the regex engine rejected.
    InvalidPattern { pattern: String, detail: String },
    /// A keyword entry that cannot be used for lookup.
    InvalidKeyword { word: String, detail: String },
    /// A structurally impossible mode declaration.
    InvalidMode(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::InvalidPattern { pattern, detail } => {
                write!(f, "invalid pattern `{}`: {}", pattern, detail)
            }
            GrammarError::InvalidKeyword { word, detail } => {
                write!(f, "invalid keyword `{}`: {}", word, detail)
            }
            GrammarError::InvalidMode(detail) => write!(f, "invalid mode: {}", detail),
        }
    }
}

impl std::error::Error for GrammarError {}

/// A compiled pattern paired with its source. The source survives for error
/// reporting and tests.
pub(crate) struct CompiledPattern {
    source: String,
    re: onig::Regex,
}

impl CompiledPattern {
    pub(crate) fn compile(source: &str, case_insensitive: bool) -> Result<Self, GrammarError> {
        // CAPTURE_GROUP keeps plain groups capturing even when a grammar
        // pattern mixes in named groups, preserving wrapper group numbers.
        let mut options = onig::RegexOptions::REGEX_OPTION_CAPTURE_GROUP;
        if case_insensitive {
            options |= onig::RegexOptions::REGEX_OPTION_IGNORECASE;
        }
        let re = onig::Regex::with_options(source, options, onig::Syntax::default()).map_err(
            |err| GrammarError::InvalidPattern {
                pattern: source.to_string(),
                detail: err.to_string(),
            },
        )?;
        Ok(Self {
            source: source.to_string(),
            re,
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Leftmost match starting at or after `from`, as byte offsets. The full
    /// haystack is searched so boundary assertions see surrounding text.
    pub(crate) fn find_from(&self, haystack: &str, from: usize) -> Option<(usize, usize)> {
        if from > haystack.len() {
            return None;
        }
        let mut region = onig::Region::new();
        self.re
            .search_with_options(
                haystack,
                from,
                haystack.len(),
                onig::SearchOptions::SEARCH_OPTION_NONE,
                Some(&mut region),
            )
            .and_then(|_| region.pos(0))
    }

    /// Like [`find_from`](Self::find_from) but keeps every capture position.
    pub(crate) fn captures_from(&self, haystack: &str, from: usize) -> Option<onig::Region> {
        if from > haystack.len() {
            return None;
        }
        let mut region = onig::Region::new();
        self.re
            .search_with_options(
                haystack,
                from,
                haystack.len(),
                onig::SearchOptions::SEARCH_OPTION_NONE,
                Some(&mut region),
            )
            .map(|_| region)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPattern").field(&self.source).finish()
    }
}

/// One node of a compiled grammar, read directly by the engine.
#[derive(Debug)]
pub(crate) struct CompiledMode {
    pub(crate) category: Option<String>,
    pub(crate) begin: CompiledPattern,
    /// Wrapper capture group and category of each composite-begin fragment,
    /// in declaration order.
    pub(crate) begin_parts: Option<Vec<(usize, Option<String>)>>,
    /// `None` only for the root and for modes that end with their parent.
    pub(crate) end: Option<CompiledPattern>,
    pub(crate) illegal: Option<CompiledPattern>,
    pub(crate) keywords: Option<KeywordTable>,
    pub(crate) keyword_pattern: Option<CompiledPattern>,
    pub(crate) children: Vec<ModeId>,
    pub(crate) starts: Option<ModeId>,
    pub(crate) sub_languages: Vec<String>,
    pub(crate) relevance: u32,
    pub(crate) return_begin: bool,
    pub(crate) return_end: bool,
    pub(crate) exclude_begin: bool,
    pub(crate) exclude_end: bool,
    pub(crate) ends_parent: bool,
    pub(crate) ends_with_parent: bool,
    /// Skip a begin match when the preceding input character is a dot.
    pub(crate) ignore_begin_if_preceded_by_dot: bool,
}

/// The immutable runtime form of a grammar. Compiled once, shared freely:
/// tokenization never mutates it.
#[derive(Debug)]
pub struct CompiledGrammar {
    name: String,
    aliases: Vec<String>,
    case_insensitive: bool,
    modes: Vec<CompiledMode>,
    root: ModeId,
}

impl CompiledGrammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub(crate) fn mode(&self, id: ModeId) -> &CompiledMode {
        &self.modes[id]
    }

    pub(crate) fn root(&self) -> ModeId {
        self.root
    }
}

/// Compile a grammar definition, reporting the first problem found.
pub fn compile(grammar: &Grammar) -> Result<CompiledGrammar, GrammarError> {
    let root = &grammar.root;
    if root.end.is_some() || root.ends_with_parent || root.ends_parent {
        return Err(GrammarError::InvalidMode(
            "the root mode runs to end of input and cannot declare an end".to_string(),
        ));
    }
    if root.begin_keywords.is_some() {
        return Err(GrammarError::InvalidMode(
            "begin_keywords only makes sense on a nested mode".to_string(),
        ));
    }
    if root
        .contains
        .iter()
        .any(|child| matches!(child, Child::SelfReference))
    {
        return Err(GrammarError::InvalidMode(
            "the root mode cannot contain itself".to_string(),
        ));
    }

    let mut compiler = Compiler {
        case_insensitive: grammar.case_insensitive,
        slots: Vec::new(),
    };
    let root_id = compiler.compile_mode(root, true)?;
    Ok(CompiledGrammar {
        name: grammar.name.clone(),
        aliases: grammar.aliases.clone(),
        case_insensitive: grammar.case_insensitive,
        modes: compiler.finish(),
        root: root_id,
    })
}

struct Compiler {
    case_insensitive: bool,
    slots: Vec<Option<CompiledMode>>,
}

impl Compiler {
    fn compile_mode(&mut self, source: &Mode, is_root: bool) -> Result<ModeId, GrammarError> {
        let id = self.slots.len();
        self.slots.push(None);

        let mut mode = source.clone();
        let mut ignore_begin_if_preceded_by_dot = false;

        if let Some(list) = mode.begin_keywords.take() {
            let words: Vec<&str> = list.split_whitespace().collect();
            if words.is_empty() {
                return Err(GrammarError::InvalidMode(
                    "begin_keywords needs at least one word".to_string(),
                ));
            }
            // A trailing boundary alone is not enough for keywords carrying
            // non-word characters, so whitespace is accepted too.
            mode.begin = Some(Begin::Pattern(format!(
                r"\b({})(?!\.)(?=\b|\s)",
                words.join("|")
            )));
            if mode.keywords.is_none() {
                mode.keywords = Some(Keywords::keywords(&words));
            }
            if mode.relevance.is_none() {
                // The words already score through the keyword table.
                mode.relevance = Some(0);
            }
            ignore_begin_if_preceded_by_dot = true;
        }

        let mut begin_parts = None;
        let begin_source = match mode.begin.take() {
            None => BOUNDARY.to_string(),
            Some(Begin::Pattern(pattern)) => pattern,
            Some(Begin::Parts(parts)) => {
                if parts.is_empty() {
                    return Err(GrammarError::InvalidMode(
                        "a composite begin needs at least one part".to_string(),
                    ));
                }
                if mode.return_begin || mode.exclude_begin {
                    return Err(GrammarError::InvalidMode(
                        "return_begin and exclude_begin cannot apply to a composite begin"
                            .to_string(),
                    ));
                }
                let sources: Vec<&str> = parts.iter().map(|part| part.pattern.as_str()).collect();
                let (joined, groups) = join_fragments(&sources, "");
                begin_parts = Some(
                    groups
                        .into_iter()
                        .zip(&parts)
                        .map(|(group, part)| (group, part.category.clone()))
                        .collect(),
                );
                joined
            }
        };
        let begin = CompiledPattern::compile(&begin_source, self.case_insensitive)?;

        let end = if let Some(pattern) = mode.end.as_deref() {
            Some(CompiledPattern::compile(pattern, self.case_insensitive)?)
        } else if !mode.ends_with_parent && !is_root {
            Some(CompiledPattern::compile(BOUNDARY, self.case_insensitive)?)
        } else {
            None
        };

        let illegal = match mode.illegal.as_deref() {
            Some(pattern) => Some(CompiledPattern::compile(pattern, self.case_insensitive)?),
            None => None,
        };

        let (keywords, keyword_pattern) = match mode.keywords.take() {
            Some(declared) => {
                let table = KeywordTable::build(&declared, self.case_insensitive)?;
                let pattern = declared
                    .pattern
                    .as_deref()
                    .unwrap_or(DEFAULT_KEYWORD_PATTERN);
                (
                    Some(table),
                    Some(CompiledPattern::compile(pattern, self.case_insensitive)?),
                )
            }
            None => (None, None),
        };

        let mut children = Vec::new();
        for child in std::mem::take(&mut mode.contains) {
            match child {
                Child::SelfReference => children.push(id),
                Child::Mode(child_mode) => {
                    if child_mode.variants.is_empty() {
                        children.push(self.compile_mode(&child_mode, false)?);
                    } else {
                        let mut base = child_mode;
                        for variant in std::mem::take(&mut base.variants) {
                            let expanded = Mode::inherit(&base, variant);
                            children.push(self.compile_mode(&expanded, false)?);
                        }
                    }
                }
            }
        }

        let starts = match mode.starts.take() {
            Some(next) => Some(self.compile_mode(&next, false)?),
            None => None,
        };

        self.slots[id] = Some(CompiledMode {
            category: mode.category,
            begin,
            begin_parts,
            end,
            illegal,
            keywords,
            keyword_pattern,
            children,
            starts,
            sub_languages: mode.sub_languages,
            relevance: mode.relevance.unwrap_or(1),
            return_begin: mode.return_begin,
            return_end: mode.return_end,
            exclude_begin: mode.exclude_begin,
            exclude_end: mode.exclude_end,
            ends_parent: mode.ends_parent,
            ends_with_parent: mode.ends_with_parent,
            ignore_begin_if_preceded_by_dot,
        });
        Ok(id)
    }

    fn finish(self) -> Vec<CompiledMode> {
        self.slots
            .into_iter()
            .map(|slot| slot.expect("every reserved mode slot is filled during compilation"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Part;

    fn compiled(root: Mode) -> CompiledGrammar {
        compile(&Grammar::new("test", root)).unwrap()
    }

    fn only_child(grammar: &CompiledGrammar) -> &CompiledMode {
        let root = grammar.mode(grammar.root());
        assert_eq!(root.children.len(), 1);
        grammar.mode(root.children[0])
    }

    #[test]
    fn test_minimal_grammar_compiles() {
        let grammar = compiled(Mode::default());
        assert_eq!(grammar.name(), "test");
        let root = grammar.mode(grammar.root());
        assert!(root.children.is_empty());
        assert!(root.end.is_none());
        assert_eq!(root.relevance, 1);
    }

    #[test]
    fn test_bad_pattern_reports_its_source() {
        let err = compile(&Grammar::new(
            "test",
            Mode {
                contains: vec![Mode {
                    begin: Some("(".into()),
                    ..Mode::default()
                }
                .into()],
                ..Mode::default()
            },
        ))
        .unwrap_err();
        match err {
            GrammarError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "("),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_root_cannot_declare_an_end() {
        let err = compile(&Grammar::new(
            "test",
            Mode {
                end: Some("$".to_string()),
                ..Mode::default()
            },
        ))
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidMode(_)));
    }

    #[test]
    fn test_root_cannot_reference_itself() {
        let err = compile(&Grammar::new(
            "test",
            Mode {
                contains: vec![Child::SelfReference],
                ..Mode::default()
            },
        ))
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidMode(_)));
    }

    #[test]
    fn test_nested_mode_defaults_to_boundary_patterns() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                category: Some("x".to_string()),
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let child = only_child(&grammar);
        assert_eq!(child.begin.source(), r"\B|\b");
        assert_eq!(child.end.as_ref().unwrap().source(), r"\B|\b");
    }

    #[test]
    fn test_ends_with_parent_suppresses_the_default_end() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                ends_with_parent: true,
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let child = only_child(&grammar);
        assert!(child.end.is_none());
        assert!(child.ends_with_parent);
    }

    #[test]
    fn test_begin_keywords_expand_to_pattern_and_table() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                begin_keywords: Some("new throw".to_string()),
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let child = only_child(&grammar);
        assert_eq!(child.begin.source(), r"\b(new|throw)(?!\.)(?=\b|\s)");
        assert!(child.ignore_begin_if_preceded_by_dot);
        assert_eq!(child.relevance, 0);
        let (category, _) = child.keywords.as_ref().unwrap().lookup("throw").unwrap();
        assert_eq!(category, "keyword");
    }

    #[test]
    fn test_variants_expand_into_siblings() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                category: Some("number".to_string()),
                relevance: Some(0),
                variants: vec![
                    Mode {
                        begin: Some(r"\d+".into()),
                        ..Mode::default()
                    },
                    Mode {
                        begin: Some("0x[0-9a-f]+".into()),
                        ..Mode::default()
                    },
                ],
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let root = grammar.mode(grammar.root());
        assert_eq!(root.children.len(), 2);
        for id in &root.children {
            let sibling = grammar.mode(*id);
            assert_eq!(sibling.category.as_deref(), Some("number"));
            assert_eq!(sibling.relevance, 0);
        }
    }

    #[test]
    fn test_self_reference_points_back_at_the_enclosing_mode() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                begin: Some(r"\(".into()),
                end: Some(r"\)".to_string()),
                contains: vec![Child::SelfReference],
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let paren_id = grammar.mode(grammar.root()).children[0];
        assert_eq!(grammar.mode(paren_id).children, vec![paren_id]);
    }

    #[test]
    fn test_composite_begin_records_fragment_groups() {
        let grammar = compiled(Mode {
            contains: vec![Mode {
                begin: Some(Begin::Parts(vec![
                    Part::tagged("(a)x", "one"),
                    Part::new("y"),
                ])),
                end: Some("z".to_string()),
                ..Mode::default()
            }
            .into()],
            ..Mode::default()
        });
        let child = only_child(&grammar);
        assert_eq!(child.begin.source(), "((a)x)(y)");
        let parts = child.begin_parts.as_ref().unwrap();
        assert_eq!(parts[0], (1, Some("one".to_string())));
        assert_eq!(parts[1], (3, None));
    }

    #[test]
    fn test_composite_begin_rejects_return_begin() {
        let err = compile(&Grammar::new(
            "test",
            Mode {
                contains: vec![Mode {
                    begin: Some(Begin::Parts(vec![Part::new("a")])),
                    return_begin: true,
                    ..Mode::default()
                }
                .into()],
                ..Mode::default()
            },
        ))
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidMode(_)));
    }

    #[test]
    fn test_lookahead_and_backreferences_compile() {
        let lookahead = CompiledPattern::compile("a(?=b)", false).unwrap();
        assert_eq!(lookahead.find_from("ab", 0), Some((0, 1)));
        assert_eq!(lookahead.find_from("ac", 0), None);

        let backref = CompiledPattern::compile(r"(\w)\1", false).unwrap();
        assert_eq!(backref.find_from("xaay", 0), Some((1, 3)));
    }

    #[test]
    fn test_case_insensitive_compilation() {
        let pattern = CompiledPattern::compile("[a-z]+", true).unwrap();
        assert_eq!(pattern.find_from("ABC", 0), Some((0, 3)));
    }

    #[test]
    fn test_find_from_starts_at_the_offset() {
        let pattern = CompiledPattern::compile("a", false).unwrap();
        assert_eq!(pattern.find_from("aba", 0), Some((0, 1)));
        assert_eq!(pattern.find_from("aba", 1), Some((2, 3)));
        assert_eq!(pattern.find_from("aba", 4), None);
    }

    #[test]
    fn test_compiled_grammar_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledGrammar>();
    }
}
