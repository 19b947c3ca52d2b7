//! Pattern composition utilities
//!
//! Grammars describe lexical structure with regular expression fragments, and
//! several Mode features need those fragments combined into larger patterns:
//! alternation over tag shapes, lookahead delimiters, bounded expansion for
//! nested constructs like generics, and fragment lists where every fragment
//! keeps its own capture identity.
//!
//! ## Design
//!
//! 1. Composition is plain string surgery over pattern sources. Nothing here
//!    compiles a regex; invalid results surface when the grammar compiler
//!    compiles the composed source, as a configuration error naming it.
//! 2. Group bookkeeping ([`count_groups`], [`join_fragments`]) walks pattern
//!    sources with one fixed scanner that knows just enough syntax to step
//!    over bracket expressions, escaped characters, and `(?` openers. Named
//!    groups get no special treatment; the grammar dialect does not use them.
//! 3. [`join_fragments`] wraps each fragment in a capturing group and
//!    renumbers `\N` back-references so fragments stay self-contained, then
//!    returns the wrapper-group indices as the capture translation table.

use once_cell::sync::Lazy;
use regex::Regex;

/// Scanner for pattern sources: a bracket expression, a group opener
/// (capturing or `(?`), a numbered back-reference, or any escaped character.
static GROUP_SCANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:[^\\\]]|\\.)*\]|\(\??|\\([1-9][0-9]*)|\\.").expect("scanner pattern compiles")
});

/// Concatenate pattern fragments.
pub fn concat(fragments: &[&str]) -> String {
    fragments.concat()
}

/// Alternation over the given fragments, wrapped in a non-capturing group.
pub fn either(alternatives: &[&str]) -> String {
    format!("(?:{})", alternatives.join("|"))
}

/// Make a fragment optional: `(?:fragment)?`.
pub fn optional(fragment: &str) -> String {
    format!("(?:{})?", fragment)
}

/// Repeat a fragment any number of times: `(?:fragment)*`.
pub fn zero_or_more(fragment: &str) -> String {
    format!("(?:{})*", fragment)
}

/// Zero-width lookahead: `(?=fragment)`.
pub fn lookahead(fragment: &str) -> String {
    format!("(?={})", fragment)
}

/// Escape `text` so it matches literally inside a pattern.
pub fn literal(text: &str) -> String {
    regex::escape(text)
}

/// Expand a self-similar fragment to a fixed depth.
///
/// Every occurrence of `placeholder` in `pattern` is substituted with the
/// expansion one level shallower; depth 0 resolves to the empty pattern. The
/// result matches the construct nested up to `depth` levels and simply fails
/// to match anything deeper.
///
/// # Example
///
/// ```text
/// nested("a~b", "~", 2)  =>  "aabb"
/// ```
pub fn nested(pattern: &str, placeholder: &str, depth: u32) -> String {
    if depth == 0 {
        return String::new();
    }
    pattern.replace(placeholder, &nested(pattern, placeholder, depth - 1))
}

/// Count the capturing groups in a pattern source.
///
/// Escaped parens, `(?...)` forms, and parens inside bracket expressions do
/// not count.
pub fn count_groups(pattern: &str) -> usize {
    GROUP_SCANNER
        .find_iter(pattern)
        .filter(|m| m.as_str() == "(")
        .count()
}

/// Join pattern fragments into one source, giving each fragment a capturing
/// group of its own.
///
/// Numbered back-references inside each fragment are renumbered so they keep
/// pointing at that fragment's groups after composition. Returns the composed
/// source together with the wrapper-group index of every fragment, in order:
/// the capture-index translation table that maps matcher groups back to the
/// fragments that produced them.
pub fn join_fragments(fragments: &[&str], separator: &str) -> (String, Vec<usize>) {
    let mut num_captures = 0usize;
    let mut groups = Vec::with_capacity(fragments.len());
    let mut parts = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        num_captures += 1;
        let offset = num_captures;
        groups.push(offset);
        let mut out = String::with_capacity(fragment.len() + 2);
        out.push('(');
        let mut last = 0;
        for caps in GROUP_SCANNER.captures_iter(fragment) {
            let m = caps.get(0).expect("group 0 is the whole match");
            out.push_str(&fragment[last..m.start()]);
            last = m.end();
            if let Some(digits) = caps.get(1) {
                // A numbered back-reference; shift it past the groups of the
                // fragments before this one (and the wrapper itself).
                match digits.as_str().parse::<usize>() {
                    Ok(n) => {
                        out.push('\\');
                        out.push_str(&(n + offset).to_string());
                    }
                    Err(_) => out.push_str(m.as_str()),
                }
            } else {
                out.push_str(m.as_str());
                if m.as_str() == "(" {
                    num_captures += 1;
                }
            }
        }
        out.push_str(&fragment[last..]);
        out.push(')');
        parts.push(out);
    }
    (parts.join(separator), groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_joins_sources() {
        assert_eq!(concat(&["<", "[a-z]+"]), "<[a-z]+");
    }

    #[test]
    fn test_either_wraps_alternatives() {
        assert_eq!(either(&["/>", ">", r"\s"]), r"(?:/>|>|\s)");
    }

    #[test]
    fn test_optional_and_zero_or_more() {
        assert_eq!(optional("x"), "(?:x)?");
        assert_eq!(zero_or_more("ab"), "(?:ab)*");
    }

    #[test]
    fn test_lookahead_is_zero_width_form() {
        assert_eq!(lookahead("[a-z]+>"), "(?=[a-z]+>)");
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        assert_eq!(literal("a.b*"), r"a\.b\*");
    }

    #[test]
    fn test_nested_expands_to_depth() {
        assert_eq!(nested("a~b", "~", 0), "");
        assert_eq!(nested("a~b", "~", 1), "ab");
        assert_eq!(nested("a~b", "~", 2), "aabb");
        assert_eq!(nested("a~b", "~", 3), "aaabbb");
    }

    #[test]
    fn test_nested_without_placeholder_is_identity() {
        assert_eq!(nested("abc", "~", 2), "abc");
    }

    #[test]
    fn test_count_groups_sees_only_capturing_parens() {
        assert_eq!(count_groups("(a)(b)"), 2);
        assert_eq!(count_groups("(a(b))"), 2);
        assert_eq!(count_groups("(?:a)(?=b)"), 0);
        assert_eq!(count_groups(r"\(a\)"), 0);
        assert_eq!(count_groups("[()]"), 0);
        assert_eq!(count_groups(r"[\](]("), 1);
    }

    #[test]
    fn test_join_fragments_reports_wrapper_groups() {
        let (source, groups) = join_fragments(&["a", "b", "c"], "");
        assert_eq!(source, "(a)(b)(c)");
        assert_eq!(groups, vec![1, 2, 3]);
    }

    #[test]
    fn test_join_fragments_accounts_for_inner_groups() {
        let (source, groups) = join_fragments(&["(x)(y)", "z"], "");
        assert_eq!(source, "((x)(y))(z)");
        assert_eq!(groups, vec![1, 4]);
    }

    #[test]
    fn test_join_fragments_renumbers_backreferences() {
        let (source, groups) = join_fragments(&[r"(a)\1", r"(y)\1"], "");
        assert_eq!(source, r"((a)\2)((y)\4)");
        assert_eq!(groups, vec![1, 3]);
    }

    #[test]
    fn test_join_fragments_with_separator() {
        let (source, _) = join_fragments(&["a", "b"], "|");
        assert_eq!(source, "(a)|(b)");
    }

    #[test]
    fn test_join_fragments_leaves_class_and_escapes_alone() {
        let (source, groups) = join_fragments(&[r"[(]\.", r"\(x"], "");
        assert_eq!(source, r"([(]\.)(\(x)");
        assert_eq!(groups, vec![1, 2]);
    }
}
