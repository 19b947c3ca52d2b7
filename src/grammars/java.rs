//! Java grammar

use crate::grammar::{Begin, Child, Grammar, Mode, Part};
use crate::grammars::common;
use crate::keywords::Keywords;
use crate::pattern::nested;

/// Java identifiers also allow `$` and a range of accented letters.
const JAVA_IDENT: &str = "[\u{c0}-\u{2b8}a-zA-Z_$][\u{c0}-\u{2b8}a-zA-Z_$0-9]*";

const DECIMAL_DIGITS: &str = "[0-9](_*[0-9])*";
const HEX_DIGITS: &str = "[0-9a-fA-F](_*[0-9a-fA-F])*";

/// An identifier with an optional generic argument list, matched up to
/// three levels of nesting.
fn generic_ident() -> String {
    let template = format!(r"(?:<{id}~~~(?:\s*,\s*{id}~~~)*>)?", id = JAVA_IDENT);
    format!("{}{}", JAVA_IDENT, nested(&template, "~~~", 3))
}

fn java_keywords() -> Keywords {
    Keywords::new()
        .class(
            "keyword",
            &[
                "synchronized",
                "abstract",
                "private",
                "var",
                "static",
                "if",
                "const",
                "for",
                "while",
                "strictfp",
                "finally",
                "protected",
                "import",
                "native",
                "final",
                "void",
                "enum",
                "else",
                "break",
                "transient",
                "catch",
                "instanceof",
                "volatile",
                "case",
                "assert",
                "package",
                "default",
                "public",
                "try",
                "switch",
                "continue",
                "throws",
                "module",
                "requires",
                "exports",
                "do",
                "sealed",
            ],
        )
        .class("literal", &["false", "true", "null"])
        .class(
            "type",
            &[
                "char", "boolean", "long", "float", "int", "byte", "short", "double",
            ],
        )
        .class("built_in", &["super", "this"])
}

/// Java numeric literals, from floating point with exponents down to
/// binary, all allowing `_` separators.
fn number_mode() -> Mode {
    let frac = format!(r"\.({})", DECIMAL_DIGITS);
    let variant = |begin: String| Mode {
        begin: Some(begin.into()),
        ..Mode::default()
    };
    Mode {
        category: Some("number".to_string()),
        relevance: Some(0),
        variants: vec![
            // decimal floating point with an exponent part
            variant(format!(
                r"(\b({dd})(({fr})|\.)?|({fr}))[eE][+-]?({dd})[fFdD]?\b",
                dd = DECIMAL_DIGITS,
                fr = frac
            )),
            // decimal floating point without one
            variant(format!(
                r"\b({dd})(({fr})[fFdD]?\b|\.([fFdD]\b)?)",
                dd = DECIMAL_DIGITS,
                fr = frac
            )),
            variant(format!(r"({fr})[fFdD]?\b", fr = frac)),
            variant(format!(r"\b({dd})[fFdD]\b", dd = DECIMAL_DIGITS)),
            // hexadecimal floating point
            variant(format!(
                r"\b0[xX](({hd})\.?|({hd})?\.({hd}))[pP][+-]?({dd})[fFdD]?\b",
                hd = HEX_DIGITS,
                dd = DECIMAL_DIGITS
            )),
            // decimal integer
            variant(r"\b(0|[1-9](_*[0-9])*)[lL]?\b".to_string()),
            // hexadecimal integer
            variant(format!(r"\b0[xX]({hd})[lL]?\b", hd = HEX_DIGITS)),
            // octal integer
            variant(r"\b0(_*[0-7])*[lL]?\b".to_string()),
            // binary integer
            variant(r"\b0[bB][01](_*[01])*[lL]?\b".to_string()),
        ],
        ..Mode::default()
    }
}

fn annotation() -> Mode {
    Mode {
        category: Some("meta".to_string()),
        begin: Some(format!("@{}", JAVA_IDENT).into()),
        contains: vec![Mode {
            begin: Some(r"\(".into()),
            end: Some(r"\)".to_string()),
            // nested parens inside annotation arguments
            contains: vec![Child::SelfReference],
            ..Mode::default()
        }
        .into()],
        ..Mode::default()
    }
}

fn params(keywords: &Keywords) -> Mode {
    Mode {
        category: Some("params".to_string()),
        begin: Some(r"\(".into()),
        end: Some(r"\)".to_string()),
        keywords: Some(keywords.clone()),
        relevance: Some(0),
        contains: vec![common::c_block_comment().into()],
        ends_parent: true,
        ..Mode::default()
    }
}

pub fn java() -> Grammar {
    let keywords = java_keywords();

    let doc_comment = common::comment(
        r"/\*\*",
        r"\*/",
        Mode {
            relevance: Some(0),
            contains: vec![
                // swallow the @ of e-mail addresses before doctag sees it
                Mode {
                    begin: Some(r"\w+@".into()),
                    relevance: Some(0),
                    ..Mode::default()
                }
                .into(),
                Mode {
                    category: Some("doctag".to_string()),
                    begin: Some("@[A-Za-z]+".into()),
                    ..Mode::default()
                }
                .into(),
            ],
            ..Mode::default()
        },
    );

    let import_boost = Mode {
        begin: Some(r"import java\.[a-z]+\.".into()),
        keywords: Some(Keywords::keywords(&["import"])),
        relevance: Some(2),
        ..Mode::default()
    };

    let text_block = Mode {
        category: Some("string".to_string()),
        begin: Some("\"\"\"".into()),
        end: Some("\"\"\"".to_string()),
        contains: vec![common::backslash_escape().into()],
        ..Mode::default()
    };

    let type_declaration = Mode {
        begin: Some(Begin::Parts(vec![
            Part::tagged(r"\b(?:class|interface|enum|extends|implements|new)", "keyword"),
            Part::new(r"\s+"),
            Part::tagged(JAVA_IDENT, "title.class"),
        ])),
        ..Mode::default()
    };

    let hyphenated_keyword = Mode {
        category: Some("keyword".to_string()),
        begin: Some("non-sealed".into()),
        ..Mode::default()
    };

    let variable_declaration = Mode {
        begin: Some(Begin::Parts(vec![
            // `else x = 1` declares nothing
            Part::tagged(format!("(?!else){}", JAVA_IDENT), "type"),
            Part::new(r"\s+"),
            Part::tagged(JAVA_IDENT, "variable"),
            Part::new(r"\s+"),
            Part::tagged("=(?!=)", "operator"),
        ])),
        ..Mode::default()
    };

    let record_declaration = Mode {
        begin: Some(Begin::Parts(vec![
            Part::tagged("record", "keyword"),
            Part::new(r"\s+"),
            Part::tagged(JAVA_IDENT, "title.class"),
        ])),
        contains: vec![
            params(&keywords).into(),
            common::c_line_comment().into(),
            common::c_block_comment().into(),
        ],
        ..Mode::default()
    };

    // Expression keywords keep `throw Name(...)` and friends from being
    // taken for function definitions.
    let expression_keywords = Mode {
        begin_keywords: Some("new throw return else".to_string()),
        relevance: Some(0),
        ..Mode::default()
    };

    let function_definition = Mode {
        begin: Some(Begin::Parts(vec![
            Part::new(format!(r"(?:{}\s+)", generic_ident())),
            Part::tagged(common::UNDERSCORE_IDENT, "title.function"),
            Part::new(r"\s*(?=\()"),
        ])),
        keywords: Some(keywords.clone()),
        contains: vec![
            Mode {
                category: Some("params".to_string()),
                begin: Some(r"\(".into()),
                end: Some(r"\)".to_string()),
                keywords: Some(keywords.clone()),
                relevance: Some(0),
                contains: vec![
                    annotation().into(),
                    common::apos_string().into(),
                    common::quote_string().into(),
                    number_mode().into(),
                    common::c_block_comment().into(),
                ],
                ..Mode::default()
            }
            .into(),
            common::c_line_comment().into(),
            common::c_block_comment().into(),
        ],
        ..Mode::default()
    };

    Grammar::new(
        "java",
        Mode {
            keywords: Some(keywords),
            illegal: Some("</|#".to_string()),
            contains: vec![
                doc_comment.into(),
                import_boost.into(),
                common::c_line_comment().into(),
                common::c_block_comment().into(),
                text_block.into(),
                common::apos_string().into(),
                common::quote_string().into(),
                type_declaration.into(),
                hyphenated_keyword.into(),
                variable_declaration.into(),
                record_declaration.into(),
                expression_keywords.into(),
                function_definition.into(),
                number_mode().into(),
                annotation().into(),
            ],
            ..Mode::default()
        },
    )
    .with_aliases(&["jsp"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;

    #[test]
    fn test_java_grammar_compiles() {
        compile(&java()).unwrap();
    }

    #[test]
    fn test_generic_ident_is_fully_expanded() {
        let pattern = generic_ident();
        assert!(pattern.contains("(?:<"));
        assert!(!pattern.contains("~~~"));
    }
}
