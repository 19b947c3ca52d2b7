//! XML grammar, covering HTML and the common XML dialects

use crate::grammar::{Grammar, Mode};
use crate::grammars::common;
use crate::keywords::Keywords;
use crate::pattern::{concat, either, lookahead, optional};

fn tag_name() -> String {
    concat(&["[A-Z_]", &optional("[A-Z0-9_.-]*:"), "[A-Z0-9_.-]*"])
}

fn entity() -> Mode {
    Mode {
        category: Some("symbol".to_string()),
        begin: Some("&[a-z]+;|&#[0-9]+;|&#x[a-f0-9]+;".into()),
        ..Mode::default()
    }
}

fn meta_keywords() -> Mode {
    Mode {
        begin: Some(r"\s".into()),
        contains: vec![Mode {
            category: Some("keyword".to_string()),
            begin: Some("#?[a-z_][a-z1-9_-]+".into()),
            illegal: Some(r"\n".to_string()),
            ..Mode::default()
        }
        .into()],
        ..Mode::default()
    }
}

fn meta_paren_keywords() -> Mode {
    Mode::inherit(
        &meta_keywords(),
        Mode {
            begin: Some(r"\(".into()),
            end: Some(r"\)".to_string()),
            ..Mode::default()
        },
    )
}

/// Everything between a tag's name and its closing `>`: attributes and
/// quoted or bare values. Runs until the enclosing tag mode ends.
fn tag_internals() -> Mode {
    let quoted_value = |quote: &str| Mode {
        begin: Some(quote.into()),
        end: Some(quote.to_string()),
        contains: vec![entity().into()],
        ..Mode::default()
    };
    Mode {
        ends_with_parent: true,
        illegal: Some("<".to_string()),
        relevance: Some(0),
        contains: vec![
            Mode {
                category: Some("attr".to_string()),
                begin: Some("[A-Za-z0-9._:-]+".into()),
                relevance: Some(0),
                ..Mode::default()
            }
            .into(),
            Mode {
                begin: Some(r"=\s*".into()),
                relevance: Some(0),
                contains: vec![Mode {
                    category: Some("string".to_string()),
                    ends_parent: true,
                    variants: vec![
                        quoted_value("\""),
                        quoted_value("'"),
                        Mode {
                            begin: Some(r#"[^\s"'=<>`]+"#.into()),
                            ..Mode::default()
                        },
                    ],
                    ..Mode::default()
                }
                .into()],
                ..Mode::default()
            }
            .into(),
        ],
        ..Mode::default()
    }
}

fn doctype_meta() -> Mode {
    let inner = Mode {
        category: Some("meta".to_string()),
        begin: Some("<![a-z]".into()),
        end: Some(">".to_string()),
        contains: vec![
            meta_keywords().into(),
            meta_paren_keywords().into(),
            common::quote_string().into(),
            common::apos_string().into(),
        ],
        ..Mode::default()
    };
    Mode {
        category: Some("meta".to_string()),
        begin: Some("<![a-z]".into()),
        end: Some(">".to_string()),
        relevance: Some(10),
        contains: vec![
            meta_keywords().into(),
            common::quote_string().into(),
            common::apos_string().into(),
            meta_paren_keywords().into(),
            // the internal DTD subset
            Mode {
                begin: Some(r"\[".into()),
                end: Some(r"\]".to_string()),
                contains: vec![inner.into()],
                ..Mode::default()
            }
            .into(),
        ],
        ..Mode::default()
    }
}

/// A tag whose body is another language: the tag itself highlights as
/// usual, then a continuation mode hands the body to the delegates.
fn embedded_tag(name: &str, delegates: &[&str]) -> Mode {
    Mode {
        category: Some("tag".to_string()),
        begin: Some(format!(r"<{}(?=\s|>)", name).into()),
        end: Some(">".to_string()),
        keywords: Some(Keywords::new().class("name", &[name])),
        contains: vec![tag_internals().into()],
        starts: Some(Box::new(Mode {
            end: Some(format!("</{}>", name)),
            return_end: true,
            sub_languages: delegates.iter().map(|s| s.to_string()).collect(),
            ..Mode::default()
        })),
        ..Mode::default()
    }
}

pub fn xml() -> Grammar {
    let open_tag = Mode {
        category: Some("tag".to_string()),
        begin: Some(
            concat(&[
                "<",
                &lookahead(&concat(&[&tag_name(), &either(&["/>", ">", r"\s"])])),
            ])
            .into(),
        ),
        end: Some("/?>".to_string()),
        contains: vec![Mode {
            category: Some("name".to_string()),
            begin: Some(tag_name().into()),
            relevance: Some(0),
            starts: Some(Box::new(tag_internals())),
            ..Mode::default()
        }
        .into()],
        ..Mode::default()
    };

    let close_tag = Mode {
        category: Some("tag".to_string()),
        begin: Some(concat(&["</", &lookahead(&concat(&[&tag_name(), ">"]))]).into()),
        contains: vec![
            Mode {
                category: Some("name".to_string()),
                begin: Some(tag_name().into()),
                relevance: Some(0),
                ..Mode::default()
            }
            .into(),
            Mode {
                begin: Some(">".into()),
                relevance: Some(0),
                ends_parent: true,
                ..Mode::default()
            }
            .into(),
        ],
        ..Mode::default()
    };

    Grammar::new(
        "xml",
        Mode {
            contains: vec![
                doctype_meta().into(),
                common::comment(
                    "<!--",
                    "-->",
                    Mode {
                        relevance: Some(10),
                        ..Mode::default()
                    },
                )
                .into(),
                Mode {
                    begin: Some(r"<!\[CDATA\[".into()),
                    end: Some(r"\]\]>".to_string()),
                    relevance: Some(10),
                    ..Mode::default()
                }
                .into(),
                entity().into(),
                Mode {
                    category: Some("meta".to_string()),
                    begin: Some(r"<\?xml".into()),
                    end: Some(r"\?>".to_string()),
                    relevance: Some(10),
                    ..Mode::default()
                }
                .into(),
                embedded_tag("style", &["css", "xml"]).into(),
                embedded_tag("script", &["javascript", "handlebars", "xml"]).into(),
                // fragment tags
                Mode {
                    category: Some("tag".to_string()),
                    begin: Some("<>|</>".into()),
                    ..Mode::default()
                }
                .into(),
                open_tag.into(),
                close_tag.into(),
            ],
            ..Mode::default()
        },
    )
    .with_aliases(&[
        "html", "xhtml", "rss", "atom", "xjb", "xsd", "xsl", "plist", "wsf", "svg",
    ])
    .case_insensitive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;

    #[test]
    fn test_xml_grammar_compiles() {
        compile(&xml()).unwrap();
    }

    #[test]
    fn test_tag_name_composition() {
        assert_eq!(tag_name(), "[A-Z_](?:[A-Z0-9_.-]*:)?[A-Z0-9_.-]*");
    }
}
