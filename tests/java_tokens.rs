//! Token-level tests for the bundled Java grammar.
//!
//! Inputs are small Java fragments; assertions pin down the exact token
//! sequences so regressions in rule ordering or region flags show up as
//! concrete diffs.

use glint::{TokenStream, TokenizeError, TokenizeOptions};
use rstest::rstest;

fn java(input: &str) -> TokenStream {
    glint::tokenize("java", input).expect("input tokenizes as java")
}

fn pairs(stream: &TokenStream) -> Vec<(&str, Option<&str>)> {
    stream
        .tokens()
        .iter()
        .map(|t| (t.text.as_str(), t.category.as_deref()))
        .collect()
}

#[cfg(test)]
mod declarations {
    use super::*;

    #[test]
    fn test_variable_declaration_labels_each_part() {
        let stream = java("int x = 10;");
        assert_eq!(
            pairs(&stream),
            vec![
                ("int", Some("type")),
                (" ", None),
                ("x", Some("variable")),
                (" ", None),
                ("=", Some("operator")),
                (" ", None),
                ("10", Some("number")),
                (";", None),
            ]
        );
        assert_eq!(stream.text(), "int x = 10;");
    }

    #[test]
    fn test_type_declaration_tags_the_name() {
        let stream = java("class Foo extends Bar {");
        assert_eq!(
            pairs(&stream),
            vec![
                ("class", Some("keyword")),
                (" ", None),
                ("Foo", Some("title.class")),
                (" ", None),
                ("extends", Some("keyword")),
                (" ", None),
                ("Bar", Some("title.class")),
                (" {", None),
            ]
        );
    }

    #[test]
    fn test_function_definition_titles_the_name() {
        let stream = java("void greet(String name) { }");
        assert_eq!(
            pairs(&stream),
            vec![
                ("void", Some("keyword")), // untagged part, lifted by root keywords
                (" ", None),
                ("greet", Some("title.function")),
                ("(String name)", Some("params")),
                (" { }", None),
            ]
        );
    }

    #[test]
    fn test_record_declaration_keeps_keywords_inside_params() {
        let stream = java("record Point(int x) { }");
        assert_eq!(
            pairs(&stream),
            vec![
                ("record", Some("keyword")),
                (" ", None),
                ("Point", Some("title.class")),
                ("(", Some("params")),
                ("int", Some("type")),
                (" x)", Some("params")),
                (" { }", None), // the params mode ends the record declaration
            ]
        );
    }

    #[test]
    fn test_annotation_before_a_definition() {
        let stream = java("@Override void run()");
        assert_eq!(
            pairs(&stream),
            vec![
                ("@Override", Some("meta")),
                (" ", None),
                ("void", Some("keyword")),
                (" ", None),
                ("run", Some("title.function")),
                ("()", Some("params")),
            ]
        );
    }
}

#[cfg(test)]
mod statements {
    use super::*;

    #[test]
    fn test_keywords_strings_and_comments() {
        let stream = java("if (x) { return \"ok\"; } // done");
        assert_eq!(
            pairs(&stream),
            vec![
                ("if", Some("keyword")),
                (" (x) { ", None),
                ("return", Some("keyword")), // via the expression-keyword mode
                (" ", None),
                ("\"ok\"", Some("string")),
                ("; } ", None),
                ("// done", Some("comment")),
            ]
        );
        // `if` is too common to score; `return`, the string and the comment do.
        assert_eq!(stream.relevance(), 3);
    }

    #[test]
    fn test_import_line_boosts_relevance() {
        let stream = java("import java.util.List;");
        assert_eq!(
            pairs(&stream),
            vec![("import", Some("keyword")), (" java.util.List;", None)]
        );
        assert_eq!(stream.relevance(), 3); // keyword hit plus the import mode
    }

    #[test]
    fn test_text_block_is_one_string_token() {
        let stream = java("String s = \"\"\"\nhi\n\"\"\";");
        assert_eq!(
            pairs(&stream),
            vec![
                ("String", Some("type")),
                (" ", None),
                ("s", Some("variable")),
                (" ", None),
                ("=", Some("operator")),
                (" ", None),
                ("\"\"\"\nhi\n\"\"\"", Some("string")),
                (";", None),
            ]
        );
    }

    #[test]
    fn test_doc_comment_lifts_doctags() {
        let stream = java("/** See {@link Foo} TODO: fix */");
        assert_eq!(
            pairs(&stream),
            vec![
                ("/** See {", Some("comment")),
                ("@link", Some("doctag")),
                (" Foo} ", Some("comment")),
                ("TODO:", Some("doctag")),
                (" fix */", Some("comment")),
            ]
        );
    }
}

#[cfg(test)]
mod generics {
    use super::*;

    #[test]
    fn test_generic_return_type_titles_the_function() {
        // `Map<String, List<Integer>>` nests two levels deep, inside the
        // bound of the generic pattern, so the definition is recognized and
        // the name gets its title.
        let stream = java("Map<String, List<Integer>> lookup() { }");
        assert_eq!(
            pairs(&stream),
            vec![
                ("Map<String, List<Integer>> ", None),
                ("lookup", Some("title.function")),
                ("()", Some("params")),
                (" { }", None),
            ]
        );
    }

    #[test]
    fn test_generics_beyond_the_depth_bound_fail_closed() {
        // Four levels of nesting exceed the bound: the return type no longer
        // reads as one generic identifier, so no function definition is
        // recognized, but the scan still covers the whole input.
        let input = "Map<String, List<Map<String, List<Integer>>>> deep() { }";
        let stream = java(input);
        assert_eq!(stream.text(), input);
        assert!(stream
            .iter()
            .all(|t| t.category.as_deref() != Some("title.function")));
    }
}

#[cfg(test)]
mod literals {
    use super::*;

    #[rstest]
    #[case("long n = 100_000L;", "100_000L")]
    #[case("double d = 1.5e10;", "1.5e10")]
    #[case("int h = 0xFF;", "0xFF")]
    #[case("int b = 0b1010;", "0b1010")]
    #[case("float f = 1.5f;", "1.5f")]
    fn test_number_literal_variants(#[case] input: &str, #[case] literal: &str) {
        let stream = java(input);
        let number = stream
            .iter()
            .find(|t| t.category.as_deref() == Some("number"))
            .expect("a number token");
        assert_eq!(number.text, literal);
    }
}

#[cfg(test)]
mod robustness {
    use super::*;

    #[test]
    fn test_hash_is_illegal_java() {
        let err = glint::tokenize("java", "int x = #10;").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::GrammarMismatch {
                offset: 8,
                lexeme: "#".to_string(),
                category: None,
            }
        );
    }

    #[test]
    fn test_ignoring_illegals_still_covers_the_input() {
        let stream = glint::tokenize_with(
            "java",
            "int x = #10;",
            &TokenizeOptions {
                ignore_illegals: true,
                ..TokenizeOptions::default()
            },
        )
        .expect("scan recovers");
        assert_eq!(stream.text(), "int x = #10;");
        assert!(stream
            .iter()
            .any(|t| t.category.as_deref() == Some("number") && t.text == "10"));
    }

    #[test]
    fn test_jsp_alias_resolves_to_java() {
        let stream = glint::tokenize("jsp", "int x = 1;").expect("alias resolves");
        assert_eq!(stream.text(), "int x = 1;");
    }

    #[test]
    fn test_unknown_grammar_is_reported() {
        let err = glint::tokenize("ruby", "x = 1").unwrap_err();
        assert_eq!(err, TokenizeError::UnknownGrammar("ruby".to_string()));
    }

    #[test]
    fn test_small_program_tokenizes_completely() {
        let input = r#"package demo;

import java.util.List;

public class Greeter {
    // greet everyone by name
    public void greet(List<String> names) {
        for (String name : names) {
            System.out.println("Hello, " + name);
        }
    }
}
"#;
        let stream = java(input);
        assert_eq!(stream.text(), input);
        assert!(!stream.is_truncated());
        assert!(stream.relevance() > 0);
        let mut offset = 0;
        for token in &stream {
            assert_eq!(token.span.start, offset);
            offset = token.span.end;
        }
        assert_eq!(offset, input.len());
    }
}
