//! Building blocks shared between grammar definitions

use crate::grammar::Mode;

/// A plain identifier: a letter followed by word characters.
pub const IDENT: &str = r"[a-zA-Z]\w*";

/// An identifier that may start with an underscore.
pub const UNDERSCORE_IDENT: &str = r"[a-zA-Z_]\w*";

/// A backslash followed by any single character.
pub fn backslash_escape() -> Mode {
    Mode {
        begin: Some(r"\\[\s\S]".into()),
        relevance: Some(0),
        ..Mode::default()
    }
}

/// A single-quoted string on one line.
pub fn apos_string() -> Mode {
    Mode {
        category: Some("string".to_string()),
        begin: Some("'".into()),
        end: Some("'".to_string()),
        illegal: Some(r"\n".to_string()),
        contains: vec![backslash_escape().into()],
        ..Mode::default()
    }
}

/// A double-quoted string on one line.
pub fn quote_string() -> Mode {
    Mode {
        category: Some("string".to_string()),
        begin: Some("\"".into()),
        end: Some("\"".to_string()),
        illegal: Some(r"\n".to_string()),
        contains: vec![backslash_escape().into()],
        ..Mode::default()
    }
}

/// A comment running from `begin` to `end`, with `patch` merged on top the
/// same way [`Mode::inherit`] merges variants. Tags like `TODO:` and
/// `FIXME:` inside the comment are marked as `doctag`.
pub fn comment(begin: &str, end: &str, patch: Mode) -> Mode {
    let base = Mode {
        category: Some("comment".to_string()),
        begin: Some(begin.into()),
        end: Some(end.to_string()),
        ..Mode::default()
    };
    let mut mode = Mode::inherit(&base, patch);
    mode.contains.push(
        Mode {
            category: Some("doctag".to_string()),
            begin: Some("[ ]*(?=(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):)".into()),
            end: Some("(TODO|FIXME|NOTE|BUG|OPTIMIZE|HACK|XXX):".to_string()),
            exclude_begin: true,
            relevance: Some(0),
            ..Mode::default()
        }
        .into(),
    );
    mode
}

/// A `//` comment running to end of line.
pub fn c_line_comment() -> Mode {
    comment("//", "$", Mode::default())
}

/// A `/* ... */` comment.
pub fn c_block_comment() -> Mode {
    comment(r"/\*", r"\*/", Mode::default())
}
