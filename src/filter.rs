//! Per-function `if (...)` filters
//!
//! A filter is a predicate over rows of a block. Applying a filter clears
//! bitmap bits for the rows it rejects; it never sets bits. The supported
//! surface is word/phrase matching per field, prefix matching, boolean
//! combinators and parentheses.

use crate::bitmap::Bitmap;
use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::{get_canonical_column_name, quote_token_if_needed, Lexer};
use crate::pipe::FieldsSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every row; produced by an empty `if ()` or a lone `*`.
    MatchAll,
    /// Matches rows where the field contains `phrase` as a whole word.
    Phrase { field: String, phrase: String },
    /// Matches rows where some word in the field starts with `prefix`.
    /// An empty prefix matches any non-empty value.
    Prefix { field: String, prefix: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Clear bitmap bits for the rows this filter rejects.
    pub fn apply_to_block(&self, br: &BlockResult, bm: &mut Bitmap) {
        match self {
            Filter::MatchAll => {}
            Filter::Phrase { field, phrase } => {
                bm.update_with(|row| matches_phrase(br.get_value(field, row), phrase));
            }
            Filter::Prefix { field, prefix } => {
                bm.update_with(|row| matches_prefix(br.get_value(field, row), prefix));
            }
            Filter::And(children) => {
                for child in children {
                    child.apply_to_block(br, bm);
                }
            }
            Filter::Or(children) => {
                let orig = bm.clone();
                let mut acc = Bitmap::default();
                acc.init(bm.bits_len());
                for child in children {
                    let mut tmp = orig.clone();
                    child.apply_to_block(br, &mut tmp);
                    acc.or(&tmp);
                }
                bm.and(&acc);
            }
            Filter::Not(child) => {
                let mut matched = bm.clone();
                child.apply_to_block(br, &mut matched);
                bm.and_not(&matched);
            }
        }
    }

    /// Record the fields this filter reads.
    pub fn update_needed_fields(&self, needed: &mut FieldsSet) {
        match self {
            Filter::MatchAll => {}
            Filter::Phrase { field, .. } | Filter::Prefix { field, .. } => needed.add(field),
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.update_needed_fields(needed);
                }
            }
            Filter::Not(child) => child.update_needed_fields(needed),
        }
    }

    /// Parse a filter expression terminated by `)`, `|`, `,` or end of
    /// input. The terminator is left in the lexer.
    pub fn parse(lex: &mut Lexer) -> Result<Filter> {
        parse_or(lex)
    }

    fn is_compound(&self) -> bool {
        matches!(self, Filter::And(_) | Filter::Or(_))
    }
}

fn parse_or(lex: &mut Lexer) -> Result<Filter> {
    let mut children = vec![parse_and(lex)?];
    while lex.is_keyword(&["or"]) {
        lex.next_token();
        children.push(parse_and(lex)?);
    }
    if children.len() == 1 {
        Ok(children.pop().unwrap())
    } else {
        Ok(Filter::Or(children))
    }
}

fn parse_and(lex: &mut Lexer) -> Result<Filter> {
    let mut children = vec![parse_primary(lex)?];
    while !lex.is_keyword(&["or", ")", "|", ",", ""]) {
        if lex.is_keyword(&["and"]) {
            lex.next_token();
            continue;
        }
        children.push(parse_primary(lex)?);
    }
    if children.len() == 1 {
        Ok(children.pop().unwrap())
    } else {
        Ok(Filter::And(children))
    }
}

fn parse_primary(lex: &mut Lexer) -> Result<Filter> {
    if lex.is_keyword(&["not", "!"]) {
        lex.next_token();
        let child = parse_primary(lex)?;
        return Ok(Filter::Not(Box::new(child)));
    }
    if lex.is_keyword(&["("]) {
        lex.next_token();
        let f = parse_or(lex)?;
        if !lex.is_keyword(&[")"]) {
            return Err(lex.error("expecting ')' after filter group"));
        }
        lex.next_token();
        return Ok(f);
    }
    if lex.is_keyword(&["*"]) {
        lex.next_token();
        return Ok(Filter::MatchAll);
    }
    if lex.is_end() {
        return Err(lex.error("missing filter expression"));
    }

    let word = lex.token().to_string();
    lex.next_token();

    if lex.is_keyword(&[":"]) {
        let field = get_canonical_column_name(&word);
        lex.next_token();
        if lex.is_keyword(&["*"]) {
            lex.next_token();
            return Ok(Filter::Prefix {
                field,
                prefix: String::new(),
            });
        }
        if lex.is_end() {
            return Err(lex.error(format!("missing value for field {field:?}")));
        }
        let value = lex.token().to_string();
        lex.next_token();
        if lex.is_keyword(&["*"]) && lex.is_adjacent() {
            lex.next_token();
            return Ok(Filter::Prefix {
                field,
                prefix: value,
            });
        }
        return Ok(Filter::Phrase {
            field,
            phrase: value,
        });
    }

    // Bare word filters the message field.
    let field = get_canonical_column_name("");
    if lex.is_keyword(&["*"]) && lex.is_adjacent() {
        lex.next_token();
        return Ok(Filter::Prefix {
            field,
            prefix: word,
        });
    }
    Ok(Filter::Phrase {
        field,
        phrase: word,
    })
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::MatchAll => write!(f, "*"),
            Filter::Phrase { field, phrase } => {
                if field == "_msg" {
                    write!(f, "{}", quote_token_if_needed(phrase))
                } else {
                    write!(
                        f,
                        "{}:{}",
                        quote_token_if_needed(field),
                        quote_token_if_needed(phrase)
                    )
                }
            }
            Filter::Prefix { field, prefix } => {
                if field == "_msg" {
                    write!(f, "{}*", quote_token_if_needed(prefix))
                } else if prefix.is_empty() {
                    write!(f, "{}:*", quote_token_if_needed(field))
                } else {
                    write!(
                        f,
                        "{}:{}*",
                        quote_token_if_needed(field),
                        quote_token_if_needed(prefix)
                    )
                }
            }
            Filter::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    if child.is_compound() {
                        write!(f, "({child})")?;
                    } else {
                        write!(f, "{child}")?;
                    }
                }
                Ok(())
            }
            Filter::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Filter::Not(child) => {
                if child.is_compound() {
                    write!(f, "not ({child})")
                } else {
                    write!(f, "not {child}")
                }
            }
        }
    }
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn matches_phrase(value: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return value.is_empty();
    }
    let mut start = 0;
    while let Some(pos) = value[start..].find(phrase) {
        let abs = start + pos;
        let before_ok = abs == 0 || !value[..abs].chars().next_back().map_or(false, is_token_char);
        let end = abs + phrase.len();
        let after_ok = end == value.len() || !value[end..].chars().next().map_or(false, is_token_char);
        if before_ok && after_ok {
            return true;
        }
        start = abs + value[abs..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

fn matches_prefix(value: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return !value.is_empty();
    }
    let mut start = 0;
    while let Some(pos) = value[start..].find(prefix) {
        let abs = start + pos;
        let before_ok = abs == 0 || !value[..abs].chars().next_back().map_or(false, is_token_char);
        if before_ok {
            return true;
        }
        start = abs + value[abs..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    fn parse_filter(s: &str) -> Filter {
        let mut lex = Lexer::new(s);
        let f = Filter::parse(&mut lex).unwrap();
        assert!(lex.is_end(), "trailing tokens in {s:?}: {:?}", lex.token());
        f
    }

    fn apply(f: &Filter, br: &BlockResult) -> Vec<usize> {
        let mut bm = Bitmap::default();
        bm.init(br.rows_len());
        bm.set_bits();
        f.apply_to_block(br, &mut bm);
        let mut rows = Vec::new();
        bm.for_each_set_bit(|row| rows.push(row));
        rows
    }

    fn test_block() -> BlockResult {
        BlockResult::new(
            4,
            vec![
                Column::new(
                    "status",
                    vec!["ok".into(), "error".into(), "error timeout".into(), "".into()],
                ),
                Column::new(
                    "_msg",
                    vec![
                        "request served".into(),
                        "request failed".into(),
                        "oom".into(),
                        "disk error".into(),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_phrase_filter() {
        let br = test_block();
        assert_eq!(apply(&parse_filter("status:error"), &br), vec![1, 2]);
        assert_eq!(apply(&parse_filter("status:ok"), &br), vec![0]);
        assert_eq!(apply(&parse_filter("request"), &br), vec![0, 1]);
        assert_eq!(apply(&parse_filter(r#"status:"""#), &br), vec![3]);
    }

    #[test]
    fn test_phrase_word_boundaries() {
        assert!(matches_phrase("error timeout", "error"));
        assert!(matches_phrase("disk error", "error"));
        assert!(!matches_phrase("errors", "error"));
        assert!(!matches_phrase("preerror", "error"));
    }

    #[test]
    fn test_prefix_filter() {
        let br = test_block();
        assert_eq!(apply(&parse_filter("status:err*"), &br), vec![1, 2]);
        assert_eq!(apply(&parse_filter("status:*"), &br), vec![0, 1, 2]);
        assert_eq!(apply(&parse_filter("req*"), &br), vec![0, 1]);
    }

    #[test]
    fn test_boolean_combinators() {
        let br = test_block();
        assert_eq!(apply(&parse_filter("status:error request"), &br), vec![1]);
        assert_eq!(
            apply(&parse_filter("status:ok or status:error"), &br),
            vec![0, 1, 2]
        );
        assert_eq!(apply(&parse_filter("not status:error"), &br), vec![0, 3]);
        assert_eq!(
            apply(&parse_filter("(status:ok or status:error) request"), &br),
            vec![0, 1]
        );
        assert_eq!(apply(&parse_filter("*"), &br), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_display_round_trip() {
        for s in [
            "status:error",
            "status:err*",
            "error",
            "err*",
            "status:*",
            "a:1 b:2",
            "a:1 or b:2",
            "not a:1",
            "(a:1 or b:2) c:3",
            "not (a:1 b:2)",
            "*",
        ] {
            let f = parse_filter(s);
            let rendered = f.to_string();
            let reparsed = parse_filter(&rendered);
            assert_eq!(f, reparsed, "round trip failed for {s:?} -> {rendered:?}");
        }
    }

    #[test]
    fn test_needed_fields() {
        let f = parse_filter("status:error or (host:a not region:b)");
        let mut needed = FieldsSet::new();
        f.update_needed_fields(&mut needed);
        assert_eq!(
            needed.get_all(),
            vec!["host".to_string(), "region".to_string(), "status".to_string()]
        );
    }
}
