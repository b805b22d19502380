//! Tag markup grammar shared by `include` and extension tags.
//!
//! ```text
//! arg0 arg1 … a="lit" b='lit' c=123 d=var e
//! ```
//!
//! Leading bare words fill the requested positional arguments; later bare
//! words are flags with value `true`. Quoted literals may escape their quote
//! character with a backslash.

use regex::Regex;
use std::sync::LazyLock;

static PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([\w/.-]+)(=)?").unwrap());

/// How a named parameter obtains its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Literal(String),
    Number(i64),
    /// Dotted path resolved against the render context.
    Variable(String),
    /// Name given without a value.
    Flag,
}

/// Parsed tag markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub args: Vec<String>,
    pub params: Vec<(String, Param)>,
}

/// Parse `markup`, assigning up to `positional` leading bare words to `args`.
pub fn parse_markup(markup: &str, positional: usize) -> Result<Markup, String> {
    let mut result = Markup::default();
    let mut rest = markup.trim();

    while !rest.is_empty() {
        let caps = PARAM_NAME
            .captures(rest)
            .ok_or_else(|| format!("bad markup format: {rest}"))?;
        let name = caps[1].to_owned();

        if caps.get(2).is_none() {
            rest = &rest[name.len()..];
            if result.args.len() < positional {
                result.args.push(name);
            } else {
                result.params.push((name, Param::Flag));
            }
            rest = rest.trim_start();
            continue;
        }

        let value = &rest[caps[0].len()..];
        match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = closing_quote(value, quote)
                    .ok_or_else(|| format!("unterminated {quote} in markup: {value}"))?;
                result
                    .params
                    .push((name, Param::Literal(unescape(&value[1..end], quote))));
                rest = value[end + 1..].trim_start();
            }
            Some(c) if !c.is_whitespace() => {
                let (token, tail) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
                let param = if token.bytes().all(|b| b.is_ascii_digit()) {
                    token
                        .parse()
                        .map_or_else(|_| Param::Literal(token.to_owned()), Param::Number)
                } else {
                    Param::Variable(token.to_owned())
                };
                result.params.push((name, param));
                rest = tail.trim_start();
            }
            _ => return Err(format!("missing value for `{name}`")),
        }
    }

    Ok(result)
}

/// Byte index of the first unescaped `quote` after the opening one.
fn closing_quote(value: &str, quote: char) -> Option<usize> {
    let mut escape = false;
    for (i, c) in value.char_indices().skip(1) {
        if escape {
            escape = false;
        } else if c == '\\' {
            escape = true;
        } else if c == quote {
            return Some(i);
        }
    }
    None
}

fn unescape(literal: &str, quote: char) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && (next == quote || next == '\\')
        {
            out.push(next);
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn include(markup: &str) -> Markup {
        parse_markup(markup, 1).unwrap()
    }

    #[test]
    fn test_name_only() {
        let m = include("nav.html ");
        assert_eq!(m.args, vec!["nav.html"]);
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_flag_after_positional() {
        let m = include("nav.html compact");
        assert_eq!(m.params, vec![("compact".to_string(), Param::Flag)]);
    }

    #[test]
    fn test_variable_and_number() {
        let m = include("card.html item=post count=12 other=x");
        assert_eq!(
            m.params,
            vec![
                ("item".to_string(), Param::Variable("post".into())),
                ("count".to_string(), Param::Number(12)),
                ("other".to_string(), Param::Variable("x".into())),
            ]
        );
    }

    #[test]
    fn test_quoted_literal_keeps_spaces() {
        let m = include(r#"x.html a="bbb ccc=ddd" e=fff"#);
        assert_eq!(
            m.params,
            vec![
                ("a".to_string(), Param::Literal("bbb ccc=ddd".into())),
                ("e".to_string(), Param::Variable("fff".into())),
            ]
        );
    }

    #[test]
    fn test_quote_escapes() {
        let m = include(r#"x.html a="say \"hi\"" b='it\'s'"#);
        assert_eq!(m.params[0], ("a".to_string(), Param::Literal(r#"say "hi""#.into())));
        assert_eq!(m.params[1], ("b".to_string(), Param::Literal("it's".into())));
    }

    #[test]
    fn test_other_quote_inside_literal() {
        let m = include(r#"x.html a="bbb ccc'ddd""#);
        assert_eq!(m.params[0].1, Param::Literal("bbb ccc'ddd".into()));
    }

    #[test]
    fn test_bad_markup() {
        assert!(parse_markup("=oops", 1).is_err());
        assert!(parse_markup(r#"x a="open"#, 1).is_err());
        assert!(parse_markup("x a= b", 1).is_err());
    }

    #[test]
    fn test_no_positional() {
        let m = parse_markup("lang=rust linenos", 0).unwrap();
        assert!(m.args.is_empty());
        assert_eq!(m.params[1], ("linenos".to_string(), Param::Flag));
    }
}
