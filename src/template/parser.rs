//! Template source → node tree.
//!
//! ```text
//! text {{ expr | filter: arg, arg }} text {% tag markup %} … {% endtag %}
//! ```
//!
//! Blocks (`if`/`else`/`endif`, `for`/`endfor`) nest; everything else is a
//! leaf. Unknown tags are rejected at parse time.

use super::TemplateError;
use super::markup::{Markup, Param, parse_markup};
use super::value::Value;
use std::path::Path;

// ============================================================================
// Node Tree
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    /// Dotted variable path.
    Path(String),
}

#[derive(Debug, Clone)]
pub(crate) struct FilterCall {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub(crate) struct Condition {
    pub left: Expr,
    /// `(negated, right)` for `==` / `!=`
    pub compare: Option<(bool, Expr)>,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output {
        expr: Expr,
        filters: Vec<FilterCall>,
    },
    If {
        cond: Condition,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    For {
        var: String,
        iter: Expr,
        body: Vec<Node>,
    },
    Include {
        /// File name under `_includes/`, `.html` appended when missing.
        file: String,
        params: Vec<(String, Param)>,
    },
    Log(Vec<String>),
    Tag {
        name: String,
        markup: String,
        parsed: Markup,
    },
}

// ============================================================================
// Expression Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    Str(String),
    Int(i64),
    Float(f64),
    Pipe,
    Colon,
    Comma,
    Eq,
    Ne,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '?')
}

fn lex(src: &str, line: usize) -> Result<Vec<Tok>, TemplateError> {
    let mut toks = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' | ':' | ',' => {
                chars.next();
                toks.push(match c {
                    '|' => Tok::Pipe,
                    ':' => Tok::Colon,
                    _ => Tok::Comma,
                });
            }
            '=' | '!' => {
                chars.next();
                if chars.next_if(|&(_, n)| n == '=').is_none() {
                    return Err(TemplateError::new(line, format!("unexpected `{c}` in `{src}`")));
                }
                toks.push(if c == '=' { Tok::Eq } else { Tok::Ne });
            }
            '"' | '\'' => {
                chars.next();
                let body_start = start + 1;
                let end = loop {
                    match chars.next() {
                        Some((i, q)) if q == c => break i,
                        Some(_) => {}
                        None => {
                            return Err(TemplateError::new(
                                line,
                                format!("unterminated string in `{src}`"),
                            ));
                        }
                    }
                };
                toks.push(Tok::Str(src[body_start..end].to_owned()));
            }
            c if c.is_ascii_digit() || c == '-' => {
                chars.next();
                let mut end = start + c.len_utf8();
                while let Some((i, n)) = chars.next_if(|&(_, n)| n.is_ascii_digit() || n == '.') {
                    end = i + n.len_utf8();
                }
                let text = &src[start..end];
                let tok = if text.contains('.') {
                    text.parse().ok().map(Tok::Float)
                } else {
                    text.parse().ok().map(Tok::Int)
                };
                toks.push(tok.ok_or_else(|| {
                    TemplateError::new(line, format!("bad number `{text}`"))
                })?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some((i, n)) = chars.next_if(|&(_, n)| is_word_char(n)) {
                    end = i + n.len_utf8();
                }
                toks.push(Tok::Word(src[start..end].to_owned()));
            }
            _ => {
                return Err(TemplateError::new(
                    line,
                    format!("unexpected `{c}` in `{src}`"),
                ));
            }
        }
    }

    Ok(toks)
}

/// Cursor over lexed tokens.
struct Toks {
    toks: Vec<Tok>,
    pos: usize,
    line: usize,
}

impl Toks {
    fn new(src: &str, line: usize) -> Result<Self, TemplateError> {
        Ok(Self {
            toks: lex(src, line)?,
            pos: 0,
            line,
        })
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::new(self.line, message)
    }

    fn expr(&mut self) -> Result<Expr, TemplateError> {
        Ok(match self.next() {
            Some(Tok::Str(s)) => Expr::Literal(Value::Str(s)),
            Some(Tok::Int(i)) => Expr::Literal(Value::Int(i)),
            Some(Tok::Float(f)) => Expr::Literal(Value::Float(f)),
            Some(Tok::Word(w)) => match w.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "nil" | "null" => Expr::Literal(Value::Nil),
                _ => Expr::Path(w),
            },
            other => return Err(self.error(format!("expected a value, found {other:?}"))),
        })
    }

    fn end(&self) -> Result<(), TemplateError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(self.error(format!("unexpected {tok:?}"))),
        }
    }
}

fn parse_output(src: &str, line: usize) -> Result<Node, TemplateError> {
    let mut toks = Toks::new(src, line)?;
    let expr = toks.expr()?;
    let mut filters = Vec::new();

    while toks.eat(&Tok::Pipe) {
        let Some(Tok::Word(name)) = toks.next() else {
            return Err(toks.error("expected a filter name after `|`"));
        };
        let mut args = Vec::new();
        if toks.eat(&Tok::Colon) {
            args.push(toks.expr()?);
            while toks.eat(&Tok::Comma) {
                args.push(toks.expr()?);
            }
        }
        filters.push(FilterCall { name, args });
    }
    toks.end()?;

    Ok(Node::Output { expr, filters })
}

fn parse_condition(src: &str, line: usize) -> Result<Condition, TemplateError> {
    let mut toks = Toks::new(src, line)?;
    let left = toks.expr()?;
    let compare = match toks.peek() {
        Some(Tok::Eq) | Some(Tok::Ne) => {
            let negated = toks.next() == Some(Tok::Ne);
            Some((negated, toks.expr()?))
        }
        _ => None,
    };
    toks.end()?;
    Ok(Condition { left, compare })
}

fn parse_for(src: &str, line: usize) -> Result<(String, Expr), TemplateError> {
    let mut toks = Toks::new(src, line)?;
    let (Some(Tok::Word(var)), Some(Tok::Word(kw))) = (toks.next(), toks.next()) else {
        return Err(toks.error("expected `for <name> in <value>`"));
    };
    if kw != "in" || var.contains('.') {
        return Err(toks.error("expected `for <name> in <value>`"));
    }
    let iter = toks.expr()?;
    toks.end()?;
    Ok((var, iter))
}

/// Include file name for a tag argument.
pub(crate) fn include_file(name: &str) -> String {
    if Path::new(name).extension().is_some_and(|ext| ext == "html") {
        name.to_owned()
    } else {
        format!("{name}.html")
    }
}

// ============================================================================
// Block Parser
// ============================================================================

enum Chunk<'a> {
    Text(&'a str),
    Output(&'a str),
    Tag(&'a str, &'a str),
}

/// Tag names handled by the parser itself.
pub(crate) const BUILTIN_TAGS: &[&str] = &["if", "else", "endif", "for", "endfor", "include", "log"];

pub(crate) struct Parser<'a> {
    source: &'a str,
    pos: usize,
    is_tag: &'a dyn Fn(&str) -> bool,
}

impl<'a> Parser<'a> {
    /// `is_tag` reports whether an extension tag of that name is registered.
    pub fn new(source: &'a str, is_tag: &'a dyn Fn(&str) -> bool) -> Self {
        Self {
            source,
            pos: 0,
            is_tag,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Node>, TemplateError> {
        let (nodes, _) = self.block(&[])?;
        Ok(nodes)
    }

    fn line(&self, at: usize) -> usize {
        self.source[..at].matches('\n').count() + 1
    }

    /// Next chunk and the line it starts on.
    fn next_chunk(&mut self) -> Result<Option<(Chunk<'a>, usize)>, TemplateError> {
        let start = self.pos;
        let rest = &self.source[start..];
        if rest.is_empty() {
            return Ok(None);
        }
        let line = self.line(start);

        let open = match (rest.find("{{"), rest.find("{%")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match open {
            None => {
                self.pos = self.source.len();
                Ok(Some((Chunk::Text(rest), line)))
            }
            Some(0) => {
                let output = rest.starts_with("{{");
                let close = if output { "}}" } else { "%}" };
                let end = rest[2..].find(close).ok_or_else(|| {
                    TemplateError::new(line, format!("unclosed `{}`", &rest[..2]))
                })?;
                self.pos = start + 2 + end + 2;
                let inner = rest[2..2 + end].trim().trim_matches('-').trim();
                if output {
                    return Ok(Some((Chunk::Output(inner), line)));
                }
                let (name, markup) = inner.split_once(char::is_whitespace).unwrap_or((inner, ""));
                Ok(Some((Chunk::Tag(name, markup.trim()), line)))
            }
            Some(i) => {
                self.pos = start + i;
                Ok(Some((Chunk::Text(&rest[..i]), line)))
            }
        }
    }

    /// Parse until one of `terminators` (returned) or end of input.
    fn block(&mut self, terminators: &[&str]) -> Result<(Vec<Node>, Option<&'a str>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some((chunk, line)) = self.next_chunk()? {
            let (name, markup) = match chunk {
                Chunk::Text(text) => {
                    nodes.push(Node::Text(text.to_owned()));
                    continue;
                }
                Chunk::Output(src) => {
                    nodes.push(parse_output(src, line)?);
                    continue;
                }
                Chunk::Tag(name, markup) => (name, markup),
            };

            if terminators.contains(&name) {
                return Ok((nodes, Some(name)));
            }

            let node = match name {
                "if" => {
                    let cond = parse_condition(markup, line)?;
                    let (then, end) = self.block(&["else", "endif"])?;
                    let otherwise = match end {
                        Some("else") => self.expect_block("endif", line)?,
                        Some(_) => Vec::new(),
                        None => return Err(TemplateError::new(line, "`if` is never closed")),
                    };
                    Node::If {
                        cond,
                        then,
                        otherwise,
                    }
                }
                "for" => {
                    let (var, iter) = parse_for(markup, line)?;
                    let body = self.expect_block("endfor", line)?;
                    Node::For { var, iter, body }
                }
                "include" => {
                    let Markup { args, params } = parse_markup(markup, 1)
                        .map_err(|message| TemplateError::new(line, message))?;
                    let name = args
                        .first()
                        .ok_or_else(|| TemplateError::new(line, "include needs a template name"))?;
                    Node::Include {
                        file: include_file(name),
                        params,
                    }
                }
                "log" => Node::Log(markup.split_whitespace().map(str::to_owned).collect()),
                "else" | "endif" | "endfor" => {
                    return Err(TemplateError::new(line, format!("unexpected `{name}`")));
                }
                _ if (self.is_tag)(name) => Node::Tag {
                    name: name.to_owned(),
                    markup: markup.to_owned(),
                    parsed: parse_markup(markup, 0)
                        .map_err(|message| TemplateError::new(line, message))?,
                },
                _ => return Err(TemplateError::new(line, format!("unknown tag `{name}`"))),
            };
            nodes.push(node);
        }

        if let Some(expected) = terminators.last() {
            return Err(TemplateError::new(
                self.line(self.pos),
                format!("missing `{expected}`"),
            ));
        }
        Ok((nodes, None))
    }

    fn expect_block(&mut self, end: &str, line: usize) -> Result<Vec<Node>, TemplateError> {
        match self.block(&[end])? {
            (nodes, Some(_)) => Ok(nodes),
            (_, None) => Err(TemplateError::new(line, format!("missing `{end}`"))),
        }
    }
}
