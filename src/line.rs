//! Template lines and macro tokens
//!
//! A template line carries macros when it contains a marker (`$` or `&`)
//! followed somewhere later by the field separator `|`. Tokens are parsed
//! left to right in three forms:
//!
//! ```text
//! &NAME|p1|p2|        pipe form, parameters are |-terminated segments
//! &NAME(p1,p2)        parenthesized form, parameters are comma-split
//! &<|ABC|payload      conditional directive (also `&!|ABC|payload`)
//! ```
//!
//! Names are normalized to upper case. A marker that is not followed by a
//! well-formed name and terminator is plain text, never an error.

use std::ops::Range;

/// Characters that introduce a trigger reference
pub const MARKERS: [char; 2] = ['$', '&'];

/// Field separator terminating names and parameters
pub const SEPARATOR: char = '|';

/// Names of the one-character conditional directives
pub const INCLUDE_DIRECTIVE: &str = "<";
pub const EXCLUDE_DIRECTIVE: &str = "!";

/// Byte span of a token within its line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// How a token was written in the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallForm {
    Pipe,
    Paren,
    Directive,
}

/// A parsed macro reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    name: String,
    params: Vec<String>,
    /// Marker through the name terminator (`&NAME|`, `&NAME(a,b)`, `&<|ABC|`)
    head: Span,
    /// End offset of each parameter, terminator included
    param_ends: Vec<usize>,
    form: CallForm,
}

impl Token {
    /// Normalized (upper-case) trigger name, never empty
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn form(&self) -> CallForm {
        self.form
    }

    /// Span of the marker and name only
    pub fn head(&self) -> Span {
        self.head
    }

    /// Span covering the token and every parameter it could consume
    pub fn full_span(&self) -> Span {
        Span {
            start: self.head.start,
            end: self.param_ends.last().copied().unwrap_or(self.head.end),
        }
    }

    /// Span and parameters actually consumed by a trigger that accepts at
    /// most `max` parameters. Pipe-form segments beyond `max` stay in the line.
    pub fn consume(&self, max: Option<usize>) -> (Span, &[String]) {
        match self.form {
            CallForm::Pipe => {
                let n = max.map_or(self.params.len(), |m| m.min(self.params.len()));
                let end = if n == 0 {
                    self.head.end
                } else {
                    self.param_ends[n - 1]
                };
                (
                    Span {
                        start: self.head.start,
                        end,
                    },
                    &self.params[..n],
                )
            }
            CallForm::Paren | CallForm::Directive => (self.full_span(), &self.params),
        }
    }

    /// Raw source text of the full token within `line`
    pub fn raw<'l>(&self, line: &'l str) -> &'l str {
        &line[self.full_span().range()]
    }

    pub fn is_directive(&self) -> bool {
        self.form == CallForm::Directive
    }
}

/// One physical line of template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    number: usize,
    text: String,
}

impl Line {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// 1-based line number within its template
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn carries_macros(&self) -> bool {
        carries_macros(&self.text)
    }

    pub fn tokens(&self) -> Vec<Token> {
        tokenize(&self.text)
    }
}

/// True when `text` has a marker followed somewhere later by `|`
pub fn carries_macros(text: &str) -> bool {
    match text.find(MARKERS) {
        Some(i) => text[i + 1..].contains(SEPARATOR),
        None => false,
    }
}

/// Normalize a trigger name for registry lookup
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Extract tokens left to right. Tokens never overlap.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    if !carries_macros(text) {
        return tokens;
    }

    let mut pos = 0;
    while let Some(rel) = text[pos..].find(MARKERS) {
        let start = pos + rel;
        match parse_at(text, start) {
            Some(token) => {
                pos = token.full_span().end;
                tokens.push(token);
            }
            None => pos = start + 1,
        }
        if pos >= text.len() {
            break;
        }
    }
    tokens
}

fn parse_at(text: &str, start: usize) -> Option<Token> {
    let rest = &text[start + 1..];

    if rest.starts_with("<|") || rest.starts_with("!|") {
        if let Some(token) = parse_directive(text, start) {
            return Some(token);
        }
    }

    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
        .count();
    if name_len == 0 {
        return None;
    }
    let name_end = start + 1 + name_len;
    let name = normalize_name(&text[start + 1..name_end]);

    match text.as_bytes().get(name_end) {
        Some(b'|') => Some(parse_pipe_params(text, start, name, name_end + 1)),
        Some(b'(') => parse_paren(text, start, name, name_end),
        _ => None,
    }
}

fn parse_directive(text: &str, start: usize) -> Option<Token> {
    let name = text[start + 1..start + 2].to_string();
    let (prefix, prefix_end) = read_segment(text, start + 3, false)?;
    let payload = text[prefix_end..].to_string();
    Some(Token {
        name,
        params: vec![prefix, payload],
        head: Span {
            start,
            end: prefix_end,
        },
        param_ends: vec![prefix_end, text.len()],
        form: CallForm::Directive,
    })
}

fn parse_pipe_params(text: &str, start: usize, name: String, head_end: usize) -> Token {
    let mut params = Vec::new();
    let mut param_ends = Vec::new();
    let mut cursor = head_end;
    while let Some((value, next)) = read_segment(text, cursor, true) {
        params.push(value);
        param_ends.push(next);
        cursor = next;
    }
    Token {
        name,
        params,
        head: Span {
            start,
            end: head_end,
        },
        param_ends,
        form: CallForm::Pipe,
    }
}

fn parse_paren(text: &str, start: usize, name: String, name_end: usize) -> Option<Token> {
    let close = name_end + text[name_end..].find(')')?;
    let inner = &text[name_end + 1..close];
    let params = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(|p| p.trim().to_string()).collect()
    };
    let mut end = close + 1;
    if text.as_bytes().get(end) == Some(&b'|') {
        end += 1;
    }
    Some(Token {
        name,
        params,
        head: Span { start, end },
        param_ends: Vec::new(),
        form: CallForm::Paren,
    })
}

/// Read a `|`-terminated segment starting at `from`. `\|` is a literal
/// pipe. Returns the unescaped value and the offset after the terminator.
/// With `stop_at_marker`, a segment containing a marker is not a segment.
fn read_segment(text: &str, from: usize, stop_at_marker: bool) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = text[from..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, '|'))) => {
                chars.next();
                value.push('|');
            }
            '|' => return Some((value, from + i + 1)),
            c if stop_at_marker && MARKERS.contains(&c) => return None,
            c => value.push(c),
        }
    }
    None
}
