//! Expression toolkit shared by every directive processor.
//!
//! Everything here works on raw host-language expression text without building
//! an AST. Scanning is byte-oriented: every structural character (quotes,
//! brackets, `$`, `.`, `,`, `=>`) is ASCII, so byte offsets found by the
//! scanner are always valid `str` slice boundaries.
//!
//! Malformed input never panics. Unterminated literals and unbalanced brackets
//! produce a best-effort result, which callers treat as a soft failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered set of reactive variable names, first-seen order, no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DependencySet(Vec<String>);

impl DependencySet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds `name` unless already present. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|existing| existing == name)
    }

    /// Appends every name of `other` not yet present, keeping `other`'s order.
    pub fn union(&mut self, other: &DependencySet) {
        for name in other.iter() {
            self.insert(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Comma-separated form used by the host glue (`"a,b,c"`).
    pub fn to_csv(&self) -> String {
        self.0.join(",")
    }

    pub fn from_csv(csv: &str) -> Self {
        csv.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl From<Vec<String>> for DependencySet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<DependencySet> for Vec<String> {
    fn from(set: DependencySet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for DependencySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = DependencySet::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for DependencySet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name);
        }
    }
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.join(", "))
    }
}

/// Quote and bracket tracker fed one byte at a time.
///
/// Parens, brackets and braces are counted separately and each count is
/// clamped at zero, so a stray closer never drives the depth negative.
#[derive(Debug, Clone, Default)]
pub struct Nesting {
    quote: Option<u8>,
    escaped: bool,
    parens: usize,
    brackets: usize,
    braces: usize,
}

impl Nesting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `byte` and returns true when it sits at top level: outside
    /// any literal, not escaped, at depth zero, and not itself a quote or
    /// bracket character.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if byte == b'\\' {
            self.escaped = true;
            return false;
        }
        if let Some(quote) = self.quote {
            if byte == quote {
                self.quote = None;
            }
            return false;
        }

        match byte {
            b'\'' | b'"' => {
                self.quote = Some(byte);
                false
            }
            b'(' => {
                self.parens += 1;
                false
            }
            b')' => {
                self.parens = self.parens.saturating_sub(1);
                false
            }
            b'[' => {
                self.brackets += 1;
                false
            }
            b']' => {
                self.brackets = self.brackets.saturating_sub(1);
                false
            }
            b'{' => {
                self.braces += 1;
                false
            }
            b'}' => {
                self.braces = self.braces.saturating_sub(1);
                false
            }
            _ => self.is_top_level(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.depth() == 0 && self.quote.is_none()
    }

    pub fn depth(&self) -> usize {
        self.parens + self.brackets + self.braces
    }

    pub fn paren_depth(&self) -> usize {
        self.parens
    }

    pub fn in_literal(&self) -> bool {
        self.quote.is_some()
    }
}

/// Splits `text` on `delimiter` only at bracket depth zero and outside quoted
/// literals. Segments keep their surrounding whitespace; an empty trailing
/// segment is dropped.
pub fn split_top_level<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    let mut segments = Vec::new();
    if delimiter.is_empty() {
        if !text.is_empty() {
            segments.push(text);
        }
        return segments;
    }

    let bytes = text.as_bytes();
    let mut nesting = Nesting::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if nesting.feed(bytes[i]) && text[i..].starts_with(delimiter) {
            segments.push(&text[start..i]);
            i += delimiter.len();
            start = i;
            continue;
        }
        i += 1;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// Comma-separated parameter list: top-level split, trimmed, blanks removed.
pub fn split_params(text: &str) -> Vec<&str> {
    split_top_level(text, ",")
        .into_iter()
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .collect()
}

/// Byte offset of the first top-level occurrence of `needle`.
pub fn find_top_level(text: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut nesting = Nesting::new();
    text.bytes()
        .enumerate()
        .find(|&(i, byte)| nesting.feed(byte) && text[i..].starts_with(needle))
        .map(|(i, _)| i)
}

/// Collects every `$identifier` read by `text`.
///
/// Single-quoted literals are opaque; double-quoted literals interpolate, so
/// references inside them are still collected. For `$user->name` only `user`
/// is reported.
pub fn extract_variable_references(text: &str) -> DependencySet {
    let bytes = text.as_bytes();
    let mut references = DependencySet::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'\\' {
            i += 2;
            continue;
        }

        match quote {
            Some(b'\'') => {
                if byte == b'\'' {
                    quote = None;
                }
                i += 1;
                continue;
            }
            Some(open) if byte == open => {
                quote = None;
                i += 1;
                continue;
            }
            Some(_) => {}
            None if byte == b'\'' || byte == b'"' => {
                quote = Some(byte);
                i += 1;
                continue;
            }
            None => {}
        }

        if byte == b'$' {
            if let Some(end) = identifier_end(bytes, i + 1) {
                references.insert(&text[i + 1..end]);
                i = end;
                continue;
            }
        }
        i += 1;
    }

    references
}

/// Rewrites a host expression into client render syntax.
///
/// `.` becomes ` + `, `->` becomes `.`, and `$name` loses its sigil. A `.`
/// with a digit on both sides is a decimal point and is kept. Quoted literals
/// are copied unchanged.
pub fn transform_to_render_expression(text: &str) -> (String, DependencySet) {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len() + 8);
    let mut references = DependencySet::new();
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        match byte {
            b'\\' => {
                out.push(byte);
                if let Some(&next) = bytes.get(i + 1) {
                    out.push(next);
                }
                i += 2;
            }
            b'\'' | b'"' => {
                let end = literal_end(bytes, i);
                out.extend_from_slice(&bytes[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'>') => {
                out.push(b'.');
                i += 2;
            }
            b'$' => match identifier_end(bytes, i + 1) {
                Some(end) => {
                    references.insert(&text[i + 1..end]);
                    out.extend_from_slice(&bytes[i + 1..end]);
                    i = end;
                }
                None => {
                    out.push(byte);
                    i += 1;
                }
            },
            b'.' => {
                let prev_digit = i > 0 && bytes[i - 1].is_ascii_digit();
                let next_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
                if prev_digit && next_digit {
                    out.push(b'.');
                } else {
                    if !out.last().is_some_and(u8::is_ascii_whitespace) {
                        out.push(b' ');
                    }
                    out.push(b'+');
                    if !bytes.get(i + 1).is_some_and(u8::is_ascii_whitespace) {
                        out.push(b' ');
                    }
                }
                i += 1;
            }
            _ => {
                out.push(byte);
                i += 1;
            }
        }
    }

    let rendered = String::from_utf8(out)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned());
    (rendered, references)
}

/// Removes one pair of enclosing parentheses when they match each other.
/// `(a)(b)` is returned unchanged.
pub fn strip_outer_parens(text: &str) -> &str {
    let trimmed = text.trim();
    if !(trimmed.starts_with('(') && trimmed.ends_with(')')) || trimmed.len() < 2 {
        return trimmed;
    }

    let mut nesting = Nesting::new();
    for (i, byte) in trimmed.bytes().enumerate() {
        nesting.feed(byte);
        if nesting.paren_depth() == 0 && !nesting.in_literal() && i < trimmed.len() - 1 {
            return trimmed;
        }
    }
    trimmed[1..trimmed.len() - 1].trim()
}

/// Strips one pair of matching single or double quotes.
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            return &text[1..text.len() - 1];
        }
    }
    text
}

pub fn is_quoted(text: &str) -> bool {
    unquote(text).len() != text.len()
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    identifier_end(text.as_bytes(), 0) == Some(text.len())
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Argument text of the first `callee(...)` call in `text`, if balanced.
pub fn call_arguments<'a>(text: &'a str, callee: &str) -> Option<&'a str> {
    let start = text.find(callee)?;
    let rest = &text[start + callee.len()..];
    let open = start + callee.len() + (rest.len() - rest.trim_start().len());
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let close = matching_paren(text, open)?;
    Some(&text[open + 1..close])
}

/// Offset of the `)` closing the `(` at `open`, skipping quoted literals.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut nesting = Nesting::new();
    for (i, &byte) in bytes.iter().enumerate().skip(open) {
        nesting.feed(byte);
        if byte == b')' && nesting.paren_depth() == 0 && !nesting.in_literal() {
            return Some(i);
        }
    }
    None
}

fn identifier_end(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    Some(start + len)
}

/// End offset (exclusive) of the literal opened at `start`; the whole rest of
/// the input when unterminated.
fn literal_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}
