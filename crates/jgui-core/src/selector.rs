#![forbid(unsafe_code)]

//! Minimal CSS selector engine.
//!
//! Supports compound selectors made of a tag (or `*`), `#id`, `.class` and
//! `[attr]` / `[attr=value]` parts, joined by the descendant combinator
//! (whitespace). That is the full surface event bindings and viewlet
//! targets use.
//!
//! # Failure Modes
//!
//! | Input | Result |
//! |-------|--------|
//! | empty / whitespace | `SelectorError` |
//! | unterminated `[` | `SelectorError` |
//! | `>`, `+`, `~`, `:` | `SelectorError` (unsupported) |

use std::fmt;
use std::str::FromStr;

use crate::dom::Element;

/// Error produced when a selector string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    /// The offending input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches(&self, el: &Element) -> bool {
        if self
            .tag
            .as_ref()
            .is_some_and(|tag| !el.tag().eq_ignore_ascii_case(tag))
        {
            return false;
        }
        if self
            .id
            .as_ref()
            .is_some_and(|id| el.id().as_deref() != Some(id.as_str()))
        {
            return false;
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, el.attr(&a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(have)) => *want == have,
        })
    }
}

/// A parsed selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    // Descendant chain, outermost first.
    chain: Vec<Compound>,
}

impl Selector {
    /// Parse a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] for empty input or unsupported syntax.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let err = |reason| SelectorError {
            input: input.to_string(),
            reason,
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(err("empty selector"));
        }

        let mut chain = Vec::new();
        for part in split_compounds(trimmed).map_err(err)? {
            chain.push(parse_compound(&part).map_err(err)?);
        }
        Ok(Self {
            source: trimmed.to_string(),
            chain,
        })
    }

    /// The normalized source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `el` matches this selector.
    ///
    /// Ancestor compounds are matched against the element's ancestors with
    /// no upper bound.
    #[must_use]
    pub fn matches(&self, el: &Element) -> bool {
        self.matches_within(el, None)
    }

    /// Like [`matches`](Self::matches), but ancestor compounds may only match
    /// nodes up to and including `scope`.
    #[must_use]
    pub fn matches_in(&self, el: &Element, scope: &Element) -> bool {
        self.matches_within(el, Some(scope))
    }

    fn matches_within(&self, el: &Element, scope: Option<&Element>) -> bool {
        let Some((last, rest)) = self.chain.split_last() else {
            return false;
        };
        if !last.matches(el) {
            return false;
        }
        // Greedy right-to-left walk is exact for descendant-only chains.
        let mut pending = rest.iter().rev().peekable();
        let mut cursor = el.parent();
        while let Some(node) = cursor {
            let Some(compound) = pending.peek() else {
                break;
            };
            if compound.matches(&node) {
                pending.next();
            }
            if scope.is_some_and(|s| s.ptr_eq(&node)) {
                break;
            }
            cursor = node.parent();
        }
        pending.peek().is_none()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split on whitespace outside of `[...]`.
fn split_compounds(input: &str) -> Result<Vec<String>, &'static str> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    for ch in input.chars() {
        match ch {
            '[' if !in_brackets => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if in_brackets => {
                in_brackets = false;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            '>' | '+' | '~' | ',' | ':' if !in_brackets => {
                return Err("unsupported combinator or pseudo-class");
            }
            c => current.push(c),
        }
    }
    if in_brackets {
        return Err("unterminated attribute selector");
    }
    if !current.is_empty() {
        parts.push(current);
    }
    Ok(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(part: &str) -> Result<Compound, &'static str> {
    let chars: Vec<char> = part.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos = 1;
    } else {
        let tag = take_ident(&chars, &mut pos);
        if !tag.is_empty() {
            compound.tag = Some(tag);
        }
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err("empty id");
                }
                compound.id = Some(id);
            }
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err("empty class name");
                }
                compound.classes.push(class);
            }
            '[' => {
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or("unterminated attribute selector")?;
                let body: String = chars[pos + 1..pos + end].iter().collect();
                pos += end + 1;
                compound.attrs.push(parse_attr(&body)?);
            }
            _ => return Err("unexpected character"),
        }
    }
    Ok(compound)
}

fn parse_attr(body: &str) -> Result<AttrMatch, &'static str> {
    let (name, value) = match body.split_once('=') {
        Some((n, v)) => {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(v);
            (n.trim(), Some(v.to_string()))
        }
        None => (body.trim(), None),
    };
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err("invalid attribute name");
    }
    Ok(AttrMatch {
        name: name.to_string(),
        value,
    })
}
