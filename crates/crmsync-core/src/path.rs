//! Source path parsing and resolution
//!
//! Mapping entries address values in the input record with a small path
//! language:
//!
//! ```text
//! path    := segment ('.' segment)*
//! segment := key ('[' digits ']')*  |  ('[' digits ']')+
//! key     := [A-Za-z0-9_$@-]+
//! ```
//!
//! So `fullName`, `contact.email`, `phones[0]` and `addresses[1].city` are all
//! valid. Paths are parsed once when the mapping is loaded; resolution never
//! fails and simply reports the value as absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One step of a [`SourcePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key (or numeric array position written with a dot)
    Key(String),
    /// Bracketed index
    Index(usize),
}

/// A parsed path into an input record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourcePath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl SourcePath {
    /// Parse a path, failing with a configuration error if it is malformed
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self {
            raw: raw.to_string(),
            segments: parse_segments(raw)?,
        })
    }

    /// The path as written in the mapping
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve this path against `input`.
    ///
    /// Returns `None` when any step is missing, addresses the wrong kind of
    /// value, or lands on an explicit `null`.
    pub fn resolve<'a>(&self, input: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(input, |current, segment| match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Key(key), Value::Array(items)) => {
                    key.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
                (PathSegment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
                _ => None,
            })
            .filter(|value| !value.is_null())
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for SourcePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SourcePath {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        let segments = parse_segments(&raw)?;
        Ok(Self { raw, segments })
    }
}

impl From<SourcePath> for String {
    fn from(path: SourcePath) -> Self {
        path.raw
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '@' | '-')
}

fn malformed(raw: &str, position: usize, reason: &str) -> Error {
    Error::configuration(format!(
        "malformed source path '{raw}' at position {position}: {reason}"
    ))
}

fn parse_segments(raw: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut chars = raw.char_indices().peekable();

    loop {
        let before = segments.len();

        let mut key = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if !is_key_char(c) {
                break;
            }
            key.push(c);
            chars.next();
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }

        while let Some(&(open, '[')) = chars.peek() {
            chars.next();
            let mut digits = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                digits.push(c);
                chars.next();
            }
            match chars.next() {
                Some((_, ']')) if !digits.is_empty() => {}
                Some((pos, _)) => {
                    return Err(malformed(raw, pos, "expected an index followed by ']'"));
                }
                None => return Err(malformed(raw, raw.len(), "unterminated '['")),
            }
            let index = digits
                .parse::<usize>()
                .map_err(|_| malformed(raw, open, "index out of range"))?;
            segments.push(PathSegment::Index(index));
        }

        if segments.len() == before {
            let pos = chars.peek().map_or(raw.len(), |&(pos, _)| pos);
            return Err(malformed(raw, pos, "empty path segment"));
        }

        match chars.next() {
            None => return Ok(segments),
            Some((_, '.')) => {}
            Some((pos, c)) => {
                return Err(malformed(raw, pos, &format!("unexpected character '{c}'")));
            }
        }
    }
}
