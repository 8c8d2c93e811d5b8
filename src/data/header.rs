use std::collections::BTreeMap;
use std::fmt;

use super::error::{CubeError, Result};

// ---------------------------------------------------------------------------
// HeaderValue – a single header card value
// ---------------------------------------------------------------------------

/// A dynamically-typed header value mirroring the FITS card value types.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Keyword present without a value (or with an unsupported value type).
    Null,
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Null => write!(f, "<null>"),
        }
    }
}

impl HeaderValue {
    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            HeaderValue::String(_) => "string",
            HeaderValue::Integer(_) => "integer",
            HeaderValue::Float(_) => "float",
            HeaderValue::Bool(_) => "logical",
            HeaderValue::Null => "null",
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::String(s.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::String(s)
    }
}

impl From<i64> for HeaderValue {
    fn from(n: i64) -> Self {
        HeaderValue::Integer(n)
    }
}

impl From<i32> for HeaderValue {
    fn from(n: i32) -> Self {
        HeaderValue::Integer(i64::from(n))
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(b: bool) -> Self {
        HeaderValue::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// Header – keyword → value mapping
// ---------------------------------------------------------------------------

/// Header metadata of one HDU. Keywords are stored uppercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: BTreeMap<String, HeaderValue>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a card, replacing any previous value for the keyword.
    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) {
        self.cards.insert(key.trim().to_ascii_uppercase(), value.into());
    }

    /// Builder-style [`Header::insert`].
    pub fn with(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.get(&key.to_ascii_uppercase())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Required-field schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKind {
    Text,
    /// Integer that must equal the given value.
    IntegerEq(i64),
}

struct RequiredField {
    key: &'static str,
    kind: FieldKind,
}

/// Fields every cube header must define.
const REQUIRED_FIELDS: &[RequiredField] = &[
    RequiredField {
        key: "OBJECT",
        kind: FieldKind::Text,
    },
    RequiredField {
        key: "LINENAME",
        kind: FieldKind::Text,
    },
    RequiredField {
        key: "NAXIS",
        kind: FieldKind::IntegerEq(3),
    },
];

/// Identity of a cube as read from its required header fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeIdentity {
    pub object_name: String,
    pub line_name: String,
}

/// Validate `header` against the required-field schema.
///
/// All problems are collected into a single [`CubeError::Format`].
pub fn validate_required(header: &Header) -> Result<CubeIdentity> {
    let mut problems = Vec::new();

    for field in REQUIRED_FIELDS {
        let Some(value) = header.get(field.key) else {
            problems.push(format!("missing required keyword {}", field.key));
            continue;
        };
        match (field.kind, value) {
            (FieldKind::Text, HeaderValue::String(_)) => {}
            (FieldKind::IntegerEq(expected), HeaderValue::Integer(n)) if *n == expected => {}
            (FieldKind::IntegerEq(expected), HeaderValue::Integer(n)) => {
                problems.push(format!("{} is {n}, expected {expected}", field.key));
            }
            (FieldKind::Text, other) => problems.push(format!(
                "{} must be a string, found {}",
                field.key,
                other.kind_name()
            )),
            (FieldKind::IntegerEq(_), other) => problems.push(format!(
                "{} must be an integer, found {}",
                field.key,
                other.kind_name()
            )),
        }
    }

    if !problems.is_empty() {
        return Err(CubeError::Format(problems));
    }

    Ok(CubeIdentity {
        object_name: header.get_str("OBJECT").unwrap_or_default().to_string(),
        line_name: header.get_str("LINENAME").unwrap_or_default().to_string(),
    })
}
