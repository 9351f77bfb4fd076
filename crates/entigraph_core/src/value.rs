//! Scalar attribute values.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// UTF-8 text.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// Raw bytes.
    Bytes,
}

impl ScalarType {
    /// Returns the value an unset attribute of this type starts with.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Text => Value::Text(String::new()),
            Self::Integer => Value::Integer(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::Timestamp => Value::Timestamp(0),
            Self::Bytes => Value::Bytes(Vec::new()),
        }
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Bytes => "bytes",
        }
    }

    /// Converts `value` into this type, if it is compatible.
    ///
    /// Integers widen to floats and timestamps; nothing else converts.
    /// `Null` is handled by the caller, which knows whether the attribute is
    /// optional.
    #[must_use]
    pub fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (Self::Text, v @ Value::Text(_))
            | (Self::Integer, v @ Value::Integer(_))
            | (Self::Float, v @ Value::Float(_))
            | (Self::Bool, v @ Value::Bool(_))
            | (Self::Timestamp, v @ Value::Timestamp(_))
            | (Self::Bytes, v @ Value::Bytes(_)) => Some(v),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, Value::Integer(n)) => Some(Value::Float(n as f64)),
            (Self::Timestamp, Value::Integer(n)) => Some(Value::Timestamp(n)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamic attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (optional attributes only).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string.
    Text(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get this value as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) | Self::Timestamp(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float; integers widen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Integer(n) | Self::Timestamp(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Compares two values by their natural ordering.
    ///
    /// Numbers compare across integer, float and timestamp. Values of
    /// unrelated types, and anything involving `Null` other than `Null` vs
    /// `Null`, are incomparable.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b))
            | (Self::Timestamp(a), Self::Timestamp(b))
            | (Self::Integer(a), Self::Timestamp(b))
            | (Self::Timestamp(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality under the natural ordering (`1 == 1.0`).
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// A total order for sorting: `Null` first, then by type, then naturally.
    ///
    /// NaN sorts after every other number.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) if other.sort_rank() == NUMERIC_RANK => Ordering::Greater,
            (false, true) if self.sort_rank() == NUMERIC_RANK => Ordering::Less,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.sort_rank().cmp(&other.sort_rank())),
        }
    }

    fn is_nan(&self) -> bool {
        matches!(self, Self::Float(x) if x.is_nan())
    }

    #[allow(clippy::cast_precision_loss)]
    fn numeric(&self) -> Option<f64> {
        match self {
            Self::Float(x) if !x.is_nan() => Some(*x),
            Self::Integer(n) | Self::Timestamp(n) => Some(*n as f64),
            _ => None,
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Float(_) | Self::Timestamp(_) => NUMERIC_RANK,
            Self::Text(_) => 3,
            Self::Bytes(_) => 4,
        }
    }
}

const NUMERIC_RANK: u8 = 2;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Timestamp(ms) => write!(f, "@{ms}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
