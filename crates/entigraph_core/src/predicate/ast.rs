//! Predicate expression tree.

use crate::error::{CoreError, CoreResult};
use crate::schema::EntityDescriptor;
use crate::value::Value;
use std::fmt;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==` or `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// String pattern operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    /// `BEGINSWITH`
    BeginsWith,
    /// `ENDSWITH`
    EndsWith,
    /// `CONTAINS`
    Contains,
    /// `LIKE`, with `*` matching any run and `?` one character.
    Like,
}

impl TextOp {
    const fn keyword(self) -> &'static str {
        match self {
            Self::BeginsWith => "BEGINSWITH",
            Self::EndsWith => "ENDSWITH",
            Self::Contains => "CONTAINS",
            Self::Like => "LIKE",
        }
    }
}

/// A parsed predicate.
///
/// Build one with [`Predicate::parse`], [`Predicate::from_equalities`] or the
/// combinators below.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `TRUEPREDICATE` or `FALSEPREDICATE`.
    Constant(bool),
    /// `key op value`.
    Compare {
        /// Attribute name.
        key: String,
        /// Operator.
        op: CompareOp,
        /// Right-hand literal.
        value: Value,
        /// `[c]` modifier; applies to text operands of `==` and `!=`.
        case_insensitive: bool,
    },
    /// `key BEGINSWITH pattern` and friends.
    Text {
        /// Attribute name.
        key: String,
        /// Operator.
        op: TextOp,
        /// Right-hand pattern.
        pattern: String,
        /// `[c]` modifier.
        case_insensitive: bool,
    },
    /// `key IN {a, b, ...}`.
    In {
        /// Attribute name.
        key: String,
        /// Candidate values.
        values: Vec<Value>,
        /// `[c]` modifier.
        case_insensitive: bool,
    },
    /// Conjunction; empty is true.
    And(Vec<Predicate>),
    /// Disjunction; empty is false.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Parses a predicate source, binding `%@` placeholders left to right.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPredicate` for malformed sources and when the number
    /// of placeholders differs from `args.len()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use entigraph_core::{Predicate, Value};
    ///
    /// let p = Predicate::parse("name BEGINSWITH[c] %@ AND age < 30", &[Value::from("ah")]).unwrap();
    /// assert_eq!(p.keys(), ["name", "age"]);
    /// ```
    pub fn parse(source: &str, args: &[Value]) -> CoreResult<Self> {
        super::parser::Parser::new(source, args)?.parse()
    }

    /// A predicate matching everything.
    #[must_use]
    pub fn all() -> Self {
        Self::Constant(true)
    }

    /// A plain comparison.
    pub fn compare(key: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            key: key.into(),
            op,
            value: value.into(),
            case_insensitive: false,
        }
    }

    /// `key == value`.
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, CompareOp::Eq, value)
    }

    /// ANDs `key == value` for every pair; no pairs matches everything.
    pub fn from_equalities<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut terms: Vec<_> = pairs.into_iter().map(|(k, v)| Self::eq(k, v)).collect();
        match terms.len() {
            0 => Self::all(),
            1 => terms.remove(0),
            _ => Self::And(terms),
        }
    }

    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut terms) => {
                terms.push(other);
                Self::And(terms)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Disjunction of `self` and `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut terms) => {
                terms.push(other);
                Self::Or(terms)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negation of `self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Returns the attribute names referenced, in source order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Self::Constant(_) => {}
            Self::Compare { key, .. } | Self::Text { key, .. } | Self::In { key, .. } => {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
            Self::And(terms) | Self::Or(terms) => {
                for term in terms {
                    term.collect_keys(keys);
                }
            }
            Self::Not(inner) => inner.collect_keys(keys),
        }
    }

    /// Checks that every referenced key is an attribute of `descriptor`.
    ///
    /// # Errors
    ///
    /// `UnknownKey` for names the entity lacks, `TypeMismatch` for
    /// relationship names.
    pub fn validate(&self, descriptor: &EntityDescriptor) -> CoreResult<()> {
        for key in self.keys() {
            descriptor.attribute_key(key)?;
        }
        Ok(())
    }

    /// Checks that `value` can stand on the right of a string operator.
    pub(crate) fn text_operand(position: usize, value: Value) -> CoreResult<String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(CoreError::invalid_predicate(
                position,
                format!("string operator needs a text operand, got {}", other.type_name()),
            )),
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("NIL"),
        Value::Bool(true) => f.write_str("TRUE"),
        Value::Bool(false) => f.write_str("FALSE"),
        Value::Text(s) => write!(f, "{s:?}"),
        other => write!(f, "{other}"),
    }
}

fn modifier(case_insensitive: bool) -> &'static str {
    if case_insensitive {
        "[c]"
    } else {
        ""
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(true) => f.write_str("TRUEPREDICATE"),
            Self::Constant(false) => f.write_str("FALSEPREDICATE"),
            Self::Compare {
                key,
                op,
                value,
                case_insensitive,
            } => {
                write!(f, "{key} {}{} ", op.symbol(), modifier(*case_insensitive))?;
                write_literal(f, value)
            }
            Self::Text {
                key,
                op,
                pattern,
                case_insensitive,
            } => write!(
                f,
                "{key} {}{} {pattern:?}",
                op.keyword(),
                modifier(*case_insensitive)
            ),
            Self::In {
                key,
                values,
                case_insensitive,
            } => {
                write!(f, "{key} IN{} {{", modifier(*case_insensitive))?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_literal(f, value)?;
                }
                f.write_str("}")
            }
            Self::And(terms) | Self::Or(terms) => {
                let joiner = if matches!(self, Self::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{term}")?;
                }
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}
