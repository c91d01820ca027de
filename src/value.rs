// used to let records travel as JSON
use serde::{Deserialize, Serialize};

// used to order, print and hash values
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ResourceError, Result};

// ------------- Value -------------
/// A single field value of a resource record.
///
/// `Unset` is what a getter yields for a field the record does not carry.
/// It only ever equals another `Unset` and never satisfies an ordering or
/// containment test.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Unset,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

/// One fact ("variable group") of a namespace.
pub type Record = BTreeMap<String, Value>;

/// Re-iterable input: namespace name to its records.
pub type Resources = BTreeMap<String, Vec<Record>>;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
    // exact, so that 2^53 + 1 never equals 2^53 as f64
    fn same(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => integral(f) == Some(i),
            (Number::Float(a), Number::Float(b)) => a == b,
        }
    }
    fn partial_cmp(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl Value {
    fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unset => "unset",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Truthiness as the `bool()` cast sees it.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Unset => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
        }
    }

    /// Equality as used by `==`, `!=` and list membership: values of unrelated
    /// types are unequal, NaN equals nothing.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unset, Value::Unset) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y)),
            (a, b) => match (a.number(), b.number()) {
                (Some(x), Some(y)) => x.same(y),
                _ => false,
            },
        }
    }

    /// Ordering as used by `>`, `>=` and `<=`.
    ///
    /// `Ok(None)` means the operands are comparable in principle but the
    /// comparison cannot hold (an unset side or a NaN). Unrelated types are a
    /// type error naming `operator`.
    pub fn compare(&self, other: &Value, operator: &str) -> Result<Option<Ordering>> {
        match (self, other) {
            (Value::Unset, _) | (_, Value::Unset) => Ok(None),
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if !x.loose_eq(y) {
                        return x.compare(y, operator);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            }
            (a, b) => match (a.number(), b.number()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(y)),
                _ => Err(ResourceError::Type(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    operator,
                    a.type_name(),
                    b.type_name()
                ))),
            },
        }
    }

    /// Membership test with `self` as the container: `item in self`.
    pub fn contains(&self, item: &Value) -> Result<bool> {
        match (self, item) {
            (Value::Unset, _) => Ok(false),
            (Value::List(items), item) => Ok(items.iter().any(|x| x.loose_eq(item))),
            (Value::Str(_), Value::Unset) => Ok(false),
            (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
            (Value::Str(_), other) => Err(ResourceError::Type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
            (other, _) => Err(ResourceError::Type(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Literal form, with strings quoted; used when rendering expressions.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Value::List(items) => format!("[{}]", items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")),
            other => other.to_string(),
        }
    }
}

fn format_float(f: f64, out: &mut fmt::Formatter) -> fmt::Result {
    if f.is_nan() {
        write!(out, "nan")
    } else if f.is_infinite() {
        write!(out, "{}", if f > 0.0 { "inf" } else { "-inf" })
    } else {
        // `Debug` switches to scientific notation where repr does; only the
        // exponent differs, which carries a sign and at least two digits
        let text = format!("{:?}", f);
        match text.split_once('e') {
            Some((mantissa, exponent)) => match exponent.parse::<i32>() {
                Ok(exponent) => {
                    let sign = if exponent < 0 { '-' } else { '+' };
                    write!(out, "{}e{}{:02}", mantissa, sign, exponent.unsigned_abs())
                }
                Err(_) => write!(out, "{}", text),
            },
            None => write!(out, "{}", text),
        }
    }
}

// same rendering as the str() cast produces
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Unset => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => format_float(*x, f),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) => write!(f, "{}", self.repr()),
        }
    }
}

// Structural identity, used when OR branches are merged: numbers are equal
// across bool/int/float by magnitude and NaN is identical to itself.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) if a.is_nan() && b.is_nan() => true,
            (Value::List(a), Value::List(b)) => a == b,
            _ => self.loose_eq(other),
        }
    }
}
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Unset => 0u8.hash(state),
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::List(items) => {
                4u8.hash(state);
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            number => {
                let as_int = match number.number() {
                    Some(Number::Int(i)) => Some(i),
                    Some(Number::Float(f)) => integral(f),
                    None => None,
                };
                match (as_int, number) {
                    (Some(i), _) => {
                        1u8.hash(state);
                        i.hash(state);
                    }
                    (None, Value::Float(f)) => {
                        2u8.hash(state);
                        let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                        bits.hash(state);
                    }
                    _ => 0u8.hash(state),
                }
            }
        }
    }
}

// ------------- Conversions -------------
impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Int(i64::from(i)) }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(s.to_string()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(s) }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self { Value::List(items.into_iter().map(Into::into).collect()) }
}

/// Renders a record the way the explain report prints it.
pub fn render_record(record: &Record) -> String {
    let fields: Vec<String> = record.iter().map(|(k, v)| format!("'{}': {}", k, v.repr())).collect();
    format!("{{{}}}", fields.join(", "))
}
