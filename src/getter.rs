// Value getters: compiled accessors that pull a value out of one record.

// used to validate the text handed to the int() cast
use lazy_static::lazy_static;
use regex::Regex;

use std::fmt;

use crate::ast::{Node, UnaryOperator};
use crate::error::{ResourceError, Result};
use crate::value::{Record, Value};

lazy_static! {
    static ref DECIMAL_INT: Regex = Regex::new(r"^[+-]?[0-9]+(_[0-9]+)*$").unwrap();
    static ref DECIMAL_FLOAT: Regex =
        Regex::new(r"^[+-]?([0-9]+(_[0-9]+)*(\.([0-9]+(_[0-9]+)*)?)?|\.[0-9]+(_[0-9]+)*)([eE][+-]?[0-9]+)?$").unwrap();
}

// ------------- Cast -------------
/// The functions a requirement may call, all of them type conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Int,
    Bool,
    Float,
    Str,
}

impl Cast {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Cast::Int),
            "bool" => Some(Cast::Bool),
            "float" => Some(Cast::Float),
            "str" => Some(Cast::Str),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cast::Int => "int",
            Cast::Bool => "bool",
            Cast::Float => "float",
            Cast::Str => "str",
        }
    }

    fn check_arity(&self, found: usize) -> Result<()> {
        let (accepted, expected) = match self {
            Cast::Int => (found == 1 || found == 2, "1 or 2"),
            _ => (found == 1, "1"),
        };
        if accepted {
            Ok(())
        } else {
            Err(ResourceError::Arity { function: self.name().to_string(), expected: expected.to_string(), found })
        }
    }

    /// Applies the conversion. Unset stays unset so a missing field keeps
    /// behaving as a non-match after a cast.
    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        let value = match args.first() {
            Some(Value::Unset) | None => return Ok(Value::Unset),
            Some(value) => value,
        };
        match self {
            Cast::Int => match args.get(1) {
                Some(base) => to_int_with_base(value, base),
                None => to_int(value),
            },
            Cast::Bool => Ok(Value::Bool(value.truthy())),
            Cast::Float => to_float(value),
            Cast::Str => Ok(Value::Str(value.to_string())),
        }
    }
}

fn conversion(message: String) -> ResourceError {
    ResourceError::Conversion(message)
}

fn to_int(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(conversion(format!("float {} does not fit an integer", f)))
            }
        }
        Value::Float(f) => Err(conversion(format!("cannot convert float {} to integer", f))),
        Value::Str(s) => {
            let trimmed = s.trim();
            if !DECIMAL_INT.is_match(trimmed) {
                return Err(conversion(format!("invalid literal for int() with base 10: '{}'", s)));
            }
            trimmed
                .replace('_', "")
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| conversion(format!("int() literal out of range: '{}'", s)))
        }
        other => Err(ResourceError::Type(format!("int() argument must be a string or a number, not '{}'", other.type_name()))),
    }
}

fn to_int_with_base(value: &Value, base: &Value) -> Result<Value> {
    let text = match value {
        Value::Str(s) => s.trim(),
        other => return Err(ResourceError::Type(format!("int() can't convert non-string with explicit base: '{}'", other.type_name()))),
    };
    let base = match base {
        Value::Int(b) if (2..=36).contains(b) => *b as u32,
        other => return Err(conversion(format!("int() base must be >= 2 and <= 36, got {}", other))),
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lowered = digits.to_ascii_lowercase();
    let prefix = match base {
        16 => "0x",
        8 => "0o",
        2 => "0b",
        _ => "",
    };
    let digits = if prefix.is_empty() { lowered.as_str() } else { lowered.strip_prefix(prefix).unwrap_or(lowered.as_str()) };
    let parsed = i64::from_str_radix(&digits.replace('_', ""), base)
        .map_err(|_| conversion(format!("invalid literal for int() with base {}: '{}'", base, text)))?;
    Ok(Value::Int(if negative { -parsed } else { parsed }))
}

fn to_float(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => {
            let trimmed = s.trim();
            let special = matches!(
                trimmed.trim_start_matches(['+', '-']).to_ascii_lowercase().as_str(),
                "inf" | "infinity" | "nan"
            );
            if !special && !DECIMAL_FLOAT.is_match(trimmed) {
                return Err(conversion(format!("could not convert string to float: '{}'", s)));
            }
            trimmed
                .replace('_', "")
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| conversion(format!("could not convert string to float: '{}'", s)))
        }
        other => Err(ResourceError::Type(format!("float() argument must be a string or a number, not '{}'", other.type_name()))),
    }
}

// ------------- Getter -------------
/// A compiled accessor. `Attribute` and `Call` read from a namespace's
/// records; `Constant` and `List` never look at the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Getter {
    Attribute { namespace: String, field: String },
    Call { cast: Cast, args: Vec<Getter>, namespace: String },
    Constant(Value),
    List(Vec<Value>),
}

impl Getter {
    /// Compiles one value node.
    pub fn from_node(node: &Node) -> Result<Self> {
        match node {
            Node::Attribute { value, attr } => match value.as_ref() {
                Node::Name(namespace) => Ok(Getter::Attribute { namespace: namespace.clone(), field: attr.clone() }),
                _ => Err(ResourceError::UnsupportedValue(node.to_string())),
            },
            Node::Call { func, args } => {
                let cast = match func.as_ref() {
                    Node::Name(name) => Cast::from_name(name),
                    _ => None,
                }
                .ok_or_else(|| ResourceError::UnsupportedFunction(func.to_string()))?;
                cast.check_arity(args.len())?;
                let args = args.iter().map(Getter::from_node).collect::<Result<Vec<_>>>()?;
                let namespace = shared_namespace(&args, node)?;
                Ok(Getter::Call { cast, args, namespace })
            }
            Node::Constant(value) => Ok(Getter::Constant(value.clone())),
            Node::UnaryOp { op: UnaryOperator::USub, operand } => match operand.as_ref() {
                Node::Constant(Value::Int(i)) => i
                    .checked_neg()
                    .map(|negated| Getter::Constant(Value::Int(negated)))
                    .ok_or_else(|| ResourceError::UnsupportedValue(node.to_string())),
                Node::Constant(Value::Float(f)) => Ok(Getter::Constant(Value::Float(-f))),
                _ => Err(ResourceError::UnsupportedValue(node.to_string())),
            },
            Node::UnaryOp { op, .. } => Err(ResourceError::UnsupportedOperator(format!("{} in {}", op.symbol().trim(), node))),
            Node::List(items) | Node::Tuple(items) => {
                let getters = items.iter().map(Getter::from_node).collect::<Result<Vec<_>>>()?;
                let mut values = Vec::with_capacity(getters.len());
                for getter in getters {
                    match getter {
                        Getter::Constant(value) => values.push(value),
                        Getter::List(nested) => values.push(Value::List(nested)),
                        _ => return Err(ResourceError::NonConstantCollection(node.to_string())),
                    }
                }
                Ok(Getter::List(values))
            }
            other => Err(ResourceError::UnsupportedValue(format!("{} ({})", other, other.kind()))),
        }
    }

    /// The namespace this getter reads from, if any.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Getter::Attribute { namespace, .. } | Getter::Call { namespace, .. } => Some(namespace),
            Getter::Constant(_) | Getter::List(_) => None,
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespace().is_some()
    }

    pub fn get(&self, record: &Record) -> Result<Value> {
        match self {
            // resources are free form, a record may lack the field
            Getter::Attribute { field, .. } => Ok(record.get(field).cloned().unwrap_or(Value::Unset)),
            Getter::Call { cast, args, .. } => {
                let values = args.iter().map(|arg| arg.get(record)).collect::<Result<Vec<_>>>()?;
                cast.apply(&values)
            }
            Getter::Constant(value) => Ok(value.clone()),
            Getter::List(values) => Ok(Value::List(values.clone())),
        }
    }
}

fn shared_namespace(args: &[Getter], call: &Node) -> Result<String> {
    let mut shared: Option<&str> = None;
    for namespace in args.iter().filter_map(Getter::namespace) {
        match shared {
            Some(first) if first != namespace => {
                return Err(ResourceError::NamespaceConflict { first: first.to_string(), second: namespace.to_string() });
            }
            _ => shared = Some(namespace),
        }
    }
    shared.map(str::to_string).ok_or_else(|| ResourceError::NoNamespace(call.to_string()))
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Getter::Attribute { namespace, field } => write!(f, "{}.{}", namespace, field),
            Getter::Call { cast, args, .. } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", cast.name(), args.join(", "))
            }
            Getter::Constant(value) => write!(f, "{}", value.repr()),
            Getter::List(values) => {
                let values: Vec<String> = values.iter().map(Value::repr).collect();
                write!(f, "[{}]", values.join(", "))
            }
        }
    }
}
