// A constraint is one comparison bound to the namespace whose records it filters.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::ast::{CompareOperator, Node};
use crate::error::{ResourceError, Result};
use crate::getter::Getter;
use crate::namespace::{Namespace, Records};
use crate::value::{Record, Value};

// ------------- Operator -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    GtE,
    LtE,
    In,
    NotIn,
}

impl Operator {
    pub fn from_compare(op: CompareOperator) -> Result<Self> {
        match op {
            CompareOperator::Eq => Ok(Operator::Eq),
            CompareOperator::NotEq => Ok(Operator::NotEq),
            CompareOperator::Gt => Ok(Operator::Gt),
            CompareOperator::GtE => Ok(Operator::GtE),
            CompareOperator::LtE => Ok(Operator::LtE),
            CompareOperator::In => Ok(Operator::In),
            CompareOperator::NotIn => Ok(Operator::NotIn),
            other => Err(ResourceError::UnsupportedOperator(other.symbol().to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::GtE => ">=",
            Operator::LtE => "<=",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }

    /// `left <op> right`. Membership is asked of the right hand side:
    /// `left in right` holds when `right` contains `left`.
    pub fn apply(&self, left: &Value, right: &Value) -> Result<bool> {
        match self {
            Operator::Eq => Ok(left.loose_eq(right)),
            Operator::NotEq => Ok(!left.loose_eq(right)),
            Operator::Gt => Ok(left.compare(right, self.symbol())? == Some(Ordering::Greater)),
            Operator::GtE => Ok(matches!(left.compare(right, self.symbol())?, Some(Ordering::Greater | Ordering::Equal))),
            Operator::LtE => Ok(matches!(left.compare(right, self.symbol())?, Some(Ordering::Less | Ordering::Equal))),
            Operator::In => right.contains(left),
            // a missing container, or a missing value tested against text, is a non-match
            Operator::NotIn if right.is_unset() || (left.is_unset() && matches!(right, Value::Str(_))) => Ok(false),
            Operator::NotIn => Ok(!right.contains(left)?),
        }
    }
}

// ------------- Constraint -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    left: Getter,
    operator: Operator,
    right: Getter,
    namespace: Option<String>,
}

impl Constraint {
    pub fn new(left: Getter, operator: Operator, right: Getter) -> Result<Self> {
        if left.is_namespaced() && right.is_namespaced() {
            return Err(ResourceError::NamespaceComparison { left: left.to_string(), right: right.to_string() });
        }
        let namespace = left.namespace().or_else(|| right.namespace()).map(str::to_string);
        Ok(Self { left, operator, right, namespace })
    }

    /// Compiles a comparison node holding exactly one operator.
    pub fn parse(node: &Node) -> Result<Self> {
        match node {
            Node::Compare { left, ops, comparators } => {
                if ops.len() != 1 || comparators.len() != 1 {
                    return Err(ResourceError::ChainedComparison(node.to_string()));
                }
                let operator = Operator::from_compare(ops[0])?;
                Self::new(Getter::from_node(left)?, operator, Getter::from_node(&comparators[0])?)
            }
            other => Err(ResourceError::UnsupportedNode(format!("{} ({})", other, other.kind()))),
        }
    }

    /// The namespace this constraint filters; `None` when neither side reads one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn matches(&self, record: &Record) -> Result<bool> {
        self.operator.apply(&self.left.get(record)?, &self.right.get(record)?)
    }

    /// Lazily keeps the matching records of one sequence.
    pub fn filter<'a>(self, records: Records<'a>) -> Records<'a> {
        Records::new(records.filter_map(move |item| match item {
            Ok(record) => match self.matches(&record) {
                Ok(true) => Some(Ok(record)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    }

    /// Narrows the sequence of this constraint's namespace. A namespace the
    /// table does not hold is left alone, as is every other sequence.
    pub fn filtered<'a>(self, mut namespaces: Namespace<'a>) -> Namespace<'a> {
        let Some(target) = self.namespace.clone() else {
            debug!(constraint = %self, "constraint reads no namespace, nothing to filter");
            return namespaces;
        };
        let description = self.to_string();
        if !namespaces.update(&target, |records| self.filter(records)) {
            debug!(constraint = %description, namespace = %target, "namespace not present, passing through");
        }
        namespaces
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator.symbol(), self.right)
    }
}
