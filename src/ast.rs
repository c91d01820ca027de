//! Node tree of a parsed requirement expression.
//!
//! The tree is shaped after the expression it came from: a top-level
//! [`Node::Expression`] wrapper, n-ary boolean operations, comparisons that
//! may carry several operators, and a handful of value forms. Only a subset
//! of these can be compiled; the rest exist so the compiler can refuse them
//! with a precise error.

use std::collections::BTreeSet;
use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Eq => "==",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtE => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtE => ">=",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => CompareOperator::Eq,
            "!=" => CompareOperator::NotEq,
            "<" => CompareOperator::Lt,
            "<=" => CompareOperator::LtE,
            ">" => CompareOperator::Gt,
            ">=" => CompareOperator::GtE,
            "in" => CompareOperator::In,
            "not in" => CompareOperator::NotIn,
            "is" => CompareOperator::Is,
            "is not" => CompareOperator::IsNot,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    USub,
    UAdd,
    Invert,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "not ",
            UnaryOperator::USub => "-",
            UnaryOperator::UAdd => "+",
            UnaryOperator::Invert => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Top-level wrapper produced by the parser.
    Expression(Box<Node>),
    BoolOp { op: BoolOperator, values: Vec<Node> },
    Compare { left: Box<Node>, ops: Vec<CompareOperator>, comparators: Vec<Node> },
    Attribute { value: Box<Node>, attr: String },
    Call { func: Box<Node>, args: Vec<Node> },
    Name(String),
    Constant(Value),
    List(Vec<Node>),
    Tuple(Vec<Node>),
    UnaryOp { op: UnaryOperator, operand: Box<Node> },
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Expression(_) => "Expression",
            Node::BoolOp { .. } => "BoolOp",
            Node::Compare { .. } => "Compare",
            Node::Attribute { .. } => "Attribute",
            Node::Call { .. } => "Call",
            Node::Name(_) => "Name",
            Node::Constant(_) => "Constant",
            Node::List(_) => "List",
            Node::Tuple(_) => "Tuple",
            Node::UnaryOp { .. } => "UnaryOp",
        }
    }

    /// Wraps a body node the way the parser does.
    pub fn expression(body: Node) -> Self {
        Node::Expression(Box::new(body))
    }

    /// `namespace.field`
    pub fn attribute(namespace: &str, field: &str) -> Self {
        Node::Attribute { value: Box::new(Node::Name(namespace.to_string())), attr: field.to_string() }
    }

    pub fn compare(left: Node, op: CompareOperator, right: Node) -> Self {
        Node::Compare { left: Box::new(left), ops: vec![op], comparators: vec![right] }
    }

    /// Every namespace named by an attribute access anywhere in the tree.
    pub fn namespaces(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_namespaces(&mut found);
        found
    }

    fn collect_namespaces(&self, found: &mut BTreeSet<String>) {
        match self {
            Node::Attribute { value, .. } => match value.as_ref() {
                Node::Name(namespace) => {
                    found.insert(namespace.clone());
                }
                other => other.collect_namespaces(found),
            },
            Node::Expression(body) => body.collect_namespaces(found),
            Node::BoolOp { values, .. } | Node::List(values) | Node::Tuple(values) => {
                values.iter().for_each(|v| v.collect_namespaces(found))
            }
            Node::Compare { left, comparators, .. } => {
                left.collect_namespaces(found);
                comparators.iter().for_each(|c| c.collect_namespaces(found));
            }
            Node::Call { args, .. } => args.iter().for_each(|a| a.collect_namespaces(found)),
            Node::UnaryOp { operand, .. } => operand.collect_namespaces(found),
            Node::Name(_) | Node::Constant(_) => (),
        }
    }
}

fn join(nodes: &[Node], separator: &str) -> String {
    nodes.iter().map(ToString::to_string).collect::<Vec<_>>().join(separator)
}

// renders back to source form, fully parenthesised where nesting matters
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Expression(body) => write!(f, "{}", body),
            Node::BoolOp { op, values } => {
                let separator = match op {
                    BoolOperator::And => " and ",
                    BoolOperator::Or => " or ",
                };
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        Node::BoolOp { .. } => format!("({})", v),
                        _ => v.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(separator))
            }
            Node::Compare { left, ops, comparators } => {
                write!(f, "{}", left)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    write!(f, " {} {}", op.symbol(), comparator)?;
                }
                Ok(())
            }
            Node::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Node::Call { func, args } => write!(f, "{}({})", func, join(args, ", ")),
            Node::Name(name) => write!(f, "{}", name),
            Node::Constant(value) => write!(f, "{}", value.repr()),
            Node::List(items) => write!(f, "[{}]", join(items, ", ")),
            Node::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Node::Tuple(items) => write!(f, "({})", join(items, ", ")),
            Node::UnaryOp { op, operand } => write!(f, "{}{}", op.symbol(), operand),
        }
    }
}
