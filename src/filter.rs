//! The filter plan: a requirement tree compiled into constraints joined by
//! `and`/`or`, applied to a [`Namespace`].
//!
//! Compilation runs to completion before a single record is looked at, so a
//! malformed requirement never leaves a half filtered table behind.
//!
//! * `and` narrows: every operand filters the table the previous one produced.
//! * `or` splits the table into one tee per operand, filters each branch on
//!   its own and merges the branches back without repeating a record.

use std::fmt;

use tracing::{info, trace};

use crate::ast::{BoolOperator, Node};
use crate::constraint::Constraint;
use crate::error::{ResourceError, Result};
use crate::namespace::{Namespace, Records};
use crate::value::render_record;

const EXPLAIN: &str = "resource_expr::explain";

// ------------- Mode -------------
/// How constraints are applied. `Explain` reports the first `max_items`
/// records of the filtered namespace before and after each constraint; it
/// has to materialise those sequences to do so, the result is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Filter,
    Explain { max_items: usize },
}

// ------------- Filter -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Constraint(Constraint),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn compile(node: &Node) -> Result<Self> {
        let filter = match node {
            Node::Expression(body) => return Filter::compile(body),
            Node::Compare { .. } => Filter::Constraint(Constraint::parse(node)?),
            Node::BoolOp { values, .. } if values.is_empty() => {
                return Err(ResourceError::UnsupportedNode(format!("empty {} ({})", node, node.kind())));
            }
            Node::BoolOp { op, values } => {
                let operands = values.iter().map(Filter::compile).collect::<Result<Vec<_>>>()?;
                match op {
                    BoolOperator::And => Filter::And(operands),
                    BoolOperator::Or => Filter::Or(operands),
                }
            }
            other => return Err(ResourceError::UnsupportedNode(format!("{} ({})", other, other.kind()))),
        };
        trace!(filter = %filter, "compiled");
        Ok(filter)
    }

    /// Every constraint of the plan, left to right.
    pub fn constraints(&self) -> Vec<&Constraint> {
        match self {
            Filter::Constraint(constraint) => vec![constraint],
            Filter::And(operands) | Filter::Or(operands) => operands.iter().flat_map(Filter::constraints).collect(),
        }
    }

    pub fn apply<'a>(self, namespace: Namespace<'a>, mode: &Mode) -> Namespace<'a> {
        match self {
            Filter::Constraint(constraint) => match mode {
                Mode::Filter => constraint.filtered(namespace),
                Mode::Explain { max_items } => explained(constraint, namespace, *max_items),
            },
            Filter::And(operands) => operands.into_iter().fold(namespace, |narrowed, operand| operand.apply(narrowed, mode)),
            Filter::Or(operands) => {
                // the empty table is the identity of union
                let united = Namespace::new(namespace.implicit_namespace());
                let branches = namespace.duplicate(operands.len());
                operands
                    .into_iter()
                    .zip(branches)
                    .map(|(operand, branch)| operand.apply(branch, mode))
                    .fold(united, Namespace::union)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (operands, separator) = match self {
            Filter::Constraint(constraint) => return write!(f, "{}", constraint),
            Filter::And(operands) => (operands, " and "),
            Filter::Or(operands) => (operands, " or "),
        };
        let operands: Vec<String> = operands.iter().map(|operand| format!("({})", operand)).collect();
        write!(f, "{}", operands.join(separator))
    }
}

// ------------- Explain -------------
fn explained<'a>(constraint: Constraint, mut namespace: Namespace<'a>, max_items: usize) -> Namespace<'a> {
    let target = constraint.namespace().map(str::to_string);
    info!(target: EXPLAIN, "Expression: {}", constraint);
    let Some(target) = target else {
        info!(target: EXPLAIN, "Filtering: (no namespace)");
        return constraint.filtered(namespace);
    };
    info!(target: EXPLAIN, "Filtering: {}", target);
    if !namespace.contains(&target) {
        info!(target: EXPLAIN, "  (namespace not present)");
        return constraint.filtered(namespace);
    }
    info!(target: EXPLAIN, "  Pre filter:");
    namespace.update(&target, |records| report(records, max_items));
    let mut namespace = constraint.filtered(namespace);
    info!(target: EXPLAIN, "  Post filter:");
    namespace.update(&target, |records| report(records, max_items));
    namespace
}

// drains the sequence, logs its head and hands back an equivalent sequence
fn report(records: Records<'_>, max_items: usize) -> Records<'_> {
    let drained: Vec<_> = records.collect();
    for record in drained.iter().take(max_items) {
        match record {
            Ok(record) => info!(target: EXPLAIN, "    {}", render_record(record)),
            Err(e) => info!(target: EXPLAIN, "    error: {}", e),
        }
    }
    if drained.len() > max_items {
        info!(target: EXPLAIN, "    [...]");
    }
    Records::new(drained)
}
