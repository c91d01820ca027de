//! Turns requirement expression text into a [`Node`] tree.
//!
//! The grammar lives in `requires.pest`.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::ast::{BoolOperator, CompareOperator, Node, UnaryOperator};
use crate::error::{ResourceError, Result};
use crate::value::Value;

#[derive(Parser)]
#[grammar = "requires.pest"]
struct RequiresParser;

/// Parses `text` into a tree rooted at [`Node::Expression`].
pub fn parse(text: &str) -> Result<Node> {
    let expression = RequiresParser::parse(Rule::expression, text)?
        .next()
        .ok_or_else(|| parse_error("empty expression", None))?;
    let body = expression
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::disjunction)
        .ok_or_else(|| parse_error("empty expression", None))?;
    Ok(Node::expression(build(body)?))
}

fn parse_error(message: &str, pair: Option<&Pair<Rule>>) -> ResourceError {
    let (line, col) = match pair {
        Some(pair) => {
            let (line, col) = pair.as_span().start_pos().line_col();
            (Some(line), Some(col))
        }
        None => (None, None),
    };
    ResourceError::Parse { message: message.to_string(), line, col }
}

fn build(pair: Pair<Rule>) -> Result<Node> {
    match pair.as_rule() {
        Rule::disjunction => bool_op(pair, BoolOperator::Or),
        Rule::conjunction => bool_op(pair, BoolOperator::And),
        Rule::inversion => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(|| parse_error("dangling not", None))?;
            if first.as_rule() == Rule::not_op {
                let operand = inner.next().ok_or_else(|| parse_error("missing operand of not", Some(&first)))?;
                Ok(Node::UnaryOp { op: UnaryOperator::Not, operand: Box::new(build(operand)?) })
            } else {
                build(first)
            }
        }
        Rule::comparison => comparison(pair),
        Rule::unary => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(|| parse_error("empty operand", None))?;
            if first.as_rule() == Rule::unary_op {
                let op = match first.as_str() {
                    "-" => UnaryOperator::USub,
                    "+" => UnaryOperator::UAdd,
                    _ => UnaryOperator::Invert,
                };
                let operand = inner.next().ok_or_else(|| parse_error("missing operand", Some(&first)))?;
                Ok(Node::UnaryOp { op, operand: Box::new(build(operand)?) })
            } else {
                build(first)
            }
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let primary = inner.next().ok_or_else(|| parse_error("empty operand", None))?;
            let mut node = build(primary)?;
            for suffix in inner {
                node = match suffix.as_rule() {
                    Rule::attribute => {
                        let attr = suffix.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default();
                        Node::Attribute { value: Box::new(node), attr }
                    }
                    _ => Node::Call { func: Box::new(node), args: children(suffix)? },
                };
            }
            Ok(node)
        }
        Rule::group => {
            let inner = pair.into_inner().next().ok_or_else(|| parse_error("empty group", None))?;
            build(inner)
        }
        Rule::list => Ok(Node::List(children(pair)?)),
        Rule::tuple => Ok(Node::Tuple(children(pair)?)),
        Rule::float => {
            let text = pair.as_str().replace('_', "");
            let value = text.parse::<f64>().map_err(|_| parse_error("invalid float literal", Some(&pair)))?;
            Ok(Node::Constant(Value::Float(value)))
        }
        Rule::integer => {
            let value = integer(pair.as_str()).ok_or_else(|| parse_error("integer literal out of range", Some(&pair)))?;
            Ok(Node::Constant(Value::Int(value)))
        }
        Rule::string => Ok(Node::Constant(Value::Str(unescape(pair.as_str())))),
        Rule::boolean => Ok(Node::Constant(Value::Bool(pair.as_str() == "True"))),
        Rule::none => Ok(Node::Constant(Value::Unset)),
        Rule::identifier => Ok(Node::Name(pair.as_str().to_string())),
        _ => Err(parse_error(&format!("unexpected {:?}", pair.as_rule()), Some(&pair))),
    }
}

// integers are 64 bit; anything wider does not fit a Value
fn integer(text: &str) -> Option<i64> {
    let text = text.replace('_', "");
    let lowered = text.to_ascii_lowercase();
    let (digits, radix) = match lowered.get(..2) {
        Some("0x") => (&lowered[2..], 16),
        Some("0o") => (&lowered[2..], 8),
        Some("0b") => (&lowered[2..], 2),
        _ => (lowered.as_str(), 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

fn children(pair: Pair<Rule>) -> Result<Vec<Node>> {
    pair.into_inner().map(build).collect()
}

fn bool_op(pair: Pair<Rule>, op: BoolOperator) -> Result<Node> {
    let mut values: Vec<Node> = pair
        .into_inner()
        .filter(|p| !matches!(p.as_rule(), Rule::or_op | Rule::and_op))
        .map(build)
        .collect::<Result<_>>()?;
    if values.len() == 1 {
        return Ok(values.remove(0));
    }
    Ok(Node::BoolOp { op, values })
}

fn comparison(pair: Pair<Rule>) -> Result<Node> {
    let mut inner = pair.into_inner();
    let left = inner.next().ok_or_else(|| parse_error("empty comparison", None))?;
    let left = build(left)?;
    let mut ops = Vec::new();
    let mut comparators = Vec::new();
    while let Some(op) = inner.next() {
        // "not   in" and "is  not" collapse to their canonical spelling
        let symbol = op.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        let operator = CompareOperator::from_symbol(&symbol)
            .ok_or_else(|| parse_error(&format!("unknown comparison {}", symbol), Some(&op)))?;
        let right = inner.next().ok_or_else(|| parse_error("missing right operand", Some(&op)))?;
        ops.push(operator);
        comparators.push(build(right)?);
    }
    if ops.is_empty() {
        return Ok(left);
    }
    Ok(Node::Compare { left: Box::new(left), ops, comparators })
}

// strips the quotes and resolves backslash escapes; unknown escapes are kept verbatim
fn unescape(quoted: &str) -> String {
    let body = &quoted[1..quoted.len() - 1];
    let mut unescaped = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('0') => unescaped.push('\0'),
            Some(q @ ('\\' | '\'' | '"')) => unescaped.push(q),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}
