//! Entry points: prepare a filtered namespace table, then either materialise
//! it ([`evaluate`]) or only ask whether anything matched ([`evaluate_lazy`]).
//!
//! ```
//! use resource_expr::{evaluate, Options, Resources};
//! let resources: Resources = serde_json::from_value(serde_json::json!({
//!     "ns": [{"a": 1, "b": 2}, {"a": 2, "b": 2}]
//! })).unwrap();
//! let evaluation = evaluate("ns.b == 2 and ns.a == 1", &resources, &Options::default()).unwrap();
//! assert_eq!(evaluation["ns"].len(), 1);
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::Node;
use crate::error::Result;
use crate::filter::{Filter, Mode};
use crate::namespace::{Evaluation, Namespace};
use crate::options::Options;
use crate::parser::parse;
use crate::value::Resources;

/// A requirement either still as text or already parsed.
#[derive(Debug, Clone, Copy)]
pub enum Requirement<'e> {
    Text(&'e str),
    Tree(&'e Node),
}

impl<'e> From<&'e str> for Requirement<'e> {
    fn from(text: &'e str) -> Self { Requirement::Text(text) }
}

impl<'e> From<&'e String> for Requirement<'e> {
    fn from(text: &'e String) -> Self { Requirement::Text(text) }
}

impl<'e> From<&'e Node> for Requirement<'e> {
    fn from(tree: &'e Node) -> Self { Requirement::Tree(tree) }
}

fn compile(requirement: Requirement) -> Result<Filter> {
    match requirement {
        Requirement::Text(text) => Filter::compile(&parse(text)?),
        Requirement::Tree(tree) => Filter::compile(tree),
    }
}

fn mode(options: &Options) -> Mode {
    if options.explain { Mode::Explain { max_items: options.explain_max_items } } else { Mode::Filter }
}

/// Compiles the requirement and applies it to a lazy view of `resources`.
/// Nothing is filtered yet when this returns; `resources` is never modified.
pub fn prepare<'a, 'e>(requirement: impl Into<Requirement<'e>>, resources: &'a Resources, options: &Options) -> Result<Namespace<'a>> {
    prepare_namespace(requirement, Namespace::from_resources(options.implicit_namespace.as_str(), resources), options)
}

/// Like [`prepare`] for a table that is already a [`Namespace`], e.g. one built
/// over single pass sources. The implicit namespace of `namespace` is kept.
pub fn prepare_namespace<'a, 'e>(requirement: impl Into<Requirement<'e>>, namespace: Namespace<'a>, options: &Options) -> Result<Namespace<'a>> {
    let filter = compile(requirement.into())?;
    debug!(filter = %filter, namespaces = namespace.len(), "prepared");
    Ok(filter.apply(namespace, &mode(options)))
}

/// Every namespace with the list of its records that satisfy the requirement.
pub fn evaluate<'e>(requirement: impl Into<Requirement<'e>>, resources: &Resources, options: &Options) -> Result<Evaluation> {
    prepare(requirement, resources, options)?.materialize()
}

/// Every namespace with whether at least one of its records satisfies the
/// requirement. Each sequence is advanced at most once.
pub fn evaluate_lazy<'e>(requirement: impl Into<Requirement<'e>>, resources: &Resources, options: &Options) -> Result<BTreeMap<String, bool>> {
    prepare(requirement, resources, options)?.probe()
}

/// Whether the requirement holds as a whole: every namespace it names is
/// present and every namespace kept at least one record.
pub fn is_satisfied<'e>(requirement: impl Into<Requirement<'e>>, resources: &Resources, options: &Options) -> Result<bool> {
    let parsed;
    let tree = match requirement.into() {
        Requirement::Text(text) => {
            parsed = parse(text)?;
            &parsed
        }
        Requirement::Tree(tree) => tree,
    };
    let namespace = prepare(tree, resources, options)?;
    let missing: Vec<String> = tree.namespaces().into_iter().filter(|name| !namespace.contains(name)).collect();
    if !missing.is_empty() {
        debug!(?missing, "referenced namespaces not present");
        return Ok(false);
    }
    Ok(namespace.probe()?.values().all(|matched| *matched))
}
