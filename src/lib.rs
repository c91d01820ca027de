//! resource-expr – compiles resource requirement expressions into lazy filters
//! over namespaced fact records.
//!
//! A *requirement* is a boolean expression such as
//! `cpu.arch == 'amd64' and int(memory.size) >= 4096`, where:
//! * A *resource* is one [`value::Record`], a string keyed map of scalar or list values.
//! * A *namespace* is a named group of records (`cpu`, `memory`, ...), all of
//!   them gathered in one [`value::Resources`] table.
//! * A *getter* ([`getter::Getter`]) extracts a value from a record: a field,
//!   a cast of a field, or a constant.
//! * A *constraint* ([`constraint::Constraint`]) compares two getters and
//!   filters the records of the one namespace it reads.
//!
//! Evaluating a requirement narrows every namespace to the records that
//! satisfy it. `and` narrows sequentially, `or` unites the records each branch
//! kept, without repeats.
//!
//! ## Modules
//! * [`parser`] – Requirement text to [`ast::Node`] tree (grammar in `requires.pest`).
//! * [`getter`] – Value getters and the `int`/`bool`/`float`/`str` casts.
//! * [`constraint`] – Single comparisons bound to a namespace.
//! * [`filter`] – The compiled `and`/`or` plan and explain mode.
//! * [`namespace`] – Lazy record sequences, tee, de-duplicating union and name resolution.
//! * [`evaluate`] – The entry points.
//! * [`options`] – Evaluation options, loadable with `config`.
//!
//! ## Namespace resolution
//! A bare name `x` used in a requirement is looked up as `x`, then as
//! `<implicit_namespace>::x`, then as `com.canonical.plainbox::x`. A constraint
//! on a namespace that resolves to nothing filters nothing.
//!
//! ## Laziness
//! Nothing is filtered before records are pulled. [`evaluate_lazy`] pulls at
//! most one record per namespace; the sequences of an `or` are teed so that
//! the source is read once.
//!
//! ## Quick Start
//! ```
//! use resource_expr::{evaluate_lazy, Options, Resources};
//! let resources: Resources = serde_json::from_value(serde_json::json!({
//!     "com.example::cpu": [{"arch": "amd64", "cores": "8"}]
//! })).unwrap();
//! let options = Options::default().with_implicit_namespace("com.example");
//! let matched = evaluate_lazy("int(cpu.cores) >= 4", &resources, &options).unwrap();
//! assert!(matched["com.example::cpu"]);
//! ```

pub mod ast;
pub mod constraint;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod getter;
pub mod namespace;
pub mod options;
pub mod parser;
pub mod value;

pub use error::{ResourceError, Result};
pub use evaluate::{evaluate, evaluate_lazy, is_satisfied, prepare, prepare_namespace, Requirement};
pub use namespace::{Evaluation, Namespace, Records, DEFAULT_NAMESPACE};
pub use options::Options;
pub use parser::parse;
pub use value::{Record, Resources, Value};
