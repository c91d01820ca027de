use std::cell::Cell;
use std::rc::Rc;

use resource_expr::{evaluate, evaluate_lazy, prepare_namespace, Namespace, Options, Record, Records, ResourceError, Resources, Value};
use serde_json::json;

fn setup() -> Resources {
    serde_json::from_value(json!({"namespace": [{"a": "1"}, {"a": "2"}, {"a": "three"}]})).expect("valid resources")
}

fn compile_error(expr: &str) -> ResourceError {
    evaluate(expr, &setup(), &Options::default()).unwrap_err()
}

#[test]
fn unknown_function_before_filtering() {
    let pulls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&pulls);
    let source = Records::from_records((0..3).map(move |a| {
        counter.set(counter.get() + 1);
        Record::from([("a".to_string(), Value::Int(a))])
    }));
    let namespace = Namespace::new("").with("namespace", source);
    let err = prepare_namespace("namespace.a == 1 or foo(namespace.a) == 1", namespace, &Options::default().with_explain(true)).unwrap_err();
    assert!(matches!(err, ResourceError::UnsupportedFunction(_)));
    assert!(format!("{}", err).contains("Unsupported function foo"));
    assert_eq!(pulls.get(), 0);
}

#[test]
fn rejected_constructs() {
    assert!(matches!(compile_error("1 < namespace.a < 3"), ResourceError::ChainedComparison(_)));
    assert!(matches!(compile_error("namespace.a == other.a"), ResourceError::NamespaceComparison { .. }));
    assert!(matches!(compile_error("namespace.a < 3"), ResourceError::UnsupportedOperator(_)));
    assert!(matches!(compile_error("namespace.a is None"), ResourceError::UnsupportedOperator(_)));
    assert!(matches!(compile_error("int(namespace.a, other.b) == 1"), ResourceError::NamespaceConflict { .. }));
    assert!(matches!(compile_error("int('1') == 1"), ResourceError::NoNamespace(_)));
    assert!(matches!(compile_error("namespace.a in [namespace.b]"), ResourceError::NonConstantCollection(_)));
    assert!(matches!(compile_error("float(namespace.a, 2) == 1"), ResourceError::Arity { .. }));
    assert!(matches!(compile_error("namespace.a == b"), ResourceError::UnsupportedValue(_)));
    assert!(matches!(compile_error("not namespace.a == '1'"), ResourceError::UnsupportedNode(_)));
    assert!(matches!(compile_error("namespace.a"), ResourceError::UnsupportedNode(_)));
}

#[test]
fn messages_name_the_offender() {
    let err = compile_error("namespace.a == other.a");
    assert!(format!("{}", err).contains("namespace.a and other.a"));
    let err = compile_error("1 < namespace.a < 3");
    assert!(format!("{}", err).contains("1 < namespace.a < 3"));
    let err = compile_error("int(namespace.a, other.b) == 1");
    assert!(format!("{}", err).contains("namespace != other"));
}

#[test]
fn syntax_errors() {
    let err = compile_error("namespace.a ==");
    match err {
        ResourceError::Parse { line, col, .. } => {
            assert_eq!(line, Some(1));
            assert!(col.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(format!("{}", compile_error("namespace.a = 1")).starts_with("Parse error"));
}

#[test]
fn runtime_errors_fail_the_whole_call() {
    let err = evaluate("int(namespace.a) == 1", &setup(), &Options::default()).unwrap_err();
    assert!(matches!(err, ResourceError::Conversion(_)));
    let err = evaluate("int(namespace.a) >= 'x'", &setup(), &Options::default()).unwrap_err();
    assert!(matches!(err, ResourceError::Type(_)));
    assert!(format!("{}", err).contains("not supported between instances of 'int' and 'str'"));
    // the same failure travels through the branches of an or
    let err = evaluate("namespace.a == '2' or int(namespace.a) > 1", &setup(), &Options::default()).unwrap_err();
    assert!(err.is_runtime());
    // explain mode reports the failure instead of crashing, the call still fails
    let err = evaluate("int(namespace.a) == 1", &setup(), &Options::default().with_explain(true)).unwrap_err();
    assert!(matches!(err, ResourceError::Conversion(_)));
}

#[test]
fn lazy_evaluation_can_miss_later_failures() {
    // the first record already matches, the bad one is never looked at
    let lazy = evaluate_lazy("int(namespace.a) == 1", &setup(), &Options::default()).expect("lazy ok");
    assert!(lazy["namespace"]);
}
