use std::cell::Cell;
use std::rc::Rc;

use resource_expr::namespace::tee;
use resource_expr::{prepare, prepare_namespace, Namespace, Options, Record, Records, Value};

fn record(a: i64) -> Record {
    [("a".to_string(), Value::Int(a))].into_iter().collect()
}

// a single pass source that counts how many records were pulled from it
fn one_shot(pulls: &Rc<Cell<usize>>, values: Vec<i64>) -> Records<'static> {
    let pulls = Rc::clone(pulls);
    Records::from_records(values.into_iter().map(move |a| {
        pulls.set(pulls.get() + 1);
        record(a)
    }))
}

#[test]
fn nothing_is_pulled_while_preparing() {
    let pulls = Rc::new(Cell::new(0));
    let namespace = Namespace::new("").with("ns", one_shot(&pulls, (0..100).collect()));
    let prepared = prepare_namespace("ns.a >= 0 and ns.a != 50", namespace, &Options::default()).expect("prepare ok");
    assert_eq!(pulls.get(), 0);
    let probed = prepared.probe().expect("probe ok");
    assert!(probed["ns"]);
    assert_eq!(pulls.get(), 1);
}

#[test]
fn probing_stops_at_the_first_match() {
    let pulls = Rc::new(Cell::new(0));
    let namespace = Namespace::new("").with("ns", one_shot(&pulls, (0..100).collect()));
    let prepared = prepare_namespace("ns.a == 10", namespace, &Options::default()).expect("prepare ok");
    assert!(prepared.probe().expect("probe ok")["ns"]);
    assert_eq!(pulls.get(), 11);
}

#[test]
fn or_reads_a_single_pass_source_once() {
    let pulls = Rc::new(Cell::new(0));
    let namespace = Namespace::new("").with("ns", one_shot(&pulls, vec![1, 2, 3, 4]));
    let prepared = prepare_namespace("ns.a == 1 or ns.a == 3 or ns.a >= 2", namespace, &Options::default()).expect("prepare ok");
    let evaluation = prepared.materialize().expect("materialize ok");
    assert_eq!(evaluation["ns"], vec![record(1), record(3), record(2), record(4)]);
    assert_eq!(pulls.get(), 4);
}

#[test]
fn tee_cursors_are_independent() {
    let pulls = Rc::new(Cell::new(0));
    let mut copies = tee(one_shot(&pulls, vec![1, 2, 3]), 2);
    let mut second = copies.pop().expect("two copies");
    let first = copies.pop().expect("two copies");
    assert_eq!(second.next().map(|r| r.expect("record")), Some(record(1)));
    assert_eq!(second.next().map(|r| r.expect("record")), Some(record(2)));
    // a sibling's reads neither skip nor repeat records for this one
    let first: Vec<Record> = first.map(|r| r.expect("record")).collect();
    assert_eq!(first, vec![record(1), record(2), record(3)]);
    let rest: Vec<Record> = second.map(|r| r.expect("record")).collect();
    assert_eq!(rest, vec![record(3)]);
    assert_eq!(pulls.get(), 3);
}

#[test]
fn runtime_errors_surface_only_when_pulled() {
    let resources = serde_json::from_value(serde_json::json!({
        "ns": [{"a": "1"}, {"a": "x"}]
    }))
    .expect("valid resources");
    let prepared = prepare("int(ns.a) == 1", &resources, &Options::default()).expect("prepare ok");
    // the first record matches before the bad one is reached
    assert!(prepared.probe().expect("probe ok")["ns"]);
    let prepared = prepare("int(ns.a) == 1", &resources, &Options::default()).expect("prepare ok");
    let err = prepared.materialize().unwrap_err();
    assert!(err.is_runtime());
    assert!(format!("{}", err).contains("invalid literal for int()"));
}
