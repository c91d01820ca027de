use resource_expr::{evaluate, evaluate_lazy, Evaluation, Options, Resources};
use serde_json::{json, Value as Json};

fn resources(table: Json) -> Resources {
    serde_json::from_value(table).expect("valid resources")
}

fn expected(table: Json) -> Evaluation {
    serde_json::from_value(table).expect("valid evaluation")
}

fn setup() -> Resources {
    resources(json!({"namespace": [{"a": 1, "b": 2}, {"a": 2, "b": 2}]}))
}

// evaluates with explain on, checks the lazy aggregate agrees
fn check(expr: &str, input: &Resources, options: &Options, result: Json) {
    let explained = options.clone().with_explain(true);
    let evaluated = evaluate(expr, input, &explained).expect("evaluate ok");
    assert_eq!(evaluated, expected(result), "{}", expr);
    let plain = evaluate(expr, input, options).expect("evaluate ok");
    assert_eq!(plain, evaluated, "{}", expr);
    let lazy = evaluate_lazy(expr, input, options).expect("evaluate_lazy ok");
    for (name, records) in &evaluated {
        assert_eq!(lazy[name], !records.is_empty(), "{} on {}", expr, name);
    }
}

#[test]
fn equality() {
    let options = Options::default();
    check("(namespace.a == 1)", &setup(), &options, json!({"namespace": [{"a": 1, "b": 2}]}));
    check("(namespace.a == 3)", &setup(), &options, json!({"namespace": []}));
    assert!(!evaluate_lazy("namespace.a == 3", &setup(), &options).expect("lazy ok")["namespace"]);
}

#[test]
fn and_narrows() {
    let options = Options::default();
    check("namespace.b == 2 and namespace.a == 1", &setup(), &options, json!({"namespace": [{"a": 1, "b": 2}]}));
    check("namespace.b == -1 and namespace.a == 1", &setup(), &options, json!({"namespace": []}));
}

#[test]
fn or_unites() {
    let options = Options::default();
    check(
        "namespace.b == 2 or namespace.a == 1",
        &setup(),
        &options,
        json!({"namespace": [{"a": 1, "b": 2}, {"a": 2, "b": 2}]}),
    );
    check("namespace.b == 20 or namespace.a == 11", &setup(), &options, json!({"namespace": []}));
    check(
        "namespace.a == 1 and (namespace.b == -2 or namespace.a == 1)",
        &setup(),
        &options,
        json!({"namespace": [{"a": 1, "b": 2}]}),
    );
}

#[test]
fn orderings() {
    let options = Options::default();
    check("namespace.a > 1", &setup(), &options, json!({"namespace": [{"a": 2, "b": 2}]}));
    check("namespace.a > 10", &setup(), &options, json!({"namespace": []}));
    check("namespace.a >= 1", &setup(), &options, json!({"namespace": [{"a": 1, "b": 2}, {"a": 2, "b": 2}]}));
    check("namespace.a <= 1", &setup(), &options, json!({"namespace": [{"a": 1, "b": 2}]}));
    check("1.5 <= namespace.a", &setup(), &options, json!({"namespace": [{"a": 2, "b": 2}]}));
}

#[test]
fn casts() {
    let options = Options::default();
    let input = resources(json!({"namespace": [{"a": "1", "b": "2"}, {"a": "2", "b": "2"}]}));
    check("int(namespace.a) == 1", &input, &options, json!({"namespace": [{"a": "1", "b": "2"}]}));
    check("float(namespace.a) == 1", &input, &options, json!({"namespace": [{"a": "1", "b": "2"}]}));
    check("int(namespace.a, 16) >= 2 and str(namespace.b) == '2'", &input, &options, json!({"namespace": [{"a": "2", "b": "2"}]}));
}

#[test]
fn membership() {
    let options = Options::default();
    let input = resources(json!({"namespace": [{"a": "1"}, {"a": "2"}, {"a": "3"}]}));
    check("namespace.a in ['1', '2']", &input, &options, json!({"namespace": [{"a": "1"}, {"a": "2"}]}));
    check("namespace.a in ('1', '2')", &input, &options, json!({"namespace": [{"a": "1"}, {"a": "2"}]}));
    check("namespace.a not in ('1', '2')", &input, &options, json!({"namespace": [{"a": "3"}]}));
    let input = resources(json!({"namespace": [{"ports": "usb-a usb-c"}, {"ports": "hdmi"}]}));
    check("'usb-c' in namespace.ports", &input, &options, json!({"namespace": [{"ports": "usb-a usb-c"}]}));
}

#[test]
fn inequality() {
    let options = Options::default();
    let input = resources(json!({"namespace": [{"a": "1"}, {"a": "2"}, {"a": "3"}]}));
    check("namespace.a != '1'", &input, &options, json!({"namespace": [{"a": "2"}, {"a": "3"}]}));
    let input = resources(json!({"namespace": [{"a": "1"}, {"a": "2"}]}));
    check(
        "namespace.a != '1' and namespace.a != '2' and namespace.a != '3'",
        &input,
        &options,
        json!({"namespace": []}),
    );
}

#[test]
fn multiple_or() {
    let options = Options::default();
    let input = resources(json!({"namespace": [{"a": "1"}, {"a": "2"}, {"a": "3"}]}));
    check(
        "namespace.a == '1' or namespace.a == '2' or namespace.a == '3'",
        &input,
        &options,
        json!({"namespace": [{"a": "1"}, {"a": "2"}, {"a": "3"}]}),
    );
}

#[test]
fn missing_fields_never_match() {
    let options = Options::default();
    let input = resources(json!({"namespace": [{"a": 1}, {"b": 1}]}));
    check("namespace.b == 1", &input, &options, json!({"namespace": [{"b": 1}]}));
    check("namespace.b > 0", &input, &options, json!({"namespace": [{"b": 1}]}));
    check("namespace.b == None", &input, &options, json!({"namespace": [{"a": 1}]}));
    check("namespace.b != 1", &input, &options, json!({"namespace": [{"a": 1}]}));
    let input = resources(json!({"namespace": [{"a": "x"}, {"b": "y"}, {"a": "w"}]}));
    check("namespace.a not in 'xyz'", &input, &options, json!({"namespace": [{"a": "w"}]}));
}

#[test]
fn other_namespaces_are_untouched() {
    let options = Options::default();
    let input = resources(json!({"cpu": [{"arch": "amd64"}, {"arch": "arm64"}], "disk": [{"size": 1}]}));
    check(
        "cpu.arch == 'arm64'",
        &input,
        &options,
        json!({"cpu": [{"arch": "arm64"}], "disk": [{"size": 1}]}),
    );
}

#[test]
fn or_across_namespaces_keeps_each_branch() {
    // every branch leaves the namespaces it does not read alone
    let options = Options::default();
    let input = resources(json!({"cpu": [{"arch": "amd64"}, {"arch": "arm64"}], "disk": [{"size": 1}]}));
    check(
        "cpu.arch == 'arm64' or disk.size > 5",
        &input,
        &options,
        json!({"cpu": [{"arch": "arm64"}, {"arch": "amd64"}], "disk": [{"size": 1}]}),
    );
}
