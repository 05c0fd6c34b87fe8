use pretty_assertions::assert_eq;
use serde_json::json;
use std::cmp::Ordering;
use tool_form::{Node, Payload, compare_nodes};

fn samples() -> Vec<Node> {
    vec![
        Node::Undefined,
        Node::Null,
        Node::Bool(false),
        Node::Bool(true),
        Node::Number(f64::NEG_INFINITY),
        Node::Number(-1.5),
        Node::Number(-0.0),
        Node::Number(0.0),
        Node::Number(2.0),
        Node::Number(f64::INFINITY),
        Node::Number(f64::NAN),
        Node::from(""),
        Node::from("B"),
        Node::from("a"),
        Node::from("ab"),
        Node::from(json!([])),
        Node::from(json!([1])),
        Node::from(json!([1, 2])),
        Node::from(json!([2])),
        Node::from(json!({})),
        Node::from(json!({"a": 1})),
        Node::from(json!({"a": 1, "b": 1})),
        Node::from(json!({"a": 2})),
        Node::from(json!({"b": 0})),
        Node::Payload(Payload::text("x")),
        Node::Payload(Payload::bytes(b"x".to_vec())),
        Node::Fragment(vec![]),
    ]
}

#[test]
fn test_samples_are_sorted() {
    let samples = samples();
    for pair in samples.windows(2) {
        assert_eq!(
            compare_nodes(&pair[0], &pair[1]),
            Ordering::Less,
            "{:?} < {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_antisymmetry() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            assert_eq!(compare_nodes(a, b), compare_nodes(b, a).reverse(), "{:?} vs {:?}", a, b);
        }
    }
}

#[test]
fn test_transitivity() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            for c in &samples {
                if compare_nodes(a, b) != Ordering::Greater && compare_nodes(b, c) != Ordering::Greater {
                    assert_ne!(compare_nodes(a, c), Ordering::Greater, "{:?} <= {:?} <= {:?}", a, b, c);
                }
            }
        }
    }
}

#[test]
fn test_numbers() {
    let nan = Node::Number(f64::NAN);
    assert_eq!(compare_nodes(&nan, &Node::Number(-f64::NAN)), Ordering::Equal);
    assert_eq!(compare_nodes(&nan, &Node::Number(f64::INFINITY)), Ordering::Greater);
    assert_eq!(compare_nodes(&Node::Number(-0.0), &Node::Number(0.0)), Ordering::Less);
    assert_eq!(compare_nodes(&Node::Number(1.0), &Node::Number(1.0)), Ordering::Equal);
}

#[test]
fn test_strings_by_code_point() {
    assert_eq!(compare_nodes(&Node::from("Z"), &Node::from("a")), Ordering::Less);
    assert_eq!(compare_nodes(&Node::from("é"), &Node::from("z")), Ordering::Greater);
    assert_eq!(compare_nodes(&Node::from("\u{FFFF}"), &Node::from("🚀")), Ordering::Less);
}

#[test]
fn test_objects_ignore_insertion_order() {
    let a = Node::from(json!({"x": 1, "y": 2}));
    let b = Node::from(json!({"y": 2, "x": 1}));
    assert_eq!(compare_nodes(&a, &b), Ordering::Equal);
}

#[test]
fn test_sort_mixed_kinds() {
    let mut items = vec![
        Node::from("b"),
        Node::Number(f64::NAN),
        Node::Null,
        Node::Number(3.0),
        Node::Bool(true),
        Node::from(json!([])),
        Node::Number(-0.0),
    ];
    items.sort_by(compare_nodes);

    let rendered: Vec<String> = items.iter().map(|node| format!("{:?}", node)).collect();
    assert_eq!(
        rendered,
        vec!["Null", "Bool(true)", "Number(-0.0)", "Number(3.0)", "Number(NaN)", "String(\"b\")", "Array([])"]
    );
}
