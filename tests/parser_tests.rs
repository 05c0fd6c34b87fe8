// tests/parser_tests.rs

use pretty_assertions::assert_eq;
use tool_form::Node;
use tool_form::ast::{
    CompOp, Comparable, FunctionArg, LogicalExpr, Query, QueryRoot, Segment, SegmentKind, Selector,
    TestExpr,
};
use tool_form::parser::{parse_implicit_query, parse_predicate, parse_query, parse_singular_expression};

fn child(selectors: Vec<Selector>) -> Segment {
    Segment {
        kind: SegmentKind::Child,
        selectors,
    }
}

fn name(name: &str) -> Selector {
    Selector::Name(name.to_string())
}

fn root(segments: Vec<Segment>) -> Query {
    Query {
        root: QueryRoot::Root,
        segments,
    }
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_parse_root() {
    assert_eq!(parse_query("$").unwrap(), Query::root());
    assert!(parse_query("$").unwrap().is_singular());
}

#[test]
fn test_parse_dot_members() {
    let query = parse_query("$.store.book").unwrap();
    assert_eq!(query, root(vec![child(vec![name("store")]), child(vec![name("book")])]));
    assert!(query.is_singular());
}

#[test]
fn test_parse_keyword_members() {
    let query = parse_query("$.true.null").unwrap();
    assert_eq!(query, root(vec![child(vec![name("true")]), child(vec![name("null")])]));
}

#[test]
fn test_parse_bracketed_selection() {
    let query = parse_query(r#"$["a b", 'c', 0, -1, *]"#).unwrap();
    assert_eq!(
        query,
        root(vec![child(vec![
            name("a b"),
            name("c"),
            Selector::Index(0),
            Selector::Index(-1),
            Selector::Wildcard,
        ])])
    );
    assert!(!query.is_singular());
}

#[test]
fn test_parse_slices() {
    let cases = vec![
        ("$[1:3]", Some(1), Some(3), None),
        ("$[:2]", None, Some(2), None),
        ("$[::-1]", None, None, Some(-1)),
        ("$[2:]", Some(2), None, None),
        ("$[0:10:2]", Some(0), Some(10), Some(2)),
    ];

    for (input, start, end, step) in cases {
        let query = parse_query(input).unwrap();
        assert_eq!(
            query,
            root(vec![child(vec![Selector::Slice { start, end, step }])]),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_parse_descendant_segments() {
    let query = parse_query("$..price").unwrap();
    assert_eq!(
        query.segments,
        vec![Segment {
            kind: SegmentKind::Descendant,
            selectors: vec![name("price")],
        }]
    );

    let query = parse_query("$..[0, 'a']").unwrap();
    assert_eq!(query.segments[0].kind, SegmentKind::Descendant);
    assert_eq!(query.segments[0].selectors, vec![Selector::Index(0), name("a")]);
    assert!(!query.is_singular());
}

#[test]
fn test_parse_filter_selector() {
    let query = parse_query("$.items[?@.price < 10]").unwrap();
    let Selector::Filter(expr) = &query.segments[1].selectors[0] else {
        panic!("expected a filter selector");
    };
    assert_eq!(
        **expr,
        LogicalExpr::Comparison {
            op: CompOp::LessThan,
            left: Comparable::Query(Query {
                root: QueryRoot::Current,
                segments: vec![child(vec![name("price")])],
            }),
            right: Comparable::Literal(Node::Number(10.0)),
        }
    );
}

#[test]
fn test_parse_query_errors() {
    let cases = vec![
        "",
        "store",
        "$.",
        "$[",
        "$[]",
        "$[1",
        "$.a b",
        "$['unterminated]",
        "$[?@.a = 1]",
        "$[?@.a & @.b]",
        "$[?1]",
    ];

    for input in cases {
        assert!(parse_query(input).is_err(), "Expected error for input: {:?}", input);
    }
}

// ============================================================================
// Implicit Queries
// ============================================================================

#[test]
fn test_parse_implicit_roots() {
    let expected = root(vec![child(vec![name("user")]), child(vec![name("name")])]);
    for input in ["user.name", ".user.name", "$.user.name", "['user'].name"] {
        assert_eq!(parse_implicit_query(input).unwrap(), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_parse_implicit_current() {
    let query = parse_implicit_query("@.name").unwrap();
    assert_eq!(query.root, QueryRoot::Current);
}

#[test]
fn test_parse_singular_expression() {
    let expression = parse_singular_expression("items[0] | sort | first").unwrap();
    assert_eq!(
        expression.query,
        root(vec![child(vec![name("items")]), child(vec![Selector::Index(0)])])
    );
    assert_eq!(expression.pipes, vec!["sort", "first"]);

    let expression = parse_singular_expression("$").unwrap();
    assert!(expression.pipes.is_empty());

    assert!(parse_singular_expression("a |").is_err());
    assert!(parse_singular_expression("a | 'sort'").is_err());
    assert!(parse_singular_expression("a b").is_err());
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_predicate_precedence() {
    // && binds tighter than ||
    let expr = parse_predicate("$.a || $.b && $.c").unwrap();
    let LogicalExpr::Or(_, right) = expr else {
        panic!("expected ||, got {:?}", expr);
    };
    assert!(matches!(*right, LogicalExpr::And(_, _)));

    let expr = parse_predicate("($.a || $.b) && $.c").unwrap();
    let LogicalExpr::And(left, _) = expr else {
        panic!("expected &&, got {:?}", expr);
    };
    assert!(matches!(*left, LogicalExpr::Or(_, _)));
}

#[test]
fn test_predicate_negation() {
    let expr = parse_predicate("!$.deleted").unwrap();
    assert_eq!(
        expr,
        LogicalExpr::Not(Box::new(LogicalExpr::Test(TestExpr::Query(root(vec![child(vec![
            name("deleted")
        ])])))))
    );
}

#[test]
fn test_predicate_comparison_operators() {
    let cases = vec![
        ("==", CompOp::Equal),
        ("!=", CompOp::NotEqual),
        ("<", CompOp::LessThan),
        ("<=", CompOp::LessEqual),
        (">", CompOp::GreaterThan),
        (">=", CompOp::GreaterEqual),
    ];

    for (symbol, expected) in cases {
        let expr = parse_predicate(&format!("$.x {} 'y'", symbol)).unwrap();
        let LogicalExpr::Comparison { op, right, .. } = expr else {
            panic!("expected a comparison for {}", symbol);
        };
        assert_eq!(op, expected);
        assert_eq!(right, Comparable::Literal(Node::from("y")));
    }
}

#[test]
fn test_predicate_functions() {
    let expr = parse_predicate("match(@.date, '1974-05-..')").unwrap();
    let LogicalExpr::Test(TestExpr::Function(call)) = expr else {
        panic!("expected a function test");
    };
    assert_eq!(call.name, "match");
    assert_eq!(call.args.len(), 2);
    assert_eq!(call.args[1], FunctionArg::Literal(Node::from("1974-05-..")));

    assert!(parse_predicate("length($.tags) > 2").is_ok());
    assert!(parse_predicate("count($.tags[*]) == 0").is_ok());
    assert!(parse_predicate("value($..id) == 1").is_ok());
}

#[test]
fn test_predicate_function_errors() {
    let cases = vec![
        // unknown function
        "size($.a) == 1",
        // wrong arity
        "length($.a, $.b) == 1",
        "match($.a)",
        // value functions must be compared
        "length($.a)",
        // logical functions cannot be compared
        "match($.a, 'x') == true",
        // non-singular query where a value is needed
        "length($.a[*]) == 1",
        "$.a[*] == 1",
        // a literal on its own
        "'x'",
    ];

    for input in cases {
        assert!(parse_predicate(input).is_err(), "Expected error for input: {:?}", input);
    }
}
