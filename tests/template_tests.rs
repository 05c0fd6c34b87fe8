use pretty_assertions::assert_eq;
use serde_json::json;
use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use tool_form::{
    Directive, FormContext, MemoryResolver, Node, NullResolver, OperatorDirective, Payload, Template, TemplateOptions,
    TransformError, TransformResult,
};
use url::Url;

fn node(value: serde_json::Value) -> Node {
    Node::from(value)
}

fn render(template: serde_json::Value, args: serde_json::Value) -> Result<Node, TransformError> {
    let mut template = Template::parse(node(template))?;
    template.transform(&node(args))
}

fn keys(node: &Node) -> Vec<&str> {
    node.as_object()
        .map(|entries| entries.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn base_uri() -> Url {
    Url::parse("https://example.com/forms/main.json").unwrap()
}

#[test]
fn test_static_template() {
    let template = json!({"a": [1, "two", null, true], "b": {"c": 2.5}});
    let result = render(template.clone(), json!({})).unwrap();
    assert_eq!(result, node(template));
}

#[test]
fn test_static_subtrees_are_borrowed() {
    let template = Template::parse(node(json!({"a": [1, 2], "b": "plain"}))).unwrap();
    let mut cx = template.new_context();
    let result = tool_form::process::process_node(template.node(), &Node::Null, &mut cx).unwrap();
    assert!(matches!(result, Cow::Borrowed(_)));
}

#[test]
fn test_interpolation() {
    let result = render(
        json!({"greeting": "Hello, {{user.name}}!", "count": "{{items | length}} items"}),
        json!({"user": {"name": "Ada"}, "items": [1, 2, 3]}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"greeting": "Hello, Ada!", "count": "3 items"})));
}

#[test]
fn test_undefined_propagation() {
    let result = render(
        json!({
            "a": {"$": "missing"},
            "b": [1, {"$": "missing"}, 2],
            "c": "{{missing}}",
            "d": {"e": {"$": "missing"}}
        }),
        json!({}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"b": [1, 2], "c": "", "d": {}})));
}

#[test]
fn test_root_undefined() {
    let result = render(json!({"$": "missing"}), json!({})).unwrap();
    assert_eq!(result, Node::Undefined);
}

#[test]
fn test_escaped_keys() {
    let result = render(json!({"$$if": "literal", "$$$each": 1, "plain": "{{x}}"}), json!({"x": "y"})).unwrap();
    assert_eq!(result, node(json!({"$if": "literal", "$$each": 1, "plain": "y"})));
}

#[test]
fn test_key_order_preserved() {
    let result = render(json!({"z": 1, "a": "{{a}}", "m": {"$": "m"}}), json!({"a": "x", "m": 2})).unwrap();
    assert_eq!(keys(&result), vec!["z", "a", "m"]);
}

#[test]
fn test_splice_values() {
    let args = json!({"text": "hi", "number": 4, "list": [1, 2], "object": {"k": "v"}, "nothing": null});
    assert_eq!(render(json!({"$": "text"}), args.clone()).unwrap(), node(json!("hi")));
    assert_eq!(render(json!({"$": "number"}), args.clone()).unwrap(), node(json!(4)));
    assert_eq!(render(json!({"$": "$.object"}), args.clone()).unwrap(), node(json!({"k": "v"})));
    assert_eq!(render(json!({"$": "nothing"}), args.clone()).unwrap(), Node::Null);
    assert_eq!(render(json!({"$": "list[0]"}), args.clone()).unwrap(), node(json!(1)));
    assert_eq!(render(json!({"$": "list[*]"}), args.clone()).unwrap(), node(json!([1, 2])));
    assert_eq!(render(json!({"$": "list | last"}), args).unwrap(), node(json!(2)));
}

#[test]
fn test_splice_requires_string() {
    let err = Template::parse(node(json!({"items": [{"name": {"$": 5}}]}))).err().unwrap();
    assert_eq!(err.message(), "$ value must be a string");
    assert_eq!(err.location().to_string(), "#/items/0/name");
    assert_eq!(err.to_string(), "$ value must be a string at #/items/0/name");
}

#[test]
fn test_unknown_pipe_transform() {
    let err = render(json!({"a": "{{name | shout}}"}), json!({"name": "x"})).unwrap_err();
    assert_eq!(err.to_string(), r#"Unsupported transform: "shout" at #/a"#);
}

#[test]
fn test_runtime_error_location() {
    let err = render(json!({"a": ["ok", "{{x"]}), json!({"x": 1})).unwrap_err();
    assert!(err.message().contains(r#"Missing closing "}}""#));
    assert_eq!(err.location().to_string(), "#/a/1");
}

#[test]
fn test_ambiguous_domain_directive() {
    let err = Template::parse(node(json!({"list": {"$if": "$.a", "$each": "$.b[*]", "$as": "b"}})))
        .err()
        .unwrap();
    assert!(err.to_string().contains("Ambiguous domain directive"));
    assert_eq!(err.location().to_string(), "#/list");
}

#[test]
fn test_undefined_directive_property_is_absent() {
    let mut template = Template::parse(node(json!({"a": 1}))).unwrap();
    let mut entries = tool_form::Object::new();
    entries.insert("$if".to_string(), Node::Undefined);
    entries.insert("plain".to_string(), Node::from("{{x}}"));
    let object = Node::Object(entries);
    let directives = tool_form::directive::detect_directives(&object, template.context()).unwrap();
    assert!(directives.is_empty());
    assert_eq!(template.transform(&Node::Null).unwrap(), node(json!({"a": 1})));
}

#[test]
fn test_context_reuse_after_error() {
    let mut template = Template::parse(node(json!({
        "result": {"$if": {"$": "fail"}, "$then": "{{broken", "$else": "ok"}
    })))
    .unwrap();

    let err = template.transform(&node(json!({"fail": true}))).unwrap_err();
    assert_eq!(err.location().to_string(), "#/result/$then");
    assert!(template.context().frames().is_empty());

    let result = template.transform(&node(json!({"fail": false}))).unwrap();
    assert_eq!(result, node(json!({"result": "ok"})));
}

#[test]
fn test_nested_directives_with_borrowed_results() {
    assert_eq!(render(json!({"a": {"$use": 5}}), json!({})).unwrap(), node(json!({"a": 5})));

    assert_eq!(
        render(json!([{"$if": "$.x", "$then": "yes", "$else": "no"}]), json!({"x": true})).unwrap(),
        node(json!(["yes"]))
    );

    assert_eq!(
        render(json!({"k": {"$": "v", "$match": [{"$then": "lit"}]}}), json!({"v": 1})).unwrap(),
        node(json!({"k": "lit"}))
    );
}

#[test]
fn test_root_spread_becomes_array() {
    assert_eq!(
        render(json!({"$spread": "$.items[*]"}), json!({"items": [1, 2]})).unwrap(),
        node(json!([1, 2]))
    );
    assert_eq!(render(json!({"$spread": "$.none[*]"}), json!({})).unwrap(), node(json!([])));
}

#[test]
fn test_transform_is_repeatable() {
    let mut template = Template::parse(node(json!({"n": {"$": "n"}}))).unwrap();
    for n in 0..3 {
        let result = template.transform(&node(json!({"n": n}))).unwrap();
        assert_eq!(result, node(json!({"n": n})));
    }
}

#[test]
fn test_transform_with_forked_context() {
    let template = Template::parse(node(json!({"greeting": "Hi {{name}}"}))).unwrap();
    let mut first = template.new_context();
    let mut second = template.new_context();

    let a = template.transform_with(&node(json!({"name": "Ada"})), &mut first).unwrap();
    let b = template.transform_with(&node(json!({"name": "Bob"})), &mut second).unwrap();
    assert_eq!(a, node(json!({"greeting": "Hi Ada"})));
    assert_eq!(b, node(json!({"greeting": "Hi Bob"})));
}

#[test]
fn test_transform_threads() {
    let template = Template::parse(node(json!({"id": {"$": "id"}}))).unwrap();
    let template = &template;
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|id| {
                scope.spawn(move || {
                    let mut cx = template.new_context();
                    template.transform_with(&node(json!({"id": id})), &mut cx).unwrap()
                })
            })
            .collect();
        for (id, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), node(json!({"id": id})));
        }
    });
}

#[test]
fn test_fragment_idempotence() {
    let args = json!({"empty": [], "one": ["x"]});
    assert_eq!(
        render(json!([1, {"$spread": "$.empty[*]"}, 2]), args.clone()).unwrap(),
        node(json!([1, 2]))
    );
    assert_eq!(
        render(json!({"a": 1, "b": {"$spread": "$.empty[*]"}}), args.clone()).unwrap(),
        node(json!({"a": 1}))
    );
    assert_eq!(
        render(json!([0, {"$spread": "$.one[*]"}]), args.clone()).unwrap(),
        render(json!([0, {"$": "one[0]"}]), args).unwrap()
    );
}

#[test]
fn test_spread_into_array() {
    let result = render(
        json!([0, {"$spread": "$.items[*]"}, {"$spread": "$.pairs"}, 9]),
        json!({"items": [1, 2], "pairs": {"x": 3, "y": 4}}),
    )
    .unwrap();
    assert_eq!(result, node(json!([0, 1, 2, 3, 4, 9])));
}

#[test]
fn test_spread_into_object() {
    let result = render(
        json!({"a": 1, "rest": {"$spread": "$.extra"}, "z": 26}),
        json!({"extra": {"b": 2, "a": 3}}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"a": 3, "b": 2, "z": 26})));
    assert_eq!(keys(&result), vec!["a", "b", "z"]);
}

#[test]
fn test_spread_array_into_object() {
    let result = render(json!({"list": {"$spread": "$.letters"}}), json!({"letters": ["a", "b"]})).unwrap();
    assert_eq!(result, node(json!({"0": "a", "1": "b"})));
}

#[test]
fn test_spread_template_argument() {
    let result = render(
        json!({"id": 1, "more": {"$spread": {"name": "{{name}}"}}}),
        json!({"name": "Ada"}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"id": 1, "name": "Ada"})));
}

#[test]
fn test_spread_deletion() {
    let mut template = Template::parse(node(json!({"a": 1, "b": 2, "rest": {"$spread": {"$": "overrides"}}}))).unwrap();

    let mut overrides = tool_form::Object::new();
    overrides.insert("a".to_string(), Node::Undefined);
    let mut args = tool_form::Object::new();
    args.insert("overrides".to_string(), Node::Object(overrides));

    let result = template.transform(&Node::Object(args)).unwrap();
    assert_eq!(result, node(json!({"b": 2})));
}

#[test]
fn test_spread_invalid_query() {
    let err = Template::parse(node(json!([{"$spread": "$.["}]))).err().unwrap();
    assert!(err.message().starts_with("Invalid query expression"));
    assert_eq!(err.location().to_string(), "#/0");
}

#[test]
fn test_payload_preserved_by_transform_node() {
    let mut template = Template::parse(node(json!({"$encode": "json", "a": "{{a}}"}))).unwrap();
    let raw = template.transform_node(&node(json!({"a": 1}))).unwrap();
    assert_eq!(
        raw,
        Node::Payload(Payload::text(r#"{"a":"1"}"#).with_header("Content-Type", "application/json"))
    );
    assert_eq!(template.transform(&node(json!({"a": 1}))).unwrap(), node(json!(r#"{"a":"1"}"#)));
}

#[test]
fn test_payload_interpolated_as_content() {
    let result = render(
        json!({"body": {"$encode": "urlencoded", "q": "{{q}}"}, "label": "{{q}}"}),
        json!({"q": "a b"}),
    )
    .unwrap();
    assert_eq!(
        result.get("body"),
        Some(&Node::Payload(
            Payload::text("q=a+b").with_header("Content-Type", "application/x-www-form-urlencoded")
        ))
    );
    assert_eq!(result.get("label"), Some(&node(json!("a b"))));
}

fn include_options(documents: serde_json::Value) -> TemplateOptions {
    let mut resolver = MemoryResolver::new();
    if let serde_json::Value::Object(documents) = documents {
        for (uri, document) in documents {
            resolver.add(uri, node(document));
        }
    }
    TemplateOptions::new().with_base_uri(base_uri()).with_resolver(resolver)
}

#[test]
fn test_include() {
    let options = include_options(json!({
        "https://example.com/forms/parts.json": {
            "greeting": "Hi {{name}}",
            "nested": {"$include": "#/greeting"}
        },
        "https://example.com/shared/footer.json": ["{{name}}", "bye"]
    }));
    let mut template = Template::parse_with(
        node(json!({
            "a": {"$include": "parts.json#/greeting"},
            "b": {"$include": "parts.json#/nested"},
            "c": {"$include": "../shared/footer.json"}
        })),
        options,
    )
    .unwrap();

    let result = template.transform(&node(json!({"name": "Ada"}))).unwrap();
    assert_eq!(result, node(json!({"a": "Hi Ada", "b": "Hi Ada", "c": ["Ada", "bye"]})));
}

#[test]
fn test_include_dynamic_reference() {
    let options = include_options(json!({
        "https://example.com/forms/en.json": "Hello",
        "https://example.com/forms/fr.json": "Bonjour"
    }));
    let mut template = Template::parse_with(node(json!({"$include": "{{lang}}.json"})), options).unwrap();

    assert_eq!(template.transform(&node(json!({"lang": "en"}))).unwrap(), node(json!("Hello")));
    assert_eq!(template.transform(&node(json!({"lang": "fr"}))).unwrap(), node(json!("Bonjour")));
}

#[test]
fn test_include_preloaded_resource() {
    let options = TemplateOptions::new()
        .with_base_uri(base_uri())
        .with_resolver(NullResolver)
        .with_resource(
            Url::parse("https://example.com/forms/user.json").unwrap(),
            node(json!({"name": "{{name}}"})),
        );
    let mut template = Template::parse_with(node(json!({"user": {"$include": "user.json"}})), options).unwrap();
    let result = template.transform(&node(json!({"name": "Ada"}))).unwrap();
    assert_eq!(result, node(json!({"user": {"name": "Ada"}})));
}

#[test]
fn test_include_missing_resource() {
    let options = TemplateOptions::new().with_base_uri(base_uri());
    let err = Template::parse_with(node(json!({"user": {"$include": "user.json"}})), options)
        .err()
        .unwrap();
    assert!(err.message().starts_with("Failed to include https://example.com/forms/user.json"));
    assert_eq!(err.location().to_string(), "#/user/$include");
}

#[test]
fn test_include_missing_fragment() {
    let options = include_options(json!({"https://example.com/forms/parts.json": {"a": 1}}));
    let mut template = Template::parse_with(node(json!({"$include": "parts.json#/b"})), options).unwrap();
    let err = template.transform(&Node::Null).unwrap_err();
    assert!(err.message().starts_with("Unresolved include fragment"));
}

/// Records the base URI each `$base` property is parsed under.
struct BaseDirective(Arc<Mutex<Vec<String>>>);

impl OperatorDirective for BaseDirective {
    fn name(&self) -> &str {
        "$base"
    }

    fn parse(&self, _argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        let base = cx.base_uri().map(|uri| uri.to_string()).unwrap_or_default();
        self.0.lock().unwrap().push(base);
        Ok(())
    }

    fn operate<'t>(
        &self,
        _argument: &'t Node,
        node: Cow<'t, Node>,
        _arg: &Node,
        _cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        Ok(node)
    }
}

#[test]
fn test_include_fragment_parses_document_once() {
    let bases = Arc::new(Mutex::new(Vec::new()));
    let options = include_options(json!({
        "https://example.com/forms/parts.json": {
            "a": {"$base": true, "value": 1},
            "b": {"$base": true, "value": 2}
        }
    }))
    .with_directive(Directive::operator(BaseDirective(bases.clone())));

    let mut template = Template::parse_with(
        node(json!({
            "a": {"$include": "parts.json#/a"},
            "b": {"$include": "parts.json#/b"}
        })),
        options,
    )
    .unwrap();

    assert_eq!(
        *bases.lock().unwrap(),
        vec!["https://example.com/forms/parts.json", "https://example.com/forms/parts.json"]
    );
    let result = template.transform(&Node::Null).unwrap();
    assert_eq!(result, node(json!({"a": {"value": 1}, "b": {"value": 2}})));
}

#[test]
fn test_include_depth_limit() {
    let options = include_options(json!({
        "https://example.com/forms/loop.json": {"again": {"$include": "loop.json"}}
    }));
    let mut template = Template::parse_with(node(json!({"$include": "loop.json"})), options).unwrap();
    let err = template.transform(&Node::Null).unwrap_err();
    assert!(err.message().starts_with("Include depth limit exceeded"));
}
