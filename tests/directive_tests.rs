use pretty_assertions::assert_eq;
use serde_json::json;
use std::borrow::Cow;
use tool_form::{
    Directive, FormContext, Node, OperatorDirective, Template, TemplateOptions, Transform, TransformError,
    TransformResult,
};

fn node(value: serde_json::Value) -> Node {
    Node::from(value)
}

fn render(template: serde_json::Value, args: serde_json::Value) -> Result<Node, TransformError> {
    render_with(template, args, TemplateOptions::new())
}

fn render_with(
    template: serde_json::Value,
    args: serde_json::Value,
    options: TemplateOptions,
) -> Result<Node, TransformError> {
    let mut template = Template::parse_with(node(template), options)?;
    template.transform(&node(args))
}

fn parse_error(template: serde_json::Value) -> TransformError {
    Template::parse(node(template)).err().unwrap()
}

// Modifiers

#[test]
fn test_meta_and_comment() {
    let result = render(
        json!({"$meta": {"version": 1}, "$comment": "note", "a": "{{a}}"}),
        json!({"a": "x"}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"a": "x"})));
}

// $each

#[test]
fn test_each_totality() {
    let result = render(
        json!({"$each": "$.letters[*]", "$as": "alpha", "letter": {"$": "alpha"}}),
        json!({"letters": ["a", "b", "c"]}),
    )
    .unwrap();
    assert_eq!(
        result,
        node(json!([{"letter": "a"}, {"letter": "b"}, {"letter": "c"}]))
    );
}

#[test]
fn test_each_empty() {
    let result = render(
        json!({"list": {"$each": "$.missing[*]", "$as": "item", "$value": {"$": "item"}}}),
        json!({}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"list": []})));
}

#[test]
fn test_each_nested_scope() {
    let result = render(
        json!({
            "$each": "$.groups[*]",
            "$as": "group",
            "$value": {
                "$each": "$.group.members[*]",
                "$as": "member",
                "$value": "{{group.name}}:{{member}}"
            }
        }),
        json!({"groups": [{"name": "a", "members": [1, 2]}, {"name": "b", "members": [3]}]}),
    )
    .unwrap();
    assert_eq!(result, node(json!([["a:1", "a:2"], ["b:3"]])));
}

#[test]
fn test_each_outer_argument_visible() {
    let result = render(
        json!({"$each": "$.ids[*]", "$as": "id", "$value": "{{prefix}}-{{id}}"}),
        json!({"prefix": "user", "ids": [1, 2]}),
    )
    .unwrap();
    assert_eq!(result, node(json!(["user-1", "user-2"])));
}

#[test]
fn test_each_keyed() {
    let result = render(
        json!({"$each": "$.users[*]", "$as": "user", "$key": "{{user.id}}", "$value": {"$": "user.name"}}),
        json!({"users": [{"id": "u1", "name": "Ada"}, {"id": "u2"}, {"id": "u3", "name": "Bob"}]}),
    )
    .unwrap();
    assert_eq!(result, node(json!({"u1": "Ada", "u3": "Bob"})));
}

#[test]
fn test_each_over_template_argument() {
    let result = render(
        json!({"$each": ["a", "{{b}}"], "$as": "x", "$value": "<{{x}}>"}),
        json!({"b": "B"}),
    )
    .unwrap();
    assert_eq!(result, node(json!(["<a>", "<B>"])));
}

#[test]
fn test_each_over_object_values() {
    let result = render(
        json!({"$each": {"$": "map"}, "$as": "v", "$value": {"$": "v"}}),
        json!({"map": {"a": 1, "b": 2}}),
    )
    .unwrap();
    assert_eq!(result, node(json!([1, 2])));
}

#[test]
fn test_each_skips_undefined_elements() {
    let result = render(
        json!({
            "$each": "$.items[*]",
            "$as": "item",
            "$value": {"$when": "$.item.keep == true", "id": {"$": "item.id"}}
        }),
        json!({"items": [{"id": 1, "keep": true}, {"id": 2, "keep": false}]}),
    )
    .unwrap();
    assert_eq!(result, node(json!([{"id": 1}])));
}

#[test]
fn test_each_splices_fragments() {
    let result = render(
        json!({"$each": "$.rows[*]", "$as": "row", "$value": {"$spread": "$.row[*]"}}),
        json!({"rows": [[1, 2], [], [3]]}),
    )
    .unwrap();
    assert_eq!(result, node(json!([1, 2, 3])));
}

#[test]
fn test_each_without_as() {
    let result = render(json!({"list": {"$each": "$.items[*]"}, "x": 1}), json!({"items": [1]})).unwrap();
    assert_eq!(result, node(json!({"x": 1})));
}

#[test]
fn test_each_operators_apply_to_result() {
    let args = json!({"tags": ["a", "b"]});
    let result = render(
        json!({"$each": "$.tags[*]", "$as": "tag", "name": "{{tag}}", "$transform": "length"}),
        args.clone(),
    )
    .unwrap();
    assert_eq!(result, node(json!(2)));

    let result = render(
        json!({"$each": "$.tags[*]", "$as": "tag", "$value": "#{{tag}}", "$join": " "}),
        args,
    )
    .unwrap();
    assert_eq!(result, node(json!("#a #b")));
}

#[test]
fn test_each_invalid_query() {
    let err = parse_error(json!({"$each": "items[", "$as": "item"}));
    assert!(err.message().starts_with("Invalid query expression"));
}

// $if and $when

#[test]
fn test_if_predicate() {
    let template = json!({"$if": "$.age >= 18", "$then": "adult", "$else": "minor"});
    assert_eq!(render(template.clone(), json!({"age": 30})).unwrap(), node(json!("adult")));
    assert_eq!(render(template, json!({"age": 3})).unwrap(), node(json!("minor")));
}

#[test]
fn test_if_missing_branch() {
    let result = render(json!({"x": {"$if": "$.flag == true", "$then": 1}}), json!({"flag": false})).unwrap();
    assert_eq!(result, node(json!({})));
}

#[test]
fn test_if_template_condition() {
    let template = json!({"$if": {"$": "items | length"}, "$then": "some", "$else": "none"});
    assert_eq!(render(template.clone(), json!({"items": []})).unwrap(), node(json!("none")));
    assert_eq!(render(template, json!({"items": [1]})).unwrap(), node(json!("some")));
}

#[test]
fn test_if_branches_are_templates() {
    let result = render(
        json!({"$if": "$.user", "$then": {"name": "{{user.name}}"}, "$else": {"$": "fallback"}}),
        json!({"fallback": "anonymous"}),
    )
    .unwrap();
    assert_eq!(result, node(json!("anonymous")));
}

#[test]
fn test_if_invalid_predicate() {
    let err = parse_error(json!({"a": {"$if": "$.x ==", "$then": 1}}));
    assert!(err.message().starts_with("Invalid predicate expression"));
    assert_eq!(err.location().to_string(), "#/a");
}

#[test]
fn test_when() {
    let result = render(
        json!({"contacts": [
            {"$when": "$.phone", "type": "phone", "number": "{{phone}}"},
            {"$when": "$.email", "type": "email", "address": "{{email}}"}
        ]}),
        json!({"email": "ada@example.com"}),
    )
    .unwrap();
    assert_eq!(
        result,
        node(json!({"contacts": [{"type": "email", "address": "ada@example.com"}]}))
    );
}

// $use and $

#[test]
fn test_use() {
    let result = render(json!({"$use": {"x": "{{a}}"}, "ignored": 1}), json!({"a": 1})).unwrap();
    assert_eq!(result, node(json!({"x": "1"})));
}

#[test]
fn test_use_escapes_directives() {
    let result = render(json!({"$use": ["$if", {"$$each": "{{a}}"}]}), json!({"a": "b"})).unwrap();
    assert_eq!(result, node(json!(["$if", {"$each": "b"}])));
}

// $uri

#[test]
fn test_uri() {
    let result = render(
        json!({"$uri": "https://example.com/users/{id}{?q,page}", "id": "user.id"}),
        json!({"user": {"id": 42}, "q": "a b"}),
    )
    .unwrap();
    assert_eq!(result, node(json!("https://example.com/users/42?q=a%20b")));
}

#[test]
fn test_uri_explode() {
    let result = render(
        json!({"$uri": "/search{?tags*}", "tags": "$.filters[*].tag"}),
        json!({"filters": [{"tag": "x"}, {"tag": "y"}]}),
    )
    .unwrap();
    assert_eq!(result, node(json!("/search?tags=x&tags=y")));
}

#[test]
fn test_uri_variable_must_be_string() {
    let err = render(json!({"$uri": "/{id}", "id": 5}), json!({})).unwrap_err();
    assert_eq!(err.message(), r#"variable expression "id" must be a string"#);
}

#[test]
fn test_uri_invalid_template() {
    let err = parse_error(json!({"$uri": "/{id"}));
    assert!(err.message().starts_with("Invalid URI template"));
}

// $join

#[test]
fn test_join() {
    let result = render(json!({"$": "parts", "$join": ", "}), json!({"parts": ["a", 1, true, null]})).unwrap();
    assert_eq!(result, node(json!("a, 1, true, null")));
}

#[test]
fn test_join_object_values() {
    let result = render(
        json!({"first": "{{first}}", "last": "{{last}}", "$join": " "}),
        json!({"first": "Ada", "last": "Lovelace"}),
    )
    .unwrap();
    assert_eq!(result, node(json!("Ada Lovelace")));
}

#[test]
fn test_join_skips_undefined() {
    let result = render(json!({"$use": ["a", {"$": "missing"}, "b"], "$join": "-"}), json!({})).unwrap();
    assert_eq!(result, node(json!("a-b")));
}

#[test]
fn test_join_scalar_and_default_separator() {
    assert_eq!(render(json!({"$": "name", "$join": ","}), json!({"name": "Ada"})).unwrap(), node(json!("Ada")));
    assert_eq!(render(json!({"$": "parts", "$join": 1}), json!({"parts": ["a", "b"]})).unwrap(), node(json!("ab")));
}

// $match and $matches

#[test]
fn test_match_first_wins() {
    let template = json!({
        "$": "value",
        "$match": [
            {"$case": {"type": "number"}, "$then": "number"},
            {"$case": {"type": "number", "minimum": 10}, "$then": "big"},
            {"$case": {"type": "string"}, "$then": "string"}
        ]
    });
    assert_eq!(render(template.clone(), json!({"value": 5})).unwrap(), node(json!("number")));
    assert_eq!(render(template.clone(), json!({"value": 50})).unwrap(), node(json!("number")));
    assert_eq!(render(template.clone(), json!({"value": "s"})).unwrap(), node(json!("string")));
    assert_eq!(render(template, json!({"value": true})).unwrap(), Node::Undefined);
}

#[test]
fn test_match_first_wins_when_undefined() {
    let result = render(
        json!({"x": {"$": "value", "$match": [{"$case": true, "$then": {"$": "missing"}}, {"$then": "fallback"}]}}),
        json!({"value": 1}),
    )
    .unwrap();
    assert_eq!(result, node(json!({})));
}

#[test]
fn test_match_branch_shapes() {
    let template = json!({
        "$": "value",
        "$match": [
            {"$case": {"const": 1}, "label": "one", "value": "{{value}}"},
            {"$then": "other"}
        ]
    });
    assert_eq!(
        render(template.clone(), json!({"value": 1})).unwrap(),
        node(json!({"label": "one", "value": "1"}))
    );
    assert_eq!(render(template, json!({"value": 2})).unwrap(), node(json!("other")));
}

#[test]
fn test_match_object_result() {
    let template = json!({
        "method": "{{method}}",
        "$match": [
            {"$case": {"properties": {"method": {"enum": ["POST", "PUT"]}}}, "$then": "write"},
            {"$then": "read"}
        ]
    });
    assert_eq!(render(template.clone(), json!({"method": "PUT"})).unwrap(), node(json!("write")));
    assert_eq!(render(template, json!({"method": "GET"})).unwrap(), node(json!("read")));
}

#[test]
fn test_matches() {
    let template = json!({"$": "age", "$matches": {"type": "integer", "minimum": 0}});
    assert_eq!(render(template.clone(), json!({"age": 3})).unwrap(), Node::Bool(true));
    assert_eq!(render(template.clone(), json!({"age": -1})).unwrap(), Node::Bool(false));
    assert_eq!(render(template, json!({"age": 2.5})).unwrap(), Node::Bool(false));
}

#[test]
fn test_matches_templated_schema() {
    let template = json!({"$": "value", "$matches": {"enum": [{"$": "allowed[0]"}, {"$": "allowed[1]"}]}});
    let args = |value: &str| json!({"value": value, "allowed": ["red", "green"]});
    assert_eq!(render(template.clone(), args("green")).unwrap(), Node::Bool(true));
    assert_eq!(render(template, args("blue")).unwrap(), Node::Bool(false));
}

#[test]
fn test_matches_format_validation() {
    let template = json!({"$": "email", "$matches": {"type": "string", "format": "email"}});
    let args = json!({"email": "not an email"});
    assert_eq!(render(template.clone(), args.clone()).unwrap(), Node::Bool(false));

    let options = TemplateOptions::new().with_format_validation(false);
    assert_eq!(render_with(template, args, options).unwrap(), Node::Bool(true));
}

#[test]
fn test_matches_invalid_schema() {
    let err = parse_error(json!({"$": "value", "$matches": 5}));
    assert!(err.message().starts_with("Invalid schema"));
    assert_eq!(err.location().to_string(), "#/$matches");
}

// $transform and $encode

#[test]
fn test_transform_directive() {
    let result = render(json!({"$": "items", "$transform": ["sort", "first"]}), json!({"items": [3, 1, 2]})).unwrap();
    assert_eq!(result, node(json!(1)));
}

#[test]
fn test_transform_unsupported() {
    let err = parse_error(json!({"$": "items", "$transform": "bogus"}));
    assert_eq!(err.to_string(), r#"Unsupported transform: "bogus" at #/$transform"#);
}

#[test]
fn test_encode_unsupported() {
    let err = parse_error(json!({"$encode": "yaml"}));
    assert_eq!(err.to_string(), r#"Unsupported encoding: "yaml" at #/$encode"#);

    let err = parse_error(json!({"$encode": 1}));
    assert_eq!(err.message(), "Encoding name must be a string: 1");
}

#[test]
fn test_encode_dynamic_name() {
    let template = json!({"$encode": "{{format}}", "$content": "hi"});
    assert_eq!(render(template.clone(), json!({"format": "base64"})).unwrap(), node(json!("aGk=")));

    let err = render(template, json!({"format": "yaml"})).unwrap_err();
    assert_eq!(err.message(), r#"Unsupported encoding: "yaml""#);
}

#[test]
fn test_encode_chain() {
    let result = render(json!({"$encode": ["json", "base64"], "$content": {"a": 1}}), json!({})).unwrap();
    assert_eq!(result, node(json!("eyJhIjoxfQ==")));
}

// Custom directives and transforms

struct ShoutDirective;

impl OperatorDirective for ShoutDirective {
    fn name(&self) -> &str {
        "$shout"
    }

    fn operate<'t>(
        &self,
        _argument: &'t Node,
        node: Cow<'t, Node>,
        _arg: &Node,
        _cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        Ok(match node.as_ref() {
            Node::String(text) => Cow::Owned(Node::String(text.to_uppercase())),
            _ => node,
        })
    }
}

struct ReverseTransform;

impl Transform for ReverseTransform {
    fn name(&self) -> &str {
        "reverse"
    }

    fn transform(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(match node {
            Node::String(text) => Node::String(text.chars().rev().collect()),
            Node::Array(mut items) => {
                items.reverse();
                Node::Array(items)
            }
            _ => Node::Undefined,
        })
    }
}

#[test]
fn test_custom_operator_directive() {
    let options = TemplateOptions::new().with_directive(Directive::operator(ShoutDirective));
    let result = render_with(
        json!({"a": {"$": "name", "$shout": true}, "$$shout": "{{name}}"}),
        json!({"name": "ada"}),
        options,
    )
    .unwrap();
    assert_eq!(result, node(json!({"a": "ADA", "$shout": "ada"})));
}

#[test]
fn test_custom_transform() {
    let options = TemplateOptions::new().with_transform(ReverseTransform);
    let result = render_with(
        json!({"name": "{{name | reverse}}", "items": {"$": "items", "$transform": "reverse"}}),
        json!({"name": "abc", "items": [1, 2]}),
        options,
    )
    .unwrap();
    assert_eq!(result, node(json!({"name": "cba", "items": [2, 1]})));
}
