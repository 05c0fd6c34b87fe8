use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{Directive, DomainDirective, parse_property, process_argument};
use crate::error::TransformResult;
use crate::evaluate::{coerce_string, evaluate_query_expression};
use crate::node::{Node, Object};
use crate::parse::parse_object;
use crate::parser::parse_query;
use crate::process::{process_node, spliced};

/// `$each`/`$as`/`$key`/`$value`: repeats a template for every element of
/// a sequence.
///
/// The sequence is the matches of a query expression, or the elements (or
/// values) of the transformed argument. Each element is bound under the
/// `$as` name in a copy of the query argument, so bindings of enclosing
/// `$each`es stay visible.
///
/// Without `$key` the result is an array. With `$key` it is an object
/// keyed by the string form of `$key`, and entries with an undefined key
/// or value are skipped.
///
/// ```json
/// {"$each": "$.users[*]", "$as": "user", "name": "{{user.name}}"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EachDirective;

impl DomainDirective for EachDirective {
    fn name(&self) -> &str {
        "$each"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        match node.get("$each") {
            Some(Node::String(query)) => {
                parse_query(query).map_err(|err| {
                    cx.error(format!("Invalid query expression {:?}: {}", query, err))
                        .with_source(err)
                })?;
            }
            _ => parse_property(node, "$each", cx)?,
        }
        parse_object(node, cx)
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        let Some(Node::String(variable)) = node.get("$as") else {
            return Ok(Cow::Owned(Node::Undefined));
        };

        let elements = match node.get("$each") {
            Some(Node::String(query)) => evaluate_query_expression(query, arg, cx)?,
            Some(source) => match process_argument("$each", source, arg, cx)?.into_owned() {
                Node::Array(items) => items,
                Node::Object(entries) => entries.into_values().collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        let template = match node.get("$value") {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(element_template(node, cx)),
        };

        // The inner argument is a shallow copy of the outer one
        let mut inner = Node::Object(match arg {
            Node::Object(entries) => entries.clone(),
            Node::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item.clone()))
                .collect(),
            _ => Object::new(),
        });

        match node.get("$key") {
            Some(key_template) => {
                let mut result = Object::new();
                for element in elements {
                    bind(&mut inner, variable, element);
                    let key = process_node(key_template, &inner, cx)?;
                    let key = coerce_string(key.as_ref());
                    let value = process_node(&template, &inner, cx)?;
                    if let Some(key) = key
                        && !value.is_undefined()
                    {
                        result.insert(key, value.into_owned());
                    }
                }
                Ok(Cow::Owned(Node::Object(result)))
            }
            None => {
                let mut result = Vec::new();
                for element in elements {
                    bind(&mut inner, variable, element);
                    match process_node(&template, &inner, cx)?.into_owned() {
                        Node::Undefined => {}
                        Node::Fragment(nodes) => result.extend(spliced(nodes)),
                        value => result.push(value),
                    }
                }
                Ok(Cow::Owned(Node::Array(result)))
            }
        }
    }
}

/// The per-element template: the object without the iteration properties
/// and without operators, which apply to the overall result.
fn element_template(node: &Node, cx: &FormContext) -> Node {
    let Node::Object(entries) = node else {
        return Node::Undefined;
    };
    Node::Object(
        entries
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "$each" | "$as" | "$key"))
            .filter(|(key, _)| !matches!(cx.directive(key), Some(Directive::Operator(_))))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}

fn bind(inner: &mut Node, variable: &str, element: Node) {
    if let Node::Object(entries) = inner {
        entries.insert(variable.to_string(), element);
    }
}
