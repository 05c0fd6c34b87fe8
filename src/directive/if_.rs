use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{DomainDirective, parse_property, process_argument, process_property};
use crate::error::TransformResult;
use crate::evaluate::{coerce_boolean, evaluate_predicate_expression};
use crate::node::Node;
use crate::parse::parse_object;
use crate::parser::parse_predicate;

/// `$if`/`$then`/`$else`: chooses between two templates.
///
/// ```json
/// {"$if": "$.user.admin == true", "$then": "Welcome back", "$else": "Hello"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IfDirective;

impl DomainDirective for IfDirective {
    fn name(&self) -> &str {
        "$if"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_condition(node, "$if", cx)?;
        parse_object(node, cx)
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        if evaluate_condition(node, "$if", arg, cx)? {
            process_property(node, "$then", arg, cx)
        } else {
            process_property(node, "$else", arg, cx)
        }
    }
}

/// Check the condition held by the `name` property.
pub(crate) fn parse_condition(node: &Node, name: &str, cx: &mut FormContext) -> TransformResult<()> {
    match node.get(name) {
        Some(Node::String(predicate)) => parse_predicate(predicate).map(|_| ()).map_err(|err| {
            cx.error(format!("Invalid predicate expression {:?}: {}", predicate, err))
                .with_source(err)
        }),
        _ => parse_property(node, name, cx),
    }
}

/// Evaluate the condition held by the `name` property.
///
/// Strings are predicate expressions. Other values are transformed and
/// tested for truthiness.
pub(crate) fn evaluate_condition(node: &Node, name: &str, arg: &Node, cx: &mut FormContext) -> TransformResult<bool> {
    match node.get(name) {
        Some(Node::String(predicate)) => evaluate_predicate_expression(predicate, arg, cx),
        Some(condition) => {
            let value = process_argument(name, condition, arg, cx)?;
            Ok(coerce_boolean(value.as_ref()))
        }
        None => Ok(false),
    }
}
