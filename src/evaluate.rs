//! Evaluation of query, singular and predicate expressions against a
//! template's query argument.
//!
//! Three kinds of expression appear in templates:
//!
//! - **query expressions** (`$each`, `$spread`): a full query starting with
//!   `$`, producing every matching node;
//! - **singular expressions** (`$`, `$uri` variables, `{{...}}`): a query
//!   whose leading `$` and leading `.` may be omitted, followed by any number
//!   of `| transform` pipes;
//! - **predicate expressions** (`$if`, `$when`): a filter expression such as
//!   `$.age >= 18 && $.country == 'NZ'`.

use tracing::trace;

use crate::context::FormContext;
use crate::error::TransformResult;
use crate::evaluator::Evaluator;
use crate::node::Node;
use crate::output::to_json;
use crate::parser::{parse_predicate, parse_query, parse_singular_expression};

/// Evaluate a query expression, returning all matching nodes.
pub fn evaluate_query_expression(input: &str, arg: &Node, cx: &FormContext) -> TransformResult<Vec<Node>> {
    let query = parse_query(input)
        .map_err(|err| cx.error(format!("Invalid query expression {:?}: {}", input, err)).with_source(err))?;

    let nodes = Evaluator::new(arg)
        .select(&query, arg)
        .map_err(|err| cx.error(format!("Failed to evaluate {:?}: {}", input, err)).with_source(err))?;

    Ok(nodes.into_iter().cloned().collect())
}

/// Evaluate a singular expression.
///
/// A singular query yields its match or [`Node::Undefined`]. Any other query
/// yields the array of all its matches.
pub fn evaluate_singular_expression(input: &str, arg: &Node, cx: &FormContext) -> TransformResult<Node> {
    let expression = parse_singular_expression(input)
        .map_err(|err| cx.error(format!("Invalid singular expression {:?}: {}", input, err)).with_source(err))?;

    let nodes = Evaluator::new(arg)
        .select(&expression.query, arg)
        .map_err(|err| cx.error(format!("Failed to evaluate {:?}: {}", input, err)).with_source(err))?;

    let mut node = if expression.query.is_singular() {
        nodes.first().map(|node| (*node).clone()).unwrap_or_default()
    } else {
        Node::Array(nodes.into_iter().cloned().collect())
    };

    for name in &expression.pipes {
        let transform = cx
            .transform(name)
            .ok_or_else(|| cx.error(format!("Unsupported transform: {:?}", name)))?;
        trace!(transform = %name, "applying pipe");
        node = transform.transform(node, cx)?;
    }

    Ok(node)
}

/// Evaluate a predicate expression.
pub fn evaluate_predicate_expression(input: &str, arg: &Node, cx: &FormContext) -> TransformResult<bool> {
    let expression = parse_predicate(input)
        .map_err(|err| cx.error(format!("Invalid predicate expression {:?}: {}", input, err)).with_source(err))?;

    Evaluator::new(arg)
        .eval_logical(&expression, arg)
        .map_err(|err| cx.error(format!("Failed to evaluate {:?}: {}", input, err)).with_source(err))
}

/// Truthiness of a node.
///
/// `undefined`, `null`, `false`, `0`, `NaN` and `""` are false; everything
/// else, including empty arrays and objects, is true.
pub fn coerce_boolean(node: &Node) -> bool {
    match node {
        Node::Undefined | Node::Null => false,
        Node::Bool(b) => *b,
        Node::Number(n) => *n != 0.0 && !n.is_nan(),
        Node::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// String form of a node for interpolation and joining.
///
/// Strings are used as-is; payloads contribute their content; other values
/// are rendered as JSON text. Undefined has no string form.
pub fn coerce_string(node: &Node) -> Option<String> {
    match node {
        Node::String(s) => Some(s.clone()),
        Node::Payload(payload) => Some(payload.to_node().as_str().unwrap_or_default().to_string()),
        node => to_json(node),
    }
}
