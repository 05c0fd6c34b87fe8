use std::borrow::Cow;

use super::matches::{parse_schema, validate_schema};
use crate::context::FormContext;
use crate::directive::{OperatorDirective, process_argument};
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::parse_node;
use crate::process::process_node;

/// `$match`: selects the first branch whose `$case` schema the result
/// satisfies.
///
/// The chosen branch produces its transformed `$then`, or, without one,
/// the branch itself minus `$case`. A branch without `$case` always
/// matches. When no branch matches the result is undefined.
///
/// ```json
/// {
///   "$": "payment",
///   "$match": [
///     {"$case": {"required": ["iban"]}, "$then": "bank transfer"},
///     {"$then": "card"}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchDirective;

impl OperatorDirective for MatchDirective {
    fn name(&self) -> &str {
        "$match"
    }

    fn parse(&self, argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        let Node::Array(branches) = argument else {
            return parse_node(argument, cx);
        };
        for (index, branch) in branches.iter().enumerate() {
            cx.nest_frame(index, |cx| match branch.get("$case") {
                Some(schema) => {
                    cx.nest_frame("$case", |cx| parse_schema(schema, cx))?;
                    parse_branch(branch, cx)
                }
                None => parse_node(branch, cx),
            })?;
        }
        Ok(())
    }

    fn operate<'t>(
        &self,
        argument: &'t Node,
        node: Cow<'t, Node>,
        arg: &Node,
        cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        let Node::Array(branches) = argument else {
            return Ok(Cow::Owned(Node::Undefined));
        };

        for (index, branch) in branches.iter().enumerate() {
            if let Some(result) = cx.nest_frame(index, |cx| match_branch(branch, &node, arg, cx))? {
                return Ok(result);
            }
        }
        Ok(Cow::Owned(Node::Undefined))
    }
}

/// Parse the properties of a branch other than its `$case`.
fn parse_branch(branch: &Node, cx: &mut FormContext) -> TransformResult<()> {
    match branch.get("$then") {
        Some(then) => cx.nest_frame("$then", |cx| parse_node(then, cx)),
        None => parse_node(&without_case(branch), cx),
    }
}

/// Transform a branch if it matches `node`.
fn match_branch<'t>(
    branch: &'t Node,
    node: &Node,
    arg: &Node,
    cx: &mut FormContext,
) -> TransformResult<Option<Cow<'t, Node>>> {
    if let Some(schema) = branch.get("$case") {
        let valid = cx.nest_frame("$case", |cx| {
            let schema = process_node(schema, arg, cx)?;
            validate_schema(&schema, node, cx)
        })?;
        if !valid {
            return Ok(None);
        }
        return match branch.get("$then") {
            Some(then) => process_argument("$then", then, arg, cx).map(Some),
            None => process_node(&without_case(branch), arg, cx).map(|result| Some(Cow::Owned(result.into_owned()))),
        };
    }

    match branch.get("$then") {
        Some(then) => process_argument("$then", then, arg, cx).map(Some),
        None => process_node(branch, arg, cx).map(Some),
    }
}

fn without_case(branch: &Node) -> Node {
    match branch {
        Node::Object(entries) => Node::Object(
            entries
                .iter()
                .filter(|(key, _)| key.as_str() != "$case")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
