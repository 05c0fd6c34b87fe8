use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{DomainDirective, parse_property, process_argument};
use crate::error::TransformResult;
use crate::evaluate::evaluate_query_expression;
use crate::node::Node;
use crate::parse::parse_object;
use crate::parser::parse_query;

/// `$spread`: splices values into the enclosing array or object.
///
/// A string argument is a query expression whose matches are spliced.
/// Any other argument is transformed and spliced as a single value, unless
/// it is undefined.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadDirective;

impl DomainDirective for SpreadDirective {
    fn name(&self) -> &str {
        "$spread"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_object(node, cx)?;
        match node.get("$spread") {
            Some(Node::String(query)) => parse_query(query).map(|_| ()).map_err(|err| {
                cx.error(format!("Invalid query expression {:?}: {}", query, err))
                    .with_source(err)
            }),
            _ => parse_property(node, "$spread", cx),
        }
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        let nodes = match node.get("$spread") {
            Some(Node::String(query)) => evaluate_query_expression(query, arg, cx)?,
            Some(argument) => {
                let value = process_argument("$spread", argument, arg, cx)?;
                if value.is_undefined() {
                    return Ok(Cow::Owned(Node::Undefined));
                }
                vec![value.into_owned()]
            }
            None => return Ok(Cow::Owned(Node::Undefined)),
        };
        Ok(Cow::Owned(Node::Fragment(nodes)))
    }
}
