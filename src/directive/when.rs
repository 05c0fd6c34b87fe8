use std::borrow::Cow;

use super::if_::{evaluate_condition, parse_condition};
use crate::context::FormContext;
use crate::directive::DomainDirective;
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::parse_object;
use crate::process::process_object;

/// `$when`: keeps its object only when a condition holds.
///
/// ```json
/// {"$when": "$.phone", "type": "phone", "number": "{{phone}}"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WhenDirective;

impl DomainDirective for WhenDirective {
    fn name(&self) -> &str {
        "$when"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_condition(node, "$when", cx)?;
        parse_object(node, cx)
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        if evaluate_condition(node, "$when", arg, cx)? {
            process_object(node, arg, cx)
        } else {
            Ok(Cow::Owned(Node::Undefined))
        }
    }
}
