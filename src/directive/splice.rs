use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::DomainDirective;
use crate::error::TransformResult;
use crate::evaluate::evaluate_singular_expression;
use crate::node::Node;

/// `$`: replaces its object with the value of a singular expression.
///
/// ```json
/// {"$": "user.name | first"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SpliceDirective;

impl SpliceDirective {
    fn expression<'n>(node: &'n Node, cx: &FormContext) -> TransformResult<&'n str> {
        node.get("$")
            .and_then(Node::as_str)
            .ok_or_else(|| cx.error("$ value must be a string"))
    }
}

impl DomainDirective for SpliceDirective {
    fn name(&self) -> &str {
        "$"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        Self::expression(node, cx).map(|_| ())
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        let expression = Self::expression(node, cx)?;
        evaluate_singular_expression(expression, arg, cx).map(Cow::Owned)
    }
}
