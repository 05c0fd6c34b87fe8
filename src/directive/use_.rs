use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{DomainDirective, parse_property, process_property};
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::parse_object;

/// `$use`: replaces its object with the transformed argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseDirective;

impl DomainDirective for UseDirective {
    fn name(&self) -> &str {
        "$use"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_object(node, cx)?;
        parse_property(node, "$use", cx)
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        process_property(node, "$use", arg, cx)
    }
}
