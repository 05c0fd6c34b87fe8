use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstTransform;

impl Transform for FirstTransform {
    fn name(&self) -> &str {
        "first"
    }

    fn transform(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(match node {
            Node::Array(items) => items.into_iter().next().unwrap_or_default(),
            _ => Node::Undefined,
        })
    }
}
