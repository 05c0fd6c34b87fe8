use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, Default)]
pub struct LastTransform;

impl Transform for LastTransform {
    fn name(&self) -> &str {
        "last"
    }

    fn transform(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(match node {
            Node::Array(mut items) => items.pop().unwrap_or_default(),
            _ => Node::Undefined,
        })
    }
}
