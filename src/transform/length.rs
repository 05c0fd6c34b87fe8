use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;
use crate::transform::Transform;

/// Length of a string in code points, of an array, or of an object's keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthTransform;

impl Transform for LengthTransform {
    fn name(&self) -> &str {
        "length"
    }

    fn transform(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(match node {
            Node::String(s) => Node::from(s.chars().count()),
            Node::Array(items) => Node::from(items.len()),
            Node::Object(entries) => Node::from(entries.values().filter(|value| !value.is_undefined()).count()),
            _ => Node::Undefined,
        })
    }
}
