use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::{Node, Object};
use crate::order::compare_nodes;
use crate::transform::Transform;

/// Sorts arrays by the total node order and objects by key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortTransform;

impl Transform for SortTransform {
    fn name(&self) -> &str {
        "sort"
    }

    fn transform(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(match node {
            Node::Array(mut items) => {
                items.sort_by(compare_nodes);
                Node::Array(items)
            }
            Node::Object(entries) => {
                let mut entries: Vec<(String, Node)> =
                    entries.into_iter().filter(|(_, value)| !value.is_undefined()).collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Node::Object(entries.into_iter().collect::<Object>())
            }
            _ => Node::Undefined,
        })
    }
}
