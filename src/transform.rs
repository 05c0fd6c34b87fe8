//! Value transforms applied by `$transform` and by `| name` pipes in
//! singular expressions.

mod first;
mod last;
mod length;
mod sort;

pub use first::FirstTransform;
pub use last::LastTransform;
pub use length::LengthTransform;
pub use sort::SortTransform;

use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;

/// A pure function from one node to another.
///
/// Transforms return [`Node::Undefined`] for inputs they do not apply to.
pub trait Transform: Send + Sync {
    /// The name used to refer to this transform.
    fn name(&self) -> &str;

    fn transform(&self, node: Node, cx: &FormContext) -> TransformResult<Node>;
}
