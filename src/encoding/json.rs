use crate::context::FormContext;
use crate::encoding::{Encoding, content};
use crate::error::TransformResult;
use crate::node::{Node, Payload};
use crate::output::JsonPrinter;

/// Serializes nodes as JSON text.
///
/// An object's `$indent` property selects pretty printing: `true` indents by
/// two spaces, an integer from 0 to 8 by that many.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoding;

impl Encoding for JsonEncoding {
    fn name(&self) -> &str {
        "json"
    }

    fn encode(&self, mut node: Node, _cx: &FormContext) -> TransformResult<Node> {
        let mut indent = 0;
        if let Node::Object(entries) = &mut node
            && let Some(value) = entries.shift_remove("$indent")
        {
            indent = match value {
                Node::Bool(true) => 2,
                Node::Number(n) if (0.0..=8.0).contains(&n) => n as usize,
                _ => 0,
            };
        }

        Ok(match JsonPrinter::new(indent).print(&content(node)) {
            Some(text) => Payload::text(text)
                .with_header("Content-Type", "application/json")
                .into(),
            None => Node::Undefined,
        })
    }
}
