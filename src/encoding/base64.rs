use ::base64::Engine;
use ::base64::engine::general_purpose::STANDARD;

use crate::context::FormContext;
use crate::encoding::{Encoding, content};
use crate::error::TransformResult;
use crate::evaluate::coerce_string;
use crate::node::{Node, Payload};

/// Encodes text or bytes as standard, padded base64.
///
/// Payload content is encoded as-is; other values are first coerced to
/// strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Encoding;

impl Encoding for Base64Encoding {
    fn name(&self) -> &str {
        "base64"
    }

    fn encode(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        let encoded = match content(node) {
            Node::Payload(payload) => STANDARD.encode(payload.as_bytes()),
            other => match coerce_string(&other) {
                Some(text) => STANDARD.encode(text),
                None => return Ok(Node::Undefined),
            },
        };

        Ok(Payload::text(encoded)
            .with_header("Content-Type", "application/base64")
            .into())
    }
}
