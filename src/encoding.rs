//! Output encodings applied by `$encode`.
//!
//! An encoding turns a transformed node into its wire form: usually a
//! [`Payload`](crate::node::Payload) carrying serialized content and a
//! `Content-Type` header, or for `args`, an array of strings. Encodings read
//! their options from `$`-prefixed properties of the node they encode, such
//! as `$content` (the value to encode, defaulting to the node itself).

mod args;
mod base64;
mod json;
mod multipart;
mod urlencoded;

pub use self::args::ArgsEncoding;
pub use self::base64::Base64Encoding;
pub use self::json::JsonEncoding;
pub use self::multipart::MultipartEncoding;
pub use self::urlencoded::{UrlencodedEncoding, urlencode};

use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;

pub trait Encoding: Send + Sync {
    /// The name used to refer to this encoding.
    fn name(&self) -> &str;

    /// Encode a node. Returns [`Node::Undefined`] when there is nothing to
    /// encode.
    fn encode(&self, node: Node, cx: &FormContext) -> TransformResult<Node>;
}

/// Take the `$content` property of an object node, or the node itself.
pub(crate) fn content(node: Node) -> Node {
    match node {
        Node::Object(mut entries) => match entries.shift_remove("$content") {
            Some(content) if !content.is_undefined() => content,
            _ => Node::Object(entries),
        },
        node => node,
    }
}
