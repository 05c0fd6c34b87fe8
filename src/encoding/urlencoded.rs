use url::form_urlencoded::byte_serialize;

use crate::context::FormContext;
use crate::encoding::{Encoding, content};
use crate::error::TransformResult;
use crate::node::{Node, Payload, format_number};

/// Encodes nodes as `application/x-www-form-urlencoded` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlencodedEncoding;

impl Encoding for UrlencodedEncoding {
    fn name(&self) -> &str {
        "urlencoded"
    }

    fn encode(&self, node: Node, _cx: &FormContext) -> TransformResult<Node> {
        Ok(Payload::text(urlencode(&content(node)))
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .into())
    }
}

/// Form-encode a node.
///
/// Nested arrays and objects are flattened into dotted key paths
/// (`user.tags.0=a`); null and undefined values are skipped.
///
/// # Examples
///
/// ```
/// use tool_form::Node;
/// use tool_form::encoding::urlencode;
/// use serde_json::json;
///
/// let node = Node::from(json!({"user": {"name": "Ada Lovelace", "tags": ["a", "b"]}}));
/// assert_eq!(urlencode(&node), "user.name=Ada+Lovelace&user.tags.0=a&user.tags.1=b");
/// ```
pub fn urlencode(node: &Node) -> String {
    let mut output = String::new();
    write_urlencoded(node, None, &mut output);
    output
}

fn write_urlencoded(node: &Node, prefix: Option<&str>, output: &mut String) {
    match node {
        Node::Undefined | Node::Null => {}
        Node::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                write_entry(item, prefix, &index.to_string(), output);
            }
        }
        Node::Object(entries) => {
            for (key, value) in entries {
                write_entry(value, prefix, &form_encode(key), output);
            }
        }
        Node::Payload(payload) => write_urlencoded(&payload.to_node(), prefix, output),
        Node::Fragment(items) => write_urlencoded(&Node::Array(items.clone()), prefix, output),
        scalar => {
            if let Some(prefix) = prefix {
                output.push_str(prefix);
                output.push('=');
            }
            let text = match scalar {
                Node::Bool(b) => b.to_string(),
                Node::Number(n) => format_number(*n),
                Node::String(s) => s.clone(),
                _ => String::new(),
            };
            output.push_str(&form_encode(&text));
        }
    }
}

fn write_entry(value: &Node, prefix: Option<&str>, key: &str, output: &mut String) {
    if matches!(value, Node::Undefined | Node::Null) {
        return;
    }
    let path = match prefix {
        Some(prefix) => format!("{}.{}", prefix, key),
        None => key.to_string(),
    };

    let mut entry = String::new();
    write_urlencoded(value, Some(&path), &mut entry);
    if !output.is_empty() && !entry.is_empty() {
        output.push('&');
    }
    output.push_str(&entry);
}

fn form_encode(input: &str) -> String {
    byte_serialize(input.as_bytes()).collect()
}
