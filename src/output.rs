//! JSON text serialization for template nodes.
//!
//! This module renders [`Node`] values as JSON text in either compact or
//! indented form. Object keys keep their insertion order, since encoders and
//! consumers of template output rely on it.
//!
//! # Engine-specific values
//!
//! - [`Node::Undefined`] properties are omitted from objects and print as
//!   `null` inside arrays; a top-level undefined value has no JSON form.
//! - Non-finite numbers print as `null`.
//! - [`Node::Payload`] prints as its content string.
//! - [`Node::Fragment`] prints as an array of its nodes.
//!
//! # Examples
//!
//! ```
//! use tool_form::Node;
//! use tool_form::output::{to_json, to_json_pretty};
//! use serde_json::json;
//!
//! let node = Node::from(json!({"b": 1, "a": [true, null]}));
//!
//! assert_eq!(to_json(&node).as_deref(), Some(r#"{"b":1,"a":[true,null]}"#));
//! assert_eq!(
//!     to_json_pretty(&Node::from(json!({"active": true}))).as_deref(),
//!     Some("{\n  \"active\": true\n}"),
//! );
//! ```

use crate::node::{Node, Object, format_number};

pub struct JsonPrinter {
    indent: usize,
}

impl JsonPrinter {
    /// Create a printer; an `indent` of zero produces compact output.
    pub fn new(indent: usize) -> Self {
        JsonPrinter { indent }
    }

    /// Render a node, or `None` if it has no JSON representation.
    pub fn print(&self, node: &Node) -> Option<String> {
        if node.is_undefined() {
            return None;
        }
        let mut out = String::new();
        self.print_value(node, 0, &mut out);
        Some(out)
    }

    fn print_value(&self, node: &Node, level: usize, out: &mut String) {
        match node {
            Node::Undefined | Node::Null => out.push_str("null"),
            Node::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Node::Number(n) if n.is_finite() => out.push_str(&format_number(*n)),
            Node::Number(_) => out.push_str("null"),
            Node::String(s) => self.print_string(s, out),
            Node::Array(items) | Node::Fragment(items) => self.print_array(items, level, out),
            Node::Object(entries) => self.print_object(entries, level, out),
            Node::Payload(payload) => self.print_value(&payload.to_node(), level, out),
        }
    }

    fn print_array(&self, items: &[Node], level: usize, out: &mut String) {
        if items.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            self.newline(level + 1, out);
            self.print_value(item, level + 1, out);
        }
        self.newline(level, out);
        out.push(']');
    }

    fn print_object(&self, entries: &Object, level: usize, out: &mut String) {
        let mut first = true;
        for (key, value) in entries {
            if value.is_undefined() {
                continue;
            }
            out.push(if first { '{' } else { ',' });
            first = false;
            self.newline(level + 1, out);
            self.print_string(key, out);
            out.push(':');
            if self.indent > 0 {
                out.push(' ');
            }
            self.print_value(value, level + 1, out);
        }

        if first {
            out.push_str("{}");
        } else {
            self.newline(level, out);
            out.push('}');
        }
    }

    fn newline(&self, level: usize, out: &mut String) {
        if self.indent > 0 {
            out.push('\n');
            out.push_str(&" ".repeat(self.indent * level));
        }
    }

    fn print_string(&self, s: &str, out: &mut String) {
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{08}' => out.push_str("\\b"),
                '\u{0c}' => out.push_str("\\f"),
                // Unicode escape for remaining control chars
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push('"');
    }
}

// Convenience functions

/// Converts a node to compact JSON text.
///
/// Returns `None` for [`Node::Undefined`].
pub fn to_json(node: &Node) -> Option<String> {
    JsonPrinter::new(0).print(node)
}

/// Converts a node to JSON text indented by two spaces per level.
pub fn to_json_pretty(node: &Node) -> Option<String> {
    JsonPrinter::new(2).print(node)
}
