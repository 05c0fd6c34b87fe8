//! `{{expression}}` interpolation in template strings.
//!
//! A template string is scanned left to right. `{{` opens a singular
//! expression that runs up to the first `}}`; its value is string-coerced
//! and substituted, with undefined values contributing nothing. A single `}`
//! inside an expression does not close it. `\\`, `\{` and `\}` escape
//! literal characters; any other escape is an error, as are an unclosed `{{`
//! and a `}}` outside an expression.
//!
//! # Examples
//!
//! ```
//! use tool_form::{FormContext, Node};
//! use tool_form::interpolate::interpolate;
//! use serde_json::json;
//!
//! let cx = FormContext::default();
//! let arg = Node::from(json!({"name": "world"}));
//!
//! assert_eq!(interpolate("Hello, {{name}}!", &arg, &cx).unwrap(), "Hello, world!");
//! assert_eq!(interpolate(r"\{{name\}}", &arg, &cx).unwrap(), "{{name}}");
//! assert!(interpolate("{{name", &arg, &cx).is_err());
//! ```

use std::borrow::Cow;

use crate::context::FormContext;
use crate::error::TransformResult;
use crate::evaluate::{coerce_string, evaluate_singular_expression};
use crate::node::Node;

/// Interpolate the expressions in a template string.
///
/// Strings without escapes or expressions are returned borrowed.
pub fn interpolate<'a>(input: &'a str, arg: &Node, cx: &FormContext) -> TransformResult<Cow<'a, str>> {
    let bytes = input.as_bytes();
    let limit = bytes.len();

    let mut output = String::new();
    let mut offset = 0;
    let mut start = 0;

    while offset < limit {
        match bytes[offset] {
            b'\\' => {
                output.push_str(&input[start..offset]);
                let escaped = match bytes.get(offset + 1) {
                    Some(b'\\') => '\\',
                    Some(b'{') => '{',
                    Some(b'}') => '}',
                    _ => return Err(cx.error("Invalid escape sequence in string template")),
                };
                output.push(escaped);
                offset += 2;
                start = offset;
            }
            b'{' if bytes.get(offset + 1) == Some(&b'{') => {
                output.push_str(&input[start..offset]);
                let body = offset + 2;

                let mut end = body;
                loop {
                    match input[end..].find('}') {
                        Some(index) => end += index,
                        None => return Err(cx.error(r#"Missing closing "}}" in string template"#)),
                    }
                    if bytes.get(end + 1) == Some(&b'}') {
                        break;
                    }
                    end += 1;
                }

                let value = evaluate_singular_expression(&input[body..end], arg, cx)?;
                if let Some(text) = coerce_string(&value) {
                    output.push_str(&text);
                }
                offset = end + 2;
                start = offset;
            }
            b'}' if bytes.get(offset + 1) == Some(&b'}') => {
                return Err(cx.error(r#"Unexpected "}}" in string template"#));
            }
            _ => offset += 1,
        }
    }

    if start == 0 {
        return Ok(Cow::Borrowed(input));
    }
    output.push_str(&input[start..]);
    Ok(Cow::Owned(output))
}
