use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::context::FormContext;
use crate::encoding::Encoding;
use crate::error::TransformResult;
use crate::evaluate::coerce_string;
use crate::node::{Node, Object, Payload, PayloadValue};
use crate::output::JsonPrinter;

/// Properties of a multipart object that configure the message.
const MULTIPART_PROPERTIES: [&str; 2] = ["$headers", "$subtype"];

/// Properties of a part object that configure the part.
const PART_PROPERTIES: [&str; 5] = ["$content", "$contentType", "$disposition", "$filename", "$headers"];

type BoundaryGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Encodes an object as a MIME multipart message (RFC 2046).
///
/// Each property other than `$headers` and `$subtype` becomes a part named
/// after its key. A part object may set `$content`, `$contentType`,
/// `$disposition`, `$filename` and `$headers`; otherwise the value itself
/// is the content. Strings, numbers and booleans are sent as plain text,
/// objects and arrays as JSON, and payloads as their raw content.
///
/// `$subtype` selects the multipart subtype, `form-data` by default.
/// `Content-Type` and `Content-Disposition` headers are always computed
/// and cannot be set through `$headers`.
///
/// # Examples
///
/// ```
/// use tool_form::{Node, Template, TemplateOptions};
/// use tool_form::encoding::MultipartEncoding;
/// use serde_json::json;
///
/// let options = TemplateOptions::new()
///     .with_encoding(MultipartEncoding::with_boundary_generator(|| "b".to_string()));
/// let mut template = Template::parse_with(
///     Node::from(json!({"$encode": "multipart", "name": "{{name}}"})),
///     options,
/// ).unwrap();
///
/// let output = template.transform_node(&Node::from(json!({"name": "Ada"}))).unwrap();
/// let Node::Payload(payload) = output else { panic!("expected a payload") };
/// assert_eq!(payload.content_type(), Some("multipart/form-data; boundary=b"));
/// assert_eq!(
///     payload.as_bytes(),
///     b"--b\r\nContent-Type: text/plain; charset=utf-8\r\n\
///       Content-Disposition: form-data; name=\"name\"\r\n\r\nAda\r\n--b--\r\n"
/// );
/// ```
#[derive(Clone)]
pub struct MultipartEncoding {
    boundary: BoundaryGenerator,
}

impl MultipartEncoding {
    pub fn new() -> Self {
        MultipartEncoding {
            boundary: Arc::new(|| Uuid::new_v4().simple().to_string()),
        }
    }

    /// Use `generate` to create each message's boundary, without dashes.
    pub fn with_boundary_generator(generate: impl Fn() -> String + Send + Sync + 'static) -> Self {
        MultipartEncoding {
            boundary: Arc::new(generate),
        }
    }
}

impl Default for MultipartEncoding {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MultipartEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartEncoding").finish_non_exhaustive()
    }
}

impl Encoding for MultipartEncoding {
    fn name(&self) -> &str {
        "multipart"
    }

    fn encode(&self, node: Node, cx: &FormContext) -> TransformResult<Node> {
        let Node::Object(entries) = node else {
            return Ok(Node::Undefined);
        };

        let boundary = (self.boundary)();
        let mut body = Vec::new();
        for (name, value) in &entries {
            if MULTIPART_PROPERTIES.contains(&name.as_str()) || matches!(value, Node::Undefined | Node::Null) {
                continue;
            }
            write_part(name, value, &boundary, cx, &mut body)?;
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let subtype = match entries.get("$subtype") {
            Some(Node::String(subtype)) => subtype.as_str(),
            _ => "form-data",
        };
        let mut headers = explicit_headers(&entries);
        headers.insert(
            "Content-Type".to_string(),
            format!("multipart/{}; boundary={}", subtype, boundary),
        );

        Ok(Node::Payload(Payload {
            value: PayloadValue::Bytes(body),
            headers,
        }))
    }
}

fn write_part(name: &str, node: &Node, boundary: &str, cx: &FormContext, out: &mut Vec<u8>) -> TransformResult<()> {
    let (content, headers) = encode_content(name, node);

    out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    for (header, value) in &headers {
        if value.chars().any(|c| c != '\t' && c.is_ascii_control()) {
            return Err(cx.error(format!("Invalid character in header value: {:?}", value)));
        }
        out.extend_from_slice(format!("{}: {}\r\n", header, value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&content);

    // Nested multipart content already ends with its closing delimiter line
    let nested = headers
        .get("Content-Type")
        .is_some_and(|content_type| content_type.starts_with("multipart/"));
    if !nested {
        out.extend_from_slice(b"\r\n");
    }
    Ok(())
}

/// The body and headers of one part.
fn encode_content(name: &str, node: &Node) -> (Vec<u8>, IndexMap<String, String>) {
    let part = node.as_object();
    let mut content_type = match part.and_then(|entries| entries.get("$contentType")) {
        Some(Node::String(content_type)) => Some(content_type.clone()),
        _ => None,
    };
    let content = match part.and_then(|entries| entries.get("$content")) {
        Some(content) if !content.is_undefined() => content,
        _ => node,
    };

    let mut headers = IndexMap::new();
    let (body, default_type) = match content {
        Node::Undefined | Node::Null => (Vec::new(), "application/octet-stream"),
        Node::Payload(payload) => {
            for (header, value) in &payload.headers {
                if content_type.is_none() && header == "Content-Type" {
                    content_type = Some(value.clone());
                }
                headers.insert(header.clone(), value.clone());
            }
            match &payload.value {
                PayloadValue::Text(text) => (text.as_bytes().to_vec(), "text/plain; charset=utf-8"),
                PayloadValue::Bytes(bytes) => (bytes.clone(), "application/octet-stream"),
            }
        }
        Node::Object(entries) => {
            let data: Object = entries
                .iter()
                .filter(|(key, _)| !PART_PROPERTIES.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            (json_bytes(&Node::Object(data)), "application/json")
        }
        Node::Array(_) | Node::Fragment(_) => (json_bytes(content), "application/json"),
        scalar => (
            coerce_string(scalar).unwrap_or_default().into_bytes(),
            "text/plain; charset=utf-8",
        ),
    };

    if let Some(part) = part {
        headers.extend(explicit_headers(part));
    }
    headers.insert(
        "Content-Type".to_string(),
        content_type.unwrap_or_else(|| default_type.to_string()),
    );
    headers.insert("Content-Disposition".to_string(), content_disposition(name, part));

    (body, headers)
}

fn json_bytes(node: &Node) -> Vec<u8> {
    JsonPrinter::new(0).print(node).unwrap_or_default().into_bytes()
}

/// String-valued `$headers`, excluding the headers the encoding computes.
fn explicit_headers(entries: &Object) -> IndexMap<String, String> {
    let Some(Node::Object(headers)) = entries.get("$headers") else {
        return IndexMap::new();
    };
    headers
        .iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case("content-type") && !name.eq_ignore_ascii_case("content-disposition")
        })
        .filter_map(|(name, value)| value.as_str().map(|value| (name.clone(), value.to_string())))
        .collect()
}

fn content_disposition(name: &str, part: Option<&Object>) -> String {
    let property = |key: &str| part.and_then(|entries| entries.get(key)).and_then(Node::as_str);

    let mut disposition = property("$disposition").unwrap_or("form-data").to_string();
    disposition.push_str(&format!("; name=\"{}\"", quote(name)));
    if let Some(filename) = property("$filename") {
        disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
    }
    disposition
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
