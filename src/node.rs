use indexmap::IndexMap;

/// Object entries, kept in insertion order.
pub type Object = IndexMap<String, Node>;

/// A JSON value processed by the template engine.
///
/// `Node` is a superset of JSON: it distinguishes [`Node::Undefined`]
/// ("produce nothing here") from [`Node::Null`], and carries two wrapper
/// kinds used while transforming templates:
///
/// - [`Node::Fragment`] marks a sequence of nodes to be spliced into the
///   enclosing array or object. It never survives as a final value.
/// - [`Node::Payload`] pairs encoded content with headers such as
///   `Content-Type`.
///
/// # Examples
///
/// ```
/// use tool_form::Node;
/// use serde_json::json;
///
/// let node = Node::from(json!({"name": "Alice", "tags": ["a", "b"]}));
/// assert_eq!(node.get("name"), Some(&Node::from("Alice")));
/// assert!(node.get("missing").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// Absence of a value; omitted from containing arrays and objects
    #[default]
    Undefined,

    /// JSON null
    Null,

    /// JSON boolean
    Bool(bool),

    /// JSON number, stored as an IEEE-754 double
    Number(f64),

    /// UTF-8 string
    String(String),

    /// Array of nodes
    Array(Vec<Node>),

    /// Object with insertion-ordered keys
    Object(Object),

    /// Splice marker produced by `$spread`
    Fragment(Vec<Node>),

    /// Encoded content with headers
    Payload(Payload),
}

/// Raw content carried by a [`Payload`].
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// Encoded output paired with its headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub value: PayloadValue,
    pub headers: IndexMap<String, String>,
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Payload {
            value: PayloadValue::Text(value.into()),
            headers: IndexMap::new(),
        }
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Payload {
            value: PayloadValue::Bytes(value.into()),
            headers: IndexMap::new(),
        }
    }

    /// Add a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type").map(String::as_str)
    }

    /// The payload content as a plain node.
    ///
    /// Text becomes a string; bytes are decoded as UTF-8, lossily.
    pub fn to_node(&self) -> Node {
        match &self.value {
            PayloadValue::Text(text) => Node::String(text.clone()),
            PayloadValue::Bytes(bytes) => Node::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.value {
            PayloadValue::Text(text) => text.as_bytes(),
            PayloadValue::Bytes(bytes) => bytes,
        }
    }
}

impl Node {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Node::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up an object property.
    ///
    /// Returns `None` for non-objects and for properties whose value is
    /// [`Node::Undefined`], so a present-but-undefined property reads the
    /// same as a missing one.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(entries) => entries.get(key).filter(|value| !value.is_undefined()),
            _ => None,
        }
    }

    /// Look up a value by JSON pointer (RFC 6901).
    ///
    /// The empty pointer refers to the node itself.
    pub fn pointer(&self, pointer: &str) -> Option<&Node> {
        if pointer.is_empty() {
            return Some(self);
        }
        let tokens = pointer.strip_prefix('/')?;

        let mut target = self;
        for token in tokens.split('/') {
            let token = token.replace("~1", "/").replace("~0", "~");
            target = match target {
                Node::Object(_) => target.get(&token)?,
                Node::Array(items) => {
                    if token.len() > 1 && token.starts_with('0') {
                        return None;
                    }
                    items.get(token.parse::<usize>().ok()?)?
                }
                _ => return None,
            };
        }
        Some(target)
    }

    /// Replace a [`Node::Payload`] with its plain content.
    pub fn unwrap_payload(self) -> Node {
        match self {
            Node::Payload(payload) => payload.to_node(),
            node => node,
        }
    }

    /// A short name for the node's kind, used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Undefined => "undefined",
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
            Node::Fragment(_) => "fragment",
            Node::Payload(_) => "payload",
        }
    }

    /// Parse JSON text into a node, preserving object key order.
    pub fn from_json_str(input: &str) -> Result<Node, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(input).map(Node::from)
    }
}

/// Format a number the way JSON text and string coercion expect.
///
/// Integral values print without a fractional part; non-finite values use
/// their conventional names.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(b),
            serde_json::Value::Number(n) => Node::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Node::String(s),
            serde_json::Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            serde_json::Value::Object(entries) => {
                Node::Object(entries.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Number(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(value as f64)
    }
}

impl From<usize> for Node {
    fn from(value: usize) -> Self {
        Node::Number(value as f64)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Array(value)
    }
}

impl From<Object> for Node {
    fn from(value: Object) -> Self {
        Node::Object(value)
    }
}

impl From<Payload> for Node {
    fn from(value: Payload) -> Self {
        Node::Payload(value)
    }
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(42.0), "42");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(13.5), "13.5");
    assert_eq!(format_number(f64::NAN), "NaN");
    assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
}
