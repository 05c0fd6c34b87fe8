//! RFC 6570 URI Template expansion (level 4).
//!
//! # Examples
//!
//! ```
//! use tool_form::Node;
//! use tool_form::uri_template::UriTemplate;
//!
//! let template = UriTemplate::parse("https://example.com/users/{id}{?fields*}").unwrap();
//! let uri = template
//!     .expand(|name| -> Result<Node, std::convert::Infallible> {
//!         Ok(match name {
//!             "id" => Node::from(42i64),
//!             "fields" => Node::from(vec![Node::from("name"), Node::from("email")]),
//!             _ => Node::Undefined,
//!         })
//!     })
//!     .unwrap();
//! assert_eq!(uri, "https://example.com/users/42?fields=name&fields=email");
//! ```

use thiserror::Error;

use crate::node::{Node, format_number};
use crate::output::to_json;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UriTemplateError {
    #[error("Unclosed expression in URI template at position {0}")]
    Unclosed(usize),

    #[error("Unexpected '}}' in URI template at position {0}")]
    UnexpectedClose(usize),

    #[error("Invalid variable specification {0:?} in URI template")]
    InvalidVarSpec(String),

    #[error("Unsupported operator {0:?} in URI template")]
    ReservedOperator(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Result<Option<Operator>, UriTemplateError> {
        match c {
            '+' => Ok(Some(Operator::Reserved)),
            '#' => Ok(Some(Operator::Fragment)),
            '.' => Ok(Some(Operator::Label)),
            '/' => Ok(Some(Operator::Path)),
            ';' => Ok(Some(Operator::PathParam)),
            '?' => Ok(Some(Operator::Query)),
            '&' => Ok(Some(Operator::QueryContinuation)),
            '=' | ',' | '!' | '@' | '|' => Err(UriTemplateError::ReservedOperator(c)),
            _ => Ok(None),
        }
    }

    fn first(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query => "?",
            Operator::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParam => ";",
            Operator::Query | Operator::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(self, Operator::PathParam | Operator::Query | Operator::QueryContinuation)
    }

    /// Suffix for named variables with empty values.
    fn if_empty(self) -> &'static str {
        match self {
            Operator::Query | Operator::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Operator::Reserved | Operator::Fragment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    None,
    Prefix(usize),
    Explode,
}

#[derive(Debug, Clone, PartialEq)]
struct VarSpec {
    name: String,
    modifier: Modifier,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Expression { operator: Operator, vars: Vec<VarSpec> },
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    parts: Vec<Part>,
}

impl UriTemplate {
    pub fn parse(input: &str) -> Result<Self, UriTemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = input.char_indices();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(encode(&literal, true)));
                        literal.clear();
                    }
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(UriTemplateError::Unclosed(position));
                    }
                    parts.push(parse_expression(&body)?);
                }
                '}' => return Err(UriTemplateError::UnexpectedClose(position)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(encode(&literal, true)));
        }

        Ok(UriTemplate { parts })
    }

    /// Expand the template, looking up each variable by name.
    ///
    /// Undefined and null values, empty lists, and empty objects are
    /// treated as undefined and omitted from the expansion.
    pub fn expand<E>(&self, mut lookup: impl FnMut(&str) -> Result<Node, E>) -> Result<String, E> {
        let mut out = String::new();

        for part in &self.parts {
            match part {
                Part::Literal(literal) => out.push_str(literal),
                Part::Expression { operator, vars } => {
                    let mut first = true;
                    for var in vars {
                        let value = lookup(&var.name)?;
                        if let Some(expansion) = expand_var(*operator, var, &value) {
                            out.push_str(if first { operator.first() } else { operator.separator() });
                            out.push_str(&expansion);
                            first = false;
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

fn parse_expression(body: &str) -> Result<Part, UriTemplateError> {
    let mut rest = body;
    let operator = match rest.chars().next() {
        Some(c) => match Operator::from_char(c)? {
            Some(operator) => {
                rest = &rest[c.len_utf8()..];
                operator
            }
            None => Operator::Simple,
        },
        None => return Err(UriTemplateError::InvalidVarSpec(String::new())),
    };

    let vars = rest
        .split(',')
        .map(parse_varspec)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Part::Expression { operator, vars })
}

fn parse_varspec(spec: &str) -> Result<VarSpec, UriTemplateError> {
    let invalid = || UriTemplateError::InvalidVarSpec(spec.to_string());

    let (name, modifier) = if let Some(name) = spec.strip_suffix('*') {
        (name, Modifier::Explode)
    } else if let Some((name, length)) = spec.split_once(':') {
        let length: usize = length.parse().map_err(|_| invalid())?;
        if !(1..10000).contains(&length) {
            return Err(invalid());
        }
        (name, Modifier::Prefix(length))
    } else {
        (spec, Modifier::None)
    };

    let valid_name = !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !name.contains("..")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '%');
    if !valid_name {
        return Err(invalid());
    }

    Ok(VarSpec {
        name: name.to_string(),
        modifier,
    })
}

/// String form of a scalar value, or `None` for composite and undefined values.
fn scalar_string(node: &Node) -> Option<String> {
    match node {
        Node::String(s) => Some(s.clone()),
        Node::Number(n) => Some(format_number(*n)),
        Node::Bool(b) => Some(b.to_string()),
        Node::Payload(payload) => payload.to_node().as_str().map(str::to_string),
        _ => None,
    }
}

/// String form of a list item or member value.
fn item_string(node: &Node) -> Option<String> {
    match node {
        Node::Undefined | Node::Null => None,
        Node::Array(_) | Node::Object(_) => to_json(node),
        _ => scalar_string(node),
    }
}

fn expand_var(operator: Operator, var: &VarSpec, value: &Node) -> Option<String> {
    let allow_reserved = operator.allow_reserved();
    let mut out = String::new();

    match value {
        Node::Undefined | Node::Null | Node::Fragment(_) => return None,
        Node::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(item_string).collect();
            if items.is_empty() {
                return None;
            }
            if var.modifier == Modifier::Explode {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| named_value(operator, &var.name, item, allow_reserved))
                    .collect();
                out.push_str(&parts.join(operator.separator()));
            } else {
                if operator.named() {
                    out.push_str(&encode(&var.name, true));
                    out.push('=');
                }
                let parts: Vec<String> = items.iter().map(|item| encode(item, allow_reserved)).collect();
                out.push_str(&parts.join(","));
            }
        }
        Node::Object(entries) => {
            let pairs: Vec<(&String, String)> = entries
                .iter()
                .filter_map(|(key, value)| item_string(value).map(|value| (key, value)))
                .collect();
            if pairs.is_empty() {
                return None;
            }
            if var.modifier == Modifier::Explode {
                let parts: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| {
                        let value = encode(value, allow_reserved);
                        if operator.named() && value.is_empty() {
                            format!("{}{}", encode(key, allow_reserved), operator.if_empty())
                        } else {
                            format!("{}={}", encode(key, allow_reserved), value)
                        }
                    })
                    .collect();
                out.push_str(&parts.join(operator.separator()));
            } else {
                if operator.named() {
                    out.push_str(&encode(&var.name, true));
                    out.push('=');
                }
                let parts: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{},{}", encode(key, allow_reserved), encode(value, allow_reserved)))
                    .collect();
                out.push_str(&parts.join(","));
            }
        }
        scalar => {
            let mut value = scalar_string(scalar)?;
            if let Modifier::Prefix(length) = var.modifier {
                value = value.chars().take(length).collect();
            }
            out.push_str(&named_value(operator, &var.name, &value, allow_reserved));
        }
    }

    Some(out)
}

fn named_value(operator: Operator, name: &str, value: &str, allow_reserved: bool) -> String {
    if !operator.named() {
        return encode(value, allow_reserved);
    }
    if value.is_empty() {
        format!("{}{}", encode(name, true), operator.if_empty())
    } else {
        format!("{}={}", encode(name, true), encode(value, allow_reserved))
    }
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn is_reserved(c: char) -> bool {
    matches!(
        c,
        ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
    )
}

/// Percent-encode a string, keeping reserved characters and existing
/// percent-encoded triplets when `allow_reserved` is set.
fn encode(input: &str, allow_reserved: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();

    for (i, c) in input.char_indices() {
        if is_unreserved(c) || (allow_reserved && is_reserved(c)) {
            out.push(c);
        } else if allow_reserved
            && c == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::convert::Infallible;

    fn expand(template: &str) -> String {
        let vars = Node::from(json!({
            "var": "value",
            "hello": "Hello World!",
            "path": "/foo/bar",
            "empty": "",
            "list": ["red", "green", "blue"],
            "keys": {"semi": ";", "dot": ".", "comma": ","},
            "x": 1024,
            "y": 768
        }));
        UriTemplate::parse(template)
            .unwrap()
            .expand(|name| -> Result<Node, Infallible> { Ok(vars.get(name).cloned().unwrap_or_default()) })
            .unwrap()
    }

    #[test]
    fn test_simple_expansion() {
        assert_eq!(expand("{var}"), "value");
        assert_eq!(expand("{hello}"), "Hello%20World%21");
        assert_eq!(expand("{x,y}"), "1024,768");
        assert_eq!(expand("{var:3}"), "val");
        assert_eq!(expand("{undef}"), "");
    }

    #[test]
    fn test_reserved_expansion() {
        assert_eq!(expand("{+path}/here"), "/foo/bar/here");
        assert_eq!(expand("{+hello}"), "Hello%20World!");
        assert_eq!(expand("{#var}"), "#value");
    }

    #[test]
    fn test_operator_expansion() {
        assert_eq!(expand("X{.var}"), "X.value");
        assert_eq!(expand("{/var,x}/here"), "/value/1024/here");
        assert_eq!(expand("{;x,y,empty}"), ";x=1024;y=768;empty");
        assert_eq!(expand("{?x,y,empty}"), "?x=1024&y=768&empty=");
        assert_eq!(expand("?fixed=yes{&x}"), "?fixed=yes&x=1024");
    }

    #[test]
    fn test_composite_expansion() {
        assert_eq!(expand("{list}"), "red,green,blue");
        assert_eq!(expand("{list*}"), "red,green,blue");
        assert_eq!(expand("{/list*}"), "/red/green/blue");
        assert_eq!(expand("{?list*}"), "?list=red&list=green&list=blue");
        assert_eq!(expand("{keys}"), "semi,%3B,dot,.,comma,%2C");
        assert_eq!(expand("{?keys*}"), "?semi=%3B&dot=.&comma=%2C");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(UriTemplate::parse("{var"), Err(UriTemplateError::Unclosed(0)));
        assert!(matches!(UriTemplate::parse("{=var}"), Err(UriTemplateError::ReservedOperator('='))));
        assert!(UriTemplate::parse("{va r}").is_err());
    }
}
