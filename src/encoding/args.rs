use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::FormContext;
use crate::encoding::Encoding;
use crate::error::TransformResult;
use crate::node::{Node, Object, format_number};

static FLAG_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+][-A-Za-z0-9][-A-Za-z0-9_]*=?$").unwrap());
static COMMAND_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][-A-Za-z0-9_]*$").unwrap());
static ARGUMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][-A-Za-z0-9._]*$").unwrap());

/// Encodes nodes as a command line argument vector.
///
/// The result is an array of strings:
///
/// - `null`, `false` and undefined contribute nothing; `true`, numbers and
///   strings contribute themselves; arrays are flattened.
/// - Object keys starting with `-` or `+` are flags. A single-character flag
///   set to `true` is emitted alone; a flag ending in `=` is joined with its
///   comma-separated values (`--define=A,B`); any other flag is followed by
///   its values.
/// - Other object keys are subcommands or positional names, followed by
///   their values.
/// - `$args` holds positional arguments, which must be plain words.
/// - A `$flags` object combines single-character flags (`-abv`), and a
///   `$repeat` object repeats `=` flags once per value.
///
/// # Examples
///
/// ```
/// use tool_form::{Node, Template};
/// use serde_json::json;
///
/// let mut template = Template::parse(Node::from(json!({
///     "$encode": "args",
///     "git": {"commit": {"-m": "{{message}}", "--amend": true}}
/// }))).unwrap();
///
/// let output = template.transform(&Node::from(json!({"message": "Fix it"}))).unwrap();
/// assert_eq!(output, Node::from(json!(["git", "commit", "-m", "Fix it", "--amend"])));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgsEncoding;

impl Encoding for ArgsEncoding {
    fn name(&self) -> &str {
        "args"
    }

    fn encode(&self, node: Node, cx: &FormContext) -> TransformResult<Node> {
        let mut args = Vec::new();
        push_args(&node, cx, &mut args)?;
        Ok(Node::Array(args.into_iter().map(Node::String).collect()))
    }
}

fn push_args(node: &Node, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    match node {
        Node::Undefined | Node::Null | Node::Bool(false) => {}
        Node::Bool(true) => args.push("true".to_string()),
        Node::Number(n) => args.push(format_number(*n)),
        Node::String(s) => args.push(s.clone()),
        Node::Array(items) | Node::Fragment(items) => {
            for item in items {
                push_args(item, cx, args)?;
            }
        }
        Node::Object(entries) => push_object(entries, cx, args)?,
        Node::Payload(payload) => push_args(&payload.to_node(), cx, args)?,
    }
    Ok(())
}

/// Collect the arguments a node contributes.
fn collect_args(node: &Node, cx: &FormContext) -> TransformResult<Vec<String>> {
    let mut args = Vec::new();
    push_args(node, cx, &mut args)?;
    Ok(args)
}

fn push_object(entries: &Object, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    match (entries.get("$flags"), entries.get("$repeat")) {
        (Some(_), Some(_)) => Err(cx.error("Ambiguous args directive")),
        (Some(flags), None) => push_flags(flags, entries.get("$args"), cx, args),
        (None, Some(repeat)) => push_repeat(repeat, entries.get("$args"), cx, args),
        (None, None) => push_plain(entries, cx, args),
    }
}

fn push_plain(entries: &Object, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    for (key, value) in entries {
        if value.is_undefined() {
            continue;
        }

        if key == "$args" {
            for arg in collect_args(value, cx)? {
                if !ARGUMENT.is_match(&arg) {
                    return Err(cx.error(format!("Invalid argument: {:?}", arg)));
                }
                args.push(arg);
            }
        } else if is_flag(key) {
            check_flag_name(key, cx)?;
            if is_shorthand(key, value) {
                args.push(key.clone());
            } else {
                push_flag(key, value, cx, args)?;
            }
        } else {
            check_command_name(key, cx)?;
            args.push(key.clone());
            push_args(value, cx, args)?;
        }
    }
    Ok(())
}

fn push_flags(flags: &Node, rest: Option<&Node>, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    let Node::Object(flags) = flags else {
        return Ok(());
    };

    let start = args.len();
    let mut shorthand = String::new();
    for (key, value) in flags {
        if value.is_undefined() {
            continue;
        }

        if is_flag(key) {
            check_flag_name(key, cx)?;
            if is_shorthand(key, value) {
                shorthand.push_str(&key[1..]);
            } else {
                push_flag(key, value, cx, args)?;
            }
        } else {
            check_command_name(key, cx)?;
            args.push(key.clone());
            push_args(value, cx, args)?;
        }
    }

    if !shorthand.is_empty() {
        args.insert(start, format!("-{}", shorthand));
    }
    if let Some(rest) = rest {
        push_args(rest, cx, args)?;
    }
    Ok(())
}

fn push_repeat(repeat: &Node, rest: Option<&Node>, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    let Node::Object(repeat) = repeat else {
        return Ok(());
    };

    for (key, value) in repeat {
        if value.is_undefined() {
            continue;
        }
        check_flag_name(key, cx)?;

        match value {
            _ if is_shorthand(key, value) => args.push(key.clone()),
            Node::Array(items) if key.ends_with('=') => {
                for item in items {
                    let values = collect_args(item, cx)?;
                    if !values.is_empty() {
                        args.push(format!("{}{}", key, join_flag_values(&values)));
                    }
                }
            }
            _ => push_flag(key, value, cx, args)?,
        }
    }

    if let Some(rest) = rest {
        push_args(rest, cx, args)?;
    }
    Ok(())
}

/// Push a flag and its values.
fn push_flag(key: &str, value: &Node, cx: &FormContext, args: &mut Vec<String>) -> TransformResult<()> {
    if key.ends_with('=') {
        let values = collect_args(value, cx)?;
        if !values.is_empty() {
            args.push(format!("{}{}", key, join_flag_values(&values)));
        }
        return Ok(());
    }

    args.push(key.to_string());
    if !matches!(value, Node::Bool(true)) {
        push_args(value, cx, args)?;
    }
    Ok(())
}

fn is_flag(key: &str) -> bool {
    key.starts_with('-') || key.starts_with('+')
}

/// A single-character flag set to `true`, such as `-f`.
fn is_shorthand(key: &str, value: &Node) -> bool {
    key.len() == 2 && !key.ends_with('-') && matches!(value, Node::Bool(true))
}

fn check_flag_name(key: &str, cx: &FormContext) -> TransformResult<()> {
    if FLAG_NAME.is_match(key) {
        Ok(())
    } else {
        Err(cx.error(format!("Invalid flag name: {:?}", key)))
    }
}

fn check_command_name(key: &str, cx: &FormContext) -> TransformResult<()> {
    if COMMAND_NAME.is_match(key) {
        Ok(())
    } else {
        Err(cx.error(format!("Invalid subcommand/argument name: {:?}", key)))
    }
}

fn join_flag_values(values: &[String]) -> String {
    values
        .iter()
        .map(|value| {
            let mut escaped = String::with_capacity(value.len());
            for c in value.chars() {
                if matches!(c, '\\' | ',' | '"') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped
        })
        .collect::<Vec<_>>()
        .join(",")
}
