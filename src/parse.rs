//! The parse pass.
//!
//! Parsing walks a template the same way processing does, but calls each
//! directive's `parse` hook instead of transforming anything. Directives use
//! it to check their structure and to load what they will need later, such
//! as schemas referenced by `$match` and documents named by `$include`, so
//! that this work happens once per template rather than once per transform.

use tracing::debug;

use crate::context::FormContext;
use crate::directive::detect_directives;
use crate::error::TransformResult;
use crate::node::Node;

/// Parse a template node.
pub fn parse_node(node: &Node, cx: &mut FormContext) -> TransformResult<()> {
    match node {
        Node::Array(items) => parse_array(items, cx),
        Node::Object(_) => parse_directives(node, cx),
        _ => Ok(()),
    }
}

pub fn parse_array(items: &[Node], cx: &mut FormContext) -> TransformResult<()> {
    for (index, item) in items.iter().enumerate() {
        cx.nest_frame(index, |cx| parse_node(item, cx))?;
    }
    Ok(())
}

/// Parse the non-directive properties of an object.
pub fn parse_object(node: &Node, cx: &mut FormContext) -> TransformResult<()> {
    let Node::Object(entries) = node else {
        return Ok(());
    };

    for (key, value) in entries {
        if cx.is_directive(key) {
            continue;
        }
        let key = unescape_key(key);
        cx.nest_frame(key, |cx| parse_node(value, cx))?;
    }
    Ok(())
}

/// Parse an object with its directives.
pub fn parse_directives(node: &Node, cx: &mut FormContext) -> TransformResult<()> {
    let directives = detect_directives(node, cx)?;

    for modifier in &directives.modifiers {
        modifier.parse(node, cx)?;
    }

    match &directives.domain {
        Some(domain) => domain.parse(node, cx)?,
        None => parse_object(node, cx)?,
    }

    for (operator, argument) in &directives.operators {
        cx.nest_frame(operator.name(), |cx| operator.parse(argument, cx))?;
    }

    Ok(())
}

/// Parse the root of a template resource.
///
/// A resource with a base URI is parsed at most once per context;
/// re-parsing it is a no-op.
pub fn parse_template_resource(node: &Node, cx: &mut FormContext) -> TransformResult<()> {
    if let Some(uri) = cx.base_uri().cloned() {
        if !cx.resources.mark_parsed(&uri) {
            return Ok(());
        }
        debug!(%uri, "parsing template resource");
    }
    parse_node(node, cx)
}

/// Strip the escaping `$` from a `$$`-prefixed key.
pub(crate) fn unescape_key(key: &str) -> &str {
    if key.starts_with("$$") { &key[1..] } else { key }
}

/// Whether a node transforms to itself: it contains no directives,
/// no escaped keys, and no strings that interpolation would change.
pub(crate) fn is_static(node: &Node, cx: &FormContext) -> bool {
    match node {
        Node::String(s) => !s.contains('\\') && !s.contains("{{") && !s.contains("}}"),
        Node::Array(items) => items.iter().all(|item| is_static(item, cx)),
        Node::Object(entries) => entries
            .iter()
            .all(|(key, value)| !cx.is_directive(key) && !key.starts_with("$$") && is_static(value, cx)),
        _ => true,
    }
}
