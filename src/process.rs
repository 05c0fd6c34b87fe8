//! The process pass.
//!
//! Processing transforms a template node against a query argument:
//!
//! - strings are interpolated;
//! - arrays and objects are processed element by element, omitting
//!   undefined results and splicing in fragments;
//! - objects with directives are dispatched to them: modifiers first, then
//!   the domain directive or plain-object processing, then each operator
//!   on the running result.
//!
//! Results borrow from the template wherever a subtree is unchanged.

use std::borrow::Cow;

use indexmap::IndexMap;
use tracing::trace;

use crate::context::FormContext;
use crate::directive::detect_directives;
use crate::error::TransformResult;
use crate::interpolate::interpolate;
use crate::node::Node;
use crate::parse::unescape_key;

/// Transform a whole template, producing an owned result.
///
/// A fragment at the root has no parent to splice into and becomes an
/// array of the values it contributes.
pub fn process_template(template: &Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Node> {
    Ok(match process_node(template, arg, cx)?.into_owned() {
        Node::Fragment(nodes) => Node::Array(spliced(nodes).collect()),
        node => node,
    })
}

/// Process a template node.
pub fn process_node<'t>(node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
    match node {
        Node::String(input) => Ok(match interpolate(input, arg, cx)? {
            Cow::Borrowed(_) => Cow::Borrowed(node),
            Cow::Owned(output) => Cow::Owned(Node::String(output)),
        }),
        Node::Array(items) => process_array(node, items, arg, cx),
        Node::Object(_) => process_directives(node, arg, cx),
        _ => Ok(Cow::Borrowed(node)),
    }
}

/// Process the elements of an array.
///
/// Fragment elements are spliced in place: arrays contribute their
/// elements, objects their values, and other values themselves.
pub fn process_array<'t>(
    node: &'t Node,
    items: &'t [Node],
    arg: &Node,
    cx: &mut FormContext,
) -> TransformResult<Cow<'t, Node>> {
    let mut result: Vec<Cow<'t, Node>> = Vec::with_capacity(items.len());
    let mut modified = false;

    for (index, item) in items.iter().enumerate() {
        let transformed = cx.nest_frame(index, |cx| process_node(item, arg, cx))?;
        if transformed.is_undefined() {
            modified = true;
            continue;
        }

        match transformed {
            Cow::Owned(Node::Fragment(nodes)) => {
                modified = true;
                splice_array(&mut result, nodes);
            }
            Cow::Borrowed(Node::Fragment(nodes)) => {
                modified = true;
                splice_array(&mut result, nodes.clone());
            }
            Cow::Owned(value) => {
                modified = true;
                result.push(Cow::Owned(value));
            }
            // Domain directives may borrow a different subtree of the template
            Cow::Borrowed(value) => {
                if !std::ptr::eq(value, item) {
                    modified = true;
                }
                result.push(Cow::Borrowed(value));
            }
        }
    }

    if !modified {
        return Ok(Cow::Borrowed(node));
    }
    Ok(Cow::Owned(Node::Array(result.into_iter().map(Cow::into_owned).collect())))
}

fn splice_array(result: &mut Vec<Cow<'_, Node>>, nodes: Vec<Node>) {
    result.extend(spliced(nodes).map(Cow::Owned));
}

/// The nodes a fragment contributes to an array.
pub(crate) fn spliced(nodes: Vec<Node>) -> impl Iterator<Item = Node> {
    nodes
        .into_iter()
        .flat_map(|node| match node {
            Node::Array(items) => items,
            Node::Object(entries) => entries.into_values().collect(),
            node => vec![node],
        })
        .filter(|node| !node.is_undefined())
}

/// Process the properties of an object, ignoring its directives.
///
/// Fragment values are spliced in place: objects contribute their entries
/// and arrays contribute entries keyed by index, with undefined values
/// deleting any existing entry of the same key.
pub fn process_object<'t>(node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
    let Node::Object(entries) = node else {
        return Ok(Cow::Borrowed(node));
    };

    let mut result: IndexMap<Cow<'t, str>, Cow<'t, Node>> = IndexMap::with_capacity(entries.len());
    let mut modified = false;

    for (key, value) in entries {
        if cx.is_directive(key) {
            modified = true;
            continue;
        }
        let unescaped = unescape_key(key);
        if unescaped.len() != key.len() {
            modified = true;
        }
        let key = unescaped;

        let transformed = cx.nest_frame(key, |cx| process_node(value, arg, cx))?;
        if transformed.is_undefined() {
            modified = true;
            continue;
        }

        match transformed {
            Cow::Owned(Node::Fragment(nodes)) => {
                modified = true;
                splice_object(&mut result, nodes);
            }
            Cow::Borrowed(Node::Fragment(nodes)) => {
                modified = true;
                splice_object(&mut result, nodes.clone());
            }
            Cow::Owned(value) => {
                modified = true;
                result.insert(Cow::Borrowed(key), Cow::Owned(value));
            }
            Cow::Borrowed(transformed) => {
                if !std::ptr::eq(transformed, value) {
                    modified = true;
                }
                result.insert(Cow::Borrowed(key), Cow::Borrowed(transformed));
            }
        }
    }

    if !modified {
        return Ok(Cow::Borrowed(node));
    }
    Ok(Cow::Owned(Node::Object(
        result
            .into_iter()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect(),
    )))
}

fn splice_object<'t>(result: &mut IndexMap<Cow<'t, str>, Cow<'t, Node>>, nodes: Vec<Node>) {
    for node in nodes {
        let entries: Vec<(String, Node)> = match node {
            Node::Object(entries) => entries.into_iter().collect(),
            Node::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
            _ => continue,
        };
        for (key, value) in entries {
            if value.is_undefined() {
                result.shift_remove(key.as_str());
            } else {
                result.insert(Cow::Owned(key), Cow::Owned(value));
            }
        }
    }
}

/// Process an object node, dispatching to its directives.
pub fn process_directives<'t>(node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
    let directives = detect_directives(node, cx)?;
    if directives.is_empty() {
        return process_object(node, arg, cx);
    }

    for modifier in &directives.modifiers {
        trace!(directive = modifier.name(), "modify");
        modifier.modify(node, arg, cx)?;
    }

    let mut result = match &directives.domain {
        Some(domain) => {
            trace!(directive = domain.name(), "transform");
            domain.transform(node, arg, cx)?
        }
        None => process_object(node, arg, cx)?,
    };

    for (operator, argument) in &directives.operators {
        trace!(directive = operator.name(), "operate");
        result = operator.operate(argument, result, arg, cx)?;
    }

    Ok(result)
}
