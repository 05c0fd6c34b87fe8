//! A strict total order over nodes.
//!
//! Values are ordered first by kind:
//!
//! ```text
//! undefined < null < boolean < number < string < array < object < payload < fragment
//! ```
//!
//! then within a kind:
//!
//! - booleans: `false < true`
//! - numbers: IEEE-754 total order, `-Infinity < ... < -0 < +0 < ... < +Infinity < NaN`,
//!   with every NaN equal to every other NaN
//! - strings: by Unicode code point
//! - arrays: element by element, then shorter first
//! - objects: by key/value pairs in sorted key order, then fewer keys first
//!
//! # Examples
//!
//! ```
//! use std::cmp::Ordering;
//! use tool_form::Node;
//! use tool_form::order::compare_nodes;
//!
//! assert_eq!(compare_nodes(&Node::Null, &Node::Bool(false)), Ordering::Less);
//! assert_eq!(compare_nodes(&Node::Number(f64::NAN), &Node::Number(f64::NAN)), Ordering::Equal);
//! assert_eq!(compare_nodes(&Node::Number(-0.0), &Node::Number(0.0)), Ordering::Less);
//! ```

use std::cmp::Ordering;

use crate::node::{Node, Object, Payload, PayloadValue};

fn rank(node: &Node) -> u8 {
    match node {
        Node::Undefined => 0,
        Node::Null => 1,
        Node::Bool(_) => 2,
        Node::Number(_) => 3,
        Node::String(_) => 4,
        Node::Array(_) => 5,
        Node::Object(_) => 6,
        Node::Payload(_) => 7,
        Node::Fragment(_) => 8,
    }
}

/// Compares two nodes by the total order.
pub fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    match (a, b) {
        (Node::Bool(x), Node::Bool(y)) => x.cmp(y),
        (Node::Number(x), Node::Number(y)) => compare_numbers(*x, *y),
        (Node::String(x), Node::String(y)) => x.cmp(y),
        (Node::Array(x), Node::Array(y)) | (Node::Fragment(x), Node::Fragment(y)) => compare_arrays(x, y),
        (Node::Object(x), Node::Object(y)) => compare_objects(x, y),
        (Node::Payload(x), Node::Payload(y)) => compare_payloads(x, y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_numbers(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // total_cmp orders -0 before +0
        (false, false) => x.total_cmp(&y),
    }
}

fn compare_arrays(x: &[Node], y: &[Node]) -> Ordering {
    for (a, b) in x.iter().zip(y) {
        let ordering = compare_nodes(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    x.len().cmp(&y.len())
}

fn compare_objects(x: &Object, y: &Object) -> Ordering {
    let mut x_keys: Vec<&String> = x.keys().collect();
    let mut y_keys: Vec<&String> = y.keys().collect();
    x_keys.sort();
    y_keys.sort();

    for (a, b) in x_keys.iter().zip(&y_keys) {
        let ordering = a.cmp(b).then_with(|| compare_nodes(&x[*a], &y[*b]));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    x_keys.len().cmp(&y_keys.len())
}

fn compare_payloads(x: &Payload, y: &Payload) -> Ordering {
    match (&x.value, &y.value) {
        (PayloadValue::Text(a), PayloadValue::Text(b)) => a.cmp(b),
        (PayloadValue::Bytes(a), PayloadValue::Bytes(b)) => a.cmp(b),
        (PayloadValue::Text(_), PayloadValue::Bytes(_)) => Ordering::Less,
        (PayloadValue::Bytes(_), PayloadValue::Text(_)) => Ordering::Greater,
    }
}
