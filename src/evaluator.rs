use std::borrow::Cow;

use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{
        Comparable, CompOp, FunctionArg, FunctionCall, LogicalExpr, Query, QueryRoot, Segment,
        SegmentKind, Selector, TestExpr,
    },
    node::Node,
};

/// Errors that can occur during query evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A query that may select several nodes was used where one is required
    #[error("Query is not singular")]
    NotSingular,

    /// Function call not known to the evaluator
    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    /// Argument of the wrong kind passed to a function
    #[error("Invalid argument to function {0}()")]
    InvalidArgument(String),
}

/// The result of a function call inside a filter expression.
enum FunctionValue<'a> {
    Value(Option<Cow<'a, Node>>),
    Logical(bool),
}

/// The query evaluator.
///
/// Selects nodes from a root document. Results borrow from the document,
/// so selection never copies the values it returns.
///
/// # Examples
///
/// ```
/// use tool_form::Node;
/// use tool_form::evaluator::Evaluator;
/// use tool_form::parser::parse_query;
/// use serde_json::json;
///
/// let doc = Node::from(json!({"items": [{"price": 5}, {"price": 50}]}));
/// let query = parse_query("$.items[?@.price > 10].price").unwrap();
///
/// let evaluator = Evaluator::new(&doc);
/// let nodes = evaluator.select(&query, &doc).unwrap();
/// assert_eq!(nodes, vec![&Node::Number(50.0)]);
/// ```
pub struct Evaluator<'a> {
    /// The document referred to by `$`
    root: &'a Node,
}

impl<'a> Evaluator<'a> {
    pub fn new(root: &'a Node) -> Self {
        Evaluator { root }
    }

    /// Evaluates a query, returning every selected node in document order.
    ///
    /// `current` is the node referred to by `@`.
    pub fn select(&self, query: &Query, current: &'a Node) -> Result<Vec<&'a Node>, EvalError> {
        let start = match query.root {
            QueryRoot::Root => self.root,
            QueryRoot::Current => current,
        };

        let mut nodes = vec![start];
        for segment in &query.segments {
            nodes = self.apply_segment(segment, &nodes)?;
            if nodes.is_empty() {
                break;
            }
        }
        Ok(nodes)
    }

    /// Evaluates a singular query, returning the selected node if any.
    pub fn select_singular(&self, query: &Query, current: &'a Node) -> Result<Option<&'a Node>, EvalError> {
        if !query.is_singular() {
            return Err(EvalError::NotSingular);
        }
        Ok(self.select(query, current)?.into_iter().next())
    }

    /// Evaluates a filter expression with `current` as the node under test.
    pub fn eval_logical(&self, expr: &LogicalExpr, current: &'a Node) -> Result<bool, EvalError> {
        match expr {
            LogicalExpr::Or(left, right) => {
                Ok(self.eval_logical(left, current)? || self.eval_logical(right, current)?)
            }
            LogicalExpr::And(left, right) => {
                Ok(self.eval_logical(left, current)? && self.eval_logical(right, current)?)
            }
            LogicalExpr::Not(operand) => Ok(!self.eval_logical(operand, current)?),
            LogicalExpr::Comparison { op, left, right } => {
                let left = self.eval_comparable(left, current)?;
                let right = self.eval_comparable(right, current)?;
                Ok(compare(*op, left.as_deref(), right.as_deref()))
            }
            LogicalExpr::Test(TestExpr::Query(query)) => Ok(!self.select(query, current)?.is_empty()),
            LogicalExpr::Test(TestExpr::Function(call)) => match self.eval_function(call, current)? {
                FunctionValue::Logical(b) => Ok(b),
                FunctionValue::Value(_) => Err(EvalError::InvalidArgument(call.name.clone())),
            },
        }
    }

    fn apply_segment(&self, segment: &Segment, inputs: &[&'a Node]) -> Result<Vec<&'a Node>, EvalError> {
        let mut outputs = Vec::new();

        match segment.kind {
            SegmentKind::Child => {
                for node in inputs {
                    for selector in &segment.selectors {
                        self.apply_selector(selector, node, &mut outputs)?;
                    }
                }
            }
            SegmentKind::Descendant => {
                for node in inputs {
                    let mut descendants = Vec::new();
                    collect_descendants(node, &mut descendants);
                    for descendant in descendants {
                        for selector in &segment.selectors {
                            self.apply_selector(selector, descendant, &mut outputs)?;
                        }
                    }
                }
            }
        }

        Ok(outputs)
    }

    fn apply_selector(&self, selector: &Selector, node: &'a Node, out: &mut Vec<&'a Node>) -> Result<(), EvalError> {
        match selector {
            Selector::Name(name) => {
                if let Some(child) = node.get(name) {
                    out.push(child);
                }
            }
            Selector::Wildcard => out.extend(children(node)),
            Selector::Index(index) => {
                if let Node::Array(items) = node
                    && let Some(i) = normalize_index(*index, items.len())
                {
                    out.push(&items[i]);
                }
            }
            Selector::Slice { start, end, step } => {
                if let Node::Array(items) = node {
                    for i in slice_indices(*start, *end, *step, items.len()) {
                        out.push(&items[i]);
                    }
                }
            }
            Selector::Filter(expr) => {
                for child in children(node) {
                    if self.eval_logical(expr, child)? {
                        out.push(child);
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_comparable(&self, operand: &Comparable, current: &'a Node) -> Result<Option<Cow<'a, Node>>, EvalError> {
        match operand {
            Comparable::Literal(node) => Ok(Some(Cow::Owned(node.clone()))),
            Comparable::Query(query) => Ok(self.select_singular(query, current)?.map(Cow::Borrowed)),
            Comparable::Function(call) => match self.eval_function(call, current)? {
                FunctionValue::Value(value) => Ok(value),
                _ => Err(EvalError::InvalidArgument(call.name.clone())),
            },
        }
    }

    fn eval_value_arg(&self, call: &FunctionCall, arg: &FunctionArg, current: &'a Node) -> Result<Option<Cow<'a, Node>>, EvalError> {
        match arg {
            FunctionArg::Literal(node) => Ok(Some(Cow::Owned(node.clone()))),
            FunctionArg::Query(query) => Ok(self.select_singular(query, current)?.map(Cow::Borrowed)),
            FunctionArg::Function(inner) => match self.eval_function(inner, current)? {
                FunctionValue::Value(value) => Ok(value),
                _ => Err(EvalError::InvalidArgument(call.name.clone())),
            },
            FunctionArg::Logical(_) => Err(EvalError::InvalidArgument(call.name.clone())),
        }
    }

    fn eval_nodes_arg(&self, call: &FunctionCall, arg: &FunctionArg, current: &'a Node) -> Result<Vec<&'a Node>, EvalError> {
        match arg {
            FunctionArg::Query(query) => self.select(query, current),
            _ => Err(EvalError::InvalidArgument(call.name.clone())),
        }
    }

    fn eval_function(&self, call: &FunctionCall, current: &'a Node) -> Result<FunctionValue<'a>, EvalError> {
        let arg = |index: usize| {
            call.args
                .get(index)
                .ok_or_else(|| EvalError::InvalidArgument(call.name.clone()))
        };

        match call.name.as_str() {
            "length" => {
                let value = self.eval_value_arg(call, arg(0)?, current)?;
                Ok(FunctionValue::Value(value.as_deref().and_then(length).map(Cow::Owned)))
            }
            "count" => {
                let nodes = self.eval_nodes_arg(call, arg(0)?, current)?;
                Ok(FunctionValue::Value(Some(Cow::Owned(Node::from(nodes.len())))))
            }
            "value" => {
                let nodes = self.eval_nodes_arg(call, arg(0)?, current)?;
                let value = match nodes.as_slice() {
                    [node] => Some(Cow::Borrowed(*node)),
                    _ => None,
                };
                Ok(FunctionValue::Value(value))
            }
            "match" | "search" => {
                let subject = self.eval_value_arg(call, arg(0)?, current)?;
                let pattern = self.eval_value_arg(call, arg(1)?, current)?;
                let (Some(Node::String(subject)), Some(Node::String(pattern))) =
                    (subject.as_deref(), pattern.as_deref())
                else {
                    return Ok(FunctionValue::Logical(false));
                };

                let source = if call.name == "match" {
                    format!("^(?:{})$", pattern)
                } else {
                    pattern.clone()
                };
                // Invalid patterns never match
                let matched = Regex::new(&source).is_ok_and(|re| re.is_match(subject));
                Ok(FunctionValue::Logical(matched))
            }
            name => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }
}

/// Array elements or object member values, skipping undefined members.
fn children(node: &Node) -> Vec<&Node> {
    match node {
        Node::Array(items) => items.iter().collect(),
        Node::Object(entries) => entries.values().filter(|value| !value.is_undefined()).collect(),
        _ => Vec::new(),
    }
}

/// The node itself followed by all of its descendants, in document order.
fn collect_descendants<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    for child in children(node) {
        collect_descendants(child, out);
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if index < 0 { len + index } else { index };
    if (0..len).contains(&i) { Some(i as usize) } else { None }
}

fn slice_indices(start: Option<i64>, end: Option<i64>, step: Option<i64>, len: usize) -> Vec<usize> {
    let step = step.unwrap_or(1);
    let len = len as i64;
    let normalize = |i: i64| if i >= 0 { i } else { len + i };
    let mut indices = Vec::new();

    if step > 0 {
        let lower = start.map(normalize).unwrap_or(0).clamp(0, len);
        let upper = end.map(normalize).unwrap_or(len).clamp(0, len);
        let mut i = lower;
        while i < upper {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else if step < 0 {
        let upper = start.map(normalize).unwrap_or(len - 1).clamp(-1, len - 1);
        let lower = end.map(normalize).unwrap_or(-1).clamp(-1, len - 1);
        let mut i = upper;
        while lower < i {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }

    indices
}

fn length(node: &Node) -> Option<Node> {
    match node {
        Node::String(s) => Some(Node::from(s.chars().count())),
        Node::Array(items) => Some(Node::from(items.len())),
        Node::Object(entries) => Some(Node::from(
            entries.values().filter(|value| !value.is_undefined()).count(),
        )),
        _ => None,
    }
}

/// Compares two optional values; `None` is the empty result of a query.
fn compare(op: CompOp, left: Option<&Node>, right: Option<&Node>) -> bool {
    match op {
        CompOp::Equal => equals(left, right),
        CompOp::NotEqual => !equals(left, right),
        CompOp::LessThan => less_than(left, right),
        CompOp::GreaterThan => less_than(right, left),
        CompOp::LessEqual => less_than(left, right) || equals(left, right),
        CompOp::GreaterEqual => less_than(right, left) || equals(left, right),
    }
}

fn equals(left: Option<&Node>, right: Option<&Node>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn less_than(left: Option<&Node>, right: Option<&Node>) -> bool {
    match (left, right) {
        (Some(Node::Number(a)), Some(Node::Number(b))) => a < b,
        (Some(Node::String(a)), Some(Node::String(b))) => a < b,
        _ => false,
    }
}

#[test]
fn test_slice_indices() {
    assert_eq!(slice_indices(Some(1), Some(3), None, 5), vec![1, 2]);
    assert_eq!(slice_indices(None, None, Some(2), 5), vec![0, 2, 4]);
    assert_eq!(slice_indices(None, None, Some(-1), 3), vec![2, 1, 0]);
    assert_eq!(slice_indices(Some(-2), None, None, 3), vec![1, 2]);
    assert!(slice_indices(None, None, Some(0), 3).is_empty());
}

#[test]
fn test_slice_indices_extreme_steps() {
    assert_eq!(slice_indices(Some(1), None, Some(i64::MAX), 3), vec![1]);
    assert_eq!(slice_indices(None, None, Some(i64::MIN), 3), vec![2]);
    assert_eq!(slice_indices(Some(i64::MIN), Some(i64::MAX), Some(i64::MAX), 3), vec![0]);
}
