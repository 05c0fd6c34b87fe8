//! Run query expressions against JSON input

use std::sync::Arc;

use indexmap::IndexMap;

use super::{CliError, parse_json};
use crate::context::FormContext;
use crate::evaluate::{evaluate_query_expression, evaluate_singular_expression};
use crate::node::Node;
use crate::resource::{NullResolver, ResourceRegistry};
use crate::template::standard_transforms;

/// Options for the query command
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// The query, or singular expression when `singular` is set
    pub query: String,
    /// JSON input string
    pub input: Option<String>,
    /// Evaluate as a singular expression, with pipes, instead of a query
    pub singular: bool,
}

/// Execute a query, returning the selected nodes as an array, or the value
/// of a singular expression.
pub fn execute_query(options: &QueryOptions) -> Result<Node, CliError> {
    let input = options.input.as_deref().ok_or(CliError::NoInput)?;
    let input = parse_json(input, "input")?;

    let cx = FormContext::new(
        IndexMap::new(),
        standard_transforms(),
        IndexMap::new(),
        ResourceRegistry::new(Arc::new(NullResolver)),
    );
    if options.singular {
        let value = evaluate_singular_expression(&options.query, &input, &cx)?;
        if value.is_undefined() {
            return Err(CliError::Undefined);
        }
        Ok(value)
    } else {
        Ok(Node::Array(evaluate_query_expression(&options.query, &input, &cx)?))
    }
}
