use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{OperatorDirective, process_argument};
use crate::error::TransformResult;
use crate::evaluate::coerce_string;
use crate::node::Node;
use crate::parse::parse_node;

/// `$join`: concatenates the string forms of the result's elements.
///
/// The transformed argument is the separator, or `""` if it is not a
/// string. Arrays join their elements, objects their values, and any other
/// value stands alone. Undefined entries are skipped along with their
/// separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinDirective;

impl OperatorDirective for JoinDirective {
    fn name(&self) -> &str {
        "$join"
    }

    fn parse(&self, argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_node(argument, cx)
    }

    fn operate<'t>(
        &self,
        argument: &'t Node,
        node: Cow<'t, Node>,
        arg: &Node,
        cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        let separator = process_argument("$join", argument, arg, cx)?;
        let separator = separator.as_str().unwrap_or_default();

        let fragments: Vec<&Node> = match node.as_ref() {
            Node::Array(items) => items.iter().collect(),
            Node::Object(entries) => entries.values().collect(),
            other => vec![other],
        };

        let mut result = String::new();
        let mut first = true;
        for text in fragments.into_iter().filter_map(coerce_string) {
            if !first {
                result.push_str(separator);
            }
            result.push_str(&text);
            first = false;
        }

        Ok(Cow::Owned(Node::String(result)))
    }
}
