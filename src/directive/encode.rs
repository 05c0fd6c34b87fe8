use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::{OperatorDirective, process_argument};
use crate::error::TransformResult;
use crate::node::Node;
use crate::output::to_json;
use crate::parse::{is_static, parse_node};

/// `$encode`: applies one or more named encodings to the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeDirective;

impl OperatorDirective for EncodeDirective {
    fn name(&self) -> &str {
        "$encode"
    }

    fn parse(&self, argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_node(argument, cx)?;
        if is_static(argument, cx) {
            for name in names(argument) {
                check_encoding(name, cx)?;
            }
        }
        Ok(())
    }

    fn operate<'t>(
        &self,
        argument: &'t Node,
        node: Cow<'t, Node>,
        arg: &Node,
        cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        let argument = process_argument("$encode", argument, arg, cx)?;

        let mut node = node.into_owned();
        for name in names(&argument) {
            let name = check_encoding(name, cx)?;
            if let Some(encoding) = cx.encoding(name) {
                node = encoding.encode(node, cx)?;
            }
        }
        Ok(Cow::Owned(node))
    }
}

/// A name, or each element of an array of names.
pub(crate) fn names(argument: &Node) -> Vec<&Node> {
    match argument {
        Node::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn check_encoding<'n>(name: &'n Node, cx: &FormContext) -> TransformResult<&'n str> {
    let Node::String(name) = name else {
        return Err(cx.error(format!(
            "Encoding name must be a string: {}",
            to_json(name).unwrap_or_else(|| "undefined".to_string())
        )));
    };
    if cx.encoding(name).is_none() {
        return Err(cx.error(format!("Unsupported encoding: {:?}", name)));
    }
    Ok(name)
}
