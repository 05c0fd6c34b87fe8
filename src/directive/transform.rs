use std::borrow::Cow;

use super::encode::names;
use crate::context::FormContext;
use crate::directive::{OperatorDirective, process_argument};
use crate::error::TransformResult;
use crate::node::Node;
use crate::output::to_json;
use crate::parse::{is_static, parse_node};

/// `$transform`: applies one or more named transforms to the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformDirective;

impl OperatorDirective for TransformDirective {
    fn name(&self) -> &str {
        "$transform"
    }

    fn parse(&self, argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_node(argument, cx)?;
        if is_static(argument, cx) {
            for name in names(argument) {
                check_transform(name, cx)?;
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
        let argument = process_argument("$transform", argument, arg, cx)?;

        let mut node = node.into_owned();
        for name in names(&argument) {
            let name = check_transform(name, cx)?;
            if let Some(transform) = cx.transform(name) {
                node = transform.transform(node, cx)?;
            }
        }
        Ok(Cow::Owned(node))
    }
}

fn check_transform<'n>(name: &'n Node, cx: &FormContext) -> TransformResult<&'n str> {
    let Node::String(name) = name else {
        return Err(cx.error(format!(
            "Transform name must be a string: {}",
            to_json(name).unwrap_or_else(|| "undefined".to_string())
        )));
    };
    if cx.transform(name).is_none() {
        return Err(cx.error(format!("Unsupported transform: {:?}", name)));
    }
    Ok(name)
}
