use std::borrow::Cow;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::context::{FormContext, MAX_INCLUDE_DEPTH};
use crate::directive::{DomainDirective, parse_property, process_property};
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::{is_static, parse_object, parse_template_resource};
use crate::process::process_node;
use crate::resource::{resolve_uri, split_fragment};

/// `$include`: replaces its object with another template resource.
///
/// The transformed argument is a URI reference resolved against the current
/// resource. The referenced document, or the part of it selected by a JSON
/// pointer fragment, is processed as a template with the same query
/// argument. Literal references are loaded when the template is parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeDirective;

impl DomainDirective for IncludeDirective {
    fn name(&self) -> &str {
        "$include"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_object(node, cx)?;
        parse_property(node, "$include", cx)?;

        if let Some(argument) = node.get("$include")
            && let Node::String(reference) = argument
            && is_static(argument, cx)
        {
            let (uri, document) = cx.nest_frame("$include", |cx| load(reference, cx))?;
            let (base, _) = split_fragment(&uri);
            cx.nest_resource(base, |cx| parse_template_resource(&document, cx))?;
        }
        Ok(())
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        let reference = process_property(node, "$include", arg, cx)?;
        let Node::String(reference) = reference.as_ref() else {
            return Ok(Cow::Owned(Node::Undefined));
        };

        if cx.resource_depth() >= MAX_INCLUDE_DEPTH {
            return Err(cx.error(format!("Include depth limit exceeded at {:?}", reference)));
        }

        let (uri, document) = cx.nest_frame("$include", |cx| load(reference, cx))?;
        let (base, fragment) = split_fragment(&uri);

        cx.nest_resource(base, |cx| {
            parse_template_resource(&document, cx)?;
            let target = document
                .pointer(&fragment)
                .ok_or_else(|| cx.error(format!("Unresolved include fragment {:?} in {}", fragment, uri)))?;
            process_node(target, arg, cx).map(Cow::into_owned)
        })
        .map(Cow::Owned)
    }
}

/// Resolve a reference against the current resource and load it.
fn load(reference: &str, cx: &mut FormContext) -> TransformResult<(Url, Arc<Node>)> {
    let uri = resolve_uri(cx.base_uri(), reference)
        .map_err(|err| cx.error(format!("Invalid include reference {:?}", reference)).with_source(err))?;

    debug!(%uri, "including resource");
    let document = cx
        .resources
        .fetch(&uri)
        .map_err(|err| cx.error(format!("Failed to include {}: {}", uri, err)).with_source(err))?;
    Ok((uri, document))
}
