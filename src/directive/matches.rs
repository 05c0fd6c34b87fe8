use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::OperatorDirective;
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::{is_static, parse_node};
use crate::process::process_node;

/// `$matches`: tests the result against a JSON Schema.
///
/// The transformed argument is the schema; the directive produces a
/// boolean.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchesDirective;

impl OperatorDirective for MatchesDirective {
    fn name(&self) -> &str {
        "$matches"
    }

    fn parse(&self, argument: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_schema(argument, cx)
    }

    fn operate<'t>(
        &self,
        argument: &'t Node,
        node: Cow<'t, Node>,
        arg: &Node,
        cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>> {
        let valid = cx.nest_frame("$matches", |cx| {
            let schema = process_node(argument, arg, cx)?;
            validate_schema(&schema, &node, cx)
        })?;
        Ok(Cow::Owned(Node::Bool(valid)))
    }
}

/// Parse a schema template. Static schemas are registered and have their
/// references loaded up front.
pub(crate) fn parse_schema(schema: &Node, cx: &mut FormContext) -> TransformResult<()> {
    parse_node(schema, cx)?;
    if is_static(schema, cx) {
        load_schema(schema, cx)?;
    }
    Ok(())
}

/// Validate an instance against a transformed schema.
pub(crate) fn validate_schema(schema: &Node, instance: &Node, cx: &mut FormContext) -> TransformResult<bool> {
    let resource = load_schema(schema, cx)?;
    let output = cx
        .schemas
        .validate(&resource, instance, cx.format_validation())
        .map_err(|err| cx.error(format!("Schema validation failed: {}", err)).with_source(err))?;
    Ok(output.valid)
}

fn load_schema(schema: &Node, cx: &mut FormContext) -> TransformResult<crate::schema::SchemaResource> {
    let base = cx.base_uri().cloned();
    let resource = cx
        .schemas
        .parse_schema_resource(schema, base.as_ref())
        .map_err(|err| cx.error(format!("Invalid schema: {}", err)).with_source(err))?;
    cx.schemas
        .resolve_references(&resource, &mut cx.resources)
        .map_err(|err| cx.error(format!("Invalid schema: {}", err)).with_source(err))?;
    Ok(resource)
}
