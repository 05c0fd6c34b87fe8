use std::borrow::Cow;

use crate::context::FormContext;
use crate::directive::DomainDirective;
use crate::error::TransformResult;
use crate::evaluate::evaluate_singular_expression;
use crate::node::Node;
use crate::uri_template::UriTemplate;

/// `$uri`: expands an RFC 6570 URI template.
///
/// Each variable is a singular expression: the sibling property of the same
/// name if there is one, otherwise the same-named property of the query
/// argument.
///
/// ```json
/// {"$uri": "https://example.com/users/{id}{?fields*}", "id": "user.id"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UriDirective;

impl UriDirective {
    fn template(node: &Node, cx: &FormContext) -> TransformResult<UriTemplate> {
        let template = node
            .get("$uri")
            .and_then(Node::as_str)
            .ok_or_else(|| cx.error("$uri value must be a string"))?;
        UriTemplate::parse(template)
            .map_err(|err| cx.error(format!("Invalid URI template {:?}: {}", template, err)).with_source(err))
    }
}

impl DomainDirective for UriDirective {
    fn name(&self) -> &str {
        "$uri"
    }

    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        Self::template(node, cx).map(|_| ())
    }

    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>> {
        let template = Self::template(node, cx)?;
        let cx = &*cx;

        let expanded = template.expand(|varname| {
            let query = match node.get(varname) {
                Some(Node::String(query)) => Cow::Borrowed(query.as_str()),
                Some(_) => return Err(cx.error(format!("variable expression {:?} must be a string", varname))),
                None => Cow::Owned(format!("$['{}']", varname.replace('\\', "\\\\").replace('\'', "\\'"))),
            };
            evaluate_singular_expression(&query, arg, cx)
        })?;

        Ok(Cow::Owned(Node::String(expanded)))
    }
}
