//! Directives: reserved object properties that change how their object is
//! transformed.
//!
//! Directives come in three kinds:
//!
//! - **Modifiers** run before the object is transformed and never affect
//!   its result (`$meta`, `$comment`).
//! - A **domain** directive replaces the transformation of the whole
//!   object. An object may carry at most one (`$if`, `$each`, `$`, ...).
//! - **Operators** post-process the result of the domain directive, or of
//!   the plain object, each receiving its own untransformed argument
//!   (`$join`, `$match`, `$encode`, ...).
//!
//! The kind of every directive is fixed by the registry it is looked up in,
//! and all of them run in registry order.

mod comment;
mod each;
mod encode;
mod if_;
mod include;
mod join;
mod match_;
mod matches;
mod meta;
mod splice;
mod spread;
mod transform;
mod uri;
mod use_;
mod when;

pub use comment::CommentDirective;
pub use each::EachDirective;
pub use encode::EncodeDirective;
pub use if_::IfDirective;
pub use include::IncludeDirective;
pub use join::JoinDirective;
pub use match_::MatchDirective;
pub use matches::MatchesDirective;
pub use meta::MetaDirective;
pub use splice::SpliceDirective;
pub use spread::SpreadDirective;
pub use transform::TransformDirective;
pub use uri::UriDirective;
pub use use_::UseDirective;
pub use when::WhenDirective;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::context::FormContext;
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::parse_object;

/// A directive that runs before its object is transformed.
pub trait ModifierDirective: Send + Sync {
    /// The property name that activates this directive.
    fn name(&self) -> &str;

    fn parse(&self, _node: &Node, _cx: &mut FormContext) -> TransformResult<()> {
        Ok(())
    }

    fn modify(&self, _node: &Node, _arg: &Node, _cx: &mut FormContext) -> TransformResult<()> {
        Ok(())
    }
}

/// A directive that owns the transformation of its object.
pub trait DomainDirective: Send + Sync {
    /// The property name that activates this directive.
    fn name(&self) -> &str;

    /// Parse the directive object. By default, the object's other
    /// properties are parsed as template nodes.
    fn parse(&self, node: &Node, cx: &mut FormContext) -> TransformResult<()> {
        parse_object(node, cx)
    }

    /// Transform the directive object against the query argument.
    fn transform<'t>(&self, node: &'t Node, arg: &Node, cx: &mut FormContext) -> TransformResult<Cow<'t, Node>>;
}

/// A directive that rewrites the result of its object.
pub trait OperatorDirective: Send + Sync {
    /// The property name that activates this directive.
    fn name(&self) -> &str;

    fn parse(&self, _argument: &Node, _cx: &mut FormContext) -> TransformResult<()> {
        Ok(())
    }

    /// Rewrite `node`, the object's result so far, using the directive's
    /// `argument`.
    fn operate<'t>(
        &self,
        argument: &'t Node,
        node: Cow<'t, Node>,
        arg: &Node,
        cx: &mut FormContext,
    ) -> TransformResult<Cow<'t, Node>>;
}

/// A registered directive, tagged with its kind.
#[derive(Clone)]
pub enum Directive {
    Modifier(Arc<dyn ModifierDirective>),
    Domain(Arc<dyn DomainDirective>),
    Operator(Arc<dyn OperatorDirective>),
}

impl Directive {
    pub fn modifier(directive: impl ModifierDirective + 'static) -> Self {
        Directive::Modifier(Arc::new(directive))
    }

    pub fn domain(directive: impl DomainDirective + 'static) -> Self {
        Directive::Domain(Arc::new(directive))
    }

    pub fn operator(directive: impl OperatorDirective + 'static) -> Self {
        Directive::Operator(Arc::new(directive))
    }

    pub fn name(&self) -> &str {
        match self {
            Directive::Modifier(directive) => directive.name(),
            Directive::Domain(directive) => directive.name(),
            Directive::Operator(directive) => directive.name(),
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Directive::Modifier(_) => "Modifier",
            Directive::Domain(_) => "Domain",
            Directive::Operator(_) => "Operator",
        };
        f.debug_tuple(kind).field(&self.name()).finish()
    }
}

/// The directives declared by one object.
#[derive(Default)]
pub struct DirectiveSet<'n> {
    pub modifiers: Vec<Arc<dyn ModifierDirective>>,
    pub domain: Option<Arc<dyn DomainDirective>>,
    /// Operators with their arguments
    pub operators: Vec<(Arc<dyn OperatorDirective>, &'n Node)>,
}

impl DirectiveSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty() && self.domain.is_none() && self.operators.is_empty()
    }
}

/// Collect the directives declared by an object node.
///
/// A directive property whose value is undefined counts as absent.
/// Declaring two domain directives on one object is an error.
pub fn detect_directives<'n>(node: &'n Node, cx: &FormContext) -> TransformResult<DirectiveSet<'n>> {
    let mut set = DirectiveSet::default();
    let Node::Object(entries) = node else {
        return Ok(set);
    };
    // Most objects are plain data
    if !entries.keys().any(|key| cx.is_directive(key)) {
        return Ok(set);
    }

    for (name, directive) in cx.directives().iter() {
        let Some(value) = node.get(name) else {
            continue;
        };
        match directive {
            Directive::Modifier(modifier) => set.modifiers.push(Arc::clone(modifier)),
            Directive::Domain(domain) => {
                if set.domain.is_some() {
                    return Err(cx.error("Ambiguous domain directive"));
                }
                set.domain = Some(Arc::clone(domain));
            }
            Directive::Operator(operator) => set.operators.push((Arc::clone(operator), value)),
        }
    }

    Ok(set)
}

/// Process a directive argument under a frame named after the directive.
pub(crate) fn process_argument<'t>(
    name: &str,
    argument: &'t Node,
    arg: &Node,
    cx: &mut FormContext,
) -> TransformResult<Cow<'t, Node>> {
    cx.nest_frame(name, |cx| crate::process::process_node(argument, arg, cx))
}

/// Process the named property of a directive object under its own frame.
///
/// A missing property processes to undefined.
pub(crate) fn process_property<'t>(
    node: &'t Node,
    name: &str,
    arg: &Node,
    cx: &mut FormContext,
) -> TransformResult<Cow<'t, Node>> {
    match node.get(name) {
        Some(value) => process_argument(name, value, arg, cx),
        None => Ok(Cow::Owned(Node::Undefined)),
    }
}

/// Parse the named property of a directive object under its own frame.
pub(crate) fn parse_property(node: &Node, name: &str, cx: &mut FormContext) -> TransformResult<()> {
    match node.get(name) {
        Some(value) => cx.nest_frame(name, |cx| crate::parse::parse_node(value, cx)),
        None => Ok(()),
    }
}
