//! Parsed templates and their configuration.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use url::Url;

use crate::context::{DirectiveRegistry, EncodingRegistry, FormContext, TransformRegistry};
use crate::directive::{
    CommentDirective, Directive, EachDirective, EncodeDirective, IfDirective, IncludeDirective, JoinDirective,
    MatchDirective, MatchesDirective, MetaDirective, SpliceDirective, SpreadDirective, TransformDirective,
    UriDirective, UseDirective, WhenDirective,
};
use crate::encoding::{ArgsEncoding, Base64Encoding, Encoding, JsonEncoding, MultipartEncoding, UrlencodedEncoding};
use crate::error::TransformResult;
use crate::node::Node;
use crate::parse::parse_template_resource;
use crate::process::process_template;
use crate::resource::{NullResolver, ResourceRegistry, ResourceResolver};
use crate::transform::{FirstTransform, LastTransform, LengthTransform, SortTransform, Transform};

/// The built-in directives, in dispatch order.
pub fn standard_directives() -> DirectiveRegistry {
    let directives = [
        Directive::modifier(MetaDirective),
        Directive::modifier(CommentDirective),
        Directive::domain(SpliceDirective),
        Directive::domain(UseDirective),
        Directive::domain(UriDirective),
        Directive::domain(IncludeDirective),
        Directive::domain(SpreadDirective),
        Directive::domain(IfDirective),
        Directive::domain(WhenDirective),
        Directive::domain(EachDirective),
        Directive::operator(JoinDirective),
        Directive::operator(MatchDirective),
        Directive::operator(MatchesDirective),
        Directive::operator(TransformDirective),
        Directive::operator(EncodeDirective),
    ];
    directives
        .into_iter()
        .map(|directive| (directive.name().to_string(), directive))
        .collect()
}

/// The built-in transforms: `length`, `sort`, `first` and `last`.
pub fn standard_transforms() -> TransformRegistry {
    let transforms: [Arc<dyn Transform>; 4] = [
        Arc::new(LengthTransform),
        Arc::new(SortTransform),
        Arc::new(FirstTransform),
        Arc::new(LastTransform),
    ];
    transforms
        .into_iter()
        .map(|transform| (transform.name().to_string(), transform))
        .collect()
}

/// The built-in encodings: `json`, `base64`, `urlencoded`, `multipart`
/// and `args`.
pub fn standard_encodings() -> EncodingRegistry {
    let encodings: [Arc<dyn Encoding>; 5] = [
        Arc::new(JsonEncoding),
        Arc::new(Base64Encoding),
        Arc::new(UrlencodedEncoding),
        Arc::new(MultipartEncoding::new()),
        Arc::new(ArgsEncoding),
    ];
    encodings
        .into_iter()
        .map(|encoding| (encoding.name().to_string(), encoding))
        .collect()
}

/// Options for parsing a template.
///
/// # Examples
///
/// ```
/// use tool_form::{MemoryResolver, Node, Template, TemplateOptions};
/// use serde_json::json;
///
/// let mut resolver = MemoryResolver::new();
/// resolver.add("https://example.com/greeting.json", Node::from(json!({"text": "Hello, {{name}}!"})));
///
/// let options = TemplateOptions::new()
///     .with_base_uri("https://example.com/form.json".parse().unwrap())
///     .with_resolver(resolver);
///
/// let mut template = Template::parse_with(Node::from(json!({"$include": "greeting.json"})), options).unwrap();
/// let output = template.transform(&Node::from(json!({"name": "Ada"}))).unwrap();
/// assert_eq!(output, Node::from(json!({"text": "Hello, Ada!"})));
/// ```
pub struct TemplateOptions {
    base_uri: Option<Url>,
    resolver: Arc<dyn ResourceResolver>,
    resources: Vec<(Url, Node)>,
    directives: DirectiveRegistry,
    transforms: TransformRegistry,
    encodings: EncodingRegistry,
    format_validation: bool,
}

impl TemplateOptions {
    pub fn new() -> Self {
        TemplateOptions {
            base_uri: None,
            resolver: Arc::new(NullResolver),
            resources: Vec::new(),
            directives: IndexMap::new(),
            transforms: IndexMap::new(),
            encodings: IndexMap::new(),
            format_validation: true,
        }
    }

    /// Base URI against which the template's references are resolved.
    pub fn with_base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Resolver for `$include`d documents and remote schemas.
    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Register a document up front, bypassing the resolver.
    pub fn with_resource(mut self, uri: Url, node: Node) -> Self {
        self.resources.push((uri, node));
        self
    }

    /// Add a directive, replacing any built-in one with the same name.
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.insert(directive.name().to_string(), directive);
        self
    }

    /// Add a transform, replacing any built-in one with the same name.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.insert(transform.name().to_string(), Arc::new(transform));
        self
    }

    /// Add an encoding, replacing any built-in one with the same name.
    pub fn with_encoding(mut self, encoding: impl Encoding + 'static) -> Self {
        self.encodings.insert(encoding.name().to_string(), Arc::new(encoding));
        self
    }

    /// Whether schema `format` keywords are asserted. Enabled by default.
    pub fn with_format_validation(mut self, enabled: bool) -> Self {
        self.format_validation = enabled;
        self
    }

    fn into_context(self) -> FormContext {
        let mut directives = standard_directives();
        directives.extend(self.directives);
        let mut transforms = standard_transforms();
        transforms.extend(self.transforms);
        let mut encodings = standard_encodings();
        encodings.extend(self.encodings);

        let mut resources = ResourceRegistry::new(self.resolver);
        for (uri, node) in self.resources {
            resources.insert(uri, node);
        }

        FormContext::new(directives, transforms, encodings, resources)
            .with_base_uri(self.base_uri)
            .with_format_validation(self.format_validation)
    }
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed template.
///
/// # Examples
///
/// ```
/// use tool_form::{Node, Template};
/// use serde_json::json;
///
/// let mut template = Template::parse(Node::from(json!({
///     "greeting": "Hello, {{user.name}}!",
///     "tags": {"$each": "$.user.tags[*]", "$as": "tag", "$value": {"$": "tag"}}
/// }))).unwrap();
///
/// let output = template
///     .transform(&Node::from(json!({"user": {"name": "Ada", "tags": ["math", "poetry"]}})))
///     .unwrap();
/// assert_eq!(output, Node::from(json!({"greeting": "Hello, Ada!", "tags": ["math", "poetry"]})));
/// ```
pub struct Template {
    node: Node,
    context: FormContext,
}

impl Template {
    /// Parse a template with the standard directives, transforms and
    /// encodings.
    pub fn parse(node: Node) -> TransformResult<Self> {
        Self::parse_with(node, TemplateOptions::new())
    }

    pub fn parse_with(node: Node, options: TemplateOptions) -> TransformResult<Self> {
        let mut context = options.into_context();
        debug!(base_uri = ?context.base_uri(), "parsing template");
        parse_template_resource(&node, &mut context)?;
        Ok(Template { node, context })
    }

    /// The raw template node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The context the template was parsed in.
    pub fn context(&self) -> &FormContext {
        &self.context
    }

    /// An independent context for use with [`Template::transform_with`].
    pub fn new_context(&self) -> FormContext {
        self.context.fork()
    }

    /// Transform the template, returning the raw result, which may be a
    /// [`Node::Payload`].
    pub fn transform_node(&mut self, args: &Node) -> TransformResult<Node> {
        process_template(&self.node, args, &mut self.context)
    }

    /// Transform the template, unwrapping any payload result.
    pub fn transform(&mut self, args: &Node) -> TransformResult<Node> {
        self.transform_node(args).map(Node::unwrap_payload)
    }

    /// Transform the template against a separate context, returning the
    /// raw result.
    pub fn transform_with(&self, args: &Node, cx: &mut FormContext) -> TransformResult<Node> {
        process_template(&self.node, args, cx)
    }
}
