//! The state shared by a template's parse and process passes.

use std::sync::Arc;

use indexmap::IndexMap;
use url::Url;

use crate::directive::Directive;
use crate::encoding::Encoding;
use crate::error::TransformError;
use crate::frame::{Frame, Location, NodeKey};
use crate::resource::{NullResolver, ResourceRegistry};
use crate::schema::SchemaRegistry;
use crate::transform::Transform;

/// Maximum number of nested `$include`d resources
pub const MAX_INCLUDE_DEPTH: usize = 32;

pub type DirectiveRegistry = IndexMap<String, Directive>;
pub type TransformRegistry = IndexMap<String, Arc<dyn Transform>>;
pub type EncodingRegistry = IndexMap<String, Arc<dyn Encoding>>;

/// Registries, loaded resources and the frame stack used while processing
/// a template.
///
/// The query argument is not part of the context: it is passed to every
/// processing function instead, so nested `$each` bindings never need to be
/// restored.
///
/// A context is not meant to be shared between concurrent transforms. Use
/// [`FormContext::fork`] to give each one its own.
#[derive(Clone)]
pub struct FormContext {
    directives: Arc<DirectiveRegistry>,
    transforms: Arc<TransformRegistry>,
    encodings: Arc<EncodingRegistry>,
    pub(crate) resources: ResourceRegistry,
    pub(crate) schemas: SchemaRegistry,
    frames: Vec<Frame>,
    base_uri: Option<Url>,
    format_validation: bool,
}

impl FormContext {
    pub fn new(
        directives: DirectiveRegistry,
        transforms: TransformRegistry,
        encodings: EncodingRegistry,
        resources: ResourceRegistry,
    ) -> Self {
        FormContext {
            directives: Arc::new(directives),
            transforms: Arc::new(transforms),
            encodings: Arc::new(encodings),
            resources,
            schemas: SchemaRegistry::new(),
            frames: Vec::new(),
            base_uri: None,
            format_validation: true,
        }
    }

    pub fn with_base_uri(mut self, base_uri: Option<Url>) -> Self {
        self.base_uri = base_uri;
        self
    }

    pub fn with_format_validation(mut self, enabled: bool) -> Self {
        self.format_validation = enabled;
        self
    }

    /// A context with the same registries and loaded resources, and an
    /// empty frame stack.
    pub fn fork(&self) -> Self {
        let mut cx = self.clone();
        cx.frames.clear();
        cx
    }

    pub fn directives(&self) -> &Arc<DirectiveRegistry> {
        &self.directives
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    pub fn is_directive(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    pub fn transform(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    pub fn encoding(&self, name: &str) -> Option<Arc<dyn Encoding>> {
        self.encodings.get(name).cloned()
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn format_validation(&self) -> bool {
        self.format_validation
    }

    /// Base URI of the innermost resource being processed.
    pub fn base_uri(&self) -> Option<&Url> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.base_uri.as_ref())
            .or(self.base_uri.as_ref())
    }

    /// Number of resources entered on the current stack.
    pub fn resource_depth(&self) -> usize {
        self.frames.iter().filter(|frame| frame.base_uri.is_some()).count()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn location(&self) -> Location {
        Location::from_frames(&self.frames)
    }

    /// Create an error located at the current frame.
    pub fn error(&self, message: impl Into<String>) -> TransformError {
        TransformError::new(message, self.location())
    }

    /// Run `f` with a frame for the child at `key` pushed on the stack.
    pub fn nest_frame<F, R>(&mut self, key: impl Into<NodeKey>, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.with_frame(Frame::keyed(key), f)
    }

    /// Run `f` inside the resource identified by `base_uri`.
    pub fn nest_resource<F, R>(&mut self, base_uri: Url, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.with_frame(Frame::resource(base_uri), f)
    }

    fn with_frame<F, R>(&mut self, frame: Frame, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }
}

impl Default for FormContext {
    fn default() -> Self {
        FormContext::new(
            IndexMap::new(),
            IndexMap::new(),
            IndexMap::new(),
            ResourceRegistry::new(Arc::new(NullResolver)),
        )
    }
}
