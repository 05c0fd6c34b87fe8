//! JSON Schema support for `$match` and `$matches`.
//!
//! Schemas are parsed into [`SchemaResource`]s, their remote `$ref`s are
//! loaded through the template's [`ResourceRegistry`], and instances are then
//! validated against them. The supported vocabulary is a subset of draft
//! 2020-12; see [`validator`] for the keyword list.

pub mod validator;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::node::Node;
use crate::resource::{ResourceError, ResourceRegistry, resolve_uri, split_fragment};

pub use validator::Validator;

/// Base URI given to schemas that have neither an `$id` nor a base URI.
const ANONYMOUS_SCHEMA_URI: &str = "urn:tool-form:schema";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema: expected an object or a boolean, got {0}")]
    InvalidSchema(&'static str),

    #[error("Invalid schema identifier {id:?}: {source}")]
    InvalidId {
        id: String,
        #[source]
        source: ResourceError,
    },

    #[error("Unresolved schema reference: {0}")]
    UnresolvedReference(String),

    #[error("Failed to load schema reference {uri}: {source}")]
    Resource {
        uri: Url,
        #[source]
        source: ResourceError,
    },

    #[error("Invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Schema reference depth limit exceeded at {0}")]
    RecursiveReference(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// The outcome of validating an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputUnit {
    pub valid: bool,
}

/// A parsed schema document.
#[derive(Debug, Clone)]
pub struct SchemaResource {
    uri: Url,
    root: Arc<Node>,
    /// Embedded resources and anchors, by absolute URI
    index: HashMap<Url, Arc<Node>>,
}

impl SchemaResource {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

/// Schema documents known to a template, by absolute URI.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    documents: HashMap<Url, Arc<Node>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    /// Parse a schema document.
    ///
    /// The document's URI is its `$id` resolved against `base`, or `base`
    /// itself. Identified documents, embedded resources and anchors are
    /// registered so later references can find them.
    pub fn parse_schema_resource(&mut self, schema: &Node, base: Option<&Url>) -> SchemaResult<SchemaResource> {
        if !matches!(schema, Node::Object(_) | Node::Bool(_)) {
            return Err(SchemaError::InvalidSchema(schema.kind()));
        }

        let id = schema.get("$id").and_then(Node::as_str);
        let uri = match (id, base) {
            (Some(id), base) => resolve_uri(base, id).map_err(|source| SchemaError::InvalidId {
                id: id.to_string(),
                source,
            })?,
            (None, Some(base)) => base.clone(),
            (None, None) => resolve_uri(None, ANONYMOUS_SCHEMA_URI).map_err(|source| SchemaError::InvalidId {
                id: ANONYMOUS_SCHEMA_URI.to_string(),
                source,
            })?,
        };
        let (uri, _) = split_fragment(&uri);

        let root = Arc::new(schema.clone());
        let mut index = HashMap::new();
        index_schema(&root, &uri, true, &mut index)?;

        let resource = SchemaResource { uri, root, index };
        if id.is_some() {
            self.register(&resource);
        } else {
            for (uri, node) in &resource.index {
                self.documents.insert(uri.clone(), Arc::clone(node));
            }
        }
        Ok(resource)
    }

    fn register(&mut self, resource: &SchemaResource) {
        debug!(uri = %resource.uri, "registering schema");
        self.documents.insert(resource.uri.clone(), Arc::clone(&resource.root));
        for (uri, node) in &resource.index {
            self.documents.insert(uri.clone(), Arc::clone(node));
        }
    }

    /// Load every document referenced by the schema that is not yet known,
    /// following references transitively.
    pub fn resolve_references(&mut self, resource: &SchemaResource, resources: &mut ResourceRegistry) -> SchemaResult<()> {
        let mut pending = Vec::new();
        collect_references(&resource.root, &resource.uri, &mut pending);

        let mut visited = HashSet::new();
        while let Some(reference) = pending.pop() {
            let (document, _) = split_fragment(&reference);
            if document == resource.uri
                || resource.index.contains_key(&document)
                || self.documents.contains_key(&document)
                || !visited.insert(document.clone())
            {
                continue;
            }

            let node = resources.fetch(&document).map_err(|source| SchemaError::Resource {
                uri: document.clone(),
                source,
            })?;
            let fetched = self.parse_schema_resource(&node, Some(&document))?;
            self.register(&fetched);
            // Also reachable by the URI it was fetched from
            self.documents.insert(document, Arc::clone(&fetched.root));
            collect_references(&fetched.root, &fetched.uri, &mut pending);
        }

        Ok(())
    }

    /// Validate an instance against a parsed schema.
    pub fn validate(&self, resource: &SchemaResource, instance: &Node, format_validation: bool) -> SchemaResult<OutputUnit> {
        let mut validator = Validator::new(self, resource).with_format_validation(format_validation);
        let valid = validator.validate(&resource.root, instance, &resource.uri)?;
        Ok(OutputUnit { valid })
    }

    /// Find the schema identified by an absolute URI, with a JSON pointer or
    /// anchor fragment.
    fn lookup<'a>(&'a self, resource: &'a SchemaResource, uri: &Url) -> Option<&'a Node> {
        if let Some(node) = resource.index.get(uri).or_else(|| self.documents.get(uri)) {
            return Some(node);
        }

        let (document, fragment) = split_fragment(uri);
        let root: &Node = if document == resource.uri {
            &resource.root
        } else {
            resource
                .index
                .get(&document)
                .or_else(|| self.documents.get(&document))?
        };

        if fragment.is_empty() || fragment.starts_with('/') {
            root.pointer(&fragment)
        } else {
            None
        }
    }
}

/// Record embedded `$id` resources and `$anchor`s of a schema.
fn index_schema(node: &Node, base: &Url, is_root: bool, index: &mut HashMap<Url, Arc<Node>>) -> SchemaResult<()> {
    let Node::Object(entries) = node else {
        if let Node::Array(items) = node {
            for item in items {
                index_schema(item, base, false, index)?;
            }
        }
        return Ok(());
    };

    let mut base = base.clone();
    if !is_root && let Some(id) = entries.get("$id").and_then(Node::as_str) {
        let uri = resolve_uri(Some(&base), id).map_err(|source| SchemaError::InvalidId {
            id: id.to_string(),
            source,
        })?;
        let (uri, _) = split_fragment(&uri);
        index.insert(uri.clone(), Arc::new(node.clone()));
        base = uri;
    }
    if let Some(anchor) = entries.get("$anchor").and_then(Node::as_str) {
        let mut uri = base.clone();
        uri.set_fragment(Some(anchor));
        index.insert(uri, Arc::new(node.clone()));
    }

    for (key, value) in entries {
        // Values of these keywords are data, not subschemas
        if matches!(key.as_str(), "const" | "enum" | "examples" | "default") {
            continue;
        }
        index_schema(value, &base, false, index)?;
    }
    Ok(())
}

/// Collect the absolute targets of every `$ref` in a schema.
fn collect_references(node: &Node, base: &Url, out: &mut Vec<Url>) {
    match node {
        Node::Object(entries) => {
            let mut base = base.clone();
            if let Some(id) = entries.get("$id").and_then(Node::as_str)
                && let Ok(uri) = resolve_uri(Some(&base), id)
            {
                base = uri;
            }
            if let Some(reference) = entries.get("$ref").and_then(Node::as_str)
                && let Ok(uri) = resolve_uri(Some(&base), reference)
            {
                out.push(uri);
            }
            for (key, value) in entries {
                if matches!(key.as_str(), "const" | "enum" | "examples" | "default") {
                    continue;
                }
                collect_references(value, &base, out);
            }
        }
        Node::Array(items) => {
            for item in items {
                collect_references(item, base, out);
            }
        }
        _ => {}
    }
}
