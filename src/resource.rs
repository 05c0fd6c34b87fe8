//! External resource resolution.
//!
//! This module provides the [`ResourceResolver`] trait used to load documents
//! referenced by `$include` directives and schema `$ref`s, a few resolver
//! implementations, and the [`ResourceRegistry`] that caches loaded documents
//! for the lifetime of a template.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::node::Node;

/// Errors raised while locating or loading a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid URI reference {reference:?}: {source}")]
    InvalidUri {
        reference: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Resource not found: {0}")]
    NotFound(Url),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {uri} as JSON: {source}")]
    Json {
        uri: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// Trait for loading external documents.
///
/// Implementations return `Ok(None)` when they have no document for the
/// given URI, and an error when a document exists but cannot be loaded.
pub trait ResourceResolver: Send + Sync {
    /// Load the document identified by an absolute URI without fragment.
    fn resolve(&self, uri: &Url) -> Result<Option<Node>, ResourceError>;
}

/// Resolver that returns nothing.
///
/// Templates parsed with this resolver can only include resources that
/// were registered up front.
#[derive(Debug, Clone, Default)]
pub struct NullResolver;

impl ResourceResolver for NullResolver {
    fn resolve(&self, _uri: &Url) -> Result<Option<Node>, ResourceError> {
        Ok(None)
    }
}

/// Resolver that serves documents from an in-memory map.
///
/// Useful for testing and for bundling documents into an application.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    documents: HashMap<String, Node>,
}

impl MemoryResolver {
    /// Create a new empty memory resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under an absolute URI.
    pub fn add(&mut self, uri: impl Into<String>, node: impl Into<Node>) -> &mut Self {
        self.documents.insert(uri.into(), node.into());
        self
    }

    /// Create a resolver with the given documents.
    pub fn with_documents(
        documents: impl IntoIterator<Item = (impl Into<String>, impl Into<Node>)>,
    ) -> Self {
        let mut resolver = Self::new();
        for (uri, node) in documents {
            resolver.add(uri, node);
        }
        resolver
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Node>, ResourceError> {
        Ok(self.documents.get(uri.as_str()).cloned())
    }
}

/// Resolver that loads JSON documents from `file:` URIs.
///
/// URIs with any other scheme are not found.
#[derive(Debug, Clone, Default)]
pub struct FileSystemResolver;

impl ResourceResolver for FileSystemResolver {
    fn resolve(&self, uri: &Url) -> Result<Option<Node>, ResourceError> {
        if uri.scheme() != "file" {
            return Ok(None);
        }
        let Ok(path) = uri.to_file_path() else {
            return Ok(None);
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ResourceError::Io { path, source }),
        };
        Node::from_json_str(&text)
            .map(Some)
            .map_err(|source| ResourceError::Json {
                uri: uri.clone(),
                source,
            })
    }
}

/// Resolve a URI reference against an optional base URI.
pub fn resolve_uri(base: Option<&Url>, reference: &str) -> Result<Url, ResourceError> {
    let resolved = match base {
        Some(base) => base.join(reference),
        None => Url::parse(reference),
    };
    resolved.map_err(|source| ResourceError::InvalidUri {
        reference: reference.to_string(),
        source,
    })
}

/// Split a URI into its document URI and decoded fragment.
pub fn split_fragment(uri: &Url) -> (Url, String) {
    let mut document = uri.clone();
    document.set_fragment(None);
    let fragment = uri.fragment().map(percent_decode).unwrap_or_default();
    (document, fragment)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| input.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                decoded.push(byte);
                i += 3;
            }
            None => {
                decoded.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Documents loaded for a template, keyed by URI without fragment.
#[derive(Clone)]
pub struct ResourceRegistry {
    resolver: Arc<dyn ResourceResolver>,
    documents: HashMap<Url, Arc<Node>>,
    parsed: HashSet<Url>,
}

impl ResourceRegistry {
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        ResourceRegistry {
            resolver,
            documents: HashMap::new(),
            parsed: HashSet::new(),
        }
    }

    /// Register a document, replacing any previous one with the same URI.
    pub fn insert(&mut self, uri: Url, node: Node) -> Arc<Node> {
        let (uri, _) = split_fragment(&uri);
        let node = Arc::new(node);
        self.documents.insert(uri, Arc::clone(&node));
        node
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<Node>> {
        let (uri, _) = split_fragment(uri);
        self.documents.get(&uri).cloned()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        let (uri, _) = split_fragment(uri);
        self.documents.contains_key(&uri)
    }

    /// Return a registered document, loading it through the resolver on
    /// first use.
    pub fn fetch(&mut self, uri: &Url) -> Result<Arc<Node>, ResourceError> {
        let (uri, _) = split_fragment(uri);
        if let Some(node) = self.documents.get(&uri) {
            return Ok(Arc::clone(node));
        }

        debug!(%uri, "fetching resource");
        match self.resolver.resolve(&uri)? {
            Some(node) => Ok(self.insert(uri, node)),
            None => Err(ResourceError::NotFound(uri)),
        }
    }

    /// Record that a document has been parsed as a template.
    ///
    /// Returns `false` if it was already parsed.
    pub fn mark_parsed(&mut self, uri: &Url) -> bool {
        let (uri, _) = split_fragment(uri);
        self.parsed.insert(uri)
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("parsed", &self.parsed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_resolver() {
        let uri = Url::parse("https://example.com/a.json").unwrap();
        assert!(NullResolver.resolve(&uri).unwrap().is_none());
    }

    #[test]
    fn test_memory_resolver() {
        let resolver = MemoryResolver::with_documents([("https://example.com/a.json", Node::from("a"))]);
        let uri = Url::parse("https://example.com/a.json").unwrap();
        assert_eq!(resolver.resolve(&uri).unwrap(), Some(Node::from("a")));
    }

    #[test]
    fn test_resolve_uri() {
        let base = Url::parse("https://example.com/forms/main.json").unwrap();
        assert_eq!(
            resolve_uri(Some(&base), "parts/user.json").unwrap().as_str(),
            "https://example.com/forms/parts/user.json"
        );
        assert!(resolve_uri(None, "parts/user.json").is_err());
    }

    #[test]
    fn test_split_fragment() {
        let uri = Url::parse("https://example.com/a.json#/$defs/a%20b").unwrap();
        let (document, fragment) = split_fragment(&uri);
        assert_eq!(document.as_str(), "https://example.com/a.json");
        assert_eq!(fragment, "/$defs/a b");
    }

    #[test]
    fn test_registry_fetch_caches() {
        let resolver = MemoryResolver::with_documents([("memory:///a.json", Node::from(1i64))]);
        let mut registry = ResourceRegistry::new(Arc::new(resolver));
        let uri = Url::parse("memory:///a.json#frag").unwrap();

        assert_eq!(*registry.fetch(&uri).unwrap(), Node::from(1i64));
        assert!(registry.contains(&uri));
        assert!(registry.mark_parsed(&uri));
        assert!(!registry.mark_parsed(&uri));

        let missing = Url::parse("memory:///b.json").unwrap();
        assert!(matches!(registry.fetch(&missing), Err(ResourceError::NotFound(_))));
    }
}
