//! Processing stack frames and error locations.
//!
//! Every structural descent (array element, object property, directive
//! argument, included resource) pushes a [`Frame`] for the dynamic extent of
//! processing that subtree. When an error is raised, the keys of the live
//! frames are collected into a [`Location`] describing where it happened.

use std::fmt;

use url::Url;

/// The key under which a node was reached from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKey {
    /// Array element index
    Index(usize),

    /// Object property name or directive name
    Key(String),
}

impl From<usize> for NodeKey {
    fn from(index: usize) -> Self {
        NodeKey::Index(index)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        NodeKey::Key(key.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        NodeKey::Key(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Index(index) => write!(f, "{}", index),
            // JSON pointer escaping
            NodeKey::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
        }
    }
}

/// A record on the processing stack.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// How this frame's node was reached from its parent; `None` for roots
    pub node_key: Option<NodeKey>,

    /// Base URI of the resource entered at this frame, if any
    pub base_uri: Option<Url>,
}

impl Frame {
    pub fn keyed(key: impl Into<NodeKey>) -> Self {
        Frame {
            node_key: Some(key.into()),
            base_uri: None,
        }
    }

    pub fn resource(base_uri: Url) -> Self {
        Frame {
            node_key: None,
            base_uri: Some(base_uri),
        }
    }
}

/// Path from the template root to the node being processed.
///
/// Displays as a JSON pointer fragment, e.g. `#/items/0/$each`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    keys: Vec<NodeKey>,
}

impl Location {
    pub fn new(keys: Vec<NodeKey>) -> Self {
        Location { keys }
    }

    /// Collect the keys of a frame stack, root first.
    pub fn from_frames(frames: &[Frame]) -> Self {
        Location {
            keys: frames.iter().filter_map(|frame| frame.node_key.clone()).collect(),
        }
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for key in &self.keys {
            write!(f, "/{}", key)?;
        }
        Ok(())
    }
}
