use crate::ast::LogicalExpr;

/// A parsed query: an identifier followed by zero or more segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub root: QueryRoot,
    pub segments: Vec<Segment>,
}

/// The node a query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRoot {
    /// Root node (`$`)
    Root,
    /// Current node (`@`), the element under test in a filter
    Current,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Selects children of each input node (`.name`, `[...]`)
    Child,
    /// Selects from each input node and all of its descendants (`..name`, `..[...]`)
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Object member by name
    Name(String),

    /// All array elements or object member values
    Wildcard,

    /// Array element; negative values count from the end
    Index(i64),

    /// Array slice (`start:end:step`)
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },

    /// Children for which the expression holds
    Filter(Box<LogicalExpr>),
}

impl Query {
    /// The root query `$` with no segments.
    pub fn root() -> Self {
        Query {
            root: QueryRoot::Root,
            segments: Vec::new(),
        }
    }

    /// Whether the query can select at most one node.
    ///
    /// A singular query consists only of child segments holding a single
    /// name or index selector.
    pub fn is_singular(&self) -> bool {
        self.segments.iter().all(|segment| {
            segment.kind == SegmentKind::Child
                && matches!(
                    segment.selectors.as_slice(),
                    [Selector::Name(_)] | [Selector::Index(_)]
                )
        })
    }
}

/// A singular query followed by named transforms (`$.tags | sort | first`).
#[derive(Debug, Clone, PartialEq)]
pub struct SingularExpression {
    pub query: Query,
    pub pipes: Vec<String>,
}
