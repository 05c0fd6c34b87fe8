//! # Query Language - Abstract Syntax Tree
//!
//! This module defines the syntax tree for the query language used by
//! template expressions: a JSONPath dialect following RFC 9535.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[query]** - Queries, segments and selectors
//! - **[expressions]** - Filter expressions and function calls
//! - **[operators]** - Comparison operators
//!
//! ## Quick Start
//!
//! ```text
//! $.users[?@.active == true].name
//! ```
//!
//! This query selects the names of all active users.
//!
//! ## Core Concepts
//!
//! ### Identifiers
//!
//! - `$` refers to the query argument, the value a template is applied to
//! - `@` refers to the node under test inside a filter selector
//!
//! ### Segments
//!
//! - `.name`, `['name']` - member of an object
//! - `[0]`, `[-1]` - element of an array, negative indices count from the end
//! - `[1:3]`, `[::-1]` - array slice
//! - `.*`, `[*]` - every element or member value
//! - `[?expr]` - elements or member values for which `expr` holds
//! - `..name` - descendant segment
//!
//! ### Singular Queries
//!
//! A query made only of name and index selectors selects at most one node.
//! Template directives such as `$` and string interpolation evaluate
//! singular expressions, optionally piped through named transforms:
//!
//! ```text
//! $.tags | sort | first
//! ```
//!
//! ### Implicit Roots
//!
//! Singular expressions may omit the leading `$` and the dot of the first
//! segment, so `user.name` is read as `$.user.name`.
//!
//! ### Functions
//!
//! Filter expressions may call `length`, `count`, `match`, `search` and
//! `value`:
//!
//! ```text
//! $.items[?length(@.tags) > 2 && search(@.title, "[Rr]ust")]
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod query;

pub use tokens::Token;
pub use expressions::{Comparable, FunctionArg, FunctionCall, LogicalExpr, TestExpr};
pub use operators::CompOp;
pub use query::{Query, QueryRoot, Segment, SegmentKind, Selector, SingularExpression};
