use crate::ast::{CompOp, Query};
use crate::node::Node;

/// A filter expression: the body of a `?` selector, or a predicate
/// expression evaluated directly against an argument.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalExpr {
    /// Logical OR (`||`)
    ///
    /// # Examples
    /// ```text
    /// @.role == "admin" || @.role == "mod"
    /// ```
    Or(Box<LogicalExpr>, Box<LogicalExpr>),

    /// Logical AND (`&&`)
    And(Box<LogicalExpr>, Box<LogicalExpr>),

    /// Logical NOT (`!`)
    Not(Box<LogicalExpr>),

    /// Comparison between two singular values
    ///
    /// # Examples
    /// ```text
    /// $.x == true
    /// length(@.name) > 3
    /// ```
    Comparison {
        op: CompOp,
        left: Comparable,
        right: Comparable,
    },

    /// Existence test or logical function call
    ///
    /// # Examples
    /// ```text
    /// @.email
    /// match(@.date, "1974-05-..")
    /// ```
    Test(TestExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestExpr {
    /// True when the query selects at least one node
    Query(Query),
    /// True when the function returns logical true
    Function(FunctionCall),
}

/// An operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    /// String, number, boolean or null literal
    Literal(Node),
    /// Singular query
    Query(Query),
    /// Function returning a value
    Function(FunctionCall),
}

/// A call to one of the built-in function extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<FunctionArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    Literal(Node),
    Query(Query),
    Logical(Box<LogicalExpr>),
    Function(FunctionCall),
}
