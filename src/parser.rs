use std::mem;

use thiserror::Error;

use crate::{
    ast::{
        Comparable, CompOp, FunctionArg, FunctionCall, LogicalExpr, Query, QueryRoot, Segment,
        SegmentKind, Selector, SingularExpression, TestExpr, Token,
    },
    lexer::{LexError, Lexer},
    node::Node,
};

/// An error raised while parsing a query or expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expected {expected}, got {found} at position {position}")]
    Unexpected {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("{message} at position {position}")]
    Invalid { message: String, position: usize },
}

/// The result kind of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Value,
    Logical,
}

fn function_type(name: &str) -> Option<FunctionType> {
    match name {
        "length" | "count" | "value" => Some(FunctionType::Value),
        "match" | "search" => Some(FunctionType::Logical),
        _ => None,
    }
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    token_position: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let token_position = lexer.position();
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            token_position,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.token_position = self.lexer.position();
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(expected.to_string()));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::Unexpected {
            expected: expected.into(),
            found: self.current_token.to_string(),
            position: self.token_position,
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            position: self.token_position,
        }
    }

    /// Parse a query that starts with the root identifier `$`.
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        self.expect(Token::Dollar)?;
        let segments = self.parse_segments()?;
        Ok(Query {
            root: QueryRoot::Root,
            segments,
        })
    }

    /// Parse a query whose root identifier may be omitted.
    ///
    /// `name.x`, `.name.x` and `["name"].x` are all read as `$.name.x`.
    pub fn parse_implicit_query(&mut self) -> Result<Query, ParseError> {
        let mut root = QueryRoot::Root;
        let mut segments = Vec::new();

        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Dollar => self.advance()?,
            Token::At => {
                self.advance()?;
                root = QueryRoot::Current;
            }
            token @ (Token::Identifier(_) | Token::Boolean(_) | Token::Null) => {
                self.advance()?;
                segments.push(Segment {
                    kind: SegmentKind::Child,
                    selectors: vec![Selector::Name(token.to_string())],
                });
            }
            token @ (Token::Dot | Token::DotDot | Token::LBracket) => {
                self.current_token = token;
            }
            token => {
                self.current_token = token;
                return Err(self.unexpected("query"));
            }
        }

        segments.extend(self.parse_segments()?);
        Ok(Query { root, segments })
    }

    fn parse_segments(&mut self) -> Result<Vec<Segment>, ParseError> {
        let mut segments = Vec::new();

        loop {
            let segment = match &self.current_token {
                Token::Dot => {
                    self.advance()?; // consume '.'
                    Segment {
                        kind: SegmentKind::Child,
                        selectors: vec![self.parse_shorthand_selector()?],
                    }
                }
                Token::DotDot => {
                    self.advance()?; // consume '..'
                    let selectors = if self.check(&Token::LBracket) {
                        self.parse_bracketed_selection()?
                    } else {
                        vec![self.parse_shorthand_selector()?]
                    };
                    Segment {
                        kind: SegmentKind::Descendant,
                        selectors,
                    }
                }
                Token::LBracket => Segment {
                    kind: SegmentKind::Child,
                    selectors: self.parse_bracketed_selection()?,
                },
                _ => break,
            };
            segments.push(segment);
        }

        Ok(segments)
    }

    /// Parse the selector after `.` or `..`: a member name or `*`.
    fn parse_shorthand_selector(&mut self) -> Result<Selector, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Star => {
                self.advance()?;
                Ok(Selector::Wildcard)
            }
            token @ (Token::Identifier(_) | Token::Boolean(_) | Token::Null) => {
                self.advance()?;
                Ok(Selector::Name(token.to_string()))
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("member name or '*'"))
            }
        }
    }

    fn parse_bracketed_selection(&mut self) -> Result<Vec<Selector>, ParseError> {
        self.expect(Token::LBracket)?;

        let mut selectors = vec![self.parse_selector()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            selectors.push(self.parse_selector()?);
        }

        self.expect(Token::RBracket)?;
        Ok(selectors)
    }

    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::String(name) => {
                self.advance()?;
                Ok(Selector::Name(name))
            }
            Token::Star => {
                self.advance()?;
                Ok(Selector::Wildcard)
            }
            Token::Question => {
                self.advance()?;
                let expr = self.parse_logical_or()?;
                Ok(Selector::Filter(Box::new(expr)))
            }
            Token::Integer(n) => {
                self.advance()?;
                if self.check(&Token::Colon) {
                    self.parse_slice(Some(n))
                } else {
                    Ok(Selector::Index(n))
                }
            }
            Token::Colon => {
                self.current_token = Token::Colon;
                self.parse_slice(None)
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("selector"))
            }
        }
    }

    /// Parse the remainder of a slice; the current token is the first ':'.
    fn parse_slice(&mut self, start: Option<i64>) -> Result<Selector, ParseError> {
        self.expect(Token::Colon)?;
        let end = self.parse_optional_integer()?;
        let step = if self.check(&Token::Colon) {
            self.advance()?;
            self.parse_optional_integer()?
        } else {
            None
        };
        Ok(Selector::Slice { start, end, step })
    }

    fn parse_optional_integer(&mut self) -> Result<Option<i64>, ParseError> {
        if let Token::Integer(n) = self.current_token {
            self.advance()?;
            Ok(Some(n))
        } else {
            Ok(None)
        }
    }

    // Filter expressions

    fn parse_logical_or(&mut self) -> Result<LogicalExpr, ParseError> {
        let first = self.parse_basic()?;
        self.parse_or_tail(first)
    }

    fn parse_or_tail(&mut self, first: LogicalExpr) -> Result<LogicalExpr, ParseError> {
        let mut left = self.parse_and_tail(first)?;

        while self.check(&Token::OrOr) {
            self.advance()?;
            let next = self.parse_basic()?;
            let right = self.parse_and_tail(next)?;
            left = LogicalExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_tail(&mut self, first: LogicalExpr) -> Result<LogicalExpr, ParseError> {
        let mut left = first;

        while self.check(&Token::AndAnd) {
            self.advance()?;
            let right = self.parse_basic()?;
            left = LogicalExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_basic(&mut self) -> Result<LogicalExpr, ParseError> {
        match &self.current_token {
            Token::Bang => {
                self.advance()?;
                let operand = self.parse_basic()?;
                Ok(LogicalExpr::Not(Box::new(operand)))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_logical_or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => {
                let operand = self.parse_comparable()?;
                if self.comparison_op().is_some() {
                    self.finish_comparison(operand)
                } else {
                    self.into_test(operand)
                }
            }
        }
    }

    fn comparison_op(&self) -> Option<CompOp> {
        match &self.current_token {
            Token::EqEq => Some(CompOp::Equal),
            Token::NotEq => Some(CompOp::NotEqual),
            Token::Lt => Some(CompOp::LessThan),
            Token::Gt => Some(CompOp::GreaterThan),
            Token::LtEq => Some(CompOp::LessEqual),
            Token::GtEq => Some(CompOp::GreaterEqual),
            _ => None,
        }
    }

    fn finish_comparison(&mut self, left: Comparable) -> Result<LogicalExpr, ParseError> {
        let op = self
            .comparison_op()
            .ok_or_else(|| self.unexpected("comparison operator"))?;
        self.advance()?;
        let right = self.parse_comparable()?;

        self.check_comparable(&left)?;
        self.check_comparable(&right)?;

        Ok(LogicalExpr::Comparison { op, left, right })
    }

    fn check_comparable(&self, operand: &Comparable) -> Result<(), ParseError> {
        match operand {
            Comparable::Query(query) if !query.is_singular() => {
                Err(self.invalid("Non-singular query in comparison"))
            }
            Comparable::Function(call) if function_type(&call.name) != Some(FunctionType::Value) => {
                Err(self.invalid(format!("Function {}() does not return a comparable value", call.name)))
            }
            _ => Ok(()),
        }
    }

    fn into_test(&self, operand: Comparable) -> Result<LogicalExpr, ParseError> {
        match operand {
            Comparable::Query(query) => Ok(LogicalExpr::Test(TestExpr::Query(query))),
            Comparable::Function(call) if function_type(&call.name) == Some(FunctionType::Logical) => {
                Ok(LogicalExpr::Test(TestExpr::Function(call)))
            }
            Comparable::Function(call) => {
                Err(self.invalid(format!("Function {}() result must be compared", call.name)))
            }
            Comparable::Literal(_) => Err(self.invalid("Literal must be compared")),
        }
    }

    fn parse_literal(&mut self) -> Result<Option<Node>, ParseError> {
        let literal = match &self.current_token {
            Token::String(s) => Node::String(s.clone()),
            Token::Integer(n) => Node::Number(*n as f64),
            Token::Float(n) => Node::Number(*n),
            Token::Boolean(b) => Node::Bool(*b),
            Token::Null => Node::Null,
            _ => return Ok(None),
        };
        self.advance()?;
        Ok(Some(literal))
    }

    fn parse_comparable(&mut self) -> Result<Comparable, ParseError> {
        if let Some(literal) = self.parse_literal()? {
            return Ok(Comparable::Literal(literal));
        }

        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Dollar => {
                self.advance()?;
                let segments = self.parse_segments()?;
                Ok(Comparable::Query(Query {
                    root: QueryRoot::Root,
                    segments,
                }))
            }
            Token::At => {
                self.advance()?;
                let segments = self.parse_segments()?;
                Ok(Comparable::Query(Query {
                    root: QueryRoot::Current,
                    segments,
                }))
            }
            Token::Identifier(name) => {
                self.advance()?;
                Ok(Comparable::Function(self.parse_function_call(name)?))
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("query, literal or function call"))
            }
        }
    }

    /// Parse the argument list of a function; the name is already consumed.
    fn parse_function_call(&mut self, name: String) -> Result<FunctionCall, ParseError> {
        if function_type(&name).is_none() {
            return Err(self.invalid(format!("Unknown function: {}", name)));
        }
        self.expect(Token::LParen)?;

        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_function_arg()?);
            while self.check(&Token::Comma) {
                self.advance()?;
                args.push(self.parse_function_arg()?);
            }
        }
        self.expect(Token::RParen)?;

        let call = FunctionCall { name, args };
        self.check_function_args(&call)?;
        Ok(call)
    }

    fn parse_function_arg(&mut self) -> Result<FunctionArg, ParseError> {
        if let Some(literal) = self.parse_literal()? {
            return Ok(FunctionArg::Literal(literal));
        }
        if self.check(&Token::Bang) || self.check(&Token::LParen) {
            return Ok(FunctionArg::Logical(Box::new(self.parse_logical_or()?)));
        }

        let operand = self.parse_comparable()?;
        if self.comparison_op().is_some() {
            let comparison = self.finish_comparison(operand)?;
            return Ok(FunctionArg::Logical(Box::new(self.parse_or_tail(comparison)?)));
        }
        if self.check(&Token::AndAnd) || self.check(&Token::OrOr) {
            let test = self.into_test(operand)?;
            return Ok(FunctionArg::Logical(Box::new(self.parse_or_tail(test)?)));
        }

        match operand {
            Comparable::Query(query) => Ok(FunctionArg::Query(query)),
            Comparable::Function(call) => Ok(FunctionArg::Function(call)),
            Comparable::Literal(literal) => Ok(FunctionArg::Literal(literal)),
        }
    }

    fn check_function_args(&self, call: &FunctionCall) -> Result<(), ParseError> {
        let arity = match call.name.as_str() {
            "match" | "search" => 2,
            _ => 1,
        };
        if call.args.len() != arity {
            return Err(self.invalid(format!(
                "Function {}() takes {} argument{}",
                call.name,
                arity,
                if arity == 1 { "" } else { "s" }
            )));
        }

        for arg in &call.args {
            let valid = match (call.name.as_str(), arg) {
                // count() and value() take node lists
                ("count" | "value", FunctionArg::Query(_)) => true,
                ("count" | "value", _) => false,
                (_, FunctionArg::Query(query)) => query.is_singular(),
                (_, FunctionArg::Function(inner)) => {
                    function_type(&inner.name) == Some(FunctionType::Value)
                }
                (_, FunctionArg::Literal(_)) => true,
                (_, FunctionArg::Logical(_)) => false,
            };
            if !valid {
                return Err(self.invalid(format!("Invalid argument to function {}()", call.name)));
            }
        }
        Ok(())
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.check(&Token::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}

/// Parse a query that must start with `$`.
///
/// # Examples
///
/// ```
/// use tool_form::parser::parse_query;
///
/// let query = parse_query("$.users[*].name").unwrap();
/// assert!(!query.is_singular());
/// ```
pub fn parse_query(input: &str) -> Result<Query, ParseError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    let query = parser.parse_query()?;
    parser.expect_end()?;
    Ok(query)
}

/// Parse a query with an optional root identifier.
pub fn parse_implicit_query(input: &str) -> Result<Query, ParseError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    let query = parser.parse_implicit_query()?;
    parser.expect_end()?;
    Ok(query)
}

/// Parse a singular expression: an implicit query followed by
/// `| name` transform pipes.
pub fn parse_singular_expression(input: &str) -> Result<SingularExpression, ParseError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    let query = parser.parse_implicit_query()?;

    let mut pipes = Vec::new();
    while parser.check(&Token::Pipe) {
        parser.advance()?;
        match mem::replace(&mut parser.current_token, Token::Eof) {
            Token::Identifier(name) => {
                parser.advance()?;
                pipes.push(name);
            }
            token => {
                parser.current_token = token;
                return Err(parser.unexpected("transform name"));
            }
        }
    }

    parser.expect_end()?;
    Ok(SingularExpression { query, pipes })
}

/// Parse a predicate: a logical expression evaluated against an argument.
///
/// # Examples
///
/// ```
/// use tool_form::parser::parse_predicate;
///
/// assert!(parse_predicate("$.x == true && !$.y").is_ok());
/// assert!(parse_predicate("$.x ==").is_err());
/// ```
pub fn parse_predicate(input: &str) -> Result<LogicalExpr, ParseError> {
    let mut parser = Parser::new(Lexer::new(input))?;
    let expr = parser.parse_logical_or()?;
    parser.expect_end()?;
    Ok(expr)
}
