use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -1.5e3
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -1
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'item #1'
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    // Identifiers and References
    /// Member name or function name
    ///
    /// Must start with a letter, underscore, or non-ASCII character.
    ///
    /// # Examples
    /// ```text
    /// user
    /// item_count
    /// length
    /// ```
    Identifier(String),

    /// Root node identifier
    ///
    /// # Examples
    /// ```text
    /// $
    /// $.items[0]
    /// ```
    Dollar,

    /// Current node identifier, valid inside filter selectors
    ///
    /// # Examples
    /// ```text
    /// $.items[?@.price > 10]
    /// ```
    At,

    /// Child segment shorthand
    Dot,

    /// Descendant segment
    ///
    /// # Examples
    /// ```text
    /// $..name
    /// $..[0]
    /// ```
    DotDot,

    /// Wildcard selector
    Star,

    /// Filter selector prefix
    Question,

    /// Transform pipe in singular expressions
    ///
    /// # Examples
    /// ```text
    /// $.tags | sort | first
    /// ```
    Pipe,

    // Operators
    /// Equal (`==`)
    EqEq,

    /// Not equal (`!=`)
    NotEq,

    /// Less than (`<`)
    Lt,

    /// Less than or equal (`<=`)
    LtEq,

    /// Greater than (`>`)
    Gt,

    /// Greater than or equal (`>=`)
    GtEq,

    /// Logical NOT (`!`)
    Bang,

    /// Logical AND (`&&`)
    AndAnd,

    /// Logical OR (`||`)
    OrOr,

    // Delimiters
    /// Left bracket for bracketed selections
    LBracket,

    /// Right bracket
    RBracket,

    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Comma for separating selectors or function arguments
    Comma,

    /// Colon for slice selectors
    Colon,

    /// End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(n) => write!(f, "{}", n),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Null => write!(f, "null"),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Dollar => write!(f, "$"),
            Token::At => write!(f, "@"),
            Token::Dot => write!(f, "."),
            Token::DotDot => write!(f, ".."),
            Token::Star => write!(f, "*"),
            Token::Question => write!(f, "?"),
            Token::Pipe => write!(f, "|"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Bang => write!(f, "!"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}
