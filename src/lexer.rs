use thiserror::Error;

use crate::ast::Token;

/// An error raised while tokenizing a query.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Character offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_name_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('b') => result.push('\u{08}'),
                        Some('f') => result.push('\u{0c}'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('/') => result.push('/'),
                        Some('\\') => result.push('\\'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('u') => {
                            let c = self.read_unicode_escape()?;
                            result.push(c);
                            continue;
                        }
                        Some(ch) => return Err(self.error(format!("Invalid escape sequence: \\{}", ch))),
                        None => return Err(self.error("Unterminated string: unexpected end of input after backslash")),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error("Unterminated string: missing closing quote"))
    }

    /// Read the `uXXXX` part of an escape, combining surrogate pairs.
    fn read_unicode_escape(&mut self) -> Result<char, LexError> {
        let high = self.read_hex4()?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| self.error("Invalid unicode escape"));
        }

        if self.current_char() != Some('\\') || self.peek_char(1) != Some('u') {
            return Err(self.error("Unpaired surrogate in unicode escape"));
        }
        self.advance();
        let low = self.read_hex4()?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.error("Unpaired surrogate in unicode escape"));
        }

        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(|| self.error("Invalid unicode escape"))
    }

    fn read_hex4(&mut self) -> Result<u32, LexError> {
        self.advance(); // Consume 'u'
        let mut code = 0;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Invalid unicode escape"))?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && self.exponent_follows() {
                is_float = true;
                number.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("Invalid number: {}", number)))
        } else {
            match number.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // Out of i64 range; keep the value as a float
                Err(_) => number
                    .parse::<f64>()
                    .map(Token::Float)
                    .map_err(|_| self.error(format!("Invalid number: {}", number))),
            }
        }
    }

    fn exponent_follows(&self) -> bool {
        match self.peek_char(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self.peek_char(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('$') => {
                self.advance();
                Token::Dollar
            }
            Some('@') => {
                self.advance();
                Token::At
            }
            Some('.') => {
                if self.peek_char(1) == Some('.') {
                    self.advance();
                    self.advance();
                    Token::DotDot
                } else {
                    self.advance();
                    Token::Dot
                }
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('?') => {
                self.advance();
                Token::Question
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.advance();
                    self.advance();
                    Token::OrOr
                } else {
                    self.advance();
                    Token::Pipe
                }
            }
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.advance();
                    self.advance();
                    Token::AndAnd
                } else {
                    return Err(self.error("Unexpected '&' (did you mean '&&'?)"));
                }
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::EqEq
                } else {
                    return Err(self.error("Unexpected '=' (did you mean '=='?)"));
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::NotEq
                } else {
                    self.advance();
                    Token::Bang
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::LtEq
                } else {
                    self.advance();
                    Token::Lt
                }
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some('-') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) if is_name_first(ch) => {
                let ident = self.read_identifier();

                match ident.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) => return Err(self.error(format!("Unexpected character '{}'", ch))),
        };

        Ok(token)
    }
}

fn is_name_first(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    is_name_first(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token == Token::Eof {
            return tokens;
        }
        tokens.push(token);
    }
}

#[test]
fn test_keywords() {
    assert_eq!(
        tokenize("true false null"),
        vec![Token::Boolean(true), Token::Boolean(false), Token::Null]
    );
}

#[test]
fn test_segments() {
    assert_eq!(
        tokenize("$..items[?@.price >= 5]"),
        vec![
            Token::Dollar,
            Token::DotDot,
            Token::Identifier("items".to_string()),
            Token::LBracket,
            Token::Question,
            Token::At,
            Token::Dot,
            Token::Identifier("price".to_string()),
            Token::GtEq,
            Token::Integer(5),
            Token::RBracket,
        ]
    );
}

#[test]
fn test_pipe_and_or() {
    assert_eq!(
        tokenize("$.tags | sort || &&"),
        vec![
            Token::Dollar,
            Token::Dot,
            Token::Identifier("tags".to_string()),
            Token::Pipe,
            Token::Identifier("sort".to_string()),
            Token::OrOr,
            Token::AndAnd,
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        tokenize("-1 2.5 1e3 -0.5E-2"),
        vec![
            Token::Integer(-1),
            Token::Float(2.5),
            Token::Float(1000.0),
            Token::Float(-0.005),
        ]
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        tokenize(r#"'it\'s' "a\tb" "é🚀""#),
        vec![
            Token::String("it's".to_string()),
            Token::String("a\tb".to_string()),
            Token::String("é🚀".to_string()),
        ]
    );
}

#[test]
fn test_errors() {
    let mut lexer = Lexer::new("$.a = 1");
    assert_eq!(lexer.next_token(), Ok(Token::Dollar));
    assert_eq!(lexer.next_token(), Ok(Token::Dot));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("a".to_string())));
    assert_eq!(lexer.next_token().unwrap_err().position, 4);

    let mut lexer = Lexer::new("'open");
    assert!(lexer.next_token().is_err());
}
