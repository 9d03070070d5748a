//! Tokenizer for the expression grammar.

use crate::error::{ExpressionError, ExpressionResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Root(crate::ast::RootKind),
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    pub fn tokenize(mut self) -> ExpressionResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Token::Eof);
                break;
            };

            let token = match c {
                '$' => self.lex_root()?,
                '"' | '\'' => self.lex_string(c)?,
                c if c.is_ascii_digit() => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => self.lex_ident(),
                '.' => {
                    self.bump();
                    Token::Dot
                }
                ',' => {
                    self.bump();
                    Token::Comma
                }
                '(' => {
                    self.bump();
                    Token::LParen
                }
                ')' => {
                    self.bump();
                    Token::RParen
                }
                '[' => {
                    self.bump();
                    Token::LBracket
                }
                ']' => {
                    self.bump();
                    Token::RBracket
                }
                '?' => {
                    self.bump();
                    Token::Question
                }
                ':' => {
                    self.bump();
                    Token::Colon
                }
                '+' => {
                    self.bump();
                    Token::Plus
                }
                '-' => {
                    self.bump();
                    Token::Minus
                }
                '*' => {
                    self.bump();
                    Token::Star
                }
                '/' => {
                    self.bump();
                    Token::Slash
                }
                '%' => {
                    self.bump();
                    Token::Percent
                }
                '=' if self.peek_at(1) == Some('=') => {
                    self.bump();
                    self.bump();
                    Token::EqEq
                }
                '!' if self.peek_at(1) == Some('=') => {
                    self.bump();
                    self.bump();
                    Token::NotEq
                }
                '!' => {
                    self.bump();
                    Token::Bang
                }
                '<' if self.peek_at(1) == Some('=') => {
                    self.bump();
                    self.bump();
                    Token::LtEq
                }
                '<' => {
                    self.bump();
                    Token::Lt
                }
                '>' if self.peek_at(1) == Some('=') => {
                    self.bump();
                    self.bump();
                    Token::GtEq
                }
                '>' => {
                    self.bump();
                    Token::Gt
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.bump();
                    self.bump();
                    Token::AndAnd
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.bump();
                    self.bump();
                    Token::OrOr
                }
                other => {
                    return Err(ExpressionError::Syntax {
                        offset: start,
                        message: format!("unexpected character '{other}'"),
                    })
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn lex_root(&mut self) -> ExpressionResult<Token> {
        let start = self.pos;
        self.bump(); // consume '$'
        let ident_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[ident_start..self.pos].iter().collect();
        match name.as_str() {
            "node" => Ok(Token::Root(crate::ast::RootKind::Node)),
            "workflow" => Ok(Token::Root(crate::ast::RootKind::Workflow)),
            "env" => Ok(Token::Root(crate::ast::RootKind::Env)),
            "json" => Ok(Token::Root(crate::ast::RootKind::Json)),
            _ => Err(ExpressionError::UndefinedAccessor(format!("${name}")).into_syntax(start)),
        }
    }

    fn lex_string(&mut self, quote: char) -> ExpressionResult<Token> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ExpressionError::Syntax {
                        offset: start,
                        message: "unterminated string literal".into(),
                    })
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some(c) if c == quote => out.push(quote),
                    Some(other) => out.push(other),
                    None => {
                        return Err(ExpressionError::Syntax {
                            offset: start,
                            message: "unterminated escape sequence".into(),
                        })
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(Token::Str(out))
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Token::Number(text.parse().unwrap_or(0.0))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "null" => Token::Null,
            _ => Token::Ident(text),
        }
    }

    pub fn source(&self) -> &str {
        self.source
    }
}

trait IntoSyntax {
    fn into_syntax(self, offset: usize) -> ExpressionError;
}

impl IntoSyntax for ExpressionError {
    fn into_syntax(self, offset: usize) -> ExpressionError {
        match self {
            ExpressionError::UndefinedAccessor(msg) => ExpressionError::Syntax {
                offset,
                message: format!("undefined accessor: {msg}"),
            },
            other => other,
        }
    }
}
