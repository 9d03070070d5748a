//! Recursive-descent parser with standard precedence climbing:
//! ternary < `||` < `&&` < equality < relational < additive < multiplicative
//! < unary < postfix (member/index/call) < primary.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExpressionError, ExpressionResult};
use crate::lexer::{Lexer, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(source: &str) -> ExpressionResult<Expr> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        let expr = parser.parse_ternary()?;
        parser.expect(Token::Eof, "end of expression")?;
        Ok(expr)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: Token, what: &str) -> ExpressionResult<()> {
        if *self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(ExpressionError::Syntax {
                offset: self.pos,
                message: format!("expected {what}"),
            })
        }
    }

    fn parse_ternary(&mut self) -> ExpressionResult<Expr> {
        let cond = self.parse_or()?;
        if *self.peek() == Token::Question {
            self.bump();
            let then_branch = self.parse_ternary()?;
            self.expect(Token::Colon, "':' in ternary expression")?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::OrOr {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while *self.peek() == Token::AndAnd {
            self.bump();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ExpressionResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ExpressionResult<Expr> {
        match self.peek() {
            Token::Minus => {
                self.bump();
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Token::Bang => {
                self.bump();
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> ExpressionResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.bump();
                    let name = match self.bump() {
                        Token::Ident(name) => name,
                        other => {
                            return Err(ExpressionError::Syntax {
                                offset: self.pos,
                                message: format!("expected property name, found {other:?}"),
                            })
                        }
                    };
                    expr = Expr::Member(Box::new(expr), name);
                }
                Token::LBracket => {
                    self.bump();
                    let index = self.parse_ternary()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ExpressionResult<Expr> {
        match self.bump() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Bool(b) => Ok(Expr::Bool(b)),
            Token::Null => Ok(Expr::Null),
            Token::Root(kind) => Ok(Expr::Root(kind)),
            Token::LParen => {
                let expr = self.parse_ternary()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if *self.peek() != Token::RBracket {
                    loop {
                        items.push(self.parse_ternary()?);
                        if *self.peek() == Token::Comma {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket, "']'")?;
                Ok(Expr::Array(items))
            }
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    self.bump();
                    let mut args = Vec::new();
                    if *self.peek() != Token::RParen {
                        loop {
                            args.push(self.parse_ternary()?);
                            if *self.peek() == Token::Comma {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RParen, "')'")?;
                    Ok(Expr::Call(name, args))
                } else {
                    Err(ExpressionError::UndefinedAccessor(name))
                }
            }
            other => Err(ExpressionError::Syntax {
                offset: self.pos,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }
}
