//! Recursive-descent parser.
//!
//! ```text
//! or      := and ( '||' and )*
//! and     := eq ( '&&' eq )*
//! eq      := rel ( ( '===' | '!==' ) rel )*
//! rel     := unary ( ( '<' | '<=' | '>' | '>=' ) unary )?
//! unary   := '!' unary | primary
//! primary := literal | reference | '(' or ')'
//! reference := root ( '.' name | '[' index ']' )*
//! ```
//!
//! Every `!`, `(` and chained binary operator counts one level against
//! [`MAX_DEPTH`], which bounds the depth of the resulting tree.
use std::fmt;

use serde_json::Value;

use super::eval::EvalValue;
use super::lexer::{Spanned, Token, tokenize};
use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(EvalValue),
    Ref(Reference),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    State,
    Props,
    Env,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub root: Root,
    pub segments: Vec<Segment>,
}

impl Root {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "state" => Some(Root::State),
            "props" => Some(Root::Props),
            "env" => Some(Root::Env),
            "data" => Some(Root::Data),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Root::State => "state",
            Root::Props => "props",
            Root::Env => "env",
            Root::Data => "data",
        }
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Deepest nesting a parsed expression may have.
pub const MAX_DEPTH: usize = 128;

pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(ExprError::UnexpectedToken {
            pos: extra.pos,
            found: extra.token.describe(),
            expected: "end of expression",
        }),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|t| &t.token == token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Consumes `token` if it is next, returning its position.
    fn eat_at(&mut self, token: &Token) -> Option<usize> {
        let pos = self.peek().filter(|t| &t.token == token)?.pos;
        self.cursor += 1;
        Some(pos)
    }

    fn descend(&mut self, pos: usize) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { pos, limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ExprError> {
        match self.advance() {
            Some(t) if t.token == token => Ok(()),
            Some(t) => Err(ExprError::UnexpectedToken {
                pos: t.pos,
                found: t.token.describe(),
                expected,
            }),
            None => Err(ExprError::UnexpectedEnd { expected }),
        }
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut lhs = self.and()?;
        while let Some(pos) = self.eat_at(&Token::OrOr) {
            self.descend(pos)?;
            let rhs = self.and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        self.depth = start;
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut lhs = self.equality()?;
        while let Some(pos) = self.eat_at(&Token::AndAnd) {
            self.descend(pos)?;
            let rhs = self.equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        self.depth = start;
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut lhs = self.relational()?;
        loop {
            let (op, pos) = match self.peek() {
                Some(Spanned { token: Token::StrictEq, pos }) => (BinaryOp::StrictEq, *pos),
                Some(Spanned { token: Token::StrictNe, pos }) => (BinaryOp::StrictNe, *pos),
                _ => break,
            };
            self.cursor += 1;
            self.descend(pos)?;
            let rhs = self.relational()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = start;
        Ok(lhs)
    }

    fn relational(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.unary()?;
        let op = match self.peek().map(|t| &t.token) {
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.cursor += 1;
        let rhs = self.unary()?;
        Ok(binary(op, lhs, rhs))
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if let Some(pos) = self.eat_at(&Token::Bang) {
            self.descend(pos)?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        const EXPECTED: &str = "a value, reference or `(`";
        let Some(Spanned { token, pos }) = self.advance() else {
            return Err(ExprError::UnexpectedEnd { expected: EXPECTED });
        };
        match token {
            Token::Str(s) => Ok(Expr::Literal(EvalValue::Json(Value::String(s)))),
            Token::Num(n) => Ok(Expr::Literal(EvalValue::from_f64(n))),
            Token::LParen => {
                self.descend(pos)?;
                let inner = self.or()?;
                self.expect(Token::RParen, "`)`")?;
                self.depth -= 1;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(EvalValue::Json(Value::Bool(true)))),
                "false" => Ok(Expr::Literal(EvalValue::Json(Value::Bool(false)))),
                "null" => Ok(Expr::Literal(EvalValue::Json(Value::Null))),
                "undefined" => Ok(Expr::Literal(EvalValue::Undefined)),
                _ => match Root::from_name(&name) {
                    Some(root) => self.reference(root),
                    None => Err(ExprError::UnknownRoot { pos, name }),
                },
            },
            other => Err(ExprError::UnexpectedToken {
                pos,
                found: other.describe(),
                expected: EXPECTED,
            }),
        }
    }

    fn reference(&mut self, root: Root) -> Result<Expr, ExprError> {
        let mut segments = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Spanned { token: Token::Ident(name), .. }) => segments.push(Segment::Key(name)),
                    Some(Spanned { token: Token::Num(n), pos }) => segments.push(index_segment(n, pos)?),
                    Some(t) => {
                        return Err(ExprError::UnexpectedToken {
                            pos: t.pos,
                            found: t.token.describe(),
                            expected: "a property name",
                        });
                    }
                    None => return Err(ExprError::UnexpectedEnd { expected: "a property name" }),
                }
            } else if self.eat(&Token::LBracket) {
                match self.advance() {
                    Some(Spanned { token: Token::Num(n), pos }) => segments.push(index_segment(n, pos)?),
                    Some(Spanned { token: Token::Str(key), .. }) => segments.push(Segment::Key(key)),
                    Some(t) => {
                        return Err(ExprError::UnexpectedToken {
                            pos: t.pos,
                            found: t.token.describe(),
                            expected: "an index or quoted key",
                        });
                    }
                    None => return Err(ExprError::UnexpectedEnd { expected: "an index or quoted key" }),
                }
                self.expect(Token::RBracket, "`]`")?;
            } else {
                return Ok(Expr::Ref(Reference { root, segments }));
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn index_segment(n: f64, pos: usize) -> Result<Segment, ExprError> {
    if n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 {
        Ok(Segment::Index(n as usize))
    } else {
        Err(ExprError::InvalidNumber {
            pos,
            text: n.to_string(),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root.name())?;
        for segment in &self.segments {
            match segment {
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Ref(r) => write!(f, "{r}"),
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}
