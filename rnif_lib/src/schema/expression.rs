//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with the small expression language used by the `cond`, `arr1` and `arr2`
//! attributes of the format descriptor.
//!
//! Expressions are parsed once when the descriptor is loaded, and evaluated against
//! the fields of the record being decoded. Identifiers may contain spaces, as they
//! reference fields by their descriptor name (`User Version &gt;= 10`).

use serde_derive::{Deserialize, Serialize};

use crate::error::{Result, RNifError};
use crate::schema::{name_attribute, version_number};

//---------------------------------------------------------------------------//
//                              Enum & Structs
//---------------------------------------------------------------------------//

/// A parsed field expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expression {

    /// A numeric literal, including version literals like `4.2.2.0`.
    Literal(i64),

    /// A reference to an already-read field, by identifier.
    Ident(String),

    /// Logical negation.
    Not(Box<Expression>),

    /// A binary operation.
    Binary(Operator, Box<Expression>, Box<Expression>),
}

/// The binary operators the expression language supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    Add,
    Sub,
}

/// The tokens the parser works on.
#[derive(Clone, Debug, PartialEq)]
enum Token {
    Operand(String),
    Operator(Operator),
    Not,
    Open,
    Close,
}

//---------------------------------------------------------------------------//
//                              Implementations
//---------------------------------------------------------------------------//

impl Expression {

    /// This function parses the provided source string into an expression tree.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source).map_err(|error| RNifError::SchemaMalformedExpression(source.to_owned(), error))?;
        let mut parser = Parser { tokens, pos: 0 };
        let expression = parser.or_expression().map_err(|error| RNifError::SchemaMalformedExpression(source.to_owned(), error))?;

        if parser.pos != parser.tokens.len() {
            return Err(RNifError::SchemaMalformedExpression(source.to_owned(), "trailing tokens".to_owned()));
        }

        Ok(expression)
    }

    /// This function evaluates the expression against the provided field resolver.
    ///
    /// Booleans are the integers 0 and 1. `scope` is only used to report which record
    /// a failed identifier lookup belongs to.
    pub fn eval(&self, scope: &str, lookup: &dyn Fn(&str) -> Option<i64>) -> Result<i64> {
        Ok(match self {
            Self::Literal(value) => *value,
            Self::Ident(ident) => lookup(ident).ok_or_else(|| RNifError::SchemaUnknownIdentifier(scope.to_owned(), ident.to_owned()))?,
            Self::Not(inner) => i64::from(inner.eval(scope, lookup)? == 0),
            Self::Binary(operator, lhs, rhs) => {
                let lhs = lhs.eval(scope, lookup)?;

                // Short-circuit the logical operators before touching the right side.
                match operator {
                    Operator::And if lhs == 0 => return Ok(0),
                    Operator::Or if lhs != 0 => return Ok(1),
                    _ => {}
                }

                let rhs = rhs.eval(scope, lookup)?;
                match operator {
                    Operator::Eq => i64::from(lhs == rhs),
                    Operator::Ne => i64::from(lhs != rhs),
                    Operator::Lt => i64::from(lhs < rhs),
                    Operator::Le => i64::from(lhs <= rhs),
                    Operator::Gt => i64::from(lhs > rhs),
                    Operator::Ge => i64::from(lhs >= rhs),
                    Operator::And => i64::from(rhs != 0),
                    Operator::Or => i64::from(rhs != 0),
                    Operator::BitAnd => lhs & rhs,
                    Operator::BitOr => lhs | rhs,
                    Operator::Add => lhs + rhs,
                    Operator::Sub => lhs - rhs,
                }
            }
        })
    }

    /// This function collects every identifier referenced by the expression.
    pub fn idents<'a>(&'a self, idents: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Ident(ident) => idents.push(ident),
            Self::Not(inner) => inner.idents(idents),
            Self::Binary(_, lhs, rhs) => {
                lhs.idents(idents);
                rhs.idents(idents);
            }
        }
    }

    /// This function returns the referenced field identifier if the expression is a plain field reference.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

//---------------------------------------------------------------------------//
//                          Tokenizer & Parser
//---------------------------------------------------------------------------//

/// This function splits the source into tokens. Any maximal run of characters that
/// is not an operator or a parenthesis is an operand.
fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = vec![];
    let mut operand = String::new();
    let chars = source.chars().collect::<Vec<_>>();
    let mut pos = 0;

    while pos < chars.len() {
        let rest = &chars[pos..];
        let two = rest.iter().take(2).collect::<String>();

        let (token, advance) = match two.as_str() {
            "&&" => (Some(Token::Operator(Operator::And)), 2),
            "||" => (Some(Token::Operator(Operator::Or)), 2),
            "==" => (Some(Token::Operator(Operator::Eq)), 2),
            "!=" => (Some(Token::Operator(Operator::Ne)), 2),
            "<=" => (Some(Token::Operator(Operator::Le)), 2),
            ">=" => (Some(Token::Operator(Operator::Ge)), 2),
            _ => match rest[0] {
                '&' => (Some(Token::Operator(Operator::BitAnd)), 1),
                '|' => (Some(Token::Operator(Operator::BitOr)), 1),
                '<' => (Some(Token::Operator(Operator::Lt)), 1),
                '>' => (Some(Token::Operator(Operator::Gt)), 1),
                '+' => (Some(Token::Operator(Operator::Add)), 1),
                '-' => (Some(Token::Operator(Operator::Sub)), 1),
                '!' => (Some(Token::Not), 1),
                '(' => (Some(Token::Open), 1),
                ')' => (Some(Token::Close), 1),
                _ => (None, 1),
            }
        };

        match token {
            Some(token) => {
                push_operand(&mut tokens, &mut operand)?;
                tokens.push(token);
            }
            None => operand.push(rest[0]),
        }

        pos += advance;
    }

    push_operand(&mut tokens, &mut operand)?;
    Ok(tokens)
}

/// This function classifies a pending operand as a literal, a version literal or an identifier.
fn push_operand(tokens: &mut Vec<Token>, operand: &mut String) -> std::result::Result<(), String> {
    let trimmed = operand.trim();
    if trimmed.is_empty() {
        operand.clear();
        return Ok(());
    }

    let token = if let Some(hex) = trimmed.strip_prefix("0x") {
        let value = i64::from_str_radix(hex, 16).map_err(|_| format!("invalid hex literal \"{trimmed}\""))?;
        Token::Operand(value.to_string())
    } else if trimmed.chars().all(|c| c.is_ascii_digit()) {
        Token::Operand(trimmed.to_owned())
    } else if trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let value = version_number(trimmed).ok_or_else(|| format!("invalid version literal \"{trimmed}\""))?;
        Token::Operand(value.to_string())
    } else {
        Token::Operand(format!("#{trimmed}"))
    };

    tokens.push(token);
    operand.clear();
    Ok(())
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {

    fn or_expression(&mut self) -> std::result::Result<Expression, String> {
        let mut lhs = self.and_expression()?;
        while self.eat(&Token::Operator(Operator::Or)) {
            let rhs = self.and_expression()?;
            lhs = Expression::Binary(Operator::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expression(&mut self) -> std::result::Result<Expression, String> {
        let mut lhs = self.bit_expression()?;
        while self.eat(&Token::Operator(Operator::And)) {
            let rhs = self.bit_expression()?;
            lhs = Expression::Binary(Operator::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn bit_expression(&mut self) -> std::result::Result<Expression, String> {
        let mut lhs = self.comparison()?;
        loop {
            if self.eat(&Token::Operator(Operator::BitOr)) {
                let rhs = self.comparison()?;
                lhs = Expression::Binary(Operator::BitOr, Box::new(lhs), Box::new(rhs));
            } else if self.eat(&Token::Operator(Operator::BitAnd)) {
                let rhs = self.comparison()?;
                lhs = Expression::Binary(Operator::BitAnd, Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn comparison(&mut self) -> std::result::Result<Expression, String> {
        let mut lhs = self.additive()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Operator(operator @ (Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge))) => *operator,
                _ => return Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expression::Binary(operator, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> std::result::Result<Expression, String> {
        let mut lhs = self.unary()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Operator(operator @ (Operator::Add | Operator::Sub))) => *operator,
                _ => return Ok(lhs),
            };

            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expression::Binary(operator, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> std::result::Result<Expression, String> {
        if self.eat(&Token::Not) {
            return Ok(Expression::Not(Box::new(self.unary()?)));
        }

        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<Expression, String> {
        match self.peek().cloned() {
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.or_expression()?;
                if !self.eat(&Token::Close) {
                    return Err("unclosed parenthesis".to_owned());
                }
                Ok(inner)
            }
            Some(Token::Operand(operand)) => {
                self.pos += 1;
                match operand.strip_prefix('#') {
                    Some(name) => Ok(Expression::Ident(name_attribute(name))),
                    None => Ok(Expression::Literal(operand.parse().map_err(|_| format!("invalid literal \"{operand}\""))?)),
                }
            }
            _ => Err("expected an operand".to_owned()),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}
