// src/filter/parser.rs
//
// Recursive-descent parser for filter expressions:
//
//   or         := and ('or' and)*
//   and        := not ('and' not)*
//   not        := 'not' not | primary
//   primary    := '(' or ')' | comparison
//   comparison := FIELD ( 'in' '(' value (',' value)* ')' | OPERATOR value )
//   value      := STRING | NUMBER
//
// Type checks happen while parsing, so a returned tree is always well-typed.

use crate::domain::Decimal;
use crate::filter::ast::{FilterNode, FilterValue};
use crate::filter::fields::{FieldType, FilterField};
use crate::filter::tokenizer::{tokenize, Token, TokenKind, TokenizeError};
use thiserror::Error;

/// Maximum parenthesis nesting accepted in one filter.
pub const MAX_NESTING_DEPTH: usize = 20;

/// Maximum number of field references, literal values and negations in one filter.
/// Caps the size of the tree and the number of bound parameters a translation produces.
pub const MAX_FILTER_TERMS: usize = 500;

/// Any lexical, syntactic or type error in a filter string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FilterParseError {
    pub message: String,
    pub offset: Option<usize>,
}

impl FilterParseError {
    fn at(offset: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

impl From<TokenizeError> for FilterParseError {
    fn from(err: TokenizeError) -> Self {
        Self::at(err.offset(), err.to_string())
    }
}

/// Parses a filter string into a typed tree. No partial tree is returned on error.
pub fn parse_filter(input: &str) -> Result<FilterNode, FilterParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        terms: 0,
    };

    let node = parser.parse_or()?;

    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(FilterParseError::at(
            trailing.offset,
            format!(
                "unexpected {} after end of expression",
                describe(&trailing.kind)
            ),
        ));
    }

    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    terms: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The tokenizer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, FilterParseError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(FilterParseError::at(
                token.offset,
                format!("expected {what} but found {}", describe(&token.kind)),
            ))
        }
    }

    fn count_term(&mut self, offset: usize) -> Result<(), FilterParseError> {
        self.terms += 1;
        if self.terms > MAX_FILTER_TERMS {
            return Err(FilterParseError::at(
                offset,
                format!("filter has more than {MAX_FILTER_TERMS} conditions"),
            ));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<FilterNode, FilterParseError> {
        let mut node = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            node = FilterNode::or(node, right);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<FilterNode, FilterParseError> {
        let mut node = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            node = FilterNode::and(node, right);
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<FilterNode, FilterParseError> {
        // Counted rather than recursed so a long run of `not` cannot grow the stack.
        let mut negations = 0usize;
        while self.peek().kind == TokenKind::Not {
            let token = self.advance();
            self.count_term(token.offset)?;
            negations += 1;
        }

        let mut node = self.parse_primary()?;
        for _ in 0..negations {
            node = FilterNode::negate(node);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<FilterNode, FilterParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => {
                self.advance();
                self.depth += 1;
                if self.depth > MAX_NESTING_DEPTH {
                    return Err(FilterParseError::at(
                        token.offset,
                        format!("filter nesting exceeds maximum depth of {MAX_NESTING_DEPTH}"),
                    ));
                }
                let node = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                self.depth -= 1;
                Ok(node)
            }
            TokenKind::Field(field) => {
                self.advance();
                self.count_term(token.offset)?;
                self.parse_comparison(field)
            }
            other => Err(FilterParseError::at(
                token.offset,
                format!(
                    "expected a field name or '(' but found {}",
                    describe(&other)
                ),
            )),
        }
    }

    fn parse_comparison(&mut self, field: FilterField) -> Result<FilterNode, FilterParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::In => {
                self.expect(TokenKind::LParen, "'(' after 'in'")?;
                let mut values = vec![self.parse_value(field)?];
                while self.eat(&TokenKind::Comma) {
                    values.push(self.parse_value(field)?);
                }
                self.expect(TokenKind::RParen, "')' to close the 'in' list")?;
                Ok(FilterNode::In { field, values })
            }
            TokenKind::Operator(operator) => {
                if operator.is_text_only() && field.field_type() == FieldType::Numeric {
                    return Err(FilterParseError::at(
                        token.offset,
                        format!("operator '{operator}' cannot be used with numeric field '{field}'"),
                    ));
                }
                let value = self.parse_value(field)?;
                Ok(FilterNode::Comparison {
                    field,
                    operator,
                    value,
                })
            }
            other => Err(FilterParseError::at(
                token.offset,
                format!(
                    "expected an operator or 'in' after '{field}' but found {}",
                    describe(&other)
                ),
            )),
        }
    }

    fn parse_value(&mut self, field: FilterField) -> Result<FilterValue, FilterParseError> {
        let token = self.advance();
        self.count_term(token.offset)?;
        let value = match token.kind {
            TokenKind::String(s) => FilterValue::Text(s),
            TokenKind::Number(raw) => {
                let number = Decimal::parse(&raw)
                    .map_err(|e| FilterParseError::at(token.offset, e.to_string()))?;
                FilterValue::Number(number)
            }
            other => {
                return Err(FilterParseError::at(
                    token.offset,
                    format!("expected a value but found {}", describe(&other)),
                ))
            }
        };

        let expected = field.field_type();
        if value.value_type() != expected {
            return Err(FilterParseError::at(
                token.offset,
                format!(
                    "field '{field}' is {expected} but the value {value} is {}",
                    value.value_type()
                ),
            ));
        }
        Ok(value)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Field(field) => format!("field '{field}'"),
        TokenKind::Operator(op) => format!("operator '{op}'"),
        TokenKind::And => "'and'".to_string(),
        TokenKind::Or => "'or'".to_string(),
        TokenKind::Not => "'not'".to_string(),
        TokenKind::In => "'in'".to_string(),
        TokenKind::String(s) => format!("string '{s}'"),
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}
