// src/filter/tokenizer.rs
//
// Lexer for the offer filter language. Keywords, field names and operators are
// ASCII and case-sensitive.

use crate::filter::fields::{FilterField, Operator};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Field(FilterField),
    Operator(Operator),
    And,
    Or,
    Not,
    In,
    /// Unescaped contents of a single-quoted literal.
    String(String),
    /// Source text of a numeric literal; converted to a `Decimal` by the parser.
    Number(String),
    LParen,
    RParen,
    Comma,
    Eof,
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("unknown identifier '{name}' at offset {offset}")]
    UnknownIdentifier { name: String, offset: usize },
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
}

impl TokenizeError {
    pub fn offset(&self) -> usize {
        match self {
            TokenizeError::UnterminatedString { offset }
            | TokenizeError::UnknownIdentifier { offset, .. }
            | TokenizeError::UnexpectedCharacter { offset, .. } => *offset,
        }
    }
}

/// Tokenizes the whole input. The returned vector always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Tokenizer<'src> {
    source: &'src str,
    chars: Peekable<CharIndices<'src>>,
}

impl<'src> Tokenizer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn next_token(&mut self) -> Result<Token, TokenizeError> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some(&(offset, c)) = self.chars.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset: self.source.len(),
            });
        };

        let kind = match c {
            '(' => {
                self.chars.next();
                TokenKind::LParen
            }
            ')' => {
                self.chars.next();
                TokenKind::RParen
            }
            ',' => {
                self.chars.next();
                TokenKind::Comma
            }
            '\'' => self.scan_string(offset)?,
            c if c.is_ascii_digit() => self.scan_number(offset),
            '-' if self.digit_follows(offset) => self.scan_number(offset),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(offset)?,
            ch => return Err(TokenizeError::UnexpectedCharacter { ch, offset }),
        };

        Ok(Token { kind, offset })
    }

    fn digit_follows(&self, offset: usize) -> bool {
        self.source[offset + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn scan_string(&mut self, start: usize) -> Result<TokenKind, TokenizeError> {
        self.chars.next(); // opening quote
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' if self.chars.next_if(|&(_, n)| n == '\'').is_some() => value.push('\''),
                '\'' => return Ok(TokenKind::String(value)),
                c => value.push(c),
            }
        }
        Err(TokenizeError::UnterminatedString { offset: start })
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        self.chars.next_if(|&(_, c)| c == '-');
        self.consume_digits();

        // A '.' only belongs to the number when digits follow it.
        if let Some(&(dot, '.')) = self.chars.peek() {
            if self.digit_follows(dot) {
                self.chars.next();
                self.consume_digits();
            }
        }

        let end = self.position();
        TokenKind::Number(self.source[start..end].to_string())
    }

    fn scan_identifier(&mut self, start: usize) -> Result<TokenKind, TokenizeError> {
        while self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
            .is_some()
        {}
        let end = self.position();
        let source = self.source;
        let name = &source[start..end];

        let kind = match name {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            _ => {
                if let Some(field) = FilterField::from_name(name) {
                    TokenKind::Field(field)
                } else if let Some(op) = Operator::from_name(name) {
                    TokenKind::Operator(op)
                } else {
                    return Err(TokenizeError::UnknownIdentifier {
                        name: name.to_string(),
                        offset: start,
                    });
                }
            }
        };
        Ok(kind)
    }

    fn consume_digits(&mut self) {
        while self.chars.next_if(|&(_, c)| c.is_ascii_digit()).is_some() {}
    }

    fn position(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.source.len(), |&(offset, _)| offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_comparison_with_offsets() {
        let tokens = tokenize("uf eq 'SP'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token { kind: TokenKind::Field(FilterField::Uf), offset: 0 },
                Token { kind: TokenKind::Operator(Operator::Eq), offset: 3 },
                Token { kind: TokenKind::String("SP".to_string()), offset: 6 },
                Token { kind: TokenKind::Eof, offset: 10 },
            ]
        );
    }

    #[test]
    fn tokenizes_keywords_and_punctuation() {
        assert_eq!(
            kinds("not (city in ('A','B') or askingPrice le -10.5)"),
            vec![
                TokenKind::Not,
                TokenKind::LParen,
                TokenKind::Field(FilterField::City),
                TokenKind::In,
                TokenKind::LParen,
                TokenKind::String("A".to_string()),
                TokenKind::Comma,
                TokenKind::String("B".to_string()),
                TokenKind::RParen,
                TokenKind::Or,
                TokenKind::Field(FilterField::AskingPrice),
                TokenKind::Operator(Operator::Le),
                TokenKind::Number("-10.5".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn escaped_quote_stays_in_literal() {
        assert_eq!(
            kinds(r"address contains 'D\'Avila'"),
            vec![
                TokenKind::Field(FilterField::Address),
                TokenKind::Operator(Operator::Contains),
                TokenKind::String("D'Avila".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_opening_offset() {
        assert_eq!(
            tokenize("city eq 'Campinas"),
            Err(TokenizeError::UnterminatedString { offset: 8 })
        );
    }

    #[test]
    fn unknown_identifier_is_named() {
        let err = tokenize("price gt 10").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::UnknownIdentifier {
                name: "price".to_string(),
                offset: 0
            }
        );
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn rejects_unexpected_characters() {
        assert_eq!(
            tokenize("askingPrice > 10"),
            Err(TokenizeError::UnexpectedCharacter { ch: '>', offset: 12 })
        );
        assert_eq!(
            tokenize("askingPrice gt 1e5").unwrap_err(),
            TokenizeError::UnknownIdentifier {
                name: "e5".to_string(),
                offset: 16
            }
        );
        assert_eq!(
            tokenize("askingPrice gt - 5"),
            Err(TokenizeError::UnexpectedCharacter { ch: '-', offset: 15 })
        );
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        assert_eq!(
            tokenize("askingPrice gt 10."),
            Err(TokenizeError::UnexpectedCharacter { ch: '.', offset: 17 })
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }

    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "\\'"))
    }

    proptest! {
        #[test]
        fn literals_survive_tokenizing(
            field_idx in 0..FilterField::ALL.len(),
            op_idx in 0..Operator::ALL.len(),
            text in "[a-zA-Z0-9 ']{0,12}",
            int_part in 0u32..1_000_000,
        ) {
            let field = FilterField::ALL[field_idx];
            let op = Operator::ALL[op_idx];
            // Backslashes are excluded from `text`: only the quote escape is reversible.
            let input = format!("{field} {op} {} and {field} {op} {int_part}", quote(&text));
            let tokens = tokenize(&input).unwrap();

            prop_assert_eq!(&tokens[0].kind, &TokenKind::Field(field));
            prop_assert_eq!(&tokens[1].kind, &TokenKind::Operator(op));
            prop_assert_eq!(&tokens[2].kind, &TokenKind::String(text.clone()));
            prop_assert_eq!(&tokens[3].kind, &TokenKind::And);
            prop_assert_eq!(&tokens[6].kind, &TokenKind::Number(int_part.to_string()));
            prop_assert_eq!(&tokens[7].kind, &TokenKind::Eof);
        }
    }
}
