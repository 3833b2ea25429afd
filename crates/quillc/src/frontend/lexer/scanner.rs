//! Quill lexer implementation using logos

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};
use logos::Logos;
use std::collections::VecDeque;

/// Lexer for Quill source code
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    /// Buffer for peeked tokens (supports 2-token lookahead)
    peeked: VecDeque<Token>,
    /// End offset of the last scanned token
    last_end: usize,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            peeked: VecDeque::new(),
            last_end: 0,
            at_eof: false,
        }
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        if let Some(token) = self.peeked.pop_front() {
            return Ok(token);
        }
        self.scan_token()
    }

    fn scan_token(&mut self) -> CompileResult<Token> {
        let source = self.inner.source();
        if self.at_eof {
            let len = source.len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => {
                let range = self.inner.span();
                let mut token = Token::new(kind, Span::new(range.start, range.end));
                token.newline_before = source[self.last_end..range.start].contains('\n');
                self.last_end = range.end;
                Ok(token)
            }
            Some(Err(())) => {
                let range = self.inner.span();
                let slice = self.inner.slice();
                let message = if slice.starts_with('"') {
                    format!("invalid string literal {}", slice)
                } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("invalid numeric literal `{}`", slice)
                } else {
                    format!("unexpected character '{}'", slice)
                };
                Err(CompileError::lexer(message, Span::new(range.start, range.end)))
            }
            None => {
                self.at_eof = true;
                let len = source.len();
                let mut token = Token::new(TokenKind::Eof, Span::new(len, len));
                token.newline_before = source[self.last_end..].contains('\n');
                Ok(token)
            }
        }
    }

    pub fn peek(&mut self) -> CompileResult<&Token> {
        self.peek_at(0)
    }

    /// Peek at the token at offset (0 = next, 1 = after next)
    pub fn peek_at(&mut self, offset: usize) -> CompileResult<&Token> {
        while self.peeked.len() <= offset {
            let token = self.scan_token()?;
            self.peeked.push_back(token);
        }
        Ok(&self.peeked[offset])
    }

    pub fn check(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        Ok(std::mem::discriminant(&self.peek()?.kind) == std::mem::discriminant(expected))
    }

    /// Check the token after the next one
    pub fn check_lookahead(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        let token = self.peek_at(1)?;
        Ok(std::mem::discriminant(&token.kind) == std::mem::discriminant(expected))
    }

    pub fn match_token(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        if self.check(expected)? {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) {
            Ok(token)
        } else {
            Err(CompileError::parser(
                format!("expected {}, found {}", expected, token.kind),
                token.span,
            ))
        }
    }

    /// Split a pending `>>` into two `>` tokens, for nested generic argument lists
    pub fn split_shr(&mut self) -> CompileResult<()> {
        self.peek()?;
        if let Some(front) = self.peeked.front_mut() {
            if front.kind == TokenKind::Shr {
                let span = front.span;
                front.kind = TokenKind::Gt;
                front.span = Span::new(span.start, span.start + 1);
                let mut second = Token::new(TokenKind::Gt, Span::new(span.start + 1, span.end));
                second.newline_before = false;
                self.peeked.insert(1, second);
            }
        }
        Ok(())
    }

    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::PrimitiveType;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_primitives() {
        assert_eq!(
            kinds("func template int8 uint Self self foo"),
            vec![
                TokenKind::Func,
                TokenKind::Template,
                TokenKind::Primitive(PrimitiveType::Int8),
                TokenKind::Primitive(PrimitiveType::UInt),
                TokenKind::SelfType,
                TokenKind::SelfValue,
                TokenKind::Identifier("foo".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            kinds("42 0xFF 0b1010 1_000 2.5"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(255),
                TokenKind::IntLiteral(10),
                TokenKind::IntLiteral(1000),
                TokenKind::FloatLiteral(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\"""#),
            vec![TokenKind::StringLiteral("a\n\"b\"".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("=> << >= && || != ="),
            vec![
                TokenKind::FatArrow,
                TokenKind::Shl,
                TokenKind::GtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::NotEq,
                TokenKind::Eq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_tracking() {
        let tokens = Lexer::new("a b // note\nc").tokenize_all().unwrap();
        assert!(!tokens[1].newline_before);
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_split_shr() {
        let mut lexer = Lexer::new(">> x");
        lexer.split_shr().unwrap();
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Gt);
        let second = lexer.next_token().unwrap();
        assert_eq!(second.kind, TokenKind::Gt);
        assert_eq!(second.span, Span::new(1, 2));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("a @ b").tokenize_all().unwrap_err();
        assert!(err.message.contains('@'));
    }
}
