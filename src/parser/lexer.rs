use logos::{Logos, SpannedIter};

use crate::ir::Span;

use super::error::{ParseError, ParseErrorKind};
use super::tokens::Token;

pub struct Lexer<'input> {
    token_stream: SpannedIter<'input, Token>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            token_stream: Token::lexer(input).spanned(),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<(Token, Span), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.token_stream.next().map(|(token, span)| {
            let span = Span::new(span.start, span.end);
            match token {
                Ok(token) => Ok((token, span)),
                Err(err) => Err(ParseError::new(span, ParseErrorKind::InvalidToken(err))),
            }
        })
    }
}

/// Lexes the whole input up front, stopping at the first invalid token.
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    Lexer::new(input).collect()
}
