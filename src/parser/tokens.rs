use logos::Logos;
use std::convert::Infallible;

#[derive(Debug, PartialEq, Clone, Default)]
pub enum LexingError {
    NumberParseError,
    InvalidEscape,
    #[default]
    Other,
}

impl From<std::num::ParseIntError> for LexingError {
    fn from(_: std::num::ParseIntError) -> Self {
        LexingError::NumberParseError
    }
}

impl From<std::num::ParseFloatError> for LexingError {
    fn from(_: std::num::ParseFloatError) -> Self {
        LexingError::NumberParseError
    }
}

impl From<Infallible> for LexingError {
    fn from(_: Infallible) -> Self {
        LexingError::Other
    }
}

fn unescape(slice: &str) -> Result<String, LexingError> {
    unescaper::unescape(&slice[1..slice.len() - 1]).map_err(|_| LexingError::InvalidEscape)
}

#[derive(Logos, logos_display::Debug, logos_display::Display, PartialEq, Clone)]
#[logos(error = LexingError, skip r"[ \t\r\n\f]+", skip r"//[^\n]*")]
pub enum Token {
    /// `%name`, an SSA value.
    #[regex(r"%[a-zA-Z0-9_.$]+", |lex| lex.slice()[1..].to_string())]
    ValueId(String),
    /// `@name`, a module level symbol.
    #[regex(r"@[a-zA-Z_.$][a-zA-Z0-9_.$]*", |lex| lex.slice()[1..].to_string())]
    SymbolRef(String),
    /// `^name`, a block label.
    #[regex(r"\^[a-zA-Z0-9_.$]+", |lex| lex.slice()[1..].to_string())]
    BlockId(String),
    /// Mnemonics, keywords and type names.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Literals
    #[regex(r"-?\d+", |lex| lex.slice().parse::<i64>(), priority = 3)]
    Integer(i64),
    #[regex(r"0x[0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16))]
    HexInteger(u64),
    #[regex(r"-?\d+\.\d+([eE][-+]?\d+)?", |lex| lex.slice().parse::<f64>())]
    #[regex(r"-?\d+[eE][-+]?\d+", |lex| lex.slice().parse::<f64>())]
    Float(f64),
    #[regex(r#""(?:[^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    String(String),

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBracket,
    #[token("}")]
    RightBracket,
    #[token("[")]
    LeftSquareBracket,
    #[token("]")]
    RightSquareBracket,
    #[token("<")]
    LessThanSign,
    #[token(">")]
    MoreThanSign,
    #[token("=")]
    Assign,
    #[token(":")]
    Colon,
    #[token(",")]
    Coma,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source).map(|x| x.unwrap()).collect()
    }

    #[test]
    fn operation_line() {
        assert_eq!(
            lex("%sum = llvm.add %a, %b : i32 // trailing"),
            vec![
                Token::ValueId("sum".into()),
                Token::Assign,
                Token::Identifier("llvm.add".into()),
                Token::ValueId("a".into()),
                Token::Coma,
                Token::ValueId("b".into()),
                Token::Colon,
                Token::Identifier("i32".into()),
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            lex(r#"-1 0x7FF0000000000000 1.5 1e100 -2.5e-3 "a\n\"b""#),
            vec![
                Token::Integer(-1),
                Token::HexInteger(0x7FF0_0000_0000_0000),
                Token::Float(1.5),
                Token::Float(1e100),
                Token::Float(-2.5e-3),
                Token::String("a\n\"b".into()),
            ]
        );
    }

    #[test]
    fn arrows_and_blocks() {
        assert_eq!(
            lex("^bb1(%x : i32) -> ..."),
            vec![
                Token::BlockId("bb1".into()),
                Token::LeftParen,
                Token::ValueId("x".into()),
                Token::Colon,
                Token::Identifier("i32".into()),
                Token::RightParen,
                Token::Arrow,
                Token::Ellipsis,
            ]
        );
    }
}
