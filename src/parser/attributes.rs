//! Types and attribute values.

use crate::ir::{Attribute, FloatKind, FunctionType, Type};

use super::error::{ParseError, ParseErrorKind};
use super::tokens::Token;
use super::Parser;

impl Parser<'_> {
    pub fn parse_integer(&mut self) -> Result<i64, ParseError> {
        match self.peek() {
            Some(Token::Integer(value)) => {
                let value = *value;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    fn parse_count<T: TryFrom<i64>>(&mut self, what: &str) -> Result<T, ParseError> {
        let span = self.span();
        let value = self.parse_integer()?;
        match T::try_from(value) {
            Ok(count) if value > 0 => Ok(count),
            _ => Err(ParseError::new(
                span,
                ParseErrorKind::InvalidLiteral(format!("{what} must be positive, found {value}")),
            )),
        }
    }

    /// `[1, -1, 2]`
    pub fn parse_int_array(&mut self) -> Result<Vec<i64>, ParseError> {
        self.expect(Token::LeftSquareBracket)?;
        let mut values = Vec::new();
        if self.eat(&Token::RightSquareBracket) {
            return Ok(values);
        }
        loop {
            values.push(self.parse_integer()?);
            if !self.eat(&Token::Coma) {
                break;
            }
        }
        self.expect(Token::RightSquareBracket)?;
        Ok(values)
    }

    pub fn parse_type(&mut self) -> Result<Type, ParseError> {
        let (name, span) = self.parse_identifier("type")?;
        let ty = match name.as_str() {
            "void" => Type::Void,
            "ptr" => {
                self.expect(Token::LessThanSign)?;
                let pointee = self.parse_type()?;
                self.expect(Token::MoreThanSign)?;
                Type::ptr(pointee)
            }
            "vector" => {
                self.expect(Token::LessThanSign)?;
                let lanes = self.parse_count("vector length")?;
                self.expect_keyword("x")?;
                let element = self.parse_type()?;
                self.expect(Token::MoreThanSign)?;
                Type::vector(lanes, element)
            }
            "array" => {
                self.expect(Token::LessThanSign)?;
                let len = self.parse_count("array length")?;
                self.expect_keyword("x")?;
                let element = self.parse_type()?;
                self.expect(Token::MoreThanSign)?;
                Type::array(len, element)
            }
            "struct" => {
                self.expect(Token::LessThanSign)?;
                self.expect(Token::LeftParen)?;
                let fields = if self.at(&Token::RightParen) {
                    Vec::new()
                } else {
                    self.parse_type_list()?
                };
                self.expect(Token::RightParen)?;
                self.expect(Token::MoreThanSign)?;
                Type::Struct(fields)
            }
            "func" => {
                self.expect(Token::LessThanSign)?;
                let result = self.parse_type()?;
                let (params, variadic) = self.parse_param_types()?;
                self.expect(Token::MoreThanSign)?;
                Type::func(FunctionType {
                    result,
                    params,
                    variadic,
                })
            }
            other => match FloatKind::from_keyword(other) {
                Some(kind) => Type::Float(kind),
                None => match other.strip_prefix('i').map(str::parse::<u32>) {
                    Some(Ok(width)) if width > 0 => Type::Int(width),
                    _ => return Err(ParseError::new(span, ParseErrorKind::UnknownType(name))),
                },
            },
        };
        Ok(ty)
    }

    /// `(A, B, ...)`, returning the parameter types and whether the list is variadic.
    pub fn parse_param_types(&mut self) -> Result<(Vec<Type>, bool), ParseError> {
        self.expect(Token::LeftParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        if !self.eat(&Token::RightParen) {
            loop {
                if self.eat(&Token::Ellipsis) {
                    variadic = true;
                    break;
                }
                params.push(self.parse_type()?);
                if !self.eat(&Token::Coma) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
        }
        Ok((params, variadic))
    }

    /// An optional `: type` suffix of a numeric literal.
    fn parse_literal_type(&mut self, default: Type) -> Result<Type, ParseError> {
        if self.eat(&Token::Colon) {
            self.parse_type()
        } else {
            Ok(default)
        }
    }

    pub fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let span = self.span();
        let (token, _) = self.next_token("attribute")?;
        let not_numeric = |found: Type| {
            ParseError::new(
                span,
                ParseErrorKind::InvalidType {
                    expected: "integer or float type",
                    found,
                },
            )
        };

        let attribute = match token {
            Token::Integer(value) => match self.parse_literal_type(Type::i64())? {
                ty if ty.is_int() => Attribute::int(value, ty),
                ty if ty.is_float() => Attribute::float(value as f64, ty),
                ty => return Err(not_numeric(ty)),
            },
            // Hex literals carry the bit pattern of a double when typed as a float.
            Token::HexInteger(bits) => match self.parse_literal_type(Type::i64())? {
                ty if ty.is_int() => Attribute::int(bits as i64, ty),
                ty if ty.is_float() => Attribute::float(f64::from_bits(bits), ty),
                ty => return Err(not_numeric(ty)),
            },
            Token::Float(value) => match self.parse_literal_type(Type::f64())? {
                ty if ty.is_float() => Attribute::float(value, ty),
                ty => return Err(not_numeric(ty)),
            },
            Token::String(value) => Attribute::String(value),
            Token::SymbolRef(name) => Attribute::Symbol(name),
            Token::LeftSquareBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RightSquareBracket) {
                    loop {
                        items.push(self.parse_attribute()?);
                        if !self.eat(&Token::Coma) {
                            break;
                        }
                    }
                    self.expect(Token::RightSquareBracket)?;
                }
                Attribute::Array(items)
            }
            Token::Identifier(name) if name == "true" => Attribute::Bool(true),
            Token::Identifier(name) if name == "false" => Attribute::Bool(false),
            Token::Identifier(name) if name == "unit" => Attribute::Unit,
            Token::Identifier(_) => {
                self.pos -= 1;
                Attribute::Type(self.parse_type()?)
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("attribute"));
            }
        };
        Ok(attribute)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{Parser, tokenize};
    use crate::ir::{Attribute, Type};

    fn with_parser<T>(source: &str, f: impl FnOnce(&mut Parser<'_>) -> T) -> T {
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(source, tokens);
        f(&mut parser)
    }

    #[test]
    fn types_print_back_the_same() {
        for source in [
            "i1",
            "i128",
            "bf16",
            "ptr<ptr<i8>>",
            "vector<4 x f32>",
            "array<3 x struct<(i32, ptr<f64>)>>",
            "struct<()>",
            "func<void (i32, ...)>",
            "func<i32 ()>",
        ] {
            let ty = with_parser(source, |p| p.parse_type()).unwrap();
            assert_eq!(ty.to_string(), source);
        }
    }

    #[test]
    fn rejects_bad_types() {
        assert!(with_parser("i0", |p| p.parse_type()).is_err());
        assert!(with_parser("vector<0 x i32>", |p| p.parse_type()).is_err());
        assert!(with_parser("quux", |p| p.parse_type()).is_err());
    }

    #[test]
    fn literal_attributes() {
        let cases = [
            ("42", Attribute::int(42, Type::i64())),
            ("42 : i8", Attribute::int(42, Type::i8())),
            ("2 : f32", Attribute::float(2.0, Type::f32())),
            ("-1.5", Attribute::float(-1.5, Type::f64())),
            (
                "0x7FF8000000000000 : f64",
                Attribute::float(f64::NAN, Type::f64()),
            ),
            ("\"hi\"", Attribute::String("hi".into())),
            ("@g", Attribute::Symbol("g".into())),
            ("[1, 2]", Attribute::int_array(&[1, 2])),
            ("true", Attribute::Bool(true)),
            ("ptr<i8>", Attribute::Type(Type::ptr(Type::i8()))),
        ];
        for (source, expected) in cases {
            let attr = with_parser(source, |p| p.parse_attribute()).unwrap();
            assert_eq!(attr, expected, "{source}");
        }
    }
}
