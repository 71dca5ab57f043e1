//! Textual front end: source text to a [`Module`].
//!
//! The driver here handles modules, function bodies, blocks and SSA names.
//! The syntax after an operation's mnemonic belongs to the operation's
//! assembly format, see [`crate::asm`].

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::asm;
use crate::catalog::{AttrKind, Catalog, OperationSpec};
use crate::ir::{
    Attribute, Attributes, Block, BlockIndex, EnumKind, Module, Operation, Region, Span,
    Successor, Type, ValueId,
};

mod attributes;
pub mod error;
mod lexer;
pub mod tokens;

pub use error::{ParseError, ParseErrorKind};
pub use lexer::tokenize;
use tokens::Token;

/// Parses a whole module.
#[instrument(level = "debug", skip_all)]
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(source)?;
    debug!("lexed {} tokens", tokens.len());
    let mut parser = Parser::new(source, tokens);
    parser.parse_module_body()?;
    Ok(parser.module)
}

/// SSA names and block labels visible at one nesting level.
#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, ValueId>,
    /// Values used before their definition, with the span of the first use.
    forward: HashMap<String, (ValueId, Span)>,
    blocks: HashMap<String, BlockIndex>,
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    module: Module,
    module_scope: Scope,
    function_scopes: Vec<Scope>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<(Token, Span)>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            module: Module::new(),
            module_scope: Scope::default(),
            function_scopes: Vec::new(),
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|x| &x.0)
    }

    pub fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Span of the next token, or an empty span at the end of the input.
    pub fn span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            None => Span::new(self.source.len(), self.source.len()),
        }
    }

    /// Span of the last consumed token.
    pub fn prev_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|x| self.tokens.get(x)) {
            Some((_, span)) => *span,
            None => Span::new(0, 0),
        }
    }

    pub fn unexpected(&self, expected: &str) -> ParseError {
        let kind = match self.peek() {
            Some(found) => ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            None => ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
        };
        ParseError::new(self.span(), kind)
    }

    pub fn next_token(&mut self, expected: &str) -> Result<(Token, Span), ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(self.unexpected(expected)),
        }
    }

    pub fn eat(&mut self, token: &Token) -> bool {
        let found = self.at(token);
        if found {
            self.pos += 1;
        }
        found
    }

    pub fn expect(&mut self, token: Token) -> Result<Span, ParseError> {
        if self.at(&token) {
            self.pos += 1;
            Ok(self.prev_span())
        } else {
            Err(self.unexpected(&format!("'{token}'")))
        }
    }

    pub fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Identifier(x)) if x == keyword)
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{keyword}'")))
        }
    }

    pub fn parse_identifier(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok((name, self.prev_span()))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    pub fn parse_symbol(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::SymbolRef(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("symbol reference")),
        }
    }

    pub fn parse_value_name(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token::ValueId(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok((name, self.prev_span()))
            }
            _ => Err(self.unexpected("value")),
        }
    }

    /// `%a, %b, ...`: stops before a comma that isn't followed by another value.
    pub fn parse_value_names(&mut self) -> Result<Vec<(String, Span)>, ParseError> {
        let mut names = vec![self.parse_value_name()?];
        while self.at(&Token::Coma) && matches!(self.peek_nth(1), Some(Token::ValueId(_))) {
            self.pos += 1;
            names.push(self.parse_value_name()?);
        }
        Ok(names)
    }

    pub fn parse_type_list(&mut self) -> Result<Vec<Type>, ParseError> {
        let mut types = vec![self.parse_type()?];
        while self.eat(&Token::Coma) {
            types.push(self.parse_type()?);
        }
        Ok(types)
    }

    /// Looks up a value by name, creating a typed placeholder for forward references.
    pub fn resolve(&mut self, name: &str, span: Span, ty: &Type) -> Result<ValueId, ParseError> {
        let scope = self
            .function_scopes
            .last_mut()
            .unwrap_or(&mut self.module_scope);
        let existing = scope
            .values
            .get(name)
            .copied()
            .or_else(|| scope.forward.get(name).map(|x| x.0));
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.module.new_value(ty.clone(), Some(name.to_string()));
                scope.forward.insert(name.to_string(), (id, span));
                return Ok(id);
            }
        };
        match self.module.value_type(id) {
            Some(found) if found != ty => Err(ParseError::new(
                span,
                ParseErrorKind::ValueTypeMismatch {
                    name: name.to_string(),
                    expected: ty.clone(),
                    found: found.clone(),
                },
            )),
            _ => Ok(id),
        }
    }

    pub fn resolve_all(
        &mut self,
        names: &[(String, Span)],
        types: &[Type],
    ) -> Result<Vec<ValueId>, ParseError> {
        if names.len() != types.len() {
            let span = names.first().map(|x| x.1).unwrap_or(self.prev_span());
            return Err(ParseError::new(
                span,
                ParseErrorKind::TypeCount {
                    expected: names.len(),
                    found: types.len(),
                },
            ));
        }
        names
            .iter()
            .zip(types)
            .map(|((name, span), ty)| self.resolve(name, *span, ty))
            .collect()
    }

    /// An already defined value, without creating a placeholder.
    pub fn defined_value(&self, name: &str) -> Option<ValueId> {
        let scope = self.function_scopes.last().unwrap_or(&self.module_scope);
        scope.values.get(name).copied()
    }

    /// Defines a new named value, taking over the placeholder of earlier uses.
    fn define(&mut self, name: String, span: Span, ty: Type) -> Result<ValueId, ParseError> {
        let scope = self.function_scopes.last().unwrap_or(&self.module_scope);
        let placeholder = scope.forward.get(&name).map(|x| x.0);
        let id = match placeholder {
            Some(placeholder) => {
                if let Some(expected) = self.module.value_type(placeholder) {
                    if *expected != ty {
                        return Err(ParseError::new(
                            span,
                            ParseErrorKind::ValueTypeMismatch {
                                name,
                                expected: expected.clone(),
                                found: ty,
                            },
                        ));
                    }
                }
                placeholder
            }
            None => self.module.new_value(ty, Some(name.clone())),
        };
        self.bind(name, span, id)
    }

    /// Binds `name` to `id`. Returns the id uses should refer to, which is the
    /// placeholder when the name was used before. The arena never frees, so a
    /// superseded `id` is left unreferenced.
    fn bind(&mut self, name: String, span: Span, id: ValueId) -> Result<ValueId, ParseError> {
        let scope = self
            .function_scopes
            .last_mut()
            .unwrap_or(&mut self.module_scope);
        if scope.values.contains_key(&name) {
            return Err(ParseError::new(span, ParseErrorKind::Redefinition(name)));
        }

        let mut bound = id;
        if let Some((placeholder, _)) = scope.forward.remove(&name) {
            let expected = self.module.value_type(placeholder).cloned();
            let found = self.module.value_type(id).cloned();
            if let (Some(expected), Some(found)) = (expected, found) {
                if expected != found {
                    return Err(ParseError::new(
                        span,
                        ParseErrorKind::ValueTypeMismatch {
                            name,
                            expected,
                            found,
                        },
                    ));
                }
            }
            bound = placeholder;
        }
        if let Some(data) = self.module.values.get_mut(bound) {
            data.name = Some(name.clone());
        }
        scope.values.insert(name, bound);
        Ok(bound)
    }

    pub fn parse_block_ref(&mut self) -> Result<BlockIndex, ParseError> {
        let (name, span) = match self.peek() {
            Some(Token::BlockId(name)) => (name.clone(), self.span()),
            _ => return Err(self.unexpected("block reference")),
        };
        self.pos += 1;
        let scope = self.function_scopes.last().unwrap_or(&self.module_scope);
        scope
            .blocks
            .get(&name)
            .copied()
            .ok_or_else(|| ParseError::new(span, ParseErrorKind::UndefinedBlock(name)))
    }

    /// `^bb` or `^bb(%a, %b : T, U)`.
    pub fn parse_successor(&mut self) -> Result<Successor, ParseError> {
        let block = self.parse_block_ref()?;
        let mut operands = Vec::new();
        if self.eat(&Token::LeftParen) {
            let names = self.parse_value_names()?;
            self.expect(Token::Colon)?;
            let types = self.parse_type_list()?;
            self.expect(Token::RightParen)?;
            operands = self.resolve_all(&names, &types)?;
        }
        Ok(Successor::new(block, operands))
    }

    /// A possibly empty, comma separated list of successors.
    pub fn parse_successors(&mut self) -> Result<Vec<Successor>, ParseError> {
        let mut successors = Vec::new();
        if !matches!(self.peek(), Some(Token::BlockId(_))) {
            return Ok(successors);
        }
        successors.push(self.parse_successor()?);
        while self.eat(&Token::Coma) {
            successors.push(self.parse_successor()?);
        }
        Ok(successors)
    }

    /// An optional `{name = value, flag}` dictionary.
    pub fn parse_attr_dict(
        &mut self,
        spec: &OperationSpec,
        attributes: &mut Attributes,
    ) -> Result<(), ParseError> {
        if !self.eat(&Token::LeftBracket) || self.eat(&Token::RightBracket) {
            return Ok(());
        }
        loop {
            let (name, _) = self.parse_identifier("attribute name")?;
            let value = if self.eat(&Token::Assign) {
                match spec.attribute_spec(&name).map(|x| x.kind) {
                    Some(AttrKind::Enum(kind)) => self.parse_enum_keyword(kind)?,
                    _ => self.parse_attribute()?,
                }
            } else {
                Attribute::Unit
            };
            attributes.insert(name, value);
            if !self.eat(&Token::Coma) {
                break;
            }
        }
        self.expect(Token::RightBracket)?;
        Ok(())
    }

    pub fn parse_enum_keyword(&mut self, kind: EnumKind) -> Result<Attribute, ParseError> {
        let (keyword, span) = self.parse_identifier(kind.name())?;
        match kind.code_of(&keyword) {
            Some(code) => Ok(Attribute::Enum { kind, code }),
            None => Err(ParseError::new(
                span,
                ParseErrorKind::UnknownKeyword {
                    kind,
                    found: keyword,
                },
            )),
        }
    }

    /// Parses `{ ... }` as the body of a function whose entry block takes `args`.
    pub fn parse_function_body(
        &mut self,
        args: Vec<(String, Span, Type)>,
    ) -> Result<Region, ParseError> {
        self.expect(Token::LeftBracket)?;
        let blocks = self.scan_block_labels()?;
        self.function_scopes.push(Scope {
            blocks,
            ..Scope::default()
        });
        let region = self.parse_blocks(args);
        let scope = self.function_scopes.pop().unwrap_or_default();
        let region = region?;

        if let Some((name, (_, span))) = scope.forward.into_iter().min_by_key(|x| (x.1).1) {
            return Err(ParseError::new(span, ParseErrorKind::UndefinedValue(name)));
        }
        Ok(region)
    }

    fn parse_blocks(&mut self, args: Vec<(String, Span, Type)>) -> Result<Region, ParseError> {
        let mut entry = Block::default();
        for (name, span, ty) in args {
            entry.arguments.push(self.define(name, span, ty)?);
        }
        let mut blocks = vec![entry];
        let mut current = 0;

        loop {
            match self.peek() {
                Some(Token::RightBracket) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::BlockId(_)) if self.is_label_at(self.pos) => {
                    let span = self.span();
                    let index = self.parse_block_ref()?;
                    let mut arguments = Vec::new();
                    if self.eat(&Token::LeftParen) {
                        loop {
                            let (name, span) = self.parse_value_name()?;
                            self.expect(Token::Colon)?;
                            let ty = self.parse_type()?;
                            arguments.push((name, span, ty));
                            if !self.eat(&Token::Coma) {
                                break;
                            }
                        }
                        self.expect(Token::RightParen)?;
                    }
                    self.expect(Token::Colon)?;

                    if index == 0 {
                        if !arguments.is_empty() {
                            return Err(ParseError::new(span, ParseErrorKind::EntryBlockArguments));
                        }
                    } else {
                        let mut block = Block::default();
                        for (name, span, ty) in arguments {
                            block.arguments.push(self.define(name, span, ty)?);
                        }
                        blocks.push(block);
                    }
                    current = index;
                }
                Some(_) => {
                    let op = self.parse_operation()?;
                    blocks[current].operations.push(op);
                }
                None => return Err(self.unexpected("'}'")),
            }
        }

        Ok(Region { blocks })
    }

    /// Whether the token at `index` starts a block label: `^name [(...)] :`.
    fn is_label_at(&self, index: usize) -> bool {
        if !matches!(self.tokens.get(index), Some((Token::BlockId(_), _))) {
            return false;
        }
        let mut next = index + 1;
        if matches!(self.tokens.get(next), Some((Token::LeftParen, _))) {
            let mut depth = 0usize;
            while let Some((token, _)) = self.tokens.get(next) {
                next += 1;
                match token {
                    Token::LeftParen => depth += 1,
                    Token::RightParen => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        matches!(self.tokens.get(next), Some((Token::Colon, _)))
    }

    /// Numbers the labels of the body starting at the current token, in textual order.
    /// A label on the very first line names the entry block.
    fn scan_block_labels(&self) -> Result<HashMap<String, BlockIndex>, ParseError> {
        let mut labels = HashMap::new();
        let mut next_index = if self.is_label_at(self.pos) { 0 } else { 1 };
        let mut depth = 0usize;
        let mut index = self.pos;
        while let Some((token, span)) = self.tokens.get(index) {
            match token {
                Token::LeftBracket => depth += 1,
                Token::RightBracket if depth == 0 => break,
                Token::RightBracket => depth -= 1,
                Token::BlockId(name) if depth == 0 && self.is_label_at(index) => {
                    if labels.insert(name.clone(), next_index).is_some() {
                        return Err(ParseError::new(
                            *span,
                            ParseErrorKind::DuplicateBlock(name.clone()),
                        ));
                    }
                    next_index += 1;
                }
                _ => {}
            }
            index += 1;
        }
        Ok(labels)
    }

    /// `[%a, %b =] mnemonic <format>`
    fn parse_operation(&mut self) -> Result<Operation, ParseError> {
        let start = self.span();
        let names = if matches!(self.peek(), Some(Token::ValueId(_))) {
            let names = self.parse_value_names()?;
            self.expect(Token::Assign)?;
            names
        } else {
            Vec::new()
        };

        let (mnemonic, mnemonic_span) = self.parse_identifier("operation name")?;
        let spec = Catalog::builtin()
            .lookup(&mnemonic)
            .map_err(|e| ParseError::new(mnemonic_span, e.into()))?;

        let state = asm::parse_operation(self, spec)?;
        let span = start.merge(self.prev_span());
        let mut op = self
            .module
            .create_operation(state.with_span(span))
            .map_err(|e| ParseError::new(span, e.into()))?;

        if names.len() != op.results.len() {
            return Err(ParseError::new(
                start,
                ParseErrorKind::ResultCount {
                    expected: op.results.len(),
                    found: names.len(),
                },
            ));
        }
        for (index, (name, span)) in names.into_iter().enumerate() {
            op.results[index] = self.bind(name, span, op.results[index])?;
        }
        Ok(op)
    }

    fn parse_module_body(&mut self) -> Result<(), ParseError> {
        while self.peek().is_some() {
            let op = self.parse_operation()?;
            self.module.body.push(op);
        }
        if let Some((name, (_, span))) = self
            .module_scope
            .forward
            .iter()
            .min_by_key(|x| (x.1).1)
        {
            return Err(ParseError::new(
                *span,
                ParseErrorKind::UndefinedValue(name.clone()),
            ));
        }
        debug!("parsed {} module level operations", self.module.body.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::OpCode;

    #[test]
    fn forward_references_resolve_to_one_value() {
        let source = r#"
llvm.func @f(%a: i32) -> i32 {
  llvm.br ^bb1(%a : i32)
^bb2:
  llvm.return %late : i32
^bb1(%x: i32):
  %late = llvm.add %x, %x : i32
  llvm.br ^bb2
}
"#;
        let module = parse_module(source).unwrap();
        let func = module.function("f").unwrap();
        let blocks = &func.regions[0].blocks;
        assert_eq!(blocks.len(), 3);
        // ^bb2 is declared before ^bb1, so it gets index 1.
        let ret = &blocks[1].operations[0];
        let add = &blocks[2].operations[0];
        assert_eq!(ret.opcode, OpCode::Return);
        assert_eq!(ret.operands[0], add.results[0]);
        assert_eq!(blocks[0].operations[0].successors[0].block, 2);
    }

    #[test]
    fn block_arguments_take_over_placeholders() {
        let source = r#"
llvm.func @f(%a: i32) -> i32 {
  llvm.br ^bb2(%a : i32)
^bb1:
  llvm.return %x : i32
^bb2(%x: i32):
  llvm.br ^bb1
}
"#;
        let module = parse_module(source).unwrap();
        let blocks = &module.function("f").unwrap().regions[0].blocks;
        let ret = &blocks[1].operations[0];
        assert_eq!(ret.operands[0], blocks[2].arguments[0]);
        assert_eq!(
            module.values.get(blocks[2].arguments[0]).unwrap().name.as_deref(),
            Some("x")
        );

        let wrong = source.replace("^bb2(%x: i32)", "^bb2(%x: i64)");
        let err = parse_module(&wrong).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ValueTypeMismatch { .. }));
    }

    #[test]
    fn undefined_value() {
        let err = parse_module("llvm.func @f() {\n  llvm.return %nope : i32\n}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UndefinedValue("nope".into()));
        assert_eq!(err.span, Span::new(31, 36));
    }

    #[test]
    fn redefinition() {
        let source = "llvm.func @f(%a: i32) {\n  %a = llvm.mlir.undef : i32\n  llvm.return\n}";
        let err = parse_module(source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Redefinition("a".into()));
    }

    #[test]
    fn mismatched_use_type() {
        let source = "llvm.func @f(%a: i32) -> i64 {\n  llvm.return %a : i64\n}";
        let err = parse_module(source).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ValueTypeMismatch { .. }));
    }

    #[test]
    fn unknown_mnemonic() {
        let err = parse_module("%x = llvm.frob : i32").unwrap_err();
        assert_eq!(err.kind.code(), "UnknownMnemonic");
        assert_eq!(err.span, Span::new(5, 14));
    }

    #[test]
    fn duplicate_block_label() {
        let source = "llvm.func @f() {\n  llvm.br ^a\n^a:\n  llvm.br ^a\n^a:\n  llvm.return\n}";
        let err = parse_module(source).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateBlock("a".into()));
    }
}
