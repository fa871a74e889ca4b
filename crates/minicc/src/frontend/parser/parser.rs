//! Recursive descent parser
//!
//! Type rules run as each construct is reduced, so the first violation
//! aborts the parse with its error.

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::frontend::sema::checker;
use crate::frontend::sema::{SymbolId, SymbolKind, SymbolTable};
use crate::types::TypeTag;

/// Recursive descent parser that checks while it builds
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    symbols: SymbolTable,
}

impl<'a> Parser<'a> {
    /// Create a new parser with a fresh flat symbol table
    pub fn new(source: &'a str) -> CompileResult<Self> {
        Self::with_symbols(source, SymbolTable::new())
    }

    pub fn with_symbols(source: &'a str, symbols: SymbolTable) -> CompileResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, symbols })
    }

    /// Parse a complete translation unit
    pub fn parse(&mut self) -> CompileResult<TranslationUnit> {
        let mut declarations = Vec::new();

        while !self.at_end() {
            declarations.push(self.parse_external_declaration()?);
        }

        Ok(TranslationUnit::new(declarations))
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> CompileResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(CompileError::parser(
                format!("expected {}, found {}", kind, self.current.kind),
                self.current.span,
            ))
        }
    }

    fn expect_identifier(&mut self) -> CompileResult<(String, Span)> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            let token = self.advance()?;
            return Ok((name, token.span));
        }
        Err(CompileError::parser(
            format!("expected identifier, found {}", self.current.kind),
            self.current.span,
        ))
    }

    fn resolve(&self, name: &str, span: Span) -> CompileResult<SymbolId> {
        self.symbols.lookup(name).ok_or_else(|| {
            CompileError::semantic(format!("undeclared identifier '{}'", name), span)
        })
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// type := ('void' | 'char' | 'int' | 'long') '*'*
    fn parse_type(&mut self) -> CompileResult<(TypeTag, Span)> {
        let mut ty = match self.current.kind {
            TokenKind::Void => TypeTag::Void,
            TokenKind::Char => TypeTag::Char,
            TokenKind::Int => TypeTag::Int,
            TokenKind::Long => TypeTag::Long,
            _ => {
                return Err(CompileError::parser(
                    format!("expected type, found {}", self.current.kind),
                    self.current.span,
                ));
            }
        };
        let mut span = self.advance()?.span;

        while self.check(&TokenKind::Star) {
            let star = self.advance()?;
            span = span.merge(star.span);
            ty = ty.pointer_to().map_err(|e| e.with_span(span))?;
        }

        Ok((ty, span))
    }

    fn parse_external_declaration(&mut self) -> CompileResult<TreeNode> {
        let (ty, type_span) = self.parse_type()?;
        let (name, name_span) = self.expect_identifier()?;

        if self.check(&TokenKind::LParen) {
            self.parse_function(ty, type_span, &name)
        } else {
            self.parse_variable_rest(ty, type_span, &name, name_span)
        }
    }

    fn parse_function(&mut self, ty: TypeTag, type_span: Span, name: &str) -> CompileResult<TreeNode> {
        let id = self.symbols.register(name, SymbolKind::Function, ty)?;
        let type_node = TreeNode::new(NodeKind::TypeSpec, type_span).with_type(ty);

        self.expect(TokenKind::LParen)?;
        self.symbols.push_scope();
        let params = self.parse_parameter_list()?;
        let body = self.parse_compound(false)?;
        checker::check_function_return(&type_node, body.child(0), id, &self.symbols)?;
        self.symbols.pop_scope();

        let span = type_span.merge(body.span);
        Ok(TreeNode::new(NodeKind::FuncDecl, span)
            .with_type(ty)
            .with_id(id)
            .with_child(type_node)
            .with_child(params)
            .with_child(body))
    }

    /// Parameters after the opening parenthesis, through the closing one
    fn parse_parameter_list(&mut self) -> CompileResult<TreeNode> {
        let start = self.current.span;
        let mut params = Vec::new();

        let void_only = self.check(&TokenKind::Void)
            && matches!(self.lexer.peek()?.kind, TokenKind::RParen);
        if void_only {
            self.advance()?;
        } else if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.parse_parameter()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }

        let close = self.expect(TokenKind::RParen)?;
        Ok(TreeNode::list(NodeKind::ParamList, params, start.merge(close.span)))
    }

    /// A parameter written `T name[]` is a pointer to `T`
    fn parse_parameter(&mut self) -> CompileResult<TreeNode> {
        let (mut ty, type_span) = self.parse_type()?;
        let (name, name_span) = self.expect_identifier()?;
        let mut span = type_span.merge(name_span);

        while self.match_token(&TokenKind::LBracket)? {
            span = span.merge(self.expect(TokenKind::RBracket)?.span);
            ty = ty.pointer_to().map_err(|e| e.with_span(span))?;
        }

        let id = self.symbols.register(&name, SymbolKind::Variable, ty)?;
        Ok(TreeNode::new(NodeKind::Param, span).with_type(ty).with_id(id))
    }

    /// Everything after `type name` of a variable or array declaration
    fn parse_variable_rest(
        &mut self,
        ty: TypeTag,
        start: Span,
        name: &str,
        name_span: Span,
    ) -> CompileResult<TreeNode> {
        if self.check(&TokenKind::LParen) {
            return Err(CompileError::parser(
                format!("function '{}' cannot be defined here", name),
                name_span,
            ));
        }

        let id = self.symbols.register(name, SymbolKind::Variable, ty)?;

        if self.check(&TokenKind::LBracket) {
            while self.match_token(&TokenKind::LBracket)? {
                let size = if self.check(&TokenKind::RBracket) {
                    0
                } else {
                    self.parse_dimension_size()?
                };
                self.expect(TokenKind::RBracket)?;
                self.symbols.add_dimension(id, size);
            }

            let mut decl = TreeNode::new(NodeKind::ArrayDecl, name_span).with_type(ty).with_id(id);
            if self.match_token(&TokenKind::Eq)? {
                decl = decl.with_child(self.parse_initializer_list()?);
            }
            decl.span = start.merge(self.expect(TokenKind::Semi)?.span);
            checker::infer_first_dimension(&decl, &mut self.symbols)?;
            return Ok(decl);
        }

        let mut decl = TreeNode::new(NodeKind::VarDecl, name_span).with_type(ty).with_id(id);
        if self.match_token(&TokenKind::Eq)? {
            let init = self.parse_expression()?;
            checker::check_assign(&decl, &init)?;
            decl = decl.with_child(init);
        }
        decl.span = start.merge(self.expect(TokenKind::Semi)?.span);
        Ok(decl)
    }

    fn parse_dimension_size(&mut self) -> CompileResult<usize> {
        let token = self.advance()?;
        let (value, _) = match &token.kind {
            TokenKind::IntLiteral(text) => self.parse_int_literal(text, token.span)?,
            TokenKind::HexLiteral(text) => self.parse_hex_literal(text, token.span)?,
            other => {
                return Err(CompileError::parser(
                    format!("expected array size, found {}", other),
                    token.span,
                ));
            }
        };
        usize::try_from(value).map_err(|_| {
            CompileError::array(format!("invalid array size {}", value), token.span)
        })
    }

    /// '{' element (',' element)* ','? '}' where an element is an expression
    /// or a nested list
    fn parse_initializer_list(&mut self) -> CompileResult<TreeNode> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let item = if self.check(&TokenKind::LBrace) {
                self.parse_initializer_list()?
            } else {
                self.parse_assignment_expression()?
            };
            items.push(item);
            if !self.match_token(&TokenKind::Comma)? {
                break;
            }
        }

        let close = self.expect(TokenKind::RBrace)?;
        Ok(TreeNode::list(NodeKind::InitList, items, open.span.merge(close.span)))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Block of declarations and statements; `scoped` opens a nested scope
    fn parse_compound(&mut self, scoped: bool) -> CompileResult<TreeNode> {
        let open = self.expect(TokenKind::LBrace)?;
        if scoped {
            self.symbols.push_scope();
        }

        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let item = if self.current.kind.is_type_specifier() {
                self.parse_local_declaration()?
            } else {
                self.parse_statement()?
            };
            if item.kind != NodeKind::Empty {
                items.push(item);
            }
        }

        let close = self.expect(TokenKind::RBrace)?;
        if scoped {
            self.symbols.pop_scope();
        }
        Ok(TreeNode::list(NodeKind::Compound, items, open.span.merge(close.span)))
    }

    fn parse_local_declaration(&mut self) -> CompileResult<TreeNode> {
        let (ty, type_span) = self.parse_type()?;
        let (name, name_span) = self.expect_identifier()?;
        self.parse_variable_rest(ty, type_span, &name, name_span)
    }

    fn parse_statement(&mut self) -> CompileResult<TreeNode> {
        match self.current.kind {
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::LBrace => self.parse_compound(true),
            TokenKind::Semi => {
                let token = self.advance()?;
                Ok(TreeNode::new(NodeKind::Empty, token.span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_return_statement(&mut self) -> CompileResult<TreeNode> {
        let keyword = self.expect(TokenKind::Return)?;
        let mut node = TreeNode::new(NodeKind::Return, keyword.span);

        if !self.check(&TokenKind::Semi) {
            let value = self.parse_expression()?;
            node = node.with_type(value.ty).with_child(value);
        }
        node.span = keyword.span.merge(self.expect(TokenKind::Semi)?.span);
        Ok(node)
    }

    fn parse_if_statement(&mut self) -> CompileResult<TreeNode> {
        let keyword = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_statement()?;

        let mut span = keyword.span.merge(then_branch.span);
        let mut node = TreeNode::new(NodeKind::If, span)
            .with_child(condition)
            .with_child(then_branch);

        if self.match_token(&TokenKind::Else)? {
            let else_branch = self.parse_statement()?;
            span = span.merge(else_branch.span);
            node = node.with_child(else_branch);
        }
        node.span = span;
        Ok(node)
    }

    fn parse_while_statement(&mut self) -> CompileResult<TreeNode> {
        let keyword = self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement()?;

        Ok(TreeNode::new(NodeKind::While, keyword.span.merge(body.span))
            .with_child(condition)
            .with_child(body))
    }

    fn parse_expression_statement(&mut self) -> CompileResult<TreeNode> {
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semi)?;
        Ok(expr)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> CompileResult<TreeNode> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> CompileResult<TreeNode> {
        let target = self.parse_equality_expression()?;

        if !self.check(&TokenKind::Eq) {
            return Ok(target);
        }
        self.advance()?;
        let value = self.parse_assignment_expression()?;

        if !matches!(
            target.kind,
            NodeKind::Id | NodeKind::Index | NodeKind::Unary(UnaryOp::Deref)
        ) {
            return Err(CompileError::semantic(
                "left side of assignment is not assignable",
                target.span,
            ));
        }
        checker::check_assign(&target, &value)?;

        let span = target.span.merge(value.span);
        Ok(TreeNode::new(NodeKind::Assign, span)
            .with_type(target.ty)
            .with_child(target)
            .with_child(value))
    }

    fn parse_equality_expression(&mut self) -> CompileResult<TreeNode> {
        let mut left = self.parse_relational_expression()?;

        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expression()?;
            checker::check_compare(&left, &right)?;
            left = binary(op, TypeTag::Int, left, right);
        }

        Ok(left)
    }

    fn parse_relational_expression(&mut self) -> CompileResult<TreeNode> {
        let mut left = self.parse_additive_expression()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::GtEq => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expression()?;
            checker::check_compare(&left, &right)?;
            left = binary(op, TypeTag::Int, left, right);
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> CompileResult<TreeNode> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let mut right = self.parse_multiplicative_expression()?;
            checker::check_arithmetic(&mut left, &mut right)?;
            let ty = additive_type(left.ty, right.ty);
            left = binary(op, ty, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> CompileResult<TreeNode> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expression()?;
            checker::check_arithmetic_compatible(&left, &right)?;
            let ty = numeric_type(left.ty, right.ty);
            left = binary(op, ty, left, right);
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> CompileResult<TreeNode> {
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::AddrOf,
            _ => return self.parse_postfix_expression(),
        };
        let op_token = self.advance()?;
        let operand = self.parse_unary_expression()?;
        let span = op_token.span.merge(operand.span);

        let ty = match op {
            // a negative literal is still a literal
            UnaryOp::Neg if operand.is_literal() => {
                return Ok(TreeNode::num(operand.value.wrapping_neg(), operand.ty, span));
            }
            UnaryOp::Neg => operand.ty,
            UnaryOp::Not => TypeTag::Int,
            UnaryOp::Deref => operand.ty.value_at().map_err(|e| e.with_span(span))?,
            UnaryOp::AddrOf => {
                if !matches!(operand.kind, NodeKind::Id | NodeKind::Index | NodeKind::Unary(UnaryOp::Deref)) {
                    return Err(CompileError::semantic("cannot take the address of this expression", span));
                }
                operand.ty.pointer_to().map_err(|e| e.with_span(span))?
            }
        };

        Ok(TreeNode::new(NodeKind::Unary(op), span)
            .with_type(ty)
            .with_child(operand))
    }

    fn parse_postfix_expression(&mut self) -> CompileResult<TreeNode> {
        let mut node = self.parse_primary_expression()?;

        while self.match_token(&TokenKind::LBracket)? {
            let index = self.parse_expression()?;
            let close = self.expect(TokenKind::RBracket)?;
            node = self.subscript(node, index, close.span)?;
        }

        Ok(node)
    }

    fn parse_primary_expression(&mut self) -> CompileResult<TreeNode> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::IntLiteral(text) => {
                let (value, ty) = self.parse_int_literal(&text, token.span)?;
                Ok(TreeNode::num(value, ty, token.span))
            }
            TokenKind::HexLiteral(text) => {
                let (value, ty) = self.parse_hex_literal(&text, token.span)?;
                Ok(TreeNode::num(value, ty, token.span))
            }
            TokenKind::CharLiteral(text) => {
                let value = self.parse_char_literal(&text, token.span)?;
                Ok(TreeNode::num(value, TypeTag::Char, token.span))
            }
            TokenKind::Identifier(name) => {
                if self.check(&TokenKind::LParen) {
                    self.parse_call(&name, token.span)
                } else {
                    self.identifier(&name, token.span)
                }
            }
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            other => Err(CompileError::parser(
                format!("expected expression, found {}", other),
                token.span,
            )),
        }
    }

    /// Variable reference; an array name not followed by a subscript
    /// decays to a pointer to its element type
    fn identifier(&self, name: &str, span: Span) -> CompileResult<TreeNode> {
        let id = self.resolve(name, span)?;
        let record = self.symbols.get(id);

        if record.kind == SymbolKind::Function {
            return Err(CompileError::semantic(
                format!("function '{}' used as a value", name),
                span,
            ));
        }

        let ty = if record.is_array() && !self.check(&TokenKind::LBracket) {
            record.ty.pointer_to().map_err(|e| e.with_span(span))?
        } else {
            record.ty
        };
        Ok(TreeNode::new(NodeKind::Id, span).with_type(ty).with_id(id))
    }

    fn parse_call(&mut self, name: &str, name_span: Span) -> CompileResult<TreeNode> {
        let id = self.resolve(name, name_span)?;
        if self.symbols.kind(id) != SymbolKind::Function {
            return Err(CompileError::semantic(
                format!("'{}' is not a function", name),
                name_span,
            ));
        }

        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen)?;

        Ok(TreeNode::list(NodeKind::Call, args, name_span.merge(close.span))
            .with_type(self.symbols.ty(id))
            .with_id(id))
    }

    fn subscript(&self, base: TreeNode, index: TreeNode, close: Span) -> CompileResult<TreeNode> {
        checker::check_arithmetic_compatible(&base, &index)?;
        let span = base.span.merge(close);

        let array = self
            .array_access(&base)
            .filter(|(id, depth)| *depth <= self.symbols.dimension_count(*id));
        let ty = match array {
            Some((id, depth)) if depth < self.symbols.dimension_count(id) => {
                self.symbols.ty(id).pointer_to()
            }
            Some((id, _)) => Ok(self.symbols.ty(id)),
            None => base.ty.value_at(),
        }
        .map_err(|e| e.with_span(span))?;

        let mut node = TreeNode::new(NodeKind::Index, span)
            .with_type(ty)
            .with_child(base)
            .with_child(index);
        node.id = array.map(|(id, _)| id);
        Ok(node)
    }

    /// Array symbol and subscript depth when `base[...]` indexes a named array
    fn array_access(&self, base: &TreeNode) -> Option<(SymbolId, usize)> {
        let mut depth = 1;
        let mut node = base;
        while node.kind == NodeKind::Index {
            depth += 1;
            node = node.child(0)?;
        }
        let id = node.id.filter(|id| node.kind == NodeKind::Id && self.symbols.get(*id).is_array())?;
        Some((id, depth))
    }

    // =========================================================================
    // Literals
    // =========================================================================

    /// Decimal literal; an `l` suffix or a value outside `i32` makes it long
    fn parse_int_literal(&self, text: &str, span: Span) -> CompileResult<(i64, TypeTag)> {
        let (digits, long) = split_long_suffix(text);
        let value = digits.parse::<i64>().map_err(|_| {
            CompileError::parser(format!("invalid integer literal '{}'", text), span)
        })?;
        Ok((value, literal_type(value, long)))
    }

    fn parse_hex_literal(&self, text: &str, span: Span) -> CompileResult<(i64, TypeTag)> {
        let (digits, long) = split_long_suffix(text);
        let value = i64::from_str_radix(&digits[2..], 16).map_err(|_| {
            CompileError::parser(format!("invalid hex literal '{}'", text), span)
        })?;
        Ok((value, literal_type(value, long)))
    }

    fn parse_char_literal(&self, text: &str, span: Span) -> CompileResult<i64> {
        let invalid = || CompileError::parser(format!("invalid character literal {}", text), span);
        let inner = text
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .ok_or_else(invalid)?;

        let mut chars = inner.chars();
        let c = match (chars.next(), chars.next()) {
            (Some('\\'), Some(escape)) => match escape {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                '\\' => '\\',
                '\'' => '\'',
                '"' => '"',
                other => {
                    return Err(CompileError::parser(
                        format!("unknown escape sequence '\\{}'", other),
                        span,
                    ));
                }
            },
            (Some(c), None) => c,
            _ => return Err(invalid()),
        };
        Ok(i64::from(u32::from(c)))
    }
}

fn binary(op: BinaryOp, ty: TypeTag, left: TreeNode, right: TreeNode) -> TreeNode {
    let span = left.span.merge(right.span);
    TreeNode::new(NodeKind::Binary(op), span)
        .with_type(ty)
        .with_child(left)
        .with_child(right)
}

/// Result of `+`/`-`: the pointer operand's type if any, else the wider integer
fn additive_type(left: TypeTag, right: TypeTag) -> TypeTag {
    if left.is_pointer() {
        left
    } else if right.is_pointer() {
        right
    } else {
        numeric_type(left, right)
    }
}

fn numeric_type(left: TypeTag, right: TypeTag) -> TypeTag {
    if left == TypeTag::Long || right == TypeTag::Long {
        TypeTag::Long
    } else {
        TypeTag::Int
    }
}

fn split_long_suffix(text: &str) -> (&str, bool) {
    match text.strip_suffix(['l', 'L']) {
        Some(digits) => (digits, true),
        None => (text, false),
    }
}

fn literal_type(value: i64, long: bool) -> TypeTag {
    if long || i32::try_from(value).is_err() {
        TypeTag::Long
    } else {
        TypeTag::Int
    }
}
