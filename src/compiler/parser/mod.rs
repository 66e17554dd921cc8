use super::ast::{Ast, AstBuilder, NodeId, NodeKind};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};

/// Parser handles interpretation of the token stream into the intermediate
/// representation.
pub trait AstParser {
    fn default() -> Self;
    fn parse(self, source: &str) -> Ast;
}

/// Recursive-descent parser over Schwa's indentation-delimited token
/// stream. Pest describes context-free grammars, not indentation, so
/// rather than fight the grammar crate against a Python-style layout this
/// walks the token list directly the way the teacher's own hand-rolled
/// `text_parser` walks its token stream.
pub struct SchwaParser;

impl AstParser for SchwaParser {
    fn default() -> Self {
        SchwaParser
    }

    fn parse(self, source: &str) -> Ast {
        let tokens = Lexer::new(source).tokenize();
        let mut state = ParserState::new(tokens);
        state.parse_program()
    }
}

struct ParserState {
    tokens: Vec<Token>,
    pos: usize,
    builder: AstBuilder,
}

impl ParserState {
    fn new(tokens: Vec<Token>) -> Self {
        ParserState { tokens, pos: 0, builder: AstBuilder::new() }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_ahead_kind(&self, offset: usize) -> TokenKind {
        self.tokens.get(self.pos + offset).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Token {
        if self.peek_kind() == kind {
            self.advance()
        } else {
            // A malformed program: synthesize a placeholder token so the
            // parser can keep producing a tree for the validator to mark
            // invalid rather than panicking mid-parse.
            let bad = self.peek().clone();
            Token::new(kind, bad.text, bad.row, bad.column)
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == TokenKind::Newline {
            self.advance();
        }
    }

    fn parse_type_annotation(&mut self) -> NodeId {
        let token = self.advance();
        self.builder.push(NodeKind::Type, token, Vec::new())
    }

    fn parse_program(&mut self) -> Ast {
        let program_token = self.peek().clone();
        let mut statements = Vec::new();
        self.skip_newlines();
        while self.peek_kind() != TokenKind::Eof {
            statements.push(self.parse_top_level_statement());
            self.skip_newlines();
        }
        let root = self.builder.push(NodeKind::Program, program_token, statements);
        let builder = std::mem::take(&mut self.builder);
        builder.finish(root)
    }

    fn parse_top_level_statement(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::Const => {
                let token = self.advance();
                let inner = self.parse_top_level_statement();
                self.builder.push(NodeKind::Const, token, vec![inner])
            }
            TokenKind::Export => {
                let token = self.advance();
                let inner = self.parse_top_level_statement();
                self.builder.push(NodeKind::Export, token, vec![inner])
            }
            TokenKind::Struct => self.parse_struct_def(),
            TokenKind::Map => self.parse_map_decl(),
            TokenKind::Global => {
                // Optional explicit marker; program-scope declarations are
                // `Global` AST nodes whether or not the keyword is spelled.
                self.advance();
                self.parse_global_or_function()
            }
            _ => self.parse_global_or_function(),
        }
    }

    /// A `<type> <ident>` prefix at program scope is either a function
    /// definition (`( params ) NEWLINE INDENT ...`) or a global variable
    /// declaration (`= expression`).
    fn parse_global_or_function(&mut self) -> NodeId {
        let type_node = self.parse_type_annotation();
        let name_token = self.expect(TokenKind::Identifier);

        if self.peek_kind() == TokenKind::LParen {
            self.parse_function_def_rest(type_node, name_token)
        } else {
            self.parse_global_rest(type_node, name_token)
        }
    }

    fn parse_struct_def(&mut self) -> NodeId {
        let struct_token = self.advance(); // `struct`
        let name_token = self.expect(TokenKind::Identifier);
        self.skip_newlines();
        self.expect(TokenKind::Indent);
        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_kind() == TokenKind::Dedent || self.peek_kind() == TokenKind::Eof {
                break;
            }
            let field_type = self.parse_type_annotation();
            let field_name = self.expect(TokenKind::Identifier);
            fields.push(self.builder.push(NodeKind::VariableDef, field_name, vec![field_type]));
            self.skip_newlines();
        }
        self.expect(TokenKind::Dedent);
        let fields_node = self.builder.push(NodeKind::Fields, struct_token, fields);
        self.builder.push(NodeKind::StructDef, name_token, vec![fields_node])
    }

    fn parse_function_def_rest(&mut self, return_type: NodeId, name_token: Token) -> NodeId {
        self.expect(TokenKind::LParen);
        let mut params = Vec::new();
        if self.peek_kind() != TokenKind::RParen {
            loop {
                let param_type = self.parse_type_annotation();
                let param_name = self.expect(TokenKind::Identifier);
                params.push(self.builder.push(NodeKind::VariableDef, param_name, vec![param_type]));
                if self.peek_kind() == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen);
        let params_node = self.builder.push(NodeKind::Parameters, name_token.clone(), params);

        self.skip_newlines();
        self.expect(TokenKind::Indent);
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek_kind() == TokenKind::Dedent || self.peek_kind() == TokenKind::Eof {
                break;
            }
            statements.push(self.parse_statement());
            self.skip_newlines();
        }
        self.expect(TokenKind::Dedent);
        let block_node = self.builder.push(NodeKind::Block, name_token.clone(), statements);

        self.builder.push(NodeKind::FunctionDef, name_token, vec![return_type, params_node, block_node])
    }

    fn parse_global_rest(&mut self, type_node: NodeId, name_token: Token) -> NodeId {
        let var_node = self.builder.push(NodeKind::VariableDef, name_token.clone(), vec![type_node]);
        let eq_token = self.expect(TokenKind::Eq);
        let expr = self.parse_expression();
        self.builder.push(NodeKind::Global, eq_token, vec![var_node, expr])
    }

    fn parse_map_decl(&mut self) -> NodeId {
        let map_token = self.advance(); // `map`
        let type_node = self.parse_type_annotation();
        let name_token = self.expect(TokenKind::Identifier);
        let var_node = self.builder.push(NodeKind::VariableDef, name_token, vec![type_node]);

        let offset_node = if self.peek_kind().is_literal() {
            let literal_token = self.advance();
            self.builder.push(NodeKind::Literal, literal_token, Vec::new())
        } else {
            self.builder.push(NodeKind::Literal, Token::new(TokenKind::IntLiteral, "0", map_token.row, map_token.column), Vec::new())
        };

        self.builder.push(NodeKind::Map, map_token, vec![var_node, offset_node])
    }

    fn parse_statement(&mut self) -> NodeId {
        if self.peek_kind() == TokenKind::Return {
            let token = self.advance();
            if self.peek_kind() == TokenKind::Newline || self.peek_kind() == TokenKind::Dedent || self.peek_kind() == TokenKind::Eof {
                return self.builder.push(NodeKind::ReturnVoid, token, Vec::new());
            }
            let expr = self.parse_expression();
            return self.builder.push(NodeKind::Return, token, vec![expr]);
        }

        let target = self.parse_expression();
        if self.peek_kind() == TokenKind::Eq {
            let eq_token = self.advance();
            let value = self.parse_expression();
            self.builder.push(NodeKind::Assignment, eq_token, vec![target, value])
        } else {
            target
        }
    }

    fn parse_expression(&mut self) -> NodeId {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> NodeId {
        let mut lhs = self.parse_logical_and();
        while self.peek_kind() == TokenKind::OrOr {
            let op = self.advance();
            let rhs = self.parse_logical_and();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_logical_and(&mut self) -> NodeId {
        let mut lhs = self.parse_equality();
        while self.peek_kind() == TokenKind::AndAnd {
            let op = self.advance();
            let rhs = self.parse_equality();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_equality(&mut self) -> NodeId {
        let mut lhs = self.parse_relational();
        while matches!(self.peek_kind(), TokenKind::EqEq | TokenKind::NotEq) {
            let op = self.advance();
            let rhs = self.parse_relational();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_relational(&mut self) -> NodeId {
        let mut lhs = self.parse_bitor_xor();
        while matches!(self.peek_kind(), TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge) {
            let op = self.advance();
            let rhs = self.parse_bitor_xor();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_bitor_xor(&mut self) -> NodeId {
        let mut lhs = self.parse_bitand();
        while matches!(self.peek_kind(), TokenKind::Pipe | TokenKind::Caret) {
            let op = self.advance();
            let rhs = self.parse_bitand();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_bitand(&mut self) -> NodeId {
        let mut lhs = self.parse_shift();
        while self.peek_kind() == TokenKind::Amp {
            let op = self.advance();
            let rhs = self.parse_shift();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_shift(&mut self) -> NodeId {
        let mut lhs = self.parse_additive();
        while matches!(
            self.peek_kind(),
            TokenKind::Shl | TokenKind::Shr | TokenKind::RotateLeft | TokenKind::RotateRight
        ) {
            let op = self.advance();
            let rhs = self.parse_additive();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_additive(&mut self) -> NodeId {
        let mut lhs = self.parse_multiplicative();
        while matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance();
            let rhs = self.parse_multiplicative();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> NodeId {
        let mut lhs = self.parse_cast();
        while matches!(self.peek_kind(), TokenKind::Star | TokenKind::Slash | TokenKind::Percent) {
            let op = self.advance();
            let rhs = self.parse_cast();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    /// `as`/`to` bind tighter than the arithmetic binary operators but
    /// looser than unary, matching how `x as int + 1` is read as
    /// `(x as int) + 1`.
    fn parse_cast(&mut self) -> NodeId {
        let mut lhs = self.parse_unary();
        while matches!(self.peek_kind(), TokenKind::As | TokenKind::To) {
            let op = self.advance();
            let rhs = self.parse_type_annotation();
            lhs = self.builder.push(NodeKind::BinaryOp, op, vec![lhs, rhs]);
        }
        lhs
    }

    fn parse_unary(&mut self) -> NodeId {
        if matches!(self.peek_kind(), TokenKind::Minus | TokenKind::Tilde | TokenKind::Bang) {
            let op = self.advance();
            let operand = self.parse_unary();
            self.builder.push(NodeKind::UnaryOp, op, vec![operand])
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> NodeId {
        let mut node = self.parse_primary();
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let dot_token = self.advance();
                    let field_token = self.expect(TokenKind::Identifier);
                    let field_kind =
                        if self.peek_kind() == TokenKind::LParen { NodeKind::FunctionId } else { NodeKind::VariableId };
                    let field_node = self.builder.push(field_kind, field_token, Vec::new());
                    node = self.builder.push(NodeKind::Access, dot_token, vec![node, field_node]);
                }
                TokenKind::LParen => {
                    let paren_token = self.advance();
                    let mut args = Vec::new();
                    if self.peek_kind() != TokenKind::RParen {
                        loop {
                            args.push(self.parse_expression());
                            if self.peek_kind() == TokenKind::Comma {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen);
                    let args_node = self.builder.push(NodeKind::Arguments, paren_token.clone(), args);
                    node = self.builder.push(NodeKind::FunctionCall, paren_token, vec![node, args_node]);
                }
                _ => break,
            }
        }
        node
    }

    fn parse_primary(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect(TokenKind::RParen);
                inner
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let kind = if self.peek_kind() == TokenKind::LParen { NodeKind::FunctionId } else { NodeKind::VariableId };
                self.builder.push(kind, token, Vec::new())
            }
            kind if kind.is_literal() => {
                let token = self.advance();
                self.builder.push(NodeKind::Literal, token, Vec::new())
            }
            // A bare type keyword in expression position only ever means
            // one thing: the namespace prefix of a builtin call like
            // `int.load(addr)`. Tag it `StructId` so `Access`'s scope rule
            // resolves it as a type-named scope the same way it would a
            // user struct name.
            kind if kind.is_type_keyword() => {
                let token = self.advance();
                self.builder.push(NodeKind::StructId, token, Vec::new())
            }
            _ => {
                // Malformed expression: consume the offending token so the
                // parser makes forward progress and leave a literal-shaped
                // placeholder for the validator to flag as invalid.
                let token = self.advance();
                self.builder.push(NodeKind::Literal, token, Vec::new())
            }
        }
    }
}
