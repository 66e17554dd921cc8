use super::token::{Token, TokenKind};

/// Hand-rolled scanner producing the token stream the parser consumes.
/// Schwa is indentation-structured like Python rather than brace-delimited,
/// so rather than reach for a context-free grammar crate the lexer tracks
/// an indentation-width stack and synthesizes `Indent`/`Dedent` tokens
/// itself, in the spirit of a small state machine rather than a
/// parser-combinator or regex pile.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    row: usize,
    column: usize,
    indents: Vec<usize>,
    at_line_start: bool,
    pending: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.as_bytes(),
            pos: 0,
            row: 1,
            column: 1,
            indents: vec![0],
            at_line_start: true,
            pending: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.row += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending.pop() {
            return token;
        }

        if self.at_line_start {
            if let Some(token) = self.handle_line_start() {
                return token;
            }
        }

        self.skip_inline_whitespace_and_comments();

        let row = self.row;
        let column = self.column;

        let byte = match self.peek() {
            Some(b) => b,
            None => return self.handle_eof(row, column),
        };

        if byte == b'\n' {
            self.advance();
            self.at_line_start = true;
            return Token::new(TokenKind::Newline, "\n", row, column);
        }

        if byte.is_ascii_digit() {
            return self.lex_number(row, column);
        }

        if byte == b'_' || byte.is_ascii_alphabetic() {
            return self.lex_identifier_or_keyword(row, column);
        }

        self.lex_operator(row, column)
    }

    /// At the start of a logical line: measure leading whitespace, skip
    /// wholly-blank/comment-only lines without affecting the indent stack,
    /// and emit `Indent`/`Dedent` tokens for the first real line of code.
    fn handle_line_start(&mut self) -> Option<Token> {
        loop {
            let start = self.pos;
            let mut width = 0usize;
            while let Some(b' ') = self.peek() {
                self.advance();
                width += 1;
            }
            while let Some(b'\t') = self.peek() {
                self.advance();
                width += 8;
            }

            match self.peek() {
                None => {
                    self.at_line_start = false;
                    return None;
                }
                Some(b'\n') => {
                    self.advance();
                    continue;
                }
                Some(b'#') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                    continue;
                }
                _ => {
                    self.at_line_start = false;
                    let row = self.row;
                    let column = self.column;
                    let _ = start;
                    return self.emit_indentation(width, row, column);
                }
            }
        }
    }

    fn emit_indentation(&mut self, width: usize, row: usize, column: usize) -> Option<Token> {
        let current = *self.indents.last().unwrap();
        if width > current {
            self.indents.push(width);
            Some(Token::new(TokenKind::Indent, "", row, column))
        } else if width < current {
            let mut dedents = 0;
            while *self.indents.last().unwrap() > width {
                self.indents.pop();
                dedents += 1;
            }
            for _ in 1..dedents {
                self.pending.push(Token::new(TokenKind::Dedent, "", row, column));
            }
            Some(Token::new(TokenKind::Dedent, "", row, column))
        } else {
            None
        }
    }

    fn skip_inline_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.advance();
                }
                Some(b'#') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn handle_eof(&mut self, row: usize, column: usize) -> Token {
        if self.indents.len() > 1 {
            self.indents.pop();
            return Token::new(TokenKind::Dedent, "", row, column);
        }
        Token::new(TokenKind::Eof, "", row, column)
    }

    fn lex_number(&mut self, row: usize, column: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.advance();
            }
        }

        let mut kind = if is_float { TokenKind::DoubleLiteral } else { TokenKind::IntLiteral };

        // Trailing suffix disambiguates the literal's exact type: u/U -> uint,
        // l/L -> long, ul/UL -> ulong, f/F -> float.
        match self.peek() {
            Some(b'u') | Some(b'U') if !is_float => {
                self.advance();
                if matches!(self.peek(), Some(b'l') | Some(b'L')) {
                    self.advance();
                    kind = TokenKind::ULongLiteral;
                } else {
                    kind = TokenKind::UIntLiteral;
                }
            }
            Some(b'l') | Some(b'L') if !is_float => {
                self.advance();
                kind = TokenKind::LongLiteral;
            }
            Some(b'f') | Some(b'F') => {
                self.advance();
                kind = TokenKind::FloatLiteral;
            }
            _ => {}
        }

        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        Token::new(kind, text, row, column)
    }

    fn lex_identifier_or_keyword(&mut self, row: usize, column: usize) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b == b'_' || b.is_ascii_alphanumeric()) {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = match text.as_str() {
            "void" => TokenKind::Void,
            "int" => TokenKind::Int,
            "uint" => TokenKind::UInt,
            "long" => TokenKind::Long,
            "ulong" => TokenKind::ULong,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "bool" => TokenKind::Bool,
            "struct" => TokenKind::Struct,
            "const" => TokenKind::Const,
            "export" => TokenKind::Export,
            "global" => TokenKind::Global,
            "map" => TokenKind::Map,
            "return" => TokenKind::Return,
            "as" => TokenKind::As,
            "to" => TokenKind::To,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "true" | "false" => TokenKind::BoolLiteral,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, text, row, column)
    }

    fn lex_operator(&mut self, row: usize, column: usize) -> Token {
        macro_rules! two {
            ($second:expr, $two_kind:expr, $one_kind:expr, $first:expr) => {{
                self.advance();
                if self.peek() == Some($second) {
                    self.advance();
                    Token::new($two_kind, format!("{}{}", $first as char, $second as char), row, column)
                } else {
                    Token::new($one_kind, ($first as char).to_string(), row, column)
                }
            }};
        }

        let byte = self.peek().unwrap();
        match byte {
            b'+' => {
                self.advance();
                Token::new(TokenKind::Plus, "+", row, column)
            }
            b'-' => {
                self.advance();
                Token::new(TokenKind::Minus, "-", row, column)
            }
            b'*' => {
                self.advance();
                Token::new(TokenKind::Star, "*", row, column)
            }
            b'/' => {
                self.advance();
                Token::new(TokenKind::Slash, "/", row, column)
            }
            b'%' => {
                self.advance();
                Token::new(TokenKind::Percent, "%", row, column)
            }
            b'^' => {
                self.advance();
                Token::new(TokenKind::Caret, "^", row, column)
            }
            b'~' => {
                self.advance();
                Token::new(TokenKind::Tilde, "~", row, column)
            }
            b'.' => {
                self.advance();
                Token::new(TokenKind::Dot, ".", row, column)
            }
            b',' => {
                self.advance();
                Token::new(TokenKind::Comma, ",", row, column)
            }
            b'(' => {
                self.advance();
                Token::new(TokenKind::LParen, "(", row, column)
            }
            b')' => {
                self.advance();
                Token::new(TokenKind::RParen, ")", row, column)
            }
            b'&' => two!(b'&', TokenKind::AndAnd, TokenKind::Amp, b'&'),
            b'|' => {
                self.advance();
                match self.peek() {
                    Some(b'|') => {
                        self.advance();
                        Token::new(TokenKind::OrOr, "||", row, column)
                    }
                    Some(b'>') => {
                        self.advance();
                        Token::new(TokenKind::RotateRight, "|>", row, column)
                    }
                    _ => Token::new(TokenKind::Pipe, "|", row, column),
                }
            }
            b'=' => two!(b'=', TokenKind::EqEq, TokenKind::Eq, b'='),
            b'!' => two!(b'=', TokenKind::NotEq, TokenKind::Bang, b'!'),
            b'<' => {
                self.advance();
                match self.peek() {
                    Some(b'=') => {
                        self.advance();
                        Token::new(TokenKind::Le, "<=", row, column)
                    }
                    Some(b'<') => {
                        self.advance();
                        Token::new(TokenKind::Shl, "<<", row, column)
                    }
                    Some(b'|') => {
                        self.advance();
                        Token::new(TokenKind::RotateLeft, "<|", row, column)
                    }
                    _ => Token::new(TokenKind::Lt, "<", row, column),
                }
            }
            b'>' => {
                self.advance();
                match self.peek() {
                    Some(b'=') => {
                        self.advance();
                        Token::new(TokenKind::Ge, ">=", row, column)
                    }
                    Some(b'>') => {
                        self.advance();
                        Token::new(TokenKind::Shr, ">>", row, column)
                    }
                    _ => Token::new(TokenKind::Gt, ">", row, column),
                }
            }
            other => {
                self.advance();
                Token::new(TokenKind::Identifier, (other as char).to_string(), row, column)
            }
        }
    }
}
