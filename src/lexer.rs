use crate::error::{ErrorKind, LilithError, Span};
use std::collections::HashMap;

/// Opens and closes a string literal. Doubles as the multiplication operator.
pub const STRING_MARKER: char = '*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    // Relational
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    EqualEqual,
    LessGreater,
    BangEqual,

    // Assignment
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,

    // Structure
    Arrow,
    LeftParen,
    RightParen,
    BlockOpen,
    BlockClose,
    Question,
    DoubleQuestion,
    TripleQuestion,

    // I/O
    Input,
    Output,
    Send,

    // Literals
    Identifier,
    String,
    Number,

    // Reserved keywords
    While,
    For,
    Break,
    Continue,

    // Special
    Eof,
}

impl TokenType {
    /// Whether a token of this type completes an operand.
    fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenType::Identifier | TokenType::String | TokenType::Number | TokenType::RightParen
        )
    }

    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            TokenType::While | TokenType::For | TokenType::Break | TokenType::Continue
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
        }
    }
}

/// Forward-only tokenizer. Yields tokens on demand and finishes with a
/// single `Eof` token, or stops after the first error.
pub struct Lexer {
    source: String,
    start: usize,
    current: usize,
    after_operand: bool,
    finished: bool,
    keywords: HashMap<&'static str, TokenType>,
}

impl Lexer {
    pub fn new(source: String) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("while", TokenType::While);
        keywords.insert("for", TokenType::For);
        keywords.insert("break", TokenType::Break);
        keywords.insert("continue", TokenType::Continue);

        Self {
            source,
            start: 0,
            current: 0,
            after_operand: false,
            finished: false,
            keywords,
        }
    }

    /// Drain the lexer, stopping at the first error.
    pub fn scan_tokens(self) -> Result<Vec<Token>, LilithError> {
        self.collect()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r' | '\n') {
            self.advance();
        }
    }

    fn scan_token(&mut self) -> Result<Token, LilithError> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return Ok(Token::new(
                TokenType::Eof,
                String::new(),
                Span::single(self.current),
            ));
        }

        let c = self.advance();

        let token_type = match c {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '^' => TokenType::Caret,
            '[' => self.io_marker(c)?,
            '?' => {
                if self.match_char('?') {
                    if self.match_char('?') {
                        TokenType::TripleQuestion
                    } else {
                        TokenType::DoubleQuestion
                    }
                } else if self.match_char('>') {
                    TokenType::BlockClose
                } else {
                    TokenType::Question
                }
            }
            '<' => {
                if self.match_char('?') {
                    TokenType::BlockOpen
                } else if self.match_char('-') {
                    TokenType::Send
                } else if self.match_char('=') {
                    TokenType::LessEqual
                } else if self.match_char('>') {
                    TokenType::LessGreater
                } else {
                    TokenType::Less
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                }
            }
            '=' => {
                if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    return Err(self.unexpected(c));
                }
            }
            '+' => {
                if !self.after_operand && self.peek().is_ascii_digit() {
                    self.number()
                } else if self.match_char('=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                }
            }
            '-' => {
                if self.match_char('>') {
                    TokenType::Arrow
                } else if !self.after_operand && self.peek().is_ascii_digit() {
                    self.number()
                } else if self.match_char('=') {
                    TokenType::MinusEqual
                } else {
                    TokenType::Minus
                }
            }
            STRING_MARKER => {
                if !self.after_operand {
                    self.string()?
                } else if self.match_char('=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    TokenType::SlashEqual
                } else {
                    TokenType::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    TokenType::PercentEqual
                } else {
                    TokenType::Percent
                }
            }
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            _ => return Err(self.unexpected(c)),
        };

        Ok(self.add_token(token_type))
    }

    fn unexpected(&self, c: char) -> LilithError {
        LilithError::lex_error(c, self.start, format!("Unexpected character: '{}'", c))
    }

    fn advance(&mut self) -> char {
        match self.source[self.current..].chars().next() {
            Some(c) => {
                self.current += c.len_utf8();
                c
            }
            None => '\0',
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, n: usize) -> char {
        self.source[self.current..].chars().nth(n).unwrap_or('\0')
    }

    /// `[i]` and `[o]`; the opening bracket is already consumed.
    fn io_marker(&mut self, open: char) -> Result<TokenType, LilithError> {
        let token_type = match self.peek() {
            'i' => TokenType::Input,
            'o' => TokenType::Output,
            _ => return Err(self.unexpected(open)),
        };
        if self.peek_next() != ']' {
            return Err(self.unexpected(open));
        }
        self.advance();
        self.advance();
        Ok(token_type)
    }

    /// The opening marker is already consumed; the literal ends at the next one.
    fn string(&mut self) -> Result<TokenType, LilithError> {
        while self.peek() != STRING_MARKER && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(LilithError::new_with_help(
                ErrorKind::Lex {
                    character: STRING_MARKER,
                },
                Span::single(self.start),
                "Unterminated string literal".to_string(),
                format!(
                    "String literals are enclosed in a pair of '{}' markers.",
                    STRING_MARKER
                ),
            ));
        }

        self.advance();
        Ok(TokenType::String)
    }

    /// Any sign and the first digit are already consumed.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), 'e' | 'E') {
            let signed = matches!(self.peek_next(), '+' | '-');
            let first_digit = if signed { 2 } else { 1 };
            if self.peek_at(first_digit).is_ascii_digit() {
                for _ in 0..first_digit {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        TokenType::Number
    }

    fn identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        self.keywords
            .get(text)
            .copied()
            .unwrap_or(TokenType::Identifier)
    }

    fn add_token(&mut self, token_type: TokenType) -> Token {
        self.after_operand = token_type.ends_operand();
        let text = &self.source[self.start..self.current];
        Token::new(
            token_type,
            text.to_string(),
            Span::new(self.start, self.current),
        )
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LilithError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.scan_token();
        match &result {
            Ok(token) if token.token_type != TokenType::Eof => {}
            _ => self.finished = true,
        }
        Some(result)
    }
}

/// Whether `text` is exactly one number literal:
/// `[+-]? digits ('.' digits)? ([eE] [+-]? digits)?`.
pub fn is_number_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i > start
    };

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    if !digits(&mut i) {
        return false;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if !digits(&mut i) {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if !digits(&mut i) {
            return false;
        }
    }

    i == bytes.len()
}
