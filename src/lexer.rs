//! # TOML Lexer
//!
//! Converts source text into positioned tokens. The lexer is a hand-written,
//! stateful scanner over the raw bytes of an already UTF-8-validated string.
//!
//! Two properties distinguish it from a context-free tokenizer:
//!
//! - **Single brackets only.** The lexer never emits `[[` or `]]`; the
//!   [`Parser`](crate::parser::Parser) performs array-of-tables
//!   disambiguation from two consecutive bracket tokens.
//! - **Key/value mode.** The parser toggles [`Lexer::value_mode`] around
//!   `= value` regions and inside arrays. In key context `.` is a standalone
//!   token (`a.b` is three tokens); in value context `.` belongs to the
//!   surrounding numeric token (`1.5` is a single float token), and a
//!   well-formed date may absorb a space-separated time.
//!
//! Whitespace, newlines, and comments are produced as ordinary tokens so the
//! parser can preserve them as trivia for lossless round-trips.

/// The kinds of tokens the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An unterminated string or unclassifiable byte.
    Error,
    Eof,
    /// `\n` or `\r\n`.
    Newline,
    /// A run of spaces and tabs.
    Whitespace,
    /// `#` up to (excluding) the line terminator.
    Comment,

    Equals,
    Dot,
    Comma,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    BareKey,
    BasicString,
    MultiLineBasicString,
    LiteralString,
    MultiLineLiteralString,
    Integer,
    Float,
    Boolean,
    DateTime,
}

/// A single lexical token with its exact source text and position.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset in the source.
    pub pos: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in bytes.
    pub col: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    /// When true, `.` is part of numeric tokens (value context).
    pub(crate) value_mode: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
            value_mode: false,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> u8 {
        *self.src.as_bytes().get(self.pos).unwrap_or(&0)
    }

    fn peek_next(&self) -> u8 {
        *self.src.as_bytes().get(self.pos + 1).unwrap_or(&0)
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.src.as_bytes().get(self.pos) {
            self.pos += 1;
            if ch == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, line: usize, col: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.src[start..self.pos],
            pos: start,
            line,
            col,
        }
    }

    /// Returns the next token. Once the end of input is reached this
    /// repeatedly returns an [`TokenKind::Eof`] token.
    pub fn next_token(&mut self) -> Token<'a> {
        if self.at_end() {
            return Token {
                kind: TokenKind::Eof,
                text: "",
                pos: self.pos,
                line: self.line,
                col: self.col,
            };
        }

        let ch = self.peek();
        let (line, col, pos) = (self.line, self.col, self.pos);

        match ch {
            b'\n' => self.scan_newline(),
            b'\r' if self.peek_next() == b'\n' => self.scan_newline(),
            b' ' | b'\t' => self.scan_whitespace(),
            b'#' => self.scan_comment(),
            b'=' => {
                self.advance();
                self.make_token(TokenKind::Equals, pos, line, col)
            }
            b'.' => {
                self.advance();
                self.make_token(TokenKind::Dot, pos, line, col)
            }
            b',' => {
                self.advance();
                self.make_token(TokenKind::Comma, pos, line, col)
            }
            b'[' => {
                self.advance();
                self.make_token(TokenKind::LBracket, pos, line, col)
            }
            b']' => {
                self.advance();
                self.make_token(TokenKind::RBracket, pos, line, col)
            }
            b'{' => {
                self.advance();
                self.make_token(TokenKind::LBrace, pos, line, col)
            }
            b'}' => {
                self.advance();
                self.make_token(TokenKind::RBrace, pos, line, col)
            }
            b'"' => self.scan_basic_string_start(),
            b'\'' => self.scan_literal_string_start(),
            _ => self.scan_bare_or_value(),
        }
    }

    fn scan_newline(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);
        if self.peek() == b'\r' {
            self.advance();
        }
        self.advance(); // \n
        self.make_token(TokenKind::Newline, pos, line, col)
    }

    fn scan_whitespace(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);
        while !self.at_end() && (self.peek() == b' ' || self.peek() == b'\t') {
            self.advance();
        }
        self.make_token(TokenKind::Whitespace, pos, line, col)
    }

    fn scan_comment(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);
        while !self.at_end() && self.peek() != b'\n' && self.peek() != b'\r' {
            self.advance();
        }
        self.make_token(TokenKind::Comment, pos, line, col)
    }

    fn scan_basic_string_start(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);
        self.advance(); // first "
        if self.peek() == b'"' && self.peek_next() == b'"' {
            self.advance();
            self.advance();
            return self.scan_multi_line_basic(pos, line, col);
        }
        self.scan_basic_string(pos, line, col)
    }

    fn scan_basic_string(&mut self, pos: usize, line: usize, col: usize) -> Token<'a> {
        while !self.at_end() {
            match self.peek() {
                b'\n' | b'\r' => return self.make_token(TokenKind::Error, pos, line, col),
                b'\\' => {
                    self.advance();
                    if !self.at_end() {
                        self.advance();
                    }
                }
                b'"' => {
                    self.advance();
                    return self.make_token(TokenKind::BasicString, pos, line, col);
                }
                _ => self.advance(),
            }
        }
        self.make_token(TokenKind::Error, pos, line, col)
    }

    fn scan_multi_line_basic(&mut self, pos: usize, line: usize, col: usize) -> Token<'a> {
        while !self.at_end() {
            match self.peek() {
                b'\\' => {
                    self.advance();
                    if !self.at_end() {
                        self.advance();
                    }
                }
                b'"' => {
                    // The closer is 3-5 consecutive quotes: up to two quotes
                    // of content may precede the delimiter.
                    let mut count = 0;
                    while !self.at_end() && self.peek() == b'"' && count < 5 {
                        self.advance();
                        count += 1;
                    }
                    if count >= 3 {
                        return self.make_token(TokenKind::MultiLineBasicString, pos, line, col);
                    }
                }
                _ => self.advance(),
            }
        }
        self.make_token(TokenKind::Error, pos, line, col)
    }

    fn scan_literal_string_start(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);
        self.advance(); // first '
        if self.peek() == b'\'' && self.peek_next() == b'\'' {
            self.advance();
            self.advance();
            return self.scan_multi_line_literal(pos, line, col);
        }
        self.scan_literal_string(pos, line, col)
    }

    fn scan_literal_string(&mut self, pos: usize, line: usize, col: usize) -> Token<'a> {
        while !self.at_end() {
            match self.peek() {
                b'\n' | b'\r' => return self.make_token(TokenKind::Error, pos, line, col),
                b'\'' => {
                    self.advance();
                    return self.make_token(TokenKind::LiteralString, pos, line, col);
                }
                _ => self.advance(),
            }
        }
        self.make_token(TokenKind::Error, pos, line, col)
    }

    fn scan_multi_line_literal(&mut self, pos: usize, line: usize, col: usize) -> Token<'a> {
        while !self.at_end() {
            if self.peek() == b'\'' {
                let mut count = 0;
                while !self.at_end() && self.peek() == b'\'' && count < 5 {
                    self.advance();
                    count += 1;
                }
                if count >= 3 {
                    return self.make_token(TokenKind::MultiLineLiteralString, pos, line, col);
                }
            } else {
                self.advance();
            }
        }
        self.make_token(TokenKind::Error, pos, line, col)
    }

    /// Scans bare keys, booleans, numbers, datetimes, and special floats.
    fn scan_bare_or_value(&mut self) -> Token<'a> {
        let (pos, line, col) = (self.pos, self.line, self.col);

        // In numeric context the dot belongs to the token (floats, times),
        // not to a dotted key.
        let num_ctx = self.starts_numeric();

        while !self.at_end() && !is_token_delimiter(self.peek(), num_ctx) {
            self.advance();
        }

        if self.pos == pos {
            // The current byte is a delimiter we cannot use here (e.g. a
            // bare carriage return): emit it as an error token.
            self.advance();
            return self.make_token(TokenKind::Error, pos, line, col);
        }

        // Space-separated datetime: `1979-05-27 07:32:00Z`. Only a full
        // YYYY-MM-DD followed by exactly " HH:" is joined.
        if num_ctx && is_date_like(&self.src[pos..self.pos]) && self.peek_space_time() {
            self.advance(); // the space
            while !self.at_end() && !is_token_delimiter(self.peek(), true) {
                self.advance();
            }
        }

        let text = &self.src[pos..self.pos];
        Token {
            kind: classify_bare_token(text),
            text,
            pos,
            line,
            col,
        }
    }

    fn starts_numeric(&self) -> bool {
        if !self.value_mode {
            return false;
        }
        let ch = self.peek();
        ch.is_ascii_digit()
            || ((ch == b'+' || ch == b'-') && self.peek_next().is_ascii_digit())
    }

    fn peek_space_time(&self) -> bool {
        let rest = self.src.as_bytes().get(self.pos..self.pos + 4);
        matches!(rest, Some([b' ', h1, h2, b':']) if h1.is_ascii_digit() && h2.is_ascii_digit())
    }

    /// Reports whether the source past the current position has a dot,
    /// optionally preceded by spaces or tabs. The parser uses this to keep
    /// consuming dotted-key segments across whitespace.
    pub(crate) fn peek_for_dot(&self) -> bool {
        let bytes = self.src.as_bytes();
        let mut pos = self.pos;
        while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
            pos += 1;
        }
        pos < bytes.len() && bytes[pos] == b'.'
    }
}

fn is_token_delimiter(ch: u8, numeric_context: bool) -> bool {
    match ch {
        b' ' | b'\t' | b'\n' | b'\r' | b'#' | b'=' | b',' | b'[' | b']' | b'{' | b'}' | b'"'
        | b'\'' => true,
        b'.' => !numeric_context,
        _ => false,
    }
}

/// Determines the token kind for an unquoted run of characters.
fn classify_bare_token(s: &str) -> TokenKind {
    if s == "true" || s == "false" {
        return TokenKind::Boolean;
    }
    if is_special_float(s) {
        return TokenKind::Float;
    }
    if is_datetime_like(s) {
        return TokenKind::DateTime;
    }
    if looks_like_number(s) {
        return classify_number(s);
    }
    TokenKind::BareKey
}

pub(crate) fn is_special_float(s: &str) -> bool {
    matches!(s, "inf" | "+inf" | "-inf" | "nan" | "+nan" | "-nan")
}

fn is_datetime_like(s: &str) -> bool {
    if s.len() < 5 || !s.as_bytes()[0].is_ascii_digit() {
        return false;
    }
    // Time-only form contains ':'. Date forms contain at least two '-'
    // separators; malformed dates (e.g. 1987-7-05) are still classified
    // here so the validator can reject them with a precise message.
    s.contains(':') || s.bytes().filter(|&b| b == b'-').count() >= 2
}

fn looks_like_number(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let bytes = body.as_bytes();
    match bytes {
        [] => false,
        [first, rest @ ..] => {
            first.is_ascii_digit()
                || (*first == b'0' && matches!(rest.first(), Some(&(b'x' | b'o' | b'b'))))
        }
    }
}

fn classify_number(s: &str) -> TokenKind {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    if body.len() > 1 && body.as_bytes()[0] == b'0' && matches!(body.as_bytes()[1], b'x' | b'o' | b'b')
    {
        return TokenKind::Integer;
    }
    if body.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        TokenKind::Float
    } else {
        TokenKind::Integer
    }
}

/// Checks whether `s` has the exact shape of a full date (YYYY-MM-DD).
fn is_date_like(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10 && b[0].is_ascii_digit() && b[4] == b'-' && b[7] == b'-'
}
