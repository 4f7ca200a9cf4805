//! # TOML Parser
//!
//! A recursive descent parser over the token stream, building the CST with
//! one token of lookahead. Trivia collected before a construct becomes that
//! construct's leading trivia; same-line whitespace and comments after a
//! value become its trailing trivia; the line terminator is stored
//! separately so serialization can reproduce the source exactly.
//!
//! The parser owns the two pieces of context the lexer cannot know:
//!
//! - it toggles the lexer's value mode around `= value` regions and inside
//!   arrays, and restores key mode for inline-table keys;
//! - it merges two consecutive `[` tokens into an array-of-tables header.

use crate::ast::{
    ArrayOfTables, ArrayVal, BoolVal, Comment, DateTimeVal, Document, Entry, InlineTableVal, Item,
    KeyPart, KeyValue, NumberVal, StringVal, TableHeader, Trivia, Value, Whitespace,
};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::query::process_basic_escapes;
use crate::utils::is_bare_key_char;
use crate::validate::{
    validate_comment_text, validate_datetime_text, validate_number_text, validate_string_text,
};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Token<'a>,
    source: &'a str,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token();
        Self { lexer, cur, source }
    }

    fn advance(&mut self) -> Token<'a> {
        let prev = self.cur;
        self.cur = self.lexer.next_token();
        prev
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.cur.kind == kind
    }

    fn parse_error(&self, msg: impl Into<String>) -> ParseError {
        self.tok_error(msg, self.cur)
    }

    fn tok_error(&self, msg: impl Into<String>, tok: Token<'a>) -> ParseError {
        let len = tok.text.len().max(1).min(self.source.len().saturating_sub(tok.pos));
        ParseError::new(msg, tok.line, tok.col, self.source, tok.pos, len)
    }

    /// Parses the whole document, routing key-values under the most recent
    /// table or array-of-tables header.
    pub fn parse_document(&mut self) -> Result<Document, ParseError> {
        let mut doc = Document {
            items: Vec::new(),
            source: self.source.to_string(),
        };
        // Index into doc.items of the header currently receiving entries.
        let mut current_table: Option<usize> = None;

        while !self.at(TokenKind::Eof) {
            let trivia = self.collect_leading_trivia()?;

            if self.at(TokenKind::Eof) {
                attach_orphan_trivia(&mut doc, current_table, trivia);
                break;
            }

            if self.at(TokenKind::LBracket) {
                let item = self.parse_table_or_array_header(trivia)?;
                doc.items.push(item);
                current_table = Some(doc.items.len() - 1);
                continue;
            }

            let mut kv = self.parse_key_value(trivia)?;
            self.add_trailing_trivia(&mut kv)?;

            match current_table {
                Some(i) => match &mut doc.items[i] {
                    Item::Table(t) => t.entries.push(Entry::KeyValue(kv)),
                    Item::ArrayOfTables(a) => a.entries.push(Entry::KeyValue(kv)),
                    _ => unreachable!("current_table always points at a header"),
                },
                None => doc.items.push(Item::KeyValue(kv)),
            }
        }

        Ok(doc)
    }

    /// Gathers whitespace, newlines, and comments into trivia nodes.
    fn collect_leading_trivia(&mut self) -> Result<Vec<Trivia>, ParseError> {
        let mut nodes = Vec::new();
        while matches!(
            self.cur.kind,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
        ) {
            let tok = self.advance();
            if tok.kind == TokenKind::Comment {
                if let Err(msg) = validate_comment_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                nodes.push(Trivia::Comment(Comment {
                    text: tok.text.to_string(),
                }));
            } else {
                nodes.push(Trivia::Whitespace(Whitespace {
                    text: tok.text.to_string(),
                }));
            }
        }
        Ok(nodes)
    }

    /// Collects same-line whitespace and comment after a value, then
    /// requires a newline or end of file.
    fn add_trailing_trivia(&mut self, kv: &mut KeyValue) -> Result<(), ParseError> {
        if self.at(TokenKind::Whitespace) {
            let tok = self.advance();
            kv.trailing.push(Trivia::Whitespace(Whitespace {
                text: tok.text.to_string(),
            }));
        }
        if self.at(TokenKind::Comment) {
            let tok = self.advance();
            if let Err(msg) = validate_comment_text(tok.text) {
                return Err(self.tok_error(msg, tok));
            }
            kv.trailing.push(Trivia::Comment(Comment {
                text: tok.text.to_string(),
            }));
        }
        if self.at(TokenKind::Newline) {
            let tok = self.advance();
            kv.newline = tok.text.to_string();
            return Ok(());
        }
        if self.at(TokenKind::Eof) {
            return Ok(());
        }
        Err(self.parse_error("expected newline or end of file after value"))
    }

    /// Disambiguates `[` from `[[` and parses the header body.
    fn parse_table_or_array_header(&mut self, trivia: Vec<Trivia>) -> Result<Item, ParseError> {
        let (line, col) = (self.cur.line, self.cur.col);
        self.advance(); // first [

        if self.at(TokenKind::LBracket) {
            self.advance(); // second [
            return Ok(Item::ArrayOfTables(
                self.parse_array_of_tables_body(trivia, line, col)?,
            ));
        }

        Ok(Item::Table(self.parse_table_header_body(trivia, line, col)?))
    }

    fn parse_table_header_body(
        &mut self,
        trivia: Vec<Trivia>,
        line: usize,
        col: usize,
    ) -> Result<TableHeader, ParseError> {
        let (raw_header, parts) = self.parse_key_in_header()?;

        if !self.at(TokenKind::RBracket) {
            return Err(self.parse_error("expected ']' to close table header"));
        }
        self.advance();

        let (trailing, newline) = self.collect_header_trailing()?;

        Ok(TableHeader {
            leading: trivia,
            header_parts: parts,
            raw_header,
            trailing,
            newline,
            entries: Vec::new(),
            line,
            col,
        })
    }

    fn parse_array_of_tables_body(
        &mut self,
        trivia: Vec<Trivia>,
        line: usize,
        col: usize,
    ) -> Result<ArrayOfTables, ParseError> {
        let (raw_header, parts) = self.parse_key_in_header()?;

        for _ in 0..2 {
            if !self.at(TokenKind::RBracket) {
                return Err(self.parse_error("expected ']]' to close array of tables header"));
            }
            self.advance();
        }

        let (trailing, newline) = self.collect_header_trailing()?;

        Ok(ArrayOfTables {
            leading: trivia,
            header_parts: parts,
            raw_header,
            trailing,
            newline,
            entries: Vec::new(),
            line,
            col,
        })
    }

    fn collect_header_trailing(&mut self) -> Result<(Vec<Trivia>, String), ParseError> {
        let mut nodes = Vec::new();
        if self.at(TokenKind::Whitespace) {
            let tok = self.advance();
            nodes.push(Trivia::Whitespace(Whitespace {
                text: tok.text.to_string(),
            }));
        }
        if self.at(TokenKind::Comment) {
            let tok = self.advance();
            if let Err(msg) = validate_comment_text(tok.text) {
                return Err(self.tok_error(msg, tok));
            }
            nodes.push(Trivia::Comment(Comment {
                text: tok.text.to_string(),
            }));
        }
        let mut newline = String::new();
        if self.at(TokenKind::Newline) {
            newline = self.advance().text.to_string();
        } else if !self.at(TokenKind::Eof) {
            return Err(self.parse_error("expected newline or end of file after table header"));
        }
        Ok((nodes, newline))
    }

    /// Parses the key inside `[ ]` or `[[ ]]`, keeping whitespace around it.
    fn parse_key_in_header(&mut self) -> Result<(String, Vec<KeyPart>), ParseError> {
        let mut raw = String::new();

        if self.at(TokenKind::Whitespace) {
            raw.push_str(self.cur.text);
            self.advance();
        }

        let (parts, key_raw) = self.parse_key()?;
        raw.push_str(&key_raw);

        if self.at(TokenKind::Whitespace) {
            raw.push_str(self.cur.text);
            self.advance();
        }

        Ok((raw, parts))
    }

    /// Parses a simple or dotted key, capturing whitespace around each dot.
    fn parse_key(&mut self) -> Result<(Vec<KeyPart>, String), ParseError> {
        let mut parts = Vec::new();
        let mut raw = String::new();

        let part = self.parse_simple_key()?;
        raw.push_str(&part.text);
        parts.push(part);

        while self.at(TokenKind::Dot)
            || (self.at(TokenKind::Whitespace) && self.lexer.peek_for_dot())
        {
            let mut dot_before = String::new();
            if self.at(TokenKind::Whitespace) {
                dot_before = self.cur.text.to_string();
                raw.push_str(&dot_before);
                self.advance();
            }
            if !self.at(TokenKind::Dot) {
                break;
            }
            raw.push('.');
            self.advance();

            let mut dot_after = String::new();
            if self.at(TokenKind::Whitespace) {
                dot_after = self.cur.text.to_string();
                raw.push_str(&dot_after);
                self.advance();
            }

            let mut part = self.parse_simple_key()?;
            part.dot_before = dot_before;
            part.dot_after = dot_after;
            raw.push_str(&part.text);
            parts.push(part);
        }

        Ok((parts, raw))
    }

    fn parse_simple_key(&mut self) -> Result<KeyPart, ParseError> {
        match self.cur.kind {
            TokenKind::BareKey => {
                let tok = self.advance();
                for r in tok.text.chars() {
                    if !is_bare_key_char(r) {
                        return Err(self.tok_error(
                            format!("invalid character {r:?} in bare key {:?}", tok.text),
                            tok,
                        ));
                    }
                }
                Ok(KeyPart {
                    text: tok.text.to_string(),
                    unquoted: tok.text.to_string(),
                    ..KeyPart::default()
                })
            }
            // Value-shaped tokens double as bare keys in key position
            // (`true = 1`, `1984 = "year"`); preserved for round-trip
            // fidelity with documents that rely on it.
            TokenKind::Boolean | TokenKind::Integer | TokenKind::Float | TokenKind::DateTime => {
                let tok = self.advance();
                Ok(KeyPart {
                    text: tok.text.to_string(),
                    unquoted: tok.text.to_string(),
                    ..KeyPart::default()
                })
            }
            TokenKind::BasicString => {
                let tok = self.advance();
                if let Err(msg) = validate_string_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                Ok(KeyPart {
                    text: tok.text.to_string(),
                    unquoted: unquote_basic_str(tok.text),
                    quoted: true,
                    ..KeyPart::default()
                })
            }
            TokenKind::LiteralString => {
                let tok = self.advance();
                if let Err(msg) = validate_string_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                Ok(KeyPart {
                    text: tok.text.to_string(),
                    unquoted: unquote_literal_str(tok.text),
                    quoted: true,
                    ..KeyPart::default()
                })
            }
            _ => Err(self.parse_error("expected key")),
        }
    }

    fn parse_key_value(&mut self, trivia: Vec<Trivia>) -> Result<KeyValue, ParseError> {
        let (line, col) = (self.cur.line, self.cur.col);
        let (parts, raw_key) = self.parse_key()?;

        let mut pre_eq = String::new();
        if self.at(TokenKind::Whitespace) {
            pre_eq = self.cur.text.to_string();
            self.advance();
        }

        if !self.at(TokenKind::Equals) {
            return Err(self.parse_error("expected '='"));
        }
        self.lexer.value_mode = true; // dot becomes part of floats
        self.advance();

        let mut post_eq = String::new();
        if self.at(TokenKind::Whitespace) {
            post_eq = self.cur.text.to_string();
            self.advance();
        }

        let value = self.parse_value()?;
        self.lexer.value_mode = false; // back to key context

        let raw_value = value.text().to_string();
        Ok(KeyValue {
            leading: trivia,
            key_parts: parts,
            raw_key,
            pre_eq,
            post_eq,
            value,
            raw_value,
            trailing: Vec::new(),
            newline: String::new(),
            line,
            col,
        })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.cur.kind {
            TokenKind::BasicString
            | TokenKind::MultiLineBasicString
            | TokenKind::LiteralString
            | TokenKind::MultiLineLiteralString => {
                let tok = self.advance();
                if let Err(msg) = validate_string_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                Ok(Value::String(StringVal {
                    text: tok.text.to_string(),
                }))
            }
            TokenKind::Integer | TokenKind::Float => {
                let tok = self.advance();
                if let Err(msg) = validate_number_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                Ok(Value::Number(NumberVal {
                    text: tok.text.to_string(),
                }))
            }
            TokenKind::Boolean => {
                let tok = self.advance();
                Ok(Value::Boolean(BoolVal {
                    text: tok.text.to_string(),
                }))
            }
            TokenKind::DateTime => {
                let tok = self.advance();
                if let Err(msg) = validate_datetime_text(tok.text) {
                    return Err(self.tok_error(msg, tok));
                }
                Ok(Value::DateTime(DateTimeVal {
                    text: tok.text.to_string(),
                }))
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_inline_table(),
            _ => Err(self.parse_error("expected value")),
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        let start = self.cur.pos;
        self.advance(); // [

        let mut elements = Vec::new();
        self.skip_ws_comment_newline();

        while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
            self.lexer.value_mode = true;
            let val = self.parse_value()?;
            elements.push(val);
            self.lexer.value_mode = true; // an inline table element resets it
            self.skip_ws_comment_newline();

            if self.at(TokenKind::Comma) {
                self.advance();
                self.skip_ws_comment_newline();
            } else if !self.at(TokenKind::RBracket) {
                return Err(self.parse_error("expected ',' or ']' in array"));
            }
        }

        if !self.at(TokenKind::RBracket) {
            return Err(self.parse_error("expected ']' to close array"));
        }
        let close = self.advance();
        let end = close.pos + close.text.len();

        Ok(Value::Array(ArrayVal {
            elements,
            text: self.source[start..end].to_string(),
        }))
    }

    fn parse_inline_table(&mut self) -> Result<Value, ParseError> {
        let start = self.cur.pos;
        self.lexer.value_mode = false; // keys inside the braces
        self.advance(); // {

        let mut entries = Vec::new();
        self.skip_ws_comment_newline();

        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let kv = self.parse_key_value(Vec::new())?;
            entries.push(kv);
            self.skip_ws_comment_newline();

            if self.at(TokenKind::Comma) {
                self.advance();
                self.skip_ws_comment_newline();
            } else if !self.at(TokenKind::RBrace) {
                return Err(self.parse_error("expected ',' or '}' in inline table"));
            }
        }

        if !self.at(TokenKind::RBrace) {
            return Err(self.parse_error("expected '}' to close inline table"));
        }
        let close = self.advance();
        let end = close.pos + close.text.len();

        Ok(Value::InlineTable(InlineTableVal {
            entries,
            text: self.source[start..end].to_string(),
        }))
    }

    fn skip_ws_comment_newline(&mut self) {
        while matches!(
            self.cur.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Newline
        ) {
            self.advance();
        }
    }
}

fn attach_orphan_trivia(doc: &mut Document, current_table: Option<usize>, trivia: Vec<Trivia>) {
    if trivia.is_empty() {
        return;
    }
    if let Some(rest) = attach_trivia_to_last(doc, trivia) {
        // No trailing key-value to adopt it: keep it as bare trivia in the
        // current container.
        match current_table {
            Some(i) => match &mut doc.items[i] {
                Item::Table(t) => t.entries.extend(rest.into_iter().map(Entry::Trivia)),
                Item::ArrayOfTables(a) => a.entries.extend(rest.into_iter().map(Entry::Trivia)),
                _ => unreachable!("current_table always points at a header"),
            },
            None => doc.items.extend(rest.into_iter().map(Item::Trivia)),
        }
    }
}

/// Attaches end-of-file trivia to the last key-value's trailing trivia.
/// Returns the trivia back when there is no suitable node.
fn attach_trivia_to_last(doc: &mut Document, trivia: Vec<Trivia>) -> Option<Vec<Trivia>> {
    match doc.items.last_mut() {
        Some(Item::Table(t)) => match last_kv(&mut t.entries) {
            Some(kv) => {
                adopt_trivia(kv, trivia);
                None
            }
            None => Some(trivia),
        },
        Some(Item::ArrayOfTables(a)) => match last_kv(&mut a.entries) {
            Some(kv) => {
                adopt_trivia(kv, trivia);
                None
            }
            None => Some(trivia),
        },
        Some(Item::KeyValue(kv)) => {
            adopt_trivia(kv, trivia);
            None
        }
        _ => Some(trivia),
    }
}

/// The adopted trivia sits on lines after the key-value, so its line
/// terminator has to move into the trailing list first to keep
/// serialization byte-exact.
fn adopt_trivia(kv: &mut KeyValue, trivia: Vec<Trivia>) {
    if !kv.newline.is_empty() {
        let nl = std::mem::take(&mut kv.newline);
        kv.trailing.push(Trivia::Whitespace(Whitespace { text: nl }));
    }
    kv.trailing.extend(trivia);
}

fn last_kv(entries: &mut [Entry]) -> Option<&mut KeyValue> {
    match entries.last_mut() {
        Some(Entry::KeyValue(kv)) => Some(kv),
        _ => None,
    }
}

fn unquote_basic_str(s: &str) -> String {
    if s.len() < 2 {
        return s.to_string();
    }
    process_basic_escapes(&s[1..s.len() - 1])
}

fn unquote_literal_str(s: &str) -> String {
    if s.len() < 2 {
        return s.to_string();
    }
    s[1..s.len() - 1].to_string()
}

/// Renders an error the way a terminal consumer would see it. Handy when a
/// test fails and the plain Debug output is unreadable.
#[allow(dead_code)]
fn render_diagnostic(err: ParseError) -> String {
    let report = miette::Report::new(err);
    let handler = miette::GraphicalReportHandler::new();
    let mut buffer = String::new();
    handler.render_report(&mut buffer, &*report).unwrap();
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn parse_ok(source: &str) -> Document {
        match Parser::new(source).parse_document() {
            Ok(doc) => doc,
            Err(err) => panic!("parse failed: {err}\n{}", render_diagnostic(err.clone())),
        }
    }

    #[test]
    fn test_empty_document() {
        let doc = parse_ok("");
        assert!(doc.items().is_empty());
    }

    #[test]
    fn test_simple_key_value() {
        let doc = parse_ok("key = \"value\"\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.raw_key(), "key");
        assert_eq!(kv.pre_eq(), " ");
        assert_eq!(kv.post_eq(), " ");
        assert_eq!(kv.raw_value(), "\"value\"");
        assert_eq!(kv.newline(), "\n");
        assert_eq!(kv.value().kind(), NodeKind::String);
    }

    #[test]
    fn test_leading_and_trailing_trivia() {
        let doc = parse_ok("# top comment\nkey = \"v\"  # inline\n\nother = 1\n");
        let kvs = doc.key_values();
        assert_eq!(kvs.len(), 2);

        let first = kvs[0];
        let leading_comment = first
            .leading_trivia()
            .iter()
            .find_map(|t| match t {
                Trivia::Comment(c) => Some(c.text()),
                Trivia::Whitespace(_) => None,
            })
            .unwrap();
        assert!(leading_comment.contains("top comment"));

        let trailing_comment = first
            .trailing_trivia()
            .iter()
            .find_map(|t| match t {
                Trivia::Comment(c) => Some(c.text()),
                Trivia::Whitespace(_) => None,
            })
            .unwrap();
        assert!(trailing_comment.contains("inline"));

        // The blank line belongs to the next key-value's leading trivia.
        assert!(!kvs[1].leading_trivia().is_empty());
    }

    #[test]
    fn test_orphan_comment_attaches_to_last_entry() {
        let doc = parse_ok("[t]\nkey = 1\n# orphan");
        let table = doc.tables()[0];
        let kv = table.key_values().next().unwrap();
        let has_orphan = kv
            .trailing_trivia()
            .iter()
            .any(|t| matches!(t, Trivia::Comment(c) if c.text().contains("orphan")));
        assert!(has_orphan);
    }

    #[test]
    fn test_orphan_trivia_without_key_value_stays_bare() {
        let doc = parse_ok("# only a comment\n");
        assert!(matches!(doc.items()[0], Item::Trivia(Trivia::Comment(_))));
    }

    #[test]
    fn test_table_and_aot_disambiguation() {
        let doc = parse_ok("[table]\na = 1\n[[aot]]\nb = 2\n");
        assert_eq!(doc.tables().len(), 1);
        assert_eq!(doc.arrays_of_tables().len(), 1);
        assert_eq!(doc.tables()[0].raw_header(), "table");
        assert_eq!(doc.arrays_of_tables()[0].raw_header(), "aot");
    }

    #[test]
    fn test_key_values_route_to_current_table() {
        let doc = parse_ok("top = 1\n[t]\ninner = 2\n");
        assert_eq!(doc.key_values().len(), 1);
        assert_eq!(doc.tables()[0].key_values().count(), 1);
    }

    #[test]
    fn test_header_preserves_inner_whitespace() {
        let doc = parse_ok("[ spaced ]\n");
        assert_eq!(doc.tables()[0].raw_header(), " spaced ");
        assert_eq!(doc.tables()[0].header_parts()[0].unquoted, "spaced");
    }

    #[test]
    fn test_dotted_key_parts() {
        let doc = parse_ok("a.b.c = 1\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        let parts = kv.key_parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].unquoted, "a");
        assert_eq!(parts[2].unquoted, "c");
        assert_eq!(kv.raw_key(), "a.b.c");
    }

    #[test]
    fn test_dotted_key_with_whitespace() {
        let doc = parse_ok("a . b = 1\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.raw_key(), "a . b");
        assert_eq!(kv.key_parts()[1].dot_before, " ");
        assert_eq!(kv.key_parts()[1].dot_after, " ");
    }

    #[test]
    fn test_quoted_keys() {
        let doc = parse_ok("\"key with spaces\" = 1\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.key_parts().len(), 1);
        assert!(kv.key_parts()[0].quoted);
        assert_eq!(kv.key_parts()[0].unquoted, "key with spaces");
    }

    #[test]
    fn test_quoted_key_with_dot_stays_one_part() {
        let doc = parse_ok("\"a.b\" = 1\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.key_parts().len(), 1);
        assert_eq!(kv.key_parts()[0].unquoted, "a.b");
    }

    #[test]
    fn test_value_shaped_tokens_as_keys() {
        let doc = parse_ok("true = 1\n1984 = 2\n3.14 = 3\n");
        let kvs = doc.key_values();
        assert_eq!(kvs[0].raw_key(), "true");
        assert_eq!(kvs[1].raw_key(), "1984");
        // In key mode the dot still splits; 3.14 is two parts.
        assert_eq!(kvs[2].key_parts().len(), 2);
    }

    #[test]
    fn test_array_value_preserves_text() {
        let doc = parse_ok("a = [ 1, 2,  3 ]\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        let arr = kv.value().as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.text(), "[ 1, 2,  3 ]");
        assert_eq!(kv.raw_value(), "[ 1, 2,  3 ]");
    }

    #[test]
    fn test_array_trailing_comma_and_newlines() {
        let doc = parse_ok("a = [\n  1,\n  2,\n]\n");
        let arr = doc.items()[0].as_key_value().unwrap().value().as_array().unwrap();
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn test_nested_arrays() {
        let doc = parse_ok("a = [[1, 2], [3]]\n");
        let arr = doc.items()[0].as_key_value().unwrap().value().as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.elements()[0].kind(), NodeKind::Array);
    }

    #[test]
    fn test_inline_table() {
        let doc = parse_ok("point = {x = 1, y = 2}\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        let it = kv.value().as_inline_table().unwrap();
        assert_eq!(it.entries().len(), 2);
        assert_eq!(it.entries()[0].raw_key(), "x");
        assert_eq!(it.text(), "{x = 1, y = 2}");
    }

    #[test]
    fn test_inline_table_inside_array() {
        let doc = parse_ok("points = [{x = 1}, {x = 2}]\n");
        let arr = doc.items()[0].as_key_value().unwrap().value().as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.elements()[1].kind(), NodeKind::InlineTable);
    }

    #[test]
    fn test_float_value_single_token() {
        let doc = parse_ok("pi = 3.14\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.value().kind(), NodeKind::Number);
        assert_eq!(kv.raw_value(), "3.14");
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = parse_ok("a = 1\r\nb = 2\r\n");
        let kvs = doc.key_values();
        assert_eq!(kvs[0].newline(), "\r\n");
        assert_eq!(kvs[1].newline(), "\r\n");
    }

    #[test]
    fn test_missing_newline_after_value_fails() {
        let err = Parser::new("a = 1 b = 2\n").parse_document().unwrap_err();
        assert!(err.message.contains("expected newline"));
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_error_position_on_bad_value() {
        let err = Parser::new("key = @\n").parse_document().unwrap_err();
        assert_eq!(err.message, "expected value");
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn test_error_on_unclosed_header() {
        let err = Parser::new("[table\n").parse_document().unwrap_err();
        assert!(err.message.contains("expected ']'"));
    }

    #[test]
    fn test_error_on_unclosed_aot_header() {
        let err = Parser::new("[[aot]\n").parse_document().unwrap_err();
        assert!(err.message.contains("']]'"));
    }

    #[test]
    fn test_error_on_bad_bare_key_char() {
        let err = Parser::new("ключ = 1\n").parse_document().unwrap_err();
        assert!(err.message.contains("invalid character"));
    }

    #[test]
    fn test_string_error_reported_at_token() {
        let err = Parser::new("a = 1\nb = \"\\q\"\n").parse_document().unwrap_err();
        assert!(err.message.contains("invalid escape sequence"));
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn test_datetime_error_reported_at_token() {
        let err = Parser::new("d = 2024-13-01\n").parse_document().unwrap_err();
        assert!(err.message.contains("month out of range"));
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_space_separated_datetime_value() {
        let doc = parse_ok("when = 1979-05-27 07:32:00Z\n");
        let kv = doc.items()[0].as_key_value().unwrap();
        assert_eq!(kv.value().kind(), NodeKind::DateTime);
        assert_eq!(kv.raw_value(), "1979-05-27 07:32:00Z");
    }

    #[test]
    fn test_key_without_equals_fails() {
        let err = Parser::new("just_a_key\n").parse_document().unwrap_err();
        assert!(err.message.contains("expected '='"));
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = Parser::new("a = \"open\n").parse_document().unwrap_err();
        assert_eq!(err.message, "expected value");
    }
}
