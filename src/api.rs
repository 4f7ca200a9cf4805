//! Parse entry points: UTF-8 check, lex/parse, then semantic validation.

use crate::ast::Document;
use crate::error::{ParseError, TomlError};
use crate::parser::Parser;
use crate::resolver::validate_document;

/// Parses a TOML document from bytes.
///
/// The input is UTF-8-validated first; a decode failure is reported at
/// line 1, column 1 with the byte offset in the message. Empty input yields
/// an empty document. On success the document has passed both token-level
/// and semantic validation, and serializing it reproduces the input byte
/// for byte.
///
/// # Errors
///
/// Returns a [`TomlError::Parse`] for invalid UTF-8, lex/parse failures,
/// token-validator failures, and semantic (table/key conflict) failures.
pub fn parse(bytes: &[u8]) -> Result<Document, TomlError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        let lossy = String::from_utf8_lossy(bytes);
        ParseError::new(
            format!("invalid UTF-8 byte at position {}", e.valid_up_to()),
            1,
            1,
            &lossy,
            0,
            0,
        )
    })?;
    parse_str(text)
}

/// Parses a TOML document from a string slice. See [`parse`].
///
/// # Errors
///
/// Returns a [`TomlError::Parse`] for lex/parse, token-validator, and
/// semantic failures.
pub fn parse_str(source: &str) -> Result<Document, TomlError> {
    if source.is_empty() {
        return Ok(Document::new());
    }
    let doc = Parser::new(source).parse_document()?;
    validate_document(&doc, source)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_document() {
        let doc = parse(b"").unwrap();
        assert!(doc.items().is_empty());
        assert_eq!(doc.to_string(), "");
    }

    #[test]
    fn test_invalid_utf8_reported_at_start() {
        let err = parse(&[b'a', 0xFF, b'b']).unwrap_err();
        let TomlError::Parse(err) = err else {
            panic!("expected parse error");
        };
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("invalid UTF-8 byte at position 1"));
    }

    #[test]
    fn test_parse_validates_semantics() {
        assert!(parse(b"[a]\nk = 1\n[a]\nk = 2\n").is_err());
        assert!(parse(b"a = 1\n").is_ok());
    }

    #[test]
    fn test_document_validate_after_mutation() {
        let doc = parse(b"[a]\nk = 1\n").unwrap();
        assert!(doc.validate().is_ok());
    }
}
