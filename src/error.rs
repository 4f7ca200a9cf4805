use miette::{Diagnostic, NamedSource, SourceSpan};
use std::fmt;
use thiserror::Error;

/// A failure discovered while lexing, parsing, or validating a document.
///
/// Carries the 1-based line/column of the offending token or construct and
/// the full source text so the error can be rendered in context. The
/// [`std::fmt::Display`] impl prints the offending source line with a `^`
/// marker aligned under the column; tabs in the source are preserved in the
/// marker line so the caret lines up in a terminal.
#[derive(Debug, Clone, Diagnostic)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("{message}")]
    pub span: SourceSpan,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        line: usize,
        column: usize,
        source: &str,
        offset: usize,
        len: usize,
    ) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            src: NamedSource::new("input.toml", source.to_string()),
            span: (offset, len).into(),
        }
    }

    /// The source text the error was produced from.
    pub fn source_text(&self) -> &str {
        self.src.inner()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.message, self.line, self.column
        )?;
        if let Some(line_text) = crate::utils::source_line(self.src.inner(), self.line) {
            write!(f, "\n{line_text}\n")?;
            // Keep tabs so the caret stays aligned under the column.
            for ch in line_text.chars().take(self.column.saturating_sub(1)) {
                f.write_str(if ch == '\t' { "\t" } else { " " })?;
            }
            f.write_str("^")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// All failures surfaced by the crate: parse/validation errors wrap a
/// [`ParseError`]; the remaining variants are sentinels for API misuse
/// on the construction and mutation surface.
#[derive(Error, Debug, Diagnostic)]
pub enum TomlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("empty key")]
    EmptyKey,

    #[error("invalid value type")]
    InvalidValueType,

    #[error("invalid node type")]
    InvalidNodeType,

    #[error("invalid datetime: {0}")]
    InvalidDateTime(String),

    #[error("invalid whitespace: {0:?}")]
    InvalidWhitespace(String),

    #[error("invalid comment: {0}")]
    InvalidComment(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("key {0:?} conflicts with dotted key")]
    KeyConflictsWithDottedKey(String),

    #[error("array index {0} out of range")]
    IndexOutOfRange(usize),
}
