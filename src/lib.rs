pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod serialization;
pub mod utils;
pub mod validate;
mod api;
mod mutate;
mod query;

pub use api::{parse, parse_str};
pub use ast::{
    ArrayOfTables, ArrayVal, BoolVal, Comment, DateTimeVal, Document, Entry, InlineTableVal,
    Item, KeyPart, KeyValue, NodeKind, NodeRef, NumberVal, StringVal, TableHeader, Trivia, Value,
    Whitespace,
};
pub use error::{ParseError, TomlError};
pub use serialization::{to_tagged_value, TaggedValue};
pub use validate::DateTimeKind;
