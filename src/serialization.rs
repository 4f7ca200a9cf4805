//! Serialization: lossless text reconstruction and the tagged-value export.
//!
//! Rendering a [`Document`] concatenates each node's preserved text in
//! document order, so a parsed, unmutated document serializes back to its
//! input byte for byte. Mutated inline containers contribute their
//! regenerated synthetic text; everything else keeps its original trivia.
//!
//! [`to_tagged_value`] converts a document into a `{"type", "value"}` tree
//! (scalars tagged with their TOML type, arrays and string-keyed tables for
//! the containers). The external encoder/decoder conformance drivers
//! serialize this with `serde_json`.

use crate::ast::{Document, Item, KeyPart, KeyValue, Value};
use crate::error::TomlError;
use crate::validate::{validate_datetime_text, DateTimeKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in self.items() {
            f.write_str(&item.text())?;
        }
        Ok(())
    }
}

/// A decoded value tree tagged with TOML types, in the shape the
/// conformance harness expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaggedValue {
    Scalar {
        #[serde(rename = "type")]
        kind: &'static str,
        value: String,
    },
    Array(Vec<TaggedValue>),
    Table(BTreeMap<String, TaggedValue>),
}

/// Converts a validated document into a [`TaggedValue`] tree.
pub fn to_tagged_value(doc: &Document) -> Result<TaggedValue, TomlError> {
    let mut root = BTreeMap::new();

    for item in doc.items() {
        match item {
            Item::KeyValue(kv) => insert_key_value(&mut root, kv)?,
            Item::Table(t) => {
                let table = descend(&mut root, t.header_parts())?;
                for kv in t.key_values() {
                    insert_key_value(table, kv)?;
                }
            }
            Item::ArrayOfTables(a) => {
                let parent = descend(&mut root, &a.header_parts()[..a.header_parts().len() - 1])?;
                let name = last_segment(a.header_parts());
                let slot = parent
                    .entry(name)
                    .or_insert_with(|| TaggedValue::Array(Vec::new()));
                let TaggedValue::Array(arr) = slot else {
                    return Err(TomlError::InvalidNodeType);
                };
                arr.push(TaggedValue::Table(BTreeMap::new()));
                let TaggedValue::Table(table) = arr.last_mut().expect("just pushed") else {
                    unreachable!("pushed a table");
                };
                for kv in a.key_values() {
                    insert_key_value(table, kv)?;
                }
            }
            Item::Trivia(_) => {}
        }
    }

    Ok(TaggedValue::Table(root))
}

fn last_segment(parts: &[KeyPart]) -> String {
    parts.last().map(|p| p.unquoted.clone()).unwrap_or_default()
}

/// Walks (creating as needed) the nested tables for `parts`, descending
/// into the last element of any array-of-tables crossed on the way.
fn descend<'a>(
    root: &'a mut BTreeMap<String, TaggedValue>,
    parts: &[KeyPart],
) -> Result<&'a mut BTreeMap<String, TaggedValue>, TomlError> {
    let mut current = root;
    for part in parts {
        let slot = current
            .entry(part.unquoted.clone())
            .or_insert_with(|| TaggedValue::Table(BTreeMap::new()));
        current = match slot {
            TaggedValue::Table(t) => t,
            TaggedValue::Array(arr) => match arr.last_mut() {
                Some(TaggedValue::Table(t)) => t,
                _ => return Err(TomlError::InvalidNodeType),
            },
            TaggedValue::Scalar { .. } => return Err(TomlError::InvalidNodeType),
        };
    }
    Ok(current)
}

fn insert_key_value(
    table: &mut BTreeMap<String, TaggedValue>,
    kv: &KeyValue,
) -> Result<(), TomlError> {
    let parts = kv.key_parts();
    let table = descend_tables(table, &parts[..parts.len() - 1])?;
    let leaf = last_segment(parts);
    if table.contains_key(&leaf) {
        return Err(TomlError::DuplicateKey(leaf));
    }
    table.insert(leaf, tag_value(kv.value())?);
    Ok(())
}

fn descend_tables<'a>(
    root: &'a mut BTreeMap<String, TaggedValue>,
    parts: &[KeyPart],
) -> Result<&'a mut BTreeMap<String, TaggedValue>, TomlError> {
    let mut current = root;
    for part in parts {
        let slot = current
            .entry(part.unquoted.clone())
            .or_insert_with(|| TaggedValue::Table(BTreeMap::new()));
        let TaggedValue::Table(t) = slot else {
            return Err(TomlError::InvalidNodeType);
        };
        current = t;
    }
    Ok(current)
}

fn tag_value(value: &Value) -> Result<TaggedValue, TomlError> {
    Ok(match value {
        Value::String(s) => TaggedValue::Scalar {
            kind: "string",
            value: s.value(),
        },
        Value::Number(n) => match n.int() {
            Ok(v) => TaggedValue::Scalar {
                kind: "integer",
                value: v.to_string(),
            },
            Err(_) => TaggedValue::Scalar {
                kind: "float",
                value: n.float()?.to_string(),
            },
        },
        Value::Boolean(b) => TaggedValue::Scalar {
            kind: "bool",
            value: b.text().to_string(),
        },
        Value::DateTime(dt) => TaggedValue::Scalar {
            kind: match validate_datetime_text(dt.text()) {
                Ok(DateTimeKind::OffsetDateTime) => "datetime",
                Ok(DateTimeKind::LocalDateTime) => "datetime-local",
                Ok(DateTimeKind::LocalDate) => "date-local",
                Ok(DateTimeKind::LocalTime) => "time-local",
                Err(_) => return Err(TomlError::InvalidDateTime(dt.text().to_string())),
            },
            value: dt.text().to_string(),
        },
        Value::Array(arr) => {
            let mut out = Vec::with_capacity(arr.len());
            for elem in arr.elements() {
                out.push(tag_value(elem)?);
            }
            TaggedValue::Array(out)
        }
        Value::InlineTable(it) => {
            let mut out = BTreeMap::new();
            for kv in it.entries() {
                insert_key_value(&mut out, kv)?;
            }
            TaggedValue::Table(out)
        }
    })
}
