//! Construction and mutation of CST nodes.
//!
//! Constructors validate their input (datetime text, comment content,
//! whitespace runs, duplicate keys) and produce nodes with standard
//! formatting: `key = value` with single spaces and a trailing newline,
//! keys auto-quoted when they are not bare.
//!
//! Structural mutation goes through [`Document`] so the semantic rules stay
//! enforced: an insertion is applied tentatively, the full validator runs,
//! and on failure the insertion is rolled back before the error is
//! returned. Container edits regenerate the synthetic text of the edited
//! container; path-addressed edits regenerate every ancestor inline
//! container along the descent path.

use crate::ast::{
    ArrayOfTables, ArrayVal, BoolVal, Comment, DateTimeVal, Document, Entry, InlineTableVal, Item,
    KeyPart, KeyValue, NumberVal, StringVal, TableHeader, Trivia, Value, Whitespace,
};
use crate::error::TomlError;
use crate::query::{match_key_parts, parse_dotted_path};
use crate::resolver::{key_parts_to_path, validate_document};
use crate::utils::is_bare_key_char;
use crate::validate::{validate_comment_text, validate_datetime_text};

// --- Key helpers ---

fn is_bare_key_str(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_bare_key_char)
}

/// Escapes a string for use inside TOML double quotes.
pub(crate) fn escape_basic_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{0008}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{000C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{007F}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c if (c as u32) > 0xFFFF => out.push_str(&format!("\\U{:08X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn make_key_part(key: &str) -> KeyPart {
    if is_bare_key_str(key) {
        KeyPart {
            text: key.to_string(),
            unquoted: key.to_string(),
            ..KeyPart::default()
        }
    } else {
        KeyPart {
            text: format!("\"{}\"", escape_basic_string(key)),
            unquoted: key.to_string(),
            quoted: true,
            ..KeyPart::default()
        }
    }
}

fn make_key_parts(keys: &[String]) -> Vec<KeyPart> {
    keys.iter().map(|k| make_key_part(k)).collect()
}

fn make_raw_key(parts: &[KeyPart]) -> String {
    let mut out = String::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&p.text);
    }
    out
}

// --- Leaf constructors ---

impl StringVal {
    /// Builds a string value from raw content, escaped and quoted.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self {
            text: format!("\"{}\"", escape_basic_string(s)),
        }
    }
}

impl NumberVal {
    /// Builds a decimal integer value.
    #[must_use]
    pub fn integer(v: i64) -> Self {
        Self { text: v.to_string() }
    }

    /// Builds a float value. Infinities and NaN use their TOML spellings;
    /// integral floats gain a `.0` suffix so they stay floats on re-parse.
    #[must_use]
    pub fn float(v: f64) -> Self {
        let text = if v == f64::INFINITY {
            "inf".to_string()
        } else if v == f64::NEG_INFINITY {
            "-inf".to_string()
        } else if v.is_nan() {
            "nan".to_string()
        } else {
            let mut t = format!("{v}");
            if !t.contains('.') && !t.contains('e') {
                t.push_str(".0");
            }
            t
        };
        Self { text }
    }
}

impl BoolVal {
    #[must_use]
    pub fn new(v: bool) -> Self {
        Self {
            text: if v { "true" } else { "false" }.to_string(),
        }
    }
}

impl DateTimeVal {
    /// Builds a datetime value from its TOML text form, validated.
    pub fn new(text: &str) -> Result<Self, TomlError> {
        validate_datetime_text(text).map_err(|_| TomlError::InvalidDateTime(text.to_string()))?;
        Ok(Self {
            text: text.to_string(),
        })
    }
}

impl Comment {
    /// Builds a comment node; the text must start with `#` and contain no
    /// control characters other than tab.
    pub fn new(text: &str) -> Result<Self, TomlError> {
        if !text.starts_with('#') || text.contains('\n') || text.contains('\r') {
            return Err(TomlError::InvalidComment(text.to_string()));
        }
        validate_comment_text(text).map_err(|_| TomlError::InvalidComment(text.to_string()))?;
        Ok(Self {
            text: text.to_string(),
        })
    }
}

impl Whitespace {
    /// Builds a whitespace node from spaces, tabs, and line terminators.
    pub fn new(text: &str) -> Result<Self, TomlError> {
        if text.chars().any(|c| !matches!(c, ' ' | '\t' | '\n' | '\r')) {
            return Err(TomlError::InvalidWhitespace(text.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }
}

// --- Container constructors and mutation ---

impl ArrayVal {
    /// Builds an array with synthetic text.
    #[must_use]
    pub fn new(elements: Vec<Value>) -> Self {
        let mut arr = Self {
            elements,
            text: String::new(),
        };
        arr.regenerate_text();
        arr
    }

    /// Appends an element, regenerating the synthetic text.
    pub fn push(&mut self, value: Value) {
        self.elements.push(value);
        self.regenerate_text();
    }

    /// Inserts an element at `index`.
    pub fn insert(&mut self, index: usize, value: Value) -> Result<(), TomlError> {
        if index > self.elements.len() {
            return Err(TomlError::IndexOutOfRange(index));
        }
        self.elements.insert(index, value);
        self.regenerate_text();
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Value, TomlError> {
        if index >= self.elements.len() {
            return Err(TomlError::IndexOutOfRange(index));
        }
        let removed = self.elements.remove(index);
        self.regenerate_text();
        Ok(removed)
    }

    pub(crate) fn regenerate_text(&mut self) {
        let inner: Vec<&str> = self.elements.iter().map(Value::text).collect();
        self.text = format!("[{}]", inner.join(", "));
    }
}

impl InlineTableVal {
    /// Builds an inline table with synthetic text; entries are checked for
    /// duplicate keys.
    pub fn new(entries: Vec<KeyValue>) -> Result<Self, TomlError> {
        check_duplicate_keys(&entries)?;
        let mut it = Self {
            entries,
            text: String::new(),
        };
        it.regenerate_text();
        Ok(it)
    }

    /// Appends an entry after checking it against the existing keys.
    pub fn append(&mut self, kv: KeyValue) -> Result<(), TomlError> {
        self.entries.push(kv);
        if let Err(err) = check_duplicate_keys(&self.entries) {
            self.entries.pop();
            return Err(err);
        }
        self.regenerate_text();
        Ok(())
    }

    /// Removes the first entry matching the dotted key. Returns whether an
    /// entry was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let segs = parse_dotted_path(key);
        if let Some(idx) = self
            .entries
            .iter()
            .position(|kv| match_key_parts(&kv.key_parts, &segs))
        {
            self.entries.remove(idx);
            self.regenerate_text();
            return true;
        }
        false
    }

    pub(crate) fn regenerate_text(&mut self) {
        let inner: Vec<String> = self
            .entries
            .iter()
            .map(|kv| {
                format!(
                    "{}{}={}{}",
                    kv.raw_key,
                    kv.pre_eq,
                    kv.post_eq,
                    kv.value.text()
                )
            })
            .collect();
        self.text = format!("{{{}}}", inner.join(", "));
    }
}

/// Rejects entries that share a key or where one entry's key is a prefix of
/// another's dotted key.
fn check_duplicate_keys(entries: &[KeyValue]) -> Result<(), TomlError> {
    let mut full_keys: Vec<String> = Vec::new();
    let mut prefixes: Vec<String> = Vec::new();
    for kv in entries {
        let full = key_parts_to_path(&kv.key_parts);
        if full_keys.contains(&full) {
            return Err(TomlError::DuplicateKey(full));
        }
        if prefixes.contains(&full) {
            return Err(TomlError::KeyConflictsWithDottedKey(full));
        }
        for i in 1..kv.key_parts.len() {
            let prefix = key_parts_to_path(&kv.key_parts[..i]);
            if full_keys.contains(&prefix) {
                return Err(TomlError::KeyConflictsWithDottedKey(prefix));
            }
            prefixes.push(prefix);
        }
        full_keys.push(full);
    }
    Ok(())
}

// --- Structural constructors ---

impl KeyValue {
    /// Builds a `key = value` line with standard spacing and a trailing
    /// newline. `key` may be dotted; segments are auto-quoted when they are
    /// not bare.
    pub fn new(key: &str, value: Value) -> Result<Self, TomlError> {
        let segs = split_key_segments(key);
        if segs.is_empty() || segs.iter().any(String::is_empty) {
            return Err(TomlError::EmptyKey);
        }
        let parts = make_key_parts(&segs);
        let raw_key = make_raw_key(&parts);
        let raw_value = value.text().to_string();
        Ok(Self {
            leading: Vec::new(),
            key_parts: parts,
            raw_key,
            pre_eq: " ".to_string(),
            post_eq: " ".to_string(),
            value,
            raw_value,
            trailing: Vec::new(),
            newline: "\n".to_string(),
            line: 0,
            col: 0,
        })
    }

    /// Replaces the value and refreshes the stored raw-value text.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
        self.raw_value = self.value.text().to_string();
    }

    /// Replaces the leading trivia.
    pub fn set_leading_trivia(&mut self, trivia: Vec<Trivia>) {
        self.leading = trivia;
    }

    /// Replaces the trailing trivia.
    pub fn set_trailing_trivia(&mut self, trivia: Vec<Trivia>) {
        self.trailing = trivia;
    }

    /// Sets the whitespace before `=`; spaces and tabs only.
    pub fn set_pre_eq(&mut self, ws: &str) -> Result<(), TomlError> {
        if !is_inline_ws(ws) {
            return Err(TomlError::InvalidWhitespace(ws.to_string()));
        }
        self.pre_eq = ws.to_string();
        Ok(())
    }

    /// Sets the whitespace after `=`; spaces and tabs only.
    pub fn set_post_eq(&mut self, ws: &str) -> Result<(), TomlError> {
        if !is_inline_ws(ws) {
            return Err(TomlError::InvalidWhitespace(ws.to_string()));
        }
        self.post_eq = ws.to_string();
        Ok(())
    }

    /// Sets the line terminator; one of `""`, `"\n"`, `"\r\n"`.
    pub fn set_newline(&mut self, newline: &str) -> Result<(), TomlError> {
        if !matches!(newline, "" | "\n" | "\r\n") {
            return Err(TomlError::InvalidWhitespace(newline.to_string()));
        }
        self.newline = newline.to_string();
        Ok(())
    }
}

fn is_inline_ws(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t')
}

/// Splits a constructor key on dots only, honoring quoted segments. Unlike
/// the lookup-path parser, a bare segment may contain spaces; it becomes a
/// single quoted segment (`key with spaces` stays one key).
fn split_key_segments(key: &str) -> Vec<String> {
    let bytes = key.as_bytes();
    let mut segs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let (seg, next) = match bytes[i] {
            b'"' => parse_quoted_segment(key, i, b'"'),
            b'\'' => parse_quoted_segment(key, i, b'\''),
            _ => {
                let rest = &key[i..];
                let end = rest.find('.').unwrap_or(rest.len());
                (rest[..end].to_string(), i + end)
            }
        };
        segs.push(seg);
        i = next;
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            if i == bytes.len() {
                segs.push(String::new()); // trailing dot names an empty segment
            }
        }
    }
    segs
}

fn parse_quoted_segment(key: &str, mut i: usize, quote: u8) -> (String, usize) {
    let bytes = key.as_bytes();
    i += 1;
    let start = i;
    while i < bytes.len() {
        if quote == b'"' && bytes[i] == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            let inner = &key[start..i];
            let seg = if quote == b'"' {
                crate::query::process_basic_escapes(inner)
            } else {
                inner.to_string()
            };
            return (seg, i + 1);
        }
        i += 1;
    }
    (key[start..].to_string(), i)
}

impl TableHeader {
    /// Builds a `[path]` header from key segments, auto-quoted as needed.
    pub fn new<I, S>(segments: I) -> Result<Self, TomlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segs: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segs.is_empty() || segs.iter().any(String::is_empty) {
            return Err(TomlError::EmptyKey);
        }
        let parts = make_key_parts(&segs);
        Ok(Self {
            leading: Vec::new(),
            raw_header: make_raw_key(&parts),
            header_parts: parts,
            trailing: Vec::new(),
            newline: "\n".to_string(),
            entries: Vec::new(),
            line: 0,
            col: 0,
        })
    }

    /// Appends an entry; key-values are checked against the table's
    /// existing keys and the insertion is rolled back on conflict.
    pub fn append(&mut self, entry: Entry) -> Result<(), TomlError> {
        self.insert_at(self.entries.len(), entry)
    }

    /// Inserts an entry at `index` (clamped to the entry count), with the
    /// same conflict check and rollback as [`TableHeader::append`].
    pub fn insert_at(&mut self, index: usize, entry: Entry) -> Result<(), TomlError> {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        if let Err(err) = check_entry_keys(&self.entries) {
            self.entries.remove(index);
            return Err(err);
        }
        Ok(())
    }

    /// Removes the first key-value matching the dotted key.
    pub fn delete(&mut self, key: &str) -> bool {
        delete_from_entries(&mut self.entries, key)
    }

    /// Replaces the leading trivia.
    pub fn set_leading_trivia(&mut self, trivia: Vec<Trivia>) {
        self.leading = trivia;
    }

    /// Replaces the trailing trivia.
    pub fn set_trailing_trivia(&mut self, trivia: Vec<Trivia>) {
        self.trailing = trivia;
    }

    /// Sets the line terminator; one of `""`, `"\n"`, `"\r\n"`.
    pub fn set_newline(&mut self, newline: &str) -> Result<(), TomlError> {
        if !matches!(newline, "" | "\n" | "\r\n") {
            return Err(TomlError::InvalidWhitespace(newline.to_string()));
        }
        self.newline = newline.to_string();
        Ok(())
    }
}

impl ArrayOfTables {
    /// Builds a `[[path]]` header from key segments, auto-quoted as needed.
    pub fn new<I, S>(segments: I) -> Result<Self, TomlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segs: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segs.is_empty() || segs.iter().any(String::is_empty) {
            return Err(TomlError::EmptyKey);
        }
        let parts = make_key_parts(&segs);
        Ok(Self {
            leading: Vec::new(),
            raw_header: make_raw_key(&parts),
            header_parts: parts,
            trailing: Vec::new(),
            newline: "\n".to_string(),
            entries: Vec::new(),
            line: 0,
            col: 0,
        })
    }

    /// Appends an entry with the same conflict check as tables.
    pub fn append(&mut self, entry: Entry) -> Result<(), TomlError> {
        self.insert_at(self.entries.len(), entry)
    }

    /// Inserts an entry at `index` (clamped), with conflict check and
    /// rollback.
    pub fn insert_at(&mut self, index: usize, entry: Entry) -> Result<(), TomlError> {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        if let Err(err) = check_entry_keys(&self.entries) {
            self.entries.remove(index);
            return Err(err);
        }
        Ok(())
    }

    /// Removes the first key-value matching the dotted key.
    pub fn delete(&mut self, key: &str) -> bool {
        delete_from_entries(&mut self.entries, key)
    }

    /// Replaces the leading trivia.
    pub fn set_leading_trivia(&mut self, trivia: Vec<Trivia>) {
        self.leading = trivia;
    }

    /// Replaces the trailing trivia.
    pub fn set_trailing_trivia(&mut self, trivia: Vec<Trivia>) {
        self.trailing = trivia;
    }

    /// Sets the line terminator; one of `""`, `"\n"`, `"\r\n"`.
    pub fn set_newline(&mut self, newline: &str) -> Result<(), TomlError> {
        if !matches!(newline, "" | "\n" | "\r\n") {
            return Err(TomlError::InvalidWhitespace(newline.to_string()));
        }
        self.newline = newline.to_string();
        Ok(())
    }
}

fn check_entry_keys(entries: &[Entry]) -> Result<(), TomlError> {
    let kvs: Vec<KeyValue> = entries
        .iter()
        .filter_map(|e| e.as_key_value().cloned())
        .collect();
    check_duplicate_keys(&kvs)
}

fn delete_from_entries(entries: &mut Vec<Entry>, key: &str) -> bool {
    let segs = parse_dotted_path(key);
    if let Some(idx) = entries.iter().position(
        |e| matches!(e, Entry::KeyValue(kv) if match_key_parts(&kv.key_parts, &segs)),
    ) {
        entries.remove(idx);
        return true;
    }
    false
}

// --- Document mutation ---

impl Document {
    /// Appends a top-level item. Structural items are validated against the
    /// whole document; on failure the document is restored and the error
    /// returned. Trivia items skip validation.
    pub fn append(&mut self, item: Item) -> Result<(), TomlError> {
        self.insert_at(self.items.len(), item)
    }

    /// Inserts a top-level item at `index` (clamped to the item count),
    /// with the same validation and rollback as [`Document::append`].
    pub fn insert_at(&mut self, index: usize, item: Item) -> Result<(), TomlError> {
        let index = index.min(self.items.len());
        let structural = !matches!(item, Item::Trivia(_));
        self.items.insert(index, item);
        if structural {
            let outcome = {
                let doc: &Document = self;
                validate_document(doc, &doc.source)
            };
            if let Err(err) = outcome {
                self.items.remove(index);
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Runs the full semantic validator over the current state.
    pub fn validate(&self) -> Result<(), TomlError> {
        validate_document(self, &self.source)?;
        Ok(())
    }

    /// Removes the first key-value matching the dotted path, looking at
    /// top-level keys first, then inside tables (longest prefix first).
    /// Returns whether a key was removed.
    pub fn delete(&mut self, path: &str) -> bool {
        let segs = parse_dotted_path(path);
        if segs.is_empty() {
            return false;
        }

        if let Some(idx) = self.items.iter().position(
            |it| matches!(it, Item::KeyValue(kv) if match_key_parts(&kv.key_parts, &segs)),
        ) {
            self.items.remove(idx);
            return true;
        }

        for prefix_len in (1..segs.len()).rev() {
            let (table_segs, key_segs) = segs.split_at(prefix_len);
            let key = join_segs(key_segs);
            for item in &mut self.items {
                match item {
                    Item::Table(t) if match_key_parts(&t.header_parts, table_segs) => {
                        if t.delete(&key) {
                            return true;
                        }
                    }
                    Item::ArrayOfTables(a) if match_key_parts(&a.header_parts, table_segs) => {
                        if a.delete(&key) {
                            return true;
                        }
                    }
                    _ => {}
                }
            }
        }
        false
    }

    /// Removes the first `[path]` table header (and its entries). Returns
    /// whether a table was removed.
    pub fn delete_table(&mut self, path: &str) -> bool {
        let segs = parse_dotted_path(path);
        if let Some(idx) = self.items.iter().position(
            |it| matches!(it, Item::Table(t) if match_key_parts(&t.header_parts, segs.as_slice())),
        ) {
            self.items.remove(idx);
            return true;
        }
        false
    }

    /// Replaces the value of the key-value at the dotted path, descending
    /// into inline tables as needed. Every inline container crossed on the
    /// way down gets its synthetic text regenerated, as does the owning
    /// key-value's raw-value text. Returns whether a key matched.
    pub fn set_value(&mut self, path: &str, value: Value) -> bool {
        let segs = parse_dotted_path(path);
        if segs.is_empty() {
            return false;
        }
        let mut pending = Some(value);

        for item in &mut self.items {
            if let Item::KeyValue(kv) = item {
                if set_in_kv(kv, &segs, &mut pending) {
                    return true;
                }
            }
        }

        for prefix_len in (1..segs.len()).rev() {
            let (table_segs, key_segs) = segs.split_at(prefix_len);
            for item in &mut self.items {
                let entries = match item {
                    Item::Table(t) if match_key_parts(&t.header_parts, table_segs) => {
                        &mut t.entries
                    }
                    Item::ArrayOfTables(a) if match_key_parts(&a.header_parts, table_segs) => {
                        &mut a.entries
                    }
                    _ => continue,
                };
                for entry in entries.iter_mut() {
                    if let Entry::KeyValue(kv) = entry {
                        if set_in_kv(kv, key_segs, &mut pending) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

fn join_segs(segs: &[String]) -> String {
    segs.iter()
        .map(|s| {
            if is_bare_key_str(s) {
                s.clone()
            } else {
                format!("\"{}\"", escape_basic_string(s))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Sets the value if `kv` matches `segs` exactly, or descends into an
/// inline-table value when `kv`'s key is a strict prefix. Regenerates the
/// raw-value text on any hit beneath this node.
fn set_in_kv(kv: &mut KeyValue, segs: &[String], pending: &mut Option<Value>) -> bool {
    if match_key_parts(&kv.key_parts, segs) {
        let value = pending.take().expect("value consumed once");
        kv.set_value(value);
        return true;
    }
    let n = kv.key_parts.len();
    let mut hit = false;
    if n < segs.len() && match_key_parts(&kv.key_parts, &segs[..n]) {
        if let Value::InlineTable(it) = &mut kv.value {
            hit = set_in_inline(it, &segs[n..], pending);
        }
    }
    if hit {
        kv.raw_value = kv.value.text().to_string();
    }
    hit
}

fn set_in_inline(it: &mut InlineTableVal, segs: &[String], pending: &mut Option<Value>) -> bool {
    let mut hit = false;
    for kv in &mut it.entries {
        if set_in_kv(kv, segs, pending) {
            hit = true;
            break;
        }
    }
    if hit {
        it.regenerate_text();
    }
    hit
}
