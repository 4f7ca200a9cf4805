//! The concrete syntax tree.
//!
//! Every node keeps the exact source text it was parsed from, so that
//! re-serializing an unmutated document reproduces the input byte for byte.
//! Nodes fall into a closed set of variants:
//!
//! - [`Document`] owns an ordered sequence of top-level [`Item`]s.
//! - [`KeyValue`] is a single `key = value` line with its trivia.
//! - [`TableHeader`] / [`ArrayOfTables`] are `[path]` / `[[path]]` headers
//!   owning the entries that follow them.
//! - [`Value`] is a leaf (string, number, boolean, datetime) carrying its
//!   lexeme, or a container (array, inline table) carrying both its children
//!   and its text (the raw source slice when parsed, synthetic after
//!   mutation).
//! - [`Trivia`] is a comment or whitespace run, attached as leading or
//!   trailing trivia to the nearest significant node.
//!
//! The tree is a plain ownership hierarchy: a node is destroyed with its
//! owner, and accessors hand out immutable borrows. Upward text regeneration
//! after mutation is performed by the path-addressed editing methods on
//! [`Document`].

/// One segment of a (possibly dotted) key, with the whitespace captured
/// around the dot that precedes it. The first segment of a key has empty
/// `dot_before`/`dot_after`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPart {
    /// The segment exactly as written, including quotes.
    pub text: String,
    /// The unquoted, unescaped form.
    pub unquoted: String,
    /// Whether the segment was written as a quoted string.
    pub quoted: bool,
    /// Whitespace between the previous segment and the dot.
    pub dot_before: String,
    /// Whitespace between the dot and this segment.
    pub dot_after: String,
}

/// Kinds for the closed set of node variants, used with [`NodeRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    KeyValue,
    Table,
    ArrayOfTables,
    String,
    Number,
    Boolean,
    DateTime,
    Array,
    InlineTable,
    Comment,
    Whitespace,
}

// --- Trivia ---

/// A comment; the text includes the leading `#` and excludes the line
/// terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub(crate) text: String,
}

impl Comment {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A run of spaces, tabs, or line terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitespace {
    pub(crate) text: String,
}

impl Whitespace {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Syntactically insignificant content preserved for lossless round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    Comment(Comment),
    Whitespace(Whitespace),
}

impl Trivia {
    pub fn text(&self) -> &str {
        match self {
            Trivia::Comment(c) => &c.text,
            Trivia::Whitespace(w) => &w.text,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Trivia::Comment(_) => NodeKind::Comment,
            Trivia::Whitespace(_) => NodeKind::Whitespace,
        }
    }
}

// --- Value leaves and containers ---

/// A string value carrying its exact lexeme, quotes and escapes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringVal {
    pub(crate) text: String,
}

impl StringVal {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An integer or float value carrying its exact lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberVal {
    pub(crate) text: String,
}

impl NumberVal {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `true` or `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolVal {
    pub(crate) text: String,
}

impl BoolVal {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An offset/local datetime, local date, or local time lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeVal {
    pub(crate) text: String,
}

impl DateTimeVal {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An array value. `text` is the raw source slice (including internal
/// whitespace and comments) when parsed; after any element mutation it is
/// regenerated synthetically.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayVal {
    pub(crate) elements: Vec<Value>,
    pub(crate) text: String,
}

impl ArrayVal {
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// An inline table value `{k = v, ...}`; same text-preservation contract as
/// [`ArrayVal`].
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTableVal {
    pub(crate) entries: Vec<KeyValue>,
    pub(crate) text: String,
}

impl InlineTableVal {
    pub fn entries(&self) -> &[KeyValue] {
        &self.entries
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A TOML value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(StringVal),
    Number(NumberVal),
    Boolean(BoolVal),
    DateTime(DateTimeVal),
    Array(ArrayVal),
    InlineTable(InlineTableVal),
}

impl Value {
    /// The value's current text: the exact lexeme for leaves, the preserved
    /// or regenerated bracketed text for containers.
    pub fn text(&self) -> &str {
        match self {
            Value::String(v) => &v.text,
            Value::Number(v) => &v.text,
            Value::Boolean(v) => &v.text,
            Value::DateTime(v) => &v.text,
            Value::Array(v) => &v.text,
            Value::InlineTable(v) => &v.text,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Value::String(_) => NodeKind::String,
            Value::Number(_) => NodeKind::Number,
            Value::Boolean(_) => NodeKind::Boolean,
            Value::DateTime(_) => NodeKind::DateTime,
            Value::Array(_) => NodeKind::Array,
            Value::InlineTable(_) => NodeKind::InlineTable,
        }
    }

    pub fn as_string(&self) -> Option<&StringVal> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&NumberVal> {
        match self {
            Value::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&BoolVal> {
        match self {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTimeVal> {
        match self {
            Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayVal> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayVal> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_inline_table(&self) -> Option<&InlineTableVal> {
        match self {
            Value::InlineTable(v) => Some(v),
            _ => None,
        }
    }
}

// --- Structural nodes ---

/// A single `key = value` line, with every piece of surrounding syntax
/// captured: leading trivia, the raw key text, the whitespace on both sides
/// of `=`, the value and its raw text, trailing same-line trivia, and the
/// line terminator (empty at end of file).
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub(crate) leading: Vec<Trivia>,
    pub(crate) key_parts: Vec<KeyPart>,
    pub(crate) raw_key: String,
    pub(crate) pre_eq: String,
    pub(crate) post_eq: String,
    pub(crate) value: Value,
    pub(crate) raw_value: String,
    pub(crate) trailing: Vec<Trivia>,
    pub(crate) newline: String,
    pub(crate) line: usize,
    pub(crate) col: usize,
}

impl KeyValue {
    pub fn leading_trivia(&self) -> &[Trivia] {
        &self.leading
    }

    pub fn key_parts(&self) -> &[KeyPart] {
        &self.key_parts
    }

    /// The key exactly as written, dots and whitespace included.
    pub fn raw_key(&self) -> &str {
        &self.raw_key
    }

    pub fn pre_eq(&self) -> &str {
        &self.pre_eq
    }

    pub fn post_eq(&self) -> &str {
        &self.post_eq
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value's raw text as written (kept in sync on mutation).
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    pub fn trailing_trivia(&self) -> &[Trivia] {
        &self.trailing
    }

    /// One of `""`, `"\n"`, `"\r\n"`.
    pub fn newline(&self) -> &str {
        &self.newline
    }

    /// 1-based source position, (0, 0) for constructed nodes.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    /// The full source text of this line: leading trivia, key, `=`, value,
    /// trailing trivia, line terminator.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for t in &self.leading {
            out.push_str(t.text());
        }
        out.push_str(&self.raw_key);
        out.push_str(&self.pre_eq);
        out.push('=');
        out.push_str(&self.post_eq);
        out.push_str(self.value.text());
        for t in &self.trailing {
            out.push_str(t.text());
        }
        out.push_str(&self.newline);
        out
    }
}

/// An entry owned by a table or array-of-tables section.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    KeyValue(KeyValue),
    Trivia(Trivia),
}

impl Entry {
    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Entry::KeyValue(kv) => Some(kv),
            Entry::Trivia(_) => None,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Entry::KeyValue(kv) => kv.text(),
            Entry::Trivia(t) => t.text().to_string(),
        }
    }
}

/// A `[path]` table header and the entries that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    pub(crate) leading: Vec<Trivia>,
    pub(crate) header_parts: Vec<KeyPart>,
    pub(crate) raw_header: String,
    pub(crate) trailing: Vec<Trivia>,
    pub(crate) newline: String,
    pub(crate) entries: Vec<Entry>,
    pub(crate) line: usize,
    pub(crate) col: usize,
}

impl TableHeader {
    pub fn leading_trivia(&self) -> &[Trivia] {
        &self.leading
    }

    pub fn header_parts(&self) -> &[KeyPart] {
        &self.header_parts
    }

    /// The header text between the brackets, whitespace included.
    pub fn raw_header(&self) -> &str {
        &self.raw_header
    }

    pub fn trailing_trivia(&self) -> &[Trivia] {
        &self.trailing
    }

    pub fn newline(&self) -> &str {
        &self.newline
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn key_values(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.iter().filter_map(Entry::as_key_value)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for t in &self.leading {
            out.push_str(t.text());
        }
        out.push('[');
        out.push_str(&self.raw_header);
        out.push(']');
        for t in &self.trailing {
            out.push_str(t.text());
        }
        out.push_str(&self.newline);
        for e in &self.entries {
            out.push_str(&e.text());
        }
        out
    }
}

/// A `[[path]]` array-of-tables header and its entries. A distinct variant
/// from [`TableHeader`] because redefinition semantics differ.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayOfTables {
    pub(crate) leading: Vec<Trivia>,
    pub(crate) header_parts: Vec<KeyPart>,
    pub(crate) raw_header: String,
    pub(crate) trailing: Vec<Trivia>,
    pub(crate) newline: String,
    pub(crate) entries: Vec<Entry>,
    pub(crate) line: usize,
    pub(crate) col: usize,
}

impl ArrayOfTables {
    pub fn leading_trivia(&self) -> &[Trivia] {
        &self.leading
    }

    pub fn header_parts(&self) -> &[KeyPart] {
        &self.header_parts
    }

    pub fn raw_header(&self) -> &str {
        &self.raw_header
    }

    pub fn trailing_trivia(&self) -> &[Trivia] {
        &self.trailing
    }

    pub fn newline(&self) -> &str {
        &self.newline
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn key_values(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.iter().filter_map(Entry::as_key_value)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for t in &self.leading {
            out.push_str(t.text());
        }
        out.push_str("[[");
        out.push_str(&self.raw_header);
        out.push_str("]]");
        for t in &self.trailing {
            out.push_str(t.text());
        }
        out.push_str(&self.newline);
        for e in &self.entries {
            out.push_str(&e.text());
        }
        out
    }
}

/// A top-level item of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    KeyValue(KeyValue),
    Table(TableHeader),
    ArrayOfTables(ArrayOfTables),
    Trivia(Trivia),
}

impl Item {
    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Item::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableHeader> {
        match self {
            Item::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array_of_tables(&self) -> Option<&ArrayOfTables> {
        match self {
            Item::ArrayOfTables(a) => Some(a),
            _ => None,
        }
    }

    pub fn text(&self) -> String {
        match self {
            Item::KeyValue(kv) => kv.text(),
            Item::Table(t) => t.text(),
            Item::ArrayOfTables(a) => a.text(),
            Item::Trivia(t) => t.text().to_string(),
        }
    }
}

/// A parsed TOML document: the root of the CST.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub(crate) items: Vec<Item>,
    pub(crate) source: String,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Top-level key-value nodes in document order.
    pub fn key_values(&self) -> Vec<&KeyValue> {
        self.items.iter().filter_map(Item::as_key_value).collect()
    }

    /// All `[table]` headers in document order.
    pub fn tables(&self) -> Vec<&TableHeader> {
        self.items.iter().filter_map(Item::as_table).collect()
    }

    /// All `[[array]]` headers in document order.
    pub fn arrays_of_tables(&self) -> Vec<&ArrayOfTables> {
        self.items
            .iter()
            .filter_map(Item::as_array_of_tables)
            .collect()
    }

    /// Pre-order traversal. The visitor returns `false` to stop the walk.
    pub fn walk<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeRef<'_>) -> bool,
    {
        let mut stack = vec![NodeRef::Document(self)];
        while let Some(node) = stack.pop() {
            if !visitor(node) {
                return;
            }
            push_children(node, &mut stack);
        }
    }

    /// A lazy pre-order iterator over every node in the tree.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter {
            stack: vec![NodeRef::Document(self)],
        }
    }
}

/// A borrowed view of any node in the tree, used by [`Document::walk`] and
/// [`Document::iter`].
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    KeyValue(&'a KeyValue),
    Table(&'a TableHeader),
    ArrayOfTables(&'a ArrayOfTables),
    Value(&'a Value),
    Comment(&'a Comment),
    Whitespace(&'a Whitespace),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Document(_) => NodeKind::Document,
            NodeRef::KeyValue(_) => NodeKind::KeyValue,
            NodeRef::Table(_) => NodeKind::Table,
            NodeRef::ArrayOfTables(_) => NodeKind::ArrayOfTables,
            NodeRef::Value(v) => v.kind(),
            NodeRef::Comment(_) => NodeKind::Comment,
            NodeRef::Whitespace(_) => NodeKind::Whitespace,
        }
    }
}

fn trivia_ref(t: &Trivia) -> NodeRef<'_> {
    match t {
        Trivia::Comment(c) => NodeRef::Comment(c),
        Trivia::Whitespace(w) => NodeRef::Whitespace(w),
    }
}

/// Pushes `node`'s children in reverse so the stack pops them in order.
fn push_children<'a>(node: NodeRef<'a>, stack: &mut Vec<NodeRef<'a>>) {
    let mut kids: Vec<NodeRef<'a>> = Vec::new();
    match node {
        NodeRef::Document(d) => {
            for item in &d.items {
                kids.push(match item {
                    Item::KeyValue(kv) => NodeRef::KeyValue(kv),
                    Item::Table(t) => NodeRef::Table(t),
                    Item::ArrayOfTables(a) => NodeRef::ArrayOfTables(a),
                    Item::Trivia(t) => trivia_ref(t),
                });
            }
        }
        NodeRef::KeyValue(kv) => {
            kids.extend(kv.leading.iter().map(trivia_ref));
            kids.push(NodeRef::Value(&kv.value));
            kids.extend(kv.trailing.iter().map(trivia_ref));
        }
        NodeRef::Table(t) => {
            kids.extend(t.leading.iter().map(trivia_ref));
            kids.extend(t.entries.iter().map(entry_ref));
            kids.extend(t.trailing.iter().map(trivia_ref));
        }
        NodeRef::ArrayOfTables(a) => {
            kids.extend(a.leading.iter().map(trivia_ref));
            kids.extend(a.entries.iter().map(entry_ref));
            kids.extend(a.trailing.iter().map(trivia_ref));
        }
        NodeRef::Value(Value::Array(arr)) => {
            kids.extend(arr.elements.iter().map(NodeRef::Value));
        }
        NodeRef::Value(Value::InlineTable(it)) => {
            kids.extend(it.entries.iter().map(NodeRef::KeyValue));
        }
        NodeRef::Value(_) | NodeRef::Comment(_) | NodeRef::Whitespace(_) => {}
    }
    stack.extend(kids.into_iter().rev());
}

fn entry_ref(e: &Entry) -> NodeRef<'_> {
    match e {
        Entry::KeyValue(kv) => NodeRef::KeyValue(kv),
        Entry::Trivia(t) => trivia_ref(t),
    }
}

/// Lazy pre-order iterator returned by [`Document::iter`].
pub struct NodeIter<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        push_children(node, &mut self.stack);
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    #[test]
    fn test_walk_visits_all_kinds() {
        let doc = parse_str("# c\nkey = 1\n[t]\nx = [1, {y = 2}]\n").unwrap();
        let mut kinds = Vec::new();
        doc.walk(|n| {
            kinds.push(n.kind());
            true
        });
        assert_eq!(kinds[0], NodeKind::Document);
        assert!(kinds.contains(&NodeKind::Comment));
        assert!(kinds.contains(&NodeKind::Table));
        assert!(kinds.contains(&NodeKind::Array));
        assert!(kinds.contains(&NodeKind::InlineTable));
        assert!(kinds.contains(&NodeKind::Number));
    }

    #[test]
    fn test_walk_early_termination() {
        let doc = parse_str("a = 1\nb = 2\nc = 3\n").unwrap();
        let mut visits = 0;
        doc.walk(|_| {
            visits += 1;
            visits < 3
        });
        assert_eq!(visits, 3);
    }

    #[test]
    fn test_iter_matches_walk_order() {
        let doc = parse_str("a = 1\n[t]\nb = \"x\"\n").unwrap();
        let mut walked = Vec::new();
        doc.walk(|n| {
            walked.push(n.kind());
            true
        });
        let iterated: Vec<NodeKind> = doc.iter().map(|n| n.kind()).collect();
        assert_eq!(walked, iterated);
    }

    #[test]
    fn test_comment_count_via_walk() {
        let doc = parse_str("# comment\nkey = 1\n").unwrap();
        let mut comments = 0;
        doc.walk(|n| {
            if n.kind() == NodeKind::Comment {
                comments += 1;
            }
            true
        });
        assert_eq!(comments, 1);
    }

    #[test]
    fn test_item_text_reconstruction() {
        let source = "# lead\nkey = \"v\"  # trail\n";
        let doc = parse_str(source).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].text(), source);
    }

    #[test]
    fn test_table_text_includes_entries() {
        let source = "[server]\nhost = \"localhost\"\nport = 8080\n";
        let doc = parse_str(source).unwrap();
        assert_eq!(doc.items[0].text(), source);
    }
}
