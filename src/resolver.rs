//! Semantic validation of table/key relationships.
//!
//! TOML's redefinition rules are global: whether `[a.b]` is legal depends on
//! every header and key that came before it. The resolver walks the document
//! in order and tracks, for each canonical dotted path, the set of roles the
//! path has acquired so far. Each new header or key-value is checked against
//! the conflict matrix before its own roles are recorded.
//!
//! Canonical paths join the unquoted form of each segment with `.`; a
//! segment whose unquoted form itself contains a dot is wrapped in quotes so
//! `a."b.c"` and `a.b.c` stay distinct map keys.

use crate::ast::{
    ArrayOfTables, ArrayVal, Document, InlineTableVal, Item, KeyPart, KeyValue, TableHeader, Value,
};
use crate::error::ParseError;
use crate::utils::byte_offset;
use std::collections::HashMap;

/// The roles a canonical path can hold. A path may legally hold several
/// (an `aot` path is usually also the target of later sub-keys); the
/// conflict matrix decides which combinations are rejected.
#[derive(Debug, Default, Clone)]
struct Roles {
    /// Defined by a `[path]` header.
    explicit_table: bool,
    /// Defined by a `[[path]]` header.
    aot: bool,
    /// Created as an ancestor of a later explicit table or AOT.
    implicit_table: bool,
    /// Created as an intermediate of a dotted key.
    dotted_key_table: bool,
    /// Set by a non-container value.
    scalar: bool,
    /// Set by (or contained in) an inline-table or array value.
    inline: bool,
    /// Set by an array value.
    static_array: bool,
}

struct Resolver<'a> {
    source: &'a str,
    roles: HashMap<String, Roles>,
}

/// Runs the full semantic validator over a document.
pub fn validate_document(doc: &Document, source: &str) -> Result<(), ParseError> {
    let mut resolver = Resolver {
        source,
        roles: HashMap::new(),
    };
    resolver.validate(doc)
}

/// Joins key parts into the canonical path string used as the role-map key.
pub(crate) fn key_parts_to_path(parts: &[KeyPart]) -> String {
    let mut out = String::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        if p.unquoted.contains('.') {
            out.push('"');
            out.push_str(&p.unquoted);
            out.push('"');
        } else {
            out.push_str(&p.unquoted);
        }
    }
    out
}

fn build_full_path(base: &[KeyPart], key: &[KeyPart]) -> String {
    let mut all = Vec::with_capacity(base.len() + key.len());
    all.extend_from_slice(base);
    all.extend_from_slice(key);
    key_parts_to_path(&all)
}

impl<'a> Resolver<'a> {
    fn validate(&mut self, doc: &Document) -> Result<(), ParseError> {
        for item in doc.items() {
            match item {
                Item::KeyValue(kv) => self.check_key_value(&[], kv)?,
                Item::Table(t) => self.check_table(t)?,
                Item::ArrayOfTables(a) => self.check_aot(a)?,
                Item::Trivia(_) => {}
            }
        }
        Ok(())
    }

    fn error_at(&self, msg: String, line: usize, col: usize) -> ParseError {
        let offset = byte_offset(self.source, line, col);
        let len = usize::from(offset < self.source.len());
        ParseError::new(msg, line, col, self.source, offset, len)
    }

    fn roles(&self, path: &str) -> Roles {
        self.roles.get(path).cloned().unwrap_or_default()
    }

    fn roles_mut(&mut self, path: &str) -> &mut Roles {
        self.roles.entry(path.to_string()).or_default()
    }

    // --- [table] headers ---

    fn check_table(&mut self, node: &TableHeader) -> Result<(), ParseError> {
        let path = key_parts_to_path(node.header_parts());
        let (line, col) = node.position();

        if let Err(msg) = self.check_table_path_conflicts(&path) {
            return Err(self.error_at(msg, line, col));
        }
        if let Err(msg) = self.check_intermediate_paths(node.header_parts()) {
            return Err(self.error_at(msg, line, col));
        }

        self.roles_mut(&path).explicit_table = true;
        self.mark_parents_implicit(node.header_parts());

        for kv in node.key_values() {
            self.check_key_value(node.header_parts(), kv)?;
        }
        Ok(())
    }

    fn check_table_path_conflicts(&self, path: &str) -> Result<(), String> {
        let r = self.roles(path);
        if r.explicit_table {
            return Err(format!("duplicate table: [{path}]"));
        }
        if r.aot {
            return Err(format!(
                "cannot define table [{path}] already defined as array of tables"
            ));
        }
        if r.dotted_key_table {
            return Err(format!(
                "cannot reopen table [{path}] defined via dotted keys"
            ));
        }
        if r.scalar {
            return Err(format!(
                "cannot define table [{path}], key already defined as a value"
            ));
        }
        if r.inline {
            return Err(format!("cannot extend inline table/array [{path}]"));
        }
        if r.static_array {
            return Err(format!("cannot extend static array [{path}]"));
        }
        Ok(())
    }

    /// No intermediate of a new header may already be a value.
    fn check_intermediate_paths(&self, parts: &[KeyPart]) -> Result<(), String> {
        for i in 1..parts.len() {
            let parent = key_parts_to_path(&parts[..i]);
            let r = self.roles(&parent);
            if r.scalar {
                return Err(format!(
                    "cannot define table [{}], key {parent:?} already a value",
                    key_parts_to_path(parts)
                ));
            }
            if r.inline {
                return Err(format!("cannot extend inline table/array at {parent:?}"));
            }
            if r.static_array {
                return Err(format!("cannot extend static array at {parent:?}"));
            }
        }
        Ok(())
    }

    fn mark_parents_implicit(&mut self, parts: &[KeyPart]) {
        for i in 1..parts.len() {
            let parent = key_parts_to_path(&parts[..i]);
            let r = self.roles_mut(&parent);
            if !r.explicit_table && !r.aot {
                r.implicit_table = true;
            }
        }
    }

    // --- [[array of tables]] headers ---

    fn check_aot(&mut self, node: &ArrayOfTables) -> Result<(), ParseError> {
        let path = key_parts_to_path(node.header_parts());
        let (line, col) = node.position();

        if let Err(msg) = self.check_aot_path_conflicts(&path) {
            return Err(self.error_at(msg, line, col));
        }
        if let Err(msg) = self.check_aot_intermediate_paths(node.header_parts()) {
            return Err(self.error_at(msg, line, col));
        }

        self.roles_mut(&path).aot = true;
        self.mark_parents_implicit(node.header_parts());
        self.clear_sub_scope(&path);

        for kv in node.key_values() {
            self.check_key_value(node.header_parts(), kv)?;
        }
        Ok(())
    }

    fn check_aot_path_conflicts(&self, path: &str) -> Result<(), String> {
        let r = self.roles(path);
        if r.explicit_table {
            return Err(format!(
                "cannot define array of tables [[{path}]] already defined as table"
            ));
        }
        if r.scalar {
            return Err(format!("cannot define array [[{path}]], key already a value"));
        }
        if r.inline {
            return Err(format!("cannot extend inline table/array [[{path}]]"));
        }
        if r.static_array {
            return Err(format!("cannot extend static array [[{path}]]"));
        }
        if r.dotted_key_table {
            return Err(format!(
                "cannot define array [[{path}]], key defined via dotted keys"
            ));
        }
        if r.implicit_table && !r.aot {
            return Err(format!(
                "cannot define array [[{path}]], key already implicitly a table"
            ));
        }
        Ok(())
    }

    fn check_aot_intermediate_paths(&self, parts: &[KeyPart]) -> Result<(), String> {
        for i in 1..parts.len() {
            let parent = key_parts_to_path(&parts[..i]);
            let r = self.roles(&parent);
            if r.scalar {
                return Err(format!(
                    "cannot define array [[{}]], key {parent:?} already a value",
                    key_parts_to_path(parts)
                ));
            }
            if r.inline {
                return Err(format!("cannot extend inline table/array at {parent:?}"));
            }
            if r.static_array {
                return Err(format!("cannot extend static array at {parent:?}"));
            }
        }
        Ok(())
    }

    /// Each `[[path]]` entry opens a fresh sub-scope: every role under
    /// `path.` is cleared except `aot` and `implicit_table`, so the same
    /// sub-keys may reappear in successive entries.
    fn clear_sub_scope(&mut self, path: &str) {
        let prefix = format!("{path}.");
        for (key, r) in self.roles.iter_mut() {
            if key.starts_with(&prefix) {
                r.explicit_table = false;
                r.dotted_key_table = false;
                r.scalar = false;
                r.inline = false;
                r.static_array = false;
            }
        }
    }

    // --- key = value lines ---

    fn check_key_value(&mut self, base: &[KeyPart], kv: &KeyValue) -> Result<(), ParseError> {
        let (line, col) = kv.position();

        for i in 0..kv.key_parts().len() - 1 {
            let intermediate = build_full_path(base, &kv.key_parts()[..=i]);
            if let Err(msg) = self.check_dotted_intermediate(&intermediate) {
                return Err(self.error_at(msg, line, col));
            }
            self.roles_mut(&intermediate).dotted_key_table = true;
        }

        let leaf = build_full_path(base, kv.key_parts());

        // Conflicts are checked before the path is marked, so a self-clash
        // is reported against the earlier definition.
        if let Err(msg) = self.check_leaf_conflict(&leaf) {
            return Err(self.error_at(msg, line, col));
        }

        self.mark_leaf_path(&leaf, kv.value());

        if let Value::InlineTable(_) | Value::Array(_) = kv.value() {
            if let Err(msg) = check_inline_duplicates(kv.value()) {
                return Err(self.error_at(msg, line, col));
            }
        }

        Ok(())
    }

    fn check_dotted_intermediate(&self, path: &str) -> Result<(), String> {
        let r = self.roles(path);
        if r.inline {
            return Err(format!("cannot extend inline table at {path:?}"));
        }
        if r.static_array {
            return Err(format!("cannot extend static array at {path:?}"));
        }
        if r.scalar {
            return Err(format!("key {path:?} already defined as a value"));
        }
        if r.explicit_table {
            return Err(format!(
                "cannot add to explicitly defined table {path:?} via dotted keys"
            ));
        }
        if r.aot {
            return Err(format!("cannot extend array of tables {path:?} via dotted keys"));
        }
        Ok(())
    }

    fn check_leaf_conflict(&self, path: &str) -> Result<(), String> {
        let r = self.roles(path);
        if r.scalar || r.inline || r.static_array {
            return Err(format!("duplicate key {path:?}"));
        }
        if r.dotted_key_table {
            return Err(format!("key {path:?} already used as a table via dotted keys"));
        }
        if r.aot {
            return Err(format!("key {path:?} already defined as array of tables"));
        }
        Ok(())
    }

    fn mark_leaf_path(&mut self, path: &str, val: &Value) {
        match val {
            Value::InlineTable(_) => self.mark_inline_paths(path, val),
            Value::Array(_) => {
                self.mark_inline_paths(path, val);
                self.roles_mut(path).static_array = true;
            }
            _ => self.roles_mut(path).scalar = true,
        }
    }

    /// An inline table seeds `inline` on its own path and every nested path
    /// it contains, so later headers and dotted keys cannot extend it from
    /// outside. An array seeds only the paths under its inline-table
    /// elements; the array's own path carries `static_array` alone.
    fn mark_inline_paths(&mut self, path: &str, val: &Value) {
        match val {
            Value::InlineTable(it) => {
                self.roles_mut(path).inline = true;
                self.mark_inline_contents(path, it);
            }
            Value::Array(arr) => self.mark_array_elements(path, arr),
            _ => {}
        }
    }

    /// Everything contained in an inline table is `inline`, scalar leaves
    /// included.
    fn mark_inline_contents(&mut self, path: &str, it: &InlineTableVal) {
        for kv in it.entries() {
            let sub = format!("{path}.{}", key_parts_to_path(kv.key_parts()));
            self.roles_mut(&sub).inline = true;
            match kv.value() {
                Value::InlineTable(nested) => self.mark_inline_contents(&sub, nested),
                Value::Array(arr) => self.mark_array_elements(&sub, arr),
                _ => {}
            }
        }
    }

    fn mark_array_elements(&mut self, path: &str, arr: &ArrayVal) {
        for elem in arr.elements() {
            if let Value::InlineTable(it) = elem {
                self.mark_inline_contents(path, it);
            }
        }
    }
}

/// Checks entries of an inline table (and of inline tables nested in it or
/// in array elements) for duplicate keys and key/dotted-key clashes.
fn check_inline_duplicates(val: &Value) -> Result<(), String> {
    match val {
        Value::InlineTable(it) => {
            let mut full_keys: Vec<String> = Vec::new();
            let mut prefixes: Vec<String> = Vec::new();
            for kv in it.entries() {
                let full = key_parts_to_path(kv.key_parts());
                if full_keys.contains(&full) {
                    return Err(format!("duplicate key {full:?} in inline table"));
                }
                if prefixes.contains(&full) {
                    return Err(format!(
                        "key {full:?} conflicts with dotted key in inline table"
                    ));
                }
                for i in 1..kv.key_parts().len() {
                    let prefix = key_parts_to_path(&kv.key_parts()[..i]);
                    if full_keys.contains(&prefix) {
                        return Err(format!(
                            "key {prefix:?} conflicts with dotted key in inline table"
                        ));
                    }
                    prefixes.push(prefix);
                }
                full_keys.push(full);
                check_inline_duplicates(kv.value())?;
            }
            Ok(())
        }
        Value::Array(arr) => {
            for elem in arr.elements() {
                check_inline_duplicates(elem)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn validate(source: &str) -> Result<(), ParseError> {
        let doc = Parser::new(source).parse_document().expect("parse");
        validate_document(&doc, source)
    }

    fn expect_err(source: &str, fragment: &str) {
        let err = validate(source).expect_err(source);
        assert!(
            err.message.contains(fragment),
            "expected {fragment:?} in {:?} for {source:?}",
            err.message
        );
    }

    #[test]
    fn test_duplicate_table_rejected() {
        expect_err("[a]\nk = 1\n[a]\nk = 2\n", "duplicate table: [a]");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        expect_err("a = 1\na = 2\n", "duplicate key \"a\"");
    }

    #[test]
    fn test_table_after_aot_rejected() {
        expect_err(
            "[[parent.arr]]\n[parent]\narr = 2\n",
            "already defined as array of tables",
        );
    }

    #[test]
    fn test_inline_table_extension_rejected() {
        expect_err("a = {b = 1}\n[a]\nc = 2\n", "cannot extend inline table/array [a]");
    }

    #[test]
    fn test_inline_nested_path_protected() {
        expect_err("a = {b = {c = 1}}\n[a.b]\nd = 2\n", "cannot extend");
    }

    #[test]
    fn test_aot_sub_scope_reset_allows_repeats() {
        assert!(validate("[[a]]\nb = 1\n[[a]]\nb = 2\n").is_ok());
    }

    #[test]
    fn test_aot_sub_scope_reset_covers_sub_tables() {
        assert!(validate("[[a]]\n[a.sub]\nx = 1\n[[a]]\n[a.sub]\nx = 2\n").is_ok());
    }

    #[test]
    fn test_aot_after_implicit_table_rejected() {
        expect_err("[a.b]\nk = 1\n[[a]]\nk = 2\n", "already implicitly a table");
    }

    #[test]
    fn test_aot_over_explicit_table_rejected() {
        expect_err("[a]\n[[a]]\n", "already defined as table");
    }

    #[test]
    fn test_aot_over_static_array_rejected() {
        expect_err("a = [1, 2]\n[[a]]\n", "cannot extend static array [[a]]");
    }

    #[test]
    fn test_table_over_scalar_rejected() {
        expect_err("a = 1\n[a]\n", "already defined as a value");
    }

    #[test]
    fn test_header_intermediate_over_scalar_rejected() {
        expect_err("a = 1\n[a.b]\n", "already a value");
    }

    #[test]
    fn test_header_intermediate_over_static_array_rejected() {
        expect_err("a = [1]\n[a.b]\n", "cannot extend");
    }

    #[test]
    fn test_explicit_table_on_implicit_allowed() {
        assert!(validate("[a.b]\nk = 1\n[a]\nother = 2\n").is_ok());
    }

    #[test]
    fn test_dotted_key_intermediates_allowed() {
        assert!(validate("a.b.c = 1\na.b.d = 2\n").is_ok());
    }

    #[test]
    fn test_dotted_key_cannot_extend_explicit_table() {
        expect_err(
            "[a.b]\nx = 1\n[a]\nb.c = 1\n",
            "cannot add to explicitly defined table \"a.b\" via dotted keys",
        );
    }

    #[test]
    fn test_sub_table_of_explicit_table_allowed() {
        assert!(validate("[a]\nx = 1\n[a.c]\ny = 2\n").is_ok());
    }

    #[test]
    fn test_dotted_leaf_conflicts_with_dotted_table() {
        expect_err("a.b = 1\na = 2\n", "already used as a table via dotted keys");
    }

    #[test]
    fn test_dotted_intermediate_over_scalar() {
        expect_err("a = 1\na.b = 2\n", "already defined as a value");
    }

    #[test]
    fn test_dotted_intermediate_over_inline() {
        expect_err("a = {x = 1}\na.b = 2\n", "cannot extend inline table at \"a\"");
    }

    #[test]
    fn test_dotted_intermediate_over_static_array() {
        expect_err("a = [1]\na.b = 2\n", "cannot extend static array at \"a\"");
    }

    #[test]
    fn test_duplicate_array_key_rejected() {
        expect_err("a = [1]\na = 2\n", "duplicate key \"a\"");
    }

    #[test]
    fn test_array_path_is_not_inline() {
        // The array's own path carries static_array alone; only paths under
        // inline-table elements are inline.
        let err = validate("a = [{b = 1}]\n[a]\n").unwrap_err();
        assert!(err.message.contains("cannot extend static array [a]"));
        let err = validate("a = [{b = 1}]\n[a.b]\n").unwrap_err();
        assert!(err.message.contains("cannot extend inline table/array [a.b]"));
    }

    #[test]
    fn test_reopen_dotted_table_via_header_rejected() {
        expect_err("a.b = 1\n[a]\n", "defined via dotted keys");
    }

    #[test]
    fn test_scoped_dotted_keys_legal() {
        assert!(validate("[t]\na.b = 1\na.c = 2\n").is_ok());
    }

    #[test]
    fn test_same_key_in_different_tables_legal() {
        assert!(validate("[a]\nk = 1\n[b]\nk = 2\n").is_ok());
    }

    #[test]
    fn test_quoted_dot_key_distinct_from_dotted() {
        // `"a.b"` is one segment; `a.b` is two. They must not collide.
        assert!(validate("\"a.b\" = 1\na.b = 2\n").is_ok());
    }

    #[test]
    fn test_inline_table_duplicate_key() {
        expect_err("t = {a = 1, a = 2}\n", "duplicate key \"a\" in inline table");
    }

    #[test]
    fn test_inline_table_dotted_conflict() {
        expect_err("t = {a = 1, a.b = 2}\n", "conflicts with dotted key");
        expect_err("t = {a.b = 2, a = 1}\n", "conflicts with dotted key");
    }

    #[test]
    fn test_nested_inline_table_duplicate_key() {
        expect_err("t = {outer = {a = 1, a = 2}}\n", "duplicate key");
    }

    #[test]
    fn test_inline_table_in_array_duplicate_key() {
        expect_err("t = [{a = 1, a = 2}]\n", "duplicate key");
    }

    #[test]
    fn test_error_position_points_at_header() {
        let err = validate("[a]\nk = 1\n[a]\nk = 2\n").unwrap_err();
        assert_eq!((err.line, err.column), (3, 1));
    }

    #[test]
    fn test_error_position_points_at_key_value() {
        let err = validate("a = 1\na = 2\n").unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
    }
}
