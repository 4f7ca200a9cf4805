//! Dotted-path lookup and leaf value decoding.
//!
//! Lookup paths accept bare, basic-quoted, and literal-quoted segments
//! separated by optional whitespace and dots; quoted segments may contain
//! dots literally. Parsing is forgiving: an unclosed quote yields the
//! partial segment rather than an error, so lookups stay best-effort.

use crate::ast::{
    ArrayOfTables, BoolVal, DateTimeVal, Document, Entry, InlineTableVal, Item, KeyPart, KeyValue,
    NumberVal, StringVal, TableHeader, Value,
};
use crate::error::TomlError;
use crate::lexer::is_special_float;
use crate::utils::is_bare_key_char;

// --- Path parsing ---

pub(crate) fn parse_dotted_path(path: &str) -> Vec<String> {
    let bytes = path.as_bytes();
    let mut segs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        i = skip_path_ws(bytes, i);
        if i >= bytes.len() {
            break;
        }
        let (seg, next) = match bytes[i] {
            b'"' => parse_path_basic_string(path, i),
            b'\'' => parse_path_literal_string(path, i),
            _ => parse_path_bare_key(path, i),
        };
        segs.push(seg);
        i = skip_path_ws(bytes, next);
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
        }
    }
    segs
}

fn skip_path_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

fn parse_path_basic_string(path: &str, mut i: usize) -> (String, usize) {
    i += 1; // opening "
    let start = i;
    let bytes = path.as_bytes();
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }
        if bytes[i] == b'"' {
            return (process_basic_escapes(&path[start..i]), i + 1);
        }
        i += 1;
    }
    // Unclosed quote: return what was read.
    (process_basic_escapes(&path[start..]), i)
}

fn parse_path_literal_string(path: &str, mut i: usize) -> (String, usize) {
    i += 1; // opening '
    let start = i;
    let bytes = path.as_bytes();
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            return (path[start..i].to_string(), i + 1);
        }
        i += 1;
    }
    (path[start..].to_string(), i)
}

fn parse_path_bare_key(path: &str, i: usize) -> (String, usize) {
    let rest = &path[i..];
    let end = rest
        .char_indices()
        .find(|&(_, c)| !is_bare_key_char(c))
        .map_or(rest.len(), |(idx, _)| idx);
    (rest[..end].to_string(), i + end)
}

pub(crate) fn match_key_parts(parts: &[KeyPart], segs: &[String]) -> bool {
    parts.len() == segs.len() && parts.iter().zip(segs).all(|(p, s)| p.unquoted == *s)
}

// --- Lookups ---

impl Document {
    /// Finds a key-value by dotted path (e.g. `"server.host"`), searching
    /// top-level key-values first (descending into inline-table values),
    /// then entries under matching table headers, trying the longest table
    /// prefix first.
    pub fn get(&self, path: &str) -> Option<&KeyValue> {
        let segs = parse_dotted_path(path);
        if segs.is_empty() {
            return None;
        }

        let top: Vec<&KeyValue> = self.items.iter().filter_map(Item::as_key_value).collect();
        if let Some(kv) = find_in_kv_list(&top, &segs) {
            return Some(kv);
        }

        for prefix_len in (1..segs.len()).rev() {
            let (table_segs, key_segs) = segs.split_at(prefix_len);
            for item in &self.items {
                let found = match item {
                    Item::Table(t) if match_key_parts(&t.header_parts, table_segs) => {
                        find_in_entries(&t.entries, key_segs)
                    }
                    Item::ArrayOfTables(a) if match_key_parts(&a.header_parts, table_segs) => {
                        find_in_entries(&a.entries, key_segs)
                    }
                    _ => None,
                };
                if found.is_some() {
                    return found;
                }
            }
        }
        None
    }

    /// Finds the first table header matching the dotted path.
    pub fn table(&self, path: &str) -> Option<&TableHeader> {
        let segs = parse_dotted_path(path);
        self.items
            .iter()
            .filter_map(Item::as_table)
            .find(|t| match_key_parts(&t.header_parts, &segs))
    }

    /// All `[[path]]` headers matching the dotted path, in document order.
    pub fn arrays_of_tables_named(&self, path: &str) -> Vec<&ArrayOfTables> {
        let segs = parse_dotted_path(path);
        self.items
            .iter()
            .filter_map(Item::as_array_of_tables)
            .filter(|a| match_key_parts(&a.header_parts, &segs))
            .collect()
    }
}

impl TableHeader {
    /// Finds a key-value in this table's entries by dotted key.
    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        find_in_entries(&self.entries, &parse_dotted_path(key))
    }
}

impl ArrayOfTables {
    /// Finds a key-value in this entry's key-values by dotted key.
    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        find_in_entries(&self.entries, &parse_dotted_path(key))
    }
}

impl InlineTableVal {
    /// Finds a key-value in this inline table by dotted key.
    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        find_in_kvs(&self.entries, &parse_dotted_path(key))
    }
}

fn find_in_entries<'a>(entries: &'a [Entry], segs: &[String]) -> Option<&'a KeyValue> {
    let kvs: Vec<&KeyValue> = entries.iter().filter_map(Entry::as_key_value).collect();
    find_in_kv_list(&kvs, segs)
}

fn find_in_kv_list<'a>(kvs: &[&'a KeyValue], segs: &[String]) -> Option<&'a KeyValue> {
    if segs.is_empty() {
        return None;
    }
    for kv in kvs {
        if match_key_parts(&kv.key_parts, segs) {
            return Some(kv);
        }
    }
    // A strict key prefix may continue inside an inline-table value.
    for kv in kvs {
        let n = kv.key_parts.len();
        if n < segs.len() && match_key_parts(&kv.key_parts, &segs[..n]) {
            if let Value::InlineTable(it) = &kv.value {
                if let Some(found) = find_in_kvs(&it.entries, &segs[n..]) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn find_in_kvs<'a>(kvs: &'a [KeyValue], segs: &[String]) -> Option<&'a KeyValue> {
    let refs: Vec<&KeyValue> = kvs.iter().collect();
    find_in_kv_list(&refs, segs)
}

// --- Value decoding ---

impl StringVal {
    /// The unquoted, unescaped string content.
    pub fn value(&self) -> String {
        let raw = &self.text;
        if raw.len() < 2 {
            return raw.clone();
        }
        if raw.len() >= 6 {
            if let Some(inner) = raw.strip_prefix("\"\"\"").and_then(|r| r.strip_suffix("\"\"\"")) {
                return process_multiline_basic_escapes(trim_leading_newline(inner));
            }
            if let Some(inner) = raw.strip_prefix("'''").and_then(|r| r.strip_suffix("'''")) {
                return trim_leading_newline(inner).to_string();
            }
        }
        if raw.starts_with('\'') {
            return raw[1..raw.len() - 1].to_string();
        }
        process_basic_escapes(&raw[1..raw.len() - 1])
    }
}

impl NumberVal {
    /// Decodes the number as an `i64`. Fails on float-shaped lexemes and
    /// out-of-range magnitudes.
    pub fn int(&self) -> Result<i64, TomlError> {
        let clean: String = self.text.chars().filter(|&c| c != '_').collect();
        if is_special_float(&clean) {
            return Err(TomlError::InvalidValueType);
        }
        // Prefixed integers first: hex digits contain 'e'/'E', which would
        // otherwise read as a float marker.
        if let Some(body) = clean.strip_prefix("0x") {
            return i64::from_str_radix(body, 16).map_err(|_| TomlError::InvalidValueType);
        }
        if let Some(body) = clean.strip_prefix("0o") {
            return i64::from_str_radix(body, 8).map_err(|_| TomlError::InvalidValueType);
        }
        if let Some(body) = clean.strip_prefix("0b") {
            return i64::from_str_radix(body, 2).map_err(|_| TomlError::InvalidValueType);
        }
        if clean.contains(['.', 'e', 'E']) {
            return Err(TomlError::InvalidValueType);
        }
        clean
            .strip_prefix('+')
            .unwrap_or(&clean)
            .parse()
            .map_err(|_| TomlError::InvalidValueType)
    }

    /// Decodes the number as an `f64`. Integers (including prefixed ones)
    /// widen to float.
    pub fn float(&self) -> Result<f64, TomlError> {
        let clean: String = self.text.chars().filter(|&c| c != '_').collect();
        match clean.as_str() {
            "inf" | "+inf" => return Ok(f64::INFINITY),
            "-inf" => return Ok(f64::NEG_INFINITY),
            "nan" | "+nan" | "-nan" => return Ok(f64::NAN),
            _ => {}
        }
        for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
            if let Some(body) = clean.strip_prefix(prefix) {
                return i64::from_str_radix(body, radix)
                    .map(|v| v as f64)
                    .map_err(|_| TomlError::InvalidValueType);
            }
        }
        clean
            .strip_prefix('+')
            .unwrap_or(&clean)
            .parse()
            .map_err(|_| TomlError::InvalidValueType)
    }
}

impl BoolVal {
    pub fn value(&self) -> bool {
        self.text == "true"
    }
}

impl DateTimeVal {
    /// The datetime lexeme as written.
    pub fn value(&self) -> &str {
        &self.text
    }
}

fn trim_leading_newline(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix("\r\n") {
        rest
    } else {
        s.strip_prefix('\n').unwrap_or(s)
    }
}

/// Decodes basic-string escapes. Lenient: sequences that are not valid
/// escapes pass through literally, since validation already ran.
pub(crate) fn process_basic_escapes(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            let c = s[i..].chars().next().expect("in-bounds index");
            out.push(c);
            i += c.len_utf8();
            continue;
        }
        let (decoded, next) = process_single_escape(s, i);
        out.push_str(&decoded);
        i = next;
    }
    out
}

/// Decodes escapes in multi-line basic strings, including the line-ending
/// backslash, which folds all following whitespace and newlines.
pub(crate) fn process_multiline_basic_escapes(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            let c = s[i..].chars().next().expect("in-bounds index");
            out.push(c);
            i += c.len_utf8();
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'\n') => i = skip_folded_ws(bytes, i + 2),
            Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => i = skip_folded_ws(bytes, i + 3),
            Some(b' ' | b'\t') if has_newline_after_ws(bytes, i + 1) => {
                i = skip_folded_ws(bytes, i + 1);
            }
            _ => {
                let (decoded, next) = process_single_escape(s, i);
                out.push_str(&decoded);
                i = next;
            }
        }
    }
    out
}

fn skip_folded_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

fn has_newline_after_ws(bytes: &[u8], mut i: usize) -> bool {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i < bytes.len() && (bytes[i] == b'\n' || bytes[i] == b'\r')
}

/// Decodes one escape at the backslash position; returns the decoded text
/// and the index just past the escape.
fn process_single_escape(s: &str, i: usize) -> (String, usize) {
    let bytes = s.as_bytes();
    let Some(&code) = bytes.get(i + 1) else {
        return ("\\".to_string(), i + 1);
    };
    let simple = match code {
        b'b' => Some('\u{0008}'),
        b't' => Some('\t'),
        b'n' => Some('\n'),
        b'f' => Some('\u{000C}'),
        b'r' => Some('\r'),
        b'"' => Some('"'),
        b'\\' => Some('\\'),
        b'e' => Some('\u{001B}'),
        _ => None,
    };
    if let Some(c) = simple {
        return (c.to_string(), i + 2);
    }
    let digits = match code {
        b'x' => 2,
        b'u' => 4,
        b'U' => 8,
        _ => {
            // Not an escape we know: keep the backslash and the byte.
            let c = s[i + 1..].chars().next().expect("in-bounds index");
            return (format!("\\{c}"), i + 1 + c.len_utf8());
        }
    };
    let start = i + 2;
    if let Some(hex) = s.get(start..start + digits) {
        if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let n = u32::from_str_radix(hex, 16).expect("hex digits");
            let c = char::from_u32(n).unwrap_or('\u{FFFD}');
            return (c.to_string(), start + digits);
        }
    }
    (format!("\\{}", code as char), i + 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    // --- path parsing ---

    #[test]
    fn test_parse_dotted_path_bare() {
        assert_eq!(parse_dotted_path("a.b.c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_dotted_path_whitespace() {
        assert_eq!(parse_dotted_path("a . b"), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_dotted_path_quoted() {
        assert_eq!(parse_dotted_path("a.\"b.c\".d"), vec!["a", "b.c", "d"]);
        assert_eq!(parse_dotted_path("'x.y'"), vec!["x.y"]);
    }

    #[test]
    fn test_parse_dotted_path_escapes_in_quotes() {
        assert_eq!(parse_dotted_path(r#""a\"b""#), vec!["a\"b"]);
    }

    #[test]
    fn test_parse_dotted_path_unclosed_quote_best_effort() {
        assert_eq!(parse_dotted_path("\"open"), vec!["open"]);
        assert_eq!(parse_dotted_path("'open"), vec!["open"]);
    }

    // --- lookups ---

    #[test]
    fn test_get_top_level() {
        let doc = parse_str("host = \"localhost\"\n").unwrap();
        assert!(doc.get("host").is_some());
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn test_get_in_table() {
        let doc = parse_str("[server]\nhost = \"localhost\"\nport = 8080\n").unwrap();
        let kv = doc.get("server.host").unwrap();
        assert_eq!(kv.raw_value(), "\"localhost\"");
        assert!(doc.get("server.missing").is_none());
    }

    #[test]
    fn test_get_longest_table_prefix_wins() {
        let doc = parse_str("[a]\nx = 1\n[a.b]\nx = 2\n").unwrap();
        let kv = doc.get("a.b.x").unwrap();
        assert_eq!(kv.raw_value(), "2");
    }

    #[test]
    fn test_get_descends_into_inline_tables() {
        let doc = parse_str("t = {x = 1, nested = {y = 2}}\n").unwrap();
        assert_eq!(doc.get("t.x").unwrap().raw_value(), "1");
        assert_eq!(doc.get("t.nested.y").unwrap().raw_value(), "2");
    }

    #[test]
    fn test_get_inline_table_inside_table() {
        let doc = parse_str("[srv]\nlimits = {cpu = 2}\n").unwrap();
        assert_eq!(doc.get("srv.limits.cpu").unwrap().raw_value(), "2");
    }

    #[test]
    fn test_get_dotted_key_inside_table() {
        let doc = parse_str("[t]\na.b = 5\n").unwrap();
        assert_eq!(doc.get("t.a.b").unwrap().raw_value(), "5");
    }

    #[test]
    fn test_get_quoted_path_segment() {
        let doc = parse_str("\"key with spaces\" = 1\n").unwrap();
        assert!(doc.get("\"key with spaces\"").is_some());
    }

    #[test]
    fn test_table_lookup() {
        let doc = parse_str("[database]\nport = 5432\n").unwrap();
        let tbl = doc.table("database").unwrap();
        assert_eq!(tbl.raw_header(), "database");
        assert!(doc.table("missing").is_none());
        assert_eq!(tbl.get("port").unwrap().raw_value(), "5432");
    }

    #[test]
    fn test_arrays_of_tables_named() {
        let doc = parse_str("[[p]]\nname = \"A\"\n[[p]]\nname = \"B\"\n[[q]]\nname = \"C\"\n")
            .unwrap();
        let named = doc.arrays_of_tables_named("p");
        assert_eq!(named.len(), 2);
        assert_eq!(named[0].get("name").unwrap().raw_value(), "\"A\"");
        assert_eq!(named[1].get("name").unwrap().raw_value(), "\"B\"");
    }

    // --- string decoding ---

    #[test]
    fn test_string_value_basic() {
        let doc = parse_str("s = \"hello\\nworld\"\n").unwrap();
        let s = doc.get("s").unwrap().value().as_string().unwrap();
        assert_eq!(s.value(), "hello\nworld");
    }

    #[test]
    fn test_string_value_unicode_escapes() {
        for (raw, expect) in [
            (r#"s = "\u00E9""#, "é"),
            (r#"s = "\xE9""#, "é"),
            (r#"s = "\e""#, "\u{001B}"),
            (r#"s = "\U0001F600""#, "😀"),
        ] {
            let doc = parse_str(&format!("{raw}\n")).unwrap();
            let s = doc.get("s").unwrap().value().as_string().unwrap();
            assert_eq!(s.value(), expect, "{raw}");
        }
    }

    #[test]
    fn test_string_value_literal() {
        let doc = parse_str("s = 'no \\escapes'\n").unwrap();
        let s = doc.get("s").unwrap().value().as_string().unwrap();
        assert_eq!(s.value(), "no \\escapes");
    }

    #[test]
    fn test_multiline_basic_trims_first_newline() {
        let doc = parse_str("s = \"\"\"\nline1\nline2\"\"\"\n").unwrap();
        let s = doc.get("s").unwrap().value().as_string().unwrap();
        assert_eq!(s.value(), "line1\nline2");
    }

    #[test]
    fn test_multiline_line_ending_backslash_folds() {
        let doc = parse_str("s = \"\"\"a \\\n    b\"\"\"\n").unwrap();
        let s = doc.get("s").unwrap().value().as_string().unwrap();
        assert_eq!(s.value(), "a b");
    }

    #[test]
    fn test_multiline_literal_keeps_content() {
        let doc = parse_str("s = '''\nkeep \\ this\n'''\n").unwrap();
        let s = doc.get("s").unwrap().value().as_string().unwrap();
        assert_eq!(s.value(), "keep \\ this\n");
    }

    // --- number decoding ---

    #[test]
    fn test_int_decoding() {
        let cases = [
            ("0xDEADBEEF", 0xDEAD_BEEFi64),
            ("0o755", 0o755),
            ("0b11010110", 0b1101_0110),
            ("1_000_000", 1_000_000),
            ("+99", 99),
            ("-17", -17),
        ];
        for (text, expect) in cases {
            let doc = parse_str(&format!("n = {text}\n")).unwrap();
            let n = doc.get("n").unwrap().value().as_number().unwrap();
            assert_eq!(n.int().unwrap(), expect, "{text}");
        }
    }

    #[test]
    fn test_int_on_float_fails() {
        let doc = parse_str("n = 3.14\n").unwrap();
        let n = doc.get("n").unwrap().value().as_number().unwrap();
        assert!(n.int().is_err());
    }

    #[test]
    fn test_float_decoding() {
        let cases = [("3.14", 3.14), ("5e+22", 5e22), ("42", 42.0), ("0x10", 16.0)];
        for (text, expect) in cases {
            let doc = parse_str(&format!("n = {text}\n")).unwrap();
            let n = doc.get("n").unwrap().value().as_number().unwrap();
            assert!((n.float().unwrap() - expect).abs() < 1e-9, "{text}");
        }
    }

    #[test]
    fn test_special_float_decoding() {
        let doc = parse_str("a = inf\nb = -inf\nc = nan\n").unwrap();
        let get = |k: &str| {
            doc.get(k)
                .unwrap()
                .value()
                .as_number()
                .unwrap()
                .float()
                .unwrap()
        };
        assert_eq!(get("a"), f64::INFINITY);
        assert_eq!(get("b"), f64::NEG_INFINITY);
        assert!(get("c").is_nan());
        let a = doc.get("a").unwrap().value().as_number().unwrap();
        assert!(a.int().is_err());
    }

    #[test]
    fn test_bool_decoding() {
        let doc = parse_str("yes = true\nno = false\n").unwrap();
        assert!(doc.get("yes").unwrap().value().as_boolean().unwrap().value());
        assert!(!doc.get("no").unwrap().value().as_boolean().unwrap().value());
    }
}
