// Broader end-to-end flows: parse, query, mutate, re-serialize, and the
// decoding surface the conformance drivers rely on.

use toml_cst::{
    parse_str, ArrayVal, Entry, InlineTableVal, Item, KeyValue, NodeKind, NumberVal, StringVal,
    TableHeader, Value,
};

#[test]
fn test_read_modify_write_cycle() {
    let source = "# deploy config\n[service]\nname = \"api\"\nreplicas = 2\n";
    let mut doc = parse_str(source).unwrap();

    assert!(doc.set_value("service.replicas", Value::Number(NumberVal::integer(4))));
    doc.append(Item::KeyValue(
        KeyValue::new("owner", Value::String(StringVal::new("platform"))).unwrap(),
    ))
    .unwrap();

    let expected = "# deploy config\n[service]\nname = \"api\"\nreplicas = 4\nowner = \"platform\"\n";
    assert_eq!(doc.to_string(), expected);

    // Comments and spacing from the original survive untouched.
    let reparsed = parse_str(&doc.to_string()).unwrap();
    assert_eq!(reparsed.to_string(), expected);
}

#[test]
fn test_append_goes_to_document_end() {
    // Appended items land at top level even when the document ends in a
    // table; entries are added through the table node itself.
    let mut doc = parse_str("[t]\nx = 1\n").unwrap();
    doc.append(Item::Table(TableHeader::new(["u"]).unwrap()))
        .unwrap();
    assert_eq!(doc.to_string(), "[t]\nx = 1\n[u]\n");
}

#[test]
fn test_numeric_decoding_matrix() {
    let doc = parse_str(
        "hex = 0xDEADBEEF\noct = 0o755\nbin = 0b11010110\nsep = 1_000_000\npi = 3.14\nexp = 5e+22\npinf = inf\nninf = -inf\nnotnum = nan\n",
    )
    .unwrap();
    let num = |k: &str| doc.get(k).unwrap().value().as_number().unwrap().clone();

    assert_eq!(num("hex").int().unwrap(), 0xDEAD_BEEF);
    assert_eq!(num("oct").int().unwrap(), 0o755);
    assert_eq!(num("bin").int().unwrap(), 0b1101_0110);
    assert_eq!(num("sep").int().unwrap(), 1_000_000);
    assert!((num("pi").float().unwrap() - 3.14).abs() < 1e-12);
    assert_eq!(num("exp").float().unwrap(), 5e22);
    assert_eq!(num("pinf").float().unwrap(), f64::INFINITY);
    assert_eq!(num("ninf").float().unwrap(), f64::NEG_INFINITY);
    assert!(num("notnum").float().unwrap().is_nan());

    assert_eq!(doc.get("hex").unwrap().value().kind(), NodeKind::Number);
}

#[test]
fn test_datetime_value_kinds() {
    let doc = parse_str(
        "a = 2024-01-15\nb = 2024-01-15T08:30:00\nc = 2024-01-15T08:30:00Z\nd = 2024-01-15T08:30:00+05:30\ne = 1979-05-27 07:32:00Z\nf = 07:32\n",
    )
    .unwrap();
    for key in ["a", "b", "c", "d", "e", "f"] {
        let kv = doc.get(key).unwrap();
        assert_eq!(kv.value().kind(), NodeKind::DateTime, "{key}");
    }
    assert_eq!(
        doc.get("e").unwrap().value().as_datetime().unwrap().value(),
        "1979-05-27 07:32:00Z"
    );
}

#[test]
fn test_string_decoding_matrix() {
    let doc = parse_str(concat!(
        "basic = \"a\\u00E9b\"\n",
        "hexesc = \"\\xE9\"\n",
        "esc = \"\\e[0m\"\n",
        "literal = 'C:\\Users\\node'\n",
        "ml = \"\"\"\nfirst\nsecond\"\"\"\n",
        "mll = '''\nraw \\ text'''\n",
    ))
    .unwrap();
    let s = |k: &str| doc.get(k).unwrap().value().as_string().unwrap().value();
    assert_eq!(s("basic"), "aéb");
    assert_eq!(s("hexesc"), "é");
    assert_eq!(s("esc"), "\u{001B}[0m");
    assert_eq!(s("literal"), "C:\\Users\\node");
    assert_eq!(s("ml"), "first\nsecond");
    assert_eq!(s("mll"), "raw \\ text");
}

#[test]
fn test_five_quote_closer_content() {
    // Three closing quotes plus up to two content quotes.
    let doc = parse_str("s = \"\"\"two quotes: \"\"\"\"\"\n").unwrap();
    let s = doc.get("s").unwrap().value().as_string().unwrap().value();
    assert_eq!(s, "two quotes: \"\"");
}

#[test]
fn test_array_and_inline_construction_roundtrip() {
    let arr = ArrayVal::new(vec![
        Value::Number(NumberVal::integer(1)),
        Value::String(StringVal::new("two")),
        Value::Boolean(toml_cst::BoolVal::new(true)),
    ]);
    let mut doc = toml_cst::Document::new();
    doc.append(Item::KeyValue(
        KeyValue::new("list", Value::Array(arr)).unwrap(),
    ))
    .unwrap();
    assert_eq!(doc.to_string(), "list = [1, \"two\", true]\n");

    let rendered = doc.to_string();
    let reparsed = parse_str(&rendered).unwrap();
    let list = reparsed.get("list").unwrap().value().as_array().unwrap();
    assert_eq!(list.len(), 3);
}

#[test]
fn test_constructed_inline_table_nests() {
    let inner = InlineTableVal::new(vec![
        KeyValue::new("x", Value::Number(NumberVal::integer(1))).unwrap()
    ])
    .unwrap();
    let outer = InlineTableVal::new(vec![
        KeyValue::new("pos", Value::InlineTable(inner)).unwrap()
    ])
    .unwrap();
    let kv = KeyValue::new("t", Value::InlineTable(outer)).unwrap();
    assert_eq!(kv.text(), "t = {pos = {x = 1}}\n");
}

#[test]
fn test_walk_finds_nested_values() {
    let doc = parse_str("[t]\nlist = [1, {deep = \"found\"}]\n").unwrap();
    let mut strings = Vec::new();
    doc.walk(|n| {
        if let toml_cst::NodeRef::Value(Value::String(s)) = n {
            strings.push(s.value());
        }
        true
    });
    assert_eq!(strings, vec!["found"]);
}

#[test]
fn test_trailing_trivia_preserved_through_edits() {
    let mut doc = parse_str("port = 80  # keep me\n").unwrap();
    assert!(doc.set_value("port", Value::Number(NumberVal::integer(8080))));
    assert_eq!(doc.to_string(), "port = 8080  # keep me\n");
}

#[test]
fn test_delete_preserves_neighbors_trivia() {
    let mut doc = parse_str("# head\na = 1\nb = 2  # b comment\nc = 3\n").unwrap();
    assert!(doc.delete("a"));
    assert_eq!(doc.to_string(), "b = 2  # b comment\nc = 3\n");
}

#[test]
fn test_table_entry_edit_via_path_api() {
    let mut doc = parse_str("[limits]\ncpu = 1\n").unwrap();
    assert!(doc.set_value("limits.cpu", Value::Number(NumberVal::integer(2))));
    doc.append(Item::KeyValue(
        KeyValue::new("top", Value::Boolean(toml_cst::BoolVal::new(false))).unwrap(),
    ))
    .unwrap();
    assert_eq!(doc.to_string(), "[limits]\ncpu = 2\ntop = false\n");
}

#[test]
fn test_aot_append_entry() {
    let mut aot = toml_cst::ArrayOfTables::new(["items"]).unwrap();
    aot.append(Entry::KeyValue(
        KeyValue::new("name", Value::String(StringVal::new("widget"))).unwrap(),
    ))
    .unwrap();
    let mut doc = toml_cst::Document::new();
    doc.append(Item::ArrayOfTables(aot)).unwrap();
    assert_eq!(doc.to_string(), "[[items]]\nname = \"widget\"\n");
}
