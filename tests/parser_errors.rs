// Unhappy-path coverage for the lex/parse/token-validation pipeline,
// exercised through the public entry point.

use toml_cst::{parse_str, TomlError};

fn parse_err(source: &str) -> toml_cst::ParseError {
    match parse_str(source) {
        Ok(_) => panic!("expected failure for {source:?}"),
        Err(TomlError::Parse(err)) => err,
        Err(other) => panic!("unexpected error kind: {other}"),
    }
}

#[test]
fn test_missing_equals() {
    let err = parse_err("key\n");
    assert!(err.message.contains("expected '='"));
}

#[test]
fn test_missing_value() {
    let err = parse_err("key =\n");
    assert!(err.message.contains("expected value"));
}

#[test]
fn test_garbage_value() {
    let err = parse_err("key = @\n");
    assert_eq!((err.line, err.column), (1, 7));
}

#[test]
fn test_two_values_on_one_line() {
    let err = parse_err("a = 1 2\n");
    assert!(err.message.contains("expected newline"));
}

#[test]
fn test_unterminated_basic_string() {
    parse_err("a = \"open\n");
    parse_err("a = \"open");
}

#[test]
fn test_unterminated_multiline_string() {
    parse_err("a = \"\"\"open\nand open\n");
    parse_err("a = '''open\n");
}

#[test]
fn test_unclosed_table_header() {
    let err = parse_err("[table\n");
    assert!(err.message.contains("expected ']'"));
}

#[test]
fn test_unclosed_aot_header() {
    let err = parse_err("[[aot]\nk = 1\n");
    assert!(err.message.contains("']]'"));
}

#[test]
fn test_empty_header() {
    parse_err("[]\n");
    parse_err("[[]]\n");
}

#[test]
fn test_junk_after_header() {
    let err = parse_err("[t] junk\n");
    assert!(err.message.contains("after table header"));
}

#[test]
fn test_unclosed_array() {
    parse_err("a = [1, 2\n");
}

#[test]
fn test_array_missing_comma() {
    let err = parse_err("a = [1 2]\n");
    assert!(err.message.contains("expected ',' or ']'"));
}

#[test]
fn test_unclosed_inline_table() {
    parse_err("a = {x = 1\n");
}

#[test]
fn test_inline_table_missing_comma() {
    let err = parse_err("a = {x = 1 y = 2}\n");
    assert!(err.message.contains("expected ',' or '}'"));
}

#[test]
fn test_bad_escape_position() {
    let err = parse_err("a = 1\nb = \"bad \\q escape\"\n");
    assert!(err.message.contains("invalid escape sequence '\\q'"));
    assert_eq!((err.line, err.column), (2, 5));
}

#[test]
fn test_surrogate_escape_rejected() {
    let err = parse_err("a = \"\\uD800\"\n");
    assert!(err.message.contains("invalid unicode scalar"));
}

#[test]
fn test_escape_out_of_range() {
    let err = parse_err("a = \"\\U00110000\"\n");
    assert!(err.message.contains("out of range"));
}

#[test]
fn test_control_char_in_string() {
    let err = parse_err("a = \"ding\u{0007}\"\n");
    assert!(err.message.contains("control character"));
}

#[test]
fn test_control_char_in_comment() {
    let err = parse_err("# bad\u{0007}\nkey = 1\n");
    assert!(err.message.contains("control character"));
    assert_eq!(err.line, 1);
}

#[test]
fn test_bare_cr_in_multiline_string() {
    let err = parse_err("a = \"\"\"line\rnot crlf\"\"\"\n");
    assert!(err.message.contains("bare carriage return"));
}

#[test]
fn test_number_errors() {
    let err = parse_err("n = 012\n");
    assert!(err.message.contains("leading zeros not allowed: 012"));
    parse_err("n = 1__2\n");
    parse_err("n = 1_\n");
    parse_err("n = -0x10\n");
    parse_err("n = 0x\n");
    parse_err("n = 1.\n");
    parse_err("n = 1e\n");
    parse_err("n = 1.2.3\n");
}

#[test]
fn test_datetime_errors() {
    for bad in ["2024-13-01", "2024-02-30", "2023-02-29", "25:00:00", "1987-7-05"] {
        let err = parse_err(&format!("d = {bad}\n"));
        assert!(
            err.message.contains("range") || err.message.contains("digits"),
            "unexpected message {:?} for {bad}",
            err.message
        );
    }
}

#[test]
fn test_invalid_bare_key_character() {
    let err = parse_err("schlüssel = 1\n");
    assert!(err.message.contains("invalid character"));
}

#[test]
fn test_error_positions_advance_with_lines() {
    let err = parse_err("a = 1\nb = 2\nc = @\n");
    assert_eq!((err.line, err.column), (3, 5));
}

#[test]
fn test_lone_bracket_at_eof() {
    parse_err("[");
    parse_err("[[");
}

#[test]
fn test_value_at_top_level() {
    // A line that starts with a value-shaped token still needs `=`.
    let err = parse_err("42\n");
    assert!(err.message.contains("expected '='"));
}
