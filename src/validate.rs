//! Token-level validators for comment, string, number, and datetime lexemes.
//!
//! The lexer is deliberately permissive: it finds token boundaries and leaves
//! content rules to this module. Each validator takes the raw lexeme (quotes
//! included, for strings) and returns the message for the first violation;
//! the parser reports it at the offending token's position.

use crate::lexer::is_special_float;

fn is_control_char(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}')
}

// --- Comment validation ---

pub(crate) fn validate_comment_text(s: &str) -> Result<(), String> {
    for c in s.chars() {
        if c != '\t' && is_control_char(c) {
            return Err(format!("control character U+{:04X} in comment", c as u32));
        }
    }
    Ok(())
}

// --- String validation ---

/// Validates a TOML string token (with its quotes). Determines the flavor
/// from the prefix and checks content and escape rules.
pub(crate) fn validate_string_text(raw: &str) -> Result<(), String> {
    if raw.len() < 2 {
        return Err("invalid string".to_string());
    }
    if let Some(inner) = raw.strip_prefix("\"\"\"").and_then(|r| r.strip_suffix("\"\"\"")) {
        return validate_basic_content(trim_leading_newline(inner), true);
    }
    if let Some(inner) = raw.strip_prefix("'''").and_then(|r| r.strip_suffix("'''")) {
        return validate_literal_content(trim_leading_newline(inner), true);
    }
    if raw.starts_with('\'') {
        return validate_literal_content(&raw[1..raw.len() - 1], false);
    }
    validate_basic_content(&raw[1..raw.len() - 1], false)
}

fn trim_leading_newline(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix("\r\n") {
        rest
    } else {
        s.strip_prefix('\n').unwrap_or(s)
    }
}

fn validate_basic_content(s: &str, multiline: bool) -> Result<(), String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1;
            if i >= bytes.len() {
                return Err("trailing backslash in string".to_string());
            }
            i = validate_basic_escape(s, i, multiline)?;
            continue;
        }
        check_bare_carriage_return(bytes, i, multiline)?;
        let c = s[i..].chars().next().expect("in-bounds index");
        check_string_control_char(c, multiline)?;
        i += c.len_utf8();
    }
    Ok(())
}

fn check_bare_carriage_return(bytes: &[u8], i: usize, multiline: bool) -> Result<(), String> {
    if multiline && bytes[i] == b'\r' && bytes.get(i + 1) != Some(&b'\n') {
        return Err("bare carriage return in multi-line string".to_string());
    }
    Ok(())
}

fn check_string_control_char(c: char, multiline: bool) -> Result<(), String> {
    if c == '\t' || !is_control_char(c) {
        return Ok(());
    }
    if multiline && (c == '\n' || c == '\r') {
        return Ok(());
    }
    Err(format!("control character U+{:04X} in string", c as u32))
}

/// Validates one escape starting at the byte after the backslash and
/// returns the index of the first byte past the escape.
fn validate_basic_escape(s: &str, i: usize, multiline: bool) -> Result<usize, String> {
    let bytes = s.as_bytes();
    match bytes[i] {
        b'b' | b't' | b'n' | b'f' | b'r' | b'"' | b'\\' | b'e' => Ok(i + 1),
        b'x' => validate_unicode_escape(s, i, 2),
        b'u' => validate_unicode_escape(s, i, 4),
        b'U' => validate_unicode_escape(s, i, 8),
        b'\n' | b'\r' => {
            if !multiline {
                return Err("invalid escape sequence".to_string());
            }
            Ok(skip_line_ending_backslash(bytes, i))
        }
        b' ' | b'\t' => {
            // A backslash followed by whitespace is only legal as a
            // line-ending escape in multi-line strings.
            if multiline && has_newline_after_ws(bytes, i) {
                Ok(skip_ws_and_newlines(bytes, i))
            } else {
                Err(format!("invalid escape sequence '\\{}'", bytes[i] as char))
            }
        }
        other => Err(format!("invalid escape sequence '\\{}'", other as char)),
    }
}

fn validate_unicode_escape(s: &str, i: usize, digits: usize) -> Result<usize, String> {
    let label = match digits {
        2 => "\\x",
        8 => "\\U",
        _ => "\\u",
    };
    let bytes = s.as_bytes();
    if i + digits >= bytes.len() {
        return Err(format!("incomplete {label} escape"));
    }
    if !bytes[i + 1..=i + digits].iter().all(u8::is_ascii_hexdigit) {
        return Err(format!("invalid {label} escape"));
    }
    let n = u32::from_str_radix(&s[i + 1..=i + digits], 16).expect("hex digits");
    if (0xD800..=0xDFFF).contains(&n) {
        return Err(format!("invalid unicode scalar U+{n:04X}"));
    }
    if n > 0x0010_FFFF {
        return Err(format!("unicode codepoint U+{n:04X} out of range"));
    }
    Ok(i + 1 + digits)
}

fn skip_line_ending_backslash(bytes: &[u8], mut i: usize) -> usize {
    if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
        i += 1;
    }
    i += 1;
    while i < bytes.len() && is_ws_or_newline(bytes[i]) {
        i += 1;
    }
    i
}

fn is_ws_or_newline(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn has_newline_after_ws(bytes: &[u8], mut i: usize) -> bool {
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i < bytes.len() && (bytes[i] == b'\n' || bytes[i] == b'\r')
}

fn skip_ws_and_newlines(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ws_or_newline(bytes[i]) {
        i += 1;
    }
    i
}

fn validate_literal_content(s: &str, multiline: bool) -> Result<(), String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        check_bare_carriage_return(bytes, i, multiline)?;
        let c = s[i..].chars().next().expect("in-bounds index");
        if c != '\t' && is_control_char(c) && !(multiline && (c == '\n' || c == '\r')) {
            return Err(format!(
                "control character U+{:04X} in literal string",
                c as u32
            ));
        }
        i += c.len_utf8();
    }
    Ok(())
}

// --- Number validation ---

pub(crate) fn validate_number_text(raw: &str) -> Result<(), String> {
    let clean: String = raw.chars().filter(|&c| c != '_').collect();

    if is_special_float(&clean) {
        return validate_underscores(raw);
    }
    if has_unsigned_prefix(&clean) {
        return check_prefixed_integer(raw, &clean);
    }
    if has_signed_prefix(&clean) {
        return Err(format!("sign not allowed on {} integer", &clean[1..3]));
    }
    check_decimal_leading_zeros(raw, &clean)?;
    if clean.contains(['.', 'e', 'E']) {
        validate_float_text(raw, &clean)
    } else {
        validate_decimal_digits(raw, &clean)
    }
}

fn has_unsigned_prefix(clean: &str) -> bool {
    let b = clean.as_bytes();
    b.len() > 1 && b[0] == b'0' && matches!(b[1], b'x' | b'o' | b'b')
}

fn has_signed_prefix(clean: &str) -> bool {
    let b = clean.as_bytes();
    b.len() > 2 && matches!(b[0], b'+' | b'-') && b[1] == b'0' && matches!(b[2], b'x' | b'o' | b'b')
}

fn check_prefixed_integer(raw: &str, clean: &str) -> Result<(), String> {
    let (prefix, valid): (&str, fn(&u8) -> bool) = match clean.as_bytes()[1] {
        b'x' => ("0x", |b: &u8| b.is_ascii_hexdigit()),
        b'o' => ("0o", |b: &u8| (b'0'..=b'7').contains(b)),
        _ => ("0b", |b: &u8| *b == b'0' || *b == b'1'),
    };
    let body = &clean.as_bytes()[2..];
    if body.is_empty() {
        return Err(format!("incomplete {prefix} integer: {raw}"));
    }
    if !body.iter().all(valid) {
        return Err(format!("invalid digit in {prefix} integer: {raw}"));
    }
    validate_underscores_in_body(raw, 2)
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn check_decimal_leading_zeros(raw: &str, clean: &str) -> Result<(), String> {
    let num = strip_sign(clean).as_bytes();
    if num.len() > 1 && num[0] == b'0' && !matches!(num[1], b'.' | b'e' | b'E') {
        return Err(format!("leading zeros not allowed: {raw}"));
    }
    Ok(())
}

fn validate_decimal_digits(raw: &str, clean: &str) -> Result<(), String> {
    if !strip_sign(clean).bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid character in integer: {raw}"));
    }
    validate_underscores(raw)
}

fn validate_float_text(raw: &str, clean: &str) -> Result<(), String> {
    if clean.matches('.').count() > 1 {
        return Err(format!("multiple dots in float: {raw}"));
    }
    if clean.matches(['e', 'E']).count() > 1 {
        return Err(format!("multiple exponents in float: {raw}"));
    }
    check_underscore_adjacency(raw)?;
    validate_underscores(raw)?;
    validate_float_parts(raw, clean)
}

fn validate_float_parts(raw: &str, clean: &str) -> Result<(), String> {
    let num = strip_sign(clean);
    let dot_idx = num.find('.');
    let e_idx = num.find(['e', 'E']);

    if let (Some(d), Some(e)) = (dot_idx, e_idx) {
        if d > e {
            return Err(format!("dot after exponent: {raw}"));
        }
    }
    if let Some(d) = dot_idx {
        validate_float_dot_parts(raw, num, d, e_idx)?;
    }
    if let Some(e) = e_idx {
        validate_float_exponent(raw, num, dot_idx, e)?;
    }
    validate_float_digits(raw, num)
}

fn validate_float_dot_parts(
    raw: &str,
    num: &str,
    dot_idx: usize,
    e_idx: Option<usize>,
) -> Result<(), String> {
    if dot_idx == 0 || dot_idx == num.len() - 1 {
        return Err(format!("invalid float: {raw}"));
    }
    let after_dot = match e_idx {
        Some(e) => &num[dot_idx + 1..e],
        None => &num[dot_idx + 1..],
    };
    if after_dot.is_empty() {
        return Err(format!("no digits after decimal point: {raw}"));
    }
    Ok(())
}

fn validate_float_exponent(
    raw: &str,
    num: &str,
    dot_idx: Option<usize>,
    e_idx: usize,
) -> Result<(), String> {
    let after = strip_sign(&num[e_idx + 1..]);
    if after.is_empty() {
        return Err(format!("no digits in exponent: {raw}"));
    }
    if dot_idx == Some(e_idx.wrapping_sub(1)) {
        return Err(format!("no digits between dot and exponent: {raw}"));
    }
    Ok(())
}

/// Mantissa and exponent bodies must consist of decimal digits only
/// (a sign is permitted immediately after the exponent marker).
fn validate_float_digits(raw: &str, num: &str) -> Result<(), String> {
    let mut prev = 0u8;
    for b in num.bytes() {
        let ok = b.is_ascii_digit()
            || matches!(b, b'.' | b'e' | b'E')
            || (matches!(b, b'+' | b'-') && matches!(prev, b'e' | b'E'));
        if !ok {
            return Err(format!("invalid character in float: {raw}"));
        }
        prev = b;
    }
    Ok(())
}

fn check_underscore_adjacency(raw: &str) -> Result<(), String> {
    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        if i > 0 && matches!(bytes[i - 1], b'.' | b'e' | b'E') {
            return Err(format!("underscore after {}: {raw}", bytes[i - 1] as char));
        }
        if let Some(&next) = bytes.get(i + 1) {
            if matches!(next, b'.' | b'e' | b'E') {
                return Err(format!("underscore before {}: {raw}", next as char));
            }
        }
    }
    Ok(())
}

fn validate_underscores(raw: &str) -> Result<(), String> {
    let start = if raw.starts_with(['+', '-']) { 1 } else { 0 };
    if start >= raw.len() {
        return Ok(());
    }
    validate_underscores_in_body(raw, start)
}

fn validate_underscores_in_body(s: &str, start: usize) -> Result<(), String> {
    let body = &s.as_bytes()[start..];
    if body.is_empty() {
        return Ok(());
    }
    if body[0] == b'_' {
        return Err(format!("leading underscore: {s}"));
    }
    if body[body.len() - 1] == b'_' {
        return Err(format!("trailing underscore: {s}"));
    }
    if body.windows(2).any(|w| w == b"__") {
        return Err(format!("double underscore: {s}"));
    }
    Ok(())
}

// --- DateTime validation ---

/// The four datetime shapes TOML distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeKind {
    OffsetDateTime,
    LocalDateTime,
    LocalDate,
    LocalTime,
}

/// Validates a datetime lexeme and reports which shape it matched.
///
/// The date/time separator is `T`, `t`, or a single space (the lexer only
/// joins a space-separated pair when the time side is well-formed). Seconds
/// and fractional seconds are optional. Field ranges are enforced, including
/// leap-year-aware day-of-month checks and leap-second tolerance.
pub fn validate_datetime_text(text: &str) -> Result<DateTimeKind, String> {
    if let Some(sep) = text.find(['T', 't', ' ']) {
        let date_part = &text[..sep];
        let time_part = &text[sep + 1..];
        let (time_part, has_offset) = strip_offset(time_part, text)?;
        validate_date_parts(date_part)?;
        validate_time_parts(time_part)?;
        return Ok(if has_offset {
            DateTimeKind::OffsetDateTime
        } else {
            DateTimeKind::LocalDateTime
        });
    }
    if text.contains('-') {
        validate_date_parts(text)?;
        return Ok(DateTimeKind::LocalDate);
    }
    if text.contains(':') {
        validate_time_parts(text)?;
        return Ok(DateTimeKind::LocalTime);
    }
    Err(format!("invalid datetime format: {text}"))
}

/// Splits a trailing UTC or numeric offset off a time lexeme, validating it.
fn strip_offset<'a>(time_part: &'a str, full: &str) -> Result<(&'a str, bool), String> {
    if let Some(rest) = time_part.strip_suffix(['Z', 'z']) {
        if rest.contains(['Z', 'z']) {
            return Err(format!("invalid datetime format: {full}"));
        }
        return Ok((rest, true));
    }
    if let Some(idx) = time_part.rfind(['+', '-']) {
        if idx == 0 {
            return Err(format!("invalid datetime format: {full}"));
        }
        validate_offset_text(&time_part[idx + 1..], full)?;
        return Ok((&time_part[..idx], true));
    }
    Ok((time_part, false))
}

fn validate_offset_text(offset: &str, full: &str) -> Result<(), String> {
    let Some((h, m)) = offset.split_once(':') else {
        return Err(format!("invalid offset format: {full}"));
    };
    if h.len() != 2 || m.len() != 2 {
        return Err(format!("invalid offset format: {full}"));
    }
    let hour: u32 = h
        .parse()
        .map_err(|_| format!("invalid offset hour: {full}"))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| format!("invalid offset minute: {full}"))?;
    if hour > 23 {
        return Err(format!("offset hour out of range: {full}"));
    }
    if minute > 59 {
        return Err(format!("offset minute out of range: {full}"));
    }
    Ok(())
}

fn validate_date_parts(s: &str) -> Result<(), String> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 3 || parts.iter().any(|p| !all_digits(p)) {
        return Err(format!("invalid date: {s}"));
    }
    if parts[0].len() != 4 {
        return Err(format!("year must be 4 digits: {s}"));
    }
    if parts[1].len() != 2 {
        return Err(format!("month must be 2 digits: {s}"));
    }
    if parts[2].len() != 2 {
        return Err(format!("day must be 2 digits: {s}"));
    }
    check_date_ranges(&parts, s)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn check_date_ranges(parts: &[&str], s: &str) -> Result<(), String> {
    let year: u32 = parts[0].parse().expect("digits");
    let month: u32 = parts[1].parse().expect("digits");
    let day: u32 = parts[2].parse().expect("digits");

    if !(1..=12).contains(&month) {
        return Err(format!("month out of range: {s}"));
    }
    if day < 1 {
        return Err(format!("day out of range: {s}"));
    }
    let days_in_month = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let max_day = if month == 2 && is_leap_year(year) {
        29
    } else {
        days_in_month[month as usize]
    };
    if day > max_day {
        return Err(format!("day {day} out of range for month {month}: {s}"));
    }
    Ok(())
}

fn is_leap_year(y: u32) -> bool {
    y % 4 == 0 && (y % 100 != 0 || y % 400 == 0)
}

fn validate_time_parts(s: &str) -> Result<(), String> {
    let (main, frac) = match s.split_once('.') {
        Some((main, frac)) => (main, Some(frac)),
        None => (s, None),
    };
    if let Some(frac) = frac {
        if frac.is_empty() {
            return Err(format!("trailing dot in time: {s}"));
        }
        if !all_digits(frac) {
            return Err(format!("invalid fractional seconds: {s}"));
        }
    }
    let parts: Vec<&str> = main.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(format!("time must have HH:MM or HH:MM:SS: {s}"));
    }
    if frac.is_some() && parts.len() != 3 {
        return Err(format!("fractional seconds require seconds: {s}"));
    }
    if parts.iter().any(|p| !all_digits(p)) {
        return Err(format!("invalid time: {s}"));
    }
    if parts[0].len() != 2 {
        return Err(format!("hour must be 2 digits: {s}"));
    }
    if parts[1].len() != 2 {
        return Err(format!("minute must be 2 digits: {s}"));
    }
    if parts.len() == 3 && parts[2].len() != 2 {
        return Err(format!("second must be 2 digits: {s}"));
    }
    check_time_ranges(&parts, s)
}

fn check_time_ranges(parts: &[&str], s: &str) -> Result<(), String> {
    let hour: u32 = parts[0].parse().expect("digits");
    let minute: u32 = parts[1].parse().expect("digits");
    if hour > 23 {
        return Err(format!("hour out of range: {s}"));
    }
    if minute > 59 {
        return Err(format!("minute out of range: {s}"));
    }
    if parts.len() == 3 {
        // 60 tolerated for leap seconds.
        let sec: u32 = parts[2].parse().expect("digits");
        if sec > 60 {
            return Err(format!("second out of range: {s}"));
        }
    }
    Ok(())
}
