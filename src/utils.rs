/// Returns the text of the given 1-based line, without its line terminator.
/// Used only on error paths when rendering diagnostics.
pub fn source_line(source: &str, line: usize) -> Option<&str> {
    if line == 0 {
        return None;
    }
    source
        .split('\n')
        .nth(line - 1)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Converts a 1-based line/column pair into a byte offset into `source`.
/// Saturates at the end of the input.
pub fn byte_offset(source: &str, line: usize, col: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut offset = 0;
    for (n, l) in source.split_inclusive('\n').enumerate() {
        if n + 1 == line {
            return (offset + col.saturating_sub(1)).min(source.len());
        }
        offset += l.len();
    }
    source.len()
}

pub fn is_bare_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
