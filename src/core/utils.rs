//! Text helpers shared by the case parser, matchers and report rendering.

/// Split text into lines, accepting both `\n` and `\r\n` terminators.
///
/// A trailing terminator does not produce an extra empty line.
pub fn split_lines(data: &str) -> Vec<&str> {
    data.split_inclusive('\n')
        .map(|line| {
            let line = line.strip_suffix('\n').unwrap_or(line);
            line.strip_suffix('\r').unwrap_or(line)
        })
        .collect()
}

/// Length in bytes of the first line of `data`, terminator included.
pub fn next_line_len(data: &[u8]) -> usize {
    data.iter()
        .position(|&b| b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(data.len())
}

/// Trim ASCII whitespace on both ends (C `isspace` semantics).
pub fn trim(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b')
}

/// Trim and lower-case a tag value such as a variation name.
pub fn normalize_name(text: &str) -> String {
    trim(text).to_ascii_lowercase()
}

/// Remove a single trailing `\n`, if any.
pub fn remove_last_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
    }
}

/// Truncate `text` to at most `max` bytes without splitting a character.
pub fn truncate_at_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

/// Lossy conversion of captured program output for display and matching.
pub fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
