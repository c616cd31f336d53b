//! Character-level helpers shared by the scrubbers
//!
//! Lengths are counted in characters so that column offsets computed on the
//! original text stay valid on the scrubbed text. All delimiters the
//! scrubbers look for are ASCII, so byte offsets found by scanning are always
//! character boundaries.

/// Spaces with the same character count as `text`
pub fn spaces(text: &str) -> String {
    " ".repeat(text.chars().count())
}

/// Right-pad `text` with spaces up to `width` characters
pub fn pad_to(text: &str, width: usize) -> Option<String> {
    let len = text.chars().count();
    if len > width {
        return None;
    }
    let mut padded = String::with_capacity(width);
    padded.push_str(text);
    padded.extend(std::iter::repeat(' ').take(width - len));
    Some(padded)
}

/// Whether `text` ends in an odd number of backslashes, i.e. a line
/// continuation that is not itself escaped
pub fn ends_with_continuation(text: &str) -> bool {
    text.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Whether the last non-blank character of `text` is a backslash
pub fn ends_with_backslash(text: &str) -> bool {
    text.trim_end().ends_with('\\')
}

/// Offset just past the `quote` that closes a literal whose body starts at
/// `from`, or `None` when the literal runs past the end of `bytes`
pub fn literal_end(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Skip a character literal starting at `start` (which holds the `'`).
///
/// Only one character or one escape sequence may sit between the quotes. A
/// `'` that opens no such literal, as in `don't`, is stepped over alone.
pub fn skip_char_literal(bytes: &[u8], start: usize) -> usize {
    let close = match bytes.get(start + 1) {
        None | Some(b'\'') => None,
        // '\n', '\x7f', '\012'
        Some(b'\\') => (start + 3..bytes.len().min(start + 7)).find(|&i| bytes[i] == b'\''),
        // multi-byte UTF-8 character
        Some(&b) if b >= 0x80 => (start + 2..bytes.len().min(start + 5)).find(|&i| bytes[i] == b'\''),
        Some(_) => (bytes.get(start + 2) == Some(&b'\'')).then_some(start + 2),
    };
    close.map_or(start + 1, |i| i + 1)
}

/// Collapse every whitespace run to a single space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_counts_chars() {
        assert_eq!(spaces("abc"), "   ");
        assert_eq!(spaces("é!"), "  ");
    }

    #[test]
    fn test_continuation_parity() {
        assert!(ends_with_continuation("foo \\"));
        assert!(!ends_with_continuation("foo \\\\"));
        assert!(ends_with_continuation("\\\\\\"));
        assert!(!ends_with_continuation("foo"));
    }

    #[test]
    fn test_literal_end() {
        let line = br#"x = "a\"b" + 1"#;
        assert_eq!(literal_end(line, 5, b'"'), Some(10));
        assert_eq!(literal_end(b"\"open", 1, b'"'), None);
        assert_eq!(literal_end(b"\"open \\", 1, b'"'), None);
        assert_eq!(literal_end(b"tail\"; x", 0, b'"'), Some(5));
    }

    #[test]
    fn test_skip_char_literal() {
        assert_eq!(skip_char_literal(b"'a' + 1", 0), 3);
        assert_eq!(skip_char_literal(b"'\\'' x", 0), 4);
        assert_eq!(skip_char_literal(b"'\\x7f'", 0), 6);
        assert_eq!(skip_char_literal("'é'".as_bytes(), 0), 4);
    }

    #[test]
    fn test_apostrophe_in_text_is_not_a_literal() {
        let line = b"don't build // note";
        assert_eq!(skip_char_literal(line, 3), 4);
        assert_eq!(skip_char_literal(b"''", 0), 1);
        assert_eq!(skip_char_literal(b"x'", 1), 2);
    }

    #[test]
    fn test_pad_to() {
        assert_eq!(pad_to("#if X", 8).as_deref(), Some("#if X   "));
        assert_eq!(pad_to("#include <a.h>", 5), None);
    }
}
