//! Comment scrubbing
//!
//! Replaces `//` and `/* */` comments with spaces. Each output line has the
//! same character length and terminator as its input line.

use crate::continuation::{take_continued, Outbox};
use crate::lines::{LineStream, LineTerminatorInfo};
use crate::text::{ends_with_continuation, literal_end, skip_char_literal, spaces};
use cdeps_core::Result;
use tracing::trace;

/// What a scanned line leaves open for the following lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Nothing,
    BlockComment,
    /// A `//` comment whose line ends in a continuation backslash
    LineComment,
    /// A `"..."` literal whose line ends in a continuation backslash
    String,
}

/// The state left by a string literal that does not close on its line
fn open_literal(text: &str) -> Open {
    if ends_with_continuation(text) {
        Open::String
    } else {
        Open::Nothing
    }
}

/// Scrub comments from `text`, appending the result to `out`.
///
/// String and character literals are skipped so their contents never open a
/// comment. `in_string` tells whether `text` starts inside a string literal
/// continued from the previous line.
fn scrub_segment(text: &str, out: &mut String, in_string: bool) -> Open {
    let bytes = text.as_bytes();
    let mut copied = 0;
    let mut i = 0;
    if in_string {
        match literal_end(bytes, 0, b'"') {
            Some(end) => i = end,
            None => {
                out.push_str(text);
                return open_literal(text);
            }
        }
    }
    while i < bytes.len() {
        match bytes[i] {
            b'"' => match literal_end(bytes, i + 1, b'"') {
                Some(end) => i = end,
                None => {
                    out.push_str(&text[copied..]);
                    return open_literal(text);
                }
            },
            b'\'' => i = skip_char_literal(bytes, i),
            b'\\' => i += 2,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&text[copied..i]);
                let comment = &text[i..];
                if ends_with_continuation(comment) {
                    out.push_str(&spaces(&comment[..comment.len() - 1]));
                    out.push('\\');
                    return Open::LineComment;
                }
                out.push_str(&spaces(comment));
                return Open::Nothing;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied..i]);
                match text[i + 2..].find("*/") {
                    Some(offset) => {
                        let end = i + 2 + offset + 2;
                        out.push_str(&spaces(&text[i..end]));
                        i = end;
                        copied = end;
                    }
                    None => {
                        out.push_str(&spaces(&text[i..]));
                        return Open::BlockComment;
                    }
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied..]);
    Open::Nothing
}

/// Lazy comment scrubber over a line stream
pub struct CommentScrubber<I: Iterator<Item = Result<String>>> {
    lines: LineStream<I>,
    out: Outbox<String>,
    /// The previous line left a string literal open
    in_string: bool,
}

impl<I: Iterator<Item = Result<String>>> CommentScrubber<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines: LineStream::new(lines),
            out: Outbox::new(),
            in_string: false,
        }
    }

    fn scrub(&mut self, line: String) -> Result<()> {
        let info = self.lines.info().unwrap_or_default();
        let (body, end) = info.split(&line);
        let mut scrubbed = String::with_capacity(line.len());
        let mut open = scrub_segment(body, &mut scrubbed, self.in_string);
        self.in_string = false;
        scrubbed.push_str(end);
        self.out.push(scrubbed);

        loop {
            match open {
                Open::Nothing => return Ok(()),
                Open::String => {
                    self.in_string = true;
                    return Ok(());
                }
                Open::LineComment => {
                    let run = take_continued(&mut self.lines, |l| {
                        ends_with_continuation(info.split(l).0)
                    })?;
                    for line in &run.lines {
                        self.out.push(blank_line_comment(&info, line));
                    }
                    if !run.closed {
                        trace!("line comment continues to end of input");
                    }
                    return Ok(());
                }
                Open::BlockComment => {
                    let mut run =
                        take_continued(&mut self.lines, |l| !info.split(l).0.contains("*/"))?;
                    let closing = if run.closed { run.lines.pop() } else { None };
                    for line in &run.lines {
                        let (body, end) = info.split(line);
                        self.out.push(format!("{}{}", spaces(body), end));
                    }
                    let Some(closing) = closing else {
                        trace!("block comment runs to end of input");
                        return Ok(());
                    };
                    let (body, end) = info.split(&closing);
                    let close = body.find("*/").map_or(body.len(), |i| i + 2);
                    let mut scrubbed = spaces(&body[..close]);
                    open = scrub_segment(&body[close..], &mut scrubbed, false);
                    scrubbed.push_str(end);
                    self.out.push(scrubbed);
                }
            }
        }
    }
}

/// Blank a line inside a continued `//` comment, keeping its own
/// continuation backslash
fn blank_line_comment(info: &LineTerminatorInfo, line: &str) -> String {
    let (body, end) = info.split(line);
    if ends_with_continuation(body) {
        format!("{}\\{}", spaces(&body[..body.len() - 1]), end)
    } else {
        format!("{}{}", spaces(body), end)
    }
}

impl<I: Iterator<Item = Result<String>>> Iterator for CommentScrubber<I> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.out.pop() {
                return Some(item);
            }
            if self.out.is_halted() {
                return None;
            }
            match self.lines.next() {
                None => self.out.halt(),
                Some(Err(e)) => self.out.fail(e),
                Some(Ok(line)) => {
                    if let Err(e) = self.scrub(line) {
                        self.out.fail(e);
                    }
                }
            }
        }
    }
}

/// Replace comments in a line stream with spaces
pub fn replace_comments<I>(lines: I) -> CommentScrubber<I::IntoIter>
where
    I: IntoIterator<Item = Result<String>>,
{
    CommentScrubber::new(lines.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::ok_lines;
    use pretty_assertions::assert_eq;

    fn scrub(lines: &[&str]) -> Vec<String> {
        replace_comments(ok_lines(lines.iter().map(|l| l.to_string())))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn assert_geometry(input: &[&str], output: &[String]) {
        assert_eq!(input.len(), output.len());
        for (i, o) in input.iter().zip(output) {
            assert_eq!(i.chars().count(), o.chars().count(), "{:?} -> {:?}", i, o);
            assert_eq!(i.ends_with('\n'), o.ends_with('\n'));
        }
    }

    #[test]
    fn test_single_line_comment() {
        let input = ["int x = 1; // set x\n"];
        let output = scrub(&input);
        assert_eq!(output, vec![format!("int x = 1; {}\n", " ".repeat(8))]);
        assert_geometry(&input, &output);
    }

    #[test]
    fn test_block_comment_same_line() {
        let output = scrub(&["a /* b */ c /* d */ e\n"]);
        assert_eq!(output, vec!["a         c         e\n"]);
    }

    #[test]
    fn test_block_comment_over_three_lines() {
        let input = ["/* start\n", "middle\n", "end */ int y;\n"];
        let output = scrub(&input);
        assert_eq!(
            output,
            vec![
                "        \n".to_string(),
                "      \n".to_string(),
                "       int y;\n".to_string(),
            ]
        );
        assert_geometry(&input, &output);
    }

    #[test]
    fn test_block_comment_then_line_comment_on_closing_line() {
        let input = ["x; /*\n", "*/ y; // z\n", "w;\n"];
        let output = scrub(&input);
        assert_eq!(output, vec!["x;   \n", "   y;     \n", "w;\n"]);
    }

    #[test]
    fn test_line_comment_continuation() {
        let input = ["a; // one \\\n", "two \\\n", "three\n", "b;\n"];
        let output = scrub(&input);
        assert_eq!(
            output,
            vec![
                "a;        \\\n".to_string(),
                "    \\\n".to_string(),
                "     \n".to_string(),
                "b;\n".to_string(),
            ]
        );
        assert_geometry(&input, &output);
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let output = scrub(&["// path C:\\\\\n", "int z;\n"]);
        assert_eq!(output, vec!["            \n", "int z;\n"]);
    }

    #[test]
    fn test_first_opener_wins() {
        let output = scrub(&["a // b /* c\n", "d */\n"]);
        assert_eq!(output, vec!["a          \n", "d */\n"]);

        let output = scrub(&["a /* b // c */ d\n"]);
        assert_eq!(output, vec!["a              d\n"]);
    }

    #[test]
    fn test_comment_markers_inside_literals() {
        let output = scrub(&["s = \"http://x\"; c = '/'; // tail\n"]);
        assert_eq!(output, vec!["s = \"http://x\"; c = '/';        \n"]);
    }

    #[test]
    fn test_line_comment_after_continued_string() {
        let input = ["char *s = \"abc\\\n", "def\"; // typedef oops\n", "int y;\n"];
        let output = scrub(&input);
        assert_eq!(
            output,
            vec![
                "char *s = \"abc\\\n".to_string(),
                format!("def\"; {}\n", " ".repeat(15)),
                "int y;\n".to_string(),
            ]
        );
        assert_geometry(&input, &output);
    }

    #[test]
    fn test_block_comment_after_continued_string() {
        let input = ["s = \"a /* \\\n", "b\"; /* a\n", "b */ int y;\n"];
        let output = scrub(&input);
        assert_eq!(
            output,
            vec![
                "s = \"a /* \\\n".to_string(),
                "b\";     \n".to_string(),
                "     int y;\n".to_string(),
            ]
        );
    }

    #[test]
    fn test_string_left_open_without_continuation_does_not_carry() {
        let output = scrub(&["s = \"abc\n", "x; // c\n"]);
        assert_eq!(output, vec!["s = \"abc\n", "x;     \n"]);
    }

    #[test]
    fn test_apostrophe_in_free_text() {
        let output = scrub(&["#error don't build // typedef note\n", "int x;\n"]);
        assert_eq!(
            output,
            vec![format!("#error don't build {}\n", " ".repeat(15)), "int x;\n".to_string()]
        );
    }

    #[test]
    fn test_unterminated_block_comment_ends_quietly() {
        let output = scrub(&["int a; /* open\n", "still open\n"]);
        assert_eq!(output, vec!["int a;        \n", "          \n"]);
    }

    #[test]
    fn test_crlf_and_unterminated_last_line() {
        let input = ["x; // c\r\n", "/* y */"];
        let output = scrub(&input);
        assert_eq!(output, vec!["x;     \r\n", "       "]);
    }

    #[test]
    fn test_mixed_terminators_fail() {
        let results: Vec<_> =
            replace_comments(ok_lines(vec!["a\n".to_string(), "b\r\n".into(), "c\n".into()]))
                .collect();
        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_idempotent() {
        let input = ["a; /* x */ b; // y \\\n", "z\n", "/* p\n", "q */ r;\n"];
        let once = scrub(&input);
        let again = scrub(&once.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(once, again);
    }
}
