//! Token-level scanning of raw C# text
//!
//! Separates code from comments and literals so operator counts and
//! effective line counts are not fooled by `// a && b` or `"http://x"`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Code,
    Comment,
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    kind: SegmentKind,
    start: usize,
    end: usize,
}

fn segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    scan_code(text.as_bytes(), 0, false, &mut segments);
    segments
}

/// Split code starting at `start` into segments
///
/// Inside an interpolation hole, scanning stops at the `}` or format `:`
/// that closes the hole, and that index is returned.
fn scan_code(bytes: &[u8], start: usize, in_hole: bool, segments: &mut Vec<Segment>) -> usize {
    let mut code_start = start;
    let mut nesting = 0usize;
    let mut i = start;

    while i < bytes.len() {
        let (kind, end) = match bytes[i] {
            b'(' | b'[' | b'{' if in_hole => {
                nesting += 1;
                i += 1;
                continue;
            }
            b')' | b']' | b'}' if in_hole && nesting > 0 => {
                nesting -= 1;
                i += 1;
                continue;
            }
            b':' if in_hole && bytes.get(i + 1) == Some(&b':') => {
                i += 2;
                continue;
            }
            b'}' | b':' if in_hole && nesting == 0 => {
                push(segments, SegmentKind::Code, code_start, i);
                return i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = find_byte(bytes, i, b'\n').unwrap_or(bytes.len());
                (SegmentKind::Comment, end)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_seq(bytes, i + 2, b"*/").map_or(bytes.len(), |p| p + 2);
                (SegmentKind::Comment, end)
            }
            b'"' => {
                let prefix = StringPrefix::before(bytes, i);
                push(segments, SegmentKind::Code, code_start, i);
                let end = if prefix.dollars > 0 {
                    scan_interpolated(bytes, i, prefix, segments)
                } else {
                    let end = if bytes[i..].starts_with(b"\"\"\"") {
                        raw_string_end(bytes, i)
                    } else {
                        string_end(bytes, i + 1, prefix.verbatim)
                    };
                    push(segments, SegmentKind::Literal, i, end);
                    end
                };
                i = end;
                code_start = end;
                continue;
            }
            b'\'' => (SegmentKind::Literal, char_end(bytes, i + 1)),
            _ => {
                i += 1;
                continue;
            }
        };
        push(segments, SegmentKind::Code, code_start, i);
        push(segments, kind, i, end);
        i = end;
        code_start = end;
    }
    push(segments, SegmentKind::Code, code_start, bytes.len());
    bytes.len()
}

fn push(segments: &mut Vec<Segment>, kind: SegmentKind, start: usize, end: usize) {
    if start < end {
        segments.push(Segment { kind, start, end });
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// The `$` and `@` markers in front of a string's opening quote
#[derive(Debug, Clone, Copy)]
struct StringPrefix {
    verbatim: bool,
    /// Braces opening a hole in an interpolated raw string; zero when the
    /// string is not interpolated
    dollars: usize,
}

impl StringPrefix {
    fn before(bytes: &[u8], quote: usize) -> Self {
        let mut prefix = StringPrefix {
            verbatim: false,
            dollars: 0,
        };
        for &b in bytes[..quote].iter().rev() {
            match b {
                b'$' => prefix.dollars += 1,
                b'@' => prefix.verbatim = true,
                _ => break,
            }
        }
        prefix
    }
}

/// Scan an interpolated string whose quote is at `quote`: the text is a
/// literal, every hole is code
fn scan_interpolated(
    bytes: &[u8],
    quote: usize,
    prefix: StringPrefix,
    segments: &mut Vec<Segment>,
) -> usize {
    let quotes = bytes[quote..].iter().take_while(|&&b| b == b'"').count();
    let raw = quotes >= 3;
    let closing = vec![b'"'; quotes];
    let mut literal_start = quote;
    let mut i = quote + if raw { quotes } else { 1 };

    while i < bytes.len() {
        if raw && bytes[i..].starts_with(&closing) {
            push(segments, SegmentKind::Literal, literal_start, i + quotes);
            return i + quotes;
        }
        match bytes[i] {
            b'{' if raw => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'{').count();
                i += run;
                if run >= prefix.dollars {
                    push(segments, SegmentKind::Literal, literal_start, i);
                    i = scan_code(bytes, i, true, segments);
                    literal_start = i;
                }
            }
            _ if raw => i += 1,
            b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
            b'{' => {
                push(segments, SegmentKind::Literal, literal_start, i + 1);
                i = scan_code(bytes, i + 1, true, segments);
                literal_start = i;
            }
            b'\\' if !prefix.verbatim => i += 2,
            b'"' if prefix.verbatim && bytes.get(i + 1) == Some(&b'"') => i += 2,
            b'"' => {
                push(segments, SegmentKind::Literal, literal_start, i + 1);
                return i + 1;
            }
            b'\n' if !prefix.verbatim => break,
            _ => i += 1,
        }
    }
    let end = i.min(bytes.len());
    push(segments, SegmentKind::Literal, literal_start, end);
    end
}

fn string_end(bytes: &[u8], mut i: usize, verbatim: bool) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if !verbatim => i += 2,
            b'"' if verbatim && bytes.get(i + 1) == Some(&b'"') => i += 2,
            b'"' => return i + 1,
            b'\n' if !verbatim => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn raw_string_end(bytes: &[u8], start: usize) -> usize {
    let quotes = bytes[start..].iter().take_while(|&&b| b == b'"').count();
    let closing = vec![b'"'; quotes];
    find_seq(bytes, start + quotes, &closing).map_or(bytes.len(), |p| p + quotes)
}

fn char_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Remove `//` and `/* */` comments, keeping the newlines inside block comments
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        let slice = &text[segment.start..segment.end];
        match segment.kind {
            SegmentKind::Comment => out.extend(slice.chars().filter(|&c| c == '\n')),
            SegmentKind::Code | SegmentKind::Literal => out.push_str(slice),
        }
    }
    out
}

/// Occurrences of an operator token in code, outside comments and literals
pub fn count_operator_tokens(text: &str, operator: &str) -> usize {
    segments(text)
        .into_iter()
        .filter(|segment| segment.kind == SegmentKind::Code)
        .map(|segment| text[segment.start..segment.end].matches(operator).count())
        .sum()
}

/// Lines of a member declaration excluding blanks, comments, the header
/// (everything before the line holding the first `{`) and the two braces.
/// Never less than 1.
pub fn effective_lines(text: &str) -> usize {
    let stripped = strip_comments(text);
    let lines: Vec<&str> = stripped
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let header = lines
        .iter()
        .position(|line| line.contains('{'))
        .unwrap_or(lines.len());
    lines.len().saturating_sub(header + 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let text = "int a = 1; // trailing\n/* block\ncomment */int b = 2;";
        assert_eq!(strip_comments(text), "int a = 1; \n\nint b = 2;");
    }

    #[test]
    fn test_strip_comments_keeps_urls_in_strings() {
        let text = r#"var url = "http://example.com"; // note"#;
        assert_eq!(strip_comments(text), r#"var url = "http://example.com"; "#);
    }

    #[test]
    fn test_verbatim_string_with_doubled_quotes() {
        let text = r#"var s = @"say ""hi"" // not a comment"; int x;"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_count_operator_tokens_skips_comments_and_literals() {
        let text = "if (a && b || c) { s = \"x && y\"; } // d && e\n/* f || g */ v = w ?? z;";
        assert_eq!(count_operator_tokens(text, "&&"), 1);
        assert_eq!(count_operator_tokens(text, "||"), 1);
        assert_eq!(count_operator_tokens(text, "??"), 1);
    }

    #[test]
    fn test_char_literal_is_not_code() {
        assert_eq!(count_operator_tokens("var c = '|'; var d = '\\''; a || b;", "||"), 1);
    }

    #[test]
    fn test_raw_string_literal() {
        let text = "var s = \"\"\"\n a && b \"quoted\"\n\"\"\"; x && y;";
        assert_eq!(count_operator_tokens(text, "&&"), 1);
    }

    #[test]
    fn test_interpolation_holes_are_code() {
        let text = r#"var s = $"{(a && b ? 1 : 2)} && {c ?? d,5:N2} {{e || f}}";"#;
        assert_eq!(count_operator_tokens(text, "&&"), 1);
        assert_eq!(count_operator_tokens(text, "??"), 1);
        assert_eq!(count_operator_tokens(text, "||"), 0);
    }

    #[test]
    fn test_interpolation_hole_with_nested_string() {
        let text = r#"log($@"{(ok ? "}" : "a || b")} path\{p || q}"); x && y;"#;
        assert_eq!(count_operator_tokens(text, "||"), 1);
        assert_eq!(count_operator_tokens(text, "&&"), 1);
    }

    #[test]
    fn test_raw_interpolated_string() {
        let text = "var j = $$\"\"\"\n{ \"k\": {{a && b}} } || {x}\n\"\"\"; c && d;";
        assert_eq!(count_operator_tokens(text, "&&"), 2);
        assert_eq!(count_operator_tokens(text, "||"), 0);
    }

    #[test]
    fn test_comment_markers_in_interpolated_text_are_literal() {
        let text = r#"var u = $"http://{host}/x"; int y;"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_effective_lines_of_block_method() {
        let text = "public int Sum(int a,\n    int b)\n{\n\n    // add\n    \
                    var c = a + b;\n    return c;\n}";
        // non-blank lines: 6 (the comment line is blank once stripped), header 2, braces 2
        assert_eq!(effective_lines(text), 2);
    }

    #[test]
    fn test_effective_lines_is_at_least_one() {
        assert_eq!(effective_lines("int One() { return 1; }"), 1);
        assert_eq!(effective_lines("int One() => 1;"), 1);
        assert_eq!(effective_lines("int One()\n{\n    return 1;\n}"), 1);
    }
}
