//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Quote- and comment-aware character scanner shared by every translator
//! stage (spec §9: "a small state machine over characters... is preferable
//! to a pile of regexes").

/// What a byte span of the input SQL string represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Anything not inside a string, quoted identifier, or comment.
    Code,
    /// A `'...'` string literal, including the surrounding quotes.
    StringLit,
    /// A `"..."` quoted identifier, including the surrounding quotes.
    QuotedIdent,
    /// A `-- ...` line comment, up to (not including) the newline.
    LineComment,
    /// A `/* ... */` block comment, including delimiters.
    BlockComment,
}

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

/// Split `sql` into a contiguous sequence of spans covering every byte
/// exactly once. Doubled quotes inside a string/identifier (`''`, `""`) are
/// treated as escaped content, not a terminator, matching standard SQL
/// literal escaping.
pub fn scan(sql: &str) -> Vec<Span> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut spans = Vec::new();
    let mut i = 0;
    let mut code_start = 0;

    while i < len {
        let b = bytes[i];
        match b {
            b'\'' => {
                if code_start < i {
                    spans.push(Span { start: code_start, end: i, kind: SpanKind::Code });
                }
                let start = i;
                i += 1;
                loop {
                    if i >= len {
                        break;
                    }
                    if bytes[i] == b'\'' {
                        if i + 1 < len && bytes[i + 1] == b'\'' {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                spans.push(Span { start, end: i, kind: SpanKind::StringLit });
                code_start = i;
            }
            b'"' => {
                if code_start < i {
                    spans.push(Span { start: code_start, end: i, kind: SpanKind::Code });
                }
                let start = i;
                i += 1;
                loop {
                    if i >= len {
                        break;
                    }
                    if bytes[i] == b'"' {
                        if i + 1 < len && bytes[i + 1] == b'"' {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                spans.push(Span { start, end: i, kind: SpanKind::QuotedIdent });
                code_start = i;
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                if code_start < i {
                    spans.push(Span { start: code_start, end: i, kind: SpanKind::Code });
                }
                let start = i;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                spans.push(Span { start, end: i, kind: SpanKind::LineComment });
                code_start = i;
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                if code_start < i {
                    spans.push(Span { start: code_start, end: i, kind: SpanKind::Code });
                }
                let start = i;
                i += 2;
                while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(len);
                spans.push(Span { start, end: i, kind: SpanKind::BlockComment });
                code_start = i;
            }
            _ => i += 1,
        }
    }
    if code_start < len {
        spans.push(Span { start: code_start, end: len, kind: SpanKind::Code });
    }
    spans
}

/// True if byte offset `pos` falls inside a `Code` span of `sql` (i.e. not
/// inside a string literal, quoted identifier, or comment).
pub fn is_code_at(spans: &[Span], pos: usize) -> bool {
    spans
        .iter()
        .find(|s| pos >= s.start && pos < s.end)
        .map(|s| s.kind == SpanKind::Code)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_string_and_code() {
        let spans = scan("SELECT 'a' FROM t");
        let kinds: Vec<_> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SpanKind::Code, SpanKind::StringLit, SpanKind::Code]
        );
    }

    #[test]
    fn escaped_quote_does_not_terminate_string() {
        let spans = scan("SELECT 'it''s' FROM t");
        let lit = spans.iter().find(|s| s.kind == SpanKind::StringLit).unwrap();
        assert_eq!(&"SELECT 'it''s' FROM t"[lit.start..lit.end], "'it''s'");
    }

    #[test]
    fn line_comment_runs_to_newline() {
        let spans = scan("SELECT 1 -- comment\nFROM t");
        let c = spans.iter().find(|s| s.kind == SpanKind::LineComment).unwrap();
        assert_eq!(&"SELECT 1 -- comment\nFROM t"[c.start..c.end], "-- comment");
    }

    #[test]
    fn block_comment_is_skipped() {
        let spans = scan("SELECT /* x */ 1");
        let c = spans.iter().find(|s| s.kind == SpanKind::BlockComment).unwrap();
        assert_eq!(&"SELECT /* x */ 1"[c.start..c.end], "/* x */");
    }
}
