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

//! Stage 1: transaction-verb rewrite (spec §4.4 rule 1).
//!
//! `BEGIN` / `BEGIN WORK` / `BEGIN TRANSACTION`, matched case-insensitively
//! and only outside string literals/comments, become `START TRANSACTION`;
//! trailing modifiers (e.g. `ISOLATION LEVEL READ COMMITTED`) pass through
//! verbatim. `COMMIT`/`ROLLBACK` are left untouched.

use super::scanner::{self, SpanKind};

pub fn rewrite(sql: &str) -> String {
    let spans = scanner::scan(sql);
    let mut out = String::with_capacity(sql.len() + 8);
    let mut last = 0;

    for span in &spans {
        if span.kind != SpanKind::Code {
            continue;
        }
        let code = &sql[span.start..span.end];
        if let Some(rel) = find_begin(code) {
            let abs = span.start + rel.0;
            out.push_str(&sql[last..abs]);
            out.push_str("START TRANSACTION");
            last = abs + rel.1;
        }
    }
    out.push_str(&sql[last..]);
    out
}

/// Finds the first `BEGIN [WORK|TRANSACTION]` token sequence in `code`,
/// case-insensitively, as a whole-word match. Returns `(start, len)` of the
/// matched span (covering `BEGIN` and its optional second word) relative to
/// `code`'s start.
fn find_begin(code: &str) -> Option<(usize, usize)> {
    let lower = code.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(rel) = lower[search_from..].find("begin") {
        let start = search_from + rel;
        let end = start + 5;
        let before_ok = start == 0 || !is_ident_byte(lower.as_bytes()[start - 1]);
        let after_ok = end == lower.len() || !is_ident_byte(lower.as_bytes()[end]);
        if before_ok && after_ok {
            let rest = &lower[end..];
            let trimmed = rest.trim_start();
            let skipped = rest.len() - trimmed.len();
            if let Some(word_len) = trimmed
                .strip_prefix("work")
                .map(|_| "work".len())
                .filter(|_| word_boundary_after(trimmed, 4))
            {
                return Some((start, 5 + skipped + word_len));
            }
            if let Some(word_len) = trimmed
                .strip_prefix("transaction")
                .map(|_| "transaction".len())
                .filter(|_| word_boundary_after(trimmed, 11))
            {
                return Some((start, 5 + skipped + word_len));
            }
            return Some((start, 5));
        }
        search_from = start + 5;
    }
    None
}

fn word_boundary_after(s: &str, n: usize) -> bool {
    s.as_bytes().get(n).map(|b| !is_ident_byte(*b)).unwrap_or(true)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_begin() {
        assert_eq!(rewrite("BEGIN"), "START TRANSACTION");
    }

    #[test]
    fn begin_work() {
        assert_eq!(rewrite("begin work"), "START TRANSACTION");
    }

    #[test]
    fn begin_transaction_with_modifier() {
        assert_eq!(
            rewrite("BEGIN TRANSACTION ISOLATION LEVEL READ COMMITTED"),
            "START TRANSACTION ISOLATION LEVEL READ COMMITTED"
        );
    }

    #[test]
    fn commit_and_rollback_pass_through() {
        assert_eq!(rewrite("COMMIT"), "COMMIT");
        assert_eq!(rewrite("ROLLBACK"), "ROLLBACK");
    }

    #[test]
    fn begin_inside_string_is_untouched() {
        assert_eq!(rewrite("SELECT 'begin here'"), "SELECT 'begin here'");
    }

    #[test]
    fn begin_as_substring_of_identifier_is_untouched() {
        assert_eq!(rewrite("SELECT beginner"), "SELECT beginner");
    }

    #[test]
    fn idempotent() {
        let once = rewrite("begin transaction");
        let twice = rewrite(&once);
        assert_eq!(once, twice);
    }
}
