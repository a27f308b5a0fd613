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

//! Stage 3: date-literal rewrite (spec §4.4 rule 3).
//!
//! A single-quoted literal matching exactly `'YYYY-MM-DD'` (legal calendar
//! ranges) becomes `TO_DATE('YYYY-MM-DD','YYYY-MM-DD')`. A literal that
//! merely contains a date-shaped substring, or one sitting inside a
//! comment, is left alone.

use super::scanner::{self, SpanKind};

pub fn rewrite(sql: &str) -> String {
    let spans = scanner::scan(sql);
    let mut out = String::with_capacity(sql.len());
    for span in &spans {
        let text = &sql[span.start..span.end];
        if span.kind == SpanKind::StringLit
            && !immediately_after_to_date(&sql[..span.start])
        {
            if let Some(date) = exact_date_literal(text) {
                out.push_str(&format!("TO_DATE('{date}','YYYY-MM-DD')"));
                continue;
            }
        }
        out.push_str(text);
    }
    out
}

/// True if `before` ends with `TO_DATE(` (ignoring trailing whitespace),
/// meaning the literal that follows is already the first argument of a
/// previously-rewritten `TO_DATE` call — rewriting it again would nest
/// calls and break idempotence.
fn immediately_after_to_date(before: &str) -> bool {
    before.trim_end().to_ascii_uppercase().ends_with("TO_DATE(")
}

/// `lit` includes the surrounding single quotes. Returns the inner
/// `YYYY-MM-DD` text if it's exactly a date literal with legal components.
fn exact_date_literal(lit: &str) -> Option<&str> {
    let inner = lit.strip_prefix('\'')?.strip_suffix('\'')?;
    let bytes = inner.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    for (i, b) in bytes.iter().enumerate() {
        if i == 4 || i == 7 {
            continue;
        }
        if !b.is_ascii_digit() {
            return None;
        }
    }
    let year: u32 = inner[0..4].parse().ok()?;
    let month: u32 = inner[5..7].parse().ok()?;
    let day: u32 = inner[8..10].parse().ok()?;
    if year == 0 || !(1..=12).contains(&month) {
        return None;
    }
    let max_day = days_in_month(year, month);
    if !(1..=max_day).contains(&day) {
        return None;
    }
    Some(inner)
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_exact_date_literal() {
        assert_eq!(
            rewrite("VALUES ('1985-03-15')"),
            "VALUES (TO_DATE('1985-03-15','YYYY-MM-DD'))"
        );
    }

    #[test]
    fn leaves_substring_dates_alone() {
        assert_eq!(
            rewrite("SELECT 'born on 1985-03-15'"),
            "SELECT 'born on 1985-03-15'"
        );
    }

    #[test]
    fn rejects_invalid_calendar_date() {
        assert_eq!(rewrite("SELECT '2021-02-30'"), "SELECT '2021-02-30'");
    }

    #[test]
    fn accepts_leap_day() {
        assert_eq!(
            rewrite("SELECT '2024-02-29'"),
            "SELECT TO_DATE('2024-02-29','YYYY-MM-DD')"
        );
    }

    #[test]
    fn comment_is_not_touched() {
        assert_eq!(
            rewrite("SELECT 1 -- '1985-03-15'\n"),
            "SELECT 1 -- '1985-03-15'\n"
        );
    }

    #[test]
    fn idempotent() {
        let once = rewrite("SELECT '1985-03-15'");
        let twice = rewrite(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn does_not_double_wrap_already_translated_literal() {
        let once = rewrite("VALUES ('1985-03-15')");
        assert_eq!(rewrite(&once), once);
        assert!(!rewrite(&once).contains("TO_DATE(TO_DATE"));
    }
}
