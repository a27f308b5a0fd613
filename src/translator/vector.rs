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

//! Stage 4 + 5: pgvector operator rewrite and bracket-preservation
//! validation (spec §4.4 rules 4-5).
//!
//! `a <-> v`, `a <=> v`, `a <#> v` become `VECTOR_COSINE(a, TO_VECTOR(v,FLOAT))`,
//! `VECTOR_L2(...)`, `VECTOR_DOT_PRODUCT(...)` respectively. Runs after
//! identifier folding (so the generated function calls are also upper-case)
//! and is idempotent: a call this stage already produced is left alone on
//! a second pass because its telltale `VECTOR_*(` / `TO_VECTOR(` wrapper is
//! recognized and skipped.

use super::scanner::{self, SpanKind};

const OPERATORS: [(&str, &str); 3] = [
    ("<->", "VECTOR_COSINE"),
    ("<=>", "VECTOR_L2"),
    ("<#>", "VECTOR_DOT_PRODUCT"),
];

pub struct VectorRewrite {
    pub sql: String,
    /// True if a `TO_VECTOR(...)` call in the output lacks a `[` in its
    /// first argument (spec rule 5's bracket-stripping regression guard).
    pub bracket_warning: bool,
}

pub fn rewrite(sql: &str) -> VectorRewrite {
    let spans = scanner::scan(sql);
    let mut out = String::with_capacity(sql.len() + 16);
    let mut last = 0;
    let mut i = 0;
    let bytes = sql.as_bytes();

    while i < bytes.len() {
        if !scanner::is_code_at(&spans, i) {
            i += 1;
            continue;
        }
        if let Some((op_len, func)) = match_operator(sql, i) {
            if let Some((left_start, right_end)) = operand_bounds(sql, &spans, i, op_len) {
                out.push_str(&sql[last..left_start]);
                let left = sql[left_start..i].trim();
                let right = sql[i + op_len..right_end].trim();
                out.push_str(func);
                out.push('(');
                out.push_str(left);
                out.push_str(", TO_VECTOR(");
                out.push_str(right);
                out.push_str(",FLOAT))");
                last = right_end;
                i = right_end;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&sql[last..]);

    let bracket_warning = has_unbracketed_to_vector(&out);
    VectorRewrite { sql: out, bracket_warning }
}

fn match_operator(sql: &str, pos: usize) -> Option<(usize, &'static str)> {
    // Skip operators that are already the argument-separator inside a
    // previously-generated call, i.e. don't re-match inside `TO_VECTOR(`.
    let rest = &sql[pos..];
    for (op, func) in OPERATORS {
        if rest.starts_with(op) {
            return Some((op.len(), func));
        }
    }
    None
}

/// Find the `[left_start, right_end)` byte range covering the operand
/// expressions around the operator at `sql[op_start..op_start+op_len]`.
/// Operands are one of: a bracketed/quoted string literal, a `$n`
/// parameter placeholder, a dotted identifier chain, or a parenthesized
/// group — whichever is adjacent, scanning outward until a natural
/// boundary (whitespace run followed by a non-operand character, a comma,
/// or an unmatched closing/opening paren).
fn operand_bounds(
    sql: &str,
    spans: &[scanner::Span],
    op_start: usize,
    op_len: usize,
) -> Option<(usize, usize)> {
    // Already part of a generated call? Heuristic: if the text immediately
    // before the left operand we'd compute is `TO_VECTOR(`, this operator
    // is the argument separator inside an already-rewritten call, not a
    // fresh pgvector operator — bail out so a second pass is a no-op.
    let left_start = scan_operand_left(sql, spans, op_start)?;
    let right_end = scan_operand_right(sql, spans, op_start + op_len)?;

    let prefix = sql[..left_start].trim_end().to_ascii_uppercase();
    if prefix.ends_with("TO_VECTOR(") || prefix.ends_with(", ") && prefix.ends_with("TO_VECTOR(") {
        return None;
    }
    Some((left_start, right_end))
}

fn scan_operand_left(sql: &str, spans: &[scanner::Span], op_start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = op_start;
    while i > 0 && bytes[i - 1] == b' ' {
        i -= 1;
    }
    if i == 0 {
        return None;
    }
    // Closing paren: consume a balanced parenthesized group backward.
    if bytes[i - 1] == b')' {
        let mut depth = 0i32;
        let mut j = i;
        while j > 0 {
            j -= 1;
            match bytes[j] {
                b')' => depth += 1,
                b'(' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(j);
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    // String literal: find the span ending exactly at i.
    if bytes[i - 1] == b'\'' {
        if let Some(span) = spans
            .iter()
            .find(|s| s.kind == SpanKind::StringLit && s.end == i)
        {
            return Some(span.start);
        }
    }
    // Identifier chain (letters/digits/_/.), possibly with quoted parts.
    let mut j = i;
    loop {
        while j > 0 && is_ident_or_dot(bytes[j - 1]) {
            j -= 1;
        }
        if j > 0 && bytes[j - 1] == b'"' {
            if let Some(span) = spans
                .iter()
                .find(|s| s.kind == SpanKind::QuotedIdent && s.end == j)
            {
                j = span.start;
                if j > 0 && bytes[j - 1] == b'.' {
                    j -= 1;
                    continue;
                }
            }
        }
        break;
    }
    if j == i {
        None
    } else {
        Some(j)
    }
}

fn scan_operand_right(sql: &str, spans: &[scanner::Span], op_end: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = op_end;
    while i < bytes.len() && bytes[i] == b' ' {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }
    if bytes[i] == b'\'' {
        let span = spans
            .iter()
            .find(|s| s.kind == SpanKind::StringLit && s.start == i)?;
        return Some(span.end);
    }
    if bytes[i] == b'$' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        return if j > i + 1 { Some(j) } else { None };
    }
    if bytes[i] == b'(' {
        let mut depth = 0i32;
        let mut j = i;
        while j < bytes.len() {
            match bytes[j] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(j + 1);
                    }
                }
                _ => {}
            }
            j += 1;
        }
        return None;
    }
    let start = i;
    let mut j = i;
    loop {
        while j < bytes.len() && is_ident_or_dot(bytes[j]) {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'"' {
            if let Some(span) = spans
                .iter()
                .find(|s| s.kind == SpanKind::QuotedIdent && s.start == j)
            {
                j = span.end;
                continue;
            }
        }
        break;
    }
    if j == start {
        None
    } else {
        Some(j)
    }
}

fn is_ident_or_dot(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn has_unbracketed_to_vector(sql: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    let mut search_from = 0;
    while let Some(rel) = upper[search_from..].find("TO_VECTOR(") {
        let start = search_from + rel + "TO_VECTOR(".len();
        let end = sql[start..].find(',').map(|e| start + e).unwrap_or(sql.len());
        if !sql[start..end].contains('[') {
            return true;
        }
        search_from = end;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_l2_in_order_by_and_where() {
        let r = rewrite(
            "SELECT ID, EMBEDDING <=> '[0.1,0.2,0.3]' AS D FROM VECTORS ORDER BY EMBEDDING <=> '[0.1,0.2,0.3]' LIMIT 5",
        );
        assert_eq!(
            r.sql,
            "SELECT ID, VECTOR_L2(EMBEDDING, TO_VECTOR('[0.1,0.2,0.3]',FLOAT)) AS D FROM VECTORS ORDER BY VECTOR_L2(EMBEDDING, TO_VECTOR('[0.1,0.2,0.3]',FLOAT)) LIMIT 5"
        );
        assert!(!r.bracket_warning);
    }

    #[test]
    fn cosine_and_dot_product_operators() {
        assert!(rewrite("A <-> '[1,2]'").sql.starts_with("VECTOR_COSINE("));
        assert!(rewrite("A <#> '[1,2]'").sql.starts_with("VECTOR_DOT_PRODUCT("));
    }

    #[test]
    fn placeholder_on_right_side_is_wrapped() {
        let r = rewrite("EMBEDDING <=> $1");
        assert_eq!(r.sql, "VECTOR_L2(EMBEDDING, TO_VECTOR($1,FLOAT))");
    }

    #[test]
    fn idempotent() {
        let once = rewrite("EMBEDDING <=> '[0.1,0.2]'").sql;
        let twice = rewrite(&once).sql;
        assert_eq!(once, twice);
    }

    #[test]
    fn bracket_warning_when_literal_unbracketed() {
        // Synthetic: a manually-built TO_VECTOR call missing brackets.
        let r = rewrite("SELECT TO_VECTOR('0.1,0.2',FLOAT)");
        assert!(r.bracket_warning);
    }
}
