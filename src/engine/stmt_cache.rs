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

//! Bind-time vector-literal inlining (spec §4.4 rule 4 / §4.8 Bind step).
//!
//! `translator::vector` rewrites `a <=> v` into
//! `VECTOR_L2(a, TO_VECTOR(v,FLOAT))`, but IRIS's `TO_VECTOR` only accepts a
//! string literal for its first argument, not a bound placeholder. When `v`
//! started life as a query parameter (`a <=> $1`), the rewrite leaves
//! `TO_VECTOR($1,FLOAT)` in the prepared text; once Bind supplies the actual
//! vector for `$1`, that placeholder has to be inlined as a literal before
//! the statement can be (re-)prepared against the backend. Every other
//! placeholder keeps working normally — only the ones a `TO_VECTOR(...)`
//! call swallows need this treatment.

use std::collections::HashMap;

use crate::executor::{Field, StatementHandle};
use crate::translator::scanner::{self};
use crate::types::BackendValue;

/// Which 1-based parameter positions of a translated statement feed
/// directly into a generated `TO_VECTOR($n,FLOAT)` call. Computed once per
/// prepared statement (at Parse time) and consulted on every Bind against
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorSignature {
    positions: Vec<usize>,
}

impl VectorSignature {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Scan `translated_sql` for `TO_VECTOR($n,FLOAT)` calls and record the
/// parameter numbers they reference.
pub fn signature(translated_sql: &str) -> VectorSignature {
    let mut positions = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = translated_sql[search_from..].find("TO_VECTOR($") {
        let start = search_from + rel + "TO_VECTOR($".len();
        let digits_end = translated_sql[start..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|o| start + o)
            .unwrap_or(translated_sql.len());
        if digits_end > start && translated_sql[digits_end..].starts_with(",FLOAT)") {
            if let Ok(n) = translated_sql[start..digits_end].parse::<usize>() {
                positions.push(n);
            }
        }
        search_from = digits_end.max(start + 1);
    }
    VectorSignature { positions }
}

/// Rewrite `sql`, inlining the vector literal for every position named in
/// `sig` whose bound value is a [`BackendValue::Vector`], and renumbering
/// the remaining `$n` placeholders down to close the gaps each inlined
/// parameter leaves behind. Positions are processed highest-first so an
/// earlier replacement never shifts the byte offset of one still to come.
/// A position in `sig` whose bound value isn't a vector (the caller passed
/// a literal through some other path) is left as an ordinary placeholder.
pub fn inline_vector_params(sql: &str, sig: &VectorSignature, params: &[BackendValue]) -> String {
    if sig.is_empty() {
        return sql.to_string();
    }
    let mut out = sql.to_string();
    let mut descending = sig.positions.clone();
    descending.sort_unstable();
    descending.reverse();
    for n in descending {
        let Some(BackendValue::Vector(v)) = params.get(n - 1) else {
            continue;
        };
        let needle = format!("TO_VECTOR(${n},FLOAT)");
        let literal = format!("TO_VECTOR('{}',FLOAT)", v.to_text());
        out = out.replace(&needle, &literal);
        out = renumber_above(&out, n);
    }
    out
}

/// Decrement every `$k` placeholder with `k > removed` by one. Placeholders
/// inside string literals, quoted identifiers, or comments are left alone.
fn renumber_above(sql: &str, removed: usize) -> String {
    let spans = scanner::scan(sql);
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && scanner::is_code_at(&spans, i) {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > start {
                out.push_str(&sql[last..i]);
                let n: usize = sql[start..j].parse().unwrap();
                if n > removed {
                    out.push('$');
                    out.push_str(&(n - 1).to_string());
                } else {
                    out.push_str(&sql[i..j]);
                }
                last = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&sql[last..]);
    out
}

/// Prepared handles for statement text this module rewrote by inlining
/// vector literals. Keyed on the exact text handed to
/// [`crate::executor::Executor::prepare`], so a Bind that repeats an
/// identical vector literal (e.g. a client re-executing the same portal)
/// reuses the handle instead of re-preparing against the backend.
#[derive(Default)]
pub struct VectorStmtCache {
    entries: HashMap<String, (StatementHandle, Vec<Field>)>,
}

impl VectorStmtCache {
    pub fn new() -> Self {
        VectorStmtCache { entries: HashMap::new() }
    }

    pub fn get(&self, inlined_sql: &str) -> Option<&(StatementHandle, Vec<Field>)> {
        self.entries.get(inlined_sql)
    }

    pub fn insert(&mut self, inlined_sql: String, entry: (StatementHandle, Vec<Field>)) {
        self.entries.insert(inlined_sql, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector;

    #[test]
    fn signature_finds_vector_placeholder() {
        let sig = signature("VECTOR_L2(EMBEDDING, TO_VECTOR($1,FLOAT))");
        assert_eq!(sig.positions, vec![1]);
    }

    #[test]
    fn signature_is_empty_without_to_vector() {
        assert!(signature("SELECT 1 WHERE X = $1").is_empty());
    }

    #[test]
    fn inlines_single_vector_param() {
        let sql = "VECTOR_L2(EMBEDDING, TO_VECTOR($1,FLOAT))";
        let sig = signature(sql);
        let params = vec![BackendValue::Vector(Vector::from_f32(vec![0.1, 0.2, 0.3]))];
        let out = inline_vector_params(sql, &sig, &params);
        assert_eq!(
            out,
            "VECTOR_L2(EMBEDDING, TO_VECTOR('[0.1,0.2,0.3]',FLOAT))"
        );
    }

    #[test]
    fn renumbers_trailing_placeholders_after_inlining() {
        let sql = "VECTOR_L2(EMBEDDING, TO_VECTOR($1,FLOAT)) AND NAME = $2";
        let sig = signature(sql);
        let params = vec![
            BackendValue::Vector(Vector::from_f32(vec![1.0, 2.0])),
            BackendValue::Str("alice".to_string()),
        ];
        let out = inline_vector_params(sql, &sig, &params);
        assert_eq!(
            out,
            "VECTOR_L2(EMBEDDING, TO_VECTOR('[1,2]',FLOAT)) AND NAME = $1"
        );
    }

    #[test]
    fn leaves_non_vector_param_at_signature_position_alone() {
        // Defensive: a position the signature names isn't always bound to a
        // vector (e.g. a client that builds its own literal SQL).
        let sql = "VECTOR_L2(EMBEDDING, TO_VECTOR($1,FLOAT))";
        let sig = signature(sql);
        let params = vec![BackendValue::Str("not a vector".to_string())];
        let out = inline_vector_params(sql, &sig, &params);
        assert_eq!(out, sql);
    }

    #[test]
    fn cache_roundtrips_by_exact_text() {
        let mut cache = VectorStmtCache::new();
        cache.insert(
            "SELECT 1".to_string(),
            (StatementHandle("h1".to_string()), vec![]),
        );
        assert!(cache.get("SELECT 1").is_some());
        assert!(cache.get("SELECT 2").is_none());
    }
}
