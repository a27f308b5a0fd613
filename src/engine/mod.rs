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

//! Simple and Extended query engines (spec §4.7/§4.8), generalized from the
//! teacher's `TeideHandler`/`TeideQueryParser` pair (`server/handler.rs`)
//! onto the full session/translator/executor stack this crate adds.

pub mod extended;
pub mod simple;
pub mod stmt_cache;

use std::sync::Arc;

use futures::stream;
use pgwire::api::results::{DataRowEncoder, QueryResponse};
use pgwire::error::{PgWireError, PgWireResult};

use crate::executor::{Field, RowStream, TxStatus};
use crate::translator::scanner::{self, SpanKind};
use crate::types::{self, BackendValue};

/// Classification of a single already-translated statement, used to decide
/// how the engines drive [`crate::session::Session`]'s transaction status
/// (spec §4.7 step 2c).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxVerb {
    Begin,
    Commit,
    Rollback,
    Other,
}

/// Classify the *original* (pre-translation) SQL text for a single
/// statement. Translation already rewrote `BEGIN...` to `START
/// TRANSACTION`, so this looks for either form.
pub fn classify_tx_verb(sql: &str) -> TxVerb {
    let trimmed = sql.trim();
    let first_word = trimmed
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    match first_word.as_str() {
        "BEGIN" => TxVerb::Begin,
        "START" if trimmed.to_ascii_uppercase().starts_with("START TRANSACTION") => TxVerb::Begin,
        "COMMIT" | "END" => TxVerb::Commit,
        "ROLLBACK" => TxVerb::Rollback,
        _ => TxVerb::Other,
    }
}

/// True if `sql`'s first keyword is `COPY` (spec §4.7 step 2b routes this to
/// the COPY subsystem instead of the ordinary executor path).
pub fn is_copy_statement(sql: &str) -> bool {
    sql.trim_start()
        .get(..4)
        .map(|s| s.eq_ignore_ascii_case("COPY"))
        .unwrap_or(false)
}

/// Split `sql` into individual statements on semicolons that fall outside
/// string literals, quoted identifiers, and comments (spec §4.7 step 1).
/// Empty statements (blank, or comment-only) between semicolons are
/// dropped, matching PostgreSQL's own simple-query splitting.
pub fn split_statements(sql: &str) -> Vec<String> {
    let spans = scanner::scan(sql);
    let mut out = Vec::new();
    let mut last = 0;
    let bytes = sql.as_bytes();

    for i in 0..bytes.len() {
        if bytes[i] == b';' && scanner::is_code_at(&spans, i) {
            push_if_nonempty(&mut out, &sql[last..i]);
            last = i + 1;
        }
    }
    push_if_nonempty(&mut out, &sql[last..]);
    out
}

fn push_if_nonempty(out: &mut Vec<String>, stmt: &str) {
    if !is_blank(stmt) {
        out.push(stmt.to_string());
    }
}

/// True if `stmt` is empty once comments and whitespace are stripped away,
/// i.e. it carries no executable content (spec §4.7: "Empty SQL returns
/// EmptyQueryResponse").
fn is_blank(stmt: &str) -> bool {
    let spans = scanner::scan(stmt);
    spans
        .iter()
        .filter(|s| s.kind == SpanKind::Code)
        .all(|s| stmt[s.start..s.end].trim().is_empty())
        && spans.iter().all(|s| s.kind != SpanKind::StringLit && s.kind != SpanKind::QuotedIdent)
}

/// Build the `CommandComplete` tag text for a finished statement (spec
/// §4.7 step 2d / §4.8 Execute): `"SELECT n"`, `"INSERT 0 n"`, `"UPDATE n"`,
/// `"DELETE n"`, or whatever the executor already supplied via
/// [`RowStream::command_tag`] for DDL/other statements.
pub fn command_tag(original_sql: &str, result: &RowStream) -> String {
    if let Some(tag) = &result.command_tag {
        return tag.clone();
    }
    let verb = original_sql
        .trim_start()
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    let n = result.rows.len();
    match verb.as_str() {
        "SELECT" | "VALUES" | "SHOW" => format!("SELECT {n}"),
        "INSERT" => format!("INSERT 0 {n}"),
        "UPDATE" => format!("UPDATE {n}"),
        "DELETE" => format!("DELETE {n}"),
        "BEGIN" | "START" => "BEGIN".to_string(),
        "COMMIT" | "END" => "COMMIT".to_string(),
        "ROLLBACK" => "ROLLBACK".to_string(),
        other if other.is_empty() => String::new(),
        other => other.to_string(),
    }
}

/// Encode a materialized row set into a `pgwire` `QueryResponse`, the shape
/// both the Simple and Extended engines hand back to the wire (spec
/// §4.7/§4.8). Mirrors the teacher's `encode::encode_wire_result`: one
/// `DataRowEncoder` reused across every row, each field rendered through
/// [`types::encode_text`] regardless of the column's declared wire format
/// (this crate always emits text, see `types::encode_text`'s own doc comment).
pub fn encode_rows(fields: &[Field], rows: Vec<Vec<BackendValue>>) -> PgWireResult<QueryResponse> {
    let schema = Arc::new(fields.iter().map(types::field_info).collect::<Vec<_>>());
    let mut encoded = Vec::with_capacity(rows.len());
    let mut encoder = DataRowEncoder::new(schema.clone());
    for row in rows {
        for (field, value) in fields.iter().zip(row.iter()) {
            let cell = types::encode_text(field.oid, value).map_err(PgWireError::from)?;
            encoder.encode_field(&cell)?;
        }
        encoded.push(Ok(encoder.take_row()));
    }
    Ok(QueryResponse::new(schema, stream::iter(encoded)))
}

/// The `TxStatus` an executed statement leaves the session in, independent
/// of the tag it reports: `RowStream::command_tag` already tells us whether
/// this was `BEGIN`/`COMMIT`/`ROLLBACK`, but the authoritative state is
/// whatever the executor itself reports happened, since it's the one
/// talking to the backend's actual transaction manager. Shared by both
/// query engines (spec §4.7 step 2c / §4.8 Execute).
pub(crate) fn result_tx_status(result: &RowStream) -> TxStatus {
    match result.command_tag.as_deref() {
        Some("COMMIT") | Some("ROLLBACK") => TxStatus::Idle,
        Some("BEGIN") => TxStatus::InTransaction,
        _ => TxStatus::InTransaction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons_outside_strings() {
        let stmts = split_statements("SELECT 1; SELECT ';'; SELECT 3");
        assert_eq!(stmts, vec!["SELECT 1", " SELECT ';'", " SELECT 3"]);
    }

    #[test]
    fn drops_empty_statements_between_semicolons() {
        let stmts = split_statements("SELECT 1;;  ;SELECT 2");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn classifies_transaction_verbs() {
        assert_eq!(classify_tx_verb("BEGIN"), TxVerb::Begin);
        assert_eq!(classify_tx_verb("begin transaction"), TxVerb::Begin);
        assert_eq!(classify_tx_verb("START TRANSACTION"), TxVerb::Begin);
        assert_eq!(classify_tx_verb("COMMIT"), TxVerb::Commit);
        assert_eq!(classify_tx_verb("ROLLBACK"), TxVerb::Rollback);
        assert_eq!(classify_tx_verb("SELECT 1"), TxVerb::Other);
    }

    #[test]
    fn recognizes_copy_statements_case_insensitively() {
        assert!(is_copy_statement("copy patients from stdin"));
        assert!(is_copy_statement("  COPY x TO stdout"));
        assert!(!is_copy_statement("SELECT 1"));
    }

    #[test]
    fn command_tag_falls_back_to_verb_and_row_count() {
        let rs = RowStream { fields: vec![], rows: vec![vec![], vec![]], has_more: false, command_tag: None };
        assert_eq!(command_tag("select * from t", &rs), "SELECT 2");
        assert_eq!(command_tag("insert into t values (1)", &rs), "INSERT 0 2");
    }
}
