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

//! Simple Query Protocol engine (spec §4.7), generalized from the teacher's
//! `TeideHandler::do_query`/`execute_sql` pair (`server/handler.rs`).
//!
//! The teacher treats its whole `Query` string as one statement; this crate
//! adds statement splitting, transaction-verb tracking, and COPY dispatch on
//! top of the same translate-then-execute-then-encode shape.

use pgwire::api::query::SimpleQueryHandler;
use pgwire::api::results::{Response, Tag};
use pgwire::api::ClientInfo;
use pgwire::error::PgWireResult;

use super::extended::IrisHandler;
use crate::events;
use crate::translator;

#[async_trait::async_trait]
impl SimpleQueryHandler for IrisHandler {
    async fn do_query<C>(&self, _client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        let statements = super::split_statements(query);
        if statements.is_empty() {
            // An empty (or comment/whitespace-only) query: pgwire emits
            // `EmptyQueryResponse` for an empty `Vec<Response>` and skips
            // straight to `ReadyForQuery` (spec §4.7: "Empty SQL returns
            // EmptyQueryResponse then ReadyForQuery").
            return Ok(vec![]);
        }

        let mut responses = Vec::with_capacity(statements.len());
        for raw_stmt in statements {
            let verb = super::classify_tx_verb(&raw_stmt);

            if self.session.lock().await.is_failed() && verb != super::TxVerb::Rollback {
                // Postgres silently no-ops every statement after a failed
                // transaction until it sees ROLLBACK; it does not raise a
                // fresh error for each one.
                continue;
            }

            let report = translator::translate(&raw_stmt);
            if report.bracket_warning {
                events::translator_warn("vector", "TO_VECTOR argument lost its bracket delimiters");
            }

            if super::is_copy_statement(&report.sql) {
                // No grounded `CopyHandler` wiring exists to actually stream
                // `CopyData` (see `crate::copy`'s module docs), so COPY is
                // rejected outright rather than answered with a fabricated
                // success (spec §4.7 step 2b names COPY dispatch; §7's error
                // path is what actually runs here).
                let err = crate::copy::dispatch_simple(&report.sql);
                self.mark_failed_if_in_transaction().await;
                return Err(err.into());
            }

            let started = std::time::Instant::now();
            let result = self.executor.execute_script(&report.sql).await;
            let result = match result {
                Ok(r) => r,
                Err(e) => {
                    self.mark_failed_if_in_transaction().await;
                    return Err(e.into());
                }
            };
            events::query_executed(report.sql.len(), result.rows.len(), started.elapsed());

            self.drive_tx_status(verb, super::result_tx_status(&result)).await;

            let tag = super::command_tag(&raw_stmt, &result);
            if result.fields.is_empty() {
                responses.push(Response::Execution(Tag::new(&tag)));
            } else {
                let qr = super::encode_rows(&result.fields, result.rows)?;
                responses.push(Response::Query(qr));
            }
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::super::TxVerb;

    #[test]
    fn rollback_is_the_only_verb_allowed_through_a_failed_transaction() {
        assert_eq!(super::super::classify_tx_verb("ROLLBACK"), TxVerb::Rollback);
        assert_ne!(super::super::classify_tx_verb("SELECT 1"), TxVerb::Rollback);
    }
}
