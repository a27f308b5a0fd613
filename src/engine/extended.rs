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

//! Extended Query Protocol engine (spec §4.8): Parse/Bind/Describe/Execute,
//! generalized from the teacher's `TeideQueryParser`/`TeideHandler` pair
//! (`server/handler.rs`) onto this crate's translator + executor stack.
//!
//! The teacher's parser stores the raw SQL string as `Self::Statement` and
//! re-runs it from scratch on every `do_query`, since Teide has no
//! parameter support to thread through. This crate has both parameters and
//! a translator pipeline to run once, so [`ParsedStatement`] instead carries
//! everything Parse already paid for: the translated SQL, an already-opened
//! [`StatementHandle`], its result schema, and the parameter OIDs Bind will
//! need to decode against.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::sink::Sink;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::ExtendedQueryHandler;
use pgwire::api::results::{
    DescribePortalResponse, DescribeStatementResponse, FieldInfo, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, Type};
use pgwire::error::{PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use tokio::sync::Mutex;

use super::stmt_cache::{self, VectorSignature, VectorStmtCache};
use crate::error::IrisPgError;
use crate::events;
use crate::executor::{Executor, Field, StatementHandle, TxStatus};
use crate::session::Session;
use crate::translator::{self, scanner};
use crate::types::{self, BackendValue};

/// Everything Parse produces for one prepared statement: the translator's
/// output, an already-prepared backend handle, the result schema, and the
/// parameter-position bookkeeping Bind needs (spec §4.8 Parse step).
#[derive(Clone)]
pub struct ParsedStatement {
    pub original_sql: String,
    pub translated_sql: String,
    pub param_oids: Vec<u32>,
    pub fields: Vec<Field>,
    pub handle: StatementHandle,
    vector_sig: VectorSignature,
}

/// Translates and prepares a statement once at Parse time (spec §4.8: "the
/// translator pipeline runs once per Parse, not once per Bind").
pub struct IrisQueryParser {
    executor: Arc<dyn Executor>,
}

impl IrisQueryParser {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        IrisQueryParser { executor }
    }
}

#[async_trait]
impl QueryParser for IrisQueryParser {
    type Statement = ParsedStatement;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        param_types: &[Option<Type>],
    ) -> PgWireResult<ParsedStatement>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        let report = translator::translate(sql);
        if report.bracket_warning {
            events::translator_warn("vector", "TO_VECTOR argument lost its bracket delimiters");
        }

        let (handle, fields) = self
            .executor
            .prepare(&report.sql)
            .await
            .map_err(PgWireError::from)?;

        let param_oids = infer_param_oids(&report.sql, param_types);
        let vector_sig = stmt_cache::signature(&report.sql);

        Ok(ParsedStatement {
            original_sql: sql.to_string(),
            translated_sql: report.sql,
            param_oids,
            fields,
            handle,
            vector_sig,
        })
    }

    fn get_parameter_types(&self, stmt: &ParsedStatement) -> PgWireResult<Vec<Type>> {
        Ok(stmt
            .param_oids
            .iter()
            .map(|oid| {
                types::LogicalType::from_oid(*oid)
                    .map(types::LogicalType::pg_type)
                    .unwrap_or(Type::VARCHAR)
            })
            .collect())
    }

    fn get_result_schema(
        &self,
        stmt: &ParsedStatement,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(stmt.fields.iter().map(types::field_info).collect())
    }
}

/// Highest-numbered `$n` placeholder in `sql`, used to size the parameter
/// OID list when the client's Parse message left some (or all) types
/// unspecified (spec §4.8: "unspecified parameter types default to TEXT").
fn max_placeholder(sql: &str) -> usize {
    let spans = scanner::scan(sql);
    let bytes = sql.as_bytes();
    let mut max_n = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && scanner::is_code_at(&spans, i) {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > start {
                if let Ok(n) = sql[start..j].parse::<usize>() {
                    max_n = max_n.max(n);
                }
                i = j;
                continue;
            }
        }
        i += 1;
    }
    max_n
}

const DEFAULT_PARAM_OID: u32 = 25; // TEXT

fn infer_param_oids(sql: &str, declared: &[Option<Type>]) -> Vec<u32> {
    let count = max_placeholder(sql).max(declared.len());
    (0..count)
        .map(|i| {
            declared
                .get(i)
                .and_then(|t| t.as_ref())
                .map(|t| t.oid())
                .unwrap_or(DEFAULT_PARAM_OID)
        })
        .collect()
}

/// Per-connection Extended Query Protocol handler.
///
/// Also implements [`pgwire::api::query::SimpleQueryHandler`] (see
/// `super::simple`) — one `IrisHandler` backs both query protocols for a
/// connection, same as the teacher's `TeideHandler`.
pub struct IrisHandler {
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) session: Arc<Mutex<Session>>,
    vector_cache: Mutex<VectorStmtCache>,
}

impl IrisHandler {
    pub fn new(executor: Arc<dyn Executor>, session: Arc<Mutex<Session>>) -> Self {
        IrisHandler { executor, session, vector_cache: Mutex::new(VectorStmtCache::new()) }
    }

    /// Decode every bound parameter in `portal` into a [`BackendValue`],
    /// against the OIDs Parse recorded for this statement.
    fn decode_params(&self, portal: &Portal<ParsedStatement>) -> PgWireResult<Vec<BackendValue>> {
        let stmt = &portal.statement.statement;
        portal
            .parameters
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let oid = stmt.param_oids.get(i).copied().unwrap_or(DEFAULT_PARAM_OID);
                let format = portal.parameter_format.format_for(i);
                types::decode_param(oid, format, raw.as_deref()).map_err(PgWireError::from)
            })
            .collect()
    }

    /// Resolve which prepared handle/schema to execute against: the
    /// statement's own handle, unless it carries a pgvector literal that
    /// has to be inlined per-Bind (spec §4.4 rule 4 / §4.8 Bind step), in
    /// which case the rewritten text is (re-)prepared and cached by its
    /// exact text so a repeated literal doesn't pay for re-preparation
    /// twice.
    async fn resolve_statement(
        &self,
        stmt: &ParsedStatement,
        params: &[BackendValue],
    ) -> Result<(StatementHandle, Vec<Field>), IrisPgError> {
        if stmt.vector_sig.is_empty() {
            return Ok((stmt.handle.clone(), stmt.fields.clone()));
        }
        let inlined = stmt_cache::inline_vector_params(&stmt.translated_sql, &stmt.vector_sig, params);
        if inlined == stmt.translated_sql {
            return Ok((stmt.handle.clone(), stmt.fields.clone()));
        }
        let mut cache = self.vector_cache.lock().await;
        if let Some(entry) = cache.get(&inlined) {
            return Ok(entry.clone());
        }
        let entry = self.executor.prepare(&inlined).await?;
        cache.insert(inlined, entry.clone());
        Ok(entry)
    }

    /// A failing statement only aborts the surrounding explicit transaction
    /// (spec §4.8: "errors inside a transaction block mark it failed until
    /// ROLLBACK"); an autocommit statement's failure leaves the session
    /// `Idle`, same as PostgreSQL.
    pub(crate) async fn mark_failed_if_in_transaction(&self) {
        let mut session = self.session.lock().await;
        if session.is_in_transaction() {
            session.set_tx_status(TxStatus::Failed);
        }
    }

    /// Only `BEGIN`/`COMMIT`/`ROLLBACK` change transaction status; every
    /// other statement's tag can never come back as one of those three, so
    /// this is a no-op for `TxVerb::Other`.
    pub(crate) async fn drive_tx_status(&self, verb: super::TxVerb, new_status: TxStatus) {
        if matches!(verb, super::TxVerb::Begin | super::TxVerb::Commit | super::TxVerb::Rollback) {
            self.session.lock().await.set_tx_status(new_status);
        }
    }
}

#[async_trait]
impl ExtendedQueryHandler for IrisHandler {
    type Statement = ParsedStatement;
    type QueryParser = IrisQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        Arc::new(IrisQueryParser::new(self.executor.clone()))
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<ParsedStatement>,
        max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = ParsedStatement>,
        C::Error: Debug,
        PgWireError: From<<C as Sink<PgWireBackendMessage>>::Error>,
    {
        if self.session.lock().await.is_failed() {
            return Err(IrisPgError::InFailedTransaction.into());
        }

        let stmt = portal.statement.statement.clone();
        let params = self.decode_params(portal)?;

        let (handle, fields) = self.resolve_statement(&stmt, &params).await.map_err(|e| {
            PgWireError::from(e)
        })?;

        let verb = super::classify_tx_verb(&stmt.original_sql);
        // `max_rows == 0` is PostgreSQL's wire-protocol spelling of
        // "unlimited"; pgwire's own Execute loop is responsible for slicing
        // the returned stream to `max_rows` and for the PortalSuspended vs
        // CommandComplete decision across repeated Executes of one portal,
        // the same division of labor the teacher relies on by ignoring this
        // parameter entirely.
        let _ = max_rows;

        let started = std::time::Instant::now();
        let result = self.executor.execute(&handle, &params, 0).await;
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                self.mark_failed_if_in_transaction().await;
                return Err(e.into());
            }
        };
        events::query_executed(stmt.translated_sql.len(), result.rows.len(), started.elapsed());

        self.drive_tx_status(verb, super::result_tx_status(&result)).await;

        let tag = super::command_tag(&stmt.original_sql, &result);
        if fields.is_empty() {
            return Ok(Response::Execution(Tag::new(&tag)));
        }
        let qr = super::encode_rows(&fields, result.rows)?;
        Ok(Response::Query(qr))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        statement: &StoredStatement<ParsedStatement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = ParsedStatement>,
        C::Error: Debug,
        PgWireError: From<<C as Sink<PgWireBackendMessage>>::Error>,
    {
        let stmt = &statement.statement;
        let param_types = stmt
            .param_oids
            .iter()
            .map(|oid| {
                types::LogicalType::from_oid(*oid)
                    .map(types::LogicalType::pg_type)
                    .unwrap_or(Type::VARCHAR)
            })
            .collect();
        let fields = stmt.fields.iter().map(types::field_info).collect();
        Ok(DescribeStatementResponse::new(param_types, fields))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        portal: &Portal<ParsedStatement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = ParsedStatement>,
        C::Error: Debug,
        PgWireError: From<<C as Sink<PgWireBackendMessage>>::Error>,
    {
        let fields = portal.statement.statement.fields.iter().map(types::field_info).collect();
        Ok(DescribePortalResponse::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_param_oids_from_placeholder_count_when_untyped() {
        let oids = infer_param_oids("SELECT * FROM t WHERE a = $1 AND b = $2", &[]);
        assert_eq!(oids, vec![DEFAULT_PARAM_OID, DEFAULT_PARAM_OID]);
    }

    #[test]
    fn declared_types_override_the_default() {
        let oids = infer_param_oids("SELECT * FROM t WHERE a = $1", &[Some(Type::INT4)]);
        assert_eq!(oids, vec![23]);
    }

    #[test]
    fn max_placeholder_ignores_dollar_signs_in_strings() {
        assert_eq!(max_placeholder("SELECT '$1 is not a param', $1"), 1);
    }
}
