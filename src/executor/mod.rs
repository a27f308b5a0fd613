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

//! The `Executor` abstraction (spec §4.5/§6): everything downstream of the
//! SQL Translator talks to IRIS through this trait, never directly. Two
//! implementations exist — [`embedded::EmbeddedExecutor`] (in-process
//! Callin FFI) and [`external::ExternalExecutor`] (pooled network driver) —
//! selected at startup by [`crate::config::BackendKind`].

pub mod embedded;
pub mod external;
#[cfg(feature = "embedded-iris")]
pub mod iris_ffi;

use async_trait::async_trait;

use crate::error::IrisPgError;
use crate::types::BackendValue;

/// Column metadata returned by `prepare`/`execute` (spec §4.5: "result
/// column names, IRIS native types mapped to the Type/OID registry").
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub oid: u32,
}

/// An opaque, backend-owned handle to a prepared statement. Executors hand
/// these out from `prepare` and accept them back in `execute`/`close`; the
/// caller (the Extended Query Engine) never inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementHandle(pub String);

/// Rows produced by one `execute` call, already materialized. IRIS result
/// sets in this crate's usage are bounded by the portal's `max_rows` and by
/// COPY's own batching, so streaming row-by-row across the executor
/// boundary isn't needed (spec §4.5 doesn't ask for it); a `RowStream` is a
/// plain in-memory batch plus a flag saying whether more rows remain.
#[derive(Debug, Clone)]
pub struct RowStream {
    pub fields: Vec<Field>,
    pub rows: Vec<Vec<BackendValue>>,
    pub has_more: bool,
    /// Set for DDL/DML with no result set; `CommandComplete` tag text
    /// (e.g. `"INSERT 0 3"`, `"CREATE TABLE"`) per spec §4.7/§4.8.
    pub command_tag: Option<String>,
}

/// Backend session transaction state, reported after `begin`/`commit`/
/// `rollback` so the session state machine (spec §3) can drive
/// `ReadyForQuery`'s status byte without a separate round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Idle,
    InTransaction,
    Failed,
}

/// Backend abstraction every session talks through (spec §4.5). `prepare`
/// and `execute` are split so the Extended Query Engine can describe a
/// statement's result schema before binding parameters and running it;
/// `execute_script` supports the Simple Query protocol's single round trip
/// for an already-fully-literal statement.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Prepare `sql` (already translated) and return a handle plus its
    /// result schema, without executing it.
    async fn prepare(&self, sql: &str) -> Result<(StatementHandle, Vec<Field>), IrisPgError>;

    /// Bind `params` to a previously prepared statement and run it,
    /// returning at most `max_rows` rows (`0` means unlimited, per the
    /// wire protocol's Execute message convention).
    async fn execute(
        &self,
        stmt: &StatementHandle,
        params: &[BackendValue],
        max_rows: u32,
    ) -> Result<RowStream, IrisPgError>;

    /// Run a complete, already-literal statement in one call (Simple Query
    /// protocol; no separate prepare/bind step).
    async fn execute_script(&self, sql: &str) -> Result<RowStream, IrisPgError>;

    async fn begin(&self) -> Result<TxStatus, IrisPgError>;
    async fn commit(&self) -> Result<TxStatus, IrisPgError>;
    async fn rollback(&self) -> Result<TxStatus, IrisPgError>;

    /// Best-effort cancellation of whatever statement is currently running
    /// on this executor, triggered out-of-band by a `CancelRequest` (spec
    /// §4.1/§5). Returns once the cancellation has been requested, not
    /// once the running statement has actually stopped.
    async fn cancel_running(&self) -> Result<(), IrisPgError>;

    /// Release the statement handle and any server-side resources for it.
    async fn close(&self, stmt: &StatementHandle) -> Result<(), IrisPgError>;
}
