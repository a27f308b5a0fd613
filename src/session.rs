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

//! Per-connection session state (spec §3/§4.1): one [`Session`] owns its
//! transaction status and its pinned executor handle. Nothing here touches
//! the socket — that's the engines' job; a `Session` is the bookkeeping
//! the engines read and mutate as they handle Parse/Bind/Execute/Query
//! messages.
//!
//! The prepared-statement/portal lifecycle spec §3 describes is not kept
//! here: `engine::extended` hands that bookkeeping to `pgwire`'s own
//! `PortalStore`/`StoredStatement<ParsedStatement>` instead (see
//! `engine/extended.rs`'s `IrisQueryParser`), so a second, unused copy of
//! the same maps doesn't belong on `Session`.

use std::sync::Arc;

use crate::executor::{Executor, TxStatus};

/// Session transaction status, mirroring `ReadyForQuery`'s status byte
/// (spec §4.1 step 6: `'I'`/`'T'`/`'E'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InTransaction,
    Failed,
}

impl TransactionStatus {
    pub fn status_byte(self) -> u8 {
        match self {
            TransactionStatus::Idle => b'I',
            TransactionStatus::InTransaction => b'T',
            TransactionStatus::Failed => b'E',
        }
    }
}

impl From<TxStatus> for TransactionStatus {
    fn from(status: TxStatus) -> Self {
        match status {
            TxStatus::Idle => TransactionStatus::Idle,
            TxStatus::InTransaction => TransactionStatus::InTransaction,
            TxStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// Everything a connection accumulates between accept and disconnect
/// (spec §3 "Session"). `pid`/`secret_key` are the `BackendKeyData` pair a
/// later `CancelRequest` must present to reach this session through
/// [`crate::registry::SessionRegistry`].
pub struct Session {
    pub pid: i32,
    pub secret_key: i32,
    pub user: String,
    pub database: String,
    pub executor: Arc<dyn Executor>,
    pub tx_status: TransactionStatus,
}

impl Session {
    pub fn new(pid: i32, secret_key: i32, user: String, database: String, executor: Arc<dyn Executor>) -> Self {
        Session { pid, secret_key, user, database, executor, tx_status: TransactionStatus::Idle }
    }

    pub fn set_tx_status(&mut self, status: TxStatus) {
        self.tx_status = status.into();
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.tx_status, TransactionStatus::Failed)
    }

    pub fn is_in_transaction(&self) -> bool {
        !matches!(self.tx_status, TransactionStatus::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrisPgError;
    use crate::executor::{Field, RowStream, StatementHandle};
    use crate::types::BackendValue;
    use async_trait::async_trait;

    struct NoopExecutor;

    #[async_trait]
    impl Executor for NoopExecutor {
        async fn prepare(&self, _sql: &str) -> Result<(StatementHandle, Vec<Field>), IrisPgError> {
            unimplemented!()
        }
        async fn execute(
            &self,
            _stmt: &StatementHandle,
            _params: &[BackendValue],
            _max_rows: u32,
        ) -> Result<RowStream, IrisPgError> {
            unimplemented!()
        }
        async fn execute_script(&self, _sql: &str) -> Result<RowStream, IrisPgError> {
            unimplemented!()
        }
        async fn begin(&self) -> Result<TxStatus, IrisPgError> {
            unimplemented!()
        }
        async fn commit(&self) -> Result<TxStatus, IrisPgError> {
            unimplemented!()
        }
        async fn rollback(&self) -> Result<TxStatus, IrisPgError> {
            unimplemented!()
        }
        async fn cancel_running(&self) -> Result<(), IrisPgError> {
            unimplemented!()
        }
        async fn close(&self, _stmt: &StatementHandle) -> Result<(), IrisPgError> {
            unimplemented!()
        }
    }

    fn session() -> Session {
        Session::new(1, 42, "irisuser".into(), "USER".into(), Arc::new(NoopExecutor))
    }

    #[test]
    fn ready_for_query_byte_matches_tx_status() {
        let mut s = session();
        assert_eq!(s.tx_status.status_byte(), b'I');
        s.set_tx_status(TxStatus::InTransaction);
        assert_eq!(s.tx_status.status_byte(), b'T');
        s.set_tx_status(TxStatus::Failed);
        assert_eq!(s.tx_status.status_byte(), b'E');
    }

    #[test]
    fn is_in_transaction_is_false_only_when_idle() {
        let mut s = session();
        assert!(!s.is_in_transaction());
        s.set_tx_status(TxStatus::InTransaction);
        assert!(s.is_in_transaction());
        s.set_tx_status(TxStatus::Failed);
        assert!(s.is_in_transaction());
        assert!(s.is_failed());
    }
}
