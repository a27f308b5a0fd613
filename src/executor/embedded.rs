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

//! In-process Callin executor (spec §4.5 "Embedded"): the native IRIS
//! session handle is `!Send` (it carries thread-local arena state), so it
//! lives on a dedicated OS thread and every call crosses an
//! `mpsc`/`oneshot` bridge — the same shape the teacher uses to keep a
//! `!Send` engine handle off the async executor's worker threads.

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{Executor, Field, RowStream, StatementHandle, TxStatus};
use crate::error::IrisPgError;
use crate::types::BackendValue;

/// One unit of work sent across the bridge to the engine thread.
enum EngineRequest {
    Prepare {
        sql: String,
        reply: oneshot::Sender<Result<(StatementHandle, Vec<Field>), IrisPgError>>,
    },
    Execute {
        stmt: StatementHandle,
        params: Vec<BackendValue>,
        max_rows: u32,
        reply: oneshot::Sender<Result<RowStream, IrisPgError>>,
    },
    ExecuteScript {
        sql: String,
        reply: oneshot::Sender<Result<RowStream, IrisPgError>>,
    },
    Begin(oneshot::Sender<Result<TxStatus, IrisPgError>>),
    Commit(oneshot::Sender<Result<TxStatus, IrisPgError>>),
    Rollback(oneshot::Sender<Result<TxStatus, IrisPgError>>),
    Cancel(oneshot::Sender<Result<(), IrisPgError>>),
    Close {
        stmt: StatementHandle,
        reply: oneshot::Sender<Result<(), IrisPgError>>,
    },
}

/// Send-safe handle to a native IRIS session running on its own thread.
/// Cloneable: every clone shares the same engine thread and the same IRIS
/// process-level session underneath it.
#[derive(Clone)]
pub struct EmbeddedExecutor {
    tx: std::sync::mpsc::Sender<EngineRequest>,
}

impl EmbeddedExecutor {
    /// Spawn the dedicated engine thread and open a native Callin session
    /// against `namespace`. Returns once the session is ready.
    pub fn spawn(namespace: &str) -> Result<Self, IrisPgError> {
        let (tx, rx) = std::sync::mpsc::channel::<EngineRequest>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), IrisPgError>>();
        let namespace = namespace.to_string();

        std::thread::Builder::new()
            .name("iris-embedded-engine".to_string())
            .spawn(move || run_engine_thread(namespace, rx, ready_tx))
            .map_err(|e| IrisPgError::Internal(format!("failed to spawn engine thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| IrisPgError::Internal("engine thread exited before signaling ready".into()))??;

        Ok(EmbeddedExecutor { tx })
    }
}

async fn roundtrip<T>(
    tx: &std::sync::mpsc::Sender<EngineRequest>,
    make: impl FnOnce(oneshot::Sender<Result<T, IrisPgError>>) -> EngineRequest,
) -> Result<T, IrisPgError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(make(reply_tx))
        .map_err(|_| IrisPgError::ConnectionFailure("embedded engine thread stopped".into()))?;
    reply_rx
        .await
        .map_err(|_| IrisPgError::ConnectionFailure("embedded engine thread dropped reply".into()))?
}

#[async_trait]
impl Executor for EmbeddedExecutor {
    async fn prepare(&self, sql: &str) -> Result<(StatementHandle, Vec<Field>), IrisPgError> {
        let sql = sql.to_string();
        roundtrip(&self.tx, move |reply| EngineRequest::Prepare { sql, reply }).await
    }

    async fn execute(
        &self,
        stmt: &StatementHandle,
        params: &[BackendValue],
        max_rows: u32,
    ) -> Result<RowStream, IrisPgError> {
        let stmt = stmt.clone();
        let params = params.to_vec();
        roundtrip(&self.tx, move |reply| EngineRequest::Execute {
            stmt,
            params,
            max_rows,
            reply,
        })
        .await
    }

    async fn execute_script(&self, sql: &str) -> Result<RowStream, IrisPgError> {
        let sql = sql.to_string();
        roundtrip(&self.tx, move |reply| EngineRequest::ExecuteScript { sql, reply }).await
    }

    async fn begin(&self) -> Result<TxStatus, IrisPgError> {
        roundtrip(&self.tx, EngineRequest::Begin).await
    }

    async fn commit(&self) -> Result<TxStatus, IrisPgError> {
        roundtrip(&self.tx, EngineRequest::Commit).await
    }

    async fn rollback(&self) -> Result<TxStatus, IrisPgError> {
        roundtrip(&self.tx, EngineRequest::Rollback).await
    }

    async fn cancel_running(&self) -> Result<(), IrisPgError> {
        roundtrip(&self.tx, EngineRequest::Cancel).await
    }

    async fn close(&self, stmt: &StatementHandle) -> Result<(), IrisPgError> {
        let stmt = stmt.clone();
        roundtrip(&self.tx, move |reply| EngineRequest::Close { stmt, reply }).await
    }
}

fn run_engine_thread(
    namespace: String,
    rx: std::sync::mpsc::Receiver<EngineRequest>,
    ready_tx: std::sync::mpsc::Sender<Result<(), IrisPgError>>,
) {
    #[cfg(feature = "embedded-iris")]
    let session = match super::iris_ffi::Session::open(&namespace) {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    #[cfg(not(feature = "embedded-iris"))]
    {
        let _ = &namespace;
        let _ = ready_tx.send(Err(IrisPgError::Internal(
            "embedded backend selected but the crate was built without the `embedded-iris` feature"
                .into(),
        )));
        return;
    }

    #[cfg(feature = "embedded-iris")]
    {
        let _ = ready_tx.send(Ok(()));
        while let Ok(req) = rx.recv() {
            match req {
                EngineRequest::Prepare { sql, reply } => {
                    let _ = reply.send(session.prepare(&sql));
                }
                EngineRequest::Execute { stmt, params, max_rows, reply } => {
                    let _ = reply.send(session.execute(&stmt, &params, max_rows));
                }
                EngineRequest::ExecuteScript { sql, reply } => {
                    let _ = reply.send(session.execute_script(&sql));
                }
                EngineRequest::Begin(reply) => {
                    let _ = reply.send(session.begin());
                }
                EngineRequest::Commit(reply) => {
                    let _ = reply.send(session.commit());
                }
                EngineRequest::Rollback(reply) => {
                    let _ = reply.send(session.rollback());
                }
                EngineRequest::Cancel(reply) => {
                    let _ = reply.send(session.cancel());
                }
                EngineRequest::Close { stmt, reply } => {
                    let _ = reply.send(session.close(&stmt));
                }
            }
        }
    }
}

#[cfg(all(test, not(feature = "embedded-iris")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_without_the_embedded_iris_feature_fails_clearly() {
        let err = EmbeddedExecutor::spawn("USER").unwrap_err();
        assert!(err.to_string().contains("embedded-iris"));
    }
}
