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

//! Registry of live sessions keyed by `(process_id, secret_key)`, the pair
//! PostgreSQL's `CancelRequest` message carries (spec §4.1/§5): a cancel
//! arrives on a brand-new, unauthenticated connection and must be matched
//! to the right running session without ever touching its socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::executor::Executor;

/// What a cancellation needs: a way to ask the session's executor to stop
/// whatever it's running. The registry never holds the session's socket,
/// translator state, or prepared statements — only this.
#[derive(Clone)]
pub struct CancelHandle {
    executor: Arc<dyn Executor>,
}

impl CancelHandle {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        CancelHandle { executor }
    }

    pub async fn cancel(&self) -> Result<(), crate::error::IrisPgError> {
        self.executor.cancel_running().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub pid: i32,
    pub secret: i32,
}

#[derive(Default)]
pub struct SessionRegistry {
    next_pid: AtomicI32,
    sessions: Mutex<HashMap<SessionKey, CancelHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            next_pid: AtomicI32::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a new backend PID for a freshly accepted connection.
    /// PIDs are process-unique for the server's lifetime, not reused.
    pub fn allocate_pid(&self) -> i32 {
        self.next_pid.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn register(&self, key: SessionKey, handle: CancelHandle) {
        self.sessions.lock().await.insert(key, handle);
    }

    pub async fn unregister(&self, key: SessionKey) {
        self.sessions.lock().await.remove(&key);
    }

    /// Look up and cancel the session matching `key`. Returns `true` if a
    /// session was found — a miss (stale PID/secret, already closed
    /// connection) is not an error; the client never learns the outcome
    /// anyway (`CancelRequest` gets no reply, spec §5).
    pub async fn cancel(&self, key: SessionKey) -> bool {
        let handle = self.sessions.lock().await.get(&key).cloned();
        match handle {
            Some(h) => {
                let _ = h.cancel().await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrisPgError;
    use crate::executor::{Field, RowStream, StatementHandle, TxStatus};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use crate::types::BackendValue;

    struct FakeExecutor {
        canceled: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Executor for FakeExecutor {
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
            self.canceled.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&self, _stmt: &StatementHandle) -> Result<(), IrisPgError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn cancel_reaches_the_matching_session_only() {
        let registry = SessionRegistry::new();
        let flag_a = Arc::new(AtomicBool::new(false));
        let flag_b = Arc::new(AtomicBool::new(false));
        let key_a = SessionKey { pid: 1, secret: 111 };
        let key_b = SessionKey { pid: 2, secret: 222 };

        registry
            .register(key_a, CancelHandle::new(Arc::new(FakeExecutor { canceled: flag_a.clone() })))
            .await;
        registry
            .register(key_b, CancelHandle::new(Arc::new(FakeExecutor { canceled: flag_b.clone() })))
            .await;

        assert!(registry.cancel(key_a).await);
        assert!(flag_a.load(Ordering::SeqCst));
        assert!(!flag_b.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancel_with_unknown_key_is_a_harmless_miss() {
        let registry = SessionRegistry::new();
        assert!(!registry.cancel(SessionKey { pid: 99, secret: 1 }).await);
    }

    #[test]
    fn allocated_pids_are_unique_and_increasing() {
        let registry = SessionRegistry::new();
        let a = registry.allocate_pid();
        let b = registry.allocate_pid();
        assert!(b > a);
    }
}
