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

//! Structured event interface (spec §6): every named event is a thin
//! wrapper around a `tracing` call with fixed field names, so the emitted
//! shape doesn't drift depending on who's logging it. Consumers pick text
//! or JSON rendering via [`crate::config::LogConfig`]; this module never
//! formats anything itself.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{info, warn};

pub fn connection_accepted(peer: SocketAddr) {
    info!(target: "iris_pgwire::events", event = "connection.accepted", %peer);
}

pub fn connection_auth_ok(peer: SocketAddr, user: &str) {
    info!(target: "iris_pgwire::events", event = "connection.auth.ok", %peer, user);
}

pub fn connection_auth_fail(peer: SocketAddr, user: &str, reason: &str) {
    warn!(target: "iris_pgwire::events", event = "connection.auth.fail", %peer, user, reason);
}

pub fn connection_closed(peer: SocketAddr) {
    info!(target: "iris_pgwire::events", event = "connection.closed", %peer);
}

pub fn query_executed(sql_len: usize, rows: usize, elapsed: Duration) {
    info!(
        target: "iris_pgwire::events",
        event = "query.executed",
        sql_len,
        rows,
        elapsed_ms = elapsed.as_millis() as u64,
    );
}

pub fn translator_warn(stage: &'static str, reason: &str) {
    warn!(target: "iris_pgwire::events", event = "translator.warn", stage, reason);
}

pub fn translator_over_sla(total: Duration, budget_ms: u64) {
    warn!(
        target: "iris_pgwire::events",
        event = "translator.over_sla",
        elapsed_ms = total.as_millis() as u64,
        budget_ms,
    );
}

pub fn pool_acquire(waited: Duration) {
    info!(
        target: "iris_pgwire::events",
        event = "pool.acquire",
        waited_ms = waited.as_millis() as u64,
    );
}

pub fn pool_health_degraded(reason: &str) {
    warn!(target: "iris_pgwire::events", event = "pool.health.degraded", reason);
}

pub fn copy_rejected(statement: &str) {
    warn!(target: "iris_pgwire::events", event = "copy.rejected", statement);
}

pub fn server_listening(addr: SocketAddr) {
    info!(target: "iris_pgwire::events", event = "server.listening", %addr);
}

pub fn server_shutdown_begin(drain: Duration, active: usize) {
    info!(
        target: "iris_pgwire::events",
        event = "server.shutdown.begin",
        drain_ms = drain.as_millis() as u64,
        active,
    );
}

pub fn server_shutdown_forced(remaining: usize) {
    warn!(target: "iris_pgwire::events", event = "server.shutdown.forced", remaining);
}

pub fn cancel_request_received(peer: SocketAddr) {
    info!(target: "iris_pgwire::events", event = "cancel.received", %peer);
}
