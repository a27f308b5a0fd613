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

//! Crate-wide error type and its mapping onto PostgreSQL SQLSTATEs (spec §7).

use pgwire::error::{ErrorInfo, PgWireError};
use thiserror::Error;

/// Every client-visible failure in this crate carries a fixed SQLSTATE.
/// Variants mirror the table in spec §7; `Backend` wraps whatever the
/// `Executor` reports verbatim (IRIS's own SQLSTATE/message/detail/hint).
#[derive(Debug, Error)]
pub enum IrisPgError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection to backend failed: {0}")]
    ConnectionFailure(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("server is shutting down")]
    AdminShutdown,

    #[error("query canceled")]
    QueryCanceled,

    #[error("password authentication failed")]
    InvalidPassword,

    #[error("insufficient privilege: {0}")]
    InsufficientPrivilege(String),

    #[error("prepared statement \"{0}\" does not exist")]
    PreparedStatementMissing(String),

    #[error("invalid text representation: {0}")]
    InvalidTextRepresentation(String),

    #[error("invalid binary representation: {0}")]
    InvalidBinaryRepresentation(String),

    #[error("malformed COPY data at line {line}: {reason}")]
    BadCopyFileFormat { line: u64, reason: String },

    #[error("COPY is not supported over this wire protocol front end: {0}")]
    CopyNotSupported(String),

    #[error("current transaction is aborted, commands ignored until end of transaction block")]
    InFailedTransaction,

    #[error("pool timed out waiting for a backend handle")]
    ConnectionPoolTimeout,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Structured error surfaced by an [`crate::executor::Executor`] (spec §6).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub sqlstate: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<u32>,
}

impl BackendError {
    pub fn new(sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError {
            sqlstate: sqlstate.into(),
            message: message.into(),
            detail: None,
            hint: None,
            position: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }
}

impl IrisPgError {
    /// The five-character SQLSTATE for this error, per spec §7's table.
    pub fn sqlstate(&self) -> &str {
        match self {
            IrisPgError::Protocol(_) => "08P01",
            IrisPgError::ConnectionFailure(_) => "08006",
            IrisPgError::ServiceUnavailable(_) => "57P03",
            IrisPgError::AdminShutdown => "57P01",
            IrisPgError::QueryCanceled => "57014",
            IrisPgError::InvalidPassword => "28P01",
            IrisPgError::InsufficientPrivilege(_) => "42501",
            IrisPgError::PreparedStatementMissing(_) => "26000",
            IrisPgError::InvalidTextRepresentation(_) => "22P02",
            IrisPgError::InvalidBinaryRepresentation(_) => "22P03",
            IrisPgError::BadCopyFileFormat { .. } => "22P04",
            IrisPgError::CopyNotSupported(_) => "0A000",
            IrisPgError::InFailedTransaction => "25P02",
            IrisPgError::ConnectionPoolTimeout => "57P03",
            IrisPgError::Backend(b) => &b.sqlstate,
            IrisPgError::Internal(_) => "XX000",
        }
    }
}

impl From<IrisPgError> for PgWireError {
    fn from(err: IrisPgError) -> Self {
        // `detail`/`hint`/`position` (spec §7) are folded into the message
        // text: pgwire's `ErrorInfo::new` only takes severity/code/message,
        // so a backend error's extra fields are appended rather than lost.
        let mut message = err.to_string();
        if let IrisPgError::Backend(b) = &err {
            if let Some(detail) = &b.detail {
                message.push_str(&format!(" (detail: {detail})"));
            }
            if let Some(hint) = &b.hint {
                message.push_str(&format!(" (hint: {hint})"));
            }
        }
        let info = ErrorInfo::new("ERROR".to_string(), err.sqlstate().to_string(), message);
        PgWireError::UserError(Box::new(info))
    }
}
