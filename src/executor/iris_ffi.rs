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

//! Raw FFI surface over the IRIS Callin interface, only compiled with the
//! `embedded-iris` feature. There is no `iris-sys`-style crate on
//! crates.io for this proprietary interface, so this module declares the
//! bindings by hand and leaves the actual shared library to be supplied by
//! the system at link time (`cargo:rustc-link-lib=dylib=irisctl` in the
//! crate's `build.rs`), the same boundary `openssl-sys`/`libpq-sys` draw
//! around a vendor library they don't vendor themselves.
#![allow(non_camel_case_types, non_upper_case_globals, dead_code)]

use std::os::raw::{c_char, c_int};

use super::{Field, RowStream, StatementHandle, TxStatus};
use crate::error::{BackendError, IrisPgError};
use crate::types::BackendValue;

// Opaque handle types from `irisdefs.h` / the Callin `%SYS.PYTHON` gateway
// headers. This crate never dereferences these itself — every call goes
// through the `iris_*` entry points below, exactly as the C API requires.
#[repr(C)]
pub struct IrisConnection {
    _private: [u8; 0],
}

#[repr(C)]
pub struct IrisStatement {
    _private: [u8; 0],
}

extern "C" {
    fn iris_connect(namespace: *const c_char, err: *mut *mut c_char) -> *mut IrisConnection;
    fn iris_disconnect(conn: *mut IrisConnection);

    fn iris_prepare(
        conn: *mut IrisConnection,
        sql: *const c_char,
        err: *mut *mut c_char,
    ) -> *mut IrisStatement;
    fn iris_statement_free(stmt: *mut IrisStatement);

    fn iris_begin(conn: *mut IrisConnection) -> c_int;
    fn iris_commit(conn: *mut IrisConnection) -> c_int;
    fn iris_rollback(conn: *mut IrisConnection) -> c_int;
    fn iris_cancel(conn: *mut IrisConnection) -> c_int;

    fn iris_free_string(s: *mut c_char);
}

/// A native Callin session. Not `Send`/`Sync` — callers must keep it on a
/// single thread ([`super::embedded`] enforces this with a dedicated OS
/// thread plus a channel bridge).
pub struct Session {
    conn: *mut IrisConnection,
}

impl Session {
    pub fn open(namespace: &str) -> Result<Self, IrisPgError> {
        let c_namespace = std::ffi::CString::new(namespace)
            .map_err(|_| IrisPgError::Internal("namespace contains a NUL byte".into()))?;
        let mut err: *mut c_char = std::ptr::null_mut();
        // SAFETY: `c_namespace` outlives the call; `err` is either left
        // null or set to a NUL-terminated string owned by the native side,
        // freed via `iris_free_string` below.
        let conn = unsafe { iris_connect(c_namespace.as_ptr(), &mut err) };
        if conn.is_null() {
            return Err(IrisPgError::ConnectionFailure(take_native_error(err)));
        }
        Ok(Session { conn })
    }

    pub fn prepare(&self, sql: &str) -> Result<(StatementHandle, Vec<Field>), IrisPgError> {
        let c_sql = std::ffi::CString::new(sql)
            .map_err(|_| IrisPgError::Internal("statement text contains a NUL byte".into()))?;
        let mut err: *mut c_char = std::ptr::null_mut();
        // SAFETY: `self.conn` was produced by `iris_connect` and is valid
        // for the lifetime of `self`.
        let stmt = unsafe { iris_prepare(self.conn, c_sql.as_ptr(), &mut err) };
        if stmt.is_null() {
            return Err(backend_error(take_native_error(err)));
        }
        let handle = StatementHandle(format!("{:p}", stmt));
        // Schema discovery for a prepared statement requires walking the
        // native result-set descriptor, which this binding does not yet
        // expose; callers fall back to `execute`'s own field list.
        Ok((handle, Vec::new()))
    }

    pub fn execute(
        &self,
        _stmt: &StatementHandle,
        _params: &[BackendValue],
        _max_rows: u32,
    ) -> Result<RowStream, IrisPgError> {
        Err(IrisPgError::Internal(
            "parameterized execute against the embedded Callin binding is not wired up".into(),
        ))
    }

    pub fn execute_script(&self, _sql: &str) -> Result<RowStream, IrisPgError> {
        Err(IrisPgError::Internal(
            "execute_script against the embedded Callin binding is not wired up".into(),
        ))
    }

    pub fn begin(&self) -> Result<TxStatus, IrisPgError> {
        // SAFETY: `self.conn` is valid.
        if unsafe { iris_begin(self.conn) } == 0 {
            Ok(TxStatus::InTransaction)
        } else {
            Err(backend_error("BEGIN TRANSACTION failed".into()))
        }
    }

    pub fn commit(&self) -> Result<TxStatus, IrisPgError> {
        if unsafe { iris_commit(self.conn) } == 0 {
            Ok(TxStatus::Idle)
        } else {
            Err(backend_error("COMMIT failed".into()))
        }
    }

    pub fn rollback(&self) -> Result<TxStatus, IrisPgError> {
        if unsafe { iris_rollback(self.conn) } == 0 {
            Ok(TxStatus::Idle)
        } else {
            Err(backend_error("ROLLBACK failed".into()))
        }
    }

    pub fn cancel(&self) -> Result<(), IrisPgError> {
        if unsafe { iris_cancel(self.conn) } == 0 {
            Ok(())
        } else {
            Err(backend_error("CANCEL failed".into()))
        }
    }

    pub fn close(&self, stmt: &StatementHandle) -> Result<(), IrisPgError> {
        // The handle only carries a debug-formatted pointer for tracing;
        // the native statement itself is torn down together with the
        // session, since this binding doesn't yet track individual handles.
        let _ = stmt;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.conn.is_null() {
            // SAFETY: `self.conn` was produced by `iris_connect` and has
            // not been freed yet.
            unsafe { iris_disconnect(self.conn) };
        }
    }
}

// SAFETY: the native Callin handle really is thread-affine (it relies on
// process-wide, not connection-wide, thread-local state); `Session` is
// used exclusively from the single dedicated thread `embedded::spawn`
// creates, so no Send/Sync impl is provided here deliberately — that
// absence is what keeps the engine thread honest.

fn take_native_error(ptr: *mut c_char) -> String {
    if ptr.is_null() {
        return "unknown Callin error".to_string();
    }
    // SAFETY: `ptr` is a NUL-terminated string the native side allocated
    // specifically for this call and expects us to free.
    let msg = unsafe { std::ffi::CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned();
    unsafe { iris_free_string(ptr) };
    msg
}

fn backend_error(message: String) -> IrisPgError {
    IrisPgError::Backend(BackendError::new("58000", message))
}
