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

//! `iris-pgwire`: a PostgreSQL wire-protocol front end for InterSystems
//! IRIS. A client speaking libpq/JDBC/Npgsql/etc. connects as if to a real
//! PostgreSQL server; every statement is rewritten by the [`translator`]
//! pipeline and handed to an [`executor::Executor`] that actually runs it
//! against IRIS, either in-process ([`executor::embedded`]) or over the
//! network ([`executor::external`]).
//!
//! [`server`] wires everything together behind `pgwire`'s handler traits;
//! [`config::Config`] is the one thing a caller has to supply.

pub mod auth;
pub mod codec;
pub mod config;
pub mod copy;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod pool;
pub mod registry;
pub mod server;
pub mod session;
pub mod tls;
pub mod translator;
pub mod types;
