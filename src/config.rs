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

//! Process-wide, immutable-after-start configuration (spec §3, §6, §9).
//!
//! The core never loads a config file or parses CLI flags itself (spec §1
//! non-goal: "process supervision, packaging, installer scripts, CLI flag
//! parsing... the core takes a fully-populated configuration value"). The
//! `iris-pgwire-server` binary is the one consumer that builds a `Config`
//! from `clap` arguments; embedders construct one directly or via `serde`.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which `Executor` implementation backs every session (spec §4.5/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process call into the IRIS Callin interface.
    Embedded,
    /// Pooled external connections to an IRIS SuperServer.
    External,
}

/// Authentication policy selector (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ScramSha256,
    /// Development only; must be opted into explicitly.
    Trust,
}

/// Floating-point width used to store VECTOR elements (spec §9 Open
/// Question — resolved here with `F32` as the default, see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorPrecision {
    F32,
    F64,
}

/// TLS certificate-validation policy (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertValidationMode {
    Off,
    SelfSignedAllowed,
    CaRequired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub min_version: TlsVersion,
    pub cert_validation: CertValidationMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    V1_2,
    #[serde(rename = "1.3")]
    V1_3,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig {
            enabled: false,
            cert_path: None,
            key_path: None,
            min_version: TlsVersion::V1_2,
            cert_validation: CertValidationMode::Off,
        }
    }
}

/// Connection parameters for the external backend driver (spec §6,
/// `backend.host/port/ns/user/password`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConnectionConfig {
    pub host: String,
    pub port: u16,
    pub namespace: String,
    pub user: String,
    pub password: String,
}

impl Default for BackendConnectionConfig {
    fn default() -> Self {
        BackendConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1972,
            namespace: "USER".to_string(),
            user: "_SYSTEM".to_string(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub size: usize,
    pub max_overflow: usize,
    pub timeout: Duration,
    pub recycle: Duration,
    pub health_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            size: 50,
            max_overflow: 20,
            timeout: Duration::from_secs(30),
            recycle: Duration::from_secs(3600),
            health_interval: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Absolute ceiling of `size + max_overflow` (spec §4.6).
    pub const MAX_TOTAL: usize = 200;

    pub fn capacity(&self) -> usize {
        (self.size + self.max_overflow).min(Self::MAX_TOTAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// A single statically-configured user/verifier entry (spec §4.1 password
/// verifier, default policy: static user table with per-user SCRAM verifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticUser {
    pub name: String,
    /// Cleartext password used to derive the SCRAM stored verifier at
    /// startup. Never logged, never echoed back on the wire.
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub tls: TlsConfig,
    pub backend_kind: BackendKind,
    pub backend: BackendConnectionConfig,
    pub pool: PoolConfig,
    pub auth_method: AuthMethod,
    pub users: Vec<StaticUser>,
    pub translator_sla_ms: u64,
    pub message_max_bytes: usize,
    pub shutdown_drain: Duration,
    pub vector_precision: VectorPrecision,
    pub log: LogConfig,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:5432".parse().expect("valid default listen addr"),
            tls: TlsConfig::default(),
            backend_kind: BackendKind::External,
            backend: BackendConnectionConfig::default(),
            pool: PoolConfig::default(),
            auth_method: AuthMethod::ScramSha256,
            users: Vec::new(),
            translator_sla_ms: 5,
            message_max_bytes: 256 * 1024 * 1024,
            shutdown_drain: Duration::from_secs(30),
            vector_precision: VectorPrecision::F32,
            log: LogConfig::default(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_capacity_is_capped_at_200() {
        let mut pool = PoolConfig::default();
        pool.size = 500;
        pool.max_overflow = 500;
        assert_eq!(pool.capacity(), PoolConfig::MAX_TOTAL);
    }

    #[test]
    fn default_auth_is_scram_not_trust() {
        assert_eq!(Config::default().auth_method, AuthMethod::ScramSha256);
    }
}
