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

//! `iris-pgwire-server` binary.
//!
//! The library core never parses CLI flags or reads a config file itself
//! (spec §1 non-goal); this binary is the one place that does, building a
//! [`Config`] from `clap` arguments the way the teacher's `teide-server`
//! binary builds its own `Args` (`server/main.rs`), then handing it to
//! [`iris_pgwire::server::Server`].
//!
//! Usage:
//!     iris-pgwire-server [OPTIONS]
//!
//! Options:
//!     --host <HOST>             Listen address (default: 0.0.0.0)
//!     --port <PORT>             Listen port (default: 5432)
//!     --backend <embedded|external>
//!     --iris-host <HOST>        External backend SuperServer host
//!     --iris-port <PORT>        External backend SuperServer port
//!     --iris-ns <NAMESPACE>     IRIS namespace
//!     --iris-user <USER>        IRIS user
//!     --iris-password <PASS>    IRIS password
//!     --auth <scram|trust>      Client authentication policy
//!     --user NAME=PASSWORD      Static SCRAM user (repeatable)
//!     --pool-size <N>           Permanent pool connections
//!     --pool-max-overflow <N>   Transient pool connections
//!     --log-format <pretty|json>
//!     --verbose                 Enable debug logging

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use iris_pgwire::config::{
    AuthMethod, BackendConnectionConfig, BackendKind, Config, LogConfig, LogFormat, PoolConfig,
    StaticUser, TlsConfig,
};
use iris_pgwire::server::Server;

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Embedded,
    External,
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthArg {
    Scram,
    Trust,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(
    name = "iris-pgwire-server",
    version,
    about = "PostgreSQL wire protocol front end for InterSystems IRIS"
)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Which Executor backend to run sessions against
    #[arg(long, value_enum, default_value_t = BackendArgDefault::get())]
    backend: BackendArg,

    /// External backend SuperServer host
    #[arg(long, default_value = "127.0.0.1")]
    iris_host: String,

    /// External backend SuperServer port
    #[arg(long, default_value_t = 1972)]
    iris_port: u16,

    /// IRIS namespace (also the engine thread's namespace when --backend embedded)
    #[arg(long = "iris-ns", default_value = "USER")]
    iris_namespace: String,

    /// IRIS user for the external backend driver
    #[arg(long, default_value = "_SYSTEM")]
    iris_user: String,

    /// IRIS password for the external backend driver
    #[arg(long, default_value = "")]
    iris_password: String,

    /// Client authentication policy
    #[arg(long, value_enum, default_value_t = AuthArgDefault::get())]
    auth: AuthArg,

    /// Static SCRAM user, NAME=PASSWORD (repeatable; required unless --auth trust)
    #[arg(long = "user", value_name = "NAME=PASSWORD")]
    users: Vec<String>,

    /// Permanently-held pool connections (external backend only)
    #[arg(long, default_value_t = PoolConfig::default().size)]
    pool_size: usize,

    /// Transient overflow pool connections (external backend only)
    #[arg(long, default_value_t = PoolConfig::default().max_overflow)]
    pool_max_overflow: usize,

    /// Graceful-shutdown drain window, in seconds
    #[arg(long, default_value_t = 30)]
    shutdown_drain_s: u64,

    /// Require TLS; upgrade after SSLRequest instead of replying 'N'
    #[arg(long)]
    tls: bool,

    /// PEM certificate chain (required with --tls)
    #[arg(long)]
    tls_cert: Option<String>,

    /// PEM private key (required with --tls)
    #[arg(long)]
    tls_key: Option<String>,

    /// Structured log output format
    #[arg(long, value_enum, default_value_t = LogFormatArgDefault::get())]
    log_format: LogFormatArg,

    /// Enable debug-level logging
    #[arg(long)]
    verbose: bool,
}

// `clap`'s `default_value_t` needs a `Display`-free const path per variant
// rather than a literal enum value, so these tiny shims just name the
// default instead of deriving `Default` on the arg enums themselves.
struct BackendArgDefault;
impl BackendArgDefault {
    fn get() -> BackendArg {
        BackendArg::External
    }
}
struct AuthArgDefault;
impl AuthArgDefault {
    fn get() -> AuthArg {
        AuthArg::Scram
    }
}
struct LogFormatArgDefault;
impl LogFormatArgDefault {
    fn get() -> LogFormatArg {
        LogFormatArg::Pretty
    }
}

fn parse_static_user(spec: &str) -> Result<StaticUser, String> {
    let (name, password) = spec
        .split_once('=')
        .ok_or_else(|| format!("--user expects NAME=PASSWORD, got: {spec}"))?;
    Ok(StaticUser { name: name.to_string(), password: password.to_string() })
}

fn build_config(args: Args) -> Result<Config, String> {
    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| format!("invalid --host/--port: {e}"))?;

    let users = args
        .users
        .iter()
        .map(|spec| parse_static_user(spec))
        .collect::<Result<Vec<_>, _>>()?;

    let auth_method = match args.auth {
        AuthArg::Scram => AuthMethod::ScramSha256,
        AuthArg::Trust => AuthMethod::Trust,
    };
    if matches!(auth_method, AuthMethod::ScramSha256) && users.is_empty() {
        return Err("--auth scram requires at least one --user NAME=PASSWORD".to_string());
    }

    let mut config = Config {
        listen_addr,
        tls: TlsConfig { enabled: args.tls, cert_path: args.tls_cert, key_path: args.tls_key, ..TlsConfig::default() },
        backend_kind: match args.backend {
            BackendArg::Embedded => BackendKind::Embedded,
            BackendArg::External => BackendKind::External,
        },
        backend: BackendConnectionConfig {
            host: args.iris_host,
            port: args.iris_port,
            namespace: args.iris_namespace,
            user: args.iris_user,
            password: args.iris_password,
        },
        auth_method,
        users,
        shutdown_drain: Duration::from_secs(args.shutdown_drain_s),
        log: LogConfig {
            format: match args.log_format {
                LogFormatArg::Pretty => LogFormat::Pretty,
                LogFormatArg::Json => LogFormat::Json,
            },
            level: if args.verbose { "debug".to_string() } else { "info".to_string() },
        },
        verbose: args.verbose,
        ..Config::default()
    };
    config.pool.size = args.pool_size;
    config.pool.max_overflow = args.pool_max_overflow;
    Ok(config)
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match build_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.log);

    let server = match Server::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to initialize server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
