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

//! Builds the `rustls` server config used to upgrade a connection after the
//! `SSLRequest` handshake (spec §4.1 step 1). `pgwire::tokio::process_socket`
//! does the actual `S`/`N` reply and, when given an acceptor, the upgrade
//! itself; this module only turns [`TlsConfig`] into the
//! `tokio_rustls::TlsAcceptor` it expects.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::{ServerConfig as RustlsServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

use crate::config::{TlsConfig, TlsVersion};
use crate::error::IrisPgError;

/// Returns `None` when TLS is disabled, matching the teacher's plaintext-only
/// `process_socket(socket, None, factory)` call exactly.
pub fn build_acceptor(config: &TlsConfig) -> Result<Option<Arc<TlsAcceptor>>, IrisPgError> {
    if !config.enabled {
        return Ok(None);
    }

    let cert_path = config
        .cert_path
        .as_ref()
        .ok_or_else(|| IrisPgError::Internal("tls.enabled requires tls.cert_path".to_string()))?;
    let key_path = config
        .key_path
        .as_ref()
        .ok_or_else(|| IrisPgError::Internal("tls.enabled requires tls.key_path".to_string()))?;

    let cert_chain = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let versions = supported_versions(config.min_version);
    let server_config = RustlsServerConfig::builder_with_protocol_versions(versions)
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|e| IrisPgError::Internal(format!("invalid TLS certificate/key: {e}")))?;

    Ok(Some(Arc::new(TlsAcceptor::from(Arc::new(server_config)))))
}

fn supported_versions(min: TlsVersion) -> &'static [&'static SupportedProtocolVersion] {
    match min {
        TlsVersion::V1_2 => rustls::ALL_VERSIONS,
        TlsVersion::V1_3 => &[&rustls::version::TLS13],
    }
}

fn load_certs(path: &str) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, IrisPgError> {
    let file = File::open(path)
        .map_err(|e| IrisPgError::Internal(format!("reading TLS cert {path}: {e}")))?;
    certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IrisPgError::Internal(format!("parsing TLS cert {path}: {e}")))
}

fn load_key(path: &str) -> Result<rustls::pki_types::PrivateKeyDer<'static>, IrisPgError> {
    let file = File::open(path)
        .map_err(|e| IrisPgError::Internal(format!("reading TLS key {path}: {e}")))?;
    private_key(&mut BufReader::new(file))
        .map_err(|e| IrisPgError::Internal(format!("parsing TLS key {path}: {e}")))?
        .ok_or_else(|| IrisPgError::Internal(format!("no private key found in {path}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_builds_no_acceptor() {
        let config = TlsConfig::default();
        assert!(build_acceptor(&config).unwrap().is_none());
    }

    #[test]
    fn enabled_without_cert_path_is_an_error() {
        let config = TlsConfig { enabled: true, ..TlsConfig::default() };
        assert!(build_acceptor(&config).is_err());
    }
}
