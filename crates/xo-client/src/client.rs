//! Authenticated Xen Orchestra session.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};
use xo_proto::{ProtoError, User};

use crate::backoff::{retry_with_backoff, BackoffPolicy};
use crate::config::{ClientConfig, Credentials, RetryMode};
use crate::error::{ClientError, ClientResult};
use crate::rpc::RpcClient;
use crate::state::ClientState;

/// A signed-in connection to one XO server.
///
/// All typed operations hang off this handle. In [`RetryMode::Backoff`] a
/// call that fails because the connection dropped is retried on a fresh,
/// re-authenticated connection.
#[derive(Debug)]
pub struct XoClient {
    config: Arc<ClientConfig>,
    rpc: RwLock<Arc<RpcClient>>,
    user: parking_lot::RwLock<User>,
}

impl XoClient {
    /// Connect and sign in.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or rejects the
    /// credentials. No half-open connection is left behind.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let config = Arc::new(config);
        let (rpc, user) = match config.retry_mode {
            RetryMode::None => establish(&config).await?,
            RetryMode::Backoff => {
                let policy = BackoffPolicy::bounded(config.retry_max_time);
                retry_with_backoff(&policy, ClientError::is_transient, |_| establish(&config))
                    .await?
            }
        };

        Ok(Self {
            config,
            rpc: RwLock::new(Arc::new(rpc)),
            user: parking_lot::RwLock::new(user),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(config: ClientConfig, rpc: RpcClient, user: User) -> Self {
        rpc.mark_ready();
        Self {
            config: Arc::new(config),
            rpc: RwLock::new(Arc::new(rpc)),
            user: parking_lot::RwLock::new(user),
        }
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> User {
        self.user.read().clone()
    }

    /// State of the current connection.
    pub async fn state(&self) -> ClientState {
        self.rpc.read().await.state()
    }

    /// Call `method` and decode the result into `T`.
    ///
    /// # Errors
    ///
    /// Propagates the RPC error unchanged. In backoff mode transient
    /// transport failures are retried until the configured bound.
    pub async fn call<T, P>(&self, method: &str, params: P) -> ClientResult<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let params =
            serde_json::to_value(params).map_err(|e| ProtoError::Encoding(e.to_string()))?;

        match self.config.retry_mode {
            RetryMode::None => self.current().await.call(method, params).await,
            RetryMode::Backoff => {
                let policy = BackoffPolicy::bounded(self.config.retry_max_time);
                retry_with_backoff(&policy, ClientError::is_transient, |attempt| {
                    self.attempt(attempt, method, params.clone())
                })
                .await
            }
        }
    }

    /// Call `method` for its side effect, discarding the result.
    pub(crate) async fn invoke<P: Serialize>(&self, method: &str, params: P) -> ClientResult<()> {
        self.call::<Value, _>(method, params).await.map(drop)
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        attempt: u32,
        method: &str,
        params: Value,
    ) -> ClientResult<T> {
        let rpc = self.connected().await?;
        let result = rpc.call(method, params).await;
        if let Err(e) = &result {
            if e.is_transient() {
                debug!(attempt, method, "dropping broken connection");
                rpc.close().await;
            }
        }
        result
    }

    async fn current(&self) -> Arc<RpcClient> {
        Arc::clone(&*self.rpc.read().await)
    }

    /// The current connection, re-dialing and signing in again if it closed.
    async fn connected(&self) -> ClientResult<Arc<RpcClient>> {
        let current = self.current().await;
        if current.state() == ClientState::Ready {
            return Ok(current);
        }

        let mut slot = self.rpc.write().await;
        if slot.state() == ClientState::Ready {
            return Ok(Arc::clone(&*slot));
        }

        info!(endpoint = %self.config.endpoint, "reconnecting");
        let (rpc, user) = establish(&self.config).await?;
        slot.close().await;
        *slot = Arc::new(rpc);
        *self.user.write() = user;
        Ok(Arc::clone(&*slot))
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) {
        self.rpc.read().await.close().await;
    }
}

/// Dial and sign in, closing the connection if sign-in fails.
async fn establish(config: &ClientConfig) -> ClientResult<(RpcClient, User)> {
    let rpc = RpcClient::connect(&config.endpoint, config.insecure, config.request_timeout).await?;

    match sign_in(&rpc, &config.credentials).await {
        Ok(user) => {
            rpc.mark_ready();
            debug!(email = %user.email, id = %user.id, "signed in");
            Ok((rpc, user))
        }
        Err(e) => {
            rpc.close().await;
            Err(e)
        }
    }
}

async fn sign_in(rpc: &RpcClient, credentials: &Credentials) -> ClientResult<User> {
    match credentials {
        Credentials::Password { username, password } => {
            rpc.call_authenticating(
                "session.signInWithPassword",
                json!({ "email": username, "password": password }),
            )
            .await
        }
        Credentials::Token(token) => {
            rpc.call_authenticating("session.signInWithToken", json!({ "token": token }))
                .await
        }
    }
}
