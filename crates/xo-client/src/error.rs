//! Error types for xo-client.

use std::time::Duration;

use thiserror::Error;
use xo_proto::{ObjectKind, ProtoError, RpcError};

use crate::state::ClientState;

/// Connection-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dialing the websocket failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint that was dialed.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// Building the TLS connector failed.
    #[error("tls setup failed: {0}")]
    Tls(String),

    /// Reading a frame failed.
    #[error("websocket read failed: {0}")]
    Read(String),

    /// Writing a frame failed.
    #[error("websocket write failed: {0}")]
    Write(String),

    /// The connection is closed.
    #[error("connection closed")]
    Closed,
}

/// No object matched a query.
#[derive(Debug, Clone, Error)]
#[error("Could not find {kind} with query: {query}")]
pub struct NotFoundError {
    /// Kind that was searched.
    pub kind: ObjectKind,
    /// Rendered query specification.
    pub query: String,
}

/// Invalid configuration, detected before any RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for `{field}`: {reason}")]
pub struct ConfigError {
    /// Offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl ConfigError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote side answered with a JSON-RPC error object.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Zero objects matched a query.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// More than one object matched where exactly one was required.
    #[error("ambiguous query: {count} {kind} objects match {query}")]
    Ambiguous {
        /// Kind that was searched.
        kind: ObjectKind,
        /// Number of matches.
        count: usize,
        /// Rendered query specification.
        query: String,
    },

    /// A wait did not reach its target state in time.
    #[error("timed out after {waited:?} waiting for state {target}, last observed state: {last_state}")]
    Timeout {
        /// Elapsed time.
        waited: Duration,
        /// Target states, comma-separated.
        target: String,
        /// Last observed state, or `none` if no poll completed.
        last_state: String,
    },

    /// A wait observed a state that is neither pending nor target.
    #[error("unexpected state {state}, wanted one of {target}")]
    UnexpectedState {
        /// Observed state.
        state: String,
        /// Target states, comma-separated.
        target: String,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A result could not be decoded into the requested type.
    #[error("failed to decode result of {method}: {reason}")]
    Decode {
        /// Method whose result failed to decode.
        method: String,
        /// Decoder message.
        reason: String,
    },

    /// Request encoding failed.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// A call was attempted outside the `Ready` state.
    #[error("client is {0}, not ready for calls")]
    NotReady(ClientState),

    /// No response arrived within the per-request timeout.
    #[error("request {method} timed out after {timeout:?}")]
    RequestTimeout {
        /// Method that timed out.
        method: String,
        /// Configured timeout.
        timeout: Duration,
    },
}

impl ClientError {
    /// Whether this is the resolution layer's "nothing matched" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether a retry on a fresh connection may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(
                TransportError::Connect { .. }
                    | TransportError::Closed
                    | TransportError::Read(_)
                    | TransportError::Write(_)
            ) | Self::NotReady(ClientState::Closed)
        )
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
