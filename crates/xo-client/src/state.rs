//! RPC client lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of one RPC connection.
///
/// `Connecting → Authenticating → Ready → Closed`. There is no way back
/// from `Closed`; a new connection is a new client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Dialing the websocket.
    Connecting,
    /// Connected, session sign-in in flight.
    Authenticating,
    /// Signed in; calls are accepted.
    Ready,
    /// Connection gone.
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Atomic wrapper for [`ClientState`].
#[derive(Debug)]
pub struct AtomicClientState(AtomicU8);

impl AtomicClientState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: ClientState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> ClientState {
        Self::decode(self.0.load(Ordering::SeqCst))
    }

    /// Move to `next` unless already closed.
    ///
    /// Returns the state that was replaced.
    pub fn advance(&self, next: ClientState) -> ClientState {
        let result = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            (current != ClientState::Closed as u8).then_some(next as u8)
        });
        Self::decode(result.unwrap_or_else(|closed| closed))
    }

    /// Move to `Closed`. Returns `true` if this call did the transition.
    pub fn close(&self) -> bool {
        self.0.swap(ClientState::Closed as u8, Ordering::SeqCst) != ClientState::Closed as u8
    }

    const fn decode(raw: u8) -> ClientState {
        match raw {
            0 => ClientState::Connecting,
            1 => ClientState::Authenticating,
            2 => ClientState::Ready,
            _ => ClientState::Closed,
        }
    }
}
