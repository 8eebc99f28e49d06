//! JSON-RPC client multiplexed over one websocket.
//!
//! A single reader task owns the read half and routes each response to the
//! caller waiting on its id. Writes are serialized through an async mutex,
//! so any number of tasks can have calls in flight at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;
use xo_proto::{Request, Response};

use crate::codec::MessageReader;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::state::{AtomicClientState, ClientState};
use crate::transport::{self, FrameReader, FrameWriter};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Low-level JSON-RPC client for one connection.
pub struct RpcClient {
    writer: AsyncMutex<FrameWriter>,
    pending: PendingMap,
    next_id: AtomicU64,
    state: Arc<AtomicClientState>,
    reader: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("state", &self.state.load())
            .field("pending", &self.pending.lock().len())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Dial `url` and start the reader task.
    ///
    /// The client comes up in [`ClientState::Authenticating`].
    ///
    /// # Errors
    ///
    /// Returns an error if the websocket cannot be opened.
    pub async fn connect(
        url: &Url,
        insecure: bool,
        request_timeout: Option<Duration>,
    ) -> ClientResult<Self> {
        let (reader, writer) = transport::dial(url, insecure).await?;
        Ok(Self::start(reader, writer, request_timeout))
    }

    /// Start a client over an already-open connection.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(reader: FrameReader, writer: FrameWriter, request_timeout: Option<Duration>) -> Self {
        let state = Arc::new(AtomicClientState::new(ClientState::Connecting));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let handle = tokio::spawn(read_loop(
            MessageReader::new(reader),
            Arc::clone(&pending),
            Arc::clone(&state),
        ));
        state.advance(ClientState::Authenticating);

        Self {
            writer: AsyncMutex::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            state,
            reader: Mutex::new(Some(handle)),
            request_timeout,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state.load()
    }

    /// Number of calls waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }

    /// Mark the session as signed in.
    pub(crate) fn mark_ready(&self) {
        self.state.advance(ClientState::Ready);
    }

    /// Call `method` and decode its result into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotReady`] outside the `Ready` state, the
    /// remote [`RpcError`](xo_proto::RpcError) if the call failed,
    /// [`ClientError::Decode`] if the result does not fit `T`, or a
    /// transport error if the connection fails first.
    pub async fn call<T, P>(&self, method: &str, params: P) -> ClientResult<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        match self.state.load() {
            ClientState::Ready => self.round_trip(method, params).await,
            other => Err(ClientError::NotReady(other)),
        }
    }

    /// Like [`call`](Self::call), but also allowed while signing in.
    pub(crate) async fn call_authenticating<T, P>(&self, method: &str, params: P) -> ClientResult<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        match self.state.load() {
            ClientState::Authenticating | ClientState::Ready => {
                self.round_trip(method, params).await
            }
            other => Err(ClientError::NotReady(other)),
        }
    }

    async fn round_trip<T, P>(&self, method: &str, params: P) -> ClientResult<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = Request::new(id, method, params)?.to_json()?;

        let (tx, rx) = oneshot::channel();
        let _guard = PendingGuard::register(&self.pending, id, tx);

        // The reader closes the state before draining, so a call registered
        // after the drain sees `Closed` here.
        if self.state.load() == ClientState::Closed {
            return Err(ClientError::NotReady(ClientState::Closed));
        }

        trace!(id, method, "sending request");
        self.writer.lock().await.write(payload.into_bytes()).await?;

        let response = match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, rx).await.map_err(|_| {
                ClientError::RequestTimeout {
                    method: method.to_string(),
                    timeout,
                }
            })?,
            None => rx.await,
        }
        .map_err(|_| TransportError::Closed)?;

        trace!(id, method, "response received");
        let value = response.into_result()?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    /// Close the connection and fail every pending call. Idempotent.
    pub async fn close(&self) {
        if self.state.close() {
            debug!("closing rpc client");
        }
        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }
        self.pending.lock().clear();
        self.writer.lock().await.close().await;
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.abort();
        }
    }
}

/// Removes a pending entry when the call finishes or is cancelled.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl<'a> PendingGuard<'a> {
    fn register(pending: &'a PendingMap, id: u64, tx: oneshot::Sender<Response>) -> Self {
        pending.lock().insert(id, tx);
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

async fn read_loop(mut reader: MessageReader, pending: PendingMap, state: Arc<AtomicClientState>) {
    loop {
        match reader.next_message().await {
            Ok(Some(value)) => dispatch(value, &pending),
            Ok(None) => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "rpc reader failed");
                break;
            }
        }
    }

    state.close();
    // Dropping the senders wakes every waiter with a closed-connection error.
    let orphaned = std::mem::take(&mut *pending.lock());
    if !orphaned.is_empty() {
        debug!(count = orphaned.len(), "failing pending calls");
    }
}

fn dispatch(value: Value, pending: &PendingMap) {
    let response: Response = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "ignoring malformed rpc frame");
            return;
        }
    };

    let Some(id) = response.id else {
        trace!("ignoring message without id");
        return;
    };

    let waiter = pending.lock().remove(&id);
    match waiter {
        Some(tx) => {
            if tx.send(response).is_err() {
                debug!(id, "caller gone, discarding response");
            }
        }
        None => debug!(id, "no caller waiting, discarding response"),
    }
}
