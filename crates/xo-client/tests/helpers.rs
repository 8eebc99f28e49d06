//! A scripted XO server on a real websocket listener.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HttpRequest, Response as HttpResponse,
};
use tokio_tungstenite::tungstenite::Message;
use xo_proto::{Request, Response, RpcError};

/// Accepted login.
pub const EMAIL: &str = "admin@example.com";
/// Accepted password.
pub const PASSWORD: &str = "secret";
/// Accepted token.
pub const TOKEN: &str = "tok-123";

/// Shared server-side state.
#[derive(Default)]
pub struct ServerState {
    /// Objects per XAPI type, keyed by id.
    pub objects: Mutex<HashMap<String, Value>>,
    /// Accepted websocket connections.
    pub connections: AtomicU32,
    /// Request paths seen during handshakes.
    pub paths: Mutex<Vec<String>>,
    /// Methods received, in order.
    pub calls: Mutex<Vec<String>>,
    /// Drop the connection on the next non sign-in request.
    pub drop_next_call: AtomicBool,
}

impl ServerState {
    /// Insert an object of `xo_type`.
    pub fn put(&self, xo_type: &str, object: Value) {
        let id = object["id"].as_str().unwrap_or_default().to_string();
        let mut objects = self.objects.lock();
        let by_id = objects.entry(xo_type.to_string()).or_insert_with(|| json!({}));
        by_id[id] = object;
    }

    fn set_field(&self, xo_type: &str, id: &str, field: &str, value: Value) {
        if let Some(object) = self
            .objects
            .lock()
            .get_mut(xo_type)
            .and_then(|by_id| by_id.get_mut(id))
        {
            object[field] = value;
        }
    }
}

/// Mock XO server that manages its own lifecycle.
pub struct MockXo {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl MockXo {
    /// Start on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::default());

        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, Arc::clone(&accept_state)));
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL, without the `/api/` suffix.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Methods received so far.
    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().clone()
    }
}

impl Drop for MockXo {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn serve_connection(stream: TcpStream, state: Arc<ServerState>) {
    let path_state = Arc::clone(&state);
    let record_path = move |req: &HttpRequest, resp: HttpResponse| {
        path_state.paths.lock().push(req.uri().path().to_string());
        Ok::<_, ErrorResponse>(resp)
    };
    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, record_path).await else {
        return;
    };
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (mut sink, mut frames) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = frames.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Request = serde_json::from_str(&text).unwrap();
        state.calls.lock().push(request.method.clone());

        if !request.method.starts_with("session.")
            && state.drop_next_call.swap(false, Ordering::SeqCst)
        {
            break;
        }

        let tx = tx.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let response = handle(&state, request).await;
            let _ = tx.send(Message::Text(response.to_json().unwrap()));
        });
    }

    writer.abort();
}

async fn handle(state: &Arc<ServerState>, request: Request) -> Response {
    let params = Value::Object(request.params);
    let user = json!({"id": "u-admin", "email": EMAIL, "permission": "admin"});

    let result = match request.method.as_str() {
        "session.signInWithPassword" => {
            if params["email"] == EMAIL && params["password"] == PASSWORD {
                Ok(user)
            } else {
                Err(RpcError::new(3, "invalid credentials"))
            }
        }
        "session.signInWithToken" => {
            if params["token"] == TOKEN {
                Ok(user)
            } else {
                Err(RpcError::new(3, "invalid credentials"))
            }
        }
        "xo.getAllObjects" => {
            let xo_type = params["filter"]["type"].as_str().unwrap_or_default();
            let objects = state.objects.lock().get(xo_type).cloned();
            Ok(objects.unwrap_or_else(|| json!({})))
        }
        "test.sleep" => {
            let ms = params["ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(params["value"].clone())
        }
        "vm.start" => {
            // Power state flips a little later, as it does on a real pool.
            let id = params["id"].as_str().unwrap_or_default().to_string();
            let state = Arc::clone(state);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                state.set_field("VM", &id, "power_state", json!("Running"));
            });
            Ok(json!(true))
        }
        other => Err(RpcError::new(-32601, format!("method not found: {other}"))),
    };

    match result {
        Ok(value) => Response::success(request.id, value),
        Err(error) => Response::failure(request.id, error),
    }
}
