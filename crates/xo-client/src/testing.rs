//! In-memory XO server for unit tests.

use std::sync::Arc;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use xo_proto::{Request, Response, RpcError, User};

use crate::client::XoClient;
use crate::config::ClientConfig;
use crate::rpc::RpcClient;
use crate::transport::{FrameReader, FrameWriter};

/// Requests seen by the mock, in arrival order.
pub(crate) struct MockXo {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockXo {
    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }
}

/// A signed-in client whose server answers every request with `handler`.
pub(crate) fn mock_client<H>(handler: H) -> (XoClient, MockXo)
where
    H: Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync + 'static,
{
    let (to_server, mut inbound) = mpsc::unbounded::<Message>();
    let (outbound, from_server) = mpsc::unbounded::<Result<Message, WsError>>();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    tokio::spawn(async move {
        while let Some(message) = inbound.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let request: Request = serde_json::from_str(&text).expect("request json");
            let params = Value::Object(request.params);
            recorded.lock().push((request.method.clone(), params.clone()));

            let response = match handler(&request.method, &params) {
                Ok(result) => Response::success(request.id, result),
                Err(error) => Response::failure(request.id, error),
            };
            let frame = Message::Text(response.to_json().expect("response json"));
            if outbound.unbounded_send(Ok(frame)).is_err() {
                break;
            }
        }
    });

    let writer = FrameWriter::new(to_server.sink_map_err(|e| {
        WsError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
    }));
    let rpc = RpcClient::start(FrameReader::new(from_server), writer, None);
    let config =
        ClientConfig::with_password("ws://xo.test", "admin@example.com", "secret").expect("config");
    let user = User {
        id: "u-admin".to_string(),
        email: "admin@example.com".to_string(),
        permission: "admin".to_string(),
        groups: Vec::new(),
    };

    (XoClient::from_parts(config, rpc, user), MockXo { calls })
}
