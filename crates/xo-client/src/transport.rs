//! Byte-stream view of a websocket connection.
//!
//! The server sends one JSON-RPC message per text frame. [`FrameReader`]
//! hides the frame boundaries and yields bytes until the connection itself
//! ends; [`FrameWriter`] sends each outbound message as a single frame.

use std::pin::Pin;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::Connector;
use tracing::{debug, trace};
use url::Url;

use crate::error::TransportError;

type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;
type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Read half of a framed connection.
pub struct FrameReader {
    frames: FrameStream,
    current: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl std::fmt::Debug for FrameReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("buffered", &(self.current.len() - self.pos))
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl FrameReader {
    /// Wrap a stream of websocket messages.
    pub fn new<S>(frames: S) -> Self
    where
        S: Stream<Item = Result<Message, WsError>> + Send + 'static,
    {
        Self {
            frames: Box::pin(frames),
            current: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    /// Fill `buf` from the current frame, waiting for the next frame when the
    /// current one is exhausted.
    ///
    /// Returns `Ok(0)` only once the connection has closed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] if the underlying stream fails.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let remaining = &self.current[self.pos..];
            if !remaining.is_empty() {
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                self.pos += n;
                return Ok(n);
            }

            if self.eof {
                return Ok(0);
            }

            match self.frames.next().await {
                Some(Ok(Message::Text(text))) => self.load(text.into_bytes()),
                Some(Ok(Message::Binary(bytes))) => self.load(bytes),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "peer closed websocket");
                    self.eof = true;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    self.eof = true;
                }
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
            }
        }
    }

    fn load(&mut self, bytes: Vec<u8>) {
        trace!(len = bytes.len(), "frame received");
        self.current = bytes;
        self.pos = 0;
    }
}

/// Write half of a framed connection.
pub struct FrameWriter {
    sink: FrameSink,
    closed: bool,
}

impl std::fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl FrameWriter {
    /// Wrap a sink of websocket messages.
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Message, Error = WsError> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            closed: false,
        }
    }

    /// Send one complete message as a single frame.
    ///
    /// UTF-8 payloads go out as text frames, anything else as binary.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after [`close`](Self::close), or
    /// [`TransportError::Write`] if the frame cannot be sent.
    pub async fn write(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let message = match String::from_utf8(bytes) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        };

        self.sink.send(message).await.map_err(|e| match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            other => TransportError::Write(other.to_string()),
        })
    }

    /// Close the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "error while closing websocket");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Open a websocket to `url` and split it into framed halves.
///
/// With `insecure` set, TLS certificate and hostname verification are off.
///
/// # Errors
///
/// Returns an error if the TLS connector cannot be built or the handshake fails.
pub async fn dial(url: &Url, insecure: bool) -> Result<(FrameReader, FrameWriter), TransportError> {
    let connector = if insecure {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Some(Connector::NativeTls(tls))
    } else {
        None
    };

    debug!(url = %url, insecure, "dialing websocket");
    let (ws, _response) =
        tokio_tungstenite::connect_async_tls_with_config(url.as_str(), None, false, connector)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

    let (sink, stream) = ws.split();
    Ok((FrameReader::new(stream), FrameWriter::new(sink)))
}
