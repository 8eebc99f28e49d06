//! Incremental JSON decoding over the framed byte stream.

use serde_json::Value;
use tracing::warn;

use crate::error::TransportError;
use crate::transport::FrameReader;

const READ_CHUNK: usize = 16 * 1024;

/// Errors from pulling the next message off the stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The framer failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The byte stream is not valid JSON.
    #[error("malformed json on stream: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Accumulating buffer that yields complete JSON values.
///
/// A value split across pushes is held until complete; several values in
/// one push are yielded one by one. Each byte is scanned once for the end
/// of the current top-level value, and the parser only runs on a complete
/// value, so decoding stays linear in the message size however it is
/// chunked.
#[derive(Debug, Default)]
pub struct JsonStream {
    buf: Vec<u8>,
    scan: Scan,
}

/// Position of the boundary scan within the current value.
#[derive(Debug, Default, Clone, Copy)]
struct Scan {
    offset: usize,
    depth: usize,
    lex: Lex,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Lex {
    /// No value started yet; only whitespace seen.
    #[default]
    Idle,
    /// Inside a container, outside any string.
    Value,
    /// Inside a string literal.
    Str,
    /// Right after a backslash in a string.
    Escape,
    /// Inside a bare top-level scalar.
    Scalar,
}

impl JsonStream {
    /// Create an empty stream buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes held that do not yet form a complete value.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Take the next complete value, or `None` if more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the buffered bytes can never form
    /// valid JSON.
    pub fn next_value(&mut self) -> Result<Option<Value>, serde_json::Error> {
        let Some(end) = self.find_end() else {
            if self.scan.lex == Lex::Idle {
                // Only whitespace so far.
                self.buf.clear();
                self.scan = Scan::default();
            }
            return Ok(None);
        };

        let value = serde_json::from_slice(&self.buf[..end]);
        self.buf.drain(..end);
        self.scan = Scan::default();
        value.map(Some)
    }

    /// Advance the scan; returns the end offset of a complete top-level value.
    fn find_end(&mut self) -> Option<usize> {
        let scan = &mut self.scan;
        while scan.offset < self.buf.len() {
            let pos = scan.offset;
            let byte = self.buf[pos];
            scan.offset += 1;

            match scan.lex {
                Lex::Escape => scan.lex = Lex::Str,
                Lex::Str => match byte {
                    b'\\' => scan.lex = Lex::Escape,
                    b'"' => {
                        scan.lex = Lex::Value;
                        if scan.depth == 0 {
                            return Some(scan.offset);
                        }
                    }
                    _ => {}
                },
                Lex::Scalar => {
                    if byte.is_ascii_whitespace()
                        || matches!(byte, b'{' | b'[' | b'"' | b'}' | b']' | b',')
                    {
                        return Some(pos);
                    }
                }
                Lex::Idle | Lex::Value => match byte {
                    b'"' => scan.lex = Lex::Str,
                    b'{' | b'[' => {
                        scan.lex = Lex::Value;
                        scan.depth += 1;
                    }
                    b'}' | b']' => {
                        // A stray closer at depth 0 is handed to the parser to reject.
                        if scan.depth <= 1 {
                            return Some(scan.offset);
                        }
                        scan.depth -= 1;
                    }
                    b if b.is_ascii_whitespace() => {}
                    _ if scan.depth == 0 => scan.lex = Lex::Scalar,
                    _ => {}
                },
            }
        }
        None
    }
}

/// Pulls whole JSON messages from a [`FrameReader`].
#[derive(Debug)]
pub struct MessageReader {
    frames: FrameReader,
    stream: JsonStream,
    chunk: Vec<u8>,
}

impl MessageReader {
    /// Wrap the read half of a connection.
    #[must_use]
    pub fn new(frames: FrameReader) -> Self {
        Self {
            frames,
            stream: JsonStream::new(),
            chunk: vec![0; READ_CHUNK],
        }
    }

    /// Next message, or `None` once the connection has closed.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] on transport failure or malformed input.
    pub async fn next_message(&mut self) -> Result<Option<Value>, StreamError> {
        loop {
            if let Some(value) = self.stream.next_value()? {
                return Ok(Some(value));
            }

            let n = self.frames.read(&mut self.chunk).await?;
            if n == 0 {
                if self.stream.pending() > 0 {
                    warn!(
                        bytes = self.stream.pending(),
                        "connection closed mid-message, dropping partial data"
                    );
                }
                return Ok(None);
            }
            self.stream.push(&self.chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_decoded_messages(
            ids in proptest::collection::vec(any::<u64>(), 1..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let wire: Vec<u8> = ids
                .iter()
                .map(|id| json!({"jsonrpc": "2.0", "result": {"name": "n\u{e9}t"}, "id": id}).to_string())
                .collect::<Vec<_>>()
                .join("\n")
                .into_bytes();

            let mut offsets: Vec<usize> = cuts.iter().map(|c| c.index(wire.len())).collect();
            offsets.push(wire.len());
            offsets.sort_unstable();

            let mut stream = JsonStream::new();
            let mut decoded = Vec::new();
            let mut start = 0;
            for end in offsets {
                stream.push(&wire[start..end]);
                start = end;
                while let Some(value) = stream.next_value().expect("decode") {
                    decoded.push(value["id"].as_u64().expect("id"));
                }
            }

            prop_assert_eq!(decoded, ids);
            prop_assert_eq!(stream.pending(), 0);
        }
    }

    #[test]
    fn test_value_split_across_pushes() {
        let mut stream = JsonStream::new();
        stream.push(br#"{"id":1,"res"#);
        assert!(stream.next_value().expect("partial").is_none());

        stream.push(br#"ult":true}"#);
        assert_eq!(
            stream.next_value().expect("complete"),
            Some(json!({"id": 1, "result": true}))
        );
        assert!(stream.next_value().expect("drained").is_none());
    }

    #[test]
    fn test_several_values_in_one_push() {
        let mut stream = JsonStream::new();
        stream.push(b"{\"id\":1} {\"id\":2}\n{\"id\":3}");

        let ids: Vec<_> = std::iter::from_fn(|| stream.next_value().expect("decode"))
            .map(|v| v["id"].as_u64())
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_garbage_is_fatal() {
        let mut stream = JsonStream::new();
        stream.push(b"{\"id\":1}}");
        assert!(stream.next_value().expect("first").is_some());
        assert!(stream.next_value().is_err());
    }

    #[test]
    fn test_whitespace_only_is_not_a_value() {
        let mut stream = JsonStream::new();
        stream.push(b"  \n ");
        assert!(stream.next_value().expect("whitespace").is_none());
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_delimiters_inside_strings_do_not_end_a_value() {
        let mut stream = JsonStream::new();
        stream.push(br#"{"a":"}\"{]"} "tail\\" 42 "#);
        assert_eq!(stream.next_value().expect("object"), Some(json!({"a": "}\"{]"})));
        assert_eq!(stream.next_value().expect("string"), Some(json!("tail\\")));
        assert_eq!(stream.next_value().expect("number"), Some(json!(42)));
        assert!(stream.next_value().expect("drained").is_none());
    }

    #[tokio::test]
    async fn test_large_single_frame_decodes_in_linear_time() {
        let objects: serde_json::Map<String, Value> = (0..30_000)
            .map(|i| {
                let id = format!("vm-{i}");
                let object = json!({
                    "id": id,
                    "type": "VM",
                    "name_label": format!("guest {{{i}}}"),
                    "power_state": "Running",
                    "tags": ["web", "prod"],
                    "$poolId": "pool-a",
                });
                (id, object)
            })
            .collect();
        let frame = json!({"jsonrpc": "2.0", "result": objects, "id": 1}).to_string();
        assert!(frame.len() > 3 * 1024 * 1024);

        let mut reader = MessageReader::new(FrameReader::new(futures::stream::iter([Ok(
            Message::Text(frame),
        )])));

        let started = std::time::Instant::now();
        let message = reader.next_message().await.expect("decode").expect("some");
        let elapsed = started.elapsed();

        assert_eq!(message["result"].as_object().map(serde_json::Map::len), Some(30_000));
        assert!(elapsed < std::time::Duration::from_secs(3), "took {elapsed:?}");
        assert!(reader.next_message().await.expect("eof").is_none());
    }

    #[tokio::test]
    async fn test_message_reader_reassembles_frames() {
        let frames = vec![
            Message::Text(r#"{"jsonrpc":"2.0","#.to_string()),
            Message::Text(r#""result":1,"id":7}{"jsonrpc":"2.0","result":2,"id":8}"#.to_string()),
        ];
        let mut reader =
            MessageReader::new(FrameReader::new(futures::stream::iter(frames.into_iter().map(Ok))));

        let first = reader.next_message().await.expect("first").expect("some");
        assert_eq!(first["id"], 7);
        let second = reader.next_message().await.expect("second").expect("some");
        assert_eq!(second["id"], 8);
        assert!(reader.next_message().await.expect("eof").is_none());
    }
}
