//! Request/Response Context
//!
//! The narrow surface a command handler works through: references to the
//! process-wide stores, plus typed send methods over the connection's
//! write half. Each send emits exactly one complete top-level frame and
//! flushes, so responses can never interleave mid-frame.

use crate::protocol::RespValue;
use crate::storage::{ConfigStore, Keyspace};
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::warn;

/// Per-request view of the world handed to command handlers.
pub struct RequestContext<W> {
    writer: BufWriter<W>,
    /// The shared keyspace.
    pub store: Arc<Keyspace>,
    /// The server configuration entries.
    pub config: Arc<ConfigStore>,
}

impl<W: AsyncWrite + Unpin> RequestContext<W> {
    pub fn new(writer: W, store: Arc<Keyspace>, config: Arc<ConfigStore>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            store,
            config,
        }
    }

    /// Sends any value as one frame.
    pub async fn send_value(&mut self, value: &RespValue) -> io::Result<()> {
        match value.encode() {
            Ok(frame) => self.write_frame(&frame).await,
            Err(e) => {
                // A handler built an unencodable value; tell the client
                // something rather than dropping the response on the floor.
                warn!(error = %e, "failed to encode response value");
                self.send_error("ERR internal error encoding response").await
            }
        }
    }

    /// Sends `+<msg>\r\n`.
    pub async fn send_simple_string(&mut self, msg: &str) -> io::Result<()> {
        let value = RespValue::simple_string(Bytes::copy_from_slice(msg.as_bytes()));
        self.send_value(&value).await
    }

    /// Sends `-<msg>\r\n`. Line breaks in the message are flattened so
    /// the frame stays legal.
    pub async fn send_error(&mut self, msg: &str) -> io::Result<()> {
        let sanitized: String = msg
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        let frame = RespValue::error(Bytes::from(sanitized))
            .encode()
            .expect("sanitized error payload contains no CRLF");
        self.write_frame(&frame).await
    }

    /// Sends the null bulk string `$-1\r\n`.
    pub async fn send_null_bulk_string(&mut self) -> io::Result<()> {
        self.send_value(&RespValue::NullBulkString).await
    }

    /// Sends a flat array of bulk strings.
    pub async fn send_string_array(&mut self, items: &[Bytes]) -> io::Result<()> {
        let value = RespValue::array(
            items
                .iter()
                .map(|item| RespValue::BulkString(item.clone()))
                .collect(),
        );
        self.send_value(&value).await
    }

    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.writer.write_all(frame).await?;
        self.writer.flush().await
    }
}
