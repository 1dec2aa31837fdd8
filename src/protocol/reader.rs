//! Framed Stream Reader
//!
//! Turns an unbounded byte stream into discrete protocol values. TCP gives
//! no framing guarantees: a read may deliver half a frame, or three frames
//! and the first byte of a fourth. The reader owns an internal buffer that
//! carries partial-frame state across reads, so a frame split across any
//! chunking boundary parses identically to one delivered whole.
//!
//! ## Read loop
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ parse buffered bytes                         │
//! │   complete frame ──> consume + return        │
//! │   incomplete     ──> read more from source ──┼──> loop
//! │   anything else  ──> fatal                   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Parsing is attempted *before* touching the source, so pipelined frames
//! already buffered are drained without another round trip, and at most
//! one round trip is spent per partial frame.
//!
//! ## Buffer discipline
//!
//! Consuming a frame advances the buffer start; the next reserve compacts
//! the remainder to the front. Growth doubles when free space runs low.
//! Steady-state memory therefore tracks the largest recent frame, not the
//! high-water mark of the stream. Decoded values never alias this buffer
//! (the parser copies on commit), so compaction cannot invalidate them.

use crate::protocol::parser::{ParseError, RespParser};
use crate::protocol::types::RespValue;
use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial buffer capacity.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Minimum free space required before a source read is attempted; below
/// this the buffer is grown first so progress is guaranteed.
const MIN_READ_BYTES: usize = 256;

/// Ceiling on a single buffered frame (the RESP bulk maximum). A frame
/// still incomplete at this size can never complete legally.
const MAX_FRAME_SIZE: usize = crate::protocol::parser::MAX_BULK_SIZE;

/// Errors that terminate a reader. All of them are sticky: once surfaced,
/// the connection is done.
#[derive(Debug, Error)]
pub enum FrameError {
    /// I/O failure on the underlying source.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffered bytes can never become a legal frame.
    #[error("protocol error: {0}")]
    Parse(#[from] ParseError),

    /// The source reached end-of-stream between frames.
    #[error("source closed")]
    Disconnected,

    /// The source reached end-of-stream mid-frame; the partial frame is
    /// discarded, never fabricated into a value.
    #[error("source closed mid-frame")]
    UnexpectedEof,

    /// An incomplete frame outgrew the per-frame ceiling.
    #[error("frame exceeds maximum size of {MAX_FRAME_SIZE} bytes")]
    FrameTooLarge,
}

/// An incremental frame reader over any byte source.
///
/// Single-owner: each connection constructs its own. The internal buffer
/// is never shared or aliased.
#[derive(Debug)]
pub struct FrameReader<R> {
    source: R,
    parser: RespParser,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Creates a reader over `source`.
    pub fn new(source: R) -> Self {
        Self {
            source,
            parser: RespParser::new(),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// Reads the next complete frame.
    ///
    /// Buffered bytes are parsed first; the source is only consulted when
    /// the buffer holds a strict prefix of a frame. Every error returned
    /// here is terminal for the reader.
    pub async fn read_frame(&mut self) -> Result<RespValue, FrameError> {
        loop {
            if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(value);
            }

            if self.buffer.len() >= MAX_FRAME_SIZE {
                return Err(FrameError::FrameTooLarge);
            }

            // Grow by doubling once free space runs low; +1 guarantees
            // progress even from a zero-capacity buffer.
            if self.buffer.capacity() - self.buffer.len() < MIN_READ_BYTES {
                let grow = self.buffer.capacity() + 1;
                self.buffer.reserve(grow);
            }

            let n = self.source.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(if self.buffer.is_empty() {
                    FrameError::Disconnected
                } else {
                    FrameError::UnexpectedEof
                });
            }
        }
    }
}
