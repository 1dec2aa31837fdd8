//! RESP Protocol Stack
//!
//! Everything needed to speak the wire protocol:
//!
//! - `types`: the [`RespValue`] sum type and its serializer
//! - `parser`: the restart-safe incremental frame decoder
//! - `reader`: the framed stream reader that feeds the decoder from a
//!   byte source, carrying partial-frame state across reads
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{parse_frame, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_frame(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let response = RespValue::bulk_string("ember");
//! assert_eq!(response.encode().unwrap(), b"$5\r\nember\r\n");
//! ```

pub mod parser;
pub mod reader;
pub mod types;

pub use parser::{parse_frame, ParseError, ParseResult, RespParser, MAX_BULK_SIZE};
pub use reader::{FrameError, FrameReader};
pub use types::RespValue;
