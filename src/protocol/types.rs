//! RESP Wire Value Types
//!
//! This module defines the tagged value grammar the server speaks on the
//! wire, together with its serializer.
//!
//! ## Protocol Format
//!
//! Each value starts with a one-byte type prefix:
//! - `+` Simple String
//! - `-` Simple Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All line-oriented forms are terminated with CRLF (`\r\n`); bulk strings
//! carry CRLF both after the length prefix and after the payload.
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Simple Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Array: `*-1\r\n`
//!
//! The null sentinels are distinct variants rather than a shared `Null`:
//! a missing key (`$-1\r\n`) and a missing result set (`*-1\r\n`) are
//! different answers and must not collapse into one value on re-encode.

use crate::protocol::parser::ParseError;
use bytes::Bytes;
use std::fmt;

/// The CRLF frame terminator.
pub const CRLF: &[u8] = b"\r\n";

/// RESP type prefix bytes.
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const SIMPLE_ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One complete value in the wire grammar.
///
/// Payloads are held as [`Bytes`]: decoded values own their bytes (the
/// decoder copies out of the read buffer on commit), and clones are
/// reference-counted rather than deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Line-oriented payload, forbidden to contain CRLF.
    /// Format: `+<payload>\r\n`
    SimpleString(Bytes),

    /// Same shape as a simple string, different semantic tag.
    /// Format: `-<payload>\r\n`
    SimpleError(Bytes),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe blob with an explicit length prefix.
    /// Format: `$<length>\r\n<payload>\r\n`
    BulkString(Bytes),

    /// Sentinel absence, distinct from an empty bulk string.
    /// Exactly the five octets `$-1\r\n`.
    NullBulkString,

    /// Ordered, possibly nested sequence of values.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),

    /// Sentinel absence for arrays. Exactly the five octets `*-1\r\n`.
    NullArray,
}

impl RespValue {
    /// Creates a simple string value.
    pub fn simple_string(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a simple error value.
    pub fn error(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleError(s.into())
    }

    /// Creates an integer value.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a bulk string value.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates an array value.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// The canonical `+OK\r\n` response.
    pub fn ok() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"OK"))
    }

    /// The canonical `+PONG\r\n` response.
    pub fn pong() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"PONG"))
    }

    /// Serializes this value to a fresh byte vector.
    ///
    /// Fails with [`ParseError::InvalidPayload`] if a simple string or
    /// simple error payload contains CRLF; everything else is
    /// representable.
    pub fn encode(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Serializes this value into an existing buffer.
    ///
    /// On error the buffer may hold a partial encoding; callers that need
    /// atomic framing should encode into a scratch vector first.
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), ParseError> {
        match self {
            RespValue::SimpleString(payload) => {
                encode_line(buf, prefix::SIMPLE_STRING, payload)?;
            }
            RespValue::SimpleError(payload) => {
                encode_line(buf, prefix::SIMPLE_ERROR, payload)?;
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::NullBulkString => {
                buf.extend_from_slice(b"$-1\r\n");
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.encode_into(buf)?;
                }
            }
            RespValue::NullArray => {
                buf.extend_from_slice(b"*-1\r\n");
            }
        }
        Ok(())
    }

    /// Compares a text-shaped value against `reference` byte-for-byte,
    /// treating ASCII letters case-insensitively.
    ///
    /// Defined for the three text-shaped variants (simple string, simple
    /// error, bulk string); every other variant compares unequal. Does not
    /// allocate.
    pub fn eq_ignore_ascii_case(&self, reference: &str) -> bool {
        match self.text_bytes() {
            Some(payload) => payload.eq_ignore_ascii_case(reference.as_bytes()),
            None => false,
        }
    }

    /// The raw payload of a text-shaped variant.
    pub fn text_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::SimpleString(b) | RespValue::SimpleError(b) | RespValue::BulkString(b) => {
                Some(b)
            }
            _ => None,
        }
    }

    /// The payload of a text-shaped variant as UTF-8, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        self.text_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// The inner integer, if this is an `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrows the elements, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Consumes self and returns the elements, if this is an `Array`.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(values) => Some(values),
            _ => None,
        }
    }
}

/// Emits `<prefix><payload>\r\n`, rejecting payloads that contain the
/// terminator (the frame boundary would be ambiguous on the wire).
fn encode_line(buf: &mut Vec<u8>, tag: u8, payload: &[u8]) -> Result<(), ParseError> {
    if contains_crlf(payload) {
        return Err(ParseError::InvalidPayload);
    }
    buf.push(tag);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(CRLF);
    Ok(())
}

fn contains_crlf(payload: &[u8]) -> bool {
    payload.windows(2).any(|w| w == CRLF)
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(b) | RespValue::BulkString(b) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(b))
            }
            RespValue::SimpleError(b) => write!(f, "(error) {}", String::from_utf8_lossy(b)),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::NullBulkString | RespValue::NullArray => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    return write!(f, "(empty array)");
                }
                writeln!(f)?;
                for (i, v) in values.iter().enumerate() {
                    writeln!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}
