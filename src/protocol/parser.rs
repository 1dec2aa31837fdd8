//! Incremental RESP Frame Decoder
//!
//! The decoder turns a byte slice into at most one complete protocol value.
//! It is written to be restart-safe: handed a strict prefix of a legal
//! frame it reports "incomplete" as a *normal result* (`Ok(None)`), never
//! commits partial state, and can be called again once more bytes arrive.
//! The [`FrameReader`](crate::protocol::reader::FrameReader) leans on this
//! to parse across arbitrary chunking boundaries.
//!
//! ## Contract
//!
//! `parse` returns:
//! - `Ok(Some((value, consumed)))` - one complete frame; `consumed` bytes
//!   of the input belong to it (including all terminators)
//! - `Ok(None)` - the input is a strict prefix of a legal frame
//! - `Err(ParseError)` - the input can never become a legal frame; the
//!   frame boundary is lost and the connection cannot be resynchronised
//!
//! The incomplete case is deliberately cheap: no allocation, no error
//! construction. The reader may probe the parser many times per real
//! frame.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that end a protocol stream. Incomplete input is not among them;
/// it is signalled by `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First byte of a frame is not one of `+ - : $ *`.
    #[error("unexpected protocol type: {0:#04x}")]
    UnexpectedType(u8),

    /// A bulk string payload was not followed by CRLF.
    #[error("unterminated protocol frame, unrecoverable")]
    Unterminated,

    /// A length, count, or integer body was not a well-formed signed
    /// decimal (this includes negative lengths other than -1).
    #[error("malformed integer in protocol frame")]
    MalformedInteger,

    /// A simple string or simple error payload contains CRLF; the value
    /// cannot be framed.
    #[error("payload contains the frame terminator")]
    InvalidPayload,

    /// A declared bulk length exceeds the protocol maximum.
    #[error("bulk string of {size} bytes exceeds maximum of {max}")]
    BulkTooLarge { size: usize, max: usize },

    /// Arrays nested beyond the supported depth.
    #[error("frame nesting exceeds maximum depth of {0}")]
    NestedTooDeep(usize),
}

/// Result type for decode operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum declared length of a single bulk string (512 MB, the RESP
/// protocol maximum). Enforced, not merely documented.
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on speculative `Vec` pre-allocation for array elements.
/// A declared count is not trusted until its elements actually parse.
const MAX_ARRAY_PREALLOC: usize = 64;

/// A restart-safe RESP frame decoder.
///
/// The struct only tracks recursion depth; all parse state lives on the
/// stack, which is what makes re-parsing from the frame start cheap.
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to decode one complete frame from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::NestedTooDeep(MAX_NESTING_DEPTH));
        }

        match tag {
            prefix::SIMPLE_STRING => self.parse_simple(buf, false),
            prefix::SIMPLE_ERROR => self.parse_simple(buf, true),
            prefix::INTEGER => self.parse_integer(buf),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnexpectedType(other)),
        }
    }

    /// Parses `+<payload>\r\n` or `-<payload>\r\n`.
    fn parse_simple(&mut self, buf: &[u8], is_error: bool) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(end) = find_crlf(&buf[1..]) else {
            return Ok(None);
        };

        // Defensive copy: the caller's buffer is volatile (it will be
        // compacted once this frame is consumed).
        let payload = Bytes::copy_from_slice(&buf[1..1 + end]);
        let consumed = 1 + end + CRLF.len();
        let value = if is_error {
            RespValue::SimpleError(payload)
        } else {
            RespValue::SimpleString(payload)
        };
        Ok(Some((value, consumed)))
    }

    /// Parses `:<integer>\r\n`.
    fn parse_integer(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(end) = find_crlf(&buf[1..]) else {
            return Ok(None);
        };

        let n = parse_decimal(&buf[1..1 + end])?;
        let consumed = 1 + end + CRLF.len();
        Ok(Some((RespValue::Integer(n), consumed)))
    }

    /// Parses `$<length>\r\n<payload>\r\n`, or the null sentinel `$-1\r\n`.
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(len_end) = find_crlf(&buf[1..]) else {
            return Ok(None);
        };

        let declared = parse_decimal(&buf[1..1 + len_end])?;
        let header = 1 + len_end + CRLF.len();

        // -1 is the null sentinel; any other negative length is nonsense.
        if declared == -1 {
            return Ok(Some((RespValue::NullBulkString, header)));
        }
        if declared < 0 {
            return Err(ParseError::MalformedInteger);
        }

        let len = declared as usize;
        if len > MAX_BULK_SIZE {
            return Err(ParseError::BulkTooLarge {
                size: len,
                max: MAX_BULK_SIZE,
            });
        }

        // Both the payload and its trailing CRLF must be present before
        // anything is committed.
        let total = header + len + CRLF.len();
        if buf.len() < total {
            return Ok(None);
        }
        if &buf[header + len..total] != CRLF {
            return Err(ParseError::Unterminated);
        }

        let payload = Bytes::copy_from_slice(&buf[header..header + len]);
        Ok(Some((RespValue::BulkString(payload), total)))
    }

    /// Parses `*<count>\r\n<elements...>`, or the null sentinel `*-1\r\n`.
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(count_end) = find_crlf(&buf[1..]) else {
            return Ok(None);
        };

        let declared = parse_decimal(&buf[1..1 + count_end])?;
        let mut consumed = 1 + count_end + CRLF.len();

        if declared == -1 {
            return Ok(Some((RespValue::NullArray, consumed)));
        }
        if declared < 0 {
            return Err(ParseError::MalformedInteger);
        }

        let count = declared as usize;
        let mut elements = Vec::with_capacity(count.min(MAX_ARRAY_PREALLOC));

        self.depth += 1;
        for _ in 0..count {
            // A child's incomplete result propagates: the whole array
            // either parses or waits.
            match self.parse_value(&buf[consumed..])? {
                Some((value, child_consumed)) => {
                    elements.push(value);
                    consumed += child_consumed;
                }
                None => return Ok(None),
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Finds the offset of the first CRLF pair in `buf`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses an ASCII signed decimal. Empty bodies, stray signs, and
/// non-digit bytes are all malformed.
fn parse_decimal(digits: &[u8]) -> ParseResult<i64> {
    let text = std::str::from_utf8(digits).map_err(|_| ParseError::MalformedInteger)?;
    text.parse::<i64>().map_err(|_| ParseError::MalformedInteger)
}

/// Decodes a single frame from `buf`. Convenience wrapper for callers
/// that do not hold a parser.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(input: &[u8]) -> (RespValue, usize) {
        parse_frame(input).unwrap().expect("expected a complete frame")
    }

    #[test]
    fn parses_simple_string() {
        let (value, consumed) = complete(b"+OK\r\n");
        assert_eq!(value, RespValue::simple_string("OK"));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn parses_simple_error() {
        let (value, consumed) = complete(b"-ERR unknown command\r\n");
        assert_eq!(value, RespValue::error("ERR unknown command"));
        assert_eq!(consumed, 22);
    }

    #[test]
    fn parses_integers() {
        assert_eq!(complete(b":1000\r\n"), (RespValue::integer(1000), 7));
        assert_eq!(complete(b":-42\r\n"), (RespValue::integer(-42), 6));
    }

    #[test]
    fn parses_bulk_string() {
        let (value, consumed) = complete(b"$5\r\nhello\r\n");
        assert_eq!(value, RespValue::bulk_string("hello"));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn parses_empty_bulk_string() {
        let (value, consumed) = complete(b"$0\r\n\r\n");
        assert_eq!(value, RespValue::bulk_string(""));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn bulk_string_is_binary_safe() {
        let (value, _) = complete(b"$5\r\nhe\x00lo\r\n");
        assert_eq!(value, RespValue::bulk_string(&b"he\x00lo"[..]));
    }

    #[test]
    fn null_sentinels_decode_to_distinct_variants() {
        assert_eq!(complete(b"$-1\r\n"), (RespValue::NullBulkString, 5));
        assert_eq!(complete(b"*-1\r\n"), (RespValue::NullArray, 5));
    }

    #[test]
    fn parses_flat_array() {
        let (value, consumed) = complete(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
        assert_eq!(
            value,
            RespValue::array(vec![
                RespValue::bulk_string("GET"),
                RespValue::bulk_string("name"),
            ])
        );
        assert_eq!(consumed, 23);
    }

    #[test]
    fn parses_empty_array() {
        assert_eq!(complete(b"*0\r\n"), (RespValue::array(vec![]), 4));
    }

    #[test]
    fn parses_nested_array() {
        let (value, consumed) = complete(b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
        assert_eq!(
            value,
            RespValue::array(vec![
                RespValue::integer(1),
                RespValue::array(vec![RespValue::integer(2), RespValue::integer(3)]),
            ])
        );
        assert_eq!(consumed, 20);
    }

    #[test]
    fn consumed_excludes_trailing_bytes() {
        let (value, consumed) = complete(b"+OK\r\n+NEXT\r\n");
        assert_eq!(value, RespValue::simple_string("OK"));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn incomplete_inputs_are_not_errors() {
        let cases: &[&[u8]] = &[
            b"",
            b"+OK",
            b"+OK\r",
            b":12",
            b"$5",
            b"$5\r\n",
            b"$5\r\nhel",
            b"$5\r\nhello",
            b"$5\r\nhello\r",
            b"*2\r\n$3\r\nGET\r\n",
            b"*2\r\n$3\r\nGET\r\n$4\r\nna",
        ];
        for case in cases {
            assert_eq!(
                parse_frame(case).unwrap(),
                None,
                "input {:?} should be incomplete",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn unknown_prefix_is_fatal() {
        assert_eq!(parse_frame(b"@oops\r\n"), Err(ParseError::UnexpectedType(b'@')));
    }

    #[test]
    fn bulk_string_without_crlf_terminator_is_fatal() {
        // Payload present, but the two trailing octets are not CRLF.
        assert_eq!(parse_frame(b"$5\r\nhelloXY"), Err(ParseError::Unterminated));
        assert_eq!(parse_frame(b"$5\r\nhello\rX"), Err(ParseError::Unterminated));
    }

    #[test]
    fn negative_lengths_other_than_null_are_malformed() {
        assert_eq!(parse_frame(b"$-2\r\n"), Err(ParseError::MalformedInteger));
        assert_eq!(parse_frame(b"*-5\r\n"), Err(ParseError::MalformedInteger));
    }

    #[test]
    fn garbage_integers_are_malformed() {
        assert_eq!(parse_frame(b":abc\r\n"), Err(ParseError::MalformedInteger));
        assert_eq!(parse_frame(b":\r\n"), Err(ParseError::MalformedInteger));
        assert_eq!(parse_frame(b"$1x\r\n"), Err(ParseError::MalformedInteger));
        assert_eq!(parse_frame(b":12 3\r\n"), Err(ParseError::MalformedInteger));
    }

    #[test]
    fn oversized_bulk_declaration_is_rejected_before_any_payload() {
        // One byte past the protocol maximum; no payload bytes supplied.
        let frame = format!("${}\r\n", MAX_BULK_SIZE + 1);
        assert_eq!(
            parse_frame(frame.as_bytes()),
            Err(ParseError::BulkTooLarge {
                size: MAX_BULK_SIZE + 1,
                max: MAX_BULK_SIZE,
            })
        );
    }

    #[test]
    fn huge_declared_array_count_waits_for_elements() {
        // The count alone must not commit (or pre-allocate) anything.
        assert_eq!(parse_frame(b"*1000000\r\n:1\r\n").unwrap(), None);
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let mut input = Vec::new();
        for _ in 0..MAX_NESTING_DEPTH + 2 {
            input.extend_from_slice(b"*1\r\n");
        }
        input.extend_from_slice(b":1\r\n");
        assert_eq!(
            parse_frame(&input),
            Err(ParseError::NestedTooDeep(MAX_NESTING_DEPTH))
        );
    }

    #[test]
    fn child_errors_propagate_out_of_arrays() {
        assert_eq!(
            parse_frame(b"*2\r\n:1\r\n@bad\r\n"),
            Err(ParseError::UnexpectedType(b'@'))
        );
    }

    #[test]
    fn round_trip_law() {
        let values = vec![
            RespValue::simple_string("PONG"),
            RespValue::error("ERR wrong type"),
            RespValue::integer(0),
            RespValue::integer(i64::MIN),
            RespValue::integer(i64::MAX),
            RespValue::bulk_string("hello"),
            RespValue::bulk_string(""),
            RespValue::bulk_string(&b"bin\x00\xff"[..]),
            RespValue::NullBulkString,
            RespValue::NullArray,
            RespValue::array(vec![]),
            RespValue::array(vec![
                RespValue::bulk_string("SET"),
                RespValue::bulk_string("key"),
                RespValue::array(vec![RespValue::integer(7), RespValue::NullBulkString]),
            ]),
        ];

        for value in values {
            let encoded = value.encode().unwrap();
            let (decoded, consumed) = complete(&encoded);
            assert_eq!(decoded, value);
            assert_eq!(consumed, encoded.len());
        }
    }
}
