//! RESP wire protocol frame parser
//! Handles streaming decode of frames accumulated from client socket reads

use crate::core::errors::{ServerError, ServerResult};
use crate::protocol::value::RespValue;

/// Decode RESP frames from a byte buffer
///
/// Because requests arrive over fixed-size socket reads, the buffer may hold
/// a partial frame at any time. `parse` reports that case as `Ok(None)` so
/// the caller can accumulate more bytes; only structurally invalid input is
/// an error.
pub struct RespParser;

impl RespParser {
    /// Decode one top-level frame from the front of `buffer`.
    ///
    /// Returns the frame and the number of bytes consumed, `Ok(None)` when
    /// the buffer holds only a prefix of a frame, or a protocol error when
    /// the bytes can never form a valid frame.
    pub fn parse(buffer: &[u8]) -> ServerResult<Option<(RespValue, usize)>> {
        Self::parse_value(buffer, 0)
    }

    fn parse_value(buffer: &[u8], offset: usize) -> ServerResult<Option<(RespValue, usize)>> {
        if offset >= buffer.len() {
            return Ok(None);
        }

        match buffer[offset] {
            b'+' => Self::parse_simple_string(buffer, offset + 1),
            b':' => Self::parse_integer(buffer, offset + 1),
            b'$' => Self::parse_bulk_string(buffer, offset + 1),
            b'*' => Self::parse_array(buffer, offset + 1),
            other => Err(ServerError::protocol(format!(
                "Unknown frame tag byte: 0x{:02x}",
                other
            ))),
        }
    }

    fn parse_simple_string(
        buffer: &[u8],
        offset: usize,
    ) -> ServerResult<Option<(RespValue, usize)>> {
        let Some((line, after)) = Self::read_line(buffer, offset) else {
            return Ok(None);
        };
        let text = std::str::from_utf8(line)
            .map_err(|_| ServerError::protocol("Simple string is not valid UTF-8"))?;
        Ok(Some((RespValue::SimpleString(text.to_string()), after)))
    }

    fn parse_integer(buffer: &[u8], offset: usize) -> ServerResult<Option<(RespValue, usize)>> {
        let Some((line, after)) = Self::read_line(buffer, offset) else {
            return Ok(None);
        };
        let n = Self::parse_decimal(line)?;
        Ok(Some((RespValue::Integer(n), after)))
    }

    fn parse_bulk_string(buffer: &[u8], offset: usize) -> ServerResult<Option<(RespValue, usize)>> {
        let Some((line, after)) = Self::read_line(buffer, offset) else {
            return Ok(None);
        };
        let declared = Self::parse_decimal(line)?;

        if declared == -1 {
            return Ok(Some((RespValue::BulkString(None), after)));
        }
        if declared < 0 {
            return Err(ServerError::protocol(format!(
                "Negative bulk string length: {}",
                declared
            )));
        }

        // declared length governs the payload regardless of embedded CRLF
        let len = declared as usize;
        if buffer.len() < after + len + 2 {
            return Ok(None);
        }
        let payload = buffer[after..after + len].to_vec();
        if &buffer[after + len..after + len + 2] != b"\r\n" {
            return Err(ServerError::protocol(
                "Bulk string payload is not CRLF-terminated",
            ));
        }
        Ok(Some((RespValue::BulkString(Some(payload)), after + len + 2)))
    }

    fn parse_array(buffer: &[u8], offset: usize) -> ServerResult<Option<(RespValue, usize)>> {
        let Some((line, after)) = Self::read_line(buffer, offset) else {
            return Ok(None);
        };
        let declared = Self::parse_decimal(line)?;

        if declared == -1 {
            return Ok(Some((RespValue::Array(None), after)));
        }
        if declared < 0 {
            return Err(ServerError::protocol(format!(
                "Negative array length: {}",
                declared
            )));
        }

        // the declared count is client-controlled and must not drive an
        // allocation before the elements have actually arrived
        let mut items = Vec::new();
        let mut cursor = after;
        for _ in 0..declared {
            let Some((item, next)) = Self::parse_value(buffer, cursor)? else {
                return Ok(None);
            };
            items.push(item);
            cursor = next;
        }
        Ok(Some((RespValue::Array(Some(items)), cursor)))
    }

    /// Find the next CRLF-terminated line starting at `offset`.
    ///
    /// Returns the line contents (without the terminator) and the offset just
    /// past the terminator, or `None` when the terminator has not arrived yet.
    fn read_line(buffer: &[u8], offset: usize) -> Option<(&[u8], usize)> {
        let mut i = offset;
        while i + 1 < buffer.len() {
            if buffer[i] == b'\r' && buffer[i + 1] == b'\n' {
                return Some((&buffer[offset..i], i + 2));
            }
            i += 1;
        }
        None
    }

    /// Parse a signed decimal length/integer line.
    fn parse_decimal(line: &[u8]) -> ServerResult<i64> {
        let text = std::str::from_utf8(line)
            .map_err(|_| ServerError::protocol("Non-ASCII decimal field"))?;
        text.parse::<i64>()
            .map_err(|_| ServerError::protocol(format!("Non-numeric decimal field: {:?}", text)))
    }
}
