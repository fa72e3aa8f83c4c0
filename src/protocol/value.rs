//! RESP wire protocol values
//!
//! Contains the data structure representing a single RESP frame and its
//! encoder. The four frame types form a closed sum; null bulk strings and
//! null arrays are distinct from their empty counterparts and have their own
//! wire encodings.

/// A single RESP frame
///
/// ## Encoding
///
/// - `SimpleString s`  → `+s\r\n`
/// - `Integer n`       → `:n\r\n`
/// - `BulkString b`    → `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` when null
/// - `Array [x1…xn]`   → `*<n>\r\n<x1>…<xn>`, or `*-1\r\n` when null
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Short inline string; CR/LF must not appear in the text
    SimpleString(String),
    /// Signed 64-bit integer
    Integer(i64),
    /// Possibly-null opaque byte string
    BulkString(Option<Vec<u8>>),
    /// Possibly-null ordered sequence; may nest
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Convenience constructor for a non-null bulk string
    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
        RespValue::BulkString(Some(bytes.into()))
    }

    /// The null bulk string, `$-1\r\n` on the wire
    pub fn null_bulk() -> Self {
        RespValue::BulkString(None)
    }

    /// Encode this frame to its wire bytes
    ///
    /// Bulk string length prefixes are byte lengths, never character counts.
    /// Arrays encode their elements left-to-right.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(text) => {
                out.push(b'+');
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                out.push(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(None) => {
                out.extend_from_slice(b"$-1\r\n");
            }
            RespValue::BulkString(Some(bytes)) => {
                out.push(b'$');
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Array(None) => {
                out.extend_from_slice(b"*-1\r\n");
            }
            RespValue::Array(Some(items)) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode_into(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_simple_string() {
        assert_eq!(RespValue::SimpleString("OK".into()).encode(), b"+OK\r\n");
    }

    #[test]
    fn test_encode_integer() {
        assert_eq!(RespValue::Integer(42).encode(), b":42\r\n");
        assert_eq!(RespValue::Integer(-7).encode(), b":-7\r\n");
    }

    #[test]
    fn test_encode_bulk_string() {
        assert_eq!(RespValue::bulk("PONG").encode(), b"$4\r\nPONG\r\n");
        assert_eq!(RespValue::bulk("").encode(), b"$0\r\n\r\n");
        assert_eq!(RespValue::null_bulk().encode(), b"$-1\r\n");
    }

    #[test]
    fn test_bulk_length_is_byte_length() {
        // multi-byte UTF-8: 2 chars, 4 bytes
        let value = RespValue::bulk("éé");
        let encoded = value.encode();
        assert!(encoded.starts_with(b"$4\r\n"));
    }

    #[test]
    fn test_encode_array() {
        let value = RespValue::Array(Some(vec![
            RespValue::bulk("ECHO"),
            RespValue::bulk("hello"),
        ]));
        assert_eq!(value.encode(), b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n");
        assert_eq!(RespValue::Array(Some(vec![])).encode(), b"*0\r\n");
        assert_eq!(RespValue::Array(None).encode(), b"*-1\r\n");
    }
}
