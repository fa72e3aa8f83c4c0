//! Cursor over in-memory snapshot bytes
//!
//! Every multi-byte field in the dump goes through `take`, which refuses to
//! hand out bytes past the end of the input and leaves the cursor untouched
//! when it does. Truncation therefore surfaces as an error naming the field
//! width that could not be satisfied, never as a partial read.

use crate::core::errors::{ServerError, ServerResult};
use crate::utils::binary::{
    buf_recv_i16_le, buf_recv_i32_le, buf_recv_u32_be, buf_recv_u32_le, buf_recv_u64_le,
};

/// Cursor over a borrowed byte slice
#[derive(Debug)]
pub struct BufferReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Bytes left between the cursor and the end of the input
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Claim the next `count` bytes, advancing the cursor only on success
    fn take(&mut self, count: usize) -> ServerResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ServerError::snapshot(format!(
                    "input truncated: wanted {} byte(s), {} available",
                    count,
                    self.remaining()
                ))
            })?;
        let bytes = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> ServerResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Look at the byte under the cursor without claiming it
    pub fn peek_u8(&self) -> ServerResult<u8> {
        self.data
            .get(self.cursor)
            .copied()
            .ok_or_else(|| ServerError::snapshot("input truncated: wanted 1 byte(s), 0 available"))
    }

    pub fn read_bytes(&mut self, count: usize) -> ServerResult<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    pub fn read_u32_le(&mut self) -> ServerResult<u32> {
        Ok(buf_recv_u32_le(self.take(4)?))
    }

    pub fn read_u64_le(&mut self) -> ServerResult<u64> {
        Ok(buf_recv_u64_le(self.take(8)?))
    }

    pub fn read_u32_be(&mut self) -> ServerResult<u32> {
        Ok(buf_recv_u32_be(self.take(4)?))
    }

    pub fn read_i16_le(&mut self) -> ServerResult<i16> {
        Ok(buf_recv_i16_le(self.take(2)?))
    }

    pub fn read_i32_le(&mut self) -> ServerResult<i32> {
        Ok(buf_recv_i32_le(self.take(4)?))
    }
}
