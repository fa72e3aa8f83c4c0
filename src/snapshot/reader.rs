//! Snapshot file parser
//! Materializes the initial key space from the on-disk binary dump

use std::path::Path;

use tracing::debug;

use crate::core::errors::{ServerError, ServerResult};
use crate::utils::buffer::BufferReader;

// Section markers in the dump format
const MARKER_METADATA: u8 = 0xFA;
const MARKER_HASH_SIZES: u8 = 0xFB;
const MARKER_EXPIRY_MILLIS: u8 = 0xFC;
const MARKER_EXPIRY_SECONDS: u8 = 0xFD;
const MARKER_DATABASE: u8 = 0xFE;
const MARKER_END: u8 = 0xFF;

/// String value type tag; the only one supported
const VALUE_TYPE_STRING: u8 = 0x00;

/// One key/value pair recovered from the dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub key: String,
    pub value: Vec<u8>,
    /// Absolute expiry in unix-millis, normalized from either precision
    pub expires_at: Option<i64>,
}

/// Result of decoding one size byte
///
/// The two high bits of the first byte select either a plain length (in one
/// of three widths) or a special string encoding where the "string" is an
/// integer rendered as decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeEncoding {
    /// A plain byte length
    Plain(usize),
    /// 1-byte little-endian signed integer string
    Int8,
    /// 2-byte little-endian signed integer string
    Int16,
    /// 4-byte little-endian signed integer string
    Int32,
}

/// Parse the binary dump format into key/value records
pub struct SnapshotReader<'a> {
    reader: BufferReader<'a>,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            reader: BufferReader::new(bytes),
        }
    }

    /// Parse the whole dump, validating every marker along the way
    pub fn read(mut self) -> ServerResult<Vec<SnapshotRecord>> {
        self.read_magic()?;
        self.skip_header()?;
        let records = self.read_database()?;

        if self.reader.read_u8()? != MARKER_END {
            return Err(ServerError::snapshot(
                "Missing end-of-file marker after last entry",
            ));
        }
        Ok(records)
    }

    fn read_magic(&mut self) -> ServerResult<()> {
        let magic = self.reader.read_bytes(5)?;
        if magic != b"REDIS" {
            return Err(ServerError::snapshot(format!(
                "Bad magic bytes: {:?}",
                magic
            )));
        }
        Ok(())
    }

    /// Skip the version payload and metadata pairs up to the database marker.
    ///
    /// Metadata pairs are structurally parsed (two string-encoded values per
    /// 0xFA) so a marker byte inside a metadata value cannot be mistaken for
    /// a section boundary.
    fn skip_header(&mut self) -> ServerResult<()> {
        loop {
            match self.reader.peek_u8()? {
                MARKER_METADATA => {
                    self.reader.read_u8()?;
                    self.skip_string()?;
                    self.skip_string()?;
                }
                MARKER_DATABASE => {
                    self.reader.read_u8()?;
                    return Ok(());
                }
                _ => {
                    self.reader.read_u8()?;
                }
            }
        }
    }

    fn read_database(&mut self) -> ServerResult<Vec<SnapshotRecord>> {
        let index = self.read_length()?;
        debug!(index, "reading database section");

        if self.reader.read_u8()? != MARKER_HASH_SIZES {
            return Err(ServerError::snapshot(
                "Missing hash table size marker after database index",
            ));
        }
        let total = self.read_length()?;
        let _with_expiry = self.read_length()?;

        // the declared entry count is only a loop bound; a dump overstating
        // it runs out of bytes and fails in read_entry, so it must not size
        // an allocation up front
        let mut records = Vec::new();
        for _ in 0..total {
            records.push(self.read_entry()?);
        }
        Ok(records)
    }

    fn read_entry(&mut self) -> ServerResult<SnapshotRecord> {
        let expires_at = match self.reader.peek_u8()? {
            MARKER_EXPIRY_MILLIS => {
                self.reader.read_u8()?;
                Some(self.reader.read_u64_le()? as i64)
            }
            MARKER_EXPIRY_SECONDS => {
                self.reader.read_u8()?;
                Some(self.reader.read_u32_le()? as i64 * 1000)
            }
            _ => None,
        };

        let value_type = self.reader.read_u8()?;
        if value_type != VALUE_TYPE_STRING {
            return Err(ServerError::snapshot(format!(
                "Unsupported value type: 0x{:02x}",
                value_type
            )));
        }

        let key = self.read_string()?;
        let value = self.read_string()?.into_bytes();
        Ok(SnapshotRecord {
            key,
            value,
            expires_at,
        })
    }

    /// Decode one size field, inspecting the two high bits of the lead byte
    fn read_size(&mut self) -> ServerResult<SizeEncoding> {
        let lead = self.reader.read_u8()?;
        match lead >> 6 {
            0b00 => Ok(SizeEncoding::Plain((lead & 0x3F) as usize)),
            0b01 => {
                let next = self.reader.read_u8()?;
                Ok(SizeEncoding::Plain(
                    (((lead & 0x3F) as usize) << 8) | next as usize,
                ))
            }
            0b10 => Ok(SizeEncoding::Plain(self.reader.read_u32_be()? as usize)),
            _ => match lead {
                0xC0 => Ok(SizeEncoding::Int8),
                0xC1 => Ok(SizeEncoding::Int16),
                0xC2 => Ok(SizeEncoding::Int32),
                0xC3 => Err(ServerError::snapshot(
                    "LZF-compressed strings are not supported",
                )),
                other => Err(ServerError::snapshot(format!(
                    "Unknown special string encoding: 0x{:02x}",
                    other
                ))),
            },
        }
    }

    /// Decode a size that must be a plain length (database index, table sizes)
    fn read_length(&mut self) -> ServerResult<usize> {
        match self.read_size()? {
            SizeEncoding::Plain(n) => Ok(n),
            other => Err(ServerError::snapshot(format!(
                "Expected a plain length, got special encoding {:?}",
                other
            ))),
        }
    }

    /// Consume a string-encoded value without interpreting it.
    ///
    /// Metadata values are opaque; they are not required to be UTF-8.
    fn skip_string(&mut self) -> ServerResult<()> {
        match self.read_size()? {
            SizeEncoding::Plain(len) => {
                self.reader.read_bytes(len)?;
            }
            SizeEncoding::Int8 => {
                self.reader.read_u8()?;
            }
            SizeEncoding::Int16 => {
                self.reader.read_i16_le()?;
            }
            SizeEncoding::Int32 => {
                self.reader.read_i32_le()?;
            }
        }
        Ok(())
    }

    /// Decode a string: raw bytes for plain sizes, decimal text for the
    /// special integer encodings
    fn read_string(&mut self) -> ServerResult<String> {
        match self.read_size()? {
            SizeEncoding::Plain(len) => Ok(String::from_utf8(self.reader.read_bytes(len)?)?),
            SizeEncoding::Int8 => Ok((self.reader.read_u8()? as i8).to_string()),
            SizeEncoding::Int16 => Ok(self.reader.read_i16_le()?.to_string()),
            SizeEncoding::Int32 => Ok(self.reader.read_i32_le()?.to_string()),
        }
    }
}

/// Load records from a snapshot file.
///
/// A missing file is not an error: the server starts with an empty key
/// space. Every parse failure is fatal to startup.
pub fn load(path: &Path) -> ServerResult<Vec<SnapshotRecord>> {
    if !path.exists() {
        debug!(path = %path.display(), "snapshot file not found, starting empty");
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;
    SnapshotReader::new(&bytes).read()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Append a plainly-encoded string (6-bit length form)
    fn push_string(out: &mut Vec<u8>, s: &[u8]) {
        assert!(s.len() < 64);
        out.push(s.len() as u8);
        out.extend_from_slice(s);
    }

    fn header() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"REDIS0011");
        out.push(0xFA);
        push_string(&mut out, b"redis-ver");
        push_string(&mut out, b"7.2.0");
        out
    }

    fn open_database(out: &mut Vec<u8>, total: u8, with_expiry: u8) {
        out.push(0xFE);
        out.push(0x00); // database index
        out.push(0xFB);
        out.push(total);
        out.push(with_expiry);
    }

    #[test]
    fn test_reads_plain_entries_with_and_without_expiry() {
        let mut dump = header();
        open_database(&mut dump, 2, 1);

        // mango -> banana, no expiry
        dump.push(0x00);
        push_string(&mut dump, b"mango");
        push_string(&mut dump, b"banana");

        // apple -> pear, millisecond expiry 2000000000000
        dump.push(0xFC);
        dump.extend_from_slice(&2_000_000_000_000u64.to_le_bytes());
        dump.push(0x00);
        push_string(&mut dump, b"apple");
        push_string(&mut dump, b"pear");

        dump.push(0xFF);

        let records = SnapshotReader::new(&dump).read().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            SnapshotRecord {
                key: "mango".into(),
                value: b"banana".to_vec(),
                expires_at: None,
            }
        );
        assert_eq!(
            records[1],
            SnapshotRecord {
                key: "apple".into(),
                value: b"pear".to_vec(),
                expires_at: Some(2_000_000_000_000),
            }
        );
    }

    #[test]
    fn test_second_precision_expiry_is_normalized_to_millis() {
        let mut dump = header();
        open_database(&mut dump, 1, 1);
        dump.push(0xFD);
        dump.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        dump.push(0x00);
        push_string(&mut dump, b"k");
        push_string(&mut dump, b"v");
        dump.push(0xFF);

        let records = SnapshotReader::new(&dump).read().unwrap();
        assert_eq!(records[0].expires_at, Some(1_700_000_000_000));
    }

    #[test]
    fn test_14_bit_and_32_bit_lengths() {
        let mut dump = header();
        open_database(&mut dump, 2, 0);

        // 700-byte value via the 14-bit form
        dump.push(0x00);
        push_string(&mut dump, b"wide");
        dump.push(0x40 | (700 >> 8) as u8);
        dump.push((700 & 0xFF) as u8);
        dump.extend_from_slice(&vec![b'x'; 700]);

        // 70000-byte value via the 32-bit form
        dump.push(0x00);
        push_string(&mut dump, b"wider");
        dump.push(0x80);
        dump.extend_from_slice(&70_000u32.to_be_bytes());
        dump.extend_from_slice(&vec![b'y'; 70_000]);

        dump.push(0xFF);

        let records = SnapshotReader::new(&dump).read().unwrap();
        assert_eq!(records[0].value.len(), 700);
        assert_eq!(records[1].value.len(), 70_000);
    }

    #[test]
    fn test_special_integer_strings() {
        let mut dump = header();
        open_database(&mut dump, 3, 0);

        dump.push(0x00);
        push_string(&mut dump, b"i8");
        dump.push(0xC0);
        dump.push((-123i8) as u8);

        dump.push(0x00);
        push_string(&mut dump, b"i16");
        dump.push(0xC1);
        dump.extend_from_slice(&12_345i16.to_le_bytes());

        dump.push(0x00);
        push_string(&mut dump, b"i32");
        dump.push(0xC2);
        dump.extend_from_slice(&(-1_000_000i32).to_le_bytes());

        dump.push(0xFF);

        let records = SnapshotReader::new(&dump).read().unwrap();
        assert_eq!(records[0].value, b"-123");
        assert_eq!(records[1].value, b"12345");
        assert_eq!(records[2].value, b"-1000000");
    }

    #[test]
    fn test_integer_encoded_keys_render_as_decimal_text() {
        let mut dump = header();
        open_database(&mut dump, 1, 0);
        dump.push(0x00);
        dump.push(0xC0);
        dump.push(42);
        push_string(&mut dump, b"answer");
        dump.push(0xFF);

        let records = SnapshotReader::new(&dump).read().unwrap();
        assert_eq!(records[0].key, "42");
    }

    #[test]
    fn test_lzf_encoding_is_fatal() {
        let mut dump = header();
        open_database(&mut dump, 1, 0);
        dump.push(0x00);
        push_string(&mut dump, b"k");
        dump.push(0xC3);

        assert!(SnapshotReader::new(&dump).read().is_err());
    }

    #[test]
    fn test_unsupported_value_type_is_fatal() {
        let mut dump = header();
        open_database(&mut dump, 1, 0);
        dump.push(0x01); // list type
        push_string(&mut dump, b"k");
        push_string(&mut dump, b"v");
        dump.push(0xFF);

        assert!(SnapshotReader::new(&dump).read().is_err());
    }

    #[test]
    fn test_marker_mismatches_are_fatal() {
        // bad magic
        assert!(SnapshotReader::new(b"RUBIS0011").read().is_err());

        // missing hash table size marker
        let mut dump = header();
        dump.push(0xFE);
        dump.push(0x00);
        dump.push(0x00); // should be 0xFB
        assert!(SnapshotReader::new(&dump).read().is_err());

        // missing terminator
        let mut dump = header();
        open_database(&mut dump, 1, 0);
        dump.push(0x00);
        push_string(&mut dump, b"k");
        push_string(&mut dump, b"v");
        assert!(SnapshotReader::new(&dump).read().is_err());
    }

    #[test]
    fn test_overstated_entry_count_is_an_error_not_a_panic() {
        let mut dump = header();
        // claims one billion entries but carries one
        dump.push(0xFE);
        dump.push(0x00);
        dump.push(0xFB);
        dump.push(0x80);
        dump.extend_from_slice(&1_000_000_000u32.to_be_bytes());
        dump.push(0x00);

        dump.push(0x00);
        push_string(&mut dump, b"k");
        push_string(&mut dump, b"v");
        dump.push(0xFF);

        assert!(SnapshotReader::new(&dump).read().is_err());
    }

    #[test]
    fn test_metadata_values_may_contain_marker_bytes() {
        let mut dump = Vec::new();
        dump.extend_from_slice(b"REDIS0011");
        dump.push(0xFA);
        push_string(&mut dump, b"raw");
        push_string(&mut dump, &[0xFE, 0xFF, 0xFB]);
        open_database(&mut dump, 0, 0);
        dump.push(0xFF);

        assert!(SnapshotReader::new(&dump).read().unwrap().is_empty());
    }

    #[test]
    fn test_metadata_with_integer_encoded_value() {
        let mut dump = Vec::new();
        dump.extend_from_slice(b"REDIS0011");
        dump.push(0xFA);
        push_string(&mut dump, b"redis-bits");
        dump.push(0xC0);
        dump.push(64);
        open_database(&mut dump, 0, 0);
        dump.push(0xFF);

        assert!(SnapshotReader::new(&dump).read().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file_yields_empty_key_space() {
        let path = std::env::temp_dir().join(format!("respkv-absent-{}.rdb", uuid::Uuid::new_v4()));
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let mut dump = header();
        open_database(&mut dump, 1, 0);
        dump.push(0x00);
        push_string(&mut dump, b"disk");
        push_string(&mut dump, b"value");
        dump.push(0xFF);

        let path = std::env::temp_dir().join(format!("respkv-dump-{}.rdb", uuid::Uuid::new_v4()));
        std::fs::write(&path, &dump).unwrap();
        let records = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "disk");
    }
}
