//! Log record types and framing.
//!
//! ```text
//! | magic "MLOG" (4) | version u16 | type u8 | payload_len u32 | payload | crc32 u32 |
//! ```
//!
//! Put payload: `collection | key | value_len u32 | value (CBOR)`;
//! delete payload: `collection | key`. Strings are `len u16 | utf8`.

use crate::error::{StoreError, StoreResult};

/// Magic bytes identifying a log frame.
pub const LOG_MAGIC: [u8; 4] = *b"MLOG";

/// Current log frame version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub const HEADER_SIZE: usize = 11;

/// Trailing checksum size.
pub const CRC_SIZE: usize = 4;

/// Type tag of a log frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// Upsert a record.
    Put = 1,
    /// Remove a record.
    Delete = 2,
}

impl LogRecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single mutation in the record log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Upsert `value` under `key`.
    Put {
        /// Target collection.
        collection: String,
        /// Record key.
        key: String,
        /// Encoded record (CBOR).
        value: Vec<u8>,
    },
    /// Remove `key`.
    Delete {
        /// Target collection.
        collection: String,
        /// Record key.
        key: String,
    },
}

/// Result of decoding one frame from a byte buffer.
#[derive(Debug)]
pub enum Frame {
    /// A valid frame and its total length in bytes.
    Complete(LogRecord, usize),
    /// The buffer ends inside a frame (a torn write).
    Torn,
}

impl LogRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::Put { .. } => LogRecordType::Put,
            Self::Delete { .. } => LogRecordType::Delete,
        }
    }

    /// Returns the target collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Put { collection, .. } | Self::Delete { collection, .. } => collection,
        }
    }

    /// Returns the record key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key, .. } => key,
        }
    }

    /// Serializes the record payload (without envelope).
    pub fn encode_payload(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        put_str(&mut buf, self.collection())?;
        put_str(&mut buf, self.key())?;

        if let Self::Put { value, .. } = self {
            let len = u32::try_from(value.len()).map_err(|_| {
                StoreError::Codec(format!("record too large: {} bytes", value.len()))
            })?;
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(value);
        }

        Ok(buf)
    }

    /// Builds the full frame: header, payload and CRC.
    pub fn encode_frame(&self) -> StoreResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::Codec("log frame payload too large".into()))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes a payload of the given type.
    ///
    /// `offset` is only used for error reporting.
    pub fn decode_payload(
        record_type: LogRecordType,
        payload: &[u8],
        offset: u64,
    ) -> StoreResult<Self> {
        let mut cursor = 0;
        let collection = read_str(payload, &mut cursor, offset)?;
        let key = read_str(payload, &mut cursor, offset)?;

        let record = match record_type {
            LogRecordType::Put => {
                let len_bytes = read_bytes(payload, &mut cursor, 4, offset)?;
                let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                    as usize;
                let value = read_bytes(payload, &mut cursor, len, offset)?.to_vec();
                Self::Put {
                    collection,
                    key,
                    value,
                }
            }
            LogRecordType::Delete => Self::Delete { collection, key },
        };

        if cursor != payload.len() {
            return Err(StoreError::corrupted(
                offset,
                format!(
                    "trailing bytes in {:?} frame: expected {} bytes, got {}",
                    record_type,
                    cursor,
                    payload.len()
                ),
            ));
        }

        Ok(record)
    }

    /// Decodes the frame starting at `offset` in `buf`.
    ///
    /// A frame that runs past the end of `buf` is reported as [`Frame::Torn`];
    /// a complete frame with a bad magic, version, type or checksum is an
    /// error.
    pub fn decode_frame(buf: &[u8], offset: usize) -> StoreResult<Frame> {
        let rest = &buf[offset..];
        if rest.len() < HEADER_SIZE {
            return Ok(Frame::Torn);
        }

        let at = offset as u64;
        if rest[0..4] != LOG_MAGIC {
            return Err(StoreError::corrupted(at, "invalid frame magic"));
        }

        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != LOG_VERSION {
            return Err(StoreError::corrupted(
                at,
                format!("unsupported frame version: {version}"),
            ));
        }

        let record_type = LogRecordType::from_byte(rest[6])
            .ok_or_else(|| StoreError::corrupted(at, format!("unknown frame type: {}", rest[6])))?;

        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < total {
            return Ok(Frame::Torn);
        }

        let crc_start = HEADER_SIZE + len;
        let stored_crc = u32::from_le_bytes([
            rest[crc_start],
            rest[crc_start + 1],
            rest[crc_start + 2],
            rest[crc_start + 3],
        ]);
        let computed_crc = crc32fast::hash(&rest[..crc_start]);
        if stored_crc != computed_crc {
            return Err(StoreError::corrupted(
                at,
                format!("checksum mismatch: expected {stored_crc:08x}, got {computed_crc:08x}"),
            ));
        }

        let record = Self::decode_payload(record_type, &rest[HEADER_SIZE..crc_start], at)?;
        Ok(Frame::Complete(record, total))
    }
}

fn put_str(buf: &mut Vec<u8>, value: &str) -> StoreResult<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| StoreError::Codec(format!("name or key too long: {} bytes", value.len())))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn read_bytes<'a>(
    payload: &'a [u8],
    cursor: &mut usize,
    len: usize,
    offset: u64,
) -> StoreResult<&'a [u8]> {
    let end = *cursor + len;
    if end > payload.len() {
        return Err(StoreError::corrupted(offset, "unexpected end of payload"));
    }
    let slice = &payload[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_str(payload: &[u8], cursor: &mut usize, offset: u64) -> StoreResult<String> {
    let len_bytes = read_bytes(payload, cursor, 2, offset)?;
    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
    let bytes = read_bytes(payload, cursor, len, offset)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| StoreError::corrupted(offset, "invalid utf-8 in frame"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put() -> LogRecord {
        LogRecord::Put {
            collection: "users".into(),
            key: "ada@oakhill.local".into(),
            value: vec![0xA1, 0x61, 0x61, 0x01],
        }
    }

    #[test]
    fn record_type_roundtrip() {
        for t in [LogRecordType::Put, LogRecordType::Delete] {
            assert_eq!(LogRecordType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(LogRecordType::from_byte(0), None);
    }

    #[test]
    fn put_frame_roundtrip() {
        let frame = put().encode_frame().unwrap();
        match LogRecord::decode_frame(&frame, 0).unwrap() {
            Frame::Complete(record, len) => {
                assert_eq!(record, put());
                assert_eq!(len, frame.len());
            }
            Frame::Torn => panic!("complete frame reported torn"),
        }
    }

    #[test]
    fn delete_frame_at_offset() {
        let delete = LogRecord::Delete {
            collection: "files".into(),
            key: "f-1".into(),
        };
        let mut buf = put().encode_frame().unwrap();
        let first_len = buf.len();
        buf.extend(delete.encode_frame().unwrap());

        match LogRecord::decode_frame(&buf, first_len).unwrap() {
            Frame::Complete(record, _) => assert_eq!(record, delete),
            Frame::Torn => panic!("complete frame reported torn"),
        }
    }

    #[test]
    fn short_buffer_is_torn() {
        let frame = put().encode_frame().unwrap();
        for cut in [1, HEADER_SIZE - 1, HEADER_SIZE + 2, frame.len() - 1] {
            assert!(matches!(
                LogRecord::decode_frame(&frame[..cut], 0).unwrap(),
                Frame::Torn
            ));
        }
    }

    #[test]
    fn checksum_mismatch_detected() {
        let mut frame = put().encode_frame().unwrap();
        frame[HEADER_SIZE + 3] ^= 0xFF;
        let err = LogRecord::decode_frame(&frame, 0).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn bad_magic_detected() {
        let mut frame = put().encode_frame().unwrap();
        frame[0] = b'X';
        assert!(LogRecord::decode_frame(&frame, 0).is_err());
    }
}
