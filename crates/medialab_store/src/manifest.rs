//! Store manifest: schema version and collection registry.
//!
//! ```text
//! | magic "MLMF" (4) | manifest_version u16 | schema_version u64 | count u32 |
//! | (name_len u16, name, key_path_len u16, key_path)* | crc32 u32 |
//! ```
//!
//! All integers are little-endian. The CRC covers every byte before it.

use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;

/// Magic bytes for the manifest file.
pub const MANIFEST_MAGIC: [u8; 4] = *b"MLMF";

/// Current manifest layout version.
pub const MANIFEST_VERSION: u16 = 1;

/// Persisted store metadata.
///
/// A manifest with `schema_version == 0` describes a store that has never
/// been upgraded; it is never written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Current schema version.
    pub schema_version: u64,
    /// Collection name to key path.
    pub collections: BTreeMap<String, String>,
}

impl Manifest {
    /// Returns the key path of a collection.
    #[must_use]
    pub fn key_path(&self, collection: &str) -> Option<&str> {
        self.collections.get(collection).map(String::as_str)
    }

    /// Encodes the manifest to bytes.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MANIFEST_MAGIC);
        buf.extend_from_slice(&MANIFEST_VERSION.to_le_bytes());
        buf.extend_from_slice(&self.schema_version.to_le_bytes());

        let count = u32::try_from(self.collections.len())
            .map_err(|_| StoreError::invalid_collection("too many collections"))?;
        buf.extend_from_slice(&count.to_le_bytes());

        for (name, key_path) in &self.collections {
            put_str(&mut buf, name)?;
            put_str(&mut buf, key_path)?;
        }

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes a manifest from bytes.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < 4 || data[0..4] != MANIFEST_MAGIC {
            return Err(StoreError::corrupted(0, "invalid manifest magic"));
        }
        if data.len() < 4 + 2 + 8 + 4 + 4 {
            return Err(StoreError::corrupted(0, "manifest too short"));
        }

        let (body, crc_bytes) = data.split_at(data.len() - 4);
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let computed_crc = crc32fast::hash(body);
        if stored_crc != computed_crc {
            return Err(StoreError::corrupted(
                body.len() as u64,
                format!("manifest checksum mismatch: expected {stored_crc:08x}, got {computed_crc:08x}"),
            ));
        }

        let mut reader = Reader { data: body, cursor: 4 };

        let version = reader.u16()?;
        if version > MANIFEST_VERSION {
            return Err(StoreError::corrupted(
                4,
                format!("unsupported manifest version: {version}"),
            ));
        }

        let schema_version = reader.u64()?;
        let count = reader.u32()?;

        let mut collections = BTreeMap::new();
        for _ in 0..count {
            let name = reader.string()?;
            let key_path = reader.string()?;
            collections.insert(name, key_path);
        }

        if reader.cursor != body.len() {
            return Err(StoreError::corrupted(
                reader.cursor as u64,
                "trailing bytes in manifest",
            ));
        }

        Ok(Self {
            schema_version,
            collections,
        })
    }
}

fn put_str(buf: &mut Vec<u8>, value: &str) -> StoreResult<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| StoreError::invalid_collection(format!("name too long: {value}")))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> StoreResult<&'a [u8]> {
        let end = self.cursor + len;
        if end > self.data.len() {
            return Err(StoreError::corrupted(self.cursor as u64, "manifest too short"));
        }
        let slice = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn u16(&mut self) -> StoreResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> StoreResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> StoreResult<u64> {
        let b = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(b);
        Ok(u64::from_le_bytes(bytes))
    }

    fn string(&mut self) -> StoreResult<String> {
        let len = self.u16()? as usize;
        let start = self.cursor;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| StoreError::corrupted(start as u64, "invalid collection name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        let mut manifest = Manifest {
            schema_version: 12,
            ..Manifest::default()
        };
        manifest
            .collections
            .insert("users".into(), "email".into());
        manifest
            .collections
            .insert("settings".into(), "key".into());
        manifest
    }

    #[test]
    fn encode_decode_roundtrip() {
        let manifest = sample();
        let decoded = Manifest::decode(&manifest.encode().unwrap()).unwrap();
        assert_eq!(decoded, manifest);
        assert_eq!(decoded.key_path("users"), Some("email"));
        assert_eq!(decoded.key_path("files"), None);
    }

    #[test]
    fn empty_collection_list() {
        let manifest = Manifest {
            schema_version: 1,
            ..Manifest::default()
        };
        let decoded = Manifest::decode(&manifest.encode().unwrap()).unwrap();
        assert!(decoded.collections.is_empty());
        assert_eq!(decoded.schema_version, 1);
    }

    #[test]
    fn invalid_magic_rejected() {
        assert!(Manifest::decode(b"XXXX").is_err());
    }

    #[test]
    fn flipped_bit_rejected() {
        let mut bytes = sample().encode().unwrap();
        bytes[8] ^= 0x01;
        let err = Manifest::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn truncated_manifest_rejected() {
        let bytes = sample().encode().unwrap();
        assert!(Manifest::decode(&bytes[..bytes.len() - 6]).is_err());
    }
}
