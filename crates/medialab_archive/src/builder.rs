//! Archive construction.

use crate::crc::crc32;
use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    put_u16, put_u32, CENTRAL_HEADER_SIZE, CENTRAL_SIGNATURE, END_RECORD_SIZE, END_SIGNATURE,
    FLAG_UTF8, LOCAL_HEADER_SIZE, LOCAL_SIGNATURE, METHOD_STORED, VERSION,
};
use tracing::debug;

/// A named payload to pack into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry name, stored as UTF-8 bytes.
    pub name: String,
    /// Payload, stored verbatim.
    pub data: Vec<u8>,
}

impl Entry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Packs `entries`, in order, into a complete stored archive.
///
/// An empty slice yields the 22-byte end record alone, which readers open
/// as an archive with no entries.
///
/// # Errors
///
/// Fails only when a 16- or 32-bit field would overflow: see
/// [`ArchiveError`].
pub fn build(entries: &[Entry]) -> ArchiveResult<Vec<u8>> {
    let capacity = entries
        .iter()
        .map(|e| LOCAL_HEADER_SIZE + CENTRAL_HEADER_SIZE + 2 * e.name.len() + e.data.len())
        .sum::<usize>()
        + END_RECORD_SIZE;

    let mut builder = ArchiveBuilder::with_capacity(capacity);
    for entry in entries {
        builder.add(&entry.name, &entry.data)?;
    }
    builder.finish()
}

#[derive(Debug)]
struct CentralRecord {
    name: Vec<u8>,
    flags: u16,
    crc: u32,
    size: u32,
    offset: u32,
}

/// Incremental archive writer.
///
/// Local headers and payloads are written as entries are added; the central
/// directory and end record are appended by [`ArchiveBuilder::finish`].
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    buf: Vec<u8>,
    central: Vec<CentralRecord>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with room for `capacity` output bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            central: Vec::new(),
        }
    }

    /// Number of entries added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.central.len()
    }

    /// Returns true if no entries have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.central.is_empty()
    }

    /// Appends one stored entry.
    pub fn add(&mut self, name: &str, data: &[u8]) -> ArchiveResult<&mut Self> {
        if self.central.len() >= usize::from(u16::MAX) {
            return Err(ArchiveError::TooManyEntries);
        }
        let name_len = u16::try_from(name.len())
            .map_err(|_| ArchiveError::NameTooLong { len: name.len() })?;
        let size = u32::try_from(data.len()).map_err(|_| ArchiveError::EntryTooLarge {
            name: name.to_owned(),
            len: data.len(),
        })?;
        let offset = u32::try_from(self.buf.len()).map_err(|_| ArchiveError::ArchiveTooLarge)?;
        let crc = crc32(data);
        let flags = name_flags(name);

        let buf = &mut self.buf;
        buf.extend_from_slice(&LOCAL_SIGNATURE);
        put_u16(buf, VERSION);
        put_u16(buf, flags);
        put_u16(buf, METHOD_STORED);
        put_u16(buf, 0); // time
        put_u16(buf, 0); // date
        put_u32(buf, crc);
        put_u32(buf, size);
        put_u32(buf, size);
        put_u16(buf, name_len);
        put_u16(buf, 0); // extra
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(data);

        debug!(name, size, offset, crc, "archive entry added");
        self.central.push(CentralRecord {
            name: name.as_bytes().to_vec(),
            flags,
            crc,
            size,
            offset,
        });
        Ok(self)
    }

    /// Writes the central directory and end record and returns the archive.
    pub fn finish(self) -> ArchiveResult<Vec<u8>> {
        let Self { mut buf, central } = self;

        let cd_offset = u32::try_from(buf.len()).map_err(|_| ArchiveError::ArchiveTooLarge)?;
        for record in &central {
            buf.extend_from_slice(&CENTRAL_SIGNATURE);
            put_u16(&mut buf, VERSION); // made by
            put_u16(&mut buf, VERSION); // needed
            put_u16(&mut buf, record.flags);
            put_u16(&mut buf, METHOD_STORED);
            put_u16(&mut buf, 0); // time
            put_u16(&mut buf, 0); // date
            put_u32(&mut buf, record.crc);
            put_u32(&mut buf, record.size);
            put_u32(&mut buf, record.size);
            // Name length was checked in `add`.
            put_u16(&mut buf, record.name.len() as u16);
            put_u16(&mut buf, 0); // extra
            put_u16(&mut buf, 0); // comment
            put_u16(&mut buf, 0); // disk
            put_u16(&mut buf, 0); // internal attrs
            put_u32(&mut buf, 0); // external attrs
            put_u32(&mut buf, record.offset);
            buf.extend_from_slice(&record.name);
        }
        let cd_size = u32::try_from(buf.len() - cd_offset as usize)
            .map_err(|_| ArchiveError::ArchiveTooLarge)?;
        // Count was capped in `add`.
        let count = central.len() as u16;

        buf.extend_from_slice(&END_SIGNATURE);
        put_u16(&mut buf, 0); // disk
        put_u16(&mut buf, 0); // cd disk
        put_u16(&mut buf, count);
        put_u16(&mut buf, count);
        put_u32(&mut buf, cd_size);
        put_u32(&mut buf, cd_offset);
        put_u16(&mut buf, 0); // comment

        debug!(entries = count, bytes = buf.len(), "archive finished");
        Ok(buf)
    }
}

/// Names outside ASCII are marked UTF-8 so readers don't fall back to CP437.
fn name_flags(name: &str) -> u16 {
    if name.is_ascii() {
        0
    } else {
        FLAG_UTF8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{get_u16, get_u32};

    #[test]
    fn empty_archive_is_bare_end_record() {
        let zip = build(&[]).unwrap();
        let mut expected = b"PK\x05\x06".to_vec();
        expected.extend_from_slice(&[0; 18]);
        assert_eq!(zip, expected);
        assert_eq!(zip.len(), END_RECORD_SIZE);
    }

    #[test]
    fn single_entry_layout() {
        let zip = build(&[Entry::new("a.txt", b"hello".to_vec())]).unwrap();

        // Local header
        assert_eq!(&zip[0..4], b"PK\x03\x04");
        assert_eq!(get_u16(&zip, 4), 20);
        assert_eq!(get_u16(&zip, 8), 0);
        assert_eq!(get_u32(&zip, 14), crc32(b"hello"));
        assert_eq!(get_u32(&zip, 18), 5);
        assert_eq!(get_u32(&zip, 22), 5);
        assert_eq!(get_u16(&zip, 26), 5);
        assert_eq!(get_u16(&zip, 28), 0);
        assert_eq!(&zip[30..35], b"a.txt");
        assert_eq!(&zip[35..40], b"hello");

        // Central directory
        let cd = 40;
        assert_eq!(&zip[cd..cd + 4], b"PK\x01\x02");
        assert_eq!(get_u16(&zip, cd + 4), 20);
        assert_eq!(get_u16(&zip, cd + 6), 20);
        assert_eq!(get_u32(&zip, cd + 16), crc32(b"hello"));
        assert_eq!(get_u32(&zip, cd + 42), 0);
        assert_eq!(&zip[cd + 46..cd + 51], b"a.txt");

        // End record
        let end = cd + 51;
        assert_eq!(&zip[end..end + 4], b"PK\x05\x06");
        assert_eq!(get_u16(&zip, end + 8), 1);
        assert_eq!(get_u16(&zip, end + 10), 1);
        assert_eq!(get_u32(&zip, end + 12), 51);
        assert_eq!(get_u32(&zip, end + 16), 40);
        assert_eq!(zip.len(), end + END_RECORD_SIZE);
    }

    #[test]
    fn offsets_accumulate() {
        let zip = build(&[
            Entry::new("one.pdf", vec![1; 10]),
            Entry::new("two.docx", vec![2; 3]),
        ])
        .unwrap();

        let second_local = LOCAL_HEADER_SIZE + 7 + 10;
        assert_eq!(&zip[second_local..second_local + 4], b"PK\x03\x04");

        let cd = second_local + LOCAL_HEADER_SIZE + 8 + 3;
        assert_eq!(get_u32(&zip, cd + 42), 0);
        let second_central = cd + CENTRAL_HEADER_SIZE + 7;
        assert_eq!(get_u32(&zip, second_central + 42), second_local as u32);
    }

    #[test]
    fn builder_matches_build() {
        let mut builder = ArchiveBuilder::new();
        builder.add("x", b"1").unwrap().add("y", b"22").unwrap();
        assert_eq!(builder.len(), 2);
        let incremental = builder.finish().unwrap();

        let batch = build(&[Entry::new("x", b"1".to_vec()), Entry::new("y", b"22".to_vec())]).unwrap();
        assert_eq!(incremental, batch);
    }

    #[test]
    fn non_ascii_names_carry_utf8_flag() {
        let zip = build(&[
            Entry::new("a.txt", b"x".to_vec()),
            Entry::new("plan-ñ.pdf", b"y".to_vec()),
        ])
        .unwrap();

        let second_local = LOCAL_HEADER_SIZE + 5 + 1;
        assert_eq!(get_u16(&zip, 6), 0);
        assert_eq!(get_u16(&zip, second_local + 6), FLAG_UTF8);

        let name_len = "plan-ñ.pdf".len();
        let cd = second_local + LOCAL_HEADER_SIZE + name_len + 1;
        assert_eq!(&zip[cd..cd + 4], b"PK\x01\x02");
        assert_eq!(get_u16(&zip, cd + 8), 0);
        let second_central = cd + CENTRAL_HEADER_SIZE + 5;
        assert_eq!(get_u16(&zip, second_central + 8), FLAG_UTF8);
        assert_eq!(&zip[second_central + 46..second_central + 46 + name_len], "plan-ñ.pdf".as_bytes());
    }

    #[test]
    fn long_name_rejected() {
        let name = "n".repeat(usize::from(u16::MAX) + 1);
        let err = ArchiveBuilder::new().add(&name, b"").unwrap_err();
        assert_eq!(err, ArchiveError::NameTooLong { len: name.len() });
    }
}
