//! Verifying reader for stored archives.

use crate::crc::crc32;
use crate::error::{ArchiveError, ArchiveResult};
use crate::format::{
    get_u16, get_u32, CENTRAL_HEADER_SIZE, CENTRAL_SIGNATURE, END_RECORD_SIZE, END_SIGNATURE,
    LOCAL_HEADER_SIZE, LOCAL_SIGNATURE, METHOD_STORED,
};

/// One entry read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name.
    pub name: String,
    /// Payload bytes.
    pub data: Vec<u8>,
    /// CRC-32 recorded for the entry (already verified).
    pub crc32: u32,
    /// Offset of the entry's local header.
    pub offset: u32,
}

/// Parses `bytes` as a stored archive and verifies every entry.
///
/// The end record is located by scanning backwards, the central directory is
/// walked in order, each local header must agree with its directory record,
/// and every payload's CRC-32 is recomputed.
///
/// Only stored (method 0), unencrypted, single-disk archives are accepted.
pub fn read_archive(bytes: &[u8]) -> ArchiveResult<Vec<ArchiveEntry>> {
    let end = find_end_record(bytes)?;

    let disk = get_u16(bytes, end + 4);
    let cd_disk = get_u16(bytes, end + 6);
    let disk_entries = get_u16(bytes, end + 8);
    let total_entries = get_u16(bytes, end + 10);
    let cd_size = get_u32(bytes, end + 12) as usize;
    let cd_offset = get_u32(bytes, end + 16) as usize;

    if disk != 0 || cd_disk != 0 || disk_entries != total_entries {
        return Err(ArchiveError::malformed(end, "multi-disk archives are not supported"));
    }
    if cd_offset.checked_add(cd_size) != Some(end) {
        return Err(ArchiveError::malformed(
            end,
            format!("central directory {cd_offset}+{cd_size} does not end at the end record"),
        ));
    }

    let mut entries = Vec::with_capacity(usize::from(total_entries));
    let mut at = cd_offset;
    for _ in 0..total_entries {
        let (entry, next) = read_central_record(bytes, at, end)?;
        entries.push(entry);
        at = next;
    }
    if at != end {
        return Err(ArchiveError::malformed(at, "trailing bytes in central directory"));
    }

    Ok(entries)
}

fn find_end_record(bytes: &[u8]) -> ArchiveResult<usize> {
    if bytes.len() < END_RECORD_SIZE {
        return Err(ArchiveError::malformed(0, "too short to hold an end record"));
    }

    let last = bytes.len() - END_RECORD_SIZE;
    let first = last.saturating_sub(usize::from(u16::MAX));
    (first..=last)
        .rev()
        .find(|&at| {
            bytes[at..at + 4] == END_SIGNATURE
                && at + END_RECORD_SIZE + usize::from(get_u16(bytes, at + 20)) == bytes.len()
        })
        .ok_or_else(|| ArchiveError::malformed(last, "end of central directory not found"))
}

fn read_central_record(
    bytes: &[u8],
    at: usize,
    cd_end: usize,
) -> ArchiveResult<(ArchiveEntry, usize)> {
    if at + CENTRAL_HEADER_SIZE > cd_end || bytes[at..at + 4] != CENTRAL_SIGNATURE {
        return Err(ArchiveError::malformed(at, "expected central directory record"));
    }

    let flags = get_u16(bytes, at + 8);
    let method = get_u16(bytes, at + 10);
    let crc = get_u32(bytes, at + 16);
    let compressed = get_u32(bytes, at + 20);
    let size = get_u32(bytes, at + 24);
    let name_len = usize::from(get_u16(bytes, at + 28));
    let extra_len = usize::from(get_u16(bytes, at + 30));
    let comment_len = usize::from(get_u16(bytes, at + 32));
    let offset = get_u32(bytes, at + 42);

    if flags & 0x0001 != 0 {
        return Err(ArchiveError::malformed(at, "encrypted entries are not supported"));
    }
    if method != METHOD_STORED || compressed != size {
        return Err(ArchiveError::malformed(
            at,
            format!("unsupported compression method {method}"),
        ));
    }

    let name_start = at + CENTRAL_HEADER_SIZE;
    let next = name_start + name_len + extra_len + comment_len;
    if next > cd_end {
        return Err(ArchiveError::malformed(at, "central directory record overruns directory"));
    }
    let name_bytes = &bytes[name_start..name_start + name_len];
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| ArchiveError::malformed(name_start, "entry name is not UTF-8"))?
        .to_owned();

    let data = read_local_entry(bytes, offset as usize, name_bytes, size as usize)?;
    let actual = crc32(data);
    if actual != crc {
        return Err(ArchiveError::ChecksumMismatch {
            name,
            expected: crc,
            actual,
        });
    }

    Ok((
        ArchiveEntry {
            name,
            data: data.to_vec(),
            crc32: crc,
            offset,
        },
        next,
    ))
}

fn read_local_entry<'a>(
    bytes: &'a [u8],
    at: usize,
    name: &[u8],
    size: usize,
) -> ArchiveResult<&'a [u8]> {
    if at + LOCAL_HEADER_SIZE > bytes.len() || bytes[at..at + 4] != LOCAL_SIGNATURE {
        return Err(ArchiveError::malformed(at, "expected local file header"));
    }

    let name_len = usize::from(get_u16(bytes, at + 26));
    let extra_len = usize::from(get_u16(bytes, at + 28));
    let name_start = at + LOCAL_HEADER_SIZE;
    let data_start = name_start + name_len + extra_len;
    let data_end = data_start + size;
    if data_end > bytes.len() {
        return Err(ArchiveError::malformed(at, "entry data overruns archive"));
    }
    if &bytes[name_start..name_start + name_len] != name {
        return Err(ArchiveError::malformed(
            at,
            "local header name differs from central directory",
        ));
    }
    if get_u32(bytes, at + 22) as usize != size {
        return Err(ArchiveError::malformed(
            at,
            "local header size differs from central directory",
        ));
    }

    Ok(&bytes[data_start..data_end])
}
