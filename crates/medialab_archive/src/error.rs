//! Archive error types.

use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors raised while building or reading an archive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    /// An entry name does not fit the 16-bit length field.
    #[error("entry name is {len} bytes; the limit is 65535")]
    NameTooLong {
        /// Name length in bytes.
        len: usize,
    },

    /// An entry payload does not fit the 32-bit size field.
    #[error("entry {name} is {len} bytes; the limit is 4294967295")]
    EntryTooLarge {
        /// Entry name.
        name: String,
        /// Payload length in bytes.
        len: usize,
    },

    /// More entries than the 16-bit count fields can hold.
    #[error("archive has more than 65535 entries")]
    TooManyEntries,

    /// An offset or the directory size does not fit in 32 bits.
    #[error("archive exceeds 4 GiB")]
    ArchiveTooLarge,

    /// The bytes are not a well-formed stored archive.
    #[error("malformed archive at offset {offset}: {message}")]
    Malformed {
        /// Byte offset of the problem.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// An entry's payload does not match its recorded CRC-32.
    #[error("checksum mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Entry name.
        name: String,
        /// CRC recorded in the directory.
        expected: u32,
        /// CRC of the payload.
        actual: u32,
    },
}

impl ArchiveError {
    pub(crate) fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            message: message.into(),
        }
    }
}
