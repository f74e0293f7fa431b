//! Record layouts and little-endian field helpers.
//!
//! ```text
//! local header (30 + name)       central record (46 + name)      end record (22)
//! | PK\x03\x04          4 |      | PK\x01\x02          4 |       | PK\x05\x06      4 |
//! | version needed      2 |      | version made by     2 |       | disk            2 |
//! | flags               2 |      | version needed      2 |       | cd disk         2 |
//! | method              2 |      | flags               2 |       | entries (disk)  2 |
//! | mod time            2 |      | method              2 |       | entries (total) 2 |
//! | mod date            2 |      | mod time            2 |       | cd size         4 |
//! | crc32               4 |      | mod date            2 |       | cd offset       4 |
//! | compressed size     4 |      | crc32               4 |       | comment len     2 |
//! | uncompressed size   4 |      | compressed size     4 |
//! | name len            2 |      | uncompressed size   4 |
//! | extra len           2 |      | name len            2 |
//! | name                  |      | extra len           2 |
//!                                | comment len         2 |
//!                                | disk start          2 |
//!                                | internal attrs      2 |
//!                                | external attrs      4 |
//!                                | local header offset 4 |
//!                                | name                  |
//! ```

pub(crate) const LOCAL_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
pub(crate) const CENTRAL_SIGNATURE: [u8; 4] = *b"PK\x01\x02";
pub(crate) const END_SIGNATURE: [u8; 4] = *b"PK\x05\x06";

/// Version 2.0: the minimum for stored entries.
pub(crate) const VERSION: u16 = 20;
pub(crate) const METHOD_STORED: u16 = 0;

/// Flag bit 11: the entry name is UTF-8.
pub(crate) const FLAG_UTF8: u16 = 0x0800;

pub(crate) const LOCAL_HEADER_SIZE: usize = 30;
pub(crate) const CENTRAL_HEADER_SIZE: usize = 46;

/// Size of the end record with no comment.
pub const END_RECORD_SIZE: usize = 22;

pub(crate) fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn get_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

pub(crate) fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
