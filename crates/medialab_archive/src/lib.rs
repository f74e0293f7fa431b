//! # MediaLab Archive
//!
//! Builds minimal "stored" (uncompressed) ZIP archives, byte for byte, and
//! reads them back with full verification.
//!
//! Every entry is written as a local header followed by its raw payload;
//! a central directory and an end record follow. Timestamps are zero and
//! names are written as given. The output opens in any standard unzip tool.
//!
//! ```rust
//! use medialab_archive::{build, read_archive, Entry};
//!
//! let zip = build(&[Entry::new("notes.txt", b"Scene 1: exterior".to_vec())]).unwrap();
//! let entries = read_archive(&zip).unwrap();
//! assert_eq!(entries[0].name, "notes.txt");
//! assert_eq!(entries[0].data, b"Scene 1: exterior");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod crc;
mod error;
mod format;
mod reader;

pub use builder::{build, ArchiveBuilder, Entry};
pub use crc::{crc32, Crc32};
pub use error::{ArchiveError, ArchiveResult};
pub use format::END_RECORD_SIZE;
pub use reader::{read_archive, ArchiveEntry};
