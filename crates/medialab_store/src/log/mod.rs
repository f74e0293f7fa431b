//! Append-only record log.
//!
//! Every put and delete is appended as one checksummed frame. On open the
//! log is replayed in order; the last frame for a key wins.

mod record;

pub use record::{Frame, LogRecord, LogRecordType, CRC_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION};

use crate::error::StoreResult;
use crate::storage::{StorageBackend, StorageResult};
use tracing::warn;

/// Outcome of replaying a log.
#[derive(Debug, Default)]
pub struct Replay {
    /// Every complete frame, in log order.
    pub records: Vec<LogRecord>,
    /// Bytes of a torn final frame that were cut off.
    pub torn_bytes: u64,
}

/// Writes and replays the record log.
pub struct RecordLog {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
}

impl RecordLog {
    /// Creates a log over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
        }
    }

    /// Appends one record and returns the offset of its frame.
    ///
    /// The frame is written with a single backend append so a crash leaves
    /// at most one torn frame at the tail. If the write fails, the log is
    /// cut back to where the frame started.
    pub fn append(&mut self, record: &LogRecord) -> StoreResult<u64> {
        let frame = record.encode_frame()?;
        let before = self.backend.size()?;
        match self.write_frame(&frame) {
            Ok(offset) => Ok(offset),
            Err(err) => {
                if let Err(undo) = self.backend.truncate(before) {
                    warn!(before, error = %undo, "could not cut off a failed append");
                }
                Err(err.into())
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> StorageResult<u64> {
        let offset = self.backend.append(frame)?;
        if self.sync_on_write {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Reads every frame.
    ///
    /// A torn final frame is truncated away so later appends start on a
    /// frame boundary. Any other invalid frame is returned as corruption.
    pub fn replay(&mut self) -> StoreResult<Replay> {
        let data = self.backend.read_all()?;
        let mut replay = Replay::default();
        let mut offset = 0;

        while offset < data.len() {
            match LogRecord::decode_frame(&data, offset)? {
                Frame::Complete(record, len) => {
                    replay.records.push(record);
                    offset += len;
                }
                Frame::Torn => {
                    replay.torn_bytes = (data.len() - offset) as u64;
                    warn!(
                        offset,
                        torn_bytes = replay.torn_bytes,
                        "discarding torn frame at end of record log"
                    );
                    self.backend.truncate(offset as u64)?;
                    break;
                }
            }
        }

        Ok(replay)
    }

    /// Replaces the whole log with `records`.
    pub fn rewrite<'a>(&mut self, records: impl IntoIterator<Item = &'a LogRecord>) -> StoreResult<()> {
        let mut data = Vec::new();
        for record in records {
            data.extend(record.encode_frame()?);
        }
        self.backend.replace(&data)?;
        Ok(())
    }

    /// Makes all appended frames durable.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Returns the log size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.size()?)
    }
}
