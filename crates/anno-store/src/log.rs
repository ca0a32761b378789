//! Append-only log store.
//!
//! Every mutation is appended to a single log file; the full key space is
//! kept in memory and rebuilt by replaying the log on open.
//!
//! On-disk format, one frame per record:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized LogRecord)]
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append.
    EveryWrite,
    /// Flush to the OS and rely on page-cache write-back.
    #[default]
    OsDefault,
}

/// Configuration for a [`LogKvStore`].
#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
enum LogRecord {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

struct LogWriter {
    writer: BufWriter<File>,
    /// End of the last complete frame.
    offset: u64,
    /// Bytes of the next frame to write before failing the append.
    #[cfg(test)]
    fail_next_append_after: Option<usize>,
}

/// Key-value store persisted as an append-only, CRC-framed log.
///
/// Lock order is always index, then writer. Mutations hold the index write
/// lock across the append so the log order matches the in-memory order.
pub struct LogKvStore {
    path: PathBuf,
    index: RwLock<HashMap<String, Vec<u8>>>,
    writer: Mutex<LogWriter>,
    config: LogConfig,
}

impl LogKvStore {
    /// Open (or create) the log at `path` and replay it.
    ///
    /// A torn frame at the end of the file (crash mid-append) stops replay
    /// and is cut off so later appends stay reachable. A frame header that
    /// cannot be read while intact frames follow it is reported as
    /// [`StoreError::Corrupt`] and the file is left untouched.
    pub fn open(path: &Path, config: LogConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let file_len = file.metadata()?.len();

        let (index, valid_len) = replay(path, file_len)?;
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn tail of store log"
            );
            file.set_len(valid_len)?;
        }

        debug!(path = %path.display(), keys = index.len(), "store log opened");
        Ok(Self {
            path: path.to_path_buf(),
            index: RwLock::new(index),
            writer: Mutex::new(LogWriter {
                writer: BufWriter::new(file),
                offset: valid_len,
                #[cfg(test)]
                fail_next_append_after: None,
            }),
            config,
        })
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.index.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no keys are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes.
    pub fn log_size(&self) -> StoreResult<u64> {
        Ok(self.writer.lock().map_err(|_| StoreError::Poisoned)?.offset)
    }

    /// Rewrite the log so it holds exactly one `Put` per live key.
    ///
    /// The new log is written to a temporary file next to the old one and
    /// renamed over it.
    pub fn compact(&self) -> StoreResult<()> {
        let index = self.index.read().map_err(|_| StoreError::Poisoned)?;
        let mut w = self.writer.lock().map_err(|_| StoreError::Poisoned)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;

        let mut keys: Vec<&String> = index.keys().collect();
        keys.sort();
        let mut written = 0u64;
        for key in keys {
            let frame = encode_frame(&LogRecord::Put {
                key: key.clone(),
                value: index[key].clone(),
            })?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = w.offset;
        w.writer = BufWriter::new(file);
        w.offset = written;

        debug!(before, after = written, keys = index.len(), "store log compacted");
        Ok(())
    }

    /// Append one frame. On failure the log is cut back to the last complete
    /// frame so a partial write never sits in front of later appends.
    fn append(&self, w: &mut LogWriter, record: &LogRecord) -> StoreResult<()> {
        let frame = encode_frame(record)?;
        if let Err(e) = self.write_frame(w, &frame) {
            if let Err(reset) = self.discard_partial(w) {
                warn!(offset = w.offset, error = %reset, "cannot cut back failed log append");
            }
            return Err(e);
        }
        debug!(offset = w.offset, len = frame.len(), "store log append");
        w.offset += frame.len() as u64;
        Ok(())
    }

    fn write_frame(&self, w: &mut LogWriter, frame: &[u8]) -> StoreResult<()> {
        #[cfg(test)]
        if let Some(n) = w.fail_next_append_after.take() {
            w.writer.write_all(&frame[..n.min(frame.len())])?;
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "injected append failure",
            )));
        }

        w.writer.write_all(frame)?;
        w.writer.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Replace the writer and truncate the file to `w.offset`.
    fn discard_partial(&self, w: &mut LogWriter) -> StoreResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        // Dropping the old writer flushes whatever it still buffers, so the
        // truncation has to come after.
        drop(std::mem::replace(&mut w.writer, BufWriter::new(file)));
        w.writer.get_ref().set_len(w.offset)?;
        Ok(())
    }
}

impl KvStore for LogKvStore {
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let index = self.index.read().map_err(|_| StoreError::Poisoned)?;
        index.get(key).cloned().ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut index = self.index.write().map_err(|_| StoreError::Poisoned)?;
        let mut w = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        let record = LogRecord::Put {
            key: key.to_string(),
            value: value.to_vec(),
        };
        self.append(&mut w, &record)?;
        if let LogRecord::Put { key, value } = record {
            index.insert(key, value);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut index = self.index.write().map_err(|_| StoreError::Poisoned)?;
        if !index.contains_key(key) {
            return Err(StoreError::not_found(key));
        }
        let mut w = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        self.append(&mut w, &LogRecord::Delete { key: key.to_string() })?;
        index.remove(key);
        Ok(())
    }

    fn insert_new(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut index = self.index.write().map_err(|_| StoreError::Poisoned)?;
        if index.contains_key(key) {
            return Err(StoreError::already_exists(key));
        }
        let mut w = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        self.append(
            &mut w,
            &LogRecord::Put {
                key: key.to_string(),
                value: value.to_vec(),
            },
        )?;
        index.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        let index = self.index.read().map_err(|_| StoreError::Poisoned)?;
        Ok(index.contains_key(key))
    }
}

impl std::fmt::Debug for LogKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogKvStore")
            .field("path", &self.path)
            .field("key_count", &self.len())
            .finish()
    }
}

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len()).map_err(|_| StoreError::Corrupt {
        offset: 0,
        reason: format!("record of {} bytes exceeds frame limit", payload.len()),
    })?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Replay the log into a fresh index.
///
/// Returns the index and the offset just past the last complete frame.
/// Frames that fail the CRC check or cannot be decoded are skipped.
fn replay(path: &Path, file_len: u64) -> StoreResult<(HashMap<String, Vec<u8>>, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let mut index = HashMap::new();
    let mut offset: u64 = 0;
    let mut applied = 0usize;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            let mut rest = header.to_vec();
            file.read_to_end(&mut rest)?;
            if let Some(next) = next_intact_frame(&rest) {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: format!(
                        "invalid frame length {length}; intact frame follows at offset {}",
                        offset + next as u64
                    ),
                });
            }
            warn!(offset, length, file_len, "invalid log frame length at tail; stopping replay");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated log frame; stopping replay");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let frame_end = offset + HEADER_SIZE as u64 + length as u64;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping log frame"
            );
            offset = frame_end;
            continue;
        }

        match bincode::deserialize::<LogRecord>(&payload) {
            Ok(LogRecord::Put { key, value }) => {
                index.insert(key, value);
                applied += 1;
            }
            Ok(LogRecord::Delete { key }) => {
                index.remove(&key);
                applied += 1;
            }
            Err(e) => {
                warn!(offset, error = %e, "undecodable log frame; skipping");
            }
        }
        offset = frame_end;
    }

    debug!(applied, live = index.len(), "store log replay complete");
    Ok((index, offset))
}

/// Decode the frame at the start of `buf` if it is complete and intact.
fn decode_frame(buf: &[u8]) -> Option<LogRecord> {
    let header = buf.get(..HEADER_SIZE)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if length == 0 {
        return None;
    }
    let payload = buf.get(HEADER_SIZE..HEADER_SIZE.checked_add(length)?)?;
    if crc32fast::hash(payload) != crc {
        return None;
    }
    bincode::deserialize(payload).ok()
}

/// Position of the first intact frame in `rest` after its first byte.
fn next_intact_frame(rest: &[u8]) -> Option<usize> {
    (1..rest.len()).find(|&start| decode_frame(&rest[start..]).is_some())
}
