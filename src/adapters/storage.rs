//! File-backed persistence.
//!
//! Implements both [`StatePort`] and [`HistoryLogPort`] over a data
//! directory:
//!
//! - `state.json`: config and counters as one JSON record.  Every save
//!   writes a temp file and renames it over the old one, so a power cut
//!   leaves either the old or the new record, never a torn one.
//! - `history.bin`: HVAC transitions, one postcard COBS frame each,
//!   appended as they happen and rewritten in full on compaction.  A
//!   frame cut short by a crash is skipped on load.
//!
//! The record (config and counters) is validated on both load and save.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{HistoryLogPort, PersistError, StatePort};
use crate::config::StateRecord;
use crate::history::HistoryEntry;

const STATE_FILE: &str = "state.json";
const HISTORY_FILE: &str = "history.bin";

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` for all files, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("FileStore: data directory {}", dir.display());
        Ok(Self { dir })
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn encode_frame(entry: &HistoryEntry) -> Result<Vec<u8>, PersistError> {
    postcard::to_allocvec_cobs(entry).map_err(|_| PersistError::Encode)
}

/// Decode every complete frame.  Undecodable frames are counted and
/// skipped; trailing bytes without a terminator are ignored.
fn decode_frames(bytes: &mut [u8]) -> (Vec<HistoryEntry>, usize) {
    let mut entries = Vec::new();
    let mut bad = 0;
    let mut rest = bytes;
    while let Some(end) = rest.iter().position(|&b| b == 0) {
        let (frame, tail) = std::mem::take(&mut rest).split_at_mut(end + 1);
        if frame.len() > 1 {
            match postcard::from_bytes_cobs::<HistoryEntry>(frame) {
                Ok(entry) => entries.push(entry),
                Err(_) => bad += 1,
            }
        }
        rest = tail;
    }
    (entries, bad)
}

// ── StatePort implementation ──────────────────────────────────

impl StatePort for FileStore {
    fn load(&self) -> Result<StateRecord, PersistError> {
        let bytes = fs::read(self.state_path())?;
        let record: StateRecord =
            serde_json::from_slice(&bytes).map_err(|_| PersistError::Corrupted)?;
        record.validate()?;
        info!("FileStore: loaded state record");
        Ok(record)
    }

    fn save(&mut self, record: &StateRecord) -> Result<(), PersistError> {
        record.validate()?;
        let json = serde_json::to_vec_pretty(record).map_err(|_| PersistError::Encode)?;
        write_atomic(&self.state_path(), &json)
    }
}

// ── HistoryLogPort implementation ─────────────────────────────

impl HistoryLogPort for FileStore {
    fn load_history(&self) -> Result<Vec<HistoryEntry>, PersistError> {
        let mut bytes = match fs::read(self.history_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let (entries, bad) = decode_frames(&mut bytes);
        if bad > 0 {
            warn!("FileStore: skipped {bad} corrupt history frames");
        }
        Ok(entries)
    }

    fn append(&mut self, entry: &HistoryEntry) -> Result<(), PersistError> {
        let frame = encode_frame(entry)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())?;
        f.write_all(&frame)?;
        Ok(())
    }

    fn compact(&mut self, entries: &[HistoryEntry]) -> Result<(), PersistError> {
        let mut buf = Vec::with_capacity(entries.len() * 8);
        for entry in entries {
            buf.extend_from_slice(&encode_frame(entry)?);
        }
        write_atomic(&self.history_path(), &buf)
    }
}
