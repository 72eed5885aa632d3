// SPDX-License-Identifier: AGPL-3.0-or-later

//! Write-ahead log: durability is a sequence of `bincode`-encoded, full-state
//! snapshots of `StoreInner` (§4.1.1). Only the most recent snapshot matters
//! for replay; compaction simply truncates the file down to it.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

use crate::persistence::{error::StoreError, store::StoreInner};

pub struct Wal {
    path: PathBuf,
    file: Mutex<File>,
}

impl Wal {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
        Ok(Wal { path, file: Mutex::new(file) })
    }

    /// Appends one committed transaction's resulting full state as a new
    /// length-prefixed record. This is the single durability point.
    pub fn append(&self, snapshot: &StoreInner) -> Result<(), StoreError> {
        let encoded = bincode::serialize(snapshot)?;
        let mut file = self.file.lock();
        file.write_all(&(encoded.len() as u64).to_le_bytes())
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.write_all(&encoded)
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.flush().map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })
    }

    /// Replays the log, returning the last recorded snapshot, or `None` if
    /// the log is empty (fresh store).
    pub fn replay(&self) -> Result<Option<StoreInner>, StoreError> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;

        let mut offset = 0usize;
        let mut last = None;
        while offset < buf.len() {
            if offset + 8 > buf.len() {
                return Err(StoreError::WalCorrupt { offset: offset as u64 });
            }
            let len = u64::from_le_bytes(buf[offset..offset + 8].try_into().expect("8 bytes"));
            offset += 8;
            let end = offset + len as usize;
            if end > buf.len() {
                return Err(StoreError::WalCorrupt { offset: offset as u64 });
            }
            let record: StoreInner = bincode::deserialize(&buf[offset..end])?;
            last = Some(record);
            offset = end;
        }
        Ok(last)
    }

    /// Rewrites the log to contain only `snapshot` (called every N committed
    /// transactions per `PersistenceConfig::compact_every_n_txns`).
    pub fn compact(&self, snapshot: &StoreInner) -> Result<(), StoreError> {
        let encoded = bincode::serialize(snapshot)?;
        let mut file = self.file.lock();
        file.set_len(0).map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.seek(SeekFrom::Start(0))
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.write_all(&encoded)
            .map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })?;
        file.flush().map_err(|source| StoreError::Io { path: self.path.display().to_string(), source })
    }
}
