//! Single-slot persistence of the sealed license.
//!
//! The file holds raw [`EncodedLicense`] bytes and nothing else. Writes go to
//! a sibling temp file that is created owner-only, synced to disk, then
//! renamed over the slot, so a crash mid-write leaves either the old or the
//! new license, never a torn or empty one.

use crate::codec::EncodedLicense;
use crate::error::{LicenseError, LicenseResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File name of the license slot inside the data directory.
pub const LICENSE_FILE_NAME: &str = "license.bin";

/// Outcome of [`LicenseStore::load_or_insert_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEntry {
    /// The slot already held a license; nothing was written.
    Existing(EncodedLicense),
    /// The slot was empty and the new license was saved.
    Inserted(EncodedLicense),
}

/// Persists exactly one sealed license.
#[derive(Debug)]
pub struct LicenseStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LicenseStore {
    /// Creates a store backed by `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the default slot: `<data dir>/tether/license.bin`.
    pub fn default_path() -> LicenseResult<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("tether").join(LICENSE_FILE_NAME))
            .ok_or_else(|| LicenseError::Storage("no data directory on this platform".to_string()))
    }

    /// Returns the slot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the slot. A missing or empty file is `None`, not an error.
    pub fn load(&self) -> LicenseResult<Option<EncodedLicense>> {
        let _guard = self.guard();
        self.read_slot()
    }

    /// Atomically replaces the slot.
    pub fn save(&self, blob: &EncodedLicense) -> LicenseResult<()> {
        let _guard = self.guard();
        self.write_slot(blob)
    }

    /// Returns the stored license, or saves the one built by `init` when the
    /// slot is empty. The read and the write happen under a single lock, so no
    /// other `save` can land in between.
    ///
    /// `init` is only called for an empty slot.
    pub fn load_or_insert_with<F>(&self, init: F) -> LicenseResult<SlotEntry>
    where
        F: FnOnce() -> LicenseResult<EncodedLicense>,
    {
        let _guard = self.guard();
        if let Some(existing) = self.read_slot()? {
            return Ok(SlotEntry::Existing(existing));
        }
        let blob = init()?;
        self.write_slot(&blob)?;
        Ok(SlotEntry::Inserted(blob))
    }

    /// Removes the slot. Removing an absent slot is not an error.
    pub fn clear(&self) -> LicenseResult<()> {
        let _guard = self.guard();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "license cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_slot(&self) -> LicenseResult<Option<EncodedLicense>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(EncodedLicense::from_bytes(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Temp file, owner-only mode, write, fsync, rename. Caller holds the lock.
    fn write_slot(&self, blob: &EncodedLicense) -> LicenseResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
        }
        temp.write_all(blob.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| LicenseError::from(e.error))?;

        info!(path = %self.path.display(), bytes = blob.len(), "license saved");
        Ok(())
    }

    /// Recovers from poisoning; the slot is only ever replaced by rename.
    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
