//! Data directory management.
//!
//! ```text
//! <data-dir>/
//! ├─ LOCK                      # Advisory lock, one server per directory
//! └─ clients/
//!    └─ <client-uuid>/
//!       ├─ versions.log        # Append-only version log
//!       └─ snapshot.bin        # Latest snapshot, replaced atomically
//! ```

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Lock file name.
pub const LOCK_FILE: &str = "LOCK";
/// Subdirectory holding one directory per client.
pub const CLIENTS_DIR: &str = "clients";
/// Version log file name inside a client directory.
pub const LOG_FILE: &str = "versions.log";
/// Snapshot file name inside a client directory.
pub const SNAPSHOT_FILE: &str = "snapshot.bin";

const SNAPSHOT_TEMP: &str = "snapshot.bin.tmp";
const PROBE_FILE: &str = ".write-probe";

/// An opened, locked and verified data directory.
///
/// Holding a `DataDir` means the directory exists, is writable by this
/// process, and no other process holds the lock. The lock is released when
/// the value is dropped.
#[derive(Debug)]
pub struct DataDir {
    root: PathBuf,
    _lock_file: File,
}

impl DataDir {
    /// Opens the data directory, creating it and its `clients/` subdirectory
    /// if they are missing.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotWritable`] if the directory cannot be created or
    ///   a probe file cannot be written
    /// - [`StorageError::NotADirectory`] if `path` is a regular file
    /// - [`StorageError::Locked`] if another process owns the directory
    pub fn open(path: &Path) -> StorageResult<Self> {
        let not_writable = |source| StorageError::NotWritable {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() && !path.is_dir() {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        fs::create_dir_all(path.join(CLIENTS_DIR)).map_err(not_writable)?;

        // Ownership is provisioned externally; fail fast if it was not.
        let probe = path.join(PROBE_FILE);
        File::create(&probe)
            .and_then(|mut f| f.write_all(b"ok"))
            .map_err(not_writable)?;
        fs::remove_file(&probe).map_err(not_writable)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))
            .map_err(not_writable)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            root: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Returns the directory holding all client directories.
    #[must_use]
    pub fn clients_dir(&self) -> PathBuf {
        self.root.join(CLIENTS_DIR)
    }

    /// Returns the directory for one client.
    #[must_use]
    pub fn client_dir(&self, client: &Uuid) -> PathBuf {
        self.clients_dir().join(client.hyphenated().to_string())
    }

    /// Returns the version log path for one client.
    #[must_use]
    pub fn log_path(&self, client: &Uuid) -> PathBuf {
        self.client_dir(client).join(LOG_FILE)
    }

    /// Returns the snapshot path for one client.
    #[must_use]
    pub fn snapshot_path(&self, client: &Uuid) -> PathBuf {
        self.client_dir(client).join(SNAPSHOT_FILE)
    }

    /// Lists clients that have a directory on disk.
    ///
    /// Entries whose names are not UUIDs are skipped.
    pub fn list_clients(&self) -> StorageResult<Vec<Uuid>> {
        let mut clients = Vec::new();
        for entry in fs::read_dir(self.clients_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().to_str().map(Uuid::parse_str) {
                Some(Ok(id)) => clients.push(id),
                _ => tracing::warn!(path = %entry.path().display(), "ignoring stray entry in clients directory"),
            }
        }
        clients.sort();
        Ok(clients)
    }

    /// Replaces the client's snapshot file atomically.
    ///
    /// Write-then-rename: the temp file is synced before the rename and the
    /// client directory is synced after it, so a crash leaves either the old
    /// or the new snapshot, never a mix.
    pub fn write_snapshot(&self, client: &Uuid, bytes: &[u8]) -> StorageResult<()> {
        let dir = self.client_dir(client);
        fs::create_dir_all(&dir)?;

        let temp = dir.join(SNAPSHOT_TEMP);
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, dir.join(SNAPSHOT_FILE))?;
        sync_directory(&dir)
    }

    /// Reads the client's snapshot file, if one exists.
    pub fn read_snapshot(&self, client: &Uuid) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(self.snapshot_path(client)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be fsynced.
    Ok(())
}
