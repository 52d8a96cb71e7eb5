//! Lock Manager (spec §4.3): serializes conflicting access to a table from
//! concurrent threads within the process and concurrent processes on the
//! same filesystem.
//!
//! Two layers, acquired outer-then-inner and released inner-then-outer: an
//! in-process lock first, then an advisory filesystem lock on the table's
//! `.lock` file. Grounded on the teacher's use of `fs4::FileExt` in
//! `kv::storage::log::Log::new_with_lock` (there taken out once, for the
//! whole process lifetime); here it is taken and released per operation so
//! that readers and writers in different processes can interleave safely.
//!
//! `flock` locks are keyed to the open file description, not reference
//! counted per call on one fd: unlocking one holder's fd releases the lock
//! for every other holder sharing that same fd. So each guard opens its own
//! handle to the `.lock` file rather than sharing one stored on `TableLock`
//! — two in-process `ReadGuard`s then hold two independent shared locks, and
//! the first one's `Drop` cannot yank the lock out from under the second.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fs4::FileExt;

use crate::error::CResult;

pub struct TableLock {
    path: PathBuf,
    process_lock: RwLock<()>,
}

impl TableLock {
    pub fn open(path: &Path) -> CResult<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // Touch the file once up front so later opens never hit a missing-file error.
        OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(TableLock { path: path.to_path_buf(), process_lock: RwLock::new(()) })
    }

    /// Blocks until a shared (reader) lock is held at both layers.
    pub fn read(&self) -> CResult<ReadGuard<'_>> {
        let guard = self.process_lock.read().expect("table lock poisoned");
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        lock_shared(&file)?;
        Ok(ReadGuard { file, _process: guard })
    }

    /// Blocks until an exclusive (writer) lock is held at both layers.
    pub fn write(&self) -> CResult<WriteGuard<'_>> {
        let guard = self.process_lock.write().expect("table lock poisoned");
        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;
        Ok(WriteGuard { file, _process: guard })
    }
}

/// Takes a shared filesystem lock, falling back to an exclusive one on
/// platforms where `fs4` reports shared locks are unsupported (spec §4.3).
fn lock_shared(file: &File) -> CResult<()> {
    match file.lock_shared() {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::Unsupported => {
            file.lock_exclusive()?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub struct ReadGuard<'a> {
    file: File,
    _process: RwLockReadGuard<'a, ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct WriteGuard<'a> {
    file: File,
    _process: RwLockWriteGuard<'a, ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
