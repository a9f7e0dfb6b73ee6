//! `.lock` sibling files coordinating writers (§5 "Locking discipline").
//!
//! A held lock is a plain file created with `create_new`; its presence is
//! the lock. Before acquiring, any `.lock` older than the staleness window
//! is swept as abandoned (the process that held it is assumed dead or
//! crashed without cleanup).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use factorix_core::constants::{LOCK_ACQUIRE_TIMEOUT, LOCK_STALENESS_WINDOW};

use crate::error::{CacheError, Result};

pub struct FileLock {
  path: PathBuf,
}

impl FileLock {
  /// Sweeps a stale lock at `path` if one exists, then acquires a fresh one.
  /// Spins with a short sleep until acquired or `LOCK_ACQUIRE_TIMEOUT`
  /// elapses, at which point it gives up with `LockTimeoutError` rather than
  /// spinning indefinitely against a live writer.
  pub fn acquire(path: &Path) -> Result<Self> {
    sweep_if_stale(path)?;
    let started = Instant::now();

    loop {
      match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => return Ok(FileLock { path: path.to_path_buf() }),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
          if started.elapsed() >= LOCK_ACQUIRE_TIMEOUT {
            return Err(CacheError::LockTimeoutError(path.display().to_string()));
          }
          sweep_if_stale(path)?;
          std::thread::sleep(std::time::Duration::from_millis(20));
        }
        Err(e) => return Err(e.into()),
      }
    }
  }
}

impl Drop for FileLock {
  fn drop(&mut self) {
    let _ = fs::remove_file(&self.path);
  }
}

fn sweep_if_stale(path: &Path) -> Result<()> {
  let Ok(metadata) = fs::metadata(path) else { return Ok(()) };
  let Ok(modified) = metadata.modified() else { return Ok(()) };
  if SystemTime::now()
    .duration_since(modified)
    .map(|age| age > LOCK_STALENESS_WINDOW)
    .unwrap_or(false)
  {
    tracing::warn!(path = %path.display(), "sweeping stale cache lock");
    let _ = fs::remove_file(path);
  }
  Ok(())
}
