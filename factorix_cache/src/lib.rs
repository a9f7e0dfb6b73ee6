//! Content-addressable cache backend (§4.6).
//!
//! Two policies share one implementation: a *download* cache (no TTL, no
//! size limit) and an *api* cache (one-hour TTL, one-megabyte per-entry
//! limit). Both are directory stores keyed by the SHA-1 hex of a caller-
//! supplied logical key, sharded two hex characters deep the way the
//! teacher's `Context` shards its own on-disk state
//! (`furrctorio_core/src/model/context.rs`).

pub mod error;
mod lock;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

pub use error::{CacheError, Result};
pub use lock::FileLock;

/// One-megabyte default per-entry cap for the API cache (§4.6).
pub const API_CACHE_MAX_FILE_SIZE: u64 = 1024 * 1024;
/// One-hour TTL for the API cache (§4.6).
pub const API_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Entries at or above this uncompressed size are deflated before storage.
/// Not pinned by an external format, so chosen generously above typical
/// `info.json`/API-response sizes and below typical MOD archive sizes.
pub const DEFAULT_COMPRESSION_THRESHOLD: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
  pub ttl: Option<Duration>,
  pub max_file_size: Option<u64>,
  pub compression_threshold: u64,
}

impl CachePolicy {
  pub fn download() -> Self {
    Self {
      ttl: None,
      max_file_size: None,
      compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
    }
  }

  pub fn api() -> Self {
    Self {
      ttl: Some(API_CACHE_TTL),
      max_file_size: Some(API_CACHE_MAX_FILE_SIZE),
      compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMetadata {
  logical_key: String,
}

/// A directory-backed, SHA-1-keyed cache (§4.6).
#[derive(Clone)]
pub struct Cache {
  root: PathBuf,
  policy: CachePolicy,
}

impl Cache {
  pub fn new(root: impl Into<PathBuf>, policy: CachePolicy) -> Result<Self> {
    let root = root.into();
    fs::create_dir_all(&root)?;
    Ok(Self { root, policy })
  }

  pub fn download_cache(root: impl Into<PathBuf>) -> Result<Self> {
    Self::new(root, CachePolicy::download())
  }

  pub fn api_cache(root: impl Into<PathBuf>) -> Result<Self> {
    Self::new(root, CachePolicy::api())
  }

  /// SHA-1 hex of the UTF-8 bytes of `logical_key`.
  pub fn key_for(logical_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(logical_key.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn data_path(&self, key: &str) -> PathBuf {
    self.root.join(&key[0..2]).join(&key[2..])
  }

  fn metadata_path(&self, key: &str) -> PathBuf {
    let mut path = self.data_path(key).into_os_string();
    path.push(".metadata");
    PathBuf::from(path)
  }

  fn lock_path(&self, key: &str) -> PathBuf {
    let mut path = self.data_path(key).into_os_string();
    path.push(".lock");
    PathBuf::from(path)
  }

  /// Stores the file at `path` under `key`. Returns `false` without storing
  /// if, after optional compression, the entry exceeds `max_file_size`
  /// (§4.6).
  pub fn store(&self, key: &str, logical_key: &str, path: &Path) -> Result<bool> {
    let raw = fs::read(path)?;
    let body = if raw.len() as u64 >= self.policy.compression_threshold {
      deflate(&raw)?
    } else {
      raw
    };

    if let Some(max) = self.policy.max_file_size {
      if body.len() as u64 > max {
        return Ok(false);
      }
    }

    let data_path = self.data_path(key);
    if let Some(parent) = data_path.parent() {
      fs::create_dir_all(parent)?;
    }

    let tmp_path = data_path.with_extension("tmp");
    fs::write(&tmp_path, &body)?;
    fs::rename(&tmp_path, &data_path)?;

    let metadata = EntryMetadata {
      logical_key: logical_key.to_string(),
    };
    fs::write(self.metadata_path(key), serde_json::to_vec(&metadata)?)?;

    Ok(true)
  }

  pub fn exist(&self, key: &str) -> bool {
    self.data_path(key).exists() && !self.expired(key)
  }

  pub fn expired(&self, key: &str) -> bool {
    let Some(ttl) = self.policy.ttl else { return false };
    match self.age(key) {
      Ok(Some(age)) => age > ttl,
      _ => false,
    }
  }

  pub fn age(&self, key: &str) -> Result<Option<Duration>> {
    let Ok(metadata) = fs::metadata(self.data_path(key)) else {
      return Ok(None);
    };
    let modified = metadata.modified()?;
    Ok(Some(SystemTime::now().duration_since(modified).unwrap_or_default()))
  }

  pub fn size(&self, key: &str) -> Result<Option<u64>> {
    match fs::metadata(self.data_path(key)) {
      Ok(metadata) => Ok(Some(metadata.len())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  /// Reads and, if zlib-framed, inflates an entry. Returns `None` if
  /// missing or expired (§4.6).
  pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
    if !self.exist(key) {
      return Ok(None);
    }
    let raw = fs::read(self.data_path(key))?;
    Ok(Some(maybe_inflate(raw)?))
  }

  /// Writes a (possibly inflated) entry to `out_path`. Returns `false` if
  /// missing or expired.
  pub fn write_to(&self, key: &str, out_path: &Path) -> Result<bool> {
    match self.read(key)? {
      Some(body) => {
        fs::write(out_path, body)?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  pub fn delete(&self, key: &str) -> Result<()> {
    let _ = fs::remove_file(self.data_path(key));
    let _ = fs::remove_file(self.metadata_path(key));
    Ok(())
  }

  pub fn clear(&self) -> Result<()> {
    if self.root.exists() {
      fs::remove_dir_all(&self.root)?;
      fs::create_dir_all(&self.root)?;
    }
    Ok(())
  }

  /// All `(storage_key, logical_key)` pairs, read from `.metadata` sidecars.
  pub fn each(&self) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    if !self.root.exists() {
      return Ok(entries);
    }
    for shard in fs::read_dir(&self.root)? {
      let shard = shard?;
      if !shard.file_type()?.is_dir() {
        continue;
      }
      for file in fs::read_dir(shard.path())? {
        let file = file?;
        let name = file.file_name();
        let name = name.to_string_lossy();
        let Some(rest) = name.strip_suffix(".metadata") else { continue };
        let storage_key = format!("{}{}", shard.file_name().to_string_lossy(), rest);
        let metadata: EntryMetadata = serde_json::from_slice(&fs::read(file.path())?)?;
        entries.push((storage_key, metadata.logical_key));
      }
    }
    Ok(entries)
  }

  /// Acquires the exclusive lock for `key`, sweeping any stale `.lock`
  /// first (§4.6, §5 "Locking discipline"). The lock releases when the
  /// returned guard drops.
  pub fn lock(&self, key: &str) -> Result<FileLock> {
    let lock_path = self.lock_path(key);
    if let Some(parent) = lock_path.parent() {
      fs::create_dir_all(parent)?;
    }
    FileLock::acquire(&lock_path)
  }

  /// Runs `f` while holding the exclusive lock for `key`.
  pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _lock = self.lock(key)?;
    f()
  }
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
  use flate2::write::ZlibEncoder;
  use flate2::Compression;

  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
  encoder.write_all(raw)?;
  Ok(encoder.finish()?)
}

/// Detects a zlib header (`b0 == 0x78 && (b0*256 + b1) % 31 == 0`) and
/// inflates if present (§4.6).
fn maybe_inflate(raw: Vec<u8>) -> Result<Vec<u8>> {
  if raw.len() >= 2 && raw[0] == 0x78 && (raw[0] as u32 * 256 + raw[1] as u32) % 31 == 0 {
    use flate2::read::ZlibDecoder;
    let mut decoder = ZlibDecoder::new(&raw[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
  } else {
    Ok(raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write as _;
  use tempfile::tempdir;

  #[test]
  fn key_for_is_sha1_hex() {
    let key = Cache::key_for("https://mods.factorio.com/api/mods/foo");
    assert_eq!(key.len(), 40);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn store_and_read_roundtrip() {
    let dir = tempdir().unwrap();
    let cache = Cache::download_cache(dir.path().join("cache")).unwrap();

    let mut src = tempfile::NamedTempFile::new().unwrap();
    src.write_all(b"hello cache").unwrap();

    let key = Cache::key_for("logical-key");
    assert!(cache.store(&key, "logical-key", src.path()).unwrap());
    assert!(cache.exist(&key));
    assert_eq!(cache.read(&key).unwrap().unwrap(), b"hello cache");
  }

  #[test]
  fn api_cache_rejects_entries_over_the_size_limit() {
    let dir = tempdir().unwrap();
    let cache = Cache::api_cache(dir.path().join("cache")).unwrap();

    let mut src = tempfile::NamedTempFile::new().unwrap();
    src.write_all(&vec![0u8; API_CACHE_MAX_FILE_SIZE as usize + 1]).unwrap();

    let key = Cache::key_for("big-entry");
    assert!(!cache.store(&key, "big-entry", src.path()).unwrap());
    assert!(!cache.exist(&key));
  }

  #[test]
  fn compressed_entries_are_transparently_inflated_on_read() {
    let dir = tempdir().unwrap();
    let cache = Cache::download_cache(dir.path().join("cache")).unwrap();

    let payload = vec![b'x'; DEFAULT_COMPRESSION_THRESHOLD as usize + 10];
    let mut src = tempfile::NamedTempFile::new().unwrap();
    src.write_all(&payload).unwrap();

    let key = Cache::key_for("compressible");
    cache.store(&key, "compressible", src.path()).unwrap();

    let stored_raw = fs::read(cache.data_path(&key)).unwrap();
    assert_eq!(stored_raw[0], 0x78);
    assert_eq!(cache.read(&key).unwrap().unwrap(), payload);
  }

  #[test]
  fn each_lists_stored_entries_by_logical_key() {
    let dir = tempdir().unwrap();
    let cache = Cache::download_cache(dir.path().join("cache")).unwrap();
    let mut src = tempfile::NamedTempFile::new().unwrap();
    src.write_all(b"data").unwrap();

    let key = Cache::key_for("some-url");
    cache.store(&key, "some-url", src.path()).unwrap();

    let entries = cache.each().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "some-url");
  }

  #[test]
  fn with_lock_serializes_access() {
    let dir = tempdir().unwrap();
    let cache = Cache::download_cache(dir.path().join("cache")).unwrap();
    let key = Cache::key_for("locked-key");

    let result = cache.with_lock(&key, || Ok(42)).unwrap();
    assert_eq!(result, 42);
    assert!(!cache.lock_path(&key).exists());
  }
}
