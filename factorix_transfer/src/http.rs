//! Resumable HTTPS download and multipart upload (§4.7).

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Body, Client, StatusCode};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use url::Url;

use factorix_cache::Cache;

use crate::error::{Result, TransferError};
use crate::events::{Event, EventBus};
use crate::retry::{is_retryable, RetryPolicy};

const MAX_REDIRECTS: usize = 10;
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

fn require_https(url: &str) -> Result<Url> {
  let parsed = Url::parse(url).map_err(|e| TransferError::URLError(e.to_string()))?;
  if parsed.scheme() != "https" {
    return Err(TransferError::URLError(format!("scheme must be https: `{url}`")));
  }
  Ok(parsed)
}

fn classify_status(status: StatusCode, body: String) -> Result<()> {
  if status.is_success() {
    return Ok(());
  }
  if status.is_client_error() {
    return Err(TransferError::HTTPClientError {
      status: status.as_u16(),
      body,
    });
  }
  if status.is_server_error() {
    return Err(TransferError::HTTPServerError(status.as_u16()));
  }
  if status.is_redirection() {
    return Err(TransferError::TooManyRedirectsError(body));
  }
  Ok(())
}

/// Distinguishes a timed-out request and an exceeded redirect cap from other
/// transport failures so `NetworkTimeoutError`/`TooManyRedirectsError` (§7)
/// actually get raised, rather than every `reqwest::Error` collapsing into
/// the generic `Http` variant. `reqwest::redirect::Policy::limited` makes
/// `.send()` fail with `is_redirect() == true` once `MAX_REDIRECTS` is
/// exceeded; it never returns a 3xx `Ok(response)`.
fn classify_reqwest_error(error: reqwest::Error) -> TransferError {
  if error.is_timeout() {
    TransferError::NetworkTimeoutError(error.to_string())
  } else if error.is_redirect() {
    TransferError::TooManyRedirectsError(error.url().map(|u| u.to_string()).unwrap_or_default())
  } else {
    TransferError::from(error)
  }
}

fn content_type_for(path: &Path) -> &'static str {
  match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
    Some("zip") => "application/zip",
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    _ => "application/octet-stream",
  }
}

/// Drives resumable downloads through the transfer/cache contract described
/// in §4.7 ("Downloader orchestration").
pub struct Downloader {
  client: Client,
  cache: Arc<Cache>,
  events: EventBus,
  retry: RetryPolicy,
  next_id: std::sync::atomic::AtomicU64,
}

impl Downloader {
  pub fn new(cache: Arc<Cache>, events: EventBus) -> Result<Self> {
    let client = Client::builder()
      .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
      .build()?;
    Ok(Self {
      client,
      cache,
      events,
      retry: RetryPolicy::default(),
      next_id: std::sync::atomic::AtomicU64::new(0),
    })
  }

  /// Downloads `url` to `output`, consulting the cache first and verifying
  /// `expected_sha1` when given (§4.7 steps 1-5).
  #[instrument(skip(self))]
  pub async fn download(&self, url: &str, output: &Path, expected_sha1: Option<&str>) -> Result<()> {
    let key = Cache::key_for(url);
    let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    if self.cache.exist(&key) {
      self.events.publish(Event::CacheHit {
        url: url.to_string(),
        output: output.display().to_string(),
        total_size: self.cache.size(&key)?.unwrap_or(0),
      });
      self.cache.write_to(&key, output)?;
      return Ok(());
    }

    let guard = {
      let cache = self.cache.clone();
      let key = key.clone();
      tokio::task::spawn_blocking(move || cache.lock(&key))
        .await
        .expect("lock task panicked")
        .map_err(TransferError::from)?
    };

    if !self.cache.exist(&key) {
      self.events.publish(Event::CacheMiss { url: url.to_string() });
      let tmp_path = output.with_extension("part");
      self.fetch_with_retry(id, url, &tmp_path).await?;

      if let Some(expected) = expected_sha1 {
        let actual = sha1_hex(&tmp_path).await?;
        if !actual.eq_ignore_ascii_case(expected) {
          let _ = tokio::fs::remove_file(&tmp_path).await;
          return Err(TransferError::DigestMismatchError {
            expected: expected.to_string(),
            actual,
          });
        }
      }

      self.cache.store(&key, url, &tmp_path).map_err(TransferError::from)?;
      let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    drop(guard);

    self.cache.write_to(&key, output).map_err(TransferError::from)?;
    Ok(())
  }

  async fn fetch_with_retry(&self, id: u64, url: &str, tmp_path: &Path) -> Result<()> {
    let mut attempt = 0;
    loop {
      match self.fetch_once(id, url, tmp_path).await {
        Ok(()) => return Ok(()),
        Err(e) if is_retryable(&e) && attempt + 1 < self.retry.max_attempts => {
          let delay = self.retry.delay_for(attempt);
          warn!(%url, attempt, ?delay, "retrying download after transient error");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn fetch_once(&self, id: u64, url: &str, tmp_path: &Path) -> Result<()> {
    let parsed = require_https(url)?;

    let existing_size = tokio::fs::metadata(tmp_path).await.map(|m| m.len()).unwrap_or(0);
    let mut request = self.client.get(parsed);
    if existing_size > 0 {
      request = request.header("Range", format!("bytes={existing_size}-"));
    }

    let response = request.send().await.map_err(classify_reqwest_error)?;
    let status = response.status();

    let resumed = existing_size > 0 && status == StatusCode::OK;
    if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
      let body = response.text().await.unwrap_or_default();
      classify_status(status, body)?;
    }

    let total_size = response.content_length();
    self.events.publish(Event::DownloadStarted { id, total_size });

    let mut file = if resumed {
      tokio::fs::File::create(tmp_path).await?
    } else if existing_size > 0 {
      tokio::fs::OpenOptions::new().append(true).open(tmp_path).await?
    } else {
      tokio::fs::File::create(tmp_path).await?
    };

    let mut current_size = if resumed { 0 } else { existing_size };
    let mut stream = response.bytes_stream();
    use futures::StreamExt;
    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(classify_reqwest_error)?;
      file.write_all(&chunk).await?;
      current_size += chunk.len() as u64;
      self.events.publish(Event::DownloadProgress { id, current_size, total_size });
    }

    self.events.publish(Event::DownloadCompleted { id, total_size: current_size });
    debug!(current_size, "download complete");
    Ok(())
  }
}

/// Reads `file` in fixed-size chunks, publishing `UploadProgress` as each
/// chunk is handed to the request body (mirrors `fetch_once`'s
/// `DownloadProgress` loop above).
fn upload_body_stream(
  id: u64,
  file: tokio::fs::File,
  total_size: u64,
  events: EventBus,
) -> impl futures::Stream<Item = std::io::Result<Bytes>> {
  futures::stream::unfold((file, 0u64), move |(mut file, sent)| {
    let events = events.clone();
    async move {
      let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
      match file.read(&mut buf).await {
        Ok(0) => None,
        Ok(n) => {
          buf.truncate(n);
          let sent = sent + n as u64;
          events.publish(Event::UploadProgress {
            id,
            current_size: sent,
            total_size,
          });
          Some((Ok(Bytes::from(buf)), (file, sent)))
        }
        Err(e) => Some((Err(e), (file, sent))),
      }
    }
  })
}

async fn sha1_hex(path: &Path) -> Result<String> {
  let mut file = tokio::fs::File::open(path).await?;
  let mut buf = Vec::new();
  file.read_to_end(&mut buf).await?;
  let mut hasher = Sha1::new();
  hasher.update(&buf);
  Ok(hex::encode(hasher.finalize()))
}

/// Drives multipart uploads (§4.7 "Uploader orchestration").
pub struct Uploader {
  client: Client,
  events: EventBus,
  next_id: std::sync::atomic::AtomicU64,
}

impl Uploader {
  pub fn new(events: EventBus) -> Result<Self> {
    Ok(Self {
      client: Client::builder().build()?,
      events,
      next_id: std::sync::atomic::AtomicU64::new(0),
    })
  }

  #[instrument(skip(self, extra_fields))]
  pub async fn upload(
    &self,
    url: &str,
    file_path: &Path,
    field_name: &str,
    extra_fields: &[(&str, &str)],
    content_type_override: Option<&str>,
  ) -> Result<()> {
    if !file_path.exists() {
      return Err(TransferError::ConfigurationError(format!(
        "file does not exist: {}",
        file_path.display()
      )));
    }

    let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let parsed = require_https(url)?;
    let file = tokio::fs::File::open(file_path).await?;
    let total_size = file.metadata().await?.len();
    let content_type = content_type_override
      .map(str::to_string)
      .unwrap_or_else(|| content_type_for(file_path).to_string());

    let file_name = file_path
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or("upload.bin")
      .to_string();

    let mut form = reqwest::multipart::Form::new();
    for (key, value) in extra_fields {
      form = form.text((*key).to_string(), (*value).to_string());
    }

    self.events.publish(Event::UploadStarted { id, total_size });
    let body = Body::wrap_stream(upload_body_stream(id, file, total_size, self.events.clone()));
    let part = reqwest::multipart::Part::stream_with_length(body, total_size)
      .file_name(file_name)
      .mime_str(&content_type)
      .map_err(|e| TransferError::ConfigurationError(e.to_string()))?;
    form = form.part(field_name.to_string(), part);

    let response = self.client.post(parsed).multipart(form).send().await.map_err(classify_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      classify_status(status, body)?;
    }

    self.events.publish(Event::UploadCompleted { id, total_size });
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_non_https_urls() {
    assert!(require_https("http://example.com").is_err());
    assert!(require_https("https://example.com").is_ok());
  }

  #[test]
  fn content_type_detected_by_extension() {
    assert_eq!(content_type_for(Path::new("mod.zip")), "application/zip");
    assert_eq!(content_type_for(Path::new("thumb.png")), "image/png");
    assert_eq!(content_type_for(Path::new("thumb.JPG")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
  }

  #[tokio::test]
  async fn upload_body_stream_reports_monotonic_progress_and_full_contents() {
    use crate::events::EventHandler;
    use futures::StreamExt;
    use std::io::Write as _;
    use std::sync::atomic::{AtomicU64, Ordering};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    let payload = vec![7u8; UPLOAD_CHUNK_SIZE * 3 + 123];
    std::fs::File::create(&path).unwrap().write_all(&payload).unwrap();

    let events = EventBus::new();
    let last_progress = Arc::new(AtomicU64::new(0));
    let seen = last_progress.clone();
    struct Recorder(Arc<AtomicU64>);
    impl EventHandler for Recorder {
      fn handle(&self, event: &Event) {
        if let Event::UploadProgress { current_size, .. } = event {
          let previous = self.0.swap(*current_size, Ordering::SeqCst);
          assert!(*current_size > previous, "progress must be monotonically increasing");
        }
      }
    }
    events.subscribe(Arc::new(Recorder(seen)));

    let total_size = payload.len() as u64;
    let file = tokio::fs::File::open(&path).await.unwrap();
    let mut stream = Box::pin(upload_body_stream(0, file, total_size, events));

    let mut reconstructed = Vec::new();
    while let Some(chunk) = stream.next().await {
      reconstructed.extend_from_slice(&chunk.unwrap());
    }

    assert_eq!(reconstructed, payload);
    assert_eq!(last_progress.load(Ordering::SeqCst), total_size);
  }
}
