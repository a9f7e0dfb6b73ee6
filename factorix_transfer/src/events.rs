//! Event bus (§4.10): register named events, publish payloads, and fan them
//! out synchronously to subscribers in registration order.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One progress/lifecycle event (§4.7 "Events").
///
/// Transfer-scoped variants carry `id`, a per-transfer identifier assigned by
/// the `Downloader`/`Uploader` when the transfer starts, so concurrent
/// transfers under `--jobs` (§5) can be told apart by subscribers such as the
/// progress presenter instead of relying on event arrival order.
#[derive(Debug, Clone)]
pub enum Event {
  DownloadStarted { id: u64, total_size: Option<u64> },
  DownloadProgress { id: u64, current_size: u64, total_size: Option<u64> },
  DownloadCompleted { id: u64, total_size: u64 },
  UploadStarted { id: u64, total_size: u64 },
  UploadProgress { id: u64, current_size: u64, total_size: u64 },
  UploadCompleted { id: u64, total_size: u64 },
  CacheHit { url: String, output: String, total_size: u64 },
  CacheMiss { url: String },
}

impl Event {
  fn name(&self) -> &'static str {
    match self {
      Event::DownloadStarted { .. } => "download.started",
      Event::DownloadProgress { .. } => "download.progress",
      Event::DownloadCompleted { .. } => "download.completed",
      Event::UploadStarted { .. } => "upload.started",
      Event::UploadProgress { .. } => "upload.progress",
      Event::UploadCompleted { .. } => "upload.completed",
      Event::CacheHit { .. } => "cache.hit",
      Event::CacheMiss { .. } => "cache.miss",
    }
  }
}

pub trait EventHandler: Send + Sync {
  /// Event names this handler wants delivered; an empty set means "all".
  fn declared_events(&self) -> HashSet<&'static str> {
    HashSet::new()
  }

  fn handle(&self, event: &Event);
}

/// Per-client event bus. Publishing is synchronous within the publisher's
/// own thread/task; subscribers are invoked in registration order (§4.10).
#[derive(Clone, Default)]
pub struct EventBus {
  handlers: Arc<Mutex<Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
    self.handlers.lock().unwrap().push(handler);
  }

  pub fn unsubscribe(&self, handler: &Arc<dyn EventHandler>) {
    self
      .handlers
      .lock()
      .unwrap()
      .retain(|h| !Arc::ptr_eq(h, handler));
  }

  pub fn publish(&self, event: Event) {
    let handlers = self.handlers.lock().unwrap().clone();
    for handler in handlers {
      let declared = handler.declared_events();
      if declared.is_empty() || declared.contains(event.name()) {
        handler.handle(&event);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Counter(Arc<AtomicUsize>);

  impl EventHandler for Counter {
    fn handle(&self, _event: &Event) {
      self.0.fetch_add(1, Ordering::SeqCst);
    }
  }

  #[test]
  fn publishes_to_all_subscribers_in_order() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let handler: Arc<dyn EventHandler> = Arc::new(Counter(count.clone()));
    bus.subscribe(handler.clone());
    bus.subscribe(handler);

    bus.publish(Event::DownloadStarted { id: 0, total_size: Some(10) });
    assert_eq!(count.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let handler: Arc<dyn EventHandler> = Arc::new(Counter(count.clone()));
    bus.subscribe(handler.clone());
    bus.unsubscribe(&handler);

    bus.publish(Event::CacheMiss { url: "x".into() });
    assert_eq!(count.load(Ordering::SeqCst), 0);
  }
}
