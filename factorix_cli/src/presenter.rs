//! Progress presenters (§4 row "Progress presenters"): renders
//! `factorix_transfer::Event`s as `indicatif` bars, one per in-flight
//! transfer, keyed by the transfer `id` each event carries (§5 "within one
//! transfer, started -> progress* -> completed is guaranteed") so concurrent
//! transfers under `--jobs` don't cross-update each other's bars.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use factorix_transfer::{Event, EventHandler};

/// One live bar per concurrently-running transfer, keyed by the `id` field
/// on `DownloadStarted`/`UploadStarted` and carried through that transfer's
/// subsequent progress/completed events.
pub struct ProgressPresenter {
  multi: MultiProgress,
  downloads: Mutex<HashMap<u64, ProgressBar>>,
  uploads: Mutex<HashMap<u64, ProgressBar>>,
}

impl ProgressPresenter {
  pub fn new(quiet: bool) -> Self {
    let multi = if quiet {
      MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden())
    } else {
      MultiProgress::new()
    };
    Self {
      multi,
      downloads: Mutex::new(HashMap::new()),
      uploads: Mutex::new(HashMap::new()),
    }
  }

  fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{bar:32.cyan/blue}] {bytes}/{total_bytes} {msg}")
      .unwrap_or_else(|_| ProgressStyle::default_bar())
      .progress_chars("#>-")
  }

  fn new_bar(&self, total_size: Option<u64>, label: &str) -> ProgressBar {
    let bar = self.multi.add(ProgressBar::new(total_size.unwrap_or(0)));
    bar.set_style(Self::style());
    bar.set_message(label.to_string());
    bar
  }
}

impl EventHandler for ProgressPresenter {
  fn handle(&self, event: &Event) {
    match event {
      Event::DownloadStarted { id, total_size } => {
        let bar = self.new_bar(*total_size, "downloading");
        self.downloads.lock().unwrap().insert(*id, bar);
      }
      Event::DownloadProgress { id, current_size, .. } => {
        if let Some(bar) = self.downloads.lock().unwrap().get(id) {
          bar.set_position(*current_size);
        }
      }
      Event::DownloadCompleted { id, total_size } => {
        if let Some(bar) = self.downloads.lock().unwrap().remove(id) {
          bar.set_position(*total_size);
          bar.finish_with_message("done");
        }
      }
      Event::UploadStarted { id, total_size } => {
        let bar = self.new_bar(Some(*total_size), "uploading");
        self.uploads.lock().unwrap().insert(*id, bar);
      }
      Event::UploadProgress { id, current_size, .. } => {
        if let Some(bar) = self.uploads.lock().unwrap().get(id) {
          bar.set_position(*current_size);
        }
      }
      Event::UploadCompleted { id, total_size } => {
        if let Some(bar) = self.uploads.lock().unwrap().remove(id) {
          bar.set_position(*total_size);
          bar.finish_with_message("done");
        }
      }
      Event::CacheHit { url, .. } => {
        tracing::debug!(%url, "cache hit");
      }
      Event::CacheMiss { url } => {
        tracing::debug!(%url, "cache miss");
      }
    }
  }
}
