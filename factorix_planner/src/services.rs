//! The explicit dependency container the planner threads through every
//! command, replacing the global-singleton/auto-injection pattern the
//! design notes call out (§9 "Global dependency container").

use std::sync::Arc;

use factorix_portal::Portal;

use crate::paths::Paths;

#[derive(Clone)]
pub struct Services {
  pub portal: Arc<Portal>,
  pub downloader: Arc<factorix_transfer::Downloader>,
  pub event_bus: factorix_transfer::EventBus,
  pub paths: Paths,
  pub jobs: usize,
  pub backup_extension: Option<String>,
}

impl Services {
  pub fn new(
    portal: Arc<Portal>,
    downloader: Arc<factorix_transfer::Downloader>,
    event_bus: factorix_transfer::EventBus,
    paths: Paths,
    jobs: usize,
    backup_extension: Option<String>,
  ) -> Self {
    Self {
      portal,
      downloader,
      event_bus,
      paths,
      jobs,
      backup_extension,
    }
  }
}
