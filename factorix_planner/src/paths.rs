//! Filesystem paths the planner treats as opaque (§6 "Filesystem paths").

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Paths {
  pub mods_directory: PathBuf,
  pub mod_list: PathBuf,
  pub settings: PathBuf,
  pub player_data: PathBuf,
  pub game_running_lock: PathBuf,
}

impl Paths {
  pub fn new(mods_directory: impl Into<PathBuf>) -> Self {
    let mods_directory = mods_directory.into();
    Self {
      mod_list: mods_directory.join("mod-list.json"),
      settings: mods_directory.join("mod-settings.dat"),
      player_data: mods_directory
        .parent()
        .map(|p| p.join("player-data.json"))
        .unwrap_or_else(|| mods_directory.join("player-data.json")),
      game_running_lock: mods_directory
        .parent()
        .map(|p| p.join(".factorio.lock"))
        .unwrap_or_else(|| mods_directory.join(".factorio.lock")),
      mods_directory,
    }
  }

  pub fn game_is_running(&self) -> bool {
    self.game_running_lock.exists()
  }

  pub fn mods_directory(&self) -> &Path {
    &self.mods_directory
  }
}
