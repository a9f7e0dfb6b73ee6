//! Value objects describing MODs and releases as they come back from the
//! portal (§4.8, §6 "Portal endpoints"), trimmed to what the core actually
//! consumes (dependency resolution, downloads) and built on `ModVersion`
//! rather than `semver::Version` for the same reason `version.rs` is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dependency::DependencyList;
use crate::modid::ModId;
use crate::version::ModVersion;

/// Summary-form MOD info (`GET /api/mods/{name}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModSummary {
  pub name: String,
  pub owner: String,
  pub title: String,
  pub summary: String,
  pub category: String,
  pub downloads_count: usize,
  pub thumbnail: Option<String>,
  pub latest_release: Option<Release>,
  #[serde(default)]
  pub releases: Vec<Release>,
}

impl ModSummary {
  pub fn mod_id(&self) -> ModId {
    ModId::new(&self.name)
  }
}

/// Full-form MOD info (`GET /api/mods/{name}/full`), including `Detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModDetail {
  pub name: String,
  pub owner: String,
  pub title: String,
  pub summary: String,
  pub category: String,
  pub downloads_count: usize,
  pub thumbnail: Option<String>,
  pub releases: Vec<Release>,
  pub changelog: String,
  pub created_at: DateTime<Utc>,
  pub description: Option<String>,
  pub source_url: Option<String>,
  pub homepage: Option<String>,
  pub license: Option<License>,
  pub deprecated: Option<bool>,
}

impl ModDetail {
  pub fn mod_id(&self) -> ModId {
    ModId::new(&self.name)
  }

  pub fn latest_release(&self) -> Option<&Release> {
    self.releases.iter().max_by_key(|r| r.released_at)
  }

  pub fn summary(&self) -> ModSummary {
    ModSummary {
      name: self.name.clone(),
      owner: self.owner.clone(),
      title: self.title.clone(),
      summary: self.summary.clone(),
      category: self.category.clone(),
      downloads_count: self.downloads_count,
      thumbnail: self.thumbnail.clone(),
      latest_release: self.latest_release().cloned(),
      releases: self.releases.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
  pub description: String,
  pub id: String,
  pub name: String,
  pub title: String,
  pub url: Option<String>,
}

/// One published release of a MOD: download URL, checksum, embedded
/// manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
  pub download_url: String,
  pub file_name: String,
  pub version: ModVersion,
  pub released_at: DateTime<Utc>,
  pub sha1: String,
  pub info_json: ReleaseManifest,
}

/// The manifest embedded in a release (`info_json` in the portal's release
/// payload).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseManifest {
  pub name: Option<String>,
  pub title: Option<String>,
  pub factorio_version: Option<String>,
  #[serde(default)]
  pub dependencies: Vec<String>,
}

impl ReleaseManifest {
  /// Parses every dependency string, skipping the sentinel `base` MOD as
  /// `add_uninstalled` requires (§4.2).
  pub fn dependency_list(&self) -> crate::error::Result<DependencyList> {
    let entries = self
      .dependencies
      .iter()
      .map(|s| crate::dependency::parse_dependency(s))
      .collect::<crate::error::Result<Vec<_>>>()?;
    Ok(DependencyList::new(
      entries.into_iter().filter(|e| !e.mod_id.is_base()).collect(),
    ))
  }
}
