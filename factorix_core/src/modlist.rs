//! `mod-list.json` (§3 "MOD list entry", §6 "mod-list.json").
//!
//! Extended from the minimal name/enabled pair with an optional `version`
//! field and §4.9's `base`-first / write-to-temp-then-rename save
//! semantics.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::modid::ModId;
use crate::version::ModVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModListEntry {
  pub name: String,
  pub enabled: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<ModVersion>,
}

impl ModListEntry {
  pub fn new(name: impl Into<String>, enabled: bool, version: Option<ModVersion>) -> Self {
    Self {
      name: name.into(),
      enabled,
      version,
    }
  }

  pub fn mod_id(&self) -> ModId {
    ModId::new(&self.name)
  }
}

/// `{"mods": [...]}`, preserving insertion order with `base` pinned first on
/// write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModListFile {
  pub mods: Vec<ModListEntry>,
}

impl ModListFile {
  pub fn new(mods: Vec<ModListEntry>) -> Self {
    Self { mods }
  }

  pub fn load(path: &Path) -> Result<Self> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
  }

  /// Writes to a temp file in the same directory and renames over `path`,
  /// leaving a `.bak` sibling when `backup_extension` is given (§4.9
  /// failure semantics).
  pub fn save(&self, path: &Path, backup_extension: Option<&str>) -> Result<()> {
    let ordered = self.ordered_with_base_first();
    let body = serde_json::to_vec_pretty(&ModListFile { mods: ordered })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
      ".{}.tmp",
      path.file_name().and_then(|n| n.to_str()).unwrap_or("mod-list.json")
    ));
    fs::write(&tmp_path, &body)?;

    if let Some(ext) = backup_extension {
      if path.exists() {
        fs::copy(path, path.with_extension(ext.trim_start_matches('.')))?;
      }
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
  }

  fn ordered_with_base_first(&self) -> Vec<ModListEntry> {
    let mut base = Vec::new();
    let mut rest = Vec::new();
    for entry in &self.mods {
      if entry.mod_id().is_base() {
        base.push(entry.clone());
      } else {
        rest.push(entry.clone());
      }
    }
    base.extend(rest);
    base
  }

  pub fn entry(&self, mod_id: &ModId) -> Option<&ModListEntry> {
    self.mods.iter().find(|e| &e.mod_id() == mod_id)
  }

  pub fn entry_mut(&mut self, mod_id: &ModId) -> Option<&mut ModListEntry> {
    self.mods.iter_mut().find(|e| &e.mod_id() == mod_id)
  }

  pub fn contains(&self, mod_id: &ModId) -> bool {
    self.entry(mod_id).is_some()
  }

  pub fn upsert(&mut self, entry: ModListEntry) {
    match self.mods.iter_mut().find(|e| e.mod_id() == entry.mod_id()) {
      Some(existing) => *existing = entry,
      None => self.mods.push(entry),
    }
  }

  pub fn remove(&mut self, mod_id: &ModId) {
    self.mods.retain(|e| &e.mod_id() != mod_id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn base_is_always_written_first() {
    let list = ModListFile::new(vec![
      ModListEntry::new("zzz-mod", true, None),
      ModListEntry::new("base", true, None),
    ]);
    assert_eq!(list.ordered_with_base_first()[0].name, "base");
  }

  #[test]
  fn roundtrips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mod-list.json");
    let list = ModListFile::new(vec![
      ModListEntry::new("base", true, None),
      ModListEntry::new("some-mod", true, Some(ModVersion::new(1, 2, 3))),
    ]);
    list.save(&path, None).unwrap();

    let reloaded = ModListFile::load(&path).unwrap();
    assert_eq!(reloaded.mods.len(), 2);
    assert_eq!(reloaded.mods[1].version, Some(ModVersion::new(1, 2, 3)));
  }

  #[test]
  fn backup_extension_writes_sibling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mod-list.json");
    let list = ModListFile::new(vec![ModListEntry::new("base", true, None)]);
    list.save(&path, None).unwrap();

    let updated = ModListFile::new(vec![
      ModListEntry::new("base", true, None),
      ModListEntry::new("new-mod", true, None),
    ]);
    updated.save(&path, Some(".bak")).unwrap();

    assert!(path.with_extension("bak").exists());
  }
}
