//! Installed-MOD scanner (§2 component table row "Installed-MOD scanner",
//! §6 "MOD archive").
//!
//! Grounded on the `ModStructure` pattern used by comparable Factorio-
//! ecosystem crates in the retrieval pack (`factorio-data-structs`), which
//! recognizes a MOD's on-disk form as one of directory, zip archive, or
//! symlink before parsing its manifest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::modid::ModId;
use crate::version::ModVersion;

/// How one installed MOD is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModStructure {
  Directory(PathBuf),
  Zip(PathBuf),
  Symlink(PathBuf),
}

impl ModStructure {
  fn manifest_path(&self) -> PathBuf {
    match self {
      ModStructure::Directory(p) | ModStructure::Symlink(p) => p.join("info.json"),
      ModStructure::Zip(p) => p.clone(),
    }
  }
}

/// `info.json` inside a MOD archive or directory (§6 "MOD archive").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoJson {
  pub name: String,
  pub version: ModVersion,
  pub title: String,
  pub author: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub factorio_version: Option<String>,
  #[serde(default)]
  pub dependencies: Vec<String>,
}

/// One MOD found on disk, with its parsed manifest and the structure it was
/// recognized as.
#[derive(Debug, Clone)]
pub struct InstalledMod {
  pub mod_id: ModId,
  pub version: ModVersion,
  pub manifest: InfoJson,
  pub structure: ModStructure,
}

impl InstalledMod {
  fn load(structure: ModStructure) -> Result<Self> {
    let manifest = match &structure {
      ModStructure::Directory(_) | ModStructure::Symlink(_) => {
        let bytes = fs::read(structure.manifest_path())?;
        serde_json::from_slice::<InfoJson>(&bytes)?
      }
      ModStructure::Zip(archive_path) => {
        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let entry_name = (0..archive.len())
          .map(|i| archive.by_index(i).map(|e| e.name().to_string()))
          .collect::<std::result::Result<Vec<_>, _>>()?
          .into_iter()
          .find(|name| name.ends_with("/info.json"))
          .ok_or_else(|| Error::FileFormatError(format!("no info.json in {}", archive_path.display())))?;
        let mut entry = archive.by_name(&entry_name)?;
        let mut body = String::new();
        std::io::Read::read_to_string(&mut entry, &mut body)?;
        serde_json::from_str::<InfoJson>(&body)?
      }
    };

    Ok(InstalledMod {
      mod_id: ModId::new(&manifest.name),
      version: manifest.version,
      manifest,
      structure,
    })
  }
}

/// Enumerates the mods directory and returns one [`InstalledMod`] per entry
/// recognized as a directory, zip archive, or symlink.
pub fn scan(mods_directory: &Path) -> Result<Vec<InstalledMod>> {
  let mut mods = Vec::new();

  for entry in fs::read_dir(mods_directory)? {
    let entry = entry?;
    let path = entry.path();
    let file_type = entry.file_type()?;

    let structure = if file_type.is_symlink() {
      ModStructure::Symlink(path)
    } else if file_type.is_dir() {
      ModStructure::Directory(path)
    } else if path.extension().and_then(|e| e.to_str()) == Some("zip") {
      ModStructure::Zip(path)
    } else {
      continue;
    };

    mods.push(InstalledMod::load(structure)?);
  }

  mods.sort_by(|a, b| a.mod_id.cmp(&b.mod_id));
  Ok(mods)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn write_info_json(dir: &Path, name: &str, version: &str) {
    let mod_dir = dir.join(format!("{name}_{version}"));
    fs::create_dir_all(&mod_dir).unwrap();
    fs::write(
      mod_dir.join("info.json"),
      format!(
        r#"{{"name":"{name}","version":"{version}","title":"t","author":"a"}}"#
      ),
    )
    .unwrap();
  }

  #[test]
  fn scans_directory_mods_sorted_by_mod_id() {
    let dir = tempdir().unwrap();
    write_info_json(dir.path(), "zzz-mod", "1.0.0");
    write_info_json(dir.path(), "base", "1.1.110");

    let found = scan(dir.path()).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].mod_id.as_str(), "base");
    assert_eq!(found[1].mod_id.as_str(), "zzz-mod");
  }

  #[test]
  fn ignores_unrelated_files() {
    let dir = tempdir().unwrap();
    write_info_json(dir.path(), "some-mod", "2.0.0");
    fs::write(dir.path().join("mod-list.json"), "{}").unwrap();

    let found = scan(dir.path()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].manifest.version, ModVersion::new(2, 0, 0));
  }
}
