//! Save-file reading (§6 "Save file").
//!
//! A save is a zip archive carrying either `level.dat0` or `level-init.dat`,
//! itself the same envelope as `mod-settings.dat` (game version, reserved
//! bool, property tree) wrapping a `mods` list and a `startup` settings
//! section. §4's codec section only documents that one binary envelope, not
//! a dedicated save-file schema, so this reuses it to read the two pieces
//! `sync` needs (DESIGN.md records this as an Open Question decision).

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::codec::primitives::{read_bool, read_game_version};
use crate::codec::Value;
use crate::error::{Error, Result};
use crate::modlist::ModListEntry;
use crate::settings::Section;
use crate::version::GameVersion;

const LEVEL_ENTRY_CANDIDATES: [&str; 2] = ["level.dat0", "level-init.dat"];

/// The pieces of a save file `sync` needs: its declared game version, the
/// MOD list it was saved with, and its startup settings section.
#[derive(Debug, Clone)]
pub struct SaveFile {
  pub game_version: GameVersion,
  pub mod_list: Vec<ModListEntry>,
  pub startup_settings: Section,
}

impl SaveFile {
  pub fn open(path: &Path) -> Result<Self> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let entry_name = LEVEL_ENTRY_CANDIDATES
      .iter()
      .find(|name| archive.by_name(name).is_ok())
      .ok_or_else(|| {
        Error::FileFormatError(format!(
          "neither `level.dat0` nor `level-init.dat` present in {}",
          path.display()
        ))
      })?;

    let mut bytes = Vec::new();
    archive.by_name(entry_name)?.read_to_end(&mut bytes)?;

    let mut cursor = Cursor::new(bytes.as_slice());
    let game_version = read_game_version(&mut cursor)?;
    let _reserved = read_bool(&mut cursor)?;
    let tree = Value::decode(&mut cursor)?;

    let mod_list = tree
      .dict_get("mods")
      .and_then(Value::as_list)
      .ok_or_else(|| Error::FileFormatError("save file has no `mods` list".into()))?
      .iter()
      .map(mod_list_entry_from_value)
      .collect::<Result<Vec<_>>>()?;

    let startup_settings = tree
      .dict_get("startup")
      .map(section_from_value)
      .transpose()?
      .unwrap_or_default();

    Ok(SaveFile {
      game_version,
      mod_list,
      startup_settings,
    })
  }
}

fn mod_list_entry_from_value(value: &Value) -> Result<ModListEntry> {
  let name = value
    .dict_get("name")
    .and_then(Value::as_str)
    .ok_or_else(|| Error::FileFormatError("save file mod entry has no `name`".into()))?
    .to_string();
  let enabled = value
    .dict_get("enabled")
    .and_then(Value::as_bool)
    .unwrap_or(true);
  let version = value
    .dict_get("version")
    .and_then(Value::as_str)
    .map(|s| s.parse())
    .transpose()?;
  Ok(ModListEntry::new(name, enabled, version))
}

fn section_from_value(value: &Value) -> Result<Section> {
  let entries = value
    .as_dict()
    .ok_or_else(|| Error::FileFormatError("save file startup section is not a dictionary".into()))?;

  let mut section = Section::new();
  for (name, wrapper) in entries {
    let inner = wrapper
      .dict_get("value")
      .ok_or_else(|| Error::FileFormatError(format!("setting `{name}` has no `value` key")))?;
    section.set(name.clone(), crate::settings::SettingValue::from_value(inner));
  }
  Ok(section)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::codec::primitives::write_game_version;
  use crate::codec::primitives::write_bool as write_envelope_bool;
  use std::io::Write as _;
  use tempfile::tempdir;

  fn build_level_dat() -> Vec<u8> {
    let mut buf = Vec::new();
    write_game_version(&mut buf, GameVersion::new(1, 1, 110, 0)).unwrap();
    write_envelope_bool(&mut buf, false).unwrap();

    let tree = Value::Dict(vec![
      (
        "mods".into(),
        Value::List(vec![Value::Dict(vec![
          ("name".into(), Value::Str("base".into())),
          ("version".into(), Value::Str("1.1.110".into())),
          ("enabled".into(), Value::Bool(true)),
        ])]),
      ),
      (
        "startup".into(),
        Value::Dict(vec![(
          "mod-a-setting-1".into(),
          Value::Dict(vec![("value".into(), Value::Bool(true))]),
        )]),
      ),
    ]);
    tree.encode(&mut buf).unwrap();
    buf
  }

  #[test]
  fn reads_mod_list_and_startup_settings_from_zip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("save.zip");

    let file = File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("level.dat0", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(&build_level_dat()).unwrap();
    zip.finish().unwrap();

    let save = SaveFile::open(&path).unwrap();
    assert_eq!(save.game_version, GameVersion::new(1, 1, 110, 0));
    assert_eq!(save.mod_list.len(), 1);
    assert_eq!(save.mod_list[0].name, "base");
    assert!(save.startup_settings.key_exists("mod-a-setting-1"));
  }

  #[test]
  fn missing_level_entry_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("save.zip");
    let file = File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("unrelated.txt", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(b"nothing").unwrap();
    zip.finish().unwrap();

    assert!(SaveFile::open(&path).is_err());
  }
}
