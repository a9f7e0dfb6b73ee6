//! `mod-settings.dat` (§4.5, §3 "Settings section").

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use crate::codec::primitives::{read_bool, write_bool};
use crate::codec::{format_rgba, parse_rgba, Value};
use crate::error::{Error, Result};
use crate::version::GameVersion;

/// The three sections a settings file may carry (§1, §3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
  Startup,
  RuntimeGlobal,
  RuntimePerUser,
}

impl SectionName {
  pub const ALL: [SectionName; 3] = [
    SectionName::Startup,
    SectionName::RuntimeGlobal,
    SectionName::RuntimePerUser,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      SectionName::Startup => "startup",
      SectionName::RuntimeGlobal => "runtime-global",
      SectionName::RuntimePerUser => "runtime-per-user",
    }
  }
}

impl FromStr for SectionName {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "startup" => Ok(SectionName::Startup),
      "runtime-global" => Ok(SectionName::RuntimeGlobal),
      "runtime-per-user" => Ok(SectionName::RuntimePerUser),
      other => Err(Error::InvalidSectionError(other.to_string())),
    }
  }
}

/// One setting value. `Signed`/`Unsigned`/`Double` all serialize to the same
/// property-tree `double` tag (the wire format has no separate integer tag);
/// on decode, a whole-number double is reconstructed as `Signed`, matching
/// how the game's own settings values are almost always declared as
/// integers (see DESIGN.md for the Open Question this resolves).
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
  Bool(bool),
  Signed(i64),
  Unsigned(u64),
  Double(f64),
  String(String),
  /// `"rgba:RRGGBBAA"`.
  Color(String),
  List(Vec<SettingValue>),
  Dict(Vec<(String, SettingValue)>),
}

impl SettingValue {
  fn to_value(&self) -> Result<Value> {
    Ok(match self {
      SettingValue::Bool(b) => Value::Bool(*b),
      SettingValue::Signed(i) => Value::Number(*i as f64),
      SettingValue::Unsigned(u) => Value::Number(*u as f64),
      SettingValue::Double(d) => Value::Number(*d),
      SettingValue::String(s) => Value::Str(s.clone()),
      SettingValue::Color(c) => parse_rgba(c)?,
      SettingValue::List(items) => {
        Value::List(items.iter().map(SettingValue::to_value).collect::<Result<_>>()?)
      }
      SettingValue::Dict(entries) => Value::Dict(
        entries
          .iter()
          .map(|(k, v)| Ok((k.clone(), v.to_value()?)))
          .collect::<Result<_>>()?,
      ),
    })
  }

  pub(crate) fn from_value(value: &Value) -> SettingValue {
    match value {
      Value::Bool(b) => SettingValue::Bool(*b),
      Value::Number(n) => {
        if n.fract() == 0.0 && n.abs() < 2f64.powi(63) {
          SettingValue::Signed(*n as i64)
        } else {
          SettingValue::Double(*n)
        }
      }
      Value::Str(s) => SettingValue::String(s.clone()),
      Value::List(items) => SettingValue::List(items.iter().map(SettingValue::from_value).collect()),
      Value::Dict(entries) => match format_rgba(value) {
        Some(color) => SettingValue::Color(color),
        None => SettingValue::Dict(
          entries
            .iter()
            .map(|(k, v)| (k.clone(), SettingValue::from_value(v)))
            .collect(),
        ),
      },
    }
  }

  /// JSON form used by `mod settings dump`/`restore` (§6 CLI surface). Tagged
  /// so a round trip through JSON can tell `Signed`/`Unsigned`/`Double` apart
  /// even though they share one wire tag.
  fn to_json(&self) -> serde_json::Value {
    match self {
      SettingValue::Bool(b) => serde_json::json!({"type": "bool", "value": b}),
      SettingValue::Signed(i) => serde_json::json!({"type": "signed", "value": i}),
      SettingValue::Unsigned(u) => serde_json::json!({"type": "unsigned", "value": u}),
      SettingValue::Double(d) => serde_json::json!({"type": "double", "value": d}),
      SettingValue::String(s) => serde_json::json!({"type": "string", "value": s}),
      SettingValue::Color(c) => serde_json::json!({"type": "color", "value": c}),
      SettingValue::List(items) => {
        serde_json::json!({"type": "list", "value": items.iter().map(SettingValue::to_json).collect::<Vec<_>>()})
      }
      SettingValue::Dict(entries) => serde_json::json!({
        "type": "dict",
        "value": entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect::<serde_json::Map<_, _>>(),
      }),
    }
  }

  fn from_json(value: &serde_json::Value) -> Result<SettingValue> {
    let bad = || Error::FileFormatError(format!("malformed setting dump entry: {value}"));
    let tag = value.get("type").and_then(|t| t.as_str()).ok_or_else(bad)?;
    let inner = value.get("value").ok_or_else(bad)?;
    Ok(match tag {
      "bool" => SettingValue::Bool(inner.as_bool().ok_or_else(bad)?),
      "signed" => SettingValue::Signed(inner.as_i64().ok_or_else(bad)?),
      "unsigned" => SettingValue::Unsigned(inner.as_u64().ok_or_else(bad)?),
      "double" => SettingValue::Double(inner.as_f64().ok_or_else(bad)?),
      "string" => SettingValue::String(inner.as_str().ok_or_else(bad)?.to_string()),
      "color" => SettingValue::Color(inner.as_str().ok_or_else(bad)?.to_string()),
      "list" => SettingValue::List(
        inner
          .as_array()
          .ok_or_else(bad)?
          .iter()
          .map(SettingValue::from_json)
          .collect::<Result<_>>()?,
      ),
      "dict" => SettingValue::Dict(
        inner
          .as_object()
          .ok_or_else(bad)?
          .iter()
          .map(|(k, v)| Ok((k.clone(), SettingValue::from_json(v)?)))
          .collect::<Result<_>>()?,
      ),
      _ => return Err(bad()),
    })
  }
}

/// An ordered key -> value map for one section.
#[derive(Debug, Clone, Default)]
pub struct Section {
  entries: Vec<(String, SettingValue)>,
}

impl Section {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&SettingValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn fetch(&self, key: &str) -> Option<&SettingValue> {
    self.get(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: SettingValue) {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(existing) => existing.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn key_exists(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn values(&self) -> impl Iterator<Item = &SettingValue> {
    self.entries.iter().map(|(_, v)| v)
  }

  pub fn each_pair(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn size(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn to_map(&self) -> HashMap<String, SettingValue> {
    self.entries.iter().cloned().collect()
  }

  fn to_value(&self) -> Result<Value> {
    Ok(Value::Dict(
      self
        .entries
        .iter()
        .map(|(k, v)| Ok((k.clone(), Value::Dict(vec![("value".to_string(), v.to_value()?)]))))
        .collect::<Result<_>>()?,
    ))
  }

  fn from_value(value: &Value) -> Result<Section> {
    let entries = value
      .as_dict()
      .ok_or_else(|| Error::FileFormatError("section is not a dictionary".into()))?;

    let mut section = Section::new();
    for (name, wrapper) in entries {
      let inner = wrapper
        .dict_get("value")
        .ok_or_else(|| Error::FileFormatError(format!("setting `{name}` has no `value` key")))?;
      section.set(name.clone(), SettingValue::from_value(inner));
    }
    Ok(section)
  }

  fn to_json(&self) -> serde_json::Value {
    serde_json::Value::Object(self.entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
  }

  fn from_json(value: &serde_json::Value) -> Result<Section> {
    let entries = value
      .as_object()
      .ok_or_else(|| Error::FileFormatError("section dump is not an object".into()))?;
    let mut section = Section::new();
    for (key, raw) in entries {
      section.set(key.clone(), SettingValue::from_json(raw)?);
    }
    Ok(section)
  }
}

/// The three-section settings artifact (§4.5).
#[derive(Debug, Clone)]
pub struct SettingsFile {
  pub game_version: GameVersion,
  sections: HashMap<SectionName, Section>,
}

impl SettingsFile {
  pub fn new(game_version: GameVersion) -> Self {
    Self {
      game_version,
      sections: SectionName::ALL.into_iter().map(|name| (name, Section::new())).collect(),
    }
  }

  pub fn sections(&self) -> impl Iterator<Item = (SectionName, &Section)> {
    SectionName::ALL.into_iter().filter_map(move |name| self.sections.get(&name).map(|s| (name, s)))
  }

  pub fn section(&self, name: SectionName) -> &Section {
    self.sections.get(&name).expect("all section names are pre-populated")
  }

  pub fn section_mut(&mut self, name: SectionName) -> &mut Section {
    self.sections.entry(name).or_default()
  }

  pub fn load(path: &Path) -> Result<Self> {
    let bytes = fs::read(path)?;
    let mut cursor = Cursor::new(bytes.as_slice());

    let game_version = crate::codec::primitives::read_game_version(&mut cursor)?;
    let _reserved = read_bool(&mut cursor)?;
    let tree = Value::decode(&mut cursor)?;

    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
      return Err(Error::ExtraDataError {
        path: path.to_path_buf(),
        extra_bytes: bytes.len() - consumed,
      });
    }

    let top_level = tree
      .as_dict()
      .ok_or_else(|| Error::FileFormatError("settings file root is not a dictionary".into()))?;

    let mut file = SettingsFile::new(game_version);
    for (key, value) in top_level {
      let name: SectionName = key.parse()?;
      file.sections.insert(name, Section::from_value(value)?);
    }
    Ok(file)
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    crate::codec::primitives::write_game_version(&mut buf, self.game_version)?;
    write_bool(&mut buf, false)?;

    let entries = SectionName::ALL
      .into_iter()
      .map(|name| Ok((name.as_str().to_string(), self.section(name).to_value()?)))
      .collect::<Result<_>>()?;
    Value::Dict(entries).encode(&mut buf)?;

    fs::write(path, buf)?;
    Ok(())
  }

  /// Renders this file as the JSON document `mod settings dump` prints
  /// (§6). `from_json_dump` is its exact inverse, so `restore` can rebuild a
  /// `SettingsFile` and hand it to [`SettingsFile::save`].
  pub fn to_json_dump(&self) -> serde_json::Value {
    serde_json::json!({
      "game_version": self.game_version.to_string(),
      "sections": SectionName::ALL
        .into_iter()
        .map(|name| (name.as_str().to_string(), self.section(name).to_json()))
        .collect::<serde_json::Map<_, _>>(),
    })
  }

  pub fn from_json_dump(value: &serde_json::Value) -> Result<Self> {
    let bad = || Error::FileFormatError("malformed settings dump".into());
    let game_version: GameVersion = value
      .get("game_version")
      .and_then(|v| v.as_str())
      .ok_or_else(bad)?
      .parse()?;
    let sections = value.get("sections").and_then(|v| v.as_object()).ok_or_else(bad)?;

    let mut file = SettingsFile::new(game_version);
    for (key, raw) in sections {
      let name: SectionName = key.parse()?;
      file.sections.insert(name, Section::from_json(raw)?);
    }
    Ok(file)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn scenario_1_settings_roundtrip() {
    let mut file = SettingsFile::new(GameVersion::new(1, 1, 110, 0));

    file.section_mut(SectionName::Startup).set("mod-a-setting-1", SettingValue::Bool(true));
    file.section_mut(SectionName::Startup).set("mod-a-setting-2", SettingValue::Signed(42));
    file
      .section_mut(SectionName::RuntimeGlobal)
      .set("mod-c-setting-2", SettingValue::Color("rgba:ff0000ff".into()));
    file
      .section_mut(SectionName::RuntimePerUser)
      .set("mod-e-setting-2", SettingValue::Bool(false));
    file
      .section_mut(SectionName::RuntimePerUser)
      .set("mod-e-setting-3", SettingValue::Double(2.5));

    let dir = tempdir().unwrap();
    let path = dir.path().join("mod-settings.dat");
    file.save(&path).unwrap();

    let reloaded = SettingsFile::load(&path).unwrap();
    assert_eq!(reloaded.game_version, GameVersion::new(1, 1, 110, 0));
    assert_eq!(
      reloaded.section(SectionName::Startup).get("mod-a-setting-1"),
      Some(&SettingValue::Bool(true))
    );
    assert_eq!(
      reloaded.section(SectionName::Startup).get("mod-a-setting-2"),
      Some(&SettingValue::Signed(42))
    );
    assert_eq!(
      reloaded.section(SectionName::RuntimeGlobal).get("mod-c-setting-2"),
      Some(&SettingValue::Color("rgba:FF0000FF".into()))
    );
    assert_eq!(
      reloaded.section(SectionName::RuntimePerUser).get("mod-e-setting-3"),
      Some(&SettingValue::Double(2.5))
    );
  }

  #[test]
  fn json_dump_roundtrip() {
    let mut file = SettingsFile::new(GameVersion::new(1, 1, 110, 0));
    file.section_mut(SectionName::Startup).set("mod-a-setting-1", SettingValue::Bool(true));
    file.section_mut(SectionName::Startup).set("mod-a-setting-2", SettingValue::Signed(42));
    file
      .section_mut(SectionName::RuntimeGlobal)
      .set("mod-c-setting-2", SettingValue::Color("rgba:FF0000FF".into()));
    file
      .section_mut(SectionName::RuntimePerUser)
      .set("mod-e-setting-3", SettingValue::Double(2.5));

    let dump = file.to_json_dump();
    let restored = SettingsFile::from_json_dump(&dump).unwrap();

    assert_eq!(restored.game_version, file.game_version);
    assert_eq!(
      restored.section(SectionName::Startup).get("mod-a-setting-2"),
      Some(&SettingValue::Signed(42))
    );
    assert_eq!(
      restored.section(SectionName::RuntimeGlobal).get("mod-c-setting-2"),
      Some(&SettingValue::Color("rgba:FF0000FF".into()))
    );
    assert_eq!(
      restored.section(SectionName::RuntimePerUser).get("mod-e-setting-3"),
      Some(&SettingValue::Double(2.5))
    );
  }

  #[test]
  fn rejects_unsupported_section_name() {
    assert!("bogus-section".parse::<SectionName>().is_err());
  }

  #[test]
  fn extra_trailing_bytes_fail() {
    let file = SettingsFile::new(GameVersion::new(1, 1, 0, 0));
    let dir = tempdir().unwrap();
    let path = dir.path().join("mod-settings.dat");
    file.save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.push(0xAA);
    fs::write(&path, bytes).unwrap();

    assert!(matches!(SettingsFile::load(&path), Err(Error::ExtraDataError { .. })));
  }
}
