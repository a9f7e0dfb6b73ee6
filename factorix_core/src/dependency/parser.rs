//! Dependency string parser (§4.1).
//!
//! A small PEG-shaped grammar over `?`/`!`/`~`/`(?)` prefixes and an
//! optional version comparison suffix, built with `once_cell` + `regex` and
//! named capture groups, the same technique comparable dependency-string
//! parsers in the Factorio-ecosystem crates use.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::Error;
use crate::modid::ModId;
use crate::version::{ModVersion, VersionRequirement};

use super::entry::{DependencyEntry, DependencyKind};

static DEPENDENCY_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
    ^\s*
    (?P<prefix>\(\?\)|!|\?|~)?\s*
    (?P<name>[A-Za-z0-9_-]+(?:\s+[A-Za-z0-9_-]+)*)
    (?:\s*(?P<op>>=|<=|>|<|=)\s*(?P<version>[0-9]+\.[0-9]+(?:\.[0-9]+)?))?
    \s*$
    ",
  )
  .expect("static dependency regex is valid")
});

/// Parses one dependency string into a typed entry.
///
/// Empty input, an empty name once the prefix is stripped, or an empty
/// version following an operator all fail with `Error::DependencyParseError`.
/// A version whose components don't fit an 8-bit MOD version number is
/// dropped with a warning rather than failing the whole parse (§4.1 "Error
/// modes").
pub fn parse_dependency(input: &str) -> Result<DependencyEntry, Error> {
  if input.trim().is_empty() {
    return Err(Error::DependencyParseError("empty dependency string".into()));
  }

  let captures = DEPENDENCY_REGEX
    .captures(input)
    .ok_or_else(|| Error::DependencyParseError(format!("malformed dependency string: `{input}`")))?;

  let kind = match captures.name("prefix").map(|m| m.as_str()) {
    None => DependencyKind::Required,
    Some("?") => DependencyKind::Optional,
    Some("(?)") => DependencyKind::HiddenOptional,
    Some("!") => DependencyKind::Incompatible,
    Some("~") => DependencyKind::LoadNeutral,
    Some(other) => {
      return Err(Error::DependencyParseError(format!(
        "unrecognized dependency prefix `{other}` in `{input}`"
      )))
    }
  };

  let name = captures
    .name("name")
    .map(|m| m.as_str().trim())
    .filter(|s| !s.is_empty())
    .ok_or_else(|| Error::DependencyParseError(format!("empty mod name in `{input}`")))?;

  let version_requirement = match (captures.name("op"), captures.name("version")) {
    (Some(op), Some(version)) => {
      let version = version.as_str();
      if version.trim().is_empty() {
        return Err(Error::DependencyParseError(format!(
          "empty version after operator in `{input}`"
        )));
      }
      parse_operator_and_version(op.as_str(), version, input)?
    }
    (None, None) => None,
    _ => {
      return Err(Error::DependencyParseError(format!(
        "dependency constraint missing operator or version in `{input}`"
      )))
    }
  };

  Ok(DependencyEntry::new(ModId::new(name), kind, version_requirement))
}

fn parse_operator_and_version(
  op: &str,
  version: &str,
  original_input: &str,
) -> Result<Option<VersionRequirement>, Error> {
  let (operator, _) = crate::version::VersionOperator::parse_prefix(op).ok_or_else(|| {
    Error::DependencyParseError(format!("unknown version operator `{op}` in `{original_input}`"))
  })?;

  let parts: Vec<&str> = version.split('.').collect();
  if parts.len() < 2 || parts.len() > 3 {
    return Err(Error::DependencyParseError(format!(
      "malformed version `{version}` in `{original_input}`"
    )));
  }

  let mut raw = [0u32; 3];
  for (slot, part) in raw.iter_mut().zip(parts.iter()) {
    *slot = match part.parse::<u32>() {
      Ok(value) => value,
      Err(_) => {
        return Err(Error::DependencyParseError(format!(
          "non-numeric version component `{part}` in `{original_input}`"
        )))
      }
    };
  }

  if raw.iter().any(|&component| component > u8::MAX as u32) {
    warn!(
      "dependency `{}` declares a version requirement outside the 8-bit MOD version range ({}); dropping the requirement",
      original_input, version
    );
    return Ok(None);
  }

  let mod_version = ModVersion::new(raw[0] as u8, raw[1] as u8, raw[2] as u8);
  Ok(Some(VersionRequirement::new(operator, mod_version)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_bare_name() {
    let entry = parse_dependency("base").unwrap();
    assert_eq!(entry.mod_id.as_str(), "base");
    assert_eq!(entry.kind, DependencyKind::Required);
    assert!(entry.version_requirement.is_none());
  }

  #[test]
  fn parses_optional_with_constraint() {
    let entry = parse_dependency("? some-mod >= 1.2.0").unwrap();
    assert_eq!(entry.mod_id.as_str(), "some-mod");
    assert_eq!(entry.kind, DependencyKind::Optional);
    let req = entry.version_requirement.unwrap();
    assert_eq!(req.version, ModVersion::new(1, 2, 0));
  }

  #[test]
  fn parses_hidden_optional() {
    let entry = parse_dependency("(?) hidden-mod").unwrap();
    assert_eq!(entry.kind, DependencyKind::HiddenOptional);
  }

  #[test]
  fn parses_incompatible() {
    let entry = parse_dependency("! bad-mod").unwrap();
    assert_eq!(entry.kind, DependencyKind::Incompatible);
  }

  #[test]
  fn parses_load_neutral() {
    let entry = parse_dependency("~ neutral-mod").unwrap();
    assert_eq!(entry.kind, DependencyKind::LoadNeutral);
  }

  #[test]
  fn rejects_empty_input() {
    assert!(parse_dependency("").is_err());
    assert!(parse_dependency("   ").is_err());
  }

  #[test]
  fn longest_operator_matches_first() {
    let entry = parse_dependency("x >= 1.2.3").unwrap();
    let req = entry.version_requirement.unwrap();
    assert_eq!(req.operator, crate::version::VersionOperator::Ge);
  }

  #[test]
  fn drops_out_of_range_version_without_failing() {
    let entry = parse_dependency("huge-mod >= 1.2.999").unwrap();
    assert_eq!(entry.mod_id.as_str(), "huge-mod");
    assert!(entry.version_requirement.is_none());
  }

  #[test]
  fn two_component_version_defaults_patch_to_zero() {
    let entry = parse_dependency("some-mod >= 1.2").unwrap();
    let req = entry.version_requirement.unwrap();
    assert_eq!(req.version, ModVersion::new(1, 2, 0));
  }
}
