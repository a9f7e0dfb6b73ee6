//! MOD and game version types, and the version-requirement predicate used by
//! the dependency model (§3 "Version (MOD)" / "Version (game)" / "Version
//! requirement").

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A MOD version: three unsigned-8 components, compared and ordered
/// component-wise. Parses from and renders to `N.N.N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModVersion {
  pub major: u8,
  pub minor: u8,
  pub patch: u8,
}

impl ModVersion {
  pub fn new(major: u8, minor: u8, patch: u8) -> Self {
    Self { major, minor, patch }
  }
}

impl fmt::Display for ModVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl FromStr for ModVersion {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.trim().split('.').collect();
    if parts.len() != 3 {
      return Err(Error::VersionParseError(format!(
        "mod version must have exactly 3 components: `{s}`"
      )));
    }
    let mut components = [0u8; 3];
    for (slot, part) in components.iter_mut().zip(parts.iter()) {
      *slot = part
        .parse::<u8>()
        .map_err(|_| Error::VersionParseError(format!("invalid mod version component in `{s}`")))?;
    }
    Ok(Self::new(components[0], components[1], components[2]))
  }
}

impl TryFrom<String> for ModVersion {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<ModVersion> for String {
  fn from(value: ModVersion) -> Self {
    value.to_string()
  }
}

/// A game version: four unsigned-16 components. Parses from `N.N.N[-N]`;
/// an absent build component renders/reads as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameVersion {
  pub major: u16,
  pub minor: u16,
  pub patch: u16,
  pub build: u16,
}

impl GameVersion {
  pub fn new(major: u16, minor: u16, patch: u16, build: u16) -> Self {
    Self {
      major,
      minor,
      patch,
      build,
    }
  }
}

impl fmt::Display for GameVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, self.build)
  }
}

impl FromStr for GameVersion {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (main, build) = match s.trim().split_once('-') {
      Some((main, build)) => (main, Some(build)),
      None => (s.trim(), None),
    };
    let parts: Vec<&str> = main.split('.').collect();
    if parts.len() != 3 {
      return Err(Error::VersionParseError(format!(
        "game version must have exactly 3 dotted components: `{s}`"
      )));
    }
    let mut components = [0u16; 3];
    for (slot, part) in components.iter_mut().zip(parts.iter()) {
      *slot = part
        .parse::<u16>()
        .map_err(|_| Error::VersionParseError(format!("invalid game version component in `{s}`")))?;
    }
    let build = match build {
      Some(b) => b
        .parse::<u16>()
        .map_err(|_| Error::VersionParseError(format!("invalid game version build in `{s}`")))?,
      None => 0,
    };
    Ok(Self::new(components[0], components[1], components[2], build))
  }
}

impl TryFrom<String> for GameVersion {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<GameVersion> for String {
  fn from(value: GameVersion) -> Self {
    value.to_string()
  }
}

/// The six comparison operators a dependency string can carry (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionOperator {
  Lt,
  Le,
  Eq,
  Ge,
  Gt,
}

impl VersionOperator {
  /// Parses the operator, preferring the two-character forms so `>=` is
  /// never mistakenly split into `>` followed by `=` (§4.1 tie-break rule).
  pub fn parse_prefix(s: &str) -> Option<(Self, &str)> {
    for (token, op) in [
      (">=", VersionOperator::Ge),
      ("<=", VersionOperator::Le),
      (">", VersionOperator::Gt),
      ("<", VersionOperator::Lt),
      ("=", VersionOperator::Eq),
    ] {
      if let Some(rest) = s.strip_prefix(token) {
        return Some((op, rest));
      }
    }
    None
  }

  fn evaluate(self, ordering: Ordering) -> bool {
    match self {
      VersionOperator::Lt => ordering == Ordering::Less,
      VersionOperator::Le => ordering != Ordering::Greater,
      VersionOperator::Eq => ordering == Ordering::Equal,
      VersionOperator::Ge => ordering != Ordering::Less,
      VersionOperator::Gt => ordering == Ordering::Greater,
    }
  }
}

impl fmt::Display for VersionOperator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      VersionOperator::Lt => "<",
      VersionOperator::Le => "<=",
      VersionOperator::Eq => "=",
      VersionOperator::Ge => ">=",
      VersionOperator::Gt => ">",
    })
  }
}

/// `{operator, version}`, evaluated as `candidate op requirement_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRequirement {
  pub operator: VersionOperator,
  pub version: ModVersion,
}

impl VersionRequirement {
  pub fn new(operator: VersionOperator, version: ModVersion) -> Self {
    Self { operator, version }
  }

  pub fn matches(&self, candidate: ModVersion) -> bool {
    self.operator.evaluate(candidate.cmp(&self.version))
  }
}

impl fmt::Display for VersionRequirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.operator, self.version)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mod_version_roundtrip() {
    let v = ModVersion::new(1, 2, 3);
    assert_eq!(v.to_string().parse::<ModVersion>().unwrap(), v);
  }

  #[test]
  fn mod_version_rejects_out_of_range() {
    assert!("1.2.300".parse::<ModVersion>().is_err());
  }

  #[test]
  fn game_version_roundtrip_with_build() {
    let v: GameVersion = "1.1.110-5".parse().unwrap();
    assert_eq!(v, GameVersion::new(1, 1, 110, 5));
    assert_eq!(v.to_string(), "1.1.110-5");
  }

  #[test]
  fn game_version_defaults_build_to_zero() {
    let v: GameVersion = "1.1.110".parse().unwrap();
    assert_eq!(v.build, 0);
    assert_eq!(v.to_string(), "1.1.110-0");
  }

  #[test]
  fn version_requirement_evaluates_operators() {
    let req = VersionRequirement::new(VersionOperator::Ge, ModVersion::new(2, 0, 0));
    assert!(req.matches(ModVersion::new(2, 0, 0)));
    assert!(req.matches(ModVersion::new(3, 0, 0)));
    assert!(!req.matches(ModVersion::new(1, 9, 9)));
  }

  #[test]
  fn operator_prefers_longest_match() {
    let (op, rest) = VersionOperator::parse_prefix(">=1.2.3").unwrap();
    assert_eq!(op, VersionOperator::Ge);
    assert_eq!(rest, "1.2.3");
  }
}
