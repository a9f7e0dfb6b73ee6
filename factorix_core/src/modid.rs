//! MOD identifiers (§3 "MOD identifier").
//!
//! Identifiers compare case-insensitively, with one exception: the literal
//! name `base` always sorts first. `base` and `space-age` carry the
//! `is_base`/`is_expansion` predicates used throughout the graph and
//! validator.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const BASE_MOD_NAME: &str = "base";
pub const EXPANSION_MOD_NAME: &str = "space-age";

/// A case-insensitive MOD name with the `base`-sorts-first ordering rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModId(String);

impl ModId {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_base(&self) -> bool {
    self.0.eq_ignore_ascii_case(BASE_MOD_NAME)
  }

  pub fn is_expansion(&self) -> bool {
    self.0.eq_ignore_ascii_case(EXPANSION_MOD_NAME)
  }

  fn lower(&self) -> String {
    self.0.to_ascii_lowercase()
  }
}

impl fmt::Display for ModId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ModId {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl From<String> for ModId {
  fn from(value: String) -> Self {
    Self::new(value)
  }
}

impl PartialEq for ModId {
  fn eq(&self, other: &Self) -> bool {
    self.lower() == other.lower()
  }
}

impl Eq for ModId {}

impl Hash for ModId {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.lower().hash(state);
  }
}

impl PartialOrd for ModId {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for ModId {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.is_base(), other.is_base()) {
      (true, true) => Ordering::Equal,
      (true, false) => Ordering::Less,
      (false, true) => Ordering::Greater,
      (false, false) => self.lower().cmp(&other.lower()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base_sorts_first() {
    let mut ids = vec![ModId::new("zzz"), ModId::new("Base"), ModId::new("aaa")];
    ids.sort();
    assert_eq!(ids[0].as_str(), "Base");
  }

  #[test]
  fn case_insensitive_equality_and_order() {
    assert_eq!(ModId::new("Foo"), ModId::new("foo"));
    assert!(ModId::new("Apple") < ModId::new("banana"));
  }

  #[test]
  fn predicates() {
    assert!(ModId::new("BASE").is_base());
    assert!(ModId::new("space-age").is_expansion());
    assert!(!ModId::new("bobs-mods").is_base());
  }
}
