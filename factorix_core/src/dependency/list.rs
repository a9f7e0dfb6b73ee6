use serde::{Deserialize, Serialize};

use crate::modid::ModId;

use super::entry::{DependencyEntry, DependencyKind};

/// An ordered sequence of dependency entries with filter views and
/// membership predicates (§3 "Dependency list").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyList {
  entries: Vec<DependencyEntry>,
}

impl DependencyList {
  pub fn new(entries: Vec<DependencyEntry>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[DependencyEntry] {
    &self.entries
  }

  pub fn required(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.filtered(DependencyKind::Required)
  }

  pub fn optional(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.filtered(DependencyKind::Optional)
  }

  pub fn hidden_optional(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.filtered(DependencyKind::HiddenOptional)
  }

  pub fn incompatible(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.filtered(DependencyKind::Incompatible)
  }

  pub fn load_neutral(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.filtered(DependencyKind::LoadNeutral)
  }

  fn filtered(&self, kind: DependencyKind) -> impl Iterator<Item = &DependencyEntry> {
    self.entries.iter().filter(move |e| e.kind == kind)
  }

  pub fn contains(&self, mod_id: &ModId) -> bool {
    self.entries.iter().any(|e| &e.mod_id == mod_id)
  }

  pub fn contains_kind(&self, mod_id: &ModId, kind: DependencyKind) -> bool {
    self.entries.iter().any(|e| &e.mod_id == mod_id && e.kind == kind)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &DependencyEntry> {
    self.entries.iter()
  }
}

impl FromIterator<DependencyEntry> for DependencyList {
  fn from_iter<T: IntoIterator<Item = DependencyEntry>>(iter: T) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dependency::parser::parse_dependency;

  #[test]
  fn filters_by_kind() {
    let list: DependencyList = ["base", "? opt-mod", "! bad-mod"]
      .iter()
      .map(|s| parse_dependency(s).unwrap())
      .collect();

    assert_eq!(list.required().count(), 1);
    assert_eq!(list.optional().count(), 1);
    assert_eq!(list.incompatible().count(), 1);
    assert!(list.contains(&ModId::new("bad-mod")));
  }
}
