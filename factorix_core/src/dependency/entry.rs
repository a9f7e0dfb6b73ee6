use serde::{Deserialize, Serialize};

use crate::modid::ModId;
use crate::version::VersionRequirement;

/// The five dependency kinds a single entry can carry (§3 "Dependency
/// entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
  Required,
  Optional,
  HiddenOptional,
  Incompatible,
  LoadNeutral,
}

impl DependencyKind {
  /// True for the only edge kind that participates in topological sort and
  /// cycle detection (§3 Invariants).
  pub fn is_required(self) -> bool {
    matches!(self, DependencyKind::Required)
  }
}

/// `{mod_id, kind, version_requirement?}`, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEntry {
  pub mod_id: ModId,
  pub kind: DependencyKind,
  pub version_requirement: Option<VersionRequirement>,
}

impl DependencyEntry {
  pub fn new(mod_id: ModId, kind: DependencyKind, version_requirement: Option<VersionRequirement>) -> Self {
    Self {
      mod_id,
      kind,
      version_requirement,
    }
  }
}
