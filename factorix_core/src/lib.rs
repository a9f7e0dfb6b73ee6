//! Version/constraint types, the dependency model, the dependency graph and
//! its validator, the property-tree binary codec, the settings and
//! mod-list file formats, the installed-MOD scanner, and save-file reading.
//!
//! Everything that performs outbound network I/O, caching, or multi-command
//! orchestration lives in sibling crates (`factorix_cache`,
//! `factorix_transfer`, `factorix_portal`, `factorix_planner`); this crate
//! only owns parsing, in-memory modeling, and local-disk formats.

pub mod codec;
pub mod constants;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod installed;
pub mod modid;
pub mod modlist;
pub mod remote;
pub mod savefile;
pub mod settings;
pub mod version;

/// Re-exports of the types most call sites need.
pub mod prelude {
  pub use crate::codec::{format_rgba, parse_rgba, Value};
  pub use crate::dependency::{parse_dependency, DependencyEntry, DependencyKind, DependencyList};
  pub use crate::error::{Error, Result};
  pub use crate::graph::validator::{validate, ValidationError, ValidationResult, ValidationWarning};
  pub use crate::graph::{Graph, GraphEdge, GraphNode, PlannedOp};
  pub use crate::installed::{scan as scan_installed_mods, InfoJson, InstalledMod, ModStructure};
  pub use crate::modid::ModId;
  pub use crate::modlist::{ModListEntry, ModListFile};
  pub use crate::remote::{License, ModDetail, ModSummary, Release, ReleaseManifest};
  pub use crate::savefile::SaveFile;
  pub use crate::settings::{Section, SectionName, SettingValue, SettingsFile};
  pub use crate::version::{GameVersion, ModVersion, VersionOperator, VersionRequirement};
}
