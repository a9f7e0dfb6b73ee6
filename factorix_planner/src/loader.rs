//! Load phase (§4.9 "Each command runs in three phases"): scans the mods
//! directory, reads `mod-list.json`, and builds the dependency graph those
//! feed into.

use std::collections::HashMap;

use factorix_core::dependency::parse_dependency;
use factorix_core::graph::{Graph, GraphEdge, GraphNode};
use factorix_core::installed::{scan, InstalledMod};
use factorix_core::modid::ModId;
use factorix_core::modlist::ModListFile;
use factorix_core::version::ModVersion;

use crate::error::Result;
use crate::paths::Paths;

pub struct LoadedState {
  pub graph: Graph,
  pub mod_list: ModListFile,
  /// Installed versions of a MOD besides the one the graph node carries,
  /// used by the validator to suggest a satisfying version already on disk.
  pub other_installed_versions: HashMap<ModId, Vec<ModVersion>>,
}

pub fn load(paths: &Paths) -> Result<LoadedState> {
  let installed = scan(paths.mods_directory())?;
  let mod_list = if paths.mod_list.exists() {
    ModListFile::load(&paths.mod_list)?
  } else {
    ModListFile::default()
  };

  let mut by_id: HashMap<ModId, Vec<&InstalledMod>> = HashMap::new();
  for m in &installed {
    by_id.entry(m.mod_id.clone()).or_default().push(m);
  }

  let mut graph = Graph::new();
  let mut other_installed_versions = HashMap::new();
  let mut chosen_mods: Vec<&InstalledMod> = Vec::with_capacity(by_id.len());

  for (mod_id, mut versions) in by_id {
    versions.sort_by_key(|m| m.version);
    let chosen = versions.last().expect("non-empty by construction");
    let others: Vec<ModVersion> = versions[..versions.len() - 1].iter().map(|m| m.version).collect();
    if !others.is_empty() {
      other_installed_versions.insert(mod_id.clone(), others);
    }

    let enabled = mod_list
      .entry(&mod_id)
      .map(|e| e.enabled)
      .unwrap_or(false);

    graph.add_node(GraphNode::new(mod_id, chosen.version, enabled, true))?;
    chosen_mods.push(chosen);
  }

  // Only the chosen (highest) version's own `info.json` feeds edges — its
  // `mod_id` is the graph node's identity, so a non-chosen version's possibly
  // different dependency list must not also contribute edges from that id.
  for m in chosen_mods {
    for dep in &m.manifest.dependencies {
      let entry = match parse_dependency(dep) {
        Ok(entry) => entry,
        Err(e) => {
          tracing::warn!(mod_id = %m.mod_id, error = %e, "skipping unparseable dependency string");
          continue;
        }
      };
      if entry.mod_id.is_base() {
        continue;
      }
      graph.add_edge(GraphEdge {
        from: m.mod_id.clone(),
        to: entry.mod_id,
        kind: entry.kind,
        requirement: entry.version_requirement,
      })?;
    }
  }

  Ok(LoadedState {
    graph,
    mod_list,
    other_installed_versions,
  })
}
