//! The per-command load/validate/plan/execute phases (§4.9).
//!
//! `check`/`enable`/`disable`/`uninstall` mutate a [`LoadedState`] already
//! read from disk and are otherwise network-free. `install`/`download`/
//! `sync` additionally resolve and fetch remote MODs through
//! [`Services::portal`], downloading with the `--jobs` worker-pool width
//! (§5 "Scheduling model").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::info;

use factorix_core::dependency::DependencyKind;
use factorix_core::graph::validator::{validate, ValidationResult};
use factorix_core::graph::PlannedOp;
use factorix_core::installed::ModStructure;
use factorix_core::modid::ModId;
use factorix_core::modlist::ModListEntry;
use factorix_core::remote::{ModDetail, Release};
use factorix_core::savefile::SaveFile;
use factorix_core::settings::{SectionName, SettingsFile};
use factorix_core::version::{ModVersion, VersionRequirement};

use crate::error::{PlannerError, Result};
use crate::loader::LoadedState;
use crate::paths::Paths;
use crate::services::Services;

/// One `mod[@version]` input to `install`/`download`/`sync`.
#[derive(Debug, Clone)]
pub struct ModTarget {
  pub mod_id: ModId,
  pub version: Option<ModVersion>,
}

impl ModTarget {
  pub fn new(mod_id: ModId, version: Option<ModVersion>) -> Self {
    Self { mod_id, version }
  }
}

/// `sync`'s report: MODs newly installed and MODs disabled to resolve a
/// conflict with something the save file wants enabled (§4.9 "Conflict
/// resolution during sync").
#[derive(Debug, Default)]
pub struct SyncReport {
  pub installed: Vec<ModId>,
  pub disabled_for_conflict: Vec<(ModId, ModId)>,
}

fn ensure_game_not_running(paths: &Paths) -> Result<()> {
  if paths.game_is_running() {
    return Err(PlannerError::GameRunning(paths.game_running_lock.clone()));
  }
  Ok(())
}

/// `check` (§4.9): validate the loaded state as-is.
pub fn check(state: &LoadedState) -> ValidationResult {
  validate(&state.graph, Some(&state.mod_list), &state.other_installed_versions)
}

/// Keeps only the validation errors that name one of `ids`, used by `enable`
/// to scope its post-toggle validation to the targets it just affected
/// rather than the whole graph (§4.9).
fn errors_touching(
  errors: Vec<factorix_core::graph::validator::ValidationError>,
  ids: &std::collections::HashSet<ModId>,
) -> Vec<factorix_core::graph::validator::ValidationError> {
  use factorix_core::graph::validator::ValidationError;

  errors
    .into_iter()
    .filter(|error| match error {
      ValidationError::CircularDependency { members } => members.iter().any(|m| ids.contains(m)),
      ValidationError::MissingDependency { dependent, dependency }
      | ValidationError::DisabledDependency { dependent, dependency }
      | ValidationError::VersionMismatch { dependent, dependency, .. } => {
        ids.contains(dependent) || ids.contains(dependency)
      }
      ValidationError::Conflict { a, b } => ids.contains(a) || ids.contains(b),
    })
    .collect()
}

/// `enable [mods]` (§4.9): marks the targets `planned_op=enable`, then
/// recursively enables every disabled installed MOD reachable through a
/// required edge, validates the result, and rewrites the MOD list.
pub fn enable(paths: &Paths, state: &mut LoadedState, targets: &[ModId], backup_extension: Option<&str>) -> Result<Vec<ModId>> {
  ensure_game_not_running(paths)?;

  let mut queue: Vec<ModId> = Vec::new();
  for target in targets {
    if !state.graph.contains_node(target) {
      return Err(PlannerError::UnknownMod(target.as_str().to_string()));
    }
    queue.push(target.clone());
  }

  let mut affected = Vec::new();
  while let Some(id) = queue.pop() {
    let already_enabled = state.graph.node(&id).map(|n| n.enabled).unwrap_or(true);
    if already_enabled {
      continue;
    }

    {
      let node = state.graph.node_mut(&id).expect("checked above");
      node.enabled = true;
      node.planned_op = Some(PlannedOp::Enable);
    }
    affected.push(id.clone());

    let required_deps: Vec<ModId> = state
      .graph
      .edges_from(&id)
      .iter()
      .filter(|e| e.kind.is_required())
      .map(|e| e.to.clone())
      .collect();
    for dep in required_deps {
      if let Some(dep_node) = state.graph.node(&dep) {
        if dep_node.installed && !dep_node.enabled {
          queue.push(dep);
        }
      }
    }
  }

  // §4.9 "validate plan-only (new nodes + conflicts involving them)": a
  // full-graph validation would fail `enable` on pre-existing, unrelated
  // errors that have nothing to do with the targets just toggled on.
  let affected_ids: std::collections::HashSet<ModId> = affected.iter().cloned().collect();
  let result = validate(&state.graph, None, &HashMap::new());
  let relevant_errors = errors_touching(result.errors, &affected_ids);
  if !relevant_errors.is_empty() {
    return Err(PlannerError::ValidationFailed(relevant_errors));
  }

  for id in &affected {
    let version = state.graph.node(id).map(|n| n.version);
    state.mod_list.upsert(ModListEntry::new(id.as_str(), true, version));
  }
  state.mod_list.save(&paths.mod_list, backup_extension)?;

  Ok(affected)
}

/// `disable [mods]` (§4.9): marks the targets `planned_op=disable`, and
/// disables every *enabled dependent* found via
/// [`Graph::find_enabled_dependents`](factorix_core::graph::Graph::find_enabled_dependents),
/// transitively.
pub fn disable(paths: &Paths, state: &mut LoadedState, targets: &[ModId], backup_extension: Option<&str>) -> Result<Vec<ModId>> {
  ensure_game_not_running(paths)?;

  let mut queue: Vec<ModId> = Vec::new();
  for target in targets {
    if !state.graph.contains_node(target) {
      return Err(PlannerError::UnknownMod(target.as_str().to_string()));
    }
    queue.push(target.clone());
  }

  let mut affected = Vec::new();
  while let Some(id) = queue.pop() {
    let enabled = match state.graph.node(&id) {
      Some(node) => node.enabled,
      None => continue,
    };
    if !enabled {
      continue;
    }

    let dependents = state.graph.find_enabled_dependents(&id);

    let node = state.graph.node_mut(&id).expect("checked above");
    node.enabled = false;
    node.planned_op = Some(PlannedOp::Disable);
    affected.push(id.clone());

    queue.extend(dependents);
  }

  for id in &affected {
    let version = state.graph.node(id).map(|n| n.version);
    state.mod_list.upsert(ModListEntry::new(id.as_str(), false, version));
  }
  state.mod_list.save(&paths.mod_list, backup_extension)?;

  Ok(affected)
}

/// `uninstall [mods]` (§4.9): refuses if an enabled MOD outside the target
/// set has a required edge onto a target; otherwise removes each target's
/// on-disk form and its MOD-list entry.
pub fn uninstall(paths: &Paths, state: &mut LoadedState, targets: &[ModId]) -> Result<Vec<ModId>> {
  ensure_game_not_running(paths)?;

  let target_set: std::collections::HashSet<&ModId> = targets.iter().collect();

  for target in targets {
    if !state.graph.contains_node(target) {
      return Err(PlannerError::UnknownMod(target.as_str().to_string()));
    }
    for edge in state.graph.edges_to(target) {
      if !edge.kind.is_required() || target_set.contains(&edge.from) {
        continue;
      }
      let dependent_enabled = state.graph.node(&edge.from).map(|n| n.enabled).unwrap_or(false);
      if dependent_enabled {
        return Err(PlannerError::UninstallBlocked {
          subject: target.as_str().to_string(),
          dependent: edge.from.as_str().to_string(),
        });
      }
    }
  }

  let installed = factorix_core::installed::scan(paths.mods_directory())?;
  for target in targets {
    if let Some(found) = installed.iter().find(|m| &m.mod_id == target) {
      remove_mod_structure(&found.structure)?;
    }
    state.mod_list.remove(target);
  }
  state.mod_list.save(&paths.mod_list, None)?;

  Ok(targets.to_vec())
}

fn remove_mod_structure(structure: &ModStructure) -> Result<()> {
  match structure {
    ModStructure::Directory(path) => std::fs::remove_dir_all(path)?,
    ModStructure::Zip(path) | ModStructure::Symlink(path) => std::fs::remove_file(path)?,
  }
  Ok(())
}

/// Picks the release a request resolves to: an exact `requested_version` if
/// given, else the highest version satisfying `requirement` (if any), else
/// the most recently released (§4.9 "pick release (specified version, else
/// latest by `released_at`)").
fn pick_release<'a>(
  detail: &'a ModDetail,
  requested_version: Option<ModVersion>,
  requirement: Option<&VersionRequirement>,
) -> Option<&'a Release> {
  if let Some(version) = requested_version {
    return detail.releases.iter().find(|r| r.version == version);
  }
  let mut candidates: Vec<&Release> = detail.releases.iter().collect();
  if let Some(req) = requirement {
    candidates.retain(|r| req.matches(r.version));
  }
  candidates.into_iter().max_by_key(|r| r.released_at)
}

/// Resolves `specs` into graph nodes, then transitively resolves every
/// required dependency those nodes declare that isn't already a node,
/// fetching each one's info from the portal along the way (§4.9 "install").
async fn resolve_install_targets(
  services: &Services,
  state: &mut LoadedState,
  specs: &[ModTarget],
) -> Result<HashMap<ModId, Release>> {
  let mut resolved: HashMap<ModId, Release> = HashMap::new();
  let mut queue: Vec<ModId> = Vec::new();

  for spec in specs {
    if state.graph.contains_node(&spec.mod_id) {
      continue;
    }
    let detail = services.portal.get_mod_full(spec.mod_id.as_str()).await?;
    let release = pick_release(&detail, spec.version, None)
      .ok_or_else(|| PlannerError::UnknownMod(format!("{} has no release matching the request", spec.mod_id)))?
      .clone();
    state.graph.add_uninstalled(spec.mod_id.clone(), &release, PlannedOp::Install)?;
    resolved.insert(spec.mod_id.clone(), release);
    queue.push(spec.mod_id.clone());
  }

  while let Some(id) = queue.pop() {
    let required: Vec<(ModId, Option<VersionRequirement>)> = state
      .graph
      .edges_from(&id)
      .iter()
      .filter(|e| e.kind == DependencyKind::Required)
      .map(|e| (e.to.clone(), e.requirement))
      .collect();

    for (dep_id, requirement) in required {
      if state.graph.contains_node(&dep_id) {
        continue;
      }
      let detail = services.portal.get_mod_full(dep_id.as_str()).await?;
      let release = pick_release(&detail, None, requirement.as_ref())
        .ok_or_else(|| PlannerError::UnknownMod(format!("{dep_id} has no release satisfying its requirement")))?
        .clone();
      state.graph.add_uninstalled(dep_id.clone(), &release, PlannedOp::Install)?;
      resolved.insert(dep_id.clone(), release);
      queue.push(dep_id);
    }
  }

  Ok(resolved)
}

/// Downloads every resolved release into the mods directory, in parallel,
/// bounded by `services.jobs` (§5 "fixed-width worker pool").
async fn download_into_mods_directory(services: &Services, resolved: &HashMap<ModId, Release>) -> Result<()> {
  let jobs = services.jobs.max(1);
  let downloads: Vec<(ModId, Release)> = resolved.iter().map(|(id, release)| (id.clone(), release.clone())).collect();

  let results: Vec<Result<ModId>> = stream::iter(downloads.into_iter().map(|(id, release)| {
    let services = services.clone();
    async move {
      let output = services.paths.mods_directory().join(&release.file_name);
      info!(mod_id = %id, file = %release.file_name, "downloading mod");
      services.portal.download_mod(&release, &output).await?;
      Ok(id)
    }
  }))
  .buffer_unordered(jobs)
  .collect()
  .await;

  for result in results {
    result?;
  }
  Ok(())
}

/// `install [mod@version|mod]` (§4.9): resolves each requested MOD and its
/// transitive required dependencies, downloads them into the mods
/// directory, and enables them in the MOD list.
pub async fn install(services: &Services, state: &mut LoadedState, specs: &[ModTarget]) -> Result<Vec<ModId>> {
  ensure_game_not_running(&services.paths)?;

  let resolved = resolve_install_targets(services, state, specs).await?;
  download_into_mods_directory(services, &resolved).await?;

  let installed_ids: Vec<ModId> = state
    .graph
    .nodes()
    .filter(|n| resolved.contains_key(&n.mod_id))
    .map(|n| n.mod_id.clone())
    .collect();

  for id in &installed_ids {
    let version = resolved.get(id).map(|r| r.version);
    state.mod_list.upsert(ModListEntry::new(id.as_str(), true, version));
  }
  state.mod_list.save(&services.paths.mod_list, services.backup_extension.as_deref())?;

  Ok(installed_ids)
}

/// `download [mod@version]` (§4.9): like `install`, but writes releases
/// into `output_dir` instead of integrating them into the mods directory
/// or MOD list.
pub async fn download(services: &Services, specs: &[ModTarget], output_dir: &Path) -> Result<Vec<PathBuf>> {
  let jobs = services.jobs.max(1);
  let mut outputs = Vec::with_capacity(specs.len());
  let mut downloads = Vec::with_capacity(specs.len());

  for spec in specs {
    let detail = services.portal.get_mod_full(spec.mod_id.as_str()).await?;
    let release = pick_release(&detail, spec.version, None)
      .ok_or_else(|| PlannerError::UnknownMod(format!("{} has no release matching the request", spec.mod_id)))?
      .clone();
    let output = output_dir.join(&release.file_name);
    outputs.push(output.clone());
    downloads.push((release, output));
  }

  let results: Vec<Result<()>> = stream::iter(downloads.into_iter().map(|(release, output)| {
    let services = services.clone();
    async move { services.portal.download_mod(&release, &output).await.map_err(PlannerError::from) }
  }))
  .buffer_unordered(jobs)
  .collect()
  .await;

  for result in results {
    result?;
  }
  Ok(outputs)
}

/// `sync <save-file>` (§4.9): installs whatever the save file expects that
/// isn't already present, disables anything that conflicts with a MOD the
/// save wants enabled, rewrites the MOD list, and overwrites the settings
/// file's startup section from the save's own snapshot.
pub async fn sync(services: &Services, state: &mut LoadedState, save_path: &Path) -> Result<SyncReport> {
  ensure_game_not_running(&services.paths)?;

  let save = SaveFile::open(save_path)?;

  let mut wanted_enabled: HashMap<ModId, bool> = HashMap::new();
  let mut specs = Vec::new();
  for entry in &save.mod_list {
    let mod_id = entry.mod_id();
    if mod_id.is_base() {
      continue;
    }
    wanted_enabled.insert(mod_id.clone(), entry.enabled);
    if !state.graph.contains_node(&mod_id) {
      specs.push(ModTarget::new(mod_id, entry.version));
    }
  }

  let resolved = resolve_install_targets(services, state, &specs).await?;
  download_into_mods_directory(services, &resolved).await?;

  for (id, enabled) in &wanted_enabled {
    if let Some(node) = state.graph.node_mut(id) {
      node.enabled = *enabled;
    }
  }

  let mut disabled_for_conflict = Vec::new();
  let enabled_targets: Vec<ModId> = wanted_enabled
    .iter()
    .filter(|(_, enabled)| **enabled)
    .map(|(id, _)| id.clone())
    .collect();

  for target in &enabled_targets {
    let outgoing: Vec<ModId> = state
      .graph
      .edges_from(target)
      .iter()
      .filter(|e| e.kind == DependencyKind::Incompatible)
      .map(|e| e.to.clone())
      .collect();
    let incoming: Vec<ModId> = state
      .graph
      .edges_to(target)
      .iter()
      .filter(|e| e.kind == DependencyKind::Incompatible)
      .map(|e| e.from.clone())
      .collect();

    for other in outgoing.into_iter().chain(incoming) {
      if &other == target {
        continue;
      }
      if let Some(node) = state.graph.node_mut(&other) {
        if node.enabled {
          node.enabled = false;
          node.planned_op = Some(PlannedOp::Disable);
          disabled_for_conflict.push((other.clone(), target.clone()));
        }
      }
    }
  }

  for node in state.graph.nodes() {
    state
      .mod_list
      .upsert(ModListEntry::new(node.mod_id.as_str(), node.enabled, Some(node.version)));
  }
  state
    .mod_list
    .save(&services.paths.mod_list, services.backup_extension.as_deref())?;

  let settings_path = &services.paths.settings;
  let mut settings = if settings_path.exists() {
    SettingsFile::load(settings_path)?
  } else {
    SettingsFile::new(save.game_version)
  };
  *settings.section_mut(SectionName::Startup) = save.startup_settings.clone();
  settings.save(settings_path)?;

  let mut installed: Vec<ModId> = resolved.keys().cloned().collect();
  installed.sort();

  Ok(SyncReport {
    installed,
    disabled_for_conflict,
  })
}

/// `mod upload` (§4.8 `upload_mod`): thin pass-through to the portal facade
/// so the CLI doesn't need its own handle on `Services::portal`.
pub async fn upload(
  services: &Services,
  name: &str,
  file: &Path,
  metadata: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
  services.portal.upload_mod(name, file, metadata).await?;
  Ok(())
}

/// `mod edit` (§4.8 `edit_mod`).
pub async fn edit(services: &Services, name: &str, metadata: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
  services.portal.edit_mod(name, metadata).await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};
  use factorix_core::graph::{Graph, GraphEdge, GraphNode};
  use factorix_core::modlist::ModListFile;
  use factorix_core::version::VersionOperator;

  fn node(name: &str, version: ModVersion, enabled: bool) -> GraphNode {
    GraphNode::new(ModId::new(name), version, enabled, true)
  }

  fn loaded_state(graph: Graph) -> LoadedState {
    LoadedState {
      graph,
      mod_list: ModListFile::default(),
      other_installed_versions: HashMap::new(),
    }
  }

  fn paths(dir: &std::path::Path) -> Paths {
    Paths::new(dir.join("mods"))
  }

  #[test]
  fn enable_recursively_enables_required_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("mods")).unwrap();

    let mut graph = Graph::new();
    graph.add_node(node("consumer", ModVersion::new(1, 0, 0), false)).unwrap();
    graph.add_node(node("library", ModVersion::new(1, 0, 0), false)).unwrap();
    graph
      .add_edge(GraphEdge {
        from: ModId::new("consumer"),
        to: ModId::new("library"),
        kind: DependencyKind::Required,
        requirement: None,
      })
      .unwrap();

    let mut state = loaded_state(graph);
    let affected = enable(&paths(dir.path()), &mut state, &[ModId::new("consumer")], None).unwrap();

    assert!(affected.contains(&ModId::new("consumer")));
    assert!(affected.contains(&ModId::new("library")));
    assert!(state.graph.node(&ModId::new("library")).unwrap().enabled);
  }

  #[test]
  fn enable_ignores_preexisting_unrelated_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("mods")).unwrap();

    let mut graph = Graph::new();
    // Unrelated, already-broken pair: `old-consumer` enabled, required
    // dependency `old-library` disabled. Pre-existing in the loaded state,
    // untouched by this `enable` call.
    graph.add_node(node("old-consumer", ModVersion::new(1, 0, 0), true)).unwrap();
    graph.add_node(node("old-library", ModVersion::new(1, 0, 0), false)).unwrap();
    graph
      .add_edge(GraphEdge {
        from: ModId::new("old-consumer"),
        to: ModId::new("old-library"),
        kind: DependencyKind::Required,
        requirement: None,
      })
      .unwrap();

    // The target being enabled, with no issues of its own.
    graph.add_node(node("fresh-mod", ModVersion::new(1, 0, 0), false)).unwrap();

    let mut state = loaded_state(graph);
    let affected = enable(&paths(dir.path()), &mut state, &[ModId::new("fresh-mod")], None).unwrap();

    assert_eq!(affected, vec![ModId::new("fresh-mod")]);
    assert!(state.graph.node(&ModId::new("fresh-mod")).unwrap().enabled);
  }

  #[test]
  fn uninstall_blocked_by_enabled_dependent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("mods")).unwrap();

    let mut graph = Graph::new();
    graph.add_node(node("consumer", ModVersion::new(1, 0, 0), true)).unwrap();
    graph.add_node(node("library", ModVersion::new(1, 0, 0), true)).unwrap();
    graph
      .add_edge(GraphEdge {
        from: ModId::new("consumer"),
        to: ModId::new("library"),
        kind: DependencyKind::Required,
        requirement: None,
      })
      .unwrap();

    let mut state = loaded_state(graph);
    let result = uninstall(&paths(dir.path()), &mut state, &[ModId::new("library")]);

    assert!(matches!(result, Err(PlannerError::UninstallBlocked { .. })));
  }

  fn release(version: ModVersion, released_at: chrono::DateTime<Utc>) -> Release {
    Release {
      download_url: "https://mods.factorio.com/download".into(),
      file_name: format!("mod_{version}.zip"),
      version,
      released_at,
      sha1: "0".repeat(40),
      info_json: Default::default(),
    }
  }

  #[test]
  fn pick_release_prefers_requested_version_over_requirement_or_latest() {
    let detail = ModDetail {
      name: "some-mod".into(),
      owner: "owner".into(),
      title: "t".into(),
      summary: "s".into(),
      category: "c".into(),
      downloads_count: 0,
      thumbnail: None,
      releases: vec![
        release(ModVersion::new(1, 0, 0), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        release(ModVersion::new(2, 0, 0), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
      ],
      changelog: String::new(),
      created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
      description: None,
      source_url: None,
      homepage: None,
      license: None,
      deprecated: None,
    };

    let exact = pick_release(&detail, Some(ModVersion::new(1, 0, 0)), None).unwrap();
    assert_eq!(exact.version, ModVersion::new(1, 0, 0));

    let requirement = VersionRequirement::new(VersionOperator::Ge, ModVersion::new(1, 5, 0));
    let satisfying = pick_release(&detail, None, Some(&requirement)).unwrap();
    assert_eq!(satisfying.version, ModVersion::new(2, 0, 0));

    let latest = pick_release(&detail, None, None).unwrap();
    assert_eq!(latest.version, ModVersion::new(2, 0, 0));
  }
}
