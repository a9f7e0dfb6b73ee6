//! Produces an error/warning/suggestion report from a graph (§4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyKind;
use crate::modid::ModId;
use crate::modlist::ModListFile;
use crate::version::ModVersion;

use super::Graph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
  CircularDependency { members: Vec<ModId> },
  MissingDependency { dependent: ModId, dependency: ModId },
  DisabledDependency { dependent: ModId, dependency: ModId },
  VersionMismatch {
    dependent: ModId,
    dependency: ModId,
    installed_version: ModVersion,
    requirement: String,
  },
  Conflict { a: ModId, b: ModId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationWarning {
  ModInListNotInstalled { mod_id: ModId },
  ModInstalledNotInList { mod_id: ModId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSuggestion {
  pub dependency: ModId,
  pub version: ModVersion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
  pub errors: Vec<ValidationError>,
  pub warnings: Vec<ValidationWarning>,
  pub suggestions: Vec<VersionSuggestion>,
}

impl ValidationResult {
  pub fn is_ok(&self) -> bool {
    self.errors.is_empty()
  }
}

/// Validates a graph, optionally cross-checking against a MOD list.
/// `other_installed_versions` supplies, for a given MOD, any other
/// installed versions on disk besides the one the graph node carries — used
/// to attach `VersionSuggestion`s for `VERSION_MISMATCH` (§4.3).
pub fn validate(
  graph: &Graph,
  mod_list: Option<&ModListFile>,
  other_installed_versions: &HashMap<ModId, Vec<ModVersion>>,
) -> ValidationResult {
  let mut result = ValidationResult::default();

  for component in graph.strongly_connected_components() {
    if component.len() > 1 {
      result.errors.push(ValidationError::CircularDependency { members: component });
    }
  }

  for node in graph.nodes().filter(|n| n.enabled) {
    for edge in graph.edges_from(&node.mod_id) {
      if edge.kind == DependencyKind::Required {
        match graph.node(&edge.to) {
          None => result.errors.push(ValidationError::MissingDependency {
            dependent: node.mod_id.clone(),
            dependency: edge.to.clone(),
          }),
          Some(target) if !target.enabled => {
            result.errors.push(ValidationError::DisabledDependency {
              dependent: node.mod_id.clone(),
              dependency: edge.to.clone(),
            })
          }
          Some(target) => {
            if let Some(requirement) = &edge.requirement {
              if !requirement.matches(target.version) {
                result.errors.push(ValidationError::VersionMismatch {
                  dependent: node.mod_id.clone(),
                  dependency: edge.to.clone(),
                  installed_version: target.version,
                  requirement: requirement.to_string(),
                });

                if let Some(candidates) = other_installed_versions.get(&edge.to) {
                  for &candidate in candidates {
                    if requirement.matches(candidate) {
                      result.suggestions.push(VersionSuggestion {
                        dependency: edge.to.clone(),
                        version: candidate,
                      });
                    }
                  }
                }
              }
            }
          }
        }
      } else if edge.kind == DependencyKind::Incompatible {
        if let Some(target) = graph.node(&edge.to) {
          if target.enabled {
            result.errors.push(ValidationError::Conflict {
              a: node.mod_id.clone(),
              b: edge.to.clone(),
            });
          }
        }
      }
    }
  }

  if let Some(list) = mod_list {
    for entry in &list.mods {
      let mod_id = entry.mod_id();
      if mod_id.is_base() {
        continue;
      }
      if !graph.contains_node(&mod_id) {
        result.warnings.push(ValidationWarning::ModInListNotInstalled { mod_id });
      }
    }
    for node in graph.nodes() {
      if !list.contains(&node.mod_id) {
        result
          .warnings
          .push(ValidationWarning::ModInstalledNotInList { mod_id: node.mod_id.clone() });
      }
    }
  }

  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{GraphEdge, GraphNode};
  use crate::version::{VersionOperator, VersionRequirement};

  fn node(name: &str, version: ModVersion, enabled: bool) -> GraphNode {
    GraphNode::new(ModId::new(name), version, enabled, true)
  }

  #[test]
  fn scenario_3_graph_validation() {
    let mut graph = Graph::new();
    graph.add_node(node("A", ModVersion::new(1, 0, 0), true)).unwrap();
    graph.add_node(node("B", ModVersion::new(1, 0, 0), true)).unwrap();
    graph.add_node(node("C", ModVersion::new(1, 0, 0), false)).unwrap();

    graph
      .add_edge(GraphEdge {
        from: ModId::new("A"),
        to: ModId::new("B"),
        kind: DependencyKind::Required,
        requirement: Some(VersionRequirement::new(VersionOperator::Ge, ModVersion::new(2, 0, 0))),
      })
      .unwrap();
    graph
      .add_edge(GraphEdge {
        from: ModId::new("A"),
        to: ModId::new("C"),
        kind: DependencyKind::Required,
        requirement: None,
      })
      .unwrap();

    let result = validate(&graph, None, &HashMap::new());
    assert_eq!(result.errors.len(), 2);
    assert!(result
      .errors
      .iter()
      .any(|e| matches!(e, ValidationError::VersionMismatch { .. })));
    assert!(result
      .errors
      .iter()
      .any(|e| matches!(e, ValidationError::DisabledDependency { .. })));
  }

  #[test]
  fn suggests_satisfying_installed_versions() {
    let mut graph = Graph::new();
    graph.add_node(node("A", ModVersion::new(1, 0, 0), true)).unwrap();
    graph.add_node(node("B", ModVersion::new(1, 0, 0), true)).unwrap();
    graph
      .add_edge(GraphEdge {
        from: ModId::new("A"),
        to: ModId::new("B"),
        kind: DependencyKind::Required,
        requirement: Some(VersionRequirement::new(VersionOperator::Ge, ModVersion::new(2, 0, 0))),
      })
      .unwrap();

    let mut others = HashMap::new();
    others.insert(ModId::new("B"), vec![ModVersion::new(2, 1, 0), ModVersion::new(0, 9, 0)]);

    let result = validate(&graph, None, &others);
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].version, ModVersion::new(2, 1, 0));
  }
}
