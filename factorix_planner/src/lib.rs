//! The command planner (§4.9): wires the load phase, the dependency graph
//! and validator from [`factorix_core`], and the portal/cache/transfer
//! stack into the load -> validate -> plan/execute flow each CLI subcommand
//! runs.

pub mod commands;
pub mod error;
pub mod loader;
pub mod paths;
pub mod services;

pub use commands::{
  check, disable, download, edit, enable, install, sync, uninstall, upload, ModTarget, SyncReport,
};
pub use error::{PlannerError, Result};
pub use loader::{load, LoadedState};
pub use paths::Paths;
pub use services::Services;
