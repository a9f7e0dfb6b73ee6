//! CLI surface (§6 "CLI surface"), `clap` derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Factorio MOD and settings manager.
#[derive(Debug, Parser)]
#[command(name = "factorix", version, about)]
pub struct Cli {
  /// Overrides the app config path (else `FACTORIX_CONFIG`, else the
  /// platform config directory).
  #[arg(long, global = true)]
  pub config_path: Option<PathBuf>,

  /// Overrides the mods directory the config/platform default would pick.
  #[arg(long, global = true)]
  pub mods_directory: Option<PathBuf>,

  /// Filter passed to `tracing-subscriber`'s `EnvFilter` (e.g. `debug`,
  /// `factorix_planner=trace`).
  #[arg(long, global = true)]
  pub log_level: Option<String>,

  /// Suppresses progress bars and non-essential output.
  #[arg(long, global = true)]
  pub quiet: bool,

  /// Assumes "yes" to any confirmation prompt.
  #[arg(long, global = true)]
  pub yes: bool,

  /// Sibling extension written alongside `mod-list.json`/settings writes
  /// before the rename (default `.bak`; pass an empty string to disable).
  #[arg(long, global = true)]
  pub backup_extension: Option<String>,

  /// Worker-pool width for download/upload fan-out.
  #[arg(long, global = true)]
  pub jobs: Option<usize>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Prints the binary's version.
  Version,
  /// Prints resolved filesystem paths.
  Path {
    /// Which paths to print; prints all of them if none are given.
    types: Vec<PathKind>,
  },
  /// Prints a summary of the local install: mods directory, detected game
  /// version, MOD counts.
  Info,
  /// Spawns the configured game binary, forwarding any args after `--`.
  Launch {
    #[arg(last = true)]
    game_args: Vec<String>,
  },
  /// MOD management subcommands.
  #[command(subcommand)]
  Mod(ModCommand),
  /// Generates a shell completion script.
  Completion { shell: clap_complete::Shell },
  /// Prints a man page.
  Man,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PathKind {
  Mods,
  ModList,
  Settings,
  PlayerData,
  Config,
  Cache,
}

#[derive(Debug, Subcommand)]
pub enum ModCommand {
  /// Lists installed MODs and their enabled state.
  List,
  /// Validates the current MOD graph; non-zero exit on any error.
  Check,
  /// Enables the given MODs and their disabled required dependencies.
  Enable { mods: Vec<String> },
  /// Disables the given MODs and their enabled dependents.
  Disable { mods: Vec<String> },
  /// Installs the given `mod` or `mod@version` specs and their required
  /// dependencies.
  Install { specs: Vec<String> },
  /// Removes the given MODs, refusing if an enabled MOD still needs one.
  Uninstall { mods: Vec<String> },
  /// Downloads the given specs to `--output` without touching the mod list.
  Download {
    specs: Vec<String>,
    #[arg(long, default_value = ".")]
    output: PathBuf,
  },
  /// Publishes a new MOD or a new release of an existing one.
  Upload {
    name: String,
    file: PathBuf,
    #[arg(long)]
    metadata: Option<PathBuf>,
  },
  /// Edits a published MOD's portal metadata.
  Edit {
    name: String,
    #[arg(long)]
    metadata: PathBuf,
  },
  /// Installs/uninstalls/enables/disables to match a save file's expectations.
  Sync { save_file: PathBuf },
  /// Settings-file subcommands.
  #[command(subcommand)]
  Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
  /// Dumps the settings file as JSON.
  Dump,
  /// Restores the settings file from a JSON dump.
  Restore { path: PathBuf },
}

/// Parses a `mod` or `mod@version` spec (§4.9 `install`/`download`).
pub fn parse_mod_spec(raw: &str) -> anyhow::Result<factorix_planner::ModTarget> {
  use factorix_core::modid::ModId;

  match raw.split_once('@') {
    Some((name, version)) => Ok(factorix_planner::ModTarget::new(ModId::new(name), Some(version.parse()?))),
    None => Ok(factorix_planner::ModTarget::new(ModId::new(raw), None)),
  }
}
