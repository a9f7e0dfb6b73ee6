//! `factorix` binary: wires argument parsing, config, logging, and the
//! presenter onto `factorix_planner`'s command surface (§6).

mod cli;
mod config;
mod presenter;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ModCommand, PathKind, SettingsCommand};
use config::Config;
use presenter::ProgressPresenter;

use factorix_core::modid::ModId;
use factorix_core::modlist::ModListFile;
use factorix_core::settings::SettingsFile;
use factorix_portal::{ApiCredentials, Portal, ReqwestExecutor, ServiceCredentials};
use factorix_transfer::{Downloader, EventBus, Uploader};

#[tokio::main]
async fn main() -> Result<()> {
  dotenv::dotenv().ok();
  let cli = Cli::parse();

  let config_path = Config::resolve_path(cli.config_path.clone());
  let config = Config::load(&config_path).context("loading configuration")?;

  init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

  if let Err(e) = run(cli, config).await {
    tracing::error!(error = %e, "command failed");
    eprintln!("error: {e:#}");
    std::process::exit(1);
  }
  Ok(())
}

fn init_logging(filter: &str) {
  let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}

fn mods_directory(cli_override: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
  cli_override
    .or_else(|| config.mods_directory.clone())
    .or_else(|| dirs::data_dir().map(|d| d.join("factorio").join("mods")))
    .context("could not determine the mods directory; pass --mods-directory or set it in the config")
}

async fn run(cli: Cli, config: Config) -> Result<()> {
  let mods_directory = mods_directory(cli.mods_directory.clone(), &config)?;
  let paths = factorix_planner::Paths::new(mods_directory);
  let jobs = cli.jobs.unwrap_or(config.jobs);
  let backup_extension = cli
    .backup_extension
    .clone()
    .or_else(|| config.backup_extension.clone())
    .filter(|ext| !ext.is_empty());

  match cli.command {
    Command::Version => {
      println!(env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Command::Path { types } => run_path(&paths, &config_path_for_print(), &types),
    Command::Info => run_info(&paths),
    Command::Launch { game_args } => run_launch(&paths, &game_args),
    Command::Completion { shell } => {
      let mut cmd = Cli::command();
      let name = cmd.get_name().to_string();
      clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
      Ok(())
    }
    Command::Man => run_man(),
    Command::Mod(mod_command) => run_mod(mod_command, &paths, jobs, backup_extension, cli.quiet, cli.yes).await,
  }
}

fn config_path_for_print() -> PathBuf {
  Config::resolve_path(None)
}

fn run_path(paths: &factorix_planner::Paths, config_path: &PathBuf, types: &[PathKind]) -> Result<()> {
  let all = [
    PathKind::Mods,
    PathKind::ModList,
    PathKind::Settings,
    PathKind::PlayerData,
    PathKind::Config,
    PathKind::Cache,
  ];
  let selected: &[PathKind] = if types.is_empty() { &all } else { types };

  for kind in selected {
    let path = match kind {
      PathKind::Mods => paths.mods_directory().to_path_buf(),
      PathKind::ModList => paths.mod_list.clone(),
      PathKind::Settings => paths.settings.clone(),
      PathKind::PlayerData => paths.player_data.clone(),
      PathKind::Config => config_path.clone(),
      PathKind::Cache => dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("factorix"),
    };
    println!("{path}", path = path.display());
  }
  Ok(())
}

fn run_info(paths: &factorix_planner::Paths) -> Result<()> {
  let installed = factorix_core::installed::scan(paths.mods_directory()).unwrap_or_default();
  let mod_list = if paths.mod_list.exists() {
    ModListFile::load(&paths.mod_list)?
  } else {
    ModListFile::default()
  };
  let enabled_count = mod_list.mods.iter().filter(|e| e.enabled).count();

  println!("mods directory: {}", paths.mods_directory().display());
  println!("installed mods: {}", installed.len());
  println!("enabled mods:   {enabled_count}");
  println!("game running:   {}", paths.game_is_running());
  Ok(())
}

fn run_launch(paths: &factorix_planner::Paths, game_args: &[String]) -> Result<()> {
  let binary = std::env::var("FACTORIO_BINARY").context(
    "FACTORIO_BINARY is not set; launch only shells out to the configured game binary and does not locate one itself",
  )?;
  if paths.game_is_running() {
    bail!("the game appears to already be running (lock file present at {})", paths.game_running_lock.display());
  }
  let status = std::process::Command::new(binary).args(game_args).status()?;
  if !status.success() {
    bail!("game process exited with {status}");
  }
  Ok(())
}

fn run_man() -> Result<()> {
  let cmd = Cli::command();
  println!("{}", cmd.render_long_help());
  Ok(())
}

async fn run_mod(
  command: ModCommand,
  paths: &factorix_planner::Paths,
  jobs: usize,
  backup_extension: Option<String>,
  quiet: bool,
  yes: bool,
) -> Result<()> {
  match command {
    ModCommand::List => mod_list(paths),
    ModCommand::Check => mod_check(paths),
    ModCommand::Enable { mods } => mod_enable(paths, &mods, backup_extension.as_deref()),
    ModCommand::Disable { mods } => mod_disable(paths, &mods, backup_extension.as_deref()),
    ModCommand::Uninstall { mods } => mod_uninstall(paths, &mods, yes),
    ModCommand::Install { specs } => mod_install(paths, &specs, jobs, backup_extension, quiet).await,
    ModCommand::Download { specs, output } => mod_download(paths, &specs, &output, jobs, quiet).await,
    ModCommand::Upload { name, file, metadata } => mod_upload(paths, &name, &file, metadata, quiet).await,
    ModCommand::Edit { name, metadata } => mod_edit(paths, &name, &metadata, quiet).await,
    ModCommand::Sync { save_file } => mod_sync(paths, &save_file, jobs, backup_extension, quiet).await,
    ModCommand::Settings(settings_command) => mod_settings(paths, settings_command),
  }
}

fn mod_list(paths: &factorix_planner::Paths) -> Result<()> {
  let state = factorix_planner::load(paths)?;
  for node in state.graph.nodes() {
    println!(
      "{:<32} {:<10} {}",
      node.mod_id,
      node.version,
      if node.enabled { "enabled" } else { "disabled" }
    );
  }
  Ok(())
}

fn mod_check(paths: &factorix_planner::Paths) -> Result<()> {
  let state = factorix_planner::load(paths)?;
  let result = factorix_planner::check(&state);

  for error in &result.errors {
    println!("error: {error:?}");
  }
  for warning in &result.warnings {
    println!("warning: {warning:?}");
  }
  for suggestion in &result.suggestions {
    println!("suggestion: {suggestion:?}");
  }

  if !result.is_ok() {
    bail!("{} validation error(s) found", result.errors.len());
  }
  Ok(())
}

fn mod_enable(paths: &factorix_planner::Paths, mods: &[String], backup_extension: Option<&str>) -> Result<()> {
  let mut state = factorix_planner::load(paths)?;
  let targets: Vec<ModId> = mods.iter().map(|m| ModId::new(m.as_str())).collect();
  let affected = factorix_planner::enable(paths, &mut state, &targets, backup_extension)?;
  println!("enabled {} mod(s)", affected.len());
  Ok(())
}

fn mod_disable(paths: &factorix_planner::Paths, mods: &[String], backup_extension: Option<&str>) -> Result<()> {
  let mut state = factorix_planner::load(paths)?;
  let targets: Vec<ModId> = mods.iter().map(|m| ModId::new(m.as_str())).collect();
  let affected = factorix_planner::disable(paths, &mut state, &targets, backup_extension)?;
  println!("disabled {} mod(s)", affected.len());
  Ok(())
}

fn mod_uninstall(paths: &factorix_planner::Paths, mods: &[String], yes: bool) -> Result<()> {
  if !yes && !confirm(&format!("Uninstall {}?", mods.join(", ")))? {
    return Err(factorix_planner::PlannerError::OperationAborted.into());
  }
  let mut state = factorix_planner::load(paths)?;
  let targets: Vec<ModId> = mods.iter().map(|m| ModId::new(m.as_str())).collect();
  let removed = factorix_planner::uninstall(paths, &mut state, &targets)?;
  println!("uninstalled {} mod(s)", removed.len());
  Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
  use std::io::Write;
  print!("{prompt} [y/N] ");
  std::io::stdout().flush()?;
  let mut line = String::new();
  std::io::stdin().read_line(&mut line)?;
  Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn build_services(
  paths: &factorix_planner::Paths,
  jobs: usize,
  backup_extension: Option<String>,
  quiet: bool,
) -> Result<factorix_planner::Services> {
  let event_bus = EventBus::new();
  event_bus.subscribe(Arc::new(ProgressPresenter::new(quiet)));

  let cache_root = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("factorix");
  let download_cache = Arc::new(factorix_cache::Cache::download_cache(cache_root.join("downloads"))?);
  let downloader = Arc::new(Downloader::new(download_cache, event_bus.clone())?);
  let uploader = Arc::new(Uploader::new(event_bus.clone())?);

  let service_credentials = ServiceCredentials::resolve(&paths.player_data);
  let api_credentials = ApiCredentials::from_env();

  let executor = Arc::new(ReqwestExecutor::new());
  let portal = Arc::new(Portal::new(executor, downloader.clone(), uploader, service_credentials, api_credentials));

  Ok(factorix_planner::Services::new(portal, downloader, event_bus, paths.clone(), jobs, backup_extension))
}

async fn mod_install(
  paths: &factorix_planner::Paths,
  specs: &[String],
  jobs: usize,
  backup_extension: Option<String>,
  quiet: bool,
) -> Result<()> {
  let services = build_services(paths, jobs, backup_extension, quiet)?;
  let mut state = factorix_planner::load(paths)?;
  let targets: Vec<factorix_planner::ModTarget> = specs.iter().map(|s| cli::parse_mod_spec(s)).collect::<Result<_>>()?;
  let installed = factorix_planner::install(&services, &mut state, &targets).await?;
  println!("installed {} mod(s)", installed.len());
  Ok(())
}

async fn mod_download(
  paths: &factorix_planner::Paths,
  specs: &[String],
  output: &PathBuf,
  jobs: usize,
  quiet: bool,
) -> Result<()> {
  let services = build_services(paths, jobs, None, quiet)?;
  let targets: Vec<factorix_planner::ModTarget> = specs.iter().map(|s| cli::parse_mod_spec(s)).collect::<Result<_>>()?;
  std::fs::create_dir_all(output)?;
  let downloaded = factorix_planner::download(&services, &targets, output).await?;
  for path in &downloaded {
    println!("{}", path.display());
  }
  Ok(())
}

async fn mod_upload(
  paths: &factorix_planner::Paths,
  name: &str,
  file: &PathBuf,
  metadata_path: Option<PathBuf>,
  quiet: bool,
) -> Result<()> {
  let services = build_services(paths, 1, None, quiet)?;
  let metadata = load_metadata(metadata_path)?;
  factorix_planner::upload(&services, name, file, &metadata).await?;
  println!("uploaded {name}");
  Ok(())
}

async fn mod_edit(paths: &factorix_planner::Paths, name: &str, metadata_path: &PathBuf, quiet: bool) -> Result<()> {
  let services = build_services(paths, 1, None, quiet)?;
  let metadata = load_metadata(Some(metadata_path.clone()))?;
  factorix_planner::edit(&services, name, &metadata).await?;
  println!("updated {name}");
  Ok(())
}

fn load_metadata(path: Option<PathBuf>) -> Result<serde_json::Map<String, serde_json::Value>> {
  match path {
    Some(path) => {
      let body = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
      let value: serde_json::Value = serde_json::from_str(&body)?;
      match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!("metadata file must contain a JSON object"),
      }
    }
    None => Ok(serde_json::Map::new()),
  }
}

async fn mod_sync(
  paths: &factorix_planner::Paths,
  save_file: &PathBuf,
  jobs: usize,
  backup_extension: Option<String>,
  quiet: bool,
) -> Result<()> {
  let services = build_services(paths, jobs, backup_extension, quiet)?;
  let mut state = factorix_planner::load(paths)?;
  let report = factorix_planner::sync(&services, &mut state, save_file).await?;

  println!("installed {} mod(s)", report.installed.len());
  for (disabled, because_of) in &report.disabled_for_conflict {
    println!("disabled {disabled} (conflicts with {because_of})");
  }
  Ok(())
}

fn mod_settings(paths: &factorix_planner::Paths, command: SettingsCommand) -> Result<()> {
  match command {
    SettingsCommand::Dump => {
      let settings = SettingsFile::load(&paths.settings)?;
      println!("{}", serde_json::to_string_pretty(&settings.to_json_dump())?);
      Ok(())
    }
    SettingsCommand::Restore { path } => {
      let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading settings dump at {}", path.display()))?;
      let dump: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing settings dump at {}", path.display()))?;
      let settings = SettingsFile::from_json_dump(&dump)?;
      settings.save(&paths.settings)?;
      println!("restored {}", paths.settings.display());
      Ok(())
    }
  }
}
