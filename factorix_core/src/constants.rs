//! Shared constants referenced from more than one crate in the workspace
//! (§5 "Locking discipline", §6 "Portal endpoints", "Shared options").

use std::time::Duration;

/// Portal base URL (§6).
pub const PORTAL_BASE_URL: &str = "https://mods.factorio.com";

/// Default `--jobs` worker-pool width (§5).
pub const DEFAULT_JOBS: usize = 4;

/// `.lock` staleness window before an acquirer sweeps a held lock as
/// abandoned (§5 "Locking discipline").
pub const LOCK_STALENESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// How long an acquirer spins against a live (non-stale) `.lock` before
/// giving up with `LockTimeoutError`, well short of `LOCK_STALENESS_WINDOW`
/// so a wedged caller fails fast instead of spinning for an hour.
pub const LOCK_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables credentials are read from (§6).
pub const ENV_FACTORIO_USERNAME: &str = "FACTORIO_USERNAME";
pub const ENV_FACTORIO_TOKEN: &str = "FACTORIO_TOKEN";
pub const ENV_FACTORIO_API_KEY: &str = "FACTORIO_API_KEY";
pub const ENV_FACTORIX_CONFIG: &str = "FACTORIX_CONFIG";
