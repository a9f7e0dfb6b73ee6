//! Credential holders (§6 "Credentials").

use std::path::Path;

use serde::Deserialize;

use factorix_core::constants::{ENV_FACTORIO_API_KEY, ENV_FACTORIO_TOKEN, ENV_FACTORIO_USERNAME};

/// `{username, token}`, read from `player-data.json` or the environment.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
  pub username: String,
  pub token: String,
}

impl ServiceCredentials {
  pub fn from_env() -> Option<Self> {
    Some(Self {
      username: std::env::var(ENV_FACTORIO_USERNAME).ok()?,
      token: std::env::var(ENV_FACTORIO_TOKEN).ok()?,
    })
  }

  pub fn from_player_data(path: &Path) -> Option<Self> {
    #[derive(Deserialize)]
    struct PlayerData {
      #[serde(rename = "service-username")]
      service_username: Option<String>,
      #[serde(rename = "service-token")]
      service_token: Option<String>,
    }

    let bytes = std::fs::read(path).ok()?;
    let data: PlayerData = serde_json::from_slice(&bytes).ok()?;
    Some(Self {
      username: data.service_username?,
      token: data.service_token?,
    })
  }

  /// Tries `player-data.json` first, falling back to the environment (§6).
  pub fn resolve(player_data_path: &Path) -> Option<Self> {
    Self::from_player_data(player_data_path).or_else(Self::from_env)
  }
}

/// `{api_key}`, sent as `Authorization: Bearer <key>` (§6).
#[derive(Debug, Clone)]
pub struct ApiCredentials {
  pub api_key: String,
}

impl ApiCredentials {
  pub fn from_env() -> Option<Self> {
    Some(Self {
      api_key: std::env::var(ENV_FACTORIO_API_KEY).ok()?,
    })
  }
}
