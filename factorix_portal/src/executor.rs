//! The HTTP-executor seam the portal facade consumes (§4.8), kept separate
//! from `factorix_transfer`'s download/upload path so planner/portal tests
//! can substitute a fake without touching the network.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PortalError, Result};

#[async_trait]
pub trait HttpExecutor: Send + Sync {
  async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value>;
  async fn post_json(&self, url: &str, body: &Value, bearer: Option<&str>) -> Result<Value>;
}

/// A `reqwest`-backed executor (§4.8).
pub struct ReqwestExecutor {
  client: reqwest::Client,
}

impl ReqwestExecutor {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for ReqwestExecutor {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
  async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value> {
    let mut request = self.client.get(url);
    if let Some(token) = bearer {
      request = request.bearer_auth(token);
    }
    let response = request.send().await.map_err(factorix_transfer::TransferError::from)?;
    let response = classify(response).await?;
    Ok(response.json().await.map_err(factorix_transfer::TransferError::from)?)
  }

  async fn post_json(&self, url: &str, body: &Value, bearer: Option<&str>) -> Result<Value> {
    let mut request = self.client.post(url).json(body);
    if let Some(token) = bearer {
      request = request.bearer_auth(token);
    }
    let response = request.send().await.map_err(factorix_transfer::TransferError::from)?;
    let response = classify(response).await?;
    Ok(response.json().await.map_err(factorix_transfer::TransferError::from)?)
  }
}

/// Maps the four portal-specific statuses to `PortalError`, then falls back
/// to the generic `4xx`/`5xx` taxonomy (§7) for everything else so a portal
/// 500 never surfaces as an opaque JSON-decode failure.
async fn classify(response: reqwest::Response) -> Result<reqwest::Response> {
  let status = response.status();
  match status.as_u16() {
    401 => return Err(PortalError::InvalidApiKey),
    403 => return Err(PortalError::Forbidden(response.url().to_string())),
    404 => return Err(PortalError::UnknownMod(response.url().to_string())),
    409 => return Err(PortalError::ModAlreadyExists(response.url().to_string())),
    _ => {}
  }
  if status.is_success() {
    return Ok(response);
  }
  if status.is_client_error() {
    let body = response.text().await.unwrap_or_default();
    return Err(factorix_transfer::TransferError::HTTPClientError { status: status.as_u16(), body }.into());
  }
  if status.is_server_error() {
    return Err(factorix_transfer::TransferError::HTTPServerError(status.as_u16()).into());
  }
  Ok(response)
}
