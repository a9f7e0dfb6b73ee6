//! Portal facade (§4.8): maps JSON responses to value objects and
//! orchestrates the publish/update-release upload variants, on top of an
//! [`HttpExecutor`] seam and [`factorix_transfer`]'s downloader/uploader.

pub mod credentials;
pub mod error;
pub mod executor;
pub mod query;

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use url::Url;

use factorix_core::constants::PORTAL_BASE_URL;
use factorix_core::remote::{ModDetail, ModSummary, Release};
use factorix_transfer::{Downloader, Uploader};

pub use credentials::{ApiCredentials, ServiceCredentials};
pub use error::{PortalError, Result};
pub use executor::{HttpExecutor, ReqwestExecutor};

pub struct Portal {
  executor: Arc<dyn HttpExecutor>,
  downloader: Arc<Downloader>,
  uploader: Arc<Uploader>,
  service_credentials: Option<ServiceCredentials>,
  api_credentials: Option<ApiCredentials>,
}

impl Portal {
  pub fn new(
    executor: Arc<dyn HttpExecutor>,
    downloader: Arc<Downloader>,
    uploader: Arc<Uploader>,
    service_credentials: Option<ServiceCredentials>,
    api_credentials: Option<ApiCredentials>,
  ) -> Self {
    Self {
      executor,
      downloader,
      uploader,
      service_credentials,
      api_credentials,
    }
  }

  fn bearer(&self) -> Option<&str> {
    self.api_credentials.as_deref_token()
  }

  /// `GET /api/mods[?params]`, with canonicalized query parameters (§4.8).
  pub async fn list_mods(&self, params: &[(&str, &str)]) -> Result<Vec<ModSummary>> {
    let query = query::canonicalize(params);
    let url = if query.is_empty() {
      format!("{PORTAL_BASE_URL}/api/mods")
    } else {
      format!("{PORTAL_BASE_URL}/api/mods?{query}")
    };
    let body = self.executor.get_json(&url, self.bearer()).await?;
    let results = body
      .get("results")
      .cloned()
      .unwrap_or(Value::Array(Vec::new()));
    Ok(serde_json::from_value(results)?)
  }

  /// `GET /api/mods/{name}` (summary form) (§4.8).
  pub async fn get_mod(&self, name: &str) -> Result<ModSummary> {
    let url = format!("{PORTAL_BASE_URL}/api/mods/{}", urlencoding::encode(name));
    let body = self.executor.get_json(&url, self.bearer()).await?;
    Ok(serde_json::from_value(body)?)
  }

  /// `GET /api/mods/{name}/full` (includes Detail) (§4.8).
  pub async fn get_mod_full(&self, name: &str) -> Result<ModDetail> {
    let url = format!("{PORTAL_BASE_URL}/api/mods/{}/full", urlencoding::encode(name));
    let body = self.executor.get_json(&url, self.bearer()).await?;
    Ok(serde_json::from_value(body)?)
  }

  /// Downloads `release`, attaching service credentials as query
  /// parameters (§4.8).
  pub async fn download_mod(&self, release: &Release, output: &Path) -> Result<()> {
    let mut url = Url::parse(&release.download_url)
      .map_err(|e| factorix_transfer::TransferError::URLError(e.to_string()))?;
    if let Some(creds) = &self.service_credentials {
      url
        .query_pairs_mut()
        .append_pair("username", &creds.username)
        .append_pair("token", &creds.token);
    }
    self
      .downloader
      .download(url.as_str(), output, Some(&release.sha1))
      .await?;
    Ok(())
  }

  /// Publishes a new MOD or uploads a new release of an existing one,
  /// depending on whether `get_mod(name)` resolves (§4.8).
  pub async fn upload_mod(&self, name: &str, file: &Path, metadata: &Map<String, Value>) -> Result<()> {
    match self.get_mod(name).await {
      Err(PortalError::UnknownMod(_)) => {
        let upload_url = self.init_publish(name).await?;
        self.finish_upload(&upload_url, file, metadata).await
      }
      Ok(_) => {
        let upload_url = self.init_upload(name).await?;
        self.finish_upload(&upload_url, file, &Map::new()).await?;
        if !metadata.is_empty() {
          self.edit_mod(name, metadata).await?;
        }
        Ok(())
      }
      Err(other) => Err(other),
    }
  }

  /// `edit_details`; rejects empty metadata (§4.8).
  pub async fn edit_mod(&self, name: &str, metadata: &Map<String, Value>) -> Result<()> {
    if metadata.is_empty() {
      return Err(PortalError::EmptyMetadata);
    }
    let mut body = metadata.clone();
    body.insert("mod".to_string(), json!(name));
    let url = format!("{PORTAL_BASE_URL}/v2/mods/edit_details");
    self.executor.post_json(&url, &Value::Object(body), self.bearer()).await?;
    Ok(())
  }

  async fn init_publish(&self, name: &str) -> Result<String> {
    let url = format!("{PORTAL_BASE_URL}/v2/mods/init_publish");
    let body = self
      .executor
      .post_json(&url, &json!({ "mod": name }), self.bearer())
      .await?;
    extract_upload_url(&body)
  }

  async fn init_upload(&self, name: &str) -> Result<String> {
    let url = format!("{PORTAL_BASE_URL}/v2/mods/releases/init_upload");
    let body = self
      .executor
      .post_json(&url, &json!({ "mod": name }), self.bearer())
      .await?;
    extract_upload_url(&body)
  }

  async fn finish_upload(&self, upload_url: &str, file: &Path, metadata: &Map<String, Value>) -> Result<()> {
    let extra_fields: Vec<(String, String)> = metadata
      .iter()
      .map(|(k, v)| (k.clone(), v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
      .collect();
    let extra_field_refs: Vec<(&str, &str)> =
      extra_fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    self
      .uploader
      .upload(upload_url, file, "file", &extra_field_refs, None)
      .await?;
    Ok(())
  }
}

fn extract_upload_url(body: &Value) -> Result<String> {
  body
    .get("upload_url")
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| PortalError::Forbidden("portal response had no upload_url".to_string()))
}

trait ApiCredentialsExt {
  fn as_deref_token(&self) -> Option<&str>;
}

impl ApiCredentialsExt for Option<ApiCredentials> {
  fn as_deref_token(&self) -> Option<&str> {
    self.as_ref().map(|c| c.api_key.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::Mutex;

  struct FakeExecutor {
    responses: Mutex<Vec<Value>>,
  }

  #[async_trait]
  impl HttpExecutor for FakeExecutor {
    async fn get_json(&self, _url: &str, _bearer: Option<&str>) -> Result<Value> {
      Ok(self.responses.lock().unwrap().remove(0))
    }

    async fn post_json(&self, _url: &str, _body: &Value, _bearer: Option<&str>) -> Result<Value> {
      Ok(self.responses.lock().unwrap().remove(0))
    }
  }

  #[tokio::test]
  async fn list_mods_unwraps_results_array() {
    let executor = Arc::new(FakeExecutor {
      responses: Mutex::new(vec![json!({
        "results": [
          {"name":"a","owner":"o","title":"t","summary":"s","category":"c","downloads_count":1,"thumbnail":null,"latest_release":null}
        ]
      })]),
    });
    let downloader = Arc::new(Downloader::new(
      Arc::new(factorix_cache::Cache::download_cache(std::env::temp_dir().join("factorix-portal-test")).unwrap()),
      factorix_transfer::EventBus::new(),
    ).unwrap());
    let uploader = Arc::new(Uploader::new(factorix_transfer::EventBus::new()).unwrap());

    let portal = Portal::new(executor, downloader, uploader, None, None);
    let mods = portal.list_mods(&[]).await.unwrap();
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].name, "a");
  }

  #[test]
  fn edit_mod_rejects_empty_metadata() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let executor = Arc::new(FakeExecutor { responses: Mutex::new(vec![]) });
    let downloader = Arc::new(
      Downloader::new(
        Arc::new(factorix_cache::Cache::download_cache(std::env::temp_dir().join("factorix-portal-test-2")).unwrap()),
        factorix_transfer::EventBus::new(),
      )
      .unwrap(),
    );
    let uploader = Arc::new(Uploader::new(factorix_transfer::EventBus::new()).unwrap());
    let portal = Portal::new(executor, downloader, uploader, None, None);

    let result = rt.block_on(portal.edit_mod("some-mod", &Map::new()));
    assert!(matches!(result, Err(PortalError::EmptyMetadata)));
  }
}
