//! Async HTTP client wrapping the curate JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use curate_core::{
  embargo::Embargo,
  lifecycle::{Deactivation, EmbargoParams, ReleaseReport},
  merge::MergeReport,
  object::RepositoryObject,
};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

/// Connection settings for the curate API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

/// Async HTTP client for the curate JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// Send `req` and decode a JSON body, turning error statuses into errors
  /// that carry the server's message.
  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;

    let status = resp.status();
    if !status.is_success() {
      let message = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_default();
      return Err(anyhow!("{what} → {status}: {message}"));
    }
    resp
      .json()
      .await
      .with_context(|| format!("deserialising response to {what}"))
  }

  // ── Embargo ───────────────────────────────────────────────────────────────

  /// `PUT /api/objects/<id>/embargo`
  pub async fn set_embargo(&self, object_id: Uuid, params: &EmbargoParams) -> Result<Embargo> {
    let path = format!("/objects/{object_id}/embargo");
    self
      .send(self.client.put(self.url(&path)).json(params), &format!("PUT {path}"))
      .await
  }

  /// `DELETE /api/objects/<id>/embargo`: whether an embargo was removed.
  pub async fn remove_embargo(&self, object_id: Uuid) -> Result<bool> {
    let path = format!("/objects/{object_id}/embargo");
    let body: Value = self
      .send(self.client.delete(self.url(&path)), &format!("DELETE {path}"))
      .await?;
    Ok(body["removed"].as_bool().unwrap_or(false))
  }

  /// `POST /api/objects/<id>/embargo/deactivate[?as_of=<date>]`
  pub async fn deactivate_embargo(
    &self,
    object_id: Uuid,
    as_of: Option<NaiveDate>,
  ) -> Result<Deactivation> {
    let path = format!("/objects/{object_id}/embargo/deactivate");
    let req = with_as_of(self.client.post(self.url(&path)), as_of);
    self.send(req, &format!("POST {path}")).await
  }

  /// `POST /api/objects/<source>/embargo/copy`
  pub async fn copy_embargo(&self, source: Uuid, destination: Uuid) -> Result<Embargo> {
    let path = format!("/objects/{source}/embargo/copy");
    let req = self
      .client
      .post(self.url(&path))
      .json(&json!({ "destination": destination }));
    self.send(req, &format!("POST {path}")).await
  }

  // ── Embargo queries ───────────────────────────────────────────────────────

  /// `GET /api/embargoes?state=<state>[&as_of=<date>]`
  pub async fn list_embargoes(
    &self,
    state: &str,
    as_of: Option<NaiveDate>,
  ) -> Result<Vec<RepositoryObject>> {
    let req = self
      .client
      .get(self.url("/embargoes"))
      .query(&[("state", state)]);
    self
      .send(with_as_of(req, as_of), "GET /embargoes")
      .await
  }

  /// `POST /api/embargoes/release[?as_of=<date>]`
  pub async fn release_expired(&self, as_of: Option<NaiveDate>) -> Result<ReleaseReport> {
    let req = with_as_of(self.client.post(self.url("/embargoes/release")), as_of);
    self.send(req, "POST /embargoes/release").await
  }

  // ── Authorities ───────────────────────────────────────────────────────────

  /// `POST /api/authorities/<old>/merge`
  pub async fn merge_authorities(&self, old_id: Uuid, new_id: Uuid) -> Result<MergeReport> {
    let path = format!("/authorities/{old_id}/merge");
    let req = self
      .client
      .post(self.url(&path))
      .json(&json!({ "into": new_id }));
    self.send(req, &format!("POST {path}")).await
  }
}

fn with_as_of(req: RequestBuilder, as_of: Option<NaiveDate>) -> RequestBuilder {
  match as_of {
    Some(date) => req.query(&[("as_of", date.to_string())]),
    None => req,
  }
}
