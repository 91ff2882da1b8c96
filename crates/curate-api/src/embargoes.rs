//! Handlers for `/embargoes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/embargoes` | `?state=expired\|active\|deactivated`; optional `as_of` for `expired` |
//! | `POST` | `/embargoes/release` | Deactivates every expired embargo; optional `?as_of` |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use curate_core::{
  lifecycle::{EmbargoEngine, ReleaseReport},
  object::RepositoryObject,
};
use serde::Deserialize;

use crate::{ApiState, AsOfParams, CurateStore, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListState {
  /// Release date passed, not yet deactivated.
  Expired,
  /// Any release date set.
  Active,
  /// At least one deactivation recorded.
  Deactivated,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub state: ListState,
  pub as_of: Option<NaiveDate>,
}

/// `GET /embargoes?state=<state>[&as_of=YYYY-MM-DD]`
pub async fn list<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RepositoryObject>>, ApiError> {
  let store = state.store.as_ref();
  let engine = EmbargoEngine::new(store, store);

  let objects = match params.state {
    ListState::Expired => engine.find_expired(params.as_of).await?,
    ListState::Active => engine.find_under_embargo().await?,
    ListState::Deactivated => engine.find_deactivated().await?,
  };
  Ok(Json(objects))
}

// ─── Release ──────────────────────────────────────────────────────────────────

/// `POST /embargoes/release[?as_of=YYYY-MM-DD]`
pub async fn release<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<ReleaseReport>, ApiError> {
  let store = state.store.as_ref();
  let report = EmbargoEngine::new(store, store)
    .release_expired(params.as_of)
    .await?;
  Ok(Json(report))
}
