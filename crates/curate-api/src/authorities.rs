//! Handlers for `/authorities` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/authorities` | Optional `?kind=person\|organization\|group\|topic` |
//! | `POST` | `/authorities` | Body: `{"kind":"person","label":"..."}` |
//! | `GET`  | `/authorities/:id` | 404 if not found |
//! | `POST` | `/authorities/:id/merge` | Body: `{"into":"<uuid>"}`; 409 on incompatible records |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use curate_core::{
  authority::{AuthorityKind, LocalAuthority},
  merge::{AuthorityMergeService, MergeReport},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, CurateStore, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<AuthorityKind>,
}

/// `GET /authorities[?kind=<kind>]`
pub async fn list<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LocalAuthority>>, ApiError> {
  let authorities = state
    .store
    .list_authorities(params.kind)
    .await
    .map_err(ApiError::internal)?;
  Ok(Json(authorities))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind:  AuthorityKind,
  pub label: String,
}

/// `POST /authorities`
pub async fn create<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.label.trim().is_empty() {
    return Err(ApiError::BadRequest("authority label must not be empty".into()));
  }
  let authority = LocalAuthority::new(body.kind, body.label);
  state
    .store
    .save_authority(&authority)
    .await
    .map_err(ApiError::internal)?;
  Ok((StatusCode::CREATED, Json(authority)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /authorities/:id`
pub async fn get_one<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LocalAuthority>, ApiError> {
  let authority = state
    .store
    .get_authority(id)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::NotFound(format!("authority {id} not found")))?;
  Ok(Json(authority))
}

// ─── Merge ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MergeBody {
  pub into: Uuid,
}

/// `POST /authorities/:id/merge`, body: `{"into":"<uuid>"}`
///
/// `:id` is retired in favour of `into`. Per-object failures are reported in
/// the body, not as an error status.
pub async fn merge<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(old_id): Path<Uuid>,
  Json(body): Json<MergeBody>,
) -> Result<Json<MergeReport>, ApiError> {
  let store = state.store.as_ref();
  let report = AuthorityMergeService::new(store, store, state.merge.as_ref().clone())
    .merge(old_id, body.into)
    .await?;
  Ok(Json(report))
}
