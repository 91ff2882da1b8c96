//! Handlers for `/objects` endpoints and the per-object embargo.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/objects` | Body: [`CreateBody`]; returns 201 |
//! | `GET`    | `/objects/:id` | 404 if not found |
//! | `GET`    | `/objects/:id/embargo` | Embargo plus its state today (or `?as_of`) |
//! | `PUT`    | `/objects/:id/embargo` | Body: [`EmbargoParams`] |
//! | `DELETE` | `/objects/:id/embargo` | `{"removed":bool}`; absent is not an error |
//! | `POST`   | `/objects/:id/embargo/deactivate` | Optional `?as_of=YYYY-MM-DD` |
//! | `POST`   | `/objects/:id/embargo/copy` | Body: `{"destination":"<uuid>"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use curate_core::{
  embargo::{Embargo, EmbargoState},
  lifecycle::{Deactivation, EmbargoEngine, EmbargoParams},
  object::{ObjectKind, RepositoryObject},
  policy::{PolicyId, Visibility},
  relation::Relations,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{ApiState, AsOfParams, CurateStore, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind:            ObjectKind,
  pub title:           String,
  pub visibility:      Visibility,
  pub admin_policy_id: Option<PolicyId>,
  #[serde(default)]
  pub relations:       Relations,
}

/// `POST /objects`
pub async fn create<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let mut object = RepositoryObject::new(body.kind, body.title, body.visibility);
  object.admin_policy_id = body.admin_policy_id;
  object.relations = body.relations;

  state
    .store
    .save_object(&object)
    .await
    .map_err(ApiError::internal)?;
  Ok((StatusCode::CREATED, Json(object)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /objects/:id`
pub async fn get_one<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RepositoryObject>, ApiError> {
  let object = state
    .store
    .get_object(id)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::NotFound(format!("object {id} not found")))?;
  Ok(Json(object))
}

// ─── Embargo ──────────────────────────────────────────────────────────────────

/// An embargo together with its state on the requested day.
#[derive(Debug, Serialize)]
pub struct EmbargoView {
  #[serde(flatten)]
  pub embargo: Embargo,
  pub state:   EmbargoState,
}

/// `GET /objects/:id/embargo[?as_of=YYYY-MM-DD]`
pub async fn get_embargo<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<EmbargoView>, ApiError> {
  let embargo = state
    .store
    .get_embargo(id)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::NotFound(format!("object {id} has no embargo")))?;

  let today = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
  let state = embargo.state(today);
  Ok(Json(EmbargoView { embargo, state }))
}

/// `PUT /objects/:id/embargo`
pub async fn set_embargo<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(params): Json<EmbargoParams>,
) -> Result<Json<Embargo>, ApiError> {
  let store = state.store.as_ref();
  let embargo = EmbargoEngine::new(store, store)
    .create_or_update(id, params)
    .await?;
  Ok(Json(embargo))
}

/// `DELETE /objects/:id/embargo`
pub async fn remove_embargo<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let store = state.store.as_ref();
  let removed = EmbargoEngine::new(store, store).remove(id).await?;
  Ok(Json(json!({ "removed": removed })))
}

/// `POST /objects/:id/embargo/deactivate[?as_of=YYYY-MM-DD]`
pub async fn deactivate<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<Deactivation>, ApiError> {
  let store = state.store.as_ref();
  let deactivation = EmbargoEngine::new(store, store)
    .deactivate(id, params.as_of)
    .await?;
  Ok(Json(deactivation))
}

#[derive(Debug, Deserialize)]
pub struct CopyBody {
  pub destination: Uuid,
}

/// `POST /objects/:id/embargo/copy`, body: `{"destination":"<uuid>"}`
pub async fn copy_embargo<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Path(source): Path<Uuid>,
  Json(body): Json<CopyBody>,
) -> Result<Json<Embargo>, ApiError> {
  let store = state.store.as_ref();
  let embargo = EmbargoEngine::new(store, store)
    .copy(source, body.destination)
    .await?;
  Ok(Json(embargo))
}
