//! Handlers for `/policies`.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use curate_core::policy::AdminPolicy;

use crate::{ApiState, CurateStore, error::ApiError};

/// `GET /policies`
pub async fn list<S: CurateStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<AdminPolicy>>, ApiError> {
  let policies = state
    .store
    .list_policies()
    .await
    .map_err(ApiError::internal)?;
  Ok(Json(policies))
}

/// `POST /policies`, body: `{"policy_id":"public","title":"Open access"}`.
/// Saving an existing id replaces its title.
pub async fn create<S: CurateStore>(
  State(state): State<ApiState<S>>,
  Json(policy): Json<AdminPolicy>,
) -> Result<impl IntoResponse, ApiError> {
  if policy.policy_id.as_str().is_empty() {
    return Err(ApiError::BadRequest("policy_id must not be empty".into()));
  }
  state
    .store
    .save_policy(&policy)
    .await
    .map_err(ApiError::internal)?;
  Ok((StatusCode::CREATED, Json(policy)))
}
