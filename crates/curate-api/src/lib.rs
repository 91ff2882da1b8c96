//! JSON REST API for Curate.
//!
//! Exposes an axum [`Router`] backed by any store that implements
//! [`ObjectStore`], [`ReferenceIndex`] and [`PolicyTitleResolver`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", curate_api::api_router(store.clone(), merge_options))
//! ```

pub mod authorities;
pub mod embargoes;
pub mod error;
pub mod objects;
pub mod policies;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use chrono::NaiveDate;
use curate_core::{
  merge::MergeOptions,
  policy::PolicyTitleResolver,
  store::{ObjectStore, ReferenceIndex},
};
use serde::Deserialize;

pub use error::ApiError;

/// Everything a [`Router`] built by [`api_router`] needs to serve a store.
pub trait CurateStore:
  ObjectStore + ReferenceIndex + PolicyTitleResolver + 'static
{
}

impl<T> CurateStore for T where
  T: ObjectStore + ReferenceIndex + PolicyTitleResolver + 'static
{
}

/// Shared handler state.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub merge: Arc<MergeOptions>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), merge: self.merge.clone() }
  }
}

/// Query string accepted by endpoints that evaluate embargoes on a given day.
#[derive(Debug, Default, Deserialize)]
pub struct AsOfParams {
  /// `YYYY-MM-DD`; defaults to today.
  pub as_of: Option<NaiveDate>,
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: CurateStore>(store: Arc<S>, merge: MergeOptions) -> Router<()> {
  let state = ApiState { store, merge: Arc::new(merge) };

  Router::new()
    // Objects and their embargoes
    .route("/objects", post(objects::create::<S>))
    .route("/objects/{id}", get(objects::get_one::<S>))
    .route(
      "/objects/{id}/embargo",
      get(objects::get_embargo::<S>)
        .put(objects::set_embargo::<S>)
        .delete(objects::remove_embargo::<S>),
    )
    .route("/objects/{id}/embargo/deactivate", post(objects::deactivate::<S>))
    .route("/objects/{id}/embargo/copy", post(objects::copy_embargo::<S>))
    // Embargo dashboards and the release sweep
    .route("/embargoes", get(embargoes::list::<S>))
    .route("/embargoes/release", post(embargoes::release::<S>))
    // Authorities
    .route("/authorities", get(authorities::list::<S>).post(authorities::create::<S>))
    .route("/authorities/{id}", get(authorities::get_one::<S>))
    .route("/authorities/{id}/merge", post(authorities::merge::<S>))
    // Policies
    .route("/policies", get(policies::list::<S>).post(policies::create::<S>))
    .with_state(state)
}
