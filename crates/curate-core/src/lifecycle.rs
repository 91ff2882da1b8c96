//! The embargo engine: setting, copying, removing and deactivating embargoes,
//! plus the read-only queries behind the operator dashboards.
//!
//! Transitions from pending to expired happen by the calendar alone; the
//! engine only acts when asked. Every operation re-reads what it needs from
//! the store, so results of an earlier query never drive a write.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  embargo::{Embargo, EmbargoState, history_message},
  error::BoxError,
  object::RepositoryObject,
  policy::{
    EmbargoVisibility, PolicyId, PolicyTitleResolver, Visibility,
    VisibilityResolver,
  },
  store::{EmbargoFilter, ObjectQuery, ObjectStore},
};

// ─── Inputs and outcomes ─────────────────────────────────────────────────────

/// Input to [`EmbargoEngine::create_or_update`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbargoParams {
  /// A new admin policy to assign alongside the embargo.
  #[serde(default)]
  pub policy_id:         Option<PolicyId>,
  /// Visibility enforced while the embargo is active. Defaults to
  /// [`Visibility::Embargoed`].
  #[serde(default)]
  pub visibility_during: Option<Visibility>,
  pub visibility_after:  Visibility,
  pub release_date:      NaiveDate,
}

/// The result of a successful [`EmbargoEngine::deactivate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deactivation {
  pub object:      RepositoryObject,
  pub embargo:     Embargo,
  /// The state the embargo was in before deactivation.
  pub prior_state: EmbargoState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFailure {
  pub object_id: Uuid,
  pub error:     String,
}

/// Outcome of [`EmbargoEngine::release_expired`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseReport {
  pub released: Vec<Uuid>,
  pub failed:   Vec<ReleaseFailure>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Drives embargo state transitions against an [`ObjectStore`].
pub struct EmbargoEngine<'a, S, T, V = EmbargoVisibility> {
  store:      &'a S,
  titles:     &'a T,
  visibility: V,
}

impl<'a, S, T> EmbargoEngine<'a, S, T>
where
  S: ObjectStore,
  T: PolicyTitleResolver,
{
  pub fn new(store: &'a S, titles: &'a T) -> Self {
    Self { store, titles, visibility: EmbargoVisibility }
  }
}

impl<'a, S, T, V> EmbargoEngine<'a, S, T, V>
where
  S: ObjectStore,
  T: PolicyTitleResolver,
  V: VisibilityResolver,
{
  /// Swap in a different visibility rule.
  pub fn with_visibility<W: VisibilityResolver>(
    self,
    visibility: W,
  ) -> EmbargoEngine<'a, S, T, W> {
    EmbargoEngine { store: self.store, titles: self.titles, visibility }
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Set (or reset) the embargo on `object_id`.
  ///
  /// Assigns `params.policy_id` to the object when given. The object's
  /// visibility is not changed here.
  pub async fn create_or_update(
    &self,
    object_id: Uuid,
    params: EmbargoParams,
  ) -> Result<Embargo> {
    if params.visibility_after == Visibility::Embargoed {
      return Err(Error::Validation(
        "visibility after embargo cannot be `embargoed`".to_owned(),
      ));
    }

    let mut object = self.load_object(object_id).await?;

    if let Some(policy_id) = params.policy_id {
      object.admin_policy_id = Some(policy_id);
      self
        .store
        .save_object(&object)
        .await
        .map_err(|e| Error::store("save object", e))?;
    }

    let mut embargo = self
      .load_embargo(object_id)
      .await?
      .unwrap_or_else(|| Embargo::new(object_id));
    embargo.visibility_during_embargo =
      Some(params.visibility_during.unwrap_or(Visibility::Embargoed));
    embargo.visibility_after_embargo = Some(params.visibility_after);
    embargo.release_date = Some(params.release_date);

    self
      .store
      .save_embargo(&embargo)
      .await
      .map_err(|e| Error::store("save embargo", e))?;

    info!(
      %object_id,
      release_date = %params.release_date,
      after = %params.visibility_after,
      "embargo set"
    );
    Ok(embargo)
  }

  /// Copy the during/after visibility and release date of `source`'s
  /// embargo onto `destination`. The destination keeps its own history.
  pub async fn copy(&self, source: Uuid, destination: Uuid) -> Result<Embargo> {
    let from = self.load_embargo(source).await?.ok_or_else(|| {
      Error::Validation(format!("object {source} has no embargo to copy"))
    })?;
    self.load_object(destination).await?;

    let mut embargo = self
      .load_embargo(destination)
      .await?
      .unwrap_or_else(|| Embargo::new(destination));
    embargo.visibility_during_embargo = from.visibility_during_embargo;
    embargo.visibility_after_embargo = from.visibility_after_embargo;
    embargo.release_date = from.release_date;

    self
      .store
      .save_embargo(&embargo)
      .await
      .map_err(|e| Error::store("save embargo", e))?;

    info!(%source, %destination, "embargo copied");
    Ok(embargo)
  }

  /// Destroy the embargo on `object_id`, if there is one.
  ///
  /// Returns `false` when there was nothing to remove; that is not an error.
  pub async fn remove(&self, object_id: Uuid) -> Result<bool> {
    let removed = self
      .store
      .destroy_embargo(object_id)
      .await
      .map_err(|e| Error::store("destroy embargo", e))?;
    if removed {
      info!(%object_id, "embargo removed");
    }
    Ok(removed)
  }

  /// Reset the object's visibility from its embargo, clear the embargo and
  /// log the transition.
  ///
  /// Idempotent: once cleared, the embargo is inert and a second call leaves
  /// the visibility where the first one put it (it still logs a line).
  /// The object is saved first; the cleared embargo is written only once
  /// that succeeded, so a failed object write leaves the embargo active for a
  /// retry. If either write fails the error names which.
  pub async fn deactivate(
    &self,
    object_id: Uuid,
    as_of: Option<NaiveDate>,
  ) -> Result<Deactivation> {
    let today = today(as_of);
    let mut object = self.load_object(object_id).await?;
    let mut embargo = self.load_embargo(object_id).await?.ok_or_else(|| {
      Error::Validation(format!("object {object_id} has no embargo"))
    })?;

    let prior_state = embargo.state(today);
    object.visibility =
      self
        .visibility
        .resolve_embargo_visibility(&object, &embargo, today);

    let entry = self.history_entry(&embargo, prior_state, today).await;
    embargo.clear();
    embargo.history.push(entry);

    // The embargo stays active until the object carries its new visibility.
    let saved_object = self.store.save_object(&object).await;
    let saved_embargo = match saved_object {
      Ok(()) => self.store.save_embargo(&embargo).await,
      Err(_) => Ok(()),
    };

    if saved_object.is_err() || saved_embargo.is_err() {
      let err = Error::DeactivationIncomplete {
        object_id,
        object: saved_object.err().map(|e| Box::new(e) as BoxError),
        embargo: saved_embargo.err().map(|e| Box::new(e) as BoxError),
      };
      error!(%object_id, error = %err, "embargo deactivation failed");
      return Err(err);
    }

    info!(
      %object_id,
      prior = %prior_state,
      visibility = %object.visibility,
      "embargo deactivated"
    );
    Ok(Deactivation { object, embargo, prior_state })
  }

  /// Deactivate every expired embargo. Failures are collected per object
  /// and do not stop the sweep.
  pub async fn release_expired(
    &self,
    as_of: Option<NaiveDate>,
  ) -> Result<ReleaseReport> {
    let today = today(as_of);
    let mut report = ReleaseReport::default();

    for object in self.find_expired(Some(today)).await? {
      let object_id = object.object_id;
      match self.deactivate(object_id, Some(today)).await {
        Ok(_) => report.released.push(object_id),
        Err(e) => report.failed.push(ReleaseFailure {
          object_id,
          error: e.to_string(),
        }),
      }
    }

    info!(
      released = report.released.len(),
      failed = report.failed.len(),
      "expired embargo sweep finished"
    );
    Ok(report)
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// Works whose release date is on or before `as_of` (default today) and
  /// whose embargo is still active.
  pub async fn find_expired(
    &self,
    as_of: Option<NaiveDate>,
  ) -> Result<Vec<RepositoryObject>> {
    self
      .query(EmbargoFilter::Expired { as_of: today(as_of) })
      .await
  }

  /// Works with any release date set.
  pub async fn find_under_embargo(&self) -> Result<Vec<RepositoryObject>> {
    self.query(EmbargoFilter::UnderEmbargo).await
  }

  /// Works with at least one recorded deactivation.
  pub async fn find_deactivated(&self) -> Result<Vec<RepositoryObject>> {
    self.query(EmbargoFilter::Deactivated).await
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn query(&self, filter: EmbargoFilter) -> Result<Vec<RepositoryObject>> {
    let query = ObjectQuery { embargo: Some(filter), works_only: true };
    self
      .store
      .query_objects(&query)
      .await
      .map_err(|e| Error::store("query objects", e))
  }

  async fn load_object(&self, id: Uuid) -> Result<RepositoryObject> {
    self
      .store
      .get_object(id)
      .await
      .map_err(|e| Error::store("get object", e))?
      .ok_or(Error::RecordNotFound(id))
  }

  async fn load_embargo(&self, object_id: Uuid) -> Result<Option<Embargo>> {
    self
      .store
      .get_embargo(object_id)
      .await
      .map_err(|e| Error::store("get embargo", e))
  }

  async fn history_entry(
    &self,
    embargo: &Embargo,
    state: EmbargoState,
    today: NaiveDate,
  ) -> String {
    let state = match state {
      EmbargoState::Pending => "active",
      EmbargoState::Expired => "expired",
      EmbargoState::Deactivated | EmbargoState::Inert => "inactive",
    };
    let before = self.label(embargo.visibility_during_embargo).await;
    let after = self.label(embargo.visibility_after_embargo).await;
    history_message(state, today, embargo.release_date, &before, &after)
  }

  /// The policy title for `visibility`, or its raw id if the lookup fails.
  async fn label(&self, visibility: Option<Visibility>) -> String {
    let Some(visibility) = visibility else {
      return "none".to_owned();
    };
    let policy_id = PolicyId::from(visibility);
    match self.titles.title_for(&policy_id).await {
      Ok(title) => title,
      Err(e) => {
        warn!(policy = %policy_id, error = %e, "using raw policy id in embargo history");
        policy_id.0
      }
    }
  }
}

fn today(as_of: Option<NaiveDate>) -> NaiveDate {
  as_of.unwrap_or_else(|| Utc::now().date_naive())
}
