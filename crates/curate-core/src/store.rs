//! The `ObjectStore` and `ReferenceIndex` traits and their query types.
//!
//! Both are implemented by storage backends (e.g. `curate-store-sqlite`). The
//! embargo engine and the merge service depend on these abstractions only.

use std::{collections::BTreeSet, future::Future};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  authority::{AuthorityKind, LocalAuthority},
  embargo::Embargo,
  object::{Record, RepositoryObject},
  policy::{AdminPolicy, PolicyId},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Which embargoes [`ObjectStore::query_objects`] should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbargoFilter {
  /// Release date on or before `as_of`, with a post-embargo visibility set.
  Expired { as_of: NaiveDate },
  /// Any release date present.
  UnderEmbargo,
  /// At least one deactivation recorded in the history.
  Deactivated,
}

/// Parameters for [`ObjectStore::query_objects`].
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
  pub embargo:    Option<EmbargoFilter>,
  /// Restrict to registered work types (no file sets or collections).
  pub works_only: bool,
}

// ─── Object store ────────────────────────────────────────────────────────────

/// Persistence for repository objects, their embargoes, local authorities
/// and admin policies.
///
/// Saves are upserts with last-writer-wins semantics. Nothing is cached
/// between calls.
pub trait ObjectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Look up an id across objects and authorities.
  fn find_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  // ── Objects ───────────────────────────────────────────────────────────

  fn get_object(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RepositoryObject>, Self::Error>> + Send + '_;

  fn save_object<'a>(
    &'a self,
    object: &'a RepositoryObject,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Objects matching `query`, ordered by id.
  fn query_objects<'a>(
    &'a self,
    query: &'a ObjectQuery,
  ) -> impl Future<Output = Result<Vec<RepositoryObject>, Self::Error>> + Send + 'a;

  // ── Embargoes ─────────────────────────────────────────────────────────

  fn get_embargo(
    &self,
    object_id: Uuid,
  ) -> impl Future<Output = Result<Option<Embargo>, Self::Error>> + Send + '_;

  fn save_embargo<'a>(
    &'a self,
    embargo: &'a Embargo,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete the embargo of `object_id`. Returns whether one existed.
  fn destroy_embargo(
    &self,
    object_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Authorities ───────────────────────────────────────────────────────

  fn get_authority(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<LocalAuthority>, Self::Error>> + Send + '_;

  fn save_authority<'a>(
    &'a self,
    authority: &'a LocalAuthority,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete an authority. Returns whether it existed.
  fn destroy_authority(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_authorities(
    &self,
    kind: Option<AuthorityKind>,
  ) -> impl Future<Output = Result<Vec<LocalAuthority>, Self::Error>> + Send + '_;

  // ── Policies ──────────────────────────────────────────────────────────

  fn get_policy<'a>(
    &'a self,
    id: &'a PolicyId,
  ) -> impl Future<Output = Result<Option<AdminPolicy>, Self::Error>> + Send + 'a;

  fn save_policy<'a>(
    &'a self,
    policy: &'a AdminPolicy,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn list_policies(
    &self,
  ) -> impl Future<Output = Result<Vec<AdminPolicy>, Self::Error>> + Send + '_;
}

// ─── Reference index ─────────────────────────────────────────────────────────

/// Reverse lookup from an authority to the objects citing it.
///
/// May lag behind the object store. Callers must treat a returned id as a
/// hint and re-read the object before acting on it.
pub trait ReferenceIndex: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn references_for(
    &self,
    authority_id: Uuid,
  ) -> impl Future<Output = Result<BTreeSet<Uuid>, Self::Error>> + Send + '_;
}
