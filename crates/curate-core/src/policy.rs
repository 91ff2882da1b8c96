//! Visibility levels, admin policies, and the resolver seams the embargo
//! engine calls out to.

use std::{fmt, future::Future};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Result, embargo::Embargo, object::RepositoryObject};

// ─── Visibility ──────────────────────────────────────────────────────────────

/// The access level a policy engine applies to an object's content.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
  Public,
  Campus,
  Discovery,
  Restricted,
  Embargoed,
}

// ─── Admin policy ────────────────────────────────────────────────────────────

/// Identifier of an admin policy. Every [`Visibility`] is also the id of the
/// policy that describes it, so `PolicyId::from(Visibility::Public)` is
/// `"public"`.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PolicyId(pub String);

impl PolicyId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PolicyId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<Visibility> for PolicyId {
  fn from(v: Visibility) -> Self { Self(v.to_string()) }
}

impl From<&str> for PolicyId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

/// A named bundle of access rules an object can be governed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPolicy {
  pub policy_id: PolicyId,
  pub title:     String,
}

// ─── Resolvers ───────────────────────────────────────────────────────────────

/// Looks up the human-readable title of an admin policy.
///
/// Used only for audit messages. Implementations fail with
/// [`Error::PolicyNotFound`](crate::Error::PolicyNotFound) for unknown ids.
pub trait PolicyTitleResolver: Send + Sync {
  fn title_for<'a>(
    &'a self,
    policy_id: &'a PolicyId,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// The object's own rule for what its visibility should be given an embargo.
pub trait VisibilityResolver: Send + Sync {
  fn resolve_embargo_visibility(
    &self,
    object: &RepositoryObject,
    embargo: &Embargo,
    today: NaiveDate,
  ) -> Visibility;
}

/// Default visibility rule: an active embargo enforces its "during"
/// visibility until the release date and its "after" visibility from then
/// on. An inert embargo leaves the object's visibility alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbargoVisibility;

impl VisibilityResolver for EmbargoVisibility {
  fn resolve_embargo_visibility(
    &self,
    object: &RepositoryObject,
    embargo: &Embargo,
    today: NaiveDate,
  ) -> Visibility {
    match (embargo.release_date, embargo.visibility_after_embargo) {
      (Some(release), Some(after)) if release <= today => after,
      (Some(_), Some(_)) => embargo
        .visibility_during_embargo
        .unwrap_or(Visibility::Embargoed),
      _ => object.visibility,
    }
  }
}
