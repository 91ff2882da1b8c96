//! Error types for `curate-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{authority::AuthorityCategory, policy::PolicyId};

/// A boxed error from a storage backend or index.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why two records cannot be merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompatibleMerge {
  #[error("record {0} is not a local authority")]
  NotAnAuthority(Uuid),

  #[error("cannot merge a {old:?} authority into a {new:?} authority")]
  CategoryMismatch {
    old: AuthorityCategory,
    new: AuthorityCategory,
  },

  #[error("cannot merge authority {0} with itself")]
  SelfMerge(Uuid),
}

#[derive(Debug, Error)]
pub enum Error {
  /// A caller-supplied input violated a precondition.
  #[error("validation error: {0}")]
  Validation(String),

  #[error("incompatible merge: {0}")]
  IncompatibleMerge(#[from] IncompatibleMerge),

  /// A store or index call failed.
  #[error("persistence error during {operation}: {source}")]
  Persistence {
    operation: &'static str,
    #[source]
    source:    BoxError,
  },

  /// One or both writes of an embargo deactivation failed. Whichever write
  /// is `None` succeeded.
  #[error(
    "embargo deactivation of {object_id} incomplete (object: {}, embargo: {})",
    describe(.object),
    describe(.embargo)
  )]
  DeactivationIncomplete {
    object_id: Uuid,
    object:    Option<BoxError>,
    embargo:   Option<BoxError>,
  },

  #[error("admin policy not found: {0}")]
  PolicyNotFound(PolicyId),

  #[error("record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error raised while performing `operation`.
  pub fn store<E>(operation: &'static str, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence { operation, source: Box::new(source) }
  }

  /// True for failures of the underlying store rather than of the caller.
  pub fn is_persistence(&self) -> bool {
    matches!(
      self,
      Self::Persistence { .. } | Self::DeactivationIncomplete { .. }
    )
  }
}

fn describe(e: &Option<BoxError>) -> String {
  match e {
    Some(e) => format!("failed: {e}"),
    None => "saved".to_owned(),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
