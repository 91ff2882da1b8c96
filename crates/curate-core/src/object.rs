//! Repository objects: the works and assets the embargo and merge logic act
//! on.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  authority::LocalAuthority,
  policy::{PolicyId, Visibility},
  relation::Relations,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What a repository object is. Only work types take part in embargo
/// queries; file sets and collections never do.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
  Image,
  Map,
  Audio,
  Etd,
  Generic,
  FileSet,
  Collection,
}

impl ObjectKind {
  /// The registered work types.
  pub const WORKS: &'static [ObjectKind] =
    &[Self::Image, Self::Map, Self::Audio, Self::Etd, Self::Generic];

  pub fn is_work(self) -> bool { Self::WORKS.contains(&self) }
}

// ─── References ──────────────────────────────────────────────────────────────

/// A value of a relationship field: either a local authority record or a
/// controlled-vocabulary term URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reference {
  Authority(Uuid),
  Term(String),
}

impl Reference {
  /// The local authority this value points at, if any.
  ///
  /// Index documents carry local authorities in their URI form
  /// (`<authority_base>/<uuid>`); those map back to the authority id.
  pub fn authority_id(&self, authority_base: &str) -> Option<Uuid> {
    match self {
      Self::Authority(id) => Some(*id),
      Self::Term(uri) => uri
        .strip_prefix(authority_base.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|id| Uuid::parse_str(id.trim_end_matches('/')).ok()),
    }
  }

  /// The URI form of a local authority reference.
  pub fn authority_uri(authority_base: &str, id: Uuid) -> String {
    format!("{}/{id}", authority_base.trim_end_matches('/'))
  }
}

// ─── Object ──────────────────────────────────────────────────────────────────

/// Any persisted work or asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryObject {
  pub object_id:       Uuid,
  pub kind:            ObjectKind,
  pub title:           String,
  pub visibility:      Visibility,
  pub admin_policy_id: Option<PolicyId>,
  #[serde(default)]
  pub relations:       Relations,
}

impl RepositoryObject {
  /// A new object with a fresh id, no policy and no relations.
  pub fn new(kind: ObjectKind, title: impl Into<String>, visibility: Visibility) -> Self {
    Self {
      object_id: Uuid::new_v4(),
      kind,
      title: title.into(),
      visibility,
      admin_policy_id: None,
      relations: Relations::default(),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Whatever [`ObjectStore::find_record`](crate::store::ObjectStore::find_record)
/// found under an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
  Object(RepositoryObject),
  Authority(LocalAuthority),
}
