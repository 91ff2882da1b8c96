//! Local authority records and the categories that decide which of them may
//! be merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::object::Record;

/// The kind of entity a local authority describes.
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
pub enum AuthorityKind {
  Person,
  Organization,
  Group,
  Topic,
}

/// Merge compatibility groups.
///
/// Names (people, organizations, groups) are interchangeable as values of
/// creator-like relations; topics are values of subject-like relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityCategory {
  LocalName,
  LocalSubject,
  NotAnAuthority,
}

impl AuthorityKind {
  pub fn category(self) -> AuthorityCategory {
    match self {
      Self::Person | Self::Organization | Self::Group => {
        AuthorityCategory::LocalName
      }
      Self::Topic => AuthorityCategory::LocalSubject,
    }
  }
}

/// A repository-local person, organization, group or topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAuthority {
  pub authority_id: Uuid,
  pub kind:         AuthorityKind,
  pub label:        String,
  pub created_at:   DateTime<Utc>,
}

impl LocalAuthority {
  pub fn new(kind: AuthorityKind, label: impl Into<String>) -> Self {
    Self {
      authority_id: Uuid::new_v4(),
      kind,
      label: label.into(),
      created_at: Utc::now(),
    }
  }
}

/// The merge category of any stored record.
pub fn category_of(record: &Record) -> AuthorityCategory {
  match record {
    Record::Authority(a) => a.kind.category(),
    Record::Object(_) => AuthorityCategory::NotAnAuthority,
  }
}
