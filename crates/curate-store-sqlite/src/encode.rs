//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD` (so they sort and
//! compare as text). Relations and history are compact JSON. UUIDs are
//! hyphenated lowercase strings. Enums use their `Display` form.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use curate_core::{
  authority::LocalAuthority,
  embargo::Embargo,
  object::RepositoryObject,
  policy::{PolicyId, Visibility},
  relation::Relations,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

fn decode_visibility(column: &'static str, s: Option<String>) -> Result<Option<Visibility>> {
  s.as_deref().map(|v| decode_enum(column, v)).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `objects` row.
pub struct RawObject {
  pub object_id:       String,
  pub kind:            String,
  pub title:           String,
  pub visibility:      String,
  pub admin_policy_id: Option<String>,
  pub relations:       String,
}

impl RawObject {
  pub const COLUMNS: &'static str =
    "o.object_id, o.kind, o.title, o.visibility, o.admin_policy_id, o.relations";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      object_id:       row.get(0)?,
      kind:            row.get(1)?,
      title:           row.get(2)?,
      visibility:      row.get(3)?,
      admin_policy_id: row.get(4)?,
      relations:       row.get(5)?,
    })
  }

  pub fn into_object(self) -> Result<RepositoryObject> {
    let relations: Relations = serde_json::from_str(&self.relations)?;
    Ok(RepositoryObject {
      object_id:       decode_uuid(&self.object_id)?,
      kind:            decode_enum("objects.kind", &self.kind)?,
      title:           self.title,
      visibility:      decode_enum("objects.visibility", &self.visibility)?,
      admin_policy_id: self.admin_policy_id.map(PolicyId),
      relations,
    })
  }
}

/// Raw strings read directly from an `embargoes` row.
pub struct RawEmbargo {
  pub object_id:         String,
  pub visibility_during: Option<String>,
  pub visibility_after:  Option<String>,
  pub release_date:      Option<String>,
  pub history:           String,
}

impl RawEmbargo {
  pub fn into_embargo(self) -> Result<Embargo> {
    Ok(Embargo {
      object_id:                 decode_uuid(&self.object_id)?,
      visibility_during_embargo: decode_visibility(
        "embargoes.visibility_during",
        self.visibility_during,
      )?,
      visibility_after_embargo:  decode_visibility(
        "embargoes.visibility_after",
        self.visibility_after,
      )?,
      release_date:              self
        .release_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      history:                   serde_json::from_str(&self.history)?,
    })
  }
}

/// Raw strings read directly from an `authorities` row.
pub struct RawAuthority {
  pub authority_id: String,
  pub kind:         String,
  pub label:        String,
  pub created_at:   String,
}

impl RawAuthority {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      authority_id: row.get(0)?,
      kind:         row.get(1)?,
      label:        row.get(2)?,
      created_at:   row.get(3)?,
    })
  }

  pub fn into_authority(self) -> Result<LocalAuthority> {
    Ok(LocalAuthority {
      authority_id: decode_uuid(&self.authority_id)?,
      kind:         decode_enum("authorities.kind", &self.kind)?,
      label:        self.label,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
