//! [`SqliteStore`]: the SQLite implementation of [`ObjectStore`],
//! [`ReferenceIndex`] and [`PolicyTitleResolver`].

use std::{collections::BTreeSet, path::Path, sync::Arc};

use curate_core::{
  authority::{AuthorityKind, LocalAuthority},
  embargo::Embargo,
  object::{ObjectKind, Record, RepositoryObject},
  policy::{AdminPolicy, PolicyId, PolicyTitleResolver},
  store::{EmbargoFilter, ObjectQuery, ObjectStore, ReferenceIndex},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawAuthority, RawEmbargo, RawObject, decode_uuid, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

/// Authority base URI used when none is configured.
pub const DEFAULT_AUTHORITY_BASE: &str = "urn:curate:authorities";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Curate repository store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:           tokio_rusqlite::Connection,
  authority_base: Arc<str>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, authority_base: DEFAULT_AUTHORITY_BASE.into() })
  }

  /// Set the base URI under which relation values written as terms are
  /// recognised as local authorities when indexing.
  pub fn with_authority_base(mut self, base: impl Into<String>) -> Self {
    self.authority_base = base.into().into();
    self
  }

  pub fn authority_base(&self) -> &str { &self.authority_base }
}

// ─── ObjectStore impl ────────────────────────────────────────────────────────

impl ObjectStore for SqliteStore {
  type Error = Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn find_record(&self, id: Uuid) -> Result<Option<Record>> {
    if let Some(object) = self.get_object(id).await? {
      return Ok(Some(Record::Object(object)));
    }
    Ok(self.get_authority(id).await?.map(Record::Authority))
  }

  // ── Objects ───────────────────────────────────────────────────────────────

  async fn get_object(&self, id: Uuid) -> Result<Option<RepositoryObject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawObject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM objects o WHERE o.object_id = ?1", RawObject::COLUMNS),
              rusqlite::params![id_str],
              RawObject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawObject::into_object).transpose()
  }

  /// Upsert the object and rebuild its rows in the reference index, in one
  /// transaction.
  async fn save_object(&self, object: &RepositoryObject) -> Result<()> {
    let id_str         = encode_uuid(object.object_id);
    let kind_str       = object.kind.to_string();
    let title          = object.title.clone();
    let visibility_str = object.visibility.to_string();
    let policy_str     = object.admin_policy_id.as_ref().map(|p| p.0.clone());
    let relations_str  = serde_json::to_string(&object.relations)?;
    let references: Vec<(String, String)> = object
      .relations
      .iter()
      .filter_map(|(relation, value)| {
        value
          .authority_id(&self.authority_base)
          .map(|a| (relation.to_string(), encode_uuid(a)))
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO objects (object_id, kind, title, visibility, admin_policy_id, relations)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (object_id) DO UPDATE SET
             kind            = excluded.kind,
             title           = excluded.title,
             visibility      = excluded.visibility,
             admin_policy_id = excluded.admin_policy_id,
             relations       = excluded.relations",
          rusqlite::params![
            id_str,
            kind_str,
            title,
            visibility_str,
            policy_str,
            relations_str,
          ],
        )?;
        tx.execute(
          "DELETE FROM object_references WHERE object_id = ?1",
          rusqlite::params![id_str],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO object_references (object_id, relation, authority_id)
             VALUES (?1, ?2, ?3)",
          )?;
          for (relation, authority_id) in &references {
            stmt.execute(rusqlite::params![id_str, relation, authority_id])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_objects(&self, query: &ObjectQuery) -> Result<Vec<RepositoryObject>> {
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<String> = vec![];

    match query.embargo {
      Some(EmbargoFilter::Expired { as_of }) => {
        params.push(encode_date(as_of));
        conds.push(format!(
          "e.release_date IS NOT NULL AND e.release_date <= ?{} \
           AND e.visibility_after IS NOT NULL",
          params.len()
        ));
      }
      Some(EmbargoFilter::UnderEmbargo) => {
        conds.push("e.release_date IS NOT NULL".to_owned());
      }
      Some(EmbargoFilter::Deactivated) => {
        conds.push("e.history <> '[]'".to_owned());
      }
      None => {}
    }

    if query.works_only {
      let mut slots = Vec::with_capacity(ObjectKind::WORKS.len());
      for kind in ObjectKind::WORKS {
        params.push(kind.to_string());
        slots.push(format!("?{}", params.len()));
      }
      conds.push(format!("o.kind IN ({})", slots.join(", ")));
    }

    let join = if query.embargo.is_some() {
      "JOIN embargoes e ON e.object_id = o.object_id"
    } else {
      ""
    };
    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {} FROM objects o {join} {where_clause} ORDER BY o.object_id",
      RawObject::COLUMNS
    );

    let raws: Vec<RawObject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawObject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObject::into_object).collect()
  }

  // ── Embargoes ─────────────────────────────────────────────────────────────

  async fn get_embargo(&self, object_id: Uuid) -> Result<Option<Embargo>> {
    let id_str = encode_uuid(object_id);

    let raw: Option<RawEmbargo> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT object_id, visibility_during, visibility_after, release_date, history
               FROM embargoes WHERE object_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawEmbargo {
                  object_id:         row.get(0)?,
                  visibility_during: row.get(1)?,
                  visibility_after:  row.get(2)?,
                  release_date:      row.get(3)?,
                  history:           row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEmbargo::into_embargo).transpose()
  }

  async fn save_embargo(&self, embargo: &Embargo) -> Result<()> {
    let id_str      = encode_uuid(embargo.object_id);
    let during_str  = embargo.visibility_during_embargo.map(|v| v.to_string());
    let after_str   = embargo.visibility_after_embargo.map(|v| v.to_string());
    let release_str = embargo.release_date.map(encode_date);
    let history_str = serde_json::to_string(&embargo.history)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO embargoes (object_id, visibility_during, visibility_after, release_date, history)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (object_id) DO UPDATE SET
             visibility_during = excluded.visibility_during,
             visibility_after  = excluded.visibility_after,
             release_date      = excluded.release_date,
             history           = excluded.history",
          rusqlite::params![id_str, during_str, after_str, release_str, history_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn destroy_embargo(&self, object_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(object_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM embargoes WHERE object_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Authorities ───────────────────────────────────────────────────────────

  async fn get_authority(&self, id: Uuid) -> Result<Option<LocalAuthority>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAuthority> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT authority_id, kind, label, created_at FROM authorities
               WHERE authority_id = ?1",
              rusqlite::params![id_str],
              RawAuthority::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAuthority::into_authority).transpose()
  }

  async fn save_authority(&self, authority: &LocalAuthority) -> Result<()> {
    let id_str   = encode_uuid(authority.authority_id);
    let kind_str = authority.kind.to_string();
    let label    = authority.label.clone();
    let at_str   = encode_dt(authority.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO authorities (authority_id, kind, label, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (authority_id) DO UPDATE SET
             kind  = excluded.kind,
             label = excluded.label",
          rusqlite::params![id_str, kind_str, label, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn destroy_authority(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM authorities WHERE authority_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn list_authorities(
    &self,
    kind: Option<AuthorityKind>,
  ) -> Result<Vec<LocalAuthority>> {
    let kind_str = kind.map(|k| k.to_string());

    let raws: Vec<RawAuthority> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT authority_id, kind, label, created_at FROM authorities
           WHERE ?1 IS NULL OR kind = ?1
           ORDER BY label, authority_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawAuthority::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuthority::into_authority).collect()
  }

  // ── Policies ──────────────────────────────────────────────────────────────

  async fn get_policy(&self, id: &PolicyId) -> Result<Option<AdminPolicy>> {
    let id_str = id.0.clone();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT policy_id, title FROM policies WHERE policy_id = ?1",
              rusqlite::params![id_str],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(row.map(|(policy_id, title)| AdminPolicy { policy_id: PolicyId(policy_id), title }))
  }

  async fn save_policy(&self, policy: &AdminPolicy) -> Result<()> {
    let id_str = policy.policy_id.0.clone();
    let title  = policy.title.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO policies (policy_id, title) VALUES (?1, ?2)
           ON CONFLICT (policy_id) DO UPDATE SET title = excluded.title",
          rusqlite::params![id_str, title],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_policies(&self) -> Result<Vec<AdminPolicy>> {
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT policy_id, title FROM policies ORDER BY policy_id")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(policy_id, title)| AdminPolicy { policy_id: PolicyId(policy_id), title })
        .collect(),
    )
  }
}

// ─── ReferenceIndex impl ─────────────────────────────────────────────────────

impl ReferenceIndex for SqliteStore {
  type Error = Error;

  async fn references_for(&self, authority_id: Uuid) -> Result<BTreeSet<Uuid>> {
    let id_str = encode_uuid(authority_id);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT object_id FROM object_references WHERE authority_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    ids.iter().map(|s| decode_uuid(s)).collect()
  }
}

// ─── PolicyTitleResolver impl ────────────────────────────────────────────────

impl PolicyTitleResolver for SqliteStore {
  async fn title_for(&self, policy_id: &PolicyId) -> curate_core::Result<String> {
    match self.get_policy(policy_id).await {
      Ok(Some(policy)) => Ok(policy.title),
      Ok(None) => Err(curate_core::Error::PolicyNotFound(policy_id.clone())),
      Err(e) => Err(curate_core::Error::store("get policy", e)),
    }
  }
}
