//! Merging duplicate local authorities.
//!
//! A merge runs in two explicit phases: every object the reference index
//! lists for the old authority is rewritten and saved on its own, then the
//! old authority is retired. Nothing spans the batch, so an interrupted merge
//! is finished by running it again; the index then returns only the objects
//! still citing the old record.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  authority::{AuthorityCategory, category_of},
  error::IncompatibleMerge,
  object::{Record, Reference},
  relation::{RELATIONS, Relation, Relations},
  store::{ObjectStore, ReferenceIndex},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// When the old authority is deleted after the rewrite phase.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RetirePolicy {
  /// Only when every referencing object was rewritten or skipped.
  #[default]
  WhenClean,
  /// Even if some rewrites failed. Objects whose save failed keep pointing
  /// at a record that no longer exists.
  Always,
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
  /// Base URI of local authority records; values of the form
  /// `<authority_base>/<uuid>` are treated as references to `<uuid>`.
  pub authority_base: String,
  pub retire:         RetirePolicy,
  /// Skip appending the new authority to a field that already cites it.
  pub dedupe:         bool,
}

impl MergeOptions {
  pub fn new(authority_base: impl Into<String>) -> Self {
    Self {
      authority_base: authority_base.into(),
      retire:         RetirePolicy::default(),
      dedupe:         false,
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeFailure {
  pub object_id: Uuid,
  pub error:     String,
}

/// What [`AuthorityMergeService::merge`] did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
  pub old_id:       Uuid,
  pub new_id:       Uuid,
  pub category:     AuthorityCategory,
  /// Objects saved with the new reference.
  pub rewritten:    Vec<Uuid>,
  /// Index hits that no longer exist or no longer cite the old authority.
  pub skipped:      Vec<Uuid>,
  pub failed:       Vec<MergeFailure>,
  /// Whether the old authority was deleted.
  pub retired:      bool,
  /// Why deleting the old authority failed, if it did.
  #[serde(default)]
  pub retire_error: Option<String>,
}

enum Rewrite {
  Changed(Vec<Relation>),
  Unchanged,
  Missing,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct AuthorityMergeService<'a, S, I> {
  store:   &'a S,
  index:   &'a I,
  options: MergeOptions,
}

impl<'a, S, I> AuthorityMergeService<'a, S, I>
where
  S: ObjectStore,
  I: ReferenceIndex,
{
  pub fn new(store: &'a S, index: &'a I, options: MergeOptions) -> Self {
    Self { store, index, options }
  }

  /// Replace `old_id` with `new_id` on every object citing it, then retire
  /// `old_id`.
  ///
  /// Validation failures are returned before anything is written. Failures
  /// after that, including deleting `old_id`, are recorded in the report.
  pub async fn merge(&self, old_id: Uuid, new_id: Uuid) -> Result<MergeReport> {
    let category = self.validate(old_id, new_id).await?;

    let affected = self
      .index
      .references_for(old_id)
      .await
      .map_err(|e| Error::store("query reference index", e))?;

    info!(%old_id, %new_id, objects = affected.len(), "merging authorities");

    let mut report = MergeReport {
      old_id,
      new_id,
      category,
      rewritten: Vec::new(),
      skipped: Vec::new(),
      failed: Vec::new(),
      retired: false,
      retire_error: None,
    };

    for object_id in affected {
      match self.rewrite(object_id, old_id, new_id).await {
        Ok(Rewrite::Changed(relations)) => {
          info!(%object_id, ?relations, "rewrote authority references");
          report.rewritten.push(object_id);
        }
        Ok(Rewrite::Unchanged) => {
          warn!(%object_id, %old_id, "stale index entry: object no longer cites authority");
          report.skipped.push(object_id);
        }
        Ok(Rewrite::Missing) => {
          warn!(%object_id, "stale index entry: object not found");
          report.skipped.push(object_id);
        }
        Err(e) => {
          error!(%object_id, error = %e, "failed to rewrite authority references");
          report.failed.push(MergeFailure { object_id, error: e.to_string() });
        }
      }
    }

    if report.failed.is_empty() || self.options.retire == RetirePolicy::Always {
      match self.store.destroy_authority(old_id).await {
        Ok(_) => {
          report.retired = true;
          info!(%old_id, %new_id, "authority merged and retired");
        }
        Err(e) => {
          let e = Error::store("destroy authority", e);
          error!(%old_id, error = %e, "failed to retire old authority; rerun the merge");
          report.retire_error = Some(e.to_string());
        }
      }
    } else {
      warn!(
        %old_id,
        failed = report.failed.len(),
        "keeping old authority until every rewrite succeeds; rerun the merge"
      );
    }

    Ok(report)
  }

  async fn validate(&self, old_id: Uuid, new_id: Uuid) -> Result<AuthorityCategory> {
    let old = category_of(&self.find(old_id).await?);
    let new = category_of(&self.find(new_id).await?);

    if old == AuthorityCategory::NotAnAuthority {
      return Err(IncompatibleMerge::NotAnAuthority(old_id).into());
    }
    if new == AuthorityCategory::NotAnAuthority {
      return Err(IncompatibleMerge::NotAnAuthority(new_id).into());
    }
    if old != new {
      return Err(IncompatibleMerge::CategoryMismatch { old, new }.into());
    }
    if old_id == new_id {
      return Err(IncompatibleMerge::SelfMerge(old_id).into());
    }
    Ok(old)
  }

  async fn find(&self, id: Uuid) -> Result<Record> {
    self
      .store
      .find_record(id)
      .await
      .map_err(|e| Error::store("find record", e))?
      .ok_or(Error::RecordNotFound(id))
  }

  async fn rewrite(&self, object_id: Uuid, old_id: Uuid, new_id: Uuid) -> Result<Rewrite> {
    let Some(mut object) = self
      .store
      .get_object(object_id)
      .await
      .map_err(|e| Error::store("get object", e))?
    else {
      return Ok(Rewrite::Missing);
    };

    let changed = rewrite_references(
      &mut object.relations,
      old_id,
      new_id,
      &self.options.authority_base,
      self.options.dedupe,
    );
    if changed.is_empty() {
      return Ok(Rewrite::Unchanged);
    }

    self
      .store
      .save_object(&object)
      .await
      .map_err(|e| Error::store("save object", e))?;
    Ok(Rewrite::Changed(changed))
  }
}

/// In every relation citing `old_id` (directly or by URI), drop those
/// values and append `new_id` at the end. Other values keep their order and
/// form; relations not citing `old_id` are left alone.
///
/// Returns the relations that changed.
pub fn rewrite_references(
  relations: &mut Relations,
  old_id: Uuid,
  new_id: Uuid,
  authority_base: &str,
  dedupe: bool,
) -> Vec<Relation> {
  let cites = |v: &Reference, id: Uuid| v.authority_id(authority_base) == Some(id);
  let mut changed = Vec::new();

  for field in RELATIONS {
    let values = (field.get_mut)(relations);
    if !values.iter().any(|v| cites(v, old_id)) {
      continue;
    }
    values.retain(|v| !cites(v, old_id));
    if !(dedupe && values.iter().any(|v| cites(v, new_id))) {
      values.push(Reference::Authority(new_id));
    }
    changed.push(field.relation);
  }

  changed
}
