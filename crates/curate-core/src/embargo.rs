//! Embargo records and their computed state.
//!
//! An embargo belongs to exactly one repository object and is keyed by that
//! object's id. Its state is never stored; it is derived from the release
//! date, the post-embargo visibility and the history log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::policy::Visibility;

/// A time-bounded access restriction attached to a repository object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embargo {
  pub object_id:                 Uuid,
  pub visibility_during_embargo: Option<Visibility>,
  pub visibility_after_embargo:  Option<Visibility>,
  pub release_date:              Option<NaiveDate>,
  /// Append-only audit log; one entry per deactivation.
  #[serde(default)]
  pub history:                   Vec<String>,
}

/// Where an embargo sits in its lifecycle on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmbargoState {
  /// Active; the release date is still in the future.
  Pending,
  /// Active; the release date has passed but nobody has deactivated it.
  Expired,
  /// Inert, with at least one deactivation recorded.
  Deactivated,
  /// Inert and never deactivated.
  Inert,
}

impl Embargo {
  /// An empty embargo for `object_id`.
  pub fn new(object_id: Uuid) -> Self {
    Self {
      object_id,
      visibility_during_embargo: None,
      visibility_after_embargo: None,
      release_date: None,
      history: Vec::new(),
    }
  }

  /// Both the release date and the post-embargo visibility are set.
  pub fn is_active(&self) -> bool {
    self.release_date.is_some() && self.visibility_after_embargo.is_some()
  }

  pub fn state(&self, today: NaiveDate) -> EmbargoState {
    match self.release_date {
      Some(release) if self.is_active() => {
        if release <= today {
          EmbargoState::Expired
        } else {
          EmbargoState::Pending
        }
      }
      _ if !self.history.is_empty() => EmbargoState::Deactivated,
      _ => EmbargoState::Inert,
    }
  }

  /// Clear the active fields, leaving only the history.
  pub(crate) fn clear(&mut self) {
    self.visibility_during_embargo = None;
    self.visibility_after_embargo = None;
    self.release_date = None;
  }
}

/// Format a deactivation history entry. Audit text only; never parsed back.
pub fn history_message(
  state: &str,
  deactivated_on: NaiveDate,
  release_date: Option<NaiveDate>,
  before: &str,
  after: &str,
) -> String {
  let release = release_date.map(|d| d.to_string()).unwrap_or_default();
  format!(
    "An {state} embargo was deactivated on {deactivated_on}.  Its release \
     date was {release}.  Visibility during embargo was {before} and \
     intended visibility after embargo was {after}"
  )
}
