//! Relationship fields and the table that maps each relation name to its
//! accessor and mutator.
//!
//! Code that needs to walk every relation (authority merging, the reference
//! index) goes through [`RELATIONS`] instead of inspecting attributes by name.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::object::Reference;

/// The relationship fields of a repository object, each an ordered list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relations {
  pub creator:       Vec<Reference>,
  pub contributor:   Vec<Reference>,
  pub publisher:     Vec<Reference>,
  pub rights_holder: Vec<Reference>,
  pub subject:       Vec<Reference>,
  pub genre:         Vec<Reference>,
  pub location:      Vec<Reference>,
}

/// Relation names, as used in the API and the reference index.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Relation {
  Creator,
  Contributor,
  Publisher,
  RightsHolder,
  Subject,
  Genre,
  Location,
}

/// One row of the relation table.
pub struct RelationField {
  pub relation: Relation,
  pub get:      fn(&Relations) -> &[Reference],
  pub get_mut:  fn(&mut Relations) -> &mut Vec<Reference>,
}

pub static RELATIONS: &[RelationField] = &[
  RelationField {
    relation: Relation::Creator,
    get:      |r| &r.creator,
    get_mut:  |r| &mut r.creator,
  },
  RelationField {
    relation: Relation::Contributor,
    get:      |r| &r.contributor,
    get_mut:  |r| &mut r.contributor,
  },
  RelationField {
    relation: Relation::Publisher,
    get:      |r| &r.publisher,
    get_mut:  |r| &mut r.publisher,
  },
  RelationField {
    relation: Relation::RightsHolder,
    get:      |r| &r.rights_holder,
    get_mut:  |r| &mut r.rights_holder,
  },
  RelationField {
    relation: Relation::Subject,
    get:      |r| &r.subject,
    get_mut:  |r| &mut r.subject,
  },
  RelationField {
    relation: Relation::Genre,
    get:      |r| &r.genre,
    get_mut:  |r| &mut r.genre,
  },
  RelationField {
    relation: Relation::Location,
    get:      |r| &r.location,
    get_mut:  |r| &mut r.location,
  },
];

impl Relation {
  pub fn field(self) -> &'static RelationField {
    // The table lists every variant in declaration order.
    &RELATIONS[self as usize]
  }
}

impl Relations {
  pub fn get(&self, relation: Relation) -> &[Reference] {
    (relation.field().get)(self)
  }

  pub fn get_mut(&mut self, relation: Relation) -> &mut Vec<Reference> {
    (relation.field().get_mut)(self)
  }

  /// Every `(relation, value)` pair, in table order.
  pub fn iter(&self) -> impl Iterator<Item = (Relation, &Reference)> + '_ {
    RELATIONS
      .iter()
      .flat_map(move |f| (f.get)(self).iter().map(move |v| (f.relation, v)))
  }
}
