//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use curate_core::{
  authority::{AuthorityKind, LocalAuthority},
  embargo::Embargo,
  lifecycle::{EmbargoEngine, EmbargoParams},
  merge::{AuthorityMergeService, MergeOptions},
  object::{ObjectKind, Record, Reference, RepositoryObject},
  policy::{AdminPolicy, PolicyId, PolicyTitleResolver, Visibility},
  relation::Relations,
  store::{EmbargoFilter, ObjectQuery, ObjectStore, ReferenceIndex},
};
use uuid::Uuid;

use crate::{DEFAULT_AUTHORITY_BASE, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn add_object(s: &SqliteStore, kind: ObjectKind, title: &str) -> RepositoryObject {
  let object = RepositoryObject::new(kind, title, Visibility::Public);
  s.save_object(&object).await.unwrap();
  object
}

async fn add_authority(s: &SqliteStore, kind: AuthorityKind, label: &str) -> LocalAuthority {
  let authority = LocalAuthority::new(kind, label);
  s.save_authority(&authority).await.unwrap();
  authority
}

async fn add_embargo(
  s: &SqliteStore,
  object_id: Uuid,
  after: Option<Visibility>,
  release: Option<NaiveDate>,
  history: &[&str],
) -> Embargo {
  let embargo = Embargo {
    object_id,
    visibility_during_embargo: Some(Visibility::Embargoed),
    visibility_after_embargo: after,
    release_date: release,
    history: history.iter().map(|h| h.to_string()).collect(),
  };
  s.save_embargo(&embargo).await.unwrap();
  embargo
}

// ─── Objects ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_object() {
  let s = store().await;
  let mut object = RepositoryObject::new(ObjectKind::Map, "Fayetteville, 1908", Visibility::Campus);
  object.admin_policy_id = Some(PolicyId::from("map-library"));
  object.relations.subject = vec![Reference::Term("Sanborn maps".into())];
  s.save_object(&object).await.unwrap();

  let fetched = s.get_object(object.object_id).await.unwrap();
  assert_eq!(fetched, Some(object));
}

#[tokio::test]
async fn get_object_missing_returns_none() {
  let s = store().await;
  assert!(s.get_object(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn save_object_overwrites() {
  let s = store().await;
  let mut object = add_object(&s, ObjectKind::Image, "Untitled").await;
  object.title = "Old Main, south face".into();
  object.visibility = Visibility::Restricted;
  s.save_object(&object).await.unwrap();

  let fetched = s.get_object(object.object_id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Old Main, south face");
  assert_eq!(fetched.visibility, Visibility::Restricted);
}

#[tokio::test]
async fn find_record_covers_objects_and_authorities() {
  let s = store().await;
  let object = add_object(&s, ObjectKind::Audio, "Oral history 12").await;
  let person = add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;

  assert!(matches!(
    s.find_record(object.object_id).await.unwrap(),
    Some(Record::Object(o)) if o.object_id == object.object_id
  ));
  assert!(matches!(
    s.find_record(person.authority_id).await.unwrap(),
    Some(Record::Authority(a)) if a.authority_id == person.authority_id
  ));
  assert!(s.find_record(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Embargoes ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_embargo() {
  let s = store().await;
  let object = add_object(&s, ObjectKind::Etd, "A thesis").await;
  let embargo = add_embargo(
    &s,
    object.object_id,
    Some(Visibility::Public),
    Some(date(2031, 5, 1)),
    &["earlier entry"],
  )
  .await;

  assert_eq!(s.get_embargo(object.object_id).await.unwrap(), Some(embargo));
}

#[tokio::test]
async fn embargo_requires_existing_object() {
  let s = store().await;
  let embargo = Embargo::new(Uuid::new_v4());
  assert!(s.save_embargo(&embargo).await.is_err());
}

#[tokio::test]
async fn destroy_embargo_reports_whether_removed() {
  let s = store().await;
  let object = add_object(&s, ObjectKind::Etd, "A thesis").await;
  add_embargo(&s, object.object_id, Some(Visibility::Public), Some(date(2031, 5, 1)), &[]).await;

  assert!(s.destroy_embargo(object.object_id).await.unwrap());
  assert!(!s.destroy_embargo(object.object_id).await.unwrap());
  assert!(s.get_embargo(object.object_id).await.unwrap().is_none());
}

#[tokio::test]
async fn saving_object_keeps_its_embargo() {
  let s = store().await;
  let mut object = add_object(&s, ObjectKind::Etd, "A thesis").await;
  add_embargo(&s, object.object_id, Some(Visibility::Public), Some(date(2031, 5, 1)), &[]).await;

  object.visibility = Visibility::Embargoed;
  s.save_object(&object).await.unwrap();
  assert!(s.get_embargo(object.object_id).await.unwrap().is_some());
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn embargo_queries_select_works_by_state() {
  let s = store().await;
  let expired = add_object(&s, ObjectKind::Etd, "expired").await;
  let pending = add_object(&s, ObjectKind::Image, "pending").await;
  let cleared = add_object(&s, ObjectKind::Map, "cleared").await;
  let file_set = add_object(&s, ObjectKind::FileSet, "file set").await;
  let plain = add_object(&s, ObjectKind::Generic, "no embargo").await;

  add_embargo(&s, expired.object_id, Some(Visibility::Public), Some(date(2024, 1, 1)), &[]).await;
  add_embargo(&s, pending.object_id, Some(Visibility::Campus), Some(date(2030, 1, 1)), &[]).await;
  add_embargo(&s, cleared.object_id, None, None, &["An expired embargo was deactivated"]).await;
  add_embargo(&s, file_set.object_id, Some(Visibility::Public), Some(date(2024, 1, 1)), &[]).await;

  let ids = |objects: Vec<RepositoryObject>| {
    let mut ids: Vec<Uuid> = objects.into_iter().map(|o| o.object_id).collect();
    ids.sort();
    ids
  };
  let sorted = |mut v: Vec<Uuid>| {
    v.sort();
    v
  };
  let works = |filter| ObjectQuery { embargo: Some(filter), works_only: true };

  let found = s
    .query_objects(&works(EmbargoFilter::Expired { as_of: date(2025, 6, 1) }))
    .await
    .unwrap();
  assert_eq!(ids(found), vec![expired.object_id]);

  let found = s
    .query_objects(&works(EmbargoFilter::UnderEmbargo))
    .await
    .unwrap();
  assert_eq!(ids(found), sorted(vec![expired.object_id, pending.object_id]));

  let found = s
    .query_objects(&works(EmbargoFilter::Deactivated))
    .await
    .unwrap();
  assert_eq!(ids(found), vec![cleared.object_id]);

  let everything = s.query_objects(&ObjectQuery::default()).await.unwrap();
  assert_eq!(
    ids(everything),
    sorted(vec![
      expired.object_id,
      pending.object_id,
      cleared.object_id,
      file_set.object_id,
      plain.object_id,
    ])
  );
}

#[tokio::test]
async fn expired_query_includes_release_day() {
  let s = store().await;
  let object = add_object(&s, ObjectKind::Etd, "A thesis").await;
  add_embargo(&s, object.object_id, Some(Visibility::Public), Some(date(2025, 6, 1)), &[]).await;

  let query = |as_of| ObjectQuery {
    embargo:    Some(EmbargoFilter::Expired { as_of }),
    works_only: true,
  };
  assert_eq!(s.query_objects(&query(date(2025, 6, 1))).await.unwrap().len(), 1);
  assert!(s.query_objects(&query(date(2025, 5, 31))).await.unwrap().is_empty());
}

// ─── Authorities ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_authorities_filters_by_kind() {
  let s = store().await;
  add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;
  add_authority(&s, AuthorityKind::Topic, "Aerial photographs").await;
  add_authority(&s, AuthorityKind::Person, "Adams, Ansel").await;

  assert_eq!(s.list_authorities(None).await.unwrap().len(), 3);
  let people = s.list_authorities(Some(AuthorityKind::Person)).await.unwrap();
  let labels: Vec<_> = people.iter().map(|a| a.label.as_str()).collect();
  assert_eq!(labels, vec!["Adams, Ansel", "Conway, Joel"]);
}

#[tokio::test]
async fn destroy_authority_reports_whether_removed() {
  let s = store().await;
  let person = add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;

  assert!(s.destroy_authority(person.authority_id).await.unwrap());
  assert!(!s.destroy_authority(person.authority_id).await.unwrap());
  assert!(s.get_authority(person.authority_id).await.unwrap().is_none());
}

// ─── Policies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn policy_titles_resolve() {
  let s = store().await;
  s.save_policy(&AdminPolicy { policy_id: "public".into(), title: "Open access".into() })
    .await
    .unwrap();
  s.save_policy(&AdminPolicy { policy_id: "campus".into(), title: "Campus only".into() })
    .await
    .unwrap();

  assert_eq!(s.title_for(&PolicyId::from("public")).await.unwrap(), "Open access");
  assert!(matches!(
    s.title_for(&PolicyId::from("restricted")).await,
    Err(curate_core::Error::PolicyNotFound(_))
  ));

  let ids: Vec<_> = s
    .list_policies()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.policy_id.0)
    .collect();
  assert_eq!(ids, vec!["campus", "public"]);
}

// ─── Reference index ─────────────────────────────────────────────────────────

#[tokio::test]
async fn index_tracks_both_reference_forms() {
  let s = store().await;
  let person = add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;

  let mut by_id = RepositoryObject::new(ObjectKind::Image, "a", Visibility::Public);
  by_id.relations.creator = vec![Reference::Authority(person.authority_id)];
  s.save_object(&by_id).await.unwrap();

  let mut by_uri = RepositoryObject::new(ObjectKind::Image, "b", Visibility::Public);
  by_uri.relations.contributor = vec![Reference::Term(Reference::authority_uri(
    DEFAULT_AUTHORITY_BASE,
    person.authority_id,
  ))];
  s.save_object(&by_uri).await.unwrap();

  let mut elsewhere = RepositoryObject::new(ObjectKind::Image, "c", Visibility::Public);
  elsewhere.relations.creator = vec![Reference::Term(format!(
    "https://id.loc.gov/authorities/names/{}",
    person.authority_id
  ))];
  s.save_object(&elsewhere).await.unwrap();

  let mut expected = vec![by_id.object_id, by_uri.object_id];
  expected.sort();
  let found: Vec<_> = s
    .references_for(person.authority_id)
    .await
    .unwrap()
    .into_iter()
    .collect();
  assert_eq!(found, expected);
}

#[tokio::test]
async fn index_follows_resaved_relations() {
  let s = store().await;
  let person = add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;
  let mut object = RepositoryObject::new(ObjectKind::Image, "a", Visibility::Public);
  object.relations.creator = vec![Reference::Authority(person.authority_id)];
  object.relations.publisher = vec![Reference::Authority(person.authority_id)];
  s.save_object(&object).await.unwrap();
  assert_eq!(s.references_for(person.authority_id).await.unwrap().len(), 1);

  object.relations = Relations::default();
  s.save_object(&object).await.unwrap();
  assert!(s.references_for(person.authority_id).await.unwrap().is_empty());
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn engine_deactivates_against_sqlite() {
  let s = store().await;
  s.save_policy(&AdminPolicy { policy_id: "embargoed".into(), title: "Embargoed".into() })
    .await
    .unwrap();
  s.save_policy(&AdminPolicy { policy_id: "public".into(), title: "Open access".into() })
    .await
    .unwrap();
  let object = add_object(&s, ObjectKind::Etd, "A thesis").await;

  let engine = EmbargoEngine::new(&s, &s);
  engine
    .create_or_update(object.object_id, EmbargoParams {
      policy_id:         None,
      visibility_during: None,
      visibility_after:  Visibility::Public,
      release_date:      date(2025, 1, 1),
    })
    .await
    .unwrap();

  let report = engine.release_expired(Some(date(2025, 6, 1))).await.unwrap();
  assert_eq!(report.released, vec![object.object_id]);
  assert!(report.failed.is_empty());

  let embargo = s.get_embargo(object.object_id).await.unwrap().unwrap();
  assert!(!embargo.is_active());
  assert_eq!(embargo.history.len(), 1);
  assert!(embargo.history[0].contains("Open access"));
  assert_eq!(
    s.get_object(object.object_id).await.unwrap().unwrap().visibility,
    Visibility::Public
  );
  assert_eq!(engine.find_deactivated().await.unwrap().len(), 1);
  assert!(engine.find_expired(Some(date(2025, 6, 1))).await.unwrap().is_empty());
}

#[tokio::test]
async fn merge_rewrites_and_retires_against_sqlite() {
  let s = store().await;
  let old = add_authority(&s, AuthorityKind::Person, "Joel Conway").await;
  let new = add_authority(&s, AuthorityKind::Person, "Conway, Joel").await;

  let mut object = RepositoryObject::new(ObjectKind::Image, "a", Visibility::Public);
  object.relations.creator = vec![Reference::Term(Reference::authority_uri(
    DEFAULT_AUTHORITY_BASE,
    old.authority_id,
  ))];
  s.save_object(&object).await.unwrap();

  let report = AuthorityMergeService::new(&s, &s, MergeOptions::new(DEFAULT_AUTHORITY_BASE))
    .merge(old.authority_id, new.authority_id)
    .await
    .unwrap();

  assert_eq!(report.rewritten, vec![object.object_id]);
  assert!(report.retired);
  assert!(s.get_authority(old.authority_id).await.unwrap().is_none());
  assert!(s.references_for(old.authority_id).await.unwrap().is_empty());
  assert_eq!(
    s.references_for(new.authority_id).await.unwrap().into_iter().collect::<Vec<_>>(),
    vec![object.object_id]
  );
  assert_eq!(
    s.get_object(object.object_id).await.unwrap().unwrap().relations.creator,
    vec![Reference::Authority(new.authority_id)]
  );
}
