use chrono::NaiveDate;
use uuid::Uuid;

use super::memory::MemoryStore;
use crate::{
  Error,
  embargo::{Embargo, EmbargoState},
  lifecycle::{EmbargoEngine, EmbargoParams},
  object::{ObjectKind, RepositoryObject},
  policy::{PolicyId, Visibility},
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate { day(2024, 6, 1) }

fn yesterday() -> NaiveDate { today().pred_opt().unwrap() }

fn store() -> MemoryStore {
  let s = MemoryStore::default();
  s.insert_policy("public", "Public Access");
  s.insert_policy("embargoed", "Embargoed");
  s.insert_policy("campus", "Campus Only");
  s
}

fn work(s: &MemoryStore, kind: ObjectKind) -> RepositoryObject {
  let object = RepositoryObject::new(kind, "Oral history, reel 3", Visibility::Embargoed);
  s.insert_object(&object);
  object
}

fn embargo_on(s: &MemoryStore, object: &RepositoryObject, release: NaiveDate) {
  s.insert_embargo(&Embargo {
    visibility_during_embargo: Some(Visibility::Embargoed),
    visibility_after_embargo: Some(Visibility::Public),
    release_date: Some(release),
    ..Embargo::new(object.object_id)
  });
}

fn params(release: NaiveDate) -> EmbargoParams {
  EmbargoParams {
    policy_id:         None,
    visibility_during: None,
    visibility_after:  Visibility::Public,
    release_date:      release,
  }
}

// ─── create_or_update ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_sets_fields_without_touching_visibility() {
  let s = store();
  let mut object = work(&s, ObjectKind::Audio);
  object.visibility = Visibility::Public;
  s.insert_object(&object);
  let engine = EmbargoEngine::new(&s, &s);

  let embargo = engine
    .create_or_update(object.object_id, EmbargoParams {
      policy_id: Some(PolicyId::from("campus")),
      ..params(day(2030, 1, 1))
    })
    .await
    .unwrap();

  assert_eq!(embargo.release_date, Some(day(2030, 1, 1)));
  assert_eq!(embargo.visibility_during_embargo, Some(Visibility::Embargoed));
  assert_eq!(embargo.visibility_after_embargo, Some(Visibility::Public));
  assert_eq!(s.embargo(object.object_id), Some(embargo));

  let stored = s.object(object.object_id);
  assert_eq!(stored.admin_policy_id, Some(PolicyId::from("campus")));
  assert_eq!(stored.visibility, Visibility::Public);
}

#[tokio::test]
async fn update_keeps_history() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  s.insert_embargo(&Embargo {
    history: vec!["earlier".into()],
    ..Embargo::new(object.object_id)
  });
  let engine = EmbargoEngine::new(&s, &s);

  let embargo = engine
    .create_or_update(object.object_id, params(day(2031, 3, 3)))
    .await
    .unwrap();
  assert_eq!(embargo.history, vec!["earlier".to_string()]);
  assert!(embargo.is_active());
}

#[tokio::test]
async fn create_rejects_embargoed_as_after_visibility() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  let engine = EmbargoEngine::new(&s, &s);

  let err = engine
    .create_or_update(object.object_id, EmbargoParams {
      visibility_after: Visibility::Embargoed,
      ..params(day(2030, 1, 1))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
  assert!(s.embargo(object.object_id).is_none());
}

#[tokio::test]
async fn create_on_missing_object_errors() {
  let s = store();
  let engine = EmbargoEngine::new(&s, &s);
  let id = Uuid::new_v4();
  let err = engine.create_or_update(id, params(today())).await.unwrap_err();
  assert!(matches!(err, Error::RecordNotFound(missing) if missing == id));
}

// ─── copy / remove ───────────────────────────────────────────────────────────

#[tokio::test]
async fn copy_duplicates_dates_and_visibilities() {
  let s = store();
  let source = work(&s, ObjectKind::Map);
  let dest = work(&s, ObjectKind::Map);
  embargo_on(&s, &source, day(2029, 9, 9));
  let engine = EmbargoEngine::new(&s, &s);

  engine.copy(source.object_id, dest.object_id).await.unwrap();

  let copied = s.embargo(dest.object_id).unwrap();
  assert_eq!(copied.object_id, dest.object_id);
  assert_eq!(copied.release_date, Some(day(2029, 9, 9)));
  assert_eq!(copied.visibility_after_embargo, Some(Visibility::Public));
  assert_eq!(copied.visibility_during_embargo, Some(Visibility::Embargoed));
}

#[tokio::test]
async fn copy_without_source_embargo_is_a_validation_error() {
  let s = store();
  let source = work(&s, ObjectKind::Map);
  let dest = work(&s, ObjectKind::Map);
  let engine = EmbargoEngine::new(&s, &s);

  let err = engine.copy(source.object_id, dest.object_id).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
  assert!(s.embargo(dest.object_id).is_none());
}

#[tokio::test]
async fn remove_without_embargo_is_ok() {
  let s = store();
  let object = work(&s, ObjectKind::Etd);
  let engine = EmbargoEngine::new(&s, &s);

  assert!(!engine.remove(object.object_id).await.unwrap());
  assert!(!engine.remove(Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn remove_destroys_embargo() {
  let s = store();
  let object = work(&s, ObjectKind::Etd);
  embargo_on(&s, &object, day(2030, 1, 1));
  let engine = EmbargoEngine::new(&s, &s);

  assert!(engine.remove(object.object_id).await.unwrap());
  assert!(s.embargo(object.object_id).is_none());
}

// ─── deactivate ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn deactivating_an_expired_embargo_applies_after_visibility() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  embargo_on(&s, &object, yesterday());
  let engine = EmbargoEngine::new(&s, &s);

  let done = engine.deactivate(object.object_id, Some(today())).await.unwrap();

  assert_eq!(done.prior_state, EmbargoState::Expired);
  assert_eq!(done.object.visibility, Visibility::Public);
  assert_eq!(s.object(object.object_id).visibility, Visibility::Public);

  let embargo = s.embargo(object.object_id).unwrap();
  assert!(!embargo.is_active());
  assert_eq!(embargo.state(today()), EmbargoState::Deactivated);
  assert_eq!(embargo.history.len(), 1);
  let entry = &embargo.history[0];
  assert!(entry.starts_with("An expired embargo was deactivated on 2024-06-01."));
  assert!(entry.contains("release date was 2024-05-31"));
  assert!(entry.contains("during embargo was Embargoed"));
  assert!(entry.contains("after embargo was Public Access"));
}

#[tokio::test]
async fn deactivate_is_idempotent() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  embargo_on(&s, &object, yesterday());
  let engine = EmbargoEngine::new(&s, &s);

  let first = engine.deactivate(object.object_id, Some(today())).await.unwrap();
  let second = engine.deactivate(object.object_id, Some(today())).await.unwrap();

  assert_eq!(first.object.visibility, Visibility::Public);
  assert_eq!(second.object.visibility, Visibility::Public);
  assert_eq!(second.prior_state, EmbargoState::Deactivated);
  assert_eq!(s.object(object.object_id).visibility, Visibility::Public);
  assert!(!s.embargo(object.object_id).unwrap().is_active());
}

#[tokio::test]
async fn deactivating_a_pending_embargo_enforces_during_visibility() {
  let s = store();
  let mut object = work(&s, ObjectKind::Image);
  object.visibility = Visibility::Public;
  s.insert_object(&object);
  embargo_on(&s, &object, day(2030, 1, 1));
  let engine = EmbargoEngine::new(&s, &s);

  let done = engine.deactivate(object.object_id, Some(today())).await.unwrap();
  assert_eq!(done.prior_state, EmbargoState::Pending);
  assert_eq!(done.object.visibility, Visibility::Embargoed);
  assert!(done.embargo.history[0].starts_with("An active embargo"));
}

#[tokio::test]
async fn unknown_policy_title_degrades_the_label_only() {
  let s = MemoryStore::default();
  let object = work(&s, ObjectKind::Image);
  embargo_on(&s, &object, yesterday());
  let engine = EmbargoEngine::new(&s, &s);

  let done = engine.deactivate(object.object_id, Some(today())).await.unwrap();
  assert_eq!(done.object.visibility, Visibility::Public);
  assert!(done.embargo.history[0].contains("during embargo was embargoed"));
  assert!(done.embargo.history[0].contains("after embargo was public"));
}

#[tokio::test]
async fn deactivate_without_embargo_is_a_validation_error() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  let engine = EmbargoEngine::new(&s, &s);
  let err = engine.deactivate(object.object_id, None).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn failed_embargo_save_is_surfaced_after_object_save() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  embargo_on(&s, &object, yesterday());
  s.fail_embargo_saves(true);
  let engine = EmbargoEngine::new(&s, &s);

  let err = engine.deactivate(object.object_id, Some(today())).await.unwrap_err();
  assert!(err.is_persistence());
  assert!(matches!(
    &err,
    Error::DeactivationIncomplete { object: None, embargo: Some(_), .. }
  ));
  // The object write was still attempted; the embargo is still active, so a
  // retry will finish the job.
  assert_eq!(s.object(object.object_id).visibility, Visibility::Public);
  assert!(s.embargo(object.object_id).unwrap().is_active());

  s.fail_embargo_saves(false);
  engine.deactivate(object.object_id, Some(today())).await.unwrap();
  assert!(!s.embargo(object.object_id).unwrap().is_active());
  assert_eq!(s.object(object.object_id).visibility, Visibility::Public);
}

#[tokio::test]
async fn failed_object_save_leaves_embargo_active_for_retry() {
  let s = store();
  let object = work(&s, ObjectKind::Image);
  embargo_on(&s, &object, yesterday());
  s.fail_object_save(object.object_id, true);
  let engine = EmbargoEngine::new(&s, &s);

  let err = engine.deactivate(object.object_id, Some(today())).await.unwrap_err();
  assert!(matches!(
    &err,
    Error::DeactivationIncomplete { object: Some(_), embargo: None, .. }
  ));
  assert!(err.to_string().contains("refused"));

  let embargo = s.embargo(object.object_id).unwrap();
  assert!(embargo.is_active());
  assert!(embargo.history.is_empty());
  assert_eq!(s.object(object.object_id).visibility, Visibility::Embargoed);
  assert_eq!(engine.find_expired(Some(today())).await.unwrap().len(), 1);

  s.fail_object_save(object.object_id, false);
  engine.deactivate(object.object_id, Some(today())).await.unwrap();
  assert_eq!(s.object(object.object_id).visibility, Visibility::Public);
  let embargo = s.embargo(object.object_id).unwrap();
  assert!(!embargo.is_active());
  assert_eq!(embargo.history.len(), 1);
}

// ─── queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_expired_returns_only_expired_works() {
  let s = store();
  let expired = work(&s, ObjectKind::Image);
  let pending = work(&s, ObjectKind::Image);
  let file_set = work(&s, ObjectKind::FileSet);
  let collection = work(&s, ObjectKind::Collection);
  work(&s, ObjectKind::Map);
  embargo_on(&s, &expired, yesterday());
  embargo_on(&s, &pending, day(2030, 1, 1));
  embargo_on(&s, &file_set, yesterday());
  embargo_on(&s, &collection, yesterday());
  let engine = EmbargoEngine::new(&s, &s);

  let found = engine.find_expired(Some(today())).await.unwrap();
  let ids: Vec<_> = found.iter().map(|o| o.object_id).collect();
  assert_eq!(ids, vec![expired.object_id]);

  let under = engine.find_under_embargo().await.unwrap();
  assert_eq!(under.len(), 2);
  assert!(under.iter().all(|o| o.kind.is_work()));
}

#[tokio::test]
async fn deactivated_embargoes_move_between_queries() {
  let s = store();
  let object = work(&s, ObjectKind::Audio);
  embargo_on(&s, &object, yesterday());
  let engine = EmbargoEngine::new(&s, &s);

  assert!(engine.find_deactivated().await.unwrap().is_empty());
  engine.deactivate(object.object_id, Some(today())).await.unwrap();

  assert!(engine.find_expired(Some(today())).await.unwrap().is_empty());
  assert!(engine.find_under_embargo().await.unwrap().is_empty());
  let deactivated = engine.find_deactivated().await.unwrap();
  assert_eq!(deactivated.len(), 1);
  assert_eq!(deactivated[0].object_id, object.object_id);
}

#[tokio::test]
async fn release_expired_sweeps_and_collects_failures() {
  let s = store();
  let ok = work(&s, ObjectKind::Image);
  let broken = work(&s, ObjectKind::Image);
  let pending = work(&s, ObjectKind::Image);
  embargo_on(&s, &ok, yesterday());
  embargo_on(&s, &broken, yesterday());
  embargo_on(&s, &pending, day(2030, 1, 1));
  s.fail_object_save(broken.object_id, true);
  let engine = EmbargoEngine::new(&s, &s);

  let report = engine.release_expired(Some(today())).await.unwrap();

  assert_eq!(report.released, vec![ok.object_id]);
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].object_id, broken.object_id);
  assert!(s.embargo(pending.object_id).unwrap().is_active());
}
