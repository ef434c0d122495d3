//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeDelta, TimeZone, Utc};
use tally_core::{
  commitment::{Currency, NewCommitment, Status},
  cycle::Cycle,
  history::ChangeKind,
  store::CommitmentStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn rent(cycle: Cycle) -> NewCommitment {
  let mut input = NewCommitment::new(
    "Rent",
    Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
    cycle,
  );
  input.amount = Some("950.00".parse().unwrap());
  input.currency = Currency::Code("EUR".into());
  input.tags = ["housing".to_owned(), "monthly".to_owned()].into();
  input
}

// ─── Commitments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_commitment_round_trips_all_fields() {
  let s = store().await;

  let created = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();
  assert_eq!(created.status, Status::Active);
  assert!(created.history.is_empty());

  let fetched = s.get_commitment(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, created.id);
  assert_eq!(fetched.title, "Rent");
  assert_eq!(fetched.start_date, created.start_date);
  assert_eq!(fetched.cycle, Cycle::Monthly);
  assert_eq!(fetched.next_occurrence, created.next_occurrence);
  assert_eq!(fetched.amount, Some("950.00".parse().unwrap()));
  assert_eq!(fetched.currency, Currency::Code("EUR".into()));
  assert_eq!(fetched.tags, created.tags);
  assert_eq!(fetched.created_at, created.created_at);
}

#[tokio::test]
async fn get_commitment_missing_returns_none() {
  let s = store().await;
  assert!(s.get_commitment(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn add_commitment_rejects_empty_title() {
  let s = store().await;
  let mut input = rent(Cycle::Monthly);
  input.title = "".into();
  let err = s.add_commitment(input).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::EmptyTitle)
  ));
}

#[tokio::test]
async fn add_commitment_rejects_out_of_range_custom_cycle() {
  let s = store().await;
  let err = s
    .add_commitment(rent(Cycle::Custom { interval_days: 1 }))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::InvalidCycle(1))
  ));
}

#[tokio::test]
async fn list_commitments_filtered_by_status() {
  let s = store().await;
  let a = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();
  let b = s.add_commitment(rent(Cycle::Weekly)).await.unwrap();
  s.add_commitment(rent(Cycle::Yearly)).await.unwrap();

  s.pause(a.id, Utc::now()).await.unwrap();
  s.archive(b.id, Utc::now()).await.unwrap();

  let all = s.list_commitments(None).await.unwrap();
  assert_eq!(all.len(), 3);

  let active = s.list_commitments(Some(Status::Active)).await.unwrap();
  assert_eq!(active.len(), 1);
  let paused = s.list_commitments(Some(Status::Paused)).await.unwrap();
  assert_eq!(paused.len(), 1);
  assert_eq!(paused[0].id, a.id);
}

// ─── Status transitions ──────────────────────────────────────────────────────

#[tokio::test]
async fn pause_and_resume_persist_status_and_ledger() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Weekly)).await.unwrap();

  let paused_at = Utc::now();
  let paused = s.pause(c.id, paused_at).await.unwrap();
  assert_eq!(paused.status, Status::Paused);
  // Frozen while paused.
  assert_eq!(paused.next_occurrence, c.next_occurrence);

  let resumed_at = paused_at + TimeDelta::days(40);
  let resumed = s.resume(c.id, resumed_at).await.unwrap();
  assert_eq!(resumed.status, Status::Active);
  // Recomputed from the new now, not the stale pre-pause date.
  assert!(resumed.next_occurrence >= resumed_at);

  let fetched = s.get_commitment(c.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::Active);
  assert_eq!(fetched.history.len(), 2);
  assert_eq!(fetched.history.of_kind(ChangeKind::StatusChanged).count(), 2);
}

#[tokio::test]
async fn invalid_transition_is_rejected_and_not_persisted() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Weekly)).await.unwrap();
  s.pause(c.id, Utc::now()).await.unwrap();

  let err = s.pause(c.id, Utc::now()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(tally_core::Error::InvalidTransition {
      from: Status::Paused,
      to:   Status::Paused,
    })
  ));

  let fetched = s.get_commitment(c.id).await.unwrap().unwrap();
  assert_eq!(fetched.status, Status::Paused);
  assert_eq!(fetched.history.len(), 1); // the failed attempt left no row
}

#[tokio::test]
async fn transition_on_missing_commitment_errors() {
  let s = store().await;
  let err = s.archive(Uuid::new_v4(), Utc::now()).await.unwrap_err();
  assert!(matches!(err, crate::Error::CommitmentNotFound(_)));
}

// ─── Field updates ───────────────────────────────────────────────────────────

#[tokio::test]
async fn amount_changes_append_in_order() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();

  let t = Utc::now();
  s.set_amount(c.id, Some("975.00".parse().unwrap()), t)
    .await
    .unwrap();
  s.set_amount(c.id, Some("1000.00".parse().unwrap()), t + TimeDelta::days(1))
    .await
    .unwrap();
  // No-op: same value again, suppressed.
  s.set_amount(c.id, Some("1000.00".parse().unwrap()), t + TimeDelta::days(2))
    .await
    .unwrap();

  let page = s.history(c.id, Some(ChangeKind::AmountChanged)).await.unwrap();
  assert_eq!(page.entries.len(), 2);
  assert_eq!(page.skipped, 0);
  assert_eq!(page.entries[0].previous.as_deref(), Some("950.00"));
  assert_eq!(page.entries[0].new.as_deref(), Some("975.00"));
  assert_eq!(page.entries[1].new.as_deref(), Some("1000.00"));
}

#[tokio::test]
async fn notes_change_survives_round_trip() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();
  s.set_notes(c.id, Some("landlord raised it".into()), Utc::now())
    .await
    .unwrap();

  let fetched = s.get_commitment(c.id).await.unwrap().unwrap();
  assert_eq!(fetched.notes.as_deref(), Some("landlord raised it"));
  assert_eq!(fetched.history.of_kind(ChangeKind::NotesChanged).count(), 1);
}

#[tokio::test]
async fn set_cycle_recomputes_next_occurrence() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();

  let now = Utc::now();
  let updated = s
    .set_cycle(c.id, Cycle::custom(14).unwrap(), now)
    .await
    .unwrap();
  assert_eq!(updated.cycle, Cycle::Custom { interval_days: 14 });
  assert_eq!(updated.start_date, c.start_date); // anchor untouched
  assert!(updated.next_occurrence >= now);
  assert_eq!(
    (updated.next_occurrence - updated.start_date).num_days() % 14,
    0
  );
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_on_missing_commitment_errors() {
  let s = store().await;
  let err = s.history(Uuid::new_v4(), None).await.unwrap_err();
  assert!(matches!(err, crate::Error::CommitmentNotFound(_)));
}

#[tokio::test]
async fn malformed_ledger_rows_are_skipped_not_fatal() {
  let s = store().await;
  let c = s.add_commitment(rent(Cycle::Monthly)).await.unwrap();
  s.set_amount(c.id, Some("1".parse().unwrap()), Utc::now())
    .await
    .unwrap();

  // A row with an unknown kind, as a future (or corrupted) schema might
  // leave behind.
  s.execute_raw(format!(
    "INSERT INTO history (commitment_id, seq, at, kind, previous_value, new_value)
     VALUES ('{}', 99, '2024-01-01T00:00:00+00:00', 'color_changed', NULL, 'red');",
    c.id
  ))
  .await
  .unwrap();

  let page = s.history(c.id, None).await.unwrap();
  assert_eq!(page.entries.len(), 1);
  assert_eq!(page.skipped, 1);

  // Loading the whole commitment still succeeds.
  let fetched = s.get_commitment(c.id).await.unwrap().unwrap();
  assert_eq!(fetched.history.len(), 1);
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fallback_category_is_seeded() {
  let s = store().await;
  let categories = s.list_categories().await.unwrap();
  assert!(categories.iter().any(|c| c.is_fallback()));
}

#[tokio::test]
async fn delete_category_reassigns_to_fallback() {
  let s = store().await;
  let bills = s
    .add_category("Bills".into(), "#ff0000".into())
    .await
    .unwrap();

  let mut input = rent(Cycle::Monthly);
  input.category_id = Some(bills.id);
  let c = s.add_commitment(input).await.unwrap();

  s.delete_category(bills.id).await.unwrap();

  let fallback = s
    .list_categories()
    .await
    .unwrap()
    .into_iter()
    .find(|c| c.is_fallback())
    .unwrap();
  let fetched = s.get_commitment(c.id).await.unwrap().unwrap();
  assert_eq!(fetched.category_id, Some(fallback.id));
}

#[tokio::test]
async fn system_category_cannot_be_deleted() {
  let s = store().await;
  let fallback = s
    .list_categories()
    .await
    .unwrap()
    .into_iter()
    .find(|c| c.is_fallback())
    .unwrap();

  let err = s.delete_category(fallback.id).await.unwrap_err();
  assert!(matches!(err, crate::Error::SystemCategory(_)));

  let err = s.delete_category(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::CategoryNotFound(_)));
}
