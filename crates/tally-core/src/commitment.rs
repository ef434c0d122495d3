//! The commitment aggregate and its status state machine.
//!
//! A commitment owns its ledger exclusively. Every mutation happens through
//! an explicit operation that validates the state machine, updates the
//! field, and appends a ledger entry where the field is tracked (amount,
//! notes, status). Side effects never leave the aggregate.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  cycle::{Cycle, next_occurrence},
  history::{ChangeKind, History, HistoryEntry},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The lifecycle status. Exactly one holds at any time; `Archived` is
/// re-enterable, there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Active,
  Paused,
  Archived,
}

impl Status {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }

  /// The discriminant string stored in the `status` database column and in
  /// `status_changed` ledger entries.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Paused => "paused",
      Self::Archived => "archived",
    }
  }

  pub fn from_str_opt(s: &str) -> Option<Self> {
    match s {
      "active" => Some(Self::Active),
      "paused" => Some(Self::Paused),
      "archived" => Some(Self::Archived),
      _ => None,
    }
  }

  /// The transition graph: Active → {Paused, Archived},
  /// Paused → {Active, Archived}, Archived → {Active}.
  fn permits(self, to: Status) -> bool {
    matches!(
      (self, to),
      (Self::Active, Self::Paused)
        | (Self::Active, Self::Archived)
        | (Self::Paused, Self::Active)
        | (Self::Paused, Self::Archived)
        | (Self::Archived, Self::Active)
    )
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Currency ────────────────────────────────────────────────────────────────

/// An ISO-4217-like currency code, or the catch-all sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
  #[default]
  Other,
  Code(String),
}

impl Currency {
  pub fn code(&self) -> Option<&str> {
    match self {
      Self::Other => None,
      Self::Code(c) => Some(c),
    }
  }
}

// ─── NewCommitment ───────────────────────────────────────────────────────────

/// Input to [`crate::store::CommitmentStore::add_commitment`].
/// The id, creation timestamp, and initial status are assigned by the engine.
#[derive(Debug, Clone)]
pub struct NewCommitment {
  pub title:       String,
  pub start_date:  DateTime<Utc>,
  pub cycle:       Cycle,
  pub amount:      Option<Decimal>,
  pub currency:    Currency,
  pub notes:       Option<String>,
  pub tags:        BTreeSet<String>,
  pub category_id: Option<Uuid>,
}

impl NewCommitment {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(
    title: impl Into<String>,
    start_date: DateTime<Utc>,
    cycle: Cycle,
  ) -> Self {
    Self {
      title: title.into(),
      start_date,
      cycle,
      amount: None,
      currency: Currency::default(),
      notes: None,
      tags: BTreeSet::new(),
      category_id: None,
    }
  }
}

// ─── Commitment ──────────────────────────────────────────────────────────────

/// A recurring commitment: identity, schedule, current status, and the
/// append-only ledger of its changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
  pub id:              Uuid,
  pub title:           String,
  /// The schedule anchor; every occurrence is this plus whole periods.
  pub start_date:      DateTime<Utc>,
  pub cycle:           Cycle,
  pub status:          Status,
  /// Cached next due date. Derived, never the source of truth: always
  /// recomputable from `start_date` + `cycle` + a reference time, and
  /// refreshed by every operation that could stale it.
  pub next_occurrence: DateTime<Utc>,
  pub amount:          Option<Decimal>,
  pub currency:        Currency,
  pub notes:           Option<String>,
  /// Insertion order irrelevant; a `BTreeSet` keeps enumeration stable.
  pub tags:            BTreeSet<String>,
  /// Weak reference to a category. A dangling id resolves to the fallback
  /// category (see [`crate::category::resolve_category`]).
  pub category_id:     Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub history:         History,
}

impl Commitment {
  /// Build a new `Active` commitment. `now` seeds both `created_at` and
  /// the first next-occurrence computation.
  pub fn create(
    id: Uuid,
    input: NewCommitment,
    now: DateTime<Utc>,
  ) -> Result<Self> {
    if input.title.trim().is_empty() {
      return Err(Error::EmptyTitle);
    }
    input.cycle.validate()?;

    Ok(Self {
      id,
      title: input.title,
      start_date: input.start_date,
      cycle: input.cycle,
      status: Status::Active,
      next_occurrence: next_occurrence(input.start_date, input.cycle, now),
      amount: input.amount,
      currency: input.currency,
      notes: input.notes,
      tags: input.tags,
      category_id: input.category_id,
      created_at: now,
      history: History::new(),
    })
  }

  // ── Status transitions ──────────────────────────────────────────────────

  /// `Active` → `Paused`. The cached next occurrence is frozen while
  /// paused; [`Commitment::resume`] recomputes it.
  pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.transition(Status::Paused, now)
  }

  /// `Paused` → `Active`. Recomputes the next occurrence from `now`, so a
  /// long-paused commitment resumes from the present rather than a stale
  /// pre-pause date.
  pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
    if self.status != Status::Paused {
      return Err(Error::InvalidTransition {
        from: self.status,
        to:   Status::Active,
      });
    }
    self.transition(Status::Active, now)?;
    self.refresh_next_occurrence(now);
    Ok(())
  }

  /// `Active` or `Paused` → `Archived`.
  pub fn archive(&mut self, now: DateTime<Utc>) -> Result<()> {
    self.transition(Status::Archived, now)
  }

  /// `Archived` → `Active`. Like [`Commitment::resume`], recomputes the
  /// next occurrence from `now`.
  pub fn restore(&mut self, now: DateTime<Utc>) -> Result<()> {
    if self.status != Status::Archived {
      return Err(Error::InvalidTransition {
        from: self.status,
        to:   Status::Active,
      });
    }
    self.transition(Status::Active, now)?;
    self.refresh_next_occurrence(now);
    Ok(())
  }

  fn transition(&mut self, to: Status, now: DateTime<Utc>) -> Result<()> {
    if !self.status.permits(to) {
      return Err(Error::InvalidTransition { from: self.status, to });
    }
    let previous = self.status;
    self.status = to;
    self.history.append(HistoryEntry {
      at:       now,
      kind:     ChangeKind::StatusChanged,
      previous: Some(previous.as_str().to_owned()),
      new:      Some(to.as_str().to_owned()),
    });
    Ok(())
  }

  // ── Field changes ───────────────────────────────────────────────────────

  /// Overwrite the amount, permitted in any status. Setting the identical
  /// value is suppressed rather than recorded, keeping the ledger
  /// meaningful.
  pub fn change_amount(&mut self, amount: Option<Decimal>, now: DateTime<Utc>) {
    if self.amount == amount {
      return;
    }
    self.history.append(HistoryEntry {
      at:       now,
      kind:     ChangeKind::AmountChanged,
      previous: self.amount.map(|a| a.to_string()),
      new:      amount.map(|a| a.to_string()),
    });
    self.amount = amount;
  }

  /// Overwrite the notes, permitted in any status. No-ops are suppressed.
  pub fn change_notes(&mut self, notes: Option<String>, now: DateTime<Utc>) {
    if self.notes == notes {
      return;
    }
    self.history.append(HistoryEntry {
      at:       now,
      kind:     ChangeKind::NotesChanged,
      previous: self.notes.take(),
      new:      notes.clone(),
    });
    self.notes = notes;
  }

  /// Replace the cycle, permitted in any status. The anchor is unchanged;
  /// the cached next occurrence is recomputed from it and `now`.
  pub fn reschedule(&mut self, cycle: Cycle, now: DateTime<Utc>) -> Result<()> {
    cycle.validate()?;
    self.cycle = cycle;
    self.refresh_next_occurrence(now);
    Ok(())
  }

  fn refresh_next_occurrence(&mut self, now: DateTime<Utc>) {
    self.next_occurrence = next_occurrence(self.start_date, self.cycle, now);
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
  }

  fn commitment(cycle: Cycle) -> Commitment {
    Commitment::create(
      Uuid::new_v4(),
      NewCommitment::new("Rent", utc(2024, 1, 31), cycle),
      utc(2024, 2, 1),
    )
    .unwrap()
  }

  #[test]
  fn create_computes_next_occurrence() {
    // Jan 31 monthly anchor seen from Feb 1 of a leap year.
    let c = commitment(Cycle::Monthly);
    assert_eq!(c.status, Status::Active);
    assert_eq!(c.next_occurrence, utc(2024, 2, 29));
    assert!(c.history.is_empty());
  }

  #[test]
  fn create_rejects_empty_title() {
    let err = Commitment::create(
      Uuid::new_v4(),
      NewCommitment::new("  ", utc(2024, 1, 1), Cycle::Weekly),
      utc(2024, 1, 1),
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptyTitle));
  }

  #[test]
  fn pause_only_from_active() {
    let mut c = commitment(Cycle::Weekly);
    c.pause(utc(2024, 2, 2)).unwrap();
    assert_eq!(c.status, Status::Paused);

    let err = c.pause(utc(2024, 2, 3)).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: Status::Paused, to: Status::Paused }
    ));
  }

  #[test]
  fn pause_freezes_next_occurrence() {
    let mut c = commitment(Cycle::Weekly);
    let frozen = c.next_occurrence;
    c.pause(utc(2024, 3, 1)).unwrap();
    assert_eq!(c.next_occurrence, frozen);
  }

  #[test]
  fn resume_recomputes_from_now() {
    // Pause, then resume 40 days later.
    let mut c = commitment(Cycle::Weekly);
    c.pause(utc(2024, 2, 2)).unwrap();
    let resumed_at = utc(2024, 2, 2) + TimeDelta::days(40);
    c.resume(resumed_at).unwrap();

    assert_eq!(c.status, Status::Active);
    assert!(c.next_occurrence >= resumed_at);
    assert_eq!((c.next_occurrence - c.start_date).num_days() % 7, 0);
  }

  #[test]
  fn resume_from_archived_is_invalid() {
    let mut c = commitment(Cycle::Weekly);
    c.archive(utc(2024, 2, 2)).unwrap();
    let err = c.resume(utc(2024, 2, 3)).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: Status::Archived, to: Status::Active }
    ));
  }

  #[test]
  fn archive_from_active_and_paused() {
    let mut a = commitment(Cycle::Weekly);
    a.archive(utc(2024, 2, 2)).unwrap();
    assert_eq!(a.status, Status::Archived);

    let mut p = commitment(Cycle::Weekly);
    p.pause(utc(2024, 2, 2)).unwrap();
    p.archive(utc(2024, 2, 3)).unwrap();
    assert_eq!(p.status, Status::Archived);

    // Archived is not re-archivable.
    let err = a.archive(utc(2024, 2, 4)).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  #[test]
  fn restore_unarchives_and_recomputes() {
    let mut c = commitment(Cycle::Monthly);
    c.archive(utc(2024, 2, 2)).unwrap();
    c.restore(utc(2024, 5, 10)).unwrap();
    assert_eq!(c.status, Status::Active);
    assert_eq!(c.next_occurrence, utc(2024, 5, 31));

    let err = c.restore(utc(2024, 5, 11)).unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: Status::Active, to: Status::Active }
    ));
  }

  #[test]
  fn transitions_append_status_entries() {
    let mut c = commitment(Cycle::Weekly);
    c.pause(utc(2024, 2, 2)).unwrap();
    c.resume(utc(2024, 2, 3)).unwrap();
    c.archive(utc(2024, 2, 4)).unwrap();

    let entries: Vec<_> =
      c.history.of_kind(ChangeKind::StatusChanged).collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].previous.as_deref(), Some("active"));
    assert_eq!(entries[0].new.as_deref(), Some("paused"));
    assert_eq!(entries[2].new.as_deref(), Some("archived"));
  }

  #[test]
  fn amount_change_records_old_and_new() {
    let mut c = commitment(Cycle::Monthly);
    c.change_amount(Some("12.50".parse().unwrap()), utc(2024, 2, 2));
    c.change_amount(Some("15.00".parse().unwrap()), utc(2024, 2, 3));

    let entries: Vec<_> =
      c.history.of_kind(ChangeKind::AmountChanged).collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].previous, None);
    assert_eq!(entries[0].new.as_deref(), Some("12.50"));
    assert_eq!(entries[1].previous.as_deref(), Some("12.50"));
    assert_eq!(entries[1].new.as_deref(), Some("15.00"));
  }

  #[test]
  fn identical_value_changes_are_suppressed() {
    let mut c = commitment(Cycle::Monthly);
    c.change_amount(Some("9.99".parse().unwrap()), utc(2024, 2, 2));
    c.change_amount(Some("9.99".parse().unwrap()), utc(2024, 2, 3));
    c.change_notes(None, utc(2024, 2, 4));
    assert_eq!(c.history.len(), 1);
  }

  #[test]
  fn field_changes_allowed_while_archived() {
    let mut c = commitment(Cycle::Monthly);
    c.archive(utc(2024, 2, 2)).unwrap();
    c.change_notes(Some("cancel next year".into()), utc(2024, 2, 3));
    c.change_amount(Some("5".parse().unwrap()), utc(2024, 2, 4));
    assert_eq!(c.history.len(), 3); // one status + two field entries
  }

  #[test]
  fn reschedule_keeps_anchor() {
    let mut c = commitment(Cycle::Monthly);
    let anchor = c.start_date;
    c.reschedule(Cycle::custom(14).unwrap(), utc(2024, 2, 10)).unwrap();
    assert_eq!(c.start_date, anchor);
    assert_eq!(c.next_occurrence, utc(2024, 2, 14));

    let err = c
      .reschedule(Cycle::Custom { interval_days: 400 }, utc(2024, 2, 10))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidCycle(400)));
    // A rejected cycle leaves the commitment untouched.
    assert_eq!(c.cycle, Cycle::Custom { interval_days: 14 });
  }

  #[test]
  fn ledger_entry_count_matches_mutations() {
    let mut c = commitment(Cycle::Weekly);
    c.change_amount(Some("1".parse().unwrap()), utc(2024, 2, 2));
    c.change_notes(Some("a".into()), utc(2024, 2, 3));
    c.pause(utc(2024, 2, 4)).unwrap();
    c.resume(utc(2024, 2, 5)).unwrap();

    assert_eq!(c.history.len(), 4);
    let times: Vec<_> = c.history.entries().iter().map(|e| e.at).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
  }
}
