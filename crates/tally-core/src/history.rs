//! The append-only change ledger attached to each commitment.
//!
//! Entries are immutable once appended; nothing is ever edited or removed.
//! Insertion order is chronological order — entries are appended
//! synchronously on mutation, and no two writers share a commitment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── ChangeKind ──────────────────────────────────────────────────────────────

/// Which mutable field a ledger entry records a change to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  AmountChanged,
  NotesChanged,
  StatusChanged,
}

impl ChangeKind {
  /// The discriminant string stored in the `kind` database column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::AmountChanged => "amount_changed",
      Self::NotesChanged => "notes_changed",
      Self::StatusChanged => "status_changed",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    match s {
      "amount_changed" => Some(Self::AmountChanged),
      "notes_changed" => Some(Self::NotesChanged),
      "status_changed" => Some(Self::StatusChanged),
      _ => None,
    }
  }
}

// ─── HistoryEntry ────────────────────────────────────────────────────────────

/// One immutable record of a field change. Old and new values are carried in
/// serialized form so the ledger can outlive changes to the field types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub at:       DateTime<Utc>,
  pub kind:     ChangeKind,
  pub previous: Option<String>,
  pub new:      Option<String>,
}

// ─── History ─────────────────────────────────────────────────────────────────

/// The append-only ledger. Supports `O(1)` amortized appends and lazy,
/// restartable per-kind iteration in insertion order. Any descending sort
/// for display is the view layer's business, not the ledger's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
  entries: Vec<HistoryEntry>,
}

impl History {
  pub fn new() -> Self { Self::default() }

  /// Rebuild a ledger from entries already in insertion order (loading
  /// from storage).
  pub fn from_entries(entries: Vec<HistoryEntry>) -> Self { Self { entries } }

  pub fn append(&mut self, entry: HistoryEntry) { self.entries.push(entry); }

  pub fn entries(&self) -> &[HistoryEntry] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Entries of one kind, lazily, in insertion order. The iterator borrows
  /// the ledger and can be restarted by calling again.
  pub fn of_kind(
    &self,
    kind: ChangeKind,
  ) -> impl Iterator<Item = &HistoryEntry> + '_ {
    self.entries.iter().filter(move |e| e.kind == kind)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
