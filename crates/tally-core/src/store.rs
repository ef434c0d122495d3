//! The `CommitmentStore` trait and supporting read models.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//! Operations that consult the clock take `now` explicitly — the store is
//! the serialization point for mutations, not the source of time.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  category::Category,
  commitment::{Commitment, NewCommitment, Status},
  cycle::Cycle,
  history::{ChangeKind, HistoryEntry},
};

// ─── Read models ─────────────────────────────────────────────────────────────

/// A commitment's ledger as loaded from storage, in insertion order.
///
/// `skipped` counts malformed rows dropped during decode: a bad row is a
/// recoverable warning, never a reason to abort the load, and the rest of
/// the ledger is preserved.
#[derive(Debug, Clone)]
pub struct HistoryPage {
  pub entries: Vec<HistoryEntry>,
  pub skipped: usize,
}

// ─── Error classification ────────────────────────────────────────────────────

/// Coarse classification of a backend error, letting transport layers pick
/// a response without knowing the backend's concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The referenced commitment or category does not exist.
  NotFound,
  /// The operation was understood but refused (e.g. an invalid status
  /// transition, deleting a system category).
  Rejected,
  /// The input itself is invalid (bad cycle interval, empty title).
  Invalid,
  /// Anything else — I/O, corruption, backend internals.
  Backend,
}

/// Implemented by backend error types so callers can classify failures.
pub trait StoreError: std::error::Error {
  fn kind(&self) -> ErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Tally commitment store backend.
///
/// The ledger is append-only: mutations insert new history rows, and no
/// existing row is ever updated or deleted. The store serializes mutations;
/// callers never hold two concurrent writes to the same commitment.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CommitmentStore: Send + Sync {
  type Error: StoreError + Send + Sync + 'static;

  // ── Commitments ───────────────────────────────────────────────────────

  /// Create and persist a new `Active` commitment. The id and creation
  /// timestamp are assigned by the store.
  fn add_commitment(
    &self,
    input: NewCommitment,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// Retrieve a commitment (with its full ledger) by id. Returns `None` if
  /// not found.
  fn get_commitment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Commitment>, Self::Error>> + Send + '_;

  /// List all commitments, optionally filtered by status.
  fn list_commitments(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<Commitment>, Self::Error>> + Send + '_;

  // ── Status transitions ────────────────────────────────────────────────

  /// `Active` → `Paused`; appends a status ledger row.
  fn pause(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// `Paused` → `Active`; recomputes the next occurrence from `now`.
  fn resume(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// `Active` or `Paused` → `Archived`.
  fn archive(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// `Archived` → `Active`; recomputes the next occurrence from `now`.
  fn restore(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  // ── Field updates ─────────────────────────────────────────────────────

  /// Overwrite the amount; appends a ledger row unless the value is
  /// unchanged.
  fn set_amount(
    &self,
    id: Uuid,
    amount: Option<Decimal>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// Overwrite the notes; appends a ledger row unless the value is
  /// unchanged.
  fn set_notes(
    &self,
    id: Uuid,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  /// Replace the cycle and refresh the cached next occurrence. The anchor
  /// is untouched.
  fn set_cycle(
    &self,
    id: Uuid,
    cycle: Cycle,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Commitment, Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  /// The commitment's ledger, optionally filtered by entry kind, in
  /// insertion order, plus the count of malformed rows skipped.
  fn history(
    &self,
    id: Uuid,
    kind: Option<ChangeKind>,
  ) -> impl Future<Output = Result<HistoryPage, Self::Error>> + Send + '_;

  // ── Categories ────────────────────────────────────────────────────────

  /// Create and persist a user category.
  fn add_category(
    &self,
    name: String,
    color: String,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Delete a category and reassign every referencing commitment to the
  /// fallback category. Refuses to delete system categories.
  fn delete_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
