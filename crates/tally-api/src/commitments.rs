//! Handlers for `/commitments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/commitments` | optional `?status=active\|paused\|archived` |
//! | `POST` | `/commitments` | Body: [`NewCommitmentBody`]; returns 201 |
//! | `GET`  | `/commitments/:id` | Single commitment with its ledger |
//! | `POST` | `/commitments/:id/pause` | — |
//! | `POST` | `/commitments/:id/resume` | — |
//! | `POST` | `/commitments/:id/archive` | — |
//! | `POST` | `/commitments/:id/restore` | — |
//! | `POST` | `/commitments/:id/amount` | Body: `{"amount":"12.50"}` or null |
//! | `POST` | `/commitments/:id/notes` | Body: `{"notes":"..."}` or null |
//! | `POST` | `/commitments/:id/cycle` | Body: `{"cycle":{"kind":"weekly"}}` |
//! | `GET`  | `/commitments/:id/history` | optional `?kind=amount_changed` |
//!
//! The clock enters here: every mutating handler stamps `Utc::now()` and
//! hands it down as the engine's explicit `now`.

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::{
  commitment::{Commitment, Currency, NewCommitment, Status},
  cycle::Cycle,
  history::{ChangeKind, HistoryEntry},
  store::CommitmentStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<Status>,
}

/// `GET /commitments[?status=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Commitment>>, ApiError>
where
  S: CommitmentStore,
{
  let commitments = store
    .list_commitments(params.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(commitments))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /commitments/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let commitment = store
    .get_commitment(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("commitment {id} not found")))?;
  Ok(Json(commitment))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /commitments`.
#[derive(Debug, Deserialize)]
pub struct NewCommitmentBody {
  pub title:       String,
  pub start_date:  DateTime<Utc>,
  pub cycle:       Cycle,
  pub amount:      Option<Decimal>,
  pub currency:    Option<Currency>,
  pub notes:       Option<String>,
  #[serde(default)]
  pub tags:        BTreeSet<String>,
  pub category_id: Option<Uuid>,
}

impl From<NewCommitmentBody> for NewCommitment {
  fn from(b: NewCommitmentBody) -> Self {
    NewCommitment {
      title:       b.title,
      start_date:  b.start_date,
      cycle:       b.cycle,
      amount:      b.amount,
      currency:    b.currency.unwrap_or_default(),
      notes:       b.notes,
      tags:        b.tags,
      category_id: b.category_id,
    }
  }
}

/// `POST /commitments` — returns 201 + the stored commitment.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCommitmentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommitmentStore,
{
  let commitment = store
    .add_commitment(NewCommitment::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(commitment)))
}

// ─── Status transitions ──────────────────────────────────────────────────────

/// `POST /commitments/:id/pause`
pub async fn pause<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store.pause(id, Utc::now()).await.map_err(ApiError::from_store)?;
  Ok(Json(c))
}

/// `POST /commitments/:id/resume`
pub async fn resume<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store.resume(id, Utc::now()).await.map_err(ApiError::from_store)?;
  Ok(Json(c))
}

/// `POST /commitments/:id/archive`
pub async fn archive<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store.archive(id, Utc::now()).await.map_err(ApiError::from_store)?;
  Ok(Json(c))
}

/// `POST /commitments/:id/restore`
pub async fn restore<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store.restore(id, Utc::now()).await.map_err(ApiError::from_store)?;
  Ok(Json(c))
}

// ─── Field updates ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AmountBody {
  pub amount: Option<Decimal>,
}

/// `POST /commitments/:id/amount`
pub async fn set_amount<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AmountBody>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store
    .set_amount(id, body.amount, Utc::now())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(c))
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
  pub notes: Option<String>,
}

/// `POST /commitments/:id/notes`
pub async fn set_notes<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NotesBody>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store
    .set_notes(id, body.notes, Utc::now())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(c))
}

#[derive(Debug, Deserialize)]
pub struct CycleBody {
  pub cycle: Cycle,
}

/// `POST /commitments/:id/cycle`
pub async fn set_cycle<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CycleBody>,
) -> Result<Json<Commitment>, ApiError>
where
  S: CommitmentStore,
{
  let c = store
    .set_cycle(id, body.cycle, Utc::now())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(c))
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  /// If set, restrict to one entry kind (e.g. `amount_changed`).
  pub kind: Option<ChangeKind>,
}

/// Response body for `GET /commitments/:id/history`.
///
/// Entries come newest-first for display; the underlying ledger stays in
/// insertion order.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
  pub entries: Vec<HistoryEntry>,
  /// Malformed ledger rows skipped during decode — surfaced so clients can
  /// warn, never a reason to fail the request.
  pub skipped: usize,
}

/// `GET /commitments/:id/history[?kind=...]`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError>
where
  S: CommitmentStore,
{
  let page = store
    .history(id, params.kind)
    .await
    .map_err(ApiError::from_store)?;

  let mut entries = page.entries;
  entries.sort_by(|a, b| b.at.cmp(&a.at));

  Ok(Json(HistoryResponse { entries, skipped: page.skipped }))
}
