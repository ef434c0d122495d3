//! Handlers for the derived analytics views.
//!
//! Each handler loads the commitments it needs and delegates to the pure
//! functions in [`tally_core::analytics`]; nothing here mutates state.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::{
  analytics::{
    self, Milestone, RelatedGroup, SeasonalDistribution,
  },
  commitment::Commitment,
  store::CommitmentStore,
};
use uuid::Uuid;

use crate::error::ApiError;

async fn load<S>(store: &Arc<S>, id: Uuid) -> Result<Commitment, ApiError>
where
  S: CommitmentStore,
{
  store
    .get_commitment(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("commitment {id} not found")))
}

// ─── Projection ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProjectionParams {
  /// Horizon in calendar months from now.
  pub months: u32,
}

/// `GET /commitments/:id/projection?months=N`
pub async fn projection<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ProjectionParams>,
) -> Result<Json<Vec<DateTime<Utc>>>, ApiError>
where
  S: CommitmentStore,
{
  let commitment = load(&store, id).await?;
  Ok(Json(analytics::project(&commitment, params.months, Utc::now())))
}

// ─── Milestones ──────────────────────────────────────────────────────────────

/// `GET /commitments/:id/milestones`
pub async fn milestones<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Milestone>>, ApiError>
where
  S: CommitmentStore,
{
  let commitment = load(&store, id).await?;
  Ok(Json(analytics::milestones(&commitment, Utc::now())))
}

// ─── Related ─────────────────────────────────────────────────────────────────

/// `GET /commitments/:id/related`
pub async fn related<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RelatedGroup>>, ApiError>
where
  S: CommitmentStore,
{
  let focal = load(&store, id).await?;
  let all = store
    .list_commitments(None)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(analytics::related(&focal, &all)))
}

// ─── Seasonal ────────────────────────────────────────────────────────────────

/// `GET /analytics/seasonal`
pub async fn seasonal<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<SeasonalDistribution>, ApiError>
where
  S: CommitmentStore,
{
  let all = store
    .list_commitments(None)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(analytics::seasonal(&all)))
}
