//! Handlers for `/categories` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tally_core::{category::Category, store::CommitmentStore};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /categories`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Category>>, ApiError>
where
  S: CommitmentStore,
{
  let categories = store
    .list_categories()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct NewCategoryBody {
  pub name:  String,
  pub color: String,
}

/// `POST /categories` — returns 201 + the stored category.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCategoryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommitmentStore,
{
  let category = store
    .add_category(body.name, body.color)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(category)))
}

/// `DELETE /categories/:id` — reassigns referencing commitments to the
/// fallback category, then deletes. System categories are refused.
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CommitmentStore,
{
  store
    .delete_category(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
