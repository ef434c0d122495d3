//! JSON REST API for Tally.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tally_core::store::CommitmentStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod analytics;
pub mod categories;
pub mod commitments;
pub mod error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tally_core::store::CommitmentStore;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// `TALLY_*` environment.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CommitmentStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Commitments
    .route(
      "/commitments",
      get(commitments::list::<S>).post(commitments::create::<S>),
    )
    .route("/commitments/{id}", get(commitments::get_one::<S>))
    // Status transitions
    .route("/commitments/{id}/pause", post(commitments::pause::<S>))
    .route("/commitments/{id}/resume", post(commitments::resume::<S>))
    .route("/commitments/{id}/archive", post(commitments::archive::<S>))
    .route("/commitments/{id}/restore", post(commitments::restore::<S>))
    // Field updates
    .route("/commitments/{id}/amount", post(commitments::set_amount::<S>))
    .route("/commitments/{id}/notes", post(commitments::set_notes::<S>))
    .route("/commitments/{id}/cycle", post(commitments::set_cycle::<S>))
    // Ledger + analytics views
    .route("/commitments/{id}/history", get(commitments::history::<S>))
    .route("/commitments/{id}/projection", get(analytics::projection::<S>))
    .route("/commitments/{id}/milestones", get(analytics::milestones::<S>))
    .route("/commitments/{id}/related", get(analytics::related::<S>))
    .route("/analytics/seasonal", get(analytics::seasonal::<S>))
    // Categories
    .route(
      "/categories",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    .route("/categories/{id}", axum::routing::delete(categories::delete::<S>))
    .with_state(store)
}
