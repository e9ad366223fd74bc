//! JSON REST API for the mandi onboarding service.
//!
//! Exposes an axum [`Router`] over an [`Onboarding`] service built from any
//! set of collaborators. Auth and TLS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mandi_api::api_router(service.clone()))
//! ```

pub mod categories;
pub mod error;
pub mod extract;
pub mod participants;
pub mod review;

use std::{convert::Infallible, path::PathBuf};

use axum::{
  Router,
  routing::{delete, get, post},
};
use mandi_core::{
  Onboarding,
  store::{
    Backend, CacheInvalidator, EmailUniquenessChecker, FragmentStore,
    MembershipStore, ParticipantStore, SubcategoryCatalog,
  },
  verify::VerifyPolicy,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Read-back bounds for profile writes.
  #[serde(default)]
  pub verify:     VerifyPolicy,
}

// ─── Collaborators ───────────────────────────────────────────────────────────

/// Everything the service needs from its storage backend.
pub trait OnboardingStore:
  ParticipantStore + FragmentStore + MembershipStore + EmailUniquenessChecker + 'static
{
}

impl<T> OnboardingStore for T where
  T: ParticipantStore + FragmentStore + MembershipStore + EmailUniquenessChecker + 'static
{
}

/// Records profile-cache invalidations in the log. For deployments whose
/// cache is fed from the log stream or that run without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInvalidator;

impl Backend for TracingInvalidator {
  type Error = Infallible;
}

impl CacheInvalidator for TracingInvalidator {
  async fn invalidate(&self, participant_id: Uuid) -> Result<(), Infallible> {
    tracing::debug!(%participant_id, "profile cache invalidated");
    Ok(())
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C, I>(service: Onboarding<S, C, I>) -> Router<()>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Router::new()
    // Participants
    .route("/participants", post(participants::create::<S, C, I>))
    .route(
      "/participants/{id}",
      get(participants::get_one::<S, C, I>)
        .patch(participants::update::<S, C, I>)
        .delete(participants::delete::<S, C, I>),
    )
    .route(
      "/participants/{id}/delivery/complete",
      post(participants::complete_delivery::<S, C, I>),
    )
    // Review
    .route("/participants/{id}/approve", post(review::approve::<S, C, I>))
    .route("/participants/{id}/reject", post(review::reject::<S, C, I>))
    // Categories
    .route(
      "/participants/{id}/subcategories",
      post(categories::merge::<S, C, I>),
    )
    .route(
      "/participants/{id}/subcategories/remove",
      post(categories::remove::<S, C, I>),
    )
    .route(
      "/participants/{id}/categories/{category_id}",
      delete(categories::remove_category::<S, C, I>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(service)
}
