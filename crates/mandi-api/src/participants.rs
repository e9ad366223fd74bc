//! Handlers for `/participants` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/participants` | Body: `{"name":..,"email":..,"app_tier":"current"}`, all optional |
//! | `GET`    | `/participants/{id}` | Assembled profile view |
//! | `PATCH`  | `/participants/{id}` | Body: `{"identity":{..},"fragment":{"kind":"shop",..}}` |
//! | `DELETE` | `/participants/{id}` | Soft delete; `204` |
//! | `POST`   | `/participants/{id}/delivery/complete` | Manual delivery completion |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use mandi_core::{
  Onboarding,
  fragment::FragmentPatch,
  onboarding::{ManualCompletion, Profile},
  participant::{IdentityPatch, NewParticipant},
  store::{CacheInvalidator, SubcategoryCatalog},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  OnboardingStore,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /participants`
pub async fn create<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiJson(body): ApiJson<NewParticipant>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  let profile = service.create_participant(body).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /participants/{id}`
pub async fn get_one<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.get_profile(id).await?))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(default)]
  pub identity: IdentityPatch,
  pub fragment: Option<FragmentPatch>,
}

/// `PATCH /participants/{id}`
///
/// An incomplete profile is not an error; the response carries the signup
/// progress instead.
pub async fn update<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<UpdateBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  let profile = service
    .apply_profile_update(id, body.identity, body.fragment)
    .await?;
  Ok(Json(profile))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /participants/{id}`
pub async fn delete<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  service.delete_account(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Manual delivery completion ──────────────────────────────────────────────

/// `POST /participants/{id}/delivery/complete`
pub async fn complete_delivery<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ManualCompletion>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.complete_delivery_signup_manually(id).await?))
}
