//! Reviewer actions on a participant's application.

use axum::{
  Json,
  extract::State,
};
use mandi_core::{
  Onboarding,
  onboarding::Profile,
  store::{CacheInvalidator, SubcategoryCatalog},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  OnboardingStore,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `POST /participants/{id}/approve`
pub async fn approve<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.approve_fragment(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub reason: String,
}

/// `POST /participants/{id}/reject`, body: `{"reason":"..."}`
pub async fn reject<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<RejectBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.reject_fragment(id, &body.reason).await?))
}
