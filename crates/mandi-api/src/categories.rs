//! Handlers for a participant's advertised subcategories and categories.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/participants/{id}/subcategories` | Body: `{"subcategories":[{"subcategory_id":1,"custom_price":"12.5","price_unit":"kg"}]}` |
//! | `POST`   | `/participants/{id}/subcategories/remove` | Body: `{"subcategory_ids":[1,2]}` |
//! | `DELETE` | `/participants/{id}/categories/{category_id}` | Cascades to subcategories |

use axum::{
  Json,
  extract::State,
};
use mandi_core::{
  Onboarding,
  membership::{CategoryId, CategoryMembership, SubcategoryAddition, SubcategoryId},
  store::{CacheInvalidator, SubcategoryCatalog},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  OnboardingStore,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

#[derive(Debug, Deserialize)]
pub struct MergeBody {
  pub subcategories: Vec<SubcategoryAddition>,
}

/// `POST /participants/{id}/subcategories`
pub async fn merge<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<MergeBody>,
) -> Result<Json<CategoryMembership>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.merge_subcategories(id, body.subcategories).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveBody {
  pub subcategory_ids: Vec<SubcategoryId>,
}

/// `POST /participants/{id}/subcategories/remove`
pub async fn remove<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<RemoveBody>,
) -> Result<Json<CategoryMembership>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.remove_subcategories(id, body.subcategory_ids).await?))
}

/// `DELETE /participants/{id}/categories/{category_id}`
pub async fn remove_category<S, C, I>(
  State(service): State<Onboarding<S, C, I>>,
  ApiPath((id, category_id)): ApiPath<(Uuid, i64)>,
) -> Result<Json<CategoryMembership>, ApiError>
where
  S: OnboardingStore,
  C: SubcategoryCatalog + 'static,
  I: CacheInvalidator + 'static,
{
  Ok(Json(service.remove_category(id, CategoryId(category_id)).await?))
}
