//! Collaborator traits consumed by the onboarding service.
//!
//! Storage backends (e.g. `mandi-store-sqlite`) implement these. Every trait
//! shares the [`Backend`] supertrait so one type can implement several of them
//! with a single error type.
//!
//! All methods return `Send` futures so the service can be driven from
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{convert::Infallible, future::Future};

use uuid::Uuid;

use crate::{
  fragment::Fragment,
  membership::{CategoryId, CategoryMembership, SubcategoryId},
  participant::{IdentityPatch, NewParticipant, Participant},
  role::{AppTier, Role},
};

/// The error type shared by a backend's collaborator impls.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Participants ────────────────────────────────────────────────────────────

pub trait ParticipantStore: Backend {
  /// Persist a new `Unregistered`, active participant.
  fn create_participant(
    &self,
    input: NewParticipant,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + '_;

  /// Returns `None` if no participant has this id.
  fn get_participant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + '_;

  /// Write the non-blank identity fields of `patch` and mark the participant
  /// active.
  fn upsert_identity(
    &self,
    id: Uuid,
    patch: IdentityPatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_role(
    &self,
    id: Uuid,
    role: Role,
    tier: AppTier,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark the participant inactive and reset its role to `Unregistered`.
  /// No data is erased.
  fn soft_delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Fragments ───────────────────────────────────────────────────────────────

pub trait FragmentStore: Backend {
  fn get_fragment(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<Fragment>, Self::Error>> + Send + '_;

  fn create_fragment(
    &self,
    fragment: Fragment,
  ) -> impl Future<Output = Result<Fragment, Self::Error>> + Send + '_;

  /// Overwrite every mutable column of the fragment with `fragment.fragment_id`.
  fn update_fragment(
    &self,
    fragment: Fragment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Category membership ─────────────────────────────────────────────────────

pub trait MembershipStore: Backend {
  /// Returns `None` when the participant never advertised anything.
  fn get_membership(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<CategoryMembership>, Self::Error>>
  + Send
  + '_;

  /// Persist the subcategory list and category set as one write.
  fn save_membership(
    &self,
    participant_id: Uuid,
    membership: CategoryMembership,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

pub trait SubcategoryCatalog: Backend {
  /// `Ok(None)` for ids the catalog does not know.
  fn resolve_parent_category(
    &self,
    subcategory_id: SubcategoryId,
  ) -> impl Future<Output = Result<Option<CategoryId>, Self::Error>> + Send + '_;
}

// ─── Side channels ───────────────────────────────────────────────────────────

pub trait EmailUniquenessChecker: Backend {
  /// Whether an active participant other than `excluding` uses `email`.
  fn is_taken_by_other(
    &self,
    email: String,
    excluding: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// Fire-and-forget cache invalidation. Failures are logged by the caller and
/// never fail the owning operation.
pub trait CacheInvalidator: Backend {
  fn invalidate(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// A [`CacheInvalidator`] for deployments without a profile cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl Backend for NoopInvalidator {
  type Error = Infallible;
}

impl CacheInvalidator for NoopInvalidator {
  async fn invalidate(&self, _participant_id: Uuid) -> Result<(), Infallible> {
    Ok(())
  }
}
