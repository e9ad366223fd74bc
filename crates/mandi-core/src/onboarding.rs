//! [`Onboarding`], the profile transition orchestrator.
//!
//! Every profile mutation runs the same read-modify-write sequence: load,
//! merge, write, re-read until the write is visible, evaluate completeness,
//! and only then advance the role and open the approval record. A write that
//! is not yet visible is treated as "not complete yet"; the next update picks
//! it up.
//!
//! Operations are request-scoped. Concurrent requests for the same
//! participant race at the store with last-write-wins semantics.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  approval::{ApprovalStatus, Submission},
  completeness::{SignupProgress, is_complete, missing_fields},
  fragment::{Fragment, FragmentKind, FragmentPatch},
  membership::{
    CategoryId, CategoryMembership, OperatingSubcategory, SubcategoryAddition,
    SubcategoryId, SubcategoryIndex, resolve_missing, resolve_parents,
  },
  participant::{IdentityPatch, NewParticipant, Participant},
  role::{AppTier, Role, RoleChange, SignupTrack},
  store::{
    CacheInvalidator, EmailUniquenessChecker, FragmentStore, MembershipStore,
    NoopInvalidator, ParticipantStore, SubcategoryCatalog,
  },
  verify::{ReadBack, VerifyPolicy, read_back, write_verified},
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// The assembled read model for a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub participant: Participant,
  pub fragment:    Option<Fragment>,
  pub membership:  CategoryMembership,
  /// Progress through the signup the participant is (or was last) working
  /// on. `None` before any signup has started.
  pub signup:      Option<SignupProgress>,
}

/// Result of [`Onboarding::complete_delivery_signup_manually`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "profile", rename_all = "snake_case")]
pub enum ManualCompletion {
  Completed(Profile),
  /// Nothing changed; the participant was already a delivery partner under
  /// review or approved.
  AlreadyComplete(Profile),
}

/// What [`Onboarding::advance`] changed.
struct Advanced {
  participant: Participant,
  fragment:    Option<Fragment>,
  changed:     bool,
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The onboarding core, generic over its collaborators.
///
/// `S` provides storage, `C` the subcategory catalog, `I` cache invalidation.
pub struct Onboarding<S, C, I = NoopInvalidator> {
  store:       Arc<S>,
  catalog:     Arc<C>,
  invalidator: Arc<I>,
  verify:      VerifyPolicy,
}

impl<S, C, I> Clone for Onboarding<S, C, I> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      catalog:     Arc::clone(&self.catalog),
      invalidator: Arc::clone(&self.invalidator),
      verify:      self.verify,
    }
  }
}

impl<S, C, I> Onboarding<S, C, I>
where
  S: ParticipantStore
    + FragmentStore
    + MembershipStore
    + EmailUniquenessChecker,
  C: SubcategoryCatalog,
  I: CacheInvalidator,
{
  pub fn new(store: Arc<S>, catalog: Arc<C>, invalidator: Arc<I>) -> Self {
    Self { store, catalog, invalidator, verify: VerifyPolicy::default() }
  }

  pub fn with_verify_policy(mut self, verify: VerifyPolicy) -> Self {
    self.verify = verify;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Participants ──────────────────────────────────────────────────────────

  pub async fn create_participant(&self, input: NewParticipant) -> Result<Profile> {
    if let Some(email) = input.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    {
      self.ensure_email_free(email, Uuid::nil()).await?;
    }
    let participant = self
      .store
      .create_participant(input)
      .await
      .map_err(Error::storage)?;
    tracing::info!(participant_id = %participant.participant_id, "participant created");
    Ok(assemble(participant, None, CategoryMembership::default()))
  }

  pub async fn get_profile(&self, participant_id: Uuid) -> Result<Profile> {
    let participant = self.load_participant(participant_id).await?;
    let fragment = self
      .store
      .get_fragment(participant_id)
      .await
      .map_err(Error::storage)?;
    let membership = self.load_membership(participant_id).await?;
    Ok(assemble(participant, fragment, membership))
  }

  /// Merge a partial profile update and advance the role when the signup it
  /// belongs to becomes complete.
  ///
  /// An incomplete profile is the ordinary partial-signup path and returns
  /// the updated view, not an error.
  pub async fn apply_profile_update(
    &self,
    participant_id: Uuid,
    identity: IdentityPatch,
    patch: Option<FragmentPatch>,
  ) -> Result<Profile> {
    let participant = self.load_participant(participant_id).await?;

    if let Some(email) = identity.email() {
      self.ensure_email_free(email, participant_id).await?;
    }
    if let Some(FragmentPatch::Shop(shop)) = &patch
      && let Some(track) = shop.track
      && !matches!(track, SignupTrack::Retail | SignupTrack::Wholesale)
    {
      return Err(Error::Validation(format!(
        "{track:?} is not a shop signup"
      )));
    }

    let existing = self
      .store
      .get_fragment(participant_id)
      .await
      .map_err(Error::storage)?;
    if let (Some(patch), Some(existing)) = (&patch, &existing)
      && patch.kind() != existing.kind()
    {
      return Err(Error::Validation(format!(
        "participant already has a {} profile",
        existing.kind()
      )));
    }

    // Identity.
    let (participant, identity_visible) =
      if !identity.is_empty() || !participant.active {
        self.write_identity(participant, identity.clone()).await?
      } else {
        (participant, true)
      };

    // Fragment. Reactivating the account brings an inactive fragment back
    // even when the update carries no fragment fields.
    let (fragment, fragment_visible) = match (&patch, existing) {
      (Some(patch), existing) => self.write_fragment(participant_id, existing, patch).await?,
      (None, Some(fragment)) if !fragment.active => {
        self.reactivate_fragment(fragment).await?
      }
      (None, existing) => (existing, true),
    };

    let membership = self.load_membership(participant_id).await?;

    let Some(track) = update_track(&participant, fragment.as_ref(), &identity, patch.as_ref())
    else {
      self.invalidate(participant_id).await;
      return Ok(assemble(participant, fragment, membership));
    };

    if !(identity_visible && fragment_visible) {
      tracing::debug!(
        %participant_id,
        "profile write not yet visible; deferring completeness check"
      );
      self.invalidate(participant_id).await;
      return Ok(assemble_for(participant, fragment, membership, Some(track)));
    }

    if !is_complete(track.target_role(), &participant, fragment.as_ref()) {
      self.invalidate(participant_id).await;
      return Ok(assemble_for(participant, fragment, membership, Some(track)));
    }

    let advanced = self.advance(participant, fragment, track).await?;
    self.invalidate(participant_id).await;
    Ok(assemble_for(
      advanced.participant,
      advanced.fragment,
      membership,
      Some(track),
    ))
  }

  /// Re-run completeness and approval for a delivery signup without a new
  /// patch. Nothing changing is reported as
  /// [`ManualCompletion::AlreadyComplete`], not as an error. Deleted accounts
  /// are refused with [`Error::Validation`].
  pub async fn complete_delivery_signup_manually(
    &self,
    participant_id: Uuid,
  ) -> Result<ManualCompletion> {
    let participant = self.load_participant(participant_id).await?;
    if !participant.active {
      return Err(Error::Validation(
        "account is deleted; a profile update reactivates it".into(),
      ));
    }
    let fragment = self
      .store
      .get_fragment(participant_id)
      .await
      .map_err(Error::storage)?
      .filter(|f| f.kind() == FragmentKind::Delivery)
      .ok_or(Error::FragmentNotFound {
        participant_id,
        kind: FragmentKind::Delivery,
      })?;
    let membership = self.load_membership(participant_id).await?;

    // A rejected application falls through and is resubmitted.
    if participant.role == Role::DeliveryPartner
      && matches!(
        fragment.approval.status,
        Some(ApprovalStatus::Pending | ApprovalStatus::Approved)
      )
    {
      return Ok(ManualCompletion::AlreadyComplete(assemble(
        participant,
        Some(fragment),
        membership,
      )));
    }

    let missing = missing_fields(Role::DeliveryPartner, &participant, Some(&fragment));
    if !missing.is_empty() {
      return Err(Error::IncompleteSignup { role: Role::DeliveryPartner, missing });
    }

    let advanced = self
      .advance(participant, Some(fragment), SignupTrack::Delivery)
      .await?;
    self.invalidate(participant_id).await;
    let profile = assemble(advanced.participant, advanced.fragment, membership);
    Ok(if advanced.changed {
      ManualCompletion::Completed(profile)
    } else {
      ManualCompletion::AlreadyComplete(profile)
    })
  }

  /// Soft-delete the account: role back to `Unregistered`, participant and
  /// fragment inactive. Historical data is kept.
  pub async fn delete_account(&self, participant_id: Uuid) -> Result<()> {
    self.load_participant(participant_id).await?;
    self
      .store
      .soft_delete(participant_id)
      .await
      .map_err(Error::storage)?;

    let fragment = self
      .store
      .get_fragment(participant_id)
      .await
      .map_err(Error::storage)?;
    if let Some(mut fragment) = fragment.filter(|f| f.active) {
      fragment.active = false;
      self
        .store
        .update_fragment(fragment)
        .await
        .map_err(Error::storage)?;
    }

    tracing::info!(%participant_id, "account deleted");
    self.invalidate(participant_id).await;
    Ok(())
  }

  // ── Reviewer actions ──────────────────────────────────────────────────────

  /// Approve the participant's application. No completeness precondition.
  pub async fn approve_fragment(&self, participant_id: Uuid) -> Result<Profile> {
    self
      .review(participant_id, |fragment| {
        fragment.approval.approve(Utc::now());
      })
      .await
  }

  /// Reject the participant's application with a reviewer-supplied reason.
  pub async fn reject_fragment(
    &self,
    participant_id: Uuid,
    reason: &str,
  ) -> Result<Profile> {
    let reason = reason.trim();
    if reason.is_empty() {
      return Err(Error::Validation("a rejection reason is required".into()));
    }
    self
      .review(participant_id, |fragment| fragment.approval.reject(reason))
      .await
  }

  async fn review(
    &self,
    participant_id: Uuid,
    decide: impl FnOnce(&mut Fragment),
  ) -> Result<Profile> {
    let participant = self.load_participant(participant_id).await?;
    let mut fragment = self
      .store
      .get_fragment(participant_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::FragmentNotFound {
        participant_id,
        kind: participant.role.fragment_kind().unwrap_or(FragmentKind::Shop),
      })?;

    let before = fragment.approval.status;
    decide(&mut fragment);
    self
      .store
      .update_fragment(fragment.clone())
      .await
      .map_err(Error::storage)?;
    tracing::info!(
      %participant_id,
      from = ?before,
      to = ?fragment.approval.status,
      "application reviewed"
    );

    self.invalidate(participant_id).await;
    let membership = self.load_membership(participant_id).await?;
    Ok(assemble(participant, Some(fragment), membership))
  }

  // ── Category membership ───────────────────────────────────────────────────

  /// Add or overwrite subcategories and recompute the category set.
  /// Applying the same additions twice yields the same state.
  pub async fn merge_subcategories(
    &self,
    participant_id: Uuid,
    additions: Vec<SubcategoryAddition>,
  ) -> Result<CategoryMembership> {
    for addition in &additions {
      addition.validate()?;
    }
    let mut index = self.load_index(participant_id).await?;

    let ids: Vec<SubcategoryId> = additions.iter().map(|a| a.subcategory_id).collect();
    let parents = resolve_parents(self.catalog.as_ref(), &ids).await;
    for (addition, parent) in additions.into_iter().zip(parents) {
      let cached = index
        .get(addition.subcategory_id)
        .and_then(|e| e.category_id);
      index.upsert(OperatingSubcategory {
        subcategory_id: addition.subcategory_id,
        custom_price:   addition.custom_price,
        price_unit:     addition.price_unit,
        category_id:    parent.or(cached),
      });
    }

    self.commit_index(participant_id, index).await
  }

  /// Drop subcategories by id. Unknown ids are ignored.
  pub async fn remove_subcategories(
    &self,
    participant_id: Uuid,
    subcategory_ids: Vec<SubcategoryId>,
  ) -> Result<CategoryMembership> {
    let drop: HashSet<SubcategoryId> = subcategory_ids.into_iter().collect();
    let mut index = self.load_index(participant_id).await?;
    index.retain(|e| !drop.contains(&e.subcategory_id));
    self.commit_index(participant_id, index).await
  }

  /// Drop a category and every subcategory whose parent resolves to it.
  pub async fn remove_category(
    &self,
    participant_id: Uuid,
    category_id: CategoryId,
  ) -> Result<CategoryMembership> {
    let mut index = self.load_index(participant_id).await?;
    resolve_missing(self.catalog.as_ref(), &mut index).await;
    index.retain(|e| e.category_id != Some(category_id));
    self.commit_index(participant_id, index).await
  }

  async fn load_index(&self, participant_id: Uuid) -> Result<SubcategoryIndex> {
    self.load_participant(participant_id).await?;
    let current = self.load_membership(participant_id).await?;
    Ok(SubcategoryIndex::new(current.operating_subcategories))
  }

  async fn commit_index(
    &self,
    participant_id: Uuid,
    mut index: SubcategoryIndex,
  ) -> Result<CategoryMembership> {
    resolve_missing(self.catalog.as_ref(), &mut index).await;
    let membership = index.into_membership();
    self
      .store
      .save_membership(participant_id, membership.clone())
      .await
      .map_err(Error::storage)?;
    tracing::debug!(
      %participant_id,
      subcategories = membership.operating_subcategories.len(),
      categories = membership.operating_categories.len(),
      "category membership saved"
    );
    self.invalidate(participant_id).await;
    Ok(membership)
  }

  // ── Transition helpers ────────────────────────────────────────────────────

  /// Apply the upgrade rule and open/advance the approval record for a
  /// complete signup.
  async fn advance(
    &self,
    mut participant: Participant,
    mut fragment: Option<Fragment>,
    track: SignupTrack,
  ) -> Result<Advanced> {
    let participant_id = participant.participant_id;
    let new_role = match participant.role.after_signup(track) {
      RoleChange::Advance(role) => role,
      RoleChange::Unchanged => participant.role,
      RoleChange::Incompatible => {
        tracing::warn!(
          %participant_id,
          role = ?participant.role,
          ?track,
          "completed signup cannot be combined with current role"
        );
        return Ok(Advanced { participant, fragment, changed: false });
      }
    };

    let mut changed = false;
    if new_role != participant.role || participant.app_tier == AppTier::Legacy {
      self
        .store
        .set_role(participant_id, new_role, AppTier::Current)
        .await
        .map_err(Error::storage)?;
      tracing::info!(
        %participant_id,
        from = ?participant.role,
        to = ?new_role,
        tier_upgraded = participant.app_tier == AppTier::Legacy,
        "role advanced"
      );
      participant.role = new_role;
      participant.app_tier = AppTier::Current;
      changed = true;
    }

    if let Some(f) = fragment.as_mut().filter(|_| track != SignupTrack::Customer) {
      match f.approval.submit(Utc::now()) {
        Submission::Unchanged => {}
        submission => {
          self
            .store
            .update_fragment(f.clone())
            .await
            .map_err(Error::storage)?;
          tracing::info!(%participant_id, ?submission, "application submitted for review");
          changed = true;
        }
      }
    }

    Ok(Advanced { participant, fragment, changed })
  }

  async fn write_identity(
    &self,
    participant: Participant,
    identity: IdentityPatch,
  ) -> Result<(Participant, bool)> {
    let id = participant.participant_id;
    let name = identity.name().map(str::to_owned);
    let email = identity.email().map(str::to_owned);

    let read = write_verified(
      &self.verify,
      self.store.upsert_identity(id, identity),
      || self.store.get_participant(id),
      |p: &Participant| {
        p.active
          && name.as_ref().is_none_or(|n| p.name.as_ref() == Some(n))
          && email.as_ref().is_none_or(|e| p.email.as_ref() == Some(e))
      },
    )
    .await
    .map_err(Error::storage)?;

    let visible = read.is_confirmed();
    Ok((read.into_inner().unwrap_or(participant), visible))
  }

  async fn write_fragment(
    &self,
    participant_id: Uuid,
    existing: Option<Fragment>,
    patch: &FragmentPatch,
  ) -> Result<(Option<Fragment>, bool)> {
    let expected = match existing {
      Some(mut fragment) => {
        fragment.apply(patch);
        self
          .store
          .update_fragment(fragment.clone())
          .await
          .map_err(Error::storage)?;
        fragment
      }
      None => {
        let mut fragment = Fragment::new(participant_id, patch.kind(), Utc::now());
        fragment.apply(patch);
        let created = self
          .store
          .create_fragment(fragment)
          .await
          .map_err(Error::storage)?;
        tracing::info!(
          %participant_id,
          kind = %created.kind(),
          "profile fragment created"
        );
        created
      }
    };

    self.confirm_fragment(expected).await
  }

  async fn reactivate_fragment(
    &self,
    mut fragment: Fragment,
  ) -> Result<(Option<Fragment>, bool)> {
    fragment.active = true;
    self
      .store
      .update_fragment(fragment.clone())
      .await
      .map_err(Error::storage)?;
    tracing::info!(
      participant_id = %fragment.participant_id,
      kind = %fragment.kind(),
      "profile fragment reactivated"
    );
    self.confirm_fragment(fragment).await
  }

  /// Re-read the fragment until it matches `expected` or the policy gives up.
  async fn confirm_fragment(&self, expected: Fragment) -> Result<(Option<Fragment>, bool)> {
    let participant_id = expected.participant_id;
    let read = read_back(
      &self.verify,
      || self.store.get_fragment(participant_id),
      |f: &Fragment| f.same_fields(&expected),
    )
    .await
    .map_err(Error::storage)?;

    let visible = read.is_confirmed();
    Ok((read.into_inner(), visible))
  }

  // ── Loads ─────────────────────────────────────────────────────────────────

  async fn load_participant(&self, participant_id: Uuid) -> Result<Participant> {
    self
      .store
      .get_participant(participant_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::ParticipantNotFound(participant_id))
  }

  async fn load_membership(&self, participant_id: Uuid) -> Result<CategoryMembership> {
    Ok(
      self
        .store
        .get_membership(participant_id)
        .await
        .map_err(Error::storage)?
        .unwrap_or_default(),
    )
  }

  async fn ensure_email_free(&self, email: &str, participant_id: Uuid) -> Result<()> {
    let taken = self
      .store
      .is_taken_by_other(email.to_owned(), participant_id)
      .await
      .map_err(Error::storage)?;
    if taken {
      return Err(Error::EmailConflict(email.to_owned()));
    }
    Ok(())
  }

  async fn invalidate(&self, participant_id: Uuid) {
    if let Err(e) = self.invalidator.invalidate(participant_id).await {
      tracing::warn!(%participant_id, error = %e, "cache invalidation failed");
    }
  }
}

// ─── Track resolution ────────────────────────────────────────────────────────

/// The signup an update is working towards, if any.
fn update_track(
  participant: &Participant,
  fragment: Option<&Fragment>,
  identity: &IdentityPatch,
  patch: Option<&FragmentPatch>,
) -> Option<SignupTrack> {
  match patch {
    Some(FragmentPatch::Shop(shop)) => Some(
      shop
        .track
        .or(shop.shop_kind.map(|k| k.track()))
        .unwrap_or_else(|| shop_track(participant.role, fragment)),
    ),
    Some(FragmentPatch::Delivery(_)) => Some(SignupTrack::Delivery),
    None if identity.customer && fragment.is_none() => Some(SignupTrack::Customer),
    None => current_track(participant.role, fragment),
  }
}

/// The signup implied by what is already stored.
fn current_track(role: Role, fragment: Option<&Fragment>) -> Option<SignupTrack> {
  match fragment {
    Some(f) if f.kind() == FragmentKind::Delivery => Some(SignupTrack::Delivery),
    Some(f) => Some(shop_track(role, Some(f))),
    None if role == Role::Customer => Some(SignupTrack::Customer),
    None => None,
  }
}

fn shop_track(role: Role, fragment: Option<&Fragment>) -> SignupTrack {
  fragment
    .and_then(Fragment::shop)
    .and_then(|s| s.shop_kind)
    .map(|k| k.track())
    .unwrap_or(if role == Role::Wholesaler {
      SignupTrack::Wholesale
    } else {
      SignupTrack::Retail
    })
}

fn assemble(
  participant: Participant,
  fragment: Option<Fragment>,
  membership: CategoryMembership,
) -> Profile {
  let track = current_track(participant.role, fragment.as_ref());
  assemble_for(participant, fragment, membership, track)
}

fn assemble_for(
  participant: Participant,
  fragment: Option<Fragment>,
  membership: CategoryMembership,
  track: Option<SignupTrack>,
) -> Profile {
  let signup =
    track.map(|t| SignupProgress::evaluate(t, &participant, fragment.as_ref()));
  Profile { participant, fragment, membership, signup }
}
