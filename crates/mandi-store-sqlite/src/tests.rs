//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::Utc;
use mandi_core::{
  Onboarding,
  approval::ApprovalStatus,
  fragment::{
    CommonPatch, DeliveryDetails, Fragment, FragmentDetails, FragmentKind,
    FragmentPatch, ShopKind, ShopPatch, VehicleType,
  },
  membership::{
    CategoryId, CategoryMembership, OperatingSubcategory, PriceUnit,
    SubcategoryAddition, SubcategoryId,
  },
  participant::{IdentityPatch, NewParticipant},
  role::{AppTier, Role},
  store::{
    EmailUniquenessChecker, FragmentStore, MembershipStore, NoopInvalidator,
    ParticipantStore, SubcategoryCatalog,
  },
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn participant(s: &SqliteStore, email: Option<&str>) -> Uuid {
  s.create_participant(NewParticipant {
    name:     Some("Asha".into()),
    email:    email.map(Into::into),
    app_tier: AppTier::Current,
  })
  .await
  .unwrap()
  .participant_id
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_batch_runs_only_below_current_version() {
  let s = store().await;
  let id = participant(&s, Some("asha@example.in")).await;

  assert!(!s.init_schema().await.unwrap());
  assert!(s.get_participant(id).await.unwrap().is_some());
}

// ─── Participants ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_participant() {
  let s = store().await;
  let created = s
    .create_participant(NewParticipant {
      name:     None,
      email:    Some("asha@example.in".into()),
      app_tier: AppTier::Legacy,
    })
    .await
    .unwrap();
  assert_eq!(created.role, Role::Unregistered);

  let fetched = s.get_participant(created.participant_id).await.unwrap().unwrap();
  assert_eq!(fetched.participant_id, created.participant_id);
  assert_eq!(fetched.email.as_deref(), Some("asha@example.in"));
  assert_eq!(fetched.role, Role::Unregistered);
  assert_eq!(fetched.app_tier, AppTier::Legacy);
  assert!(fetched.active);
}

#[tokio::test]
async fn get_participant_missing_returns_none() {
  let s = store().await;
  assert!(s.get_participant(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn identity_upsert_keeps_existing_on_blank() {
  let s = store().await;
  let id = participant(&s, Some("asha@example.in")).await;

  s.upsert_identity(id, IdentityPatch {
    name:     Some("  ".into()),
    email:    Some("asha.t@example.in".into()),
    customer: false,
  })
  .await
  .unwrap();

  let p = s.get_participant(id).await.unwrap().unwrap();
  assert_eq!(p.name.as_deref(), Some("Asha"));
  assert_eq!(p.email.as_deref(), Some("asha.t@example.in"));
}

#[tokio::test]
async fn role_codes_round_trip_through_storage() {
  let s = store().await;
  let id = participant(&s, None).await;
  for role in [
    Role::Customer,
    Role::Retailer,
    Role::Wholesaler,
    Role::Combined,
    Role::DeliveryPartner,
  ] {
    s.set_role(id, role, AppTier::Current).await.unwrap();
    assert_eq!(s.get_participant(id).await.unwrap().unwrap().role, role);
  }
}

#[tokio::test]
async fn soft_delete_and_reactivate() {
  let s = store().await;
  let id = participant(&s, Some("asha@example.in")).await;
  s.set_role(id, Role::Retailer, AppTier::Current).await.unwrap();

  s.soft_delete(id).await.unwrap();
  let p = s.get_participant(id).await.unwrap().unwrap();
  assert!(!p.active);
  assert_eq!(p.role, Role::Unregistered);
  assert_eq!(p.email.as_deref(), Some("asha@example.in"));

  s.upsert_identity(id, IdentityPatch::default()).await.unwrap();
  assert!(s.get_participant(id).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn updates_to_missing_participant_fail() {
  let s = store().await;
  let missing = Uuid::new_v4();
  assert!(matches!(
    s.set_role(missing, Role::Retailer, AppTier::Current).await,
    Err(Error::ParticipantNotFound(id)) if id == missing
  ));
  assert!(matches!(
    s.soft_delete(missing).await,
    Err(Error::ParticipantNotFound(_))
  ));
}

// ─── Email uniqueness ────────────────────────────────────────────────────────

#[tokio::test]
async fn email_uniqueness_is_case_insensitive_and_active_only() {
  let s = store().await;
  let owner = participant(&s, Some("Asha@Example.in")).await;
  let other = participant(&s, None).await;

  assert!(s.is_taken_by_other("asha@example.in".into(), other).await.unwrap());
  assert!(!s.is_taken_by_other("asha@example.in".into(), owner).await.unwrap());
  assert!(!s.is_taken_by_other("ravi@example.in".into(), other).await.unwrap());

  s.soft_delete(owner).await.unwrap();
  assert!(!s.is_taken_by_other("asha@example.in".into(), other).await.unwrap());
}

// ─── Fragments ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn fragment_create_get_update() {
  let s = store().await;
  let id = participant(&s, None).await;

  let mut fragment = Fragment::new(id, FragmentKind::Shop, Utc::now());
  fragment.apply(&FragmentPatch::Shop(ShopPatch {
    common: CommonPatch {
      address: Some("4 Station Rd".into()),
      ..Default::default()
    },
    shop_kind: Some(ShopKind::Doorstep),
    ..Default::default()
  }));
  s.create_fragment(fragment.clone()).await.unwrap();

  let fetched = s.get_fragment(id).await.unwrap().unwrap();
  assert!(fetched.same_fields(&fragment));
  assert_eq!(fetched.shop().unwrap().shop_kind, Some(ShopKind::Doorstep));
  assert!(fetched.approval.status.is_none());

  fragment.approval.submit(Utc::now());
  fragment.approval.reject("blurry");
  fragment.active = false;
  s.update_fragment(fragment.clone()).await.unwrap();

  let fetched = s.get_fragment(id).await.unwrap().unwrap();
  assert_eq!(fetched.approval.status, Some(ApprovalStatus::Rejected));
  assert_eq!(fetched.approval.rejection_reason.as_deref(), Some("blurry"));
  assert!(fetched.approval.application_submitted_at.is_some());
  assert!(!fetched.active);
}

#[tokio::test]
async fn delivery_details_survive_storage() {
  let s = store().await;
  let id = participant(&s, None).await;

  let mut fragment = Fragment::new(id, FragmentKind::Delivery, Utc::now());
  fragment.details = FragmentDetails::Delivery(DeliveryDetails {
    vehicle_type:                Some(VehicleType::Bike),
    vehicle_model:               Some("Splendor".into()),
    vehicle_registration_number: Some("MH12AB1234".into()),
    driving_license_url:         None,
  });
  s.create_fragment(fragment.clone()).await.unwrap();

  let fetched = s.get_fragment(id).await.unwrap().unwrap();
  assert_eq!(fetched.details, fragment.details);
}

#[tokio::test]
async fn second_fragment_for_participant_is_refused() {
  let s = store().await;
  let id = participant(&s, None).await;
  s.create_fragment(Fragment::new(id, FragmentKind::Shop, Utc::now()))
    .await
    .unwrap();
  assert!(matches!(
    s.create_fragment(Fragment::new(id, FragmentKind::Delivery, Utc::now())).await,
    Err(Error::Database(_))
  ));
}

#[tokio::test]
async fn update_of_unknown_fragment_fails() {
  let s = store().await;
  let id = participant(&s, None).await;
  let fragment = Fragment::new(id, FragmentKind::Shop, Utc::now());
  assert!(matches!(
    s.update_fragment(fragment).await,
    Err(Error::FragmentNotFound(_))
  ));
}

// ─── Membership and catalog ──────────────────────────────────────────────────

#[tokio::test]
async fn membership_round_trips_prices() {
  let s = store().await;
  let id = participant(&s, None).await;
  assert!(s.get_membership(id).await.unwrap().is_none());

  let membership = CategoryMembership {
    operating_categories:    [CategoryId(1)].into_iter().collect(),
    operating_subcategories: vec![OperatingSubcategory {
      subcategory_id: SubcategoryId(101),
      custom_price:   Some(Decimal::new(1250, 2)),
      price_unit:     Some(PriceUnit::Kg),
      category_id:    Some(CategoryId(1)),
    }],
  };
  s.save_membership(id, membership.clone()).await.unwrap();
  assert_eq!(s.get_membership(id).await.unwrap(), Some(membership));

  s.save_membership(id, CategoryMembership::default()).await.unwrap();
  assert_eq!(s.get_membership(id).await.unwrap(), Some(CategoryMembership::default()));
}

#[tokio::test]
async fn catalog_lookup() {
  let s = store().await;
  s.upsert_subcategory(SubcategoryId(101), CategoryId(1), Some("Copper wire".into()))
    .await
    .unwrap();
  assert_eq!(
    s.resolve_parent_category(SubcategoryId(101)).await.unwrap(),
    Some(CategoryId(1))
  );
  assert_eq!(s.resolve_parent_category(SubcategoryId(999)).await.unwrap(), None);

  s.upsert_subcategory(SubcategoryId(101), CategoryId(4), None).await.unwrap();
  assert_eq!(
    s.resolve_parent_category(SubcategoryId(101)).await.unwrap(),
    Some(CategoryId(4))
  );
}

// ─── Onboarding over SQLite ──────────────────────────────────────────────────

async fn service() -> Onboarding<SqliteStore, SqliteStore> {
  let store = Arc::new(store().await);
  for (sub, cat) in [(101, 1), (102, 1), (201, 2)] {
    store
      .upsert_subcategory(SubcategoryId(sub), CategoryId(cat), None)
      .await
      .unwrap();
  }
  Onboarding::new(store.clone(), store, Arc::new(NoopInvalidator))
}

#[tokio::test]
async fn retail_signup_end_to_end() {
  let svc = service().await;
  let id = svc
    .create_participant(NewParticipant::default())
    .await
    .unwrap()
    .participant
    .participant_id;

  let profile = svc
    .apply_profile_update(
      id,
      IdentityPatch {
        name:     Some("Asha Traders".into()),
        email:    Some("asha@example.in".into()),
        customer: false,
      },
      Some(FragmentPatch::Shop(ShopPatch {
        common: CommonPatch {
          address:               Some("4 Station Rd".into()),
          contact_number:        Some("9000000001".into()),
          identity_document_url: None,
          legal_name:            None,
        },
        ..Default::default()
      })),
    )
    .await
    .unwrap();
  assert_eq!(profile.participant.role, Role::Unregistered);

  let profile = svc
    .apply_profile_update(
      id,
      IdentityPatch::default(),
      Some(FragmentPatch::Shop(ShopPatch {
        common: CommonPatch {
          identity_document_url: Some("s3://docs/a.jpg".into()),
          ..Default::default()
        },
        ..Default::default()
      })),
    )
    .await
    .unwrap();
  assert_eq!(profile.participant.role, Role::Retailer);

  let stored = svc.store().get_fragment(id).await.unwrap().unwrap();
  assert_eq!(stored.approval.status, Some(ApprovalStatus::Pending));
  let p = svc.store().get_participant(id).await.unwrap().unwrap();
  assert_eq!(p.role, Role::Retailer);
}

#[tokio::test]
async fn membership_end_to_end() {
  let svc = service().await;
  let id = svc
    .create_participant(NewParticipant::default())
    .await
    .unwrap()
    .participant
    .participant_id;

  let add = |id: i64| SubcategoryAddition {
    subcategory_id: SubcategoryId(id),
    custom_price:   None,
    price_unit:     None,
  };

  let m = svc
    .merge_subcategories(id, vec![add(101), add(102), add(201), add(999)])
    .await
    .unwrap();
  assert_eq!(m.operating_subcategories.len(), 4);
  assert_eq!(
    m.operating_categories,
    [CategoryId(1), CategoryId(2)].into_iter().collect()
  );

  let m = svc.remove_category(id, CategoryId(1)).await.unwrap();
  let ids: Vec<_> = m.operating_subcategories.iter().map(|s| s.subcategory_id).collect();
  assert_eq!(ids, vec![SubcategoryId(201), SubcategoryId(999)]);
  assert_eq!(m.operating_categories, [CategoryId(2)].into_iter().collect());

  let stored = svc.store().get_membership(id).await.unwrap().unwrap();
  assert_eq!(stored, m);
}
