//! Signup completeness evaluator.
//!
//! A pure function of the field snapshot it is handed: no clock, no storage,
//! no randomness. The onboarding service always feeds it freshly re-read
//! values, never the pre-write in-memory copy.

use serde::{Deserialize, Serialize};

use crate::{
  fragment::Fragment,
  participant::Participant,
  role::{RequiredField, Role, SignupTrack},
};

/// The fields required by `role` that are blank in the snapshot, in
/// declaration order.
pub fn missing_fields(
  role: Role,
  participant: &Participant,
  fragment: Option<&Fragment>,
) -> Vec<RequiredField> {
  let cycle = fragment
    .and_then(Fragment::delivery)
    .is_some_and(|d| d.is_cycle());

  role
    .required_fields()
    .fields(cycle)
    .filter(|field| !is_present(*field, participant, fragment))
    .collect()
}

pub fn is_complete(
  role: Role,
  participant: &Participant,
  fragment: Option<&Fragment>,
) -> bool {
  missing_fields(role, participant, fragment).is_empty()
}

fn is_present(
  field: RequiredField,
  participant: &Participant,
  fragment: Option<&Fragment>,
) -> bool {
  let delivery = fragment.and_then(Fragment::delivery);
  match field {
    RequiredField::Name => filled(participant.name.as_deref()),
    RequiredField::Email => participant.email.as_deref().is_some_and(is_valid_email),
    RequiredField::Address => filled(fragment.and_then(|f| f.address.as_deref())),
    RequiredField::ContactNumber => {
      filled(fragment.and_then(|f| f.contact_number.as_deref()))
    }
    RequiredField::IdentityDocument => {
      filled(fragment.and_then(|f| f.identity_document_url.as_deref()))
    }
    RequiredField::VehicleModel => {
      filled(delivery.and_then(|d| d.vehicle_model.as_deref()))
    }
    RequiredField::VehicleRegistrationNumber => {
      filled(delivery.and_then(|d| d.vehicle_registration_number.as_deref()))
    }
    RequiredField::DrivingLicense => {
      filled(delivery.and_then(|d| d.driving_license_url.as_deref()))
    }
  }
}

fn filled(value: Option<&str>) -> bool {
  value.is_some_and(|v| !v.trim().is_empty())
}

/// Syntactic `local@domain.tld` check. No MX or deliverability lookup.
pub fn is_valid_email(email: &str) -> bool {
  let email = email.trim();
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  let Some((host, tld)) = domain.rsplit_once('.') else {
    return false;
  };
  !host.is_empty()
    && !host.starts_with('.')
    && !host.ends_with('.')
    && tld.len() >= 2
    && tld.chars().all(|c| c.is_ascii_alphabetic())
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// How far a participant is through a signup; returned with every profile
/// read so clients can show "n of m fields present".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupProgress {
  pub track:       SignupTrack,
  pub target_role: Role,
  pub required:    usize,
  pub present:     usize,
  pub missing:     Vec<RequiredField>,
  pub complete:    bool,
}

impl SignupProgress {
  pub fn evaluate(
    track: SignupTrack,
    participant: &Participant,
    fragment: Option<&Fragment>,
  ) -> Self {
    let target_role = track.target_role();
    let cycle = fragment
      .and_then(Fragment::delivery)
      .is_some_and(|d| d.is_cycle());
    let required = target_role.required_fields().fields(cycle).count();
    let missing = missing_fields(target_role, participant, fragment);
    Self {
      track,
      target_role,
      required,
      present: required - missing.len(),
      complete: missing.is_empty(),
      missing,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::{
    fragment::{
      CommonPatch, DeliveryPatch, FragmentKind, FragmentPatch, VehicleType,
    },
    role::AppTier,
  };

  fn participant(name: Option<&str>, email: Option<&str>) -> Participant {
    Participant {
      participant_id: Uuid::new_v4(),
      name:           name.map(Into::into),
      email:          email.map(Into::into),
      role:           Role::Unregistered,
      app_tier:       AppTier::Current,
      active:         true,
      created_at:     Utc::now(),
    }
  }

  fn common(identity_doc: Option<&str>) -> CommonPatch {
    CommonPatch {
      legal_name:            None,
      address:               Some("4 Station Rd, Pune".into()),
      contact_number:        Some("9000000001".into()),
      identity_document_url: identity_doc.map(Into::into),
    }
  }

  fn delivery(patch: DeliveryPatch) -> Fragment {
    let mut f = Fragment::new(Uuid::nil(), FragmentKind::Delivery, Utc::now());
    f.apply(&FragmentPatch::Delivery(patch));
    f
  }

  #[test]
  fn email_pattern() {
    assert!(is_valid_email("asha@example.in"));
    assert!(is_valid_email("  a.b+c@mail.example.com "));
    assert!(!is_valid_email("asha"));
    assert!(!is_valid_email("asha@example"));
    assert!(!is_valid_email("@example.com"));
    assert!(!is_valid_email("a@@example.com"));
    assert!(!is_valid_email("a b@example.com"));
    assert!(!is_valid_email("a@.com"));
    assert!(!is_valid_email("a@example.c0m"));
  }

  #[test]
  fn shop_requires_identity_document() {
    let p = participant(Some("Asha"), Some("asha@example.in"));
    let mut f = Fragment::new(Uuid::nil(), FragmentKind::Shop, Utc::now());
    f.apply(&FragmentPatch::Shop(crate::fragment::ShopPatch {
      common: common(None),
      ..Default::default()
    }));

    assert_eq!(
      missing_fields(Role::Retailer, &p, Some(&f)),
      vec![RequiredField::IdentityDocument]
    );

    f.identity_document_url = Some("s3://docs/aadhar.jpg".into());
    assert!(is_complete(Role::Retailer, &p, Some(&f)));
    assert!(is_complete(Role::Wholesaler, &p, Some(&f)));
    assert!(is_complete(Role::Combined, &p, Some(&f)));
  }

  #[test]
  fn invalid_email_counts_as_missing() {
    let p = participant(Some("Asha"), Some("not-an-email"));
    assert_eq!(
      missing_fields(Role::Customer, &p, None),
      vec![RequiredField::Email]
    );
  }

  #[test]
  fn whitespace_name_counts_as_missing() {
    let p = participant(Some("   "), Some("asha@example.in"));
    assert!(!is_complete(Role::Customer, &p, None));
  }

  #[test]
  fn cycle_needs_no_vehicle_paperwork() {
    let p = participant(Some("Ravi"), Some("ravi@example.in"));
    let f = delivery(DeliveryPatch {
      common: common(Some("s3://docs/ravi.jpg")),
      vehicle_type: Some(VehicleType::Cycle),
      ..Default::default()
    });
    assert!(is_complete(Role::DeliveryPartner, &p, Some(&f)));
  }

  #[test]
  fn motorbike_needs_registration_and_licence() {
    let p = participant(Some("Ravi"), Some("ravi@example.in"));
    let mut f = delivery(DeliveryPatch {
      common: common(Some("s3://docs/ravi.jpg")),
      vehicle_type: Some(VehicleType::Bike),
      vehicle_model: Some("Splendor".into()),
      ..Default::default()
    });
    assert_eq!(
      missing_fields(Role::DeliveryPartner, &p, Some(&f)),
      vec![
        RequiredField::VehicleRegistrationNumber,
        RequiredField::DrivingLicense
      ]
    );

    f.apply(&FragmentPatch::Delivery(DeliveryPatch {
      vehicle_registration_number: Some("MH12AB1234".into()),
      driving_license_url: Some("s3://docs/dl.jpg".into()),
      ..Default::default()
    }));
    assert!(is_complete(Role::DeliveryPartner, &p, Some(&f)));
  }

  #[test]
  fn evaluation_is_repeatable() {
    let p = participant(Some("Ravi"), Some("ravi@example.in"));
    let f = delivery(DeliveryPatch {
      common: common(None),
      ..Default::default()
    });
    let first = missing_fields(Role::DeliveryPartner, &p, Some(&f));
    for _ in 0..10 {
      assert_eq!(missing_fields(Role::DeliveryPartner, &p, Some(&f)), first);
    }
  }

  #[test]
  fn progress_counts_present_fields() {
    let p = participant(Some("Asha"), Some("asha@example.in"));
    let mut f = Fragment::new(Uuid::nil(), FragmentKind::Shop, Utc::now());
    f.address = Some("4 Station Rd".into());
    f.contact_number = Some("9000000001".into());

    let progress = SignupProgress::evaluate(SignupTrack::Retail, &p, Some(&f));
    assert_eq!(progress.target_role, Role::Retailer);
    assert_eq!(progress.required, 5);
    assert_eq!(progress.present, 4);
    assert_eq!(progress.missing, vec![RequiredField::IdentityDocument]);
    assert!(!progress.complete);
  }

  #[test]
  fn unregistered_requires_nothing() {
    let p = participant(None, None);
    assert!(is_complete(Role::Unregistered, &p, None));
  }
}
