//! Role registry: the closed set of participant roles, the fields each role
//! requires, and the legal edges between roles.
//!
//! Roles are persisted as the short codes used by the surrounding system
//! (`"N"`, `"R"`, `"S"`, `"SR"`, `"D"`, `"C"`). The codes only exist at the
//! storage boundary; everything in this crate works with [`Role`].

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::fragment::FragmentKind;

// ─── Roles ───────────────────────────────────────────────────────────────────

/// The role a participant currently holds.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  /// Staging state; the only role allowed an incomplete profile.
  #[strum(serialize = "N")]
  Unregistered,
  #[strum(serialize = "C")]
  Customer,
  /// B2C vendor.
  #[strum(serialize = "R")]
  Retailer,
  /// B2B vendor.
  #[strum(serialize = "S")]
  Wholesaler,
  /// Completed both the B2B and the B2C signup.
  #[strum(serialize = "SR")]
  Combined,
  #[strum(serialize = "D")]
  DeliveryPartner,
}

/// Which client generation the participant signed up with.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
pub enum AppTier {
  #[strum(serialize = "v1")]
  Legacy,
  #[default]
  #[strum(serialize = "v2")]
  Current,
}

impl AppTier {
  pub fn code(self) -> &'static str { self.into() }
}

/// The signup flow a participant is completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupTrack {
  Customer,
  /// B2C shop signup.
  Retail,
  /// B2B shop signup.
  Wholesale,
  Delivery,
}

impl SignupTrack {
  /// The role a participant holding no other role would receive.
  pub fn target_role(self) -> Role {
    match self {
      Self::Customer => Role::Customer,
      Self::Retail => Role::Retailer,
      Self::Wholesale => Role::Wholesaler,
      Self::Delivery => Role::DeliveryPartner,
    }
  }
}

/// Outcome of applying a completed signup to the current role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
  Advance(Role),
  Unchanged,
  /// The completed signup cannot be combined with the current role.
  Incompatible,
}

impl Role {
  pub fn code(self) -> &'static str { self.into() }

  /// Every role except [`Role::Unregistered`] is terminal.
  pub fn is_terminal(self) -> bool { self != Self::Unregistered }

  pub fn is_vendor(self) -> bool {
    matches!(self, Self::Retailer | Self::Wholesaler | Self::Combined)
  }

  /// The profile fragment this role is backed by, if any.
  pub fn fragment_kind(self) -> Option<FragmentKind> {
    match self {
      Self::Retailer | Self::Wholesaler | Self::Combined => {
        Some(FragmentKind::Shop)
      }
      Self::DeliveryPartner => Some(FragmentKind::Delivery),
      Self::Unregistered | Self::Customer => None,
    }
  }

  pub fn required_fields(self) -> FieldSpec {
    match self {
      Self::Unregistered => FieldSpec::NONE,
      Self::Customer => FieldSpec::CUSTOMER,
      Self::Retailer | Self::Wholesaler | Self::Combined => FieldSpec::SHOP,
      Self::DeliveryPartner => FieldSpec::DELIVERY,
    }
  }

  /// The transition table. Deletion resets any terminal role.
  pub fn can_transition_to(self, to: Role) -> bool {
    use Role::*;
    match (self, to) {
      (Unregistered, Customer | Retailer | Wholesaler | DeliveryPartner) => true,
      (Customer, Retailer | Wholesaler | DeliveryPartner) => true,
      (Retailer | Wholesaler, Combined) => true,
      (from, Unregistered) => from.is_terminal(),
      _ => false,
    }
  }

  /// Apply the upgrade rule for a participant who just completed `track`.
  ///
  /// A B2C vendor completing the B2B signup (or the reverse) becomes
  /// [`Role::Combined`] instead of losing the first role.
  pub fn after_signup(self, track: SignupTrack) -> RoleChange {
    use Role::*;
    let change = match (self, track.target_role()) {
      (current, target) if current == target => RoleChange::Unchanged,
      (Unregistered | Customer, target) => RoleChange::Advance(target),
      (Retailer, Wholesaler) | (Wholesaler, Retailer) => {
        RoleChange::Advance(Combined)
      }
      (Combined, Retailer | Wholesaler) => RoleChange::Unchanged,
      (_, Customer) => RoleChange::Unchanged,
      _ => RoleChange::Incompatible,
    };
    if let RoleChange::Advance(to) = change {
      debug_assert!(self.can_transition_to(to), "{self:?} -> {to:?}");
    }
    change
  }
}

// ─── Required fields ─────────────────────────────────────────────────────────

/// A field the completeness evaluator may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
  Name,
  Email,
  Address,
  ContactNumber,
  IdentityDocument,
  VehicleModel,
  VehicleRegistrationNumber,
  DrivingLicense,
}

/// The fields a role requires before its signup counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub always:    &'static [RequiredField],
  /// Required only for motorised vehicles; cycles carry no registration or
  /// licence.
  pub motorised: &'static [RequiredField],
}

impl FieldSpec {
  pub const NONE: Self = Self { always: &[], motorised: &[] };

  pub const CUSTOMER: Self = Self {
    always:    &[RequiredField::Name, RequiredField::Email],
    motorised: &[],
  };

  pub const SHOP: Self = Self {
    always:    &[
      RequiredField::Name,
      RequiredField::Email,
      RequiredField::Address,
      RequiredField::ContactNumber,
      RequiredField::IdentityDocument,
    ],
    motorised: &[],
  };

  pub const DELIVERY: Self = Self {
    always:    Self::SHOP.always,
    motorised: &[
      RequiredField::VehicleModel,
      RequiredField::VehicleRegistrationNumber,
      RequiredField::DrivingLicense,
    ],
  };

  /// The effective field list, honouring the cycle exemption.
  pub fn fields(&self, cycle: bool) -> impl Iterator<Item = RequiredField> {
    let motorised: &'static [RequiredField] =
      if cycle { &[] } else { self.motorised };
    self.always.iter().chain(motorised).copied()
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn only_unregistered_is_staging() {
    for role in Role::iter() {
      assert_eq!(role.is_terminal(), role != Role::Unregistered, "{role:?}");
    }
  }

  #[test]
  fn combined_regardless_of_order() {
    let b2c_first = Role::Unregistered.after_signup(SignupTrack::Retail);
    assert_eq!(b2c_first, RoleChange::Advance(Role::Retailer));
    assert_eq!(
      Role::Retailer.after_signup(SignupTrack::Wholesale),
      RoleChange::Advance(Role::Combined)
    );

    let b2b_first = Role::Unregistered.after_signup(SignupTrack::Wholesale);
    assert_eq!(b2b_first, RoleChange::Advance(Role::Wholesaler));
    assert_eq!(
      Role::Wholesaler.after_signup(SignupTrack::Retail),
      RoleChange::Advance(Role::Combined)
    );
  }

  #[test]
  fn combined_never_downgrades() {
    assert_eq!(
      Role::Combined.after_signup(SignupTrack::Retail),
      RoleChange::Unchanged
    );
    assert_eq!(
      Role::Combined.after_signup(SignupTrack::Wholesale),
      RoleChange::Unchanged
    );
  }

  #[test]
  fn delivery_does_not_combine_with_shop_roles() {
    assert_eq!(
      Role::DeliveryPartner.after_signup(SignupTrack::Retail),
      RoleChange::Incompatible
    );
    assert_eq!(
      Role::Wholesaler.after_signup(SignupTrack::Delivery),
      RoleChange::Incompatible
    );
  }

  #[test]
  fn every_advance_is_a_legal_edge() {
    let tracks = [
      SignupTrack::Customer,
      SignupTrack::Retail,
      SignupTrack::Wholesale,
      SignupTrack::Delivery,
    ];
    for role in Role::iter() {
      for track in tracks {
        if let RoleChange::Advance(to) = role.after_signup(track) {
          assert!(role.can_transition_to(to), "{role:?} -> {to:?}");
        }
      }
    }
  }

  #[test]
  fn deletion_edge_exists_for_terminal_roles_only() {
    for role in Role::iter() {
      assert_eq!(
        role.can_transition_to(Role::Unregistered),
        role.is_terminal()
      );
    }
  }

  #[test]
  fn codes_parse_back() {
    assert_eq!(Role::Combined.code(), "SR");
    assert_eq!(Role::from_str("D").unwrap(), Role::DeliveryPartner);
    assert!(Role::from_str("X").is_err());
    assert_eq!(AppTier::from_str("v1").unwrap(), AppTier::Legacy);
  }

  #[test]
  fn cycle_exemption_drops_vehicle_fields() {
    let motor: Vec<_> = FieldSpec::DELIVERY.fields(false).collect();
    let cycle: Vec<_> = FieldSpec::DELIVERY.fields(true).collect();
    assert_eq!(motor.len(), 8);
    assert_eq!(cycle, FieldSpec::SHOP.always);
  }
}
