//! Profile fragments: the role-specific extension attached to a participant.
//!
//! A participant owns at most one fragment: a shop record (retailer,
//! wholesaler, combined) or a delivery record. Fragments are created lazily on
//! the first update that references them and are never deleted, only marked
//! inactive. Their `approval` block is owned by [`crate::approval`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{approval::Approval, role::SignupTrack};

// ─── Categorical codes ───────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FragmentKind {
  Shop,
  Delivery,
}

/// What sort of business a shop runs. Decides which signup a shop patch
/// completes when the caller does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopKind {
  /// B2C collector visiting customers at their door.
  Doorstep,
  /// B2C walk-in shop.
  Retail,
  /// B2B industrial buyer.
  Industrial,
  /// B2B wholesaler.
  Wholesale,
}

impl ShopKind {
  pub fn track(self) -> SignupTrack {
    match self {
      Self::Doorstep | Self::Retail => SignupTrack::Retail,
      Self::Industrial | Self::Wholesale => SignupTrack::Wholesale,
    }
  }

  /// Integer code stored in the `shop_type` column.
  pub fn code(self) -> i64 {
    match self {
      Self::Industrial => 1,
      Self::Doorstep => 2,
      Self::Retail => 3,
      Self::Wholesale => 4,
    }
  }

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      1 => Some(Self::Industrial),
      2 => Some(Self::Doorstep),
      3 => Some(Self::Retail),
      4 => Some(Self::Wholesale),
      _ => None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VehicleType {
  Cycle,
  Bike,
  Auto,
  Van,
  Truck,
}

// ─── Fragment ────────────────────────────────────────────────────────────────

/// Fields only shop fragments carry. The document URLs are B2B-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopDetails {
  pub shop_kind:           Option<ShopKind>,
  pub company_name:        Option<String>,
  pub tax_id:              Option<String>,
  pub license_url:         Option<String>,
  pub tax_certificate_url: Option<String>,
  pub address_proof_url:   Option<String>,
  pub owner_kyc_url:       Option<String>,
}

/// Fields only delivery fragments carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
  pub vehicle_type:                Option<VehicleType>,
  pub vehicle_model:               Option<String>,
  pub vehicle_registration_number: Option<String>,
  pub driving_license_url:         Option<String>,
}

impl DeliveryDetails {
  pub fn is_cycle(&self) -> bool {
    self.vehicle_type == Some(VehicleType::Cycle)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FragmentDetails {
  Shop(ShopDetails),
  Delivery(DeliveryDetails),
}

impl FragmentDetails {
  pub fn kind(&self) -> FragmentKind {
    match self {
      Self::Shop(_) => FragmentKind::Shop,
      Self::Delivery(_) => FragmentKind::Delivery,
    }
  }
}

/// A persisted shop or delivery record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
  pub fragment_id:           Uuid,
  pub participant_id:        Uuid,
  pub legal_name:            Option<String>,
  pub address:               Option<String>,
  pub contact_number:        Option<String>,
  /// Aadhaar card or an equivalent government identity document.
  pub identity_document_url: Option<String>,
  pub details:               FragmentDetails,
  pub approval:              Approval,
  /// Soft-delete flag; cleared when the owning account is deleted.
  pub active:                bool,
  pub created_at:            DateTime<Utc>,
}

impl Fragment {
  /// An empty fragment of `kind`, not yet persisted.
  pub fn new(participant_id: Uuid, kind: FragmentKind, now: DateTime<Utc>) -> Self {
    let details = match kind {
      FragmentKind::Shop => FragmentDetails::Shop(ShopDetails::default()),
      FragmentKind::Delivery => {
        FragmentDetails::Delivery(DeliveryDetails::default())
      }
    };
    Self {
      fragment_id: Uuid::new_v4(),
      participant_id,
      legal_name: None,
      address: None,
      contact_number: None,
      identity_document_url: None,
      details,
      approval: Approval::default(),
      active: true,
      created_at: now,
    }
  }

  pub fn kind(&self) -> FragmentKind { self.details.kind() }

  pub fn shop(&self) -> Option<&ShopDetails> {
    match &self.details {
      FragmentDetails::Shop(s) => Some(s),
      FragmentDetails::Delivery(_) => None,
    }
  }

  pub fn delivery(&self) -> Option<&DeliveryDetails> {
    match &self.details {
      FragmentDetails::Delivery(d) => Some(d),
      FragmentDetails::Shop(_) => None,
    }
  }

  /// Merge the non-blank fields of `patch`. Returns `false` (and leaves the
  /// fragment untouched) when the patch is for the other fragment kind.
  pub fn apply(&mut self, patch: &FragmentPatch) -> bool {
    match (&mut self.details, patch) {
      (FragmentDetails::Shop(s), FragmentPatch::Shop(p)) => {
        // The stored kind fixes the shop's primary track. A kind from the
        // other track only completes a second signup.
        if let Some(kind) = p.shop_kind
          && s.shop_kind.is_none_or(|k| k.track() == kind.track())
        {
          s.shop_kind = Some(kind);
        }
        merge_text(&mut s.company_name, p.company_name.as_deref());
        merge_text(&mut s.tax_id, p.tax_id.as_deref());
        merge_text(&mut s.license_url, p.license_url.as_deref());
        merge_text(&mut s.tax_certificate_url, p.tax_certificate_url.as_deref());
        merge_text(&mut s.address_proof_url, p.address_proof_url.as_deref());
        merge_text(&mut s.owner_kyc_url, p.owner_kyc_url.as_deref());
      }
      (FragmentDetails::Delivery(d), FragmentPatch::Delivery(p)) => {
        if let Some(vehicle) = p.vehicle_type {
          d.vehicle_type = Some(vehicle);
        }
        merge_text(&mut d.vehicle_model, p.vehicle_model.as_deref());
        merge_text(
          &mut d.vehicle_registration_number,
          p.vehicle_registration_number.as_deref(),
        );
        merge_text(&mut d.driving_license_url, p.driving_license_url.as_deref());
      }
      _ => return false,
    }

    let common = patch.common();
    merge_text(&mut self.legal_name, common.legal_name.as_deref());
    merge_text(&mut self.address, common.address.as_deref());
    merge_text(&mut self.contact_number, common.contact_number.as_deref());
    merge_text(
      &mut self.identity_document_url,
      common.identity_document_url.as_deref(),
    );
    self.active = true;
    true
  }

  /// Whether `other` carries the same profile data, ignoring approval state
  /// and timestamps. Used to confirm a write is visible on re-read.
  pub fn same_fields(&self, other: &Fragment) -> bool {
    self.fragment_id == other.fragment_id
      && self.legal_name == other.legal_name
      && self.address == other.address
      && self.contact_number == other.contact_number
      && self.identity_document_url == other.identity_document_url
      && self.details == other.details
      && self.active == other.active
  }
}

/// Overwrite `target` with the trimmed `value` unless it is absent or blank.
/// Blank strings mean "no change", never "clear".
fn merge_text(target: &mut Option<String>, value: Option<&str>) {
  if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
    *target = Some(v.to_owned());
  }
}

// ─── Patches ─────────────────────────────────────────────────────────────────

/// Fields shared by both fragment kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonPatch {
  pub legal_name:            Option<String>,
  pub address:               Option<String>,
  pub contact_number:        Option<String>,
  pub identity_document_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopPatch {
  #[serde(flatten)]
  pub common:              CommonPatch,
  /// The signup being completed. Falls back to the shop kind when absent.
  pub track:               Option<SignupTrack>,
  pub shop_kind:           Option<ShopKind>,
  pub company_name:        Option<String>,
  pub tax_id:              Option<String>,
  pub license_url:         Option<String>,
  pub tax_certificate_url: Option<String>,
  pub address_proof_url:   Option<String>,
  pub owner_kyc_url:       Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryPatch {
  #[serde(flatten)]
  pub common:                      CommonPatch,
  pub vehicle_type:                Option<VehicleType>,
  pub vehicle_model:               Option<String>,
  pub vehicle_registration_number: Option<String>,
  pub driving_license_url:         Option<String>,
}

/// A partial update to the role-specific fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FragmentPatch {
  Shop(ShopPatch),
  Delivery(DeliveryPatch),
}

impl FragmentPatch {
  pub fn kind(&self) -> FragmentKind {
    match self {
      Self::Shop(_) => FragmentKind::Shop,
      Self::Delivery(_) => FragmentKind::Delivery,
    }
  }

  pub fn common(&self) -> &CommonPatch {
    match self {
      Self::Shop(p) => &p.common,
      Self::Delivery(p) => &p.common,
    }
  }
}
