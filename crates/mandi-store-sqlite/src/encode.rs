//! Encoding and decoding helpers between mandi domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings and UUIDs hyphenated lowercase strings.
//! Roles and tiers use their short storage codes. Kind-specific fragment
//! fields and membership lists are stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use mandi_core::{
  approval::{Approval, ApprovalStatus},
  fragment::{Fragment, FragmentDetails},
  membership::{CategoryId, CategoryMembership, OperatingSubcategory},
  participant::Participant,
  role::{AppTier, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Codes ───────────────────────────────────────────────────────────────────

fn decode_code<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownCode { column, value: s.to_owned() })
}

pub fn decode_role(s: &str) -> Result<Role> { decode_code("role", s) }

pub fn decode_tier(s: &str) -> Result<AppTier> { decode_code("app_tier", s) }

pub fn encode_status(s: ApprovalStatus) -> &'static str { s.into() }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PARTICIPANT_COLUMNS: &str =
  "participant_id, name, email, role, app_tier, active, created_at";

/// Raw values read directly from a `participants` row.
pub struct RawParticipant {
  pub participant_id: String,
  pub name:           Option<String>,
  pub email:          Option<String>,
  pub role:           String,
  pub app_tier:       String,
  pub active:         bool,
  pub created_at:     String,
}

impl RawParticipant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      participant_id: row.get(0)?,
      name:           row.get(1)?,
      email:          row.get(2)?,
      role:           row.get(3)?,
      app_tier:       row.get(4)?,
      active:         row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      participant_id: decode_uuid(&self.participant_id)?,
      name:           self.name,
      email:          self.email,
      role:           decode_role(&self.role)?,
      app_tier:       decode_tier(&self.app_tier)?,
      active:         self.active,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const FRAGMENT_COLUMNS: &str = "fragment_id, participant_id, kind, shop_type,
  legal_name, address, contact_number, identity_document_url, details_json,
  approval_status, rejection_reason, application_submitted_at,
  review_initiated_at, documents_verified_at, active, created_at";

/// Raw values of a `fragments` row, in [`FRAGMENT_COLUMNS`] order.
///
/// Used both for reads and, via [`RawFragment::encode`], as the parameter set
/// of inserts and updates.
pub struct RawFragment {
  pub fragment_id:              String,
  pub participant_id:           String,
  pub kind:                     String,
  pub shop_type:                Option<i64>,
  pub legal_name:               Option<String>,
  pub address:                  Option<String>,
  pub contact_number:           Option<String>,
  pub identity_document_url:    Option<String>,
  pub details_json:             String,
  pub approval_status:          Option<String>,
  pub rejection_reason:         Option<String>,
  pub application_submitted_at: Option<String>,
  pub review_initiated_at:      Option<String>,
  pub documents_verified_at:    Option<String>,
  pub active:                   bool,
  pub created_at:               String,
}

impl RawFragment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fragment_id:              row.get(0)?,
      participant_id:           row.get(1)?,
      kind:                     row.get(2)?,
      shop_type:                row.get(3)?,
      legal_name:               row.get(4)?,
      address:                  row.get(5)?,
      contact_number:           row.get(6)?,
      identity_document_url:    row.get(7)?,
      details_json:             row.get(8)?,
      approval_status:          row.get(9)?,
      rejection_reason:         row.get(10)?,
      application_submitted_at: row.get(11)?,
      review_initiated_at:      row.get(12)?,
      documents_verified_at:    row.get(13)?,
      active:                   row.get(14)?,
      created_at:               row.get(15)?,
    })
  }

  pub fn encode(f: &Fragment) -> Result<Self> {
    let kind: &'static str = f.kind().into();
    let approval = &f.approval;
    Ok(Self {
      fragment_id:              encode_uuid(f.fragment_id),
      participant_id:           encode_uuid(f.participant_id),
      kind:                     kind.to_owned(),
      shop_type:                f.shop().and_then(|s| s.shop_kind).map(|k| k.code()),
      legal_name:               f.legal_name.clone(),
      address:                  f.address.clone(),
      contact_number:           f.contact_number.clone(),
      identity_document_url:    f.identity_document_url.clone(),
      details_json:             serde_json::to_string(&f.details)?,
      approval_status:          approval.status.map(encode_status).map(str::to_owned),
      rejection_reason:         approval.rejection_reason.clone(),
      application_submitted_at: approval.application_submitted_at.map(encode_dt),
      review_initiated_at:      approval.review_initiated_at.map(encode_dt),
      documents_verified_at:    approval.documents_verified_at.map(encode_dt),
      active:                   f.active,
      created_at:               encode_dt(f.created_at),
    })
  }

  pub fn into_fragment(self) -> Result<Fragment> {
    let details: FragmentDetails = serde_json::from_str(&self.details_json)?;
    let kind: &'static str = details.kind().into();
    if kind != self.kind {
      return Err(Error::UnknownCode { column: "kind", value: self.kind });
    }

    let status = self
      .approval_status
      .as_deref()
      .map(|s| decode_code::<ApprovalStatus>("approval_status", s))
      .transpose()?;

    Ok(Fragment {
      fragment_id: decode_uuid(&self.fragment_id)?,
      participant_id: decode_uuid(&self.participant_id)?,
      legal_name: self.legal_name,
      address: self.address,
      contact_number: self.contact_number,
      identity_document_url: self.identity_document_url,
      details,
      approval: Approval {
        status,
        rejection_reason: self.rejection_reason,
        application_submitted_at: decode_opt_dt(self.application_submitted_at)?,
        review_initiated_at: decode_opt_dt(self.review_initiated_at)?,
        documents_verified_at: decode_opt_dt(self.documents_verified_at)?,
      },
      active: self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw JSON columns of a `memberships` row.
pub struct RawMembership {
  pub subcategories_json: String,
  pub categories_json:    String,
}

impl RawMembership {
  pub fn encode(m: &CategoryMembership) -> Result<Self> {
    Ok(Self {
      subcategories_json: serde_json::to_string(&m.operating_subcategories)?,
      categories_json:    serde_json::to_string(&m.operating_categories)?,
    })
  }

  pub fn into_membership(self) -> Result<CategoryMembership> {
    let operating_subcategories: Vec<OperatingSubcategory> =
      serde_json::from_str(&self.subcategories_json)?;
    let operating_categories: Vec<CategoryId> =
      serde_json::from_str(&self.categories_json)?;
    Ok(CategoryMembership {
      operating_categories: operating_categories.into_iter().collect(),
      operating_subcategories,
    })
  }
}
