//! Document approval workflow for a fragment.
//!
//! ```text
//!   (none) ──submit──▶ Pending ──approve──▶ Approved
//!                        ▲  │
//!              resubmit  │  └──reject──▶ Rejected
//!                        └───────────────────┘
//! ```
//!
//! `submit` is only driven by the onboarding service once the fragment is
//! complete. `approve` and `reject` are reviewer actions and carry no
//! completeness precondition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

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
pub enum ApprovalStatus {
  Pending,
  Approved,
  Rejected,
}

/// The review record embedded in every fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
  /// `None` until the first complete application is submitted.
  pub status:                   Option<ApprovalStatus>,
  pub rejection_reason:         Option<String>,
  pub application_submitted_at: Option<DateTime<Utc>>,
  pub review_initiated_at:      Option<DateTime<Utc>>,
  pub documents_verified_at:    Option<DateTime<Utc>>,
}

/// What [`Approval::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
  /// First application; review opened.
  Opened,
  /// Re-application after a rejection.
  Resubmitted,
  /// Already pending or approved.
  Unchanged,
}

impl Approval {
  pub fn is_approved(&self) -> bool {
    self.status == Some(ApprovalStatus::Approved)
  }

  /// Open or re-open review for a complete application.
  ///
  /// An approved record is never moved back to pending by a later edit.
  pub fn submit(&mut self, now: DateTime<Utc>) -> Submission {
    match self.status {
      None => {
        self.status = Some(ApprovalStatus::Pending);
        self.application_submitted_at = Some(now);
        self.review_initiated_at = Some(now);
        Submission::Opened
      }
      Some(ApprovalStatus::Rejected) => {
        self.status = Some(ApprovalStatus::Pending);
        self.application_submitted_at = Some(now);
        self.review_initiated_at.get_or_insert(now);
        Submission::Resubmitted
      }
      Some(ApprovalStatus::Pending | ApprovalStatus::Approved) => {
        Submission::Unchanged
      }
    }
  }

  pub fn approve(&mut self, now: DateTime<Utc>) {
    self.status = Some(ApprovalStatus::Approved);
    self.rejection_reason = None;
    self.documents_verified_at = Some(now);
  }

  pub fn reject(&mut self, reason: impl Into<String>) {
    self.status = Some(ApprovalStatus::Rejected);
    self.rejection_reason = Some(reason.into());
    self.documents_verified_at = None;
  }
}
