//! Participant, the identity root every profile hangs off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::{AppTier, Role};

/// A marketplace account. Role-specific data lives in its
/// [`Fragment`](crate::fragment::Fragment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub participant_id: Uuid,
  pub name:           Option<String>,
  pub email:          Option<String>,
  pub role:           Role,
  pub app_tier:       AppTier,
  /// Soft-delete flag. Inactive participants may register again.
  pub active:         bool,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ParticipantStore::create_participant`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewParticipant {
  pub name:     Option<String>,
  pub email:    Option<String>,
  #[serde(default)]
  pub app_tier: AppTier,
}

/// A partial update to the identity fields. Blank values mean "no change".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityPatch {
  pub name:     Option<String>,
  pub email:    Option<String>,
  /// Request the customer signup. Ignored when a fragment patch is present.
  #[serde(default)]
  pub customer: bool,
}

impl IdentityPatch {
  /// The trimmed, non-blank name, if any.
  pub fn name(&self) -> Option<&str> { non_blank(self.name.as_deref()) }

  /// The trimmed, non-blank email, if any.
  pub fn email(&self) -> Option<&str> { non_blank(self.email.as_deref()) }

  pub fn is_empty(&self) -> bool { self.name().is_none() && self.email().is_none() }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
  s.map(str::trim).filter(|s| !s.is_empty())
}
