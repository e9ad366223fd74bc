//! Error types for `mandi-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  fragment::FragmentKind,
  role::{RequiredField, Role},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("participant not found: {0}")]
  ParticipantNotFound(Uuid),

  #[error("participant {participant_id} has no {kind} profile")]
  FragmentNotFound {
    participant_id: Uuid,
    kind:           FragmentKind,
  },

  #[error("email {0:?} is already in use by another participant")]
  EmailConflict(String),

  /// Only raised when a caller forces a transition; ordinary partial updates
  /// never fail for being incomplete.
  #[error("{role:?} signup is incomplete, missing: {missing:?}")]
  IncompleteSignup {
    role:    Role,
    missing: Vec<RequiredField>,
  },

  #[error("validation error: {0}")]
  Validation(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a collaborator error into [`Error::StorageUnavailable`].
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StorageUnavailable(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
