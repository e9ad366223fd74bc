//! Verified writes against an eventually-consistent store.
//!
//! A write is followed by bounded re-reads until the stored value reflects it.
//! Running out of attempts is not an error: the caller gets
//! [`ReadBack::Stale`] and must treat the write as "not yet visible".

use std::{future::Future, time::Duration};

use serde::Deserialize;

/// Retry bounds for [`read_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerifyPolicy {
  pub attempts:   u32,
  /// Linear backoff step; attempt `n` waits `n * backoff_ms`.
  pub backoff_ms: u64,
}

impl Default for VerifyPolicy {
  fn default() -> Self { Self { attempts: 3, backoff_ms: 25 } }
}

impl VerifyPolicy {
  fn delay(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadBack<T> {
  Confirmed(T),
  /// The last value read, which never matched.
  Stale(Option<T>),
}

impl<T> ReadBack<T> {
  pub fn is_confirmed(&self) -> bool { matches!(self, Self::Confirmed(_)) }

  pub fn into_inner(self) -> Option<T> {
    match self {
      Self::Confirmed(v) => Some(v),
      Self::Stale(v) => v,
    }
  }
}

/// Re-read with `read` until `confirms` accepts the value or the policy's
/// attempts are spent. Read errors propagate immediately.
pub async fn read_back<T, E, R, Fut>(
  policy: &VerifyPolicy,
  mut read: R,
  confirms: impl Fn(&T) -> bool,
) -> Result<ReadBack<T>, E>
where
  R: FnMut() -> Fut,
  Fut: Future<Output = Result<Option<T>, E>>,
{
  let attempts = policy.attempts.max(1);
  let mut last = None;
  for attempt in 1..=attempts {
    match read().await? {
      Some(value) if confirms(&value) => return Ok(ReadBack::Confirmed(value)),
      other => last = other,
    }
    if attempt < attempts {
      tokio::time::sleep(policy.delay(attempt)).await;
    }
  }
  Ok(ReadBack::Stale(last))
}

/// Perform `write`, then [`read_back`] until the write is visible.
pub async fn write_verified<W, T, E, R, Fut>(
  policy: &VerifyPolicy,
  write: W,
  read: R,
  confirms: impl Fn(&T) -> bool,
) -> Result<ReadBack<T>, E>
where
  W: Future<Output = Result<(), E>>,
  R: FnMut() -> Fut,
  Fut: Future<Output = Result<Option<T>, E>>,
{
  write.await?;
  read_back(policy, read, confirms).await
}
