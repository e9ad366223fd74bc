//! Core types and trait definitions for the mandi onboarding service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the participant role state machine, the document approval workflow, and the
//! category/subcategory reconciler. Storage and side effects are reached only
//! through the collaborator traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod approval;
pub mod completeness;
pub mod error;
pub mod fragment;
pub mod membership;
pub mod onboarding;
pub mod participant;
pub mod role;
pub mod store;
pub mod verify;

pub use error::{Error, Result};
pub use onboarding::Onboarding;
