//! SQLite backend for the mandi onboarding service.
//!
//! One [`SqliteStore`] implements every collaborator trait in
//! [`mandi_core::store`], including the subcategory catalog, so a single
//! database file backs a whole deployment. All access goes through
//! [`tokio_rusqlite`] and never blocks the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
