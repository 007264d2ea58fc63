//! # palaver-store
//!
//! Local transactional storage for the Palaver conversation core, backed by
//! SQLite.  The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection`, runs schema migrations on open, and provides
//! typed CRUD helpers for every domain model.
//!
//! Entity helpers take a `&rusqlite::Connection` so the same functions work
//! against the plain connection (reads) and inside a [`Database::with_tx`]
//! scope (multi-document mutations, which must commit or abort as one unit).

pub mod calls;
pub mod conversations;
pub mod database;
pub mod friends;
pub mod group_leaves;
pub mod members;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod requests;
pub mod typing;
pub mod users;

mod error;
mod row;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
