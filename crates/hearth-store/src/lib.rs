//! # hearth-store
//!
//! SQLite-backed persistence for Hearth: users, direct messages,
//! notifications and per-recipient notification read state.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` with typed helpers, and the [`Persistence`] trait
//! that the realtime server depends on.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod persistence;
pub mod users;

mod error;
mod row;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
pub use persistence::{Persistence, SharedDatabase};
