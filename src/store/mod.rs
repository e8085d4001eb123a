//! Profile Registry Storage
//!
//! SQLite-backed persistence for identity profiles.
//! The registry is where account-number uniqueness is ultimately enforced.

mod adapter;
mod database;
mod schema;

pub use adapter::DatabaseAdapter;
pub use database::Database;
pub use schema::{CREATE_TABLES, SCHEMA_VERSION};
