//! # gatehouse-database
//!
//! The [`CredentialStore`] contract consumed by the session engine, plus
//! two implementations: [`PgCredentialStore`] over PostgreSQL and
//! [`MemoryCredentialStore`] for tests and single-node development.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryCredentialStore;
pub use repositories::PgCredentialStore;
pub use store::CredentialStore;
