//! # gatehouse-entity
//!
//! Row models owned by the credential store. The session engine reads
//! these but never mutates a `User` directly.

pub mod identity;
pub mod token;
pub mod user;

pub use identity::UserIdentity;
pub use token::{NewToken, Token};
pub use user::{CreateUser, User};
