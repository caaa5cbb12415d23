//! Logout revocation.

pub mod registry;

pub use registry::LogoutRegistry;
