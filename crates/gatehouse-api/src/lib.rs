//! # gatehouse-api
//!
//! HTTP API layer for Gatehouse built on Axum.
//!
//! Provides the login/renew/logout endpoints, the cookie plumbing for the
//! `jwt` and `refresh_token` cookies, and the authentication middleware
//! stages that protected routes stack on.

pub mod app;
pub mod cookies;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use state::AppState;
