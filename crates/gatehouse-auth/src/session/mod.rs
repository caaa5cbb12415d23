//! Session orchestration and request authentication.

pub mod authenticator;
pub mod context;
pub mod service;

pub use authenticator::{
    AuthRejection, CredentialUpdate, Credentials, ParseOutcome, RequestAuthenticator,
};
pub use context::SessionContext;
pub use service::{SessionService, TokenResponse};
