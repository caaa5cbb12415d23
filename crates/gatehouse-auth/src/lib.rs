//! # gatehouse-auth
//!
//! Session and token engine for Gatehouse.
//!
//! ## Modules
//!
//! - `refresh`: opaque, encrypted refresh-token codec
//! - `jwt`: HS256 access-token encoding and validation
//! - `password`: bcrypt password hashing and strength policy
//! - `provider`: the login provider contract, its registry, and the
//!   password and external-identity variants
//! - `logout`: in-memory revocation registry with a background sweep
//! - `session`: login/renew/logout orchestration and the request
//!   authentication stages

mod blocking;

pub mod jwt;
pub mod logout;
pub mod password;
pub mod provider;
pub mod refresh;
pub mod session;

pub use jwt::{AccessClaims, JwtDecoder, JwtEncoder};
pub use logout::LogoutRegistry;
pub use password::{PasswordHasher, PasswordValidator};
pub use provider::{
    ExternalIdentity, ExternalIdentityProvider, IdentityExchange, LoginProvider, PasswordProvider,
    ProviderRegistry,
};
pub use refresh::{IssuedRefreshToken, RefreshTokenCodec};
pub use session::{
    AuthRejection, CredentialUpdate, Credentials, ParseOutcome, RequestAuthenticator, SessionContext,
    SessionService, TokenResponse,
};
