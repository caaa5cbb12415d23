//! Opaque refresh tokens.

pub mod codec;

pub use codec::{IssuedRefreshToken, RefreshTokenCodec, TokenNonce};
