//! Bearer token authentication for the citizen-facing api.
//!
//! Tokens come from ID-porten (directly or through TokenX) and are validated
//! against the issuer's JWKS. A valid token yields an [`InnloggetBruker`] in
//! the request extensions.

pub mod claims;
pub mod jwks;
pub mod middleware;

use async_trait::async_trait;
use jsonwebtoken::Header;
use serde_json::Value;

pub use claims::{ClaimsError, InnsynClaims, validate_claims};
pub use jwks::{JwksKeyProvider, run_jwks_refresh_task};
pub use middleware::{AuthState, require_innlogget_bruker};

/// Verifies a token's signature and hands back its header and raw claims.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError>;
}

/// The authenticated citizen behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnloggetBruker {
    /// Fødselsnummer from the `pid` claim.
    pub fnr: String,
    pub client_id: Option<String>,
    /// Raw bearer token, forwarded to Fiks and exchanged for PDL.
    pub token: String,
}

impl InnloggetBruker {
    #[must_use]
    pub fn new(fnr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            fnr: fnr.into(),
            client_id: None,
            token: token.into(),
        }
    }
}
