use jsonwebtoken::Header;
use serde_json::Value;
use thiserror::Error;

use crate::config::AuthConfig;

/// Accepted `acr` values; both mean security level high.
pub const ACR_LEVEL4: &str = "Level4";
pub const ACR_IDPORTEN_LOA_HIGH: &str = "idporten-loa-high";

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("Invalid issuer: expected one of {expected:?}, got {actual}")]
    InvalidIssuer { expected: Vec<String>, actual: String },

    #[error("Invalid audience: expected one of {expected:?}, got {actual:?}")]
    InvalidAudience { expected: Vec<String>, actual: Vec<String> },

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid (nbf check failed)")]
    NotYetValid,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    /// Authenticated, but at a security level too low for innsyn.
    #[error("Insufficient security level: {0}")]
    InsufficientAcr(String),

    #[error("JWT decode failed: {0}")]
    DecodeFailed(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("Unknown key ID: {0}")]
    UnknownKeyId(String),
}

impl ClaimsError {
    /// 403 rather than 401: logging in again will not help.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::InsufficientAcr(_))
    }
}

/// Claims innsyn cares about, pulled out of the raw token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnsynClaims {
    pub pid: String,
    pub acr: Option<String>,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub client_id: Option<String>,
    pub expires_at: Option<i64>,
    pub not_before: Option<i64>,
}

impl InnsynClaims {
    /// # Errors
    /// `ClaimsError::MissingClaim` when `pid` or `iss` is absent. A missing
    /// `acr` is left to `validate_claims`.
    pub fn from_value(_header: &Header, raw: &Value) -> Result<Self, ClaimsError> {
        let string = |name: &str| raw.get(name).and_then(Value::as_str).map(ToOwned::to_owned);
        let audiences = match raw.get("aud") {
            Some(Value::String(aud)) => vec![aud.clone()],
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self {
            pid: string("pid").ok_or_else(|| ClaimsError::MissingClaim("pid".into()))?,
            acr: string("acr"),
            issuer: string("iss").ok_or_else(|| ClaimsError::MissingClaim("iss".into()))?,
            audiences,
            client_id: string("client_id").or_else(|| string("azp")),
            expires_at: raw.get("exp").and_then(Value::as_i64),
            not_before: raw.get("nbf").and_then(Value::as_i64),
        })
    }
}

/// Issuer, audience, expiry and security level checks.
///
/// # Errors
/// The first failing check as a `ClaimsError`.
pub fn validate_claims(claims: &InnsynClaims, cfg: &AuthConfig, now: i64) -> Result<(), ClaimsError> {
    if !cfg.issuers.is_empty() && !cfg.issuers.contains(&claims.issuer) {
        return Err(ClaimsError::InvalidIssuer {
            expected: cfg.issuers.clone(),
            actual: claims.issuer.clone(),
        });
    }

    if !cfg.audiences.is_empty() && !claims.audiences.iter().any(|aud| cfg.audiences.contains(aud)) {
        return Err(ClaimsError::InvalidAudience {
            expected: cfg.audiences.clone(),
            actual: claims.audiences.clone(),
        });
    }

    let leeway = i64::try_from(cfg.leeway_seconds).unwrap_or(i64::MAX);
    if let Some(exp) = claims.expires_at
        && now > exp.saturating_add(leeway)
    {
        return Err(ClaimsError::Expired);
    }
    if let Some(nbf) = claims.not_before
        && now < nbf.saturating_sub(leeway)
    {
        return Err(ClaimsError::NotYetValid);
    }

    match claims.acr.as_deref() {
        Some(ACR_LEVEL4 | ACR_IDPORTEN_LOA_HIGH) => Ok(()),
        Some(acr) => Err(ClaimsError::InsufficientAcr(acr.to_owned())),
        None => Err(ClaimsError::InsufficientAcr("<mangler>".to_owned())),
    }
}
