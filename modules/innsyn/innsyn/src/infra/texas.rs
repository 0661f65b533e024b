use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::http::{build_client, error_message, transport_message};
use crate::config::TexasConfig;
use crate::domain::error::TokenError;
use crate::domain::ports::TokenSource;

#[derive(Serialize)]
struct TokenRequest<'a> {
    identity_provider: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_token: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Tokens from the Texas sidecar: Maskinporten for Fiks kommuneinfo and
/// TokenX exchange for PDL.
pub struct TexasTokenSource {
    client: reqwest::Client,
    token_endpoint: String,
    exchange_endpoint: String,
    maskinporten_target: String,
    expiry_margin: Duration,
    maskinporten: Mutex<Option<CachedToken>>,
}

impl TexasTokenSource {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &TexasConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            token_endpoint: cfg.token_endpoint.clone(),
            exchange_endpoint: cfg.exchange_endpoint.clone(),
            maskinporten_target: cfg.maskinporten_target.clone(),
            expiry_margin: cfg.expiry_margin,
            maskinporten: Mutex::new(None),
        })
    }

    async fn hent_token(&self, url: &str, request: &TokenRequest<'_>) -> Result<TokenResponse, TokenError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TokenError::Transport(transport_message(&e)))?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(TokenError::Exchange(format!(
                "Feil ved henting av {}-token fra Texas. Status: {}. Error: {message}",
                request.identity_provider,
                status.as_u16()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Exchange(format!("Ugyldig svar fra Texas: {e}")))?;
        tracing::info!(identity_provider = request.identity_provider, "Hentet token fra Texas");
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for TexasTokenSource {
    async fn maskinporten_token(&self) -> Result<String, TokenError> {
        let mut cached = self.maskinporten.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.token.clone());
        }
        let request = TokenRequest {
            identity_provider: "maskinporten",
            target: &self.maskinporten_target,
            user_token: None,
        };
        let response = self.hent_token(&self.token_endpoint, &request).await?;
        let levetid = Duration::from_secs(response.expires_in).saturating_sub(self.expiry_margin);
        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            refresh_at: Instant::now() + levetid,
        });
        Ok(response.access_token)
    }

    #[tracing::instrument(skip(self, user_token))]
    async fn exchange(&self, user_token: &str, audience: &str) -> Result<String, TokenError> {
        let request = TokenRequest {
            identity_provider: "tokenx",
            target: audience,
            user_token: Some(user_token),
        };
        Ok(self.hent_token(&self.exchange_endpoint, &request).await?.access_token)
    }
}
