use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use jsonwebtoken::{DecodingKey, Header, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::KeyProvider;
use super::claims::ClaimsError;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// JWKS-backed signature verification with lock-free key reads.
///
/// Keys live in an `ArcSwap`; a background task refreshes them and an
/// unknown `kid` triggers an on-demand refresh, throttled by a cooldown.
pub struct JwksKeyProvider {
    jwks_uri: String,
    keys: Arc<ArcSwap<HashMap<String, DecodingKey>>>,
    refresh_state: Arc<RwLock<RefreshState>>,
    client: reqwest::Client,
    refresh_interval: Duration,
    max_backoff: Duration,
    on_demand_refresh_cooldown: Duration,
}

#[derive(Debug, Default)]
struct RefreshState {
    last_refresh: Option<Instant>,
    last_on_demand_refresh: Option<Instant>,
    consecutive_failures: u32,
    last_error: Option<String>,
    failed_kids: HashSet<String>,
}

impl JwksKeyProvider {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(jwks_uri: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            jwks_uri: jwks_uri.into(),
            keys: Arc::new(ArcSwap::from_pointee(HashMap::new())),
            refresh_state: Arc::new(RwLock::new(RefreshState::default())),
            client,
            refresh_interval: Duration::from_secs(300),
            max_backoff: Duration::from_secs(3600),
            on_demand_refresh_cooldown: Duration::from_secs(60),
        })
    }

    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    #[must_use]
    pub fn with_on_demand_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.on_demand_refresh_cooldown = cooldown;
        self
    }

    async fn fetch_jwks(&self) -> Result<HashMap<String, DecodingKey>, ClaimsError> {
        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| ClaimsError::JwksFetchFailed(format!("JWKS request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClaimsError::JwksFetchFailed(format!("JWKS HTTP {}", status.as_u16())));
        }
        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| ClaimsError::JwksFetchFailed(format!("JWKS JSON parse failed: {e}")))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if let ("RSA", Some(n), Some(e)) = (jwk.kty.as_str(), &jwk.n, &jwk.e) {
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| ClaimsError::JwksFetchFailed(format!("Invalid RSA key: {e}")))?;
                keys.insert(jwk.kid, key);
            }
        }

        if keys.is_empty() {
            return Err(ClaimsError::JwksFetchFailed("No valid RSA keys found in JWKS".into()));
        }
        Ok(keys)
    }

    fn calculate_backoff(&self, failures: u32) -> Duration {
        let base = Duration::from_secs(60);
        (base * 2u32.pow(failures.min(10))).min(self.max_backoff)
    }

    async fn should_refresh(&self) -> bool {
        let state = self.refresh_state.read().await;
        match state.last_refresh {
            None => true,
            Some(last) if state.consecutive_failures == 0 => last.elapsed() >= self.refresh_interval,
            Some(last) => last.elapsed() >= self.calculate_backoff(state.consecutive_failures),
        }
    }

    async fn perform_refresh(&self) -> Result<(), ClaimsError> {
        let result = self.fetch_jwks().await;
        let mut state = self.refresh_state.write().await;
        state.last_refresh = Some(Instant::now());
        match result {
            Ok(keys) => {
                self.keys.store(Arc::new(keys));
                state.consecutive_failures = 0;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                state.consecutive_failures += 1;
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Refreshes when the interval (or backoff after failures) has passed.
    ///
    /// # Errors
    /// `ClaimsError::JwksFetchFailed` when the fetch fails.
    pub async fn refresh_keys(&self) -> Result<(), ClaimsError> {
        if self.should_refresh().await {
            self.perform_refresh().await
        } else {
            Ok(())
        }
    }

    fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.load().get(kid).cloned()
    }

    async fn on_demand_refresh(&self, kid: &str) -> Result<(), ClaimsError> {
        if self.get_key(kid).is_some() {
            return Ok(());
        }
        {
            let state = self.refresh_state.read().await;
            if let Some(last) = state.last_on_demand_refresh
                && last.elapsed() < self.on_demand_refresh_cooldown
            {
                if state.failed_kids.contains(kid) {
                    tracing::warn!(kid, "Unknown kid repeatedly requested despite recent refresh");
                }
                return Err(ClaimsError::UnknownKeyId(kid.to_owned()));
            }
        }

        tracing::info!(kid, "Performing on-demand JWKS refresh for unknown kid");
        let result = self.perform_refresh().await;
        let mut state = self.refresh_state.write().await;
        state.last_on_demand_refresh = Some(Instant::now());
        if result.is_ok() && self.get_key(kid).is_some() {
            state.failed_kids.remove(kid);
        } else {
            state.failed_kids.insert(kid.to_owned());
        }
        result
    }
}

#[async_trait::async_trait]
impl KeyProvider for JwksKeyProvider {
    /// Verifies the signature only; time and audience checks are left to
    /// `validate_claims`.
    async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError> {
        let token = token.trim_start_matches("Bearer ").trim();
        let header =
            decode_header(token).map_err(|e| ClaimsError::DecodeFailed(format!("Invalid JWT header: {e}")))?;
        let kid = header
            .kid
            .clone()
            .ok_or_else(|| ClaimsError::DecodeFailed("Missing kid in JWT header".into()))?;

        let key = if let Some(key) = self.get_key(&kid) {
            key
        } else {
            self.on_demand_refresh(&kid).await?;
            self.get_key(&kid).ok_or_else(|| ClaimsError::UnknownKeyId(kid.clone()))?
        };

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = decode::<Value>(token, &key, &validation)
            .map_err(|e| ClaimsError::DecodeFailed(format!("JWT validation failed: {e}")))?;
        Ok((header, data.claims))
    }
}

/// Refreshes JWKS every minute (subject to the provider's interval) until cancelled.
pub async fn run_jwks_refresh_task(provider: Arc<JwksKeyProvider>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("JWKS refresh task shutting down");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = provider.refresh_keys().await {
                    tracing::warn!(error = %e, "JWKS refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn valid_jwks_json() -> &'static str {
        r#"{
            "keys": [{
                "kty": "RSA",
                "kid": "test-key-1",
                "use": "sig",
                "n": "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw",
                "e": "AQAB",
                "alg": "RS256"
            }, {
                "kty": "EC",
                "kid": "ec-key",
                "crv": "P-256"
            }]
        }"#
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let provider = JwksKeyProvider::new("https://example.com/jwks").unwrap();
        assert_eq!(provider.calculate_backoff(0), Duration::from_secs(60));
        assert_eq!(provider.calculate_backoff(2), Duration::from_secs(240));
        assert_eq!(provider.calculate_backoff(100), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn refresh_stores_rsa_keys_only() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(200)
                .header("content-type", "application/json")
                .body(valid_jwks_json());
        });

        let provider = JwksKeyProvider::new(server.url("/jwks")).unwrap();
        provider.perform_refresh().await.unwrap();

        assert!(provider.get_key("test-key-1").is_some());
        assert!(provider.get_key("ec-key").is_none());
        mock.assert();
    }

    #[tokio::test]
    async fn http_error_counts_as_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(500).body("Internal Server Error");
        });

        let provider = JwksKeyProvider::new(server.url("/jwks")).unwrap();
        let err = provider.perform_refresh().await.unwrap_err();
        assert!(err.to_string().contains("JWKS HTTP 500"));
        assert_eq!(provider.refresh_state.read().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn on_demand_refresh_respects_cooldown() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(404).body("Not Found");
        });

        let provider = JwksKeyProvider::new(server.url("/jwks"))
            .unwrap()
            .with_on_demand_refresh_cooldown(Duration::from_secs(60));

        assert!(provider.on_demand_refresh("kid").await.is_err());
        let second = provider.on_demand_refresh("kid").await.unwrap_err();
        assert!(matches!(second, ClaimsError::UnknownKeyId(_)));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/jwks");
            then.status(200)
                .header("content-type", "application/json")
                .body(valid_jwks_json());
        });
        let provider = JwksKeyProvider::new(server.url("/jwks")).unwrap();

        // {"alg":"RS256","kid":"nonexistent-kid"}
        let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6Im5vbmV4aXN0ZW50LWtpZCJ9.\
                     eyJzdWIiOiIxMjM0NTY3ODkwIn0.invalid";
        let err = provider.validate_and_decode(token).await.unwrap_err();
        assert!(matches!(err, ClaimsError::UnknownKeyId(kid) if kid == "nonexistent-kid"));
    }
}
