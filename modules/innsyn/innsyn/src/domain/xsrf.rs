//! Per-user XSRF tokens for state-changing requests.
//!
//! A token is generated once per user per day and handed out with the
//! soknadsStatus response. Writes must echo it back in the
//! `XSRF-TOKEN-INNSYN-API` header; yesterday's token stays valid so sessions
//! spanning midnight keep working.

use std::time::Duration;

use chrono::NaiveDate;
use jsonwebtoken::{Algorithm, EncodingKey};
use moka::future::Cache;
use uuid::Uuid;

use crate::config::XsrfConfig;
use crate::domain::error::{DomainError, XsrfError};
use crate::domain::util::{sha256_hex, today_oslo};

pub const XSRF_HEADER: &str = "XSRF-TOKEN-INNSYN-API";

pub struct XsrfGenerator {
    key: EncodingKey,
    tokens: Cache<String, String>,
}

impl XsrfGenerator {
    #[must_use]
    pub fn new(cfg: &XsrfConfig) -> Self {
        Self::with_ttl(cfg.secret.expose().as_bytes(), cfg.time_to_live)
    }

    #[must_use]
    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            tokens: Cache::builder().max_capacity(100_000).time_to_live(ttl).build(),
        }
    }

    /// Today's token for `fnr`, creating it on first use.
    ///
    /// # Errors
    /// `DomainError::Unexpected` if signing fails.
    pub async fn generate(&self, fnr: &str) -> Result<String, DomainError> {
        self.generate_for(fnr, today_oslo()).await
    }

    /// # Errors
    /// `DomainError::Unexpected` if signing fails.
    pub async fn generate_for(&self, fnr: &str, date: NaiveDate) -> Result<String, DomainError> {
        let key = cache_key(fnr, date);
        if let Some(existing) = self.tokens.get(&key).await {
            return Ok(existing);
        }
        let message = format!("{fnr}{}", Uuid::new_v4());
        let token = jsonwebtoken::crypto::sign(message.as_bytes(), &self.key, Algorithm::HS256)
            .map_err(|e| DomainError::Unexpected(anyhow::anyhow!("Kunne ikke generere xsrf-token: {e}")))?;
        self.tokens.insert(key, token.clone()).await;
        Ok(token)
    }

    /// Accepts today's or yesterday's token.
    ///
    /// # Errors
    /// `XsrfError` when the header is missing or matches neither.
    pub async fn check(&self, fnr: &str, header: Option<&str>) -> Result<(), XsrfError> {
        let today = today_oslo();
        self.check_at(fnr, header, today).await
    }

    async fn check_at(&self, fnr: &str, header: Option<&str>, today: NaiveDate) -> Result<(), XsrfError> {
        let Some(header) = header else {
            return Err(XsrfError);
        };
        let mut dates = vec![today];
        if let Some(yesterday) = today.pred_opt() {
            dates.push(yesterday);
        }
        for date in dates {
            if self.tokens.get(&cache_key(fnr, date)).await.as_deref() == Some(header) {
                return Ok(());
            }
        }
        Err(XsrfError)
    }
}

fn cache_key(fnr: &str, date: NaiveDate) -> String {
    sha256_hex(&format!("{fnr}{}", date.format("%Y%m%d")))
}
