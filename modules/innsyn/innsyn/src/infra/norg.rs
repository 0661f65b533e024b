use std::time::Duration;

use async_trait::async_trait;

use super::http::{HEADER_CALL_ID, build_client, call_id, transport_message};
use crate::config::NorgConfig;
use crate::domain::error::NorgError;
use crate::domain::ports::{NavEnhet, NorgClient};

pub struct HttpNorgClient {
    client: reqwest::Client,
    url: String,
}

impl HttpNorgClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &NorgConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            url: cfg.url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl NorgClient for HttpNorgClient {
    #[tracing::instrument(skip(self))]
    async fn hent_nav_enhet(&self, enhetsnr: &str) -> Result<NavEnhet, NorgError> {
        tracing::debug!("Henter NAV-enhet fra NORG2");
        let response = self
            .client
            .get(format!("{}/enhet/{enhetsnr}", self.url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(HEADER_CALL_ID, call_id())
            .send()
            .await
            .map_err(|e| NorgError::Transport(transport_message(&e)))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(NorgError::NotFound(enhetsnr.to_owned()));
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Noe feilet ved kall mot NORG2");
            return Err(NorgError::Transport(format!("NORG2 svarte {}", status.as_u16())));
        }
        let enhet = response
            .json()
            .await
            .map_err(|e| NorgError::Transport(format!("Ugyldig svar fra NORG2: {e}")))?;
        tracing::info!("Hentet NAV-enhet fra NORG2");
        Ok(enhet)
    }
}
