use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use super::http::{build_client, transport_message};
use crate::config::VirusScanConfig;
use crate::domain::error::DomainError;
use crate::domain::ports::VirusScan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanResult {
    #[serde(default)]
    filename: Option<String>,
    result: ScanStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ScanStatus {
    Ok,
    Found,
    Error,
}

/// ClamAV over HTTP.
///
/// Only a definite `FOUND`/`ERROR` rejects a file; a scanner that cannot be
/// reached lets the upload through.
pub struct ClamAvScanner {
    client: reqwest::Client,
    url: String,
    enabled: bool,
    is_prod: bool,
}

impl ClamAvScanner {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &VirusScanConfig, is_prod: bool) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(60))?,
            url: cfg.url.clone(),
            enabled: cfg.enabled,
            is_prod,
        })
    }

    async fn put(&self, data: Bytes) -> Result<reqwest::Response, String> {
        let mut retried = false;
        loop {
            let response = self
                .client
                .put(&self.url)
                .body(data.clone())
                .send()
                .await
                .map_err(|e| transport_message(&e))?;
            if response.status().is_server_error() && !retried {
                tracing::warn!(status = response.status().as_u16(), "Virusscan feilet, pr\u{f8}ver igjen");
                retried = true;
                continue;
            }
            return Ok(response);
        }
    }

    async fn is_infected(&self, filnavn: &str, data: &[u8]) -> bool {
        if !self.is_prod && filnavn.starts_with("virustest") {
            return true;
        }
        tracing::info!(bytes = data.len(), "Scanner fil for virus");

        let response = match self.put(Bytes::copy_from_slice(data)).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "Kunne ikke scanne fil opplastet");
                return false;
            }
            Err(message) => {
                tracing::warn!(%message, "Kunne ikke scanne fil opplastet");
                return false;
            }
        };
        let results: Vec<ScanResult> = match response.json().await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "Uventet svar fra virusscan");
                return false;
            }
        };
        let [result] = results.as_slice() else {
            tracing::warn!(
                antall = results.len(),
                "Virusscan returnerte uventet respons, forventet lengde er 1"
            );
            return false;
        };
        tracing::debug!(?result, "Fikk scan result");
        if result.result == ScanStatus::Ok {
            tracing::info!(bytes = data.len(), "Ingen virus i fil");
            return false;
        }
        tracing::warn!(status = ?result.result, filename = ?result.filename, "Fant virus i fil fors\u{f8}kt opplastet");
        true
    }
}

#[async_trait]
impl VirusScan for ClamAvScanner {
    async fn scan(&self, filnavn: &str, data: &[u8]) -> Result<(), DomainError> {
        if !self.enabled {
            tracing::warn!("Virusscanning er ikke aktivert");
            return Ok(());
        }
        if self.is_infected(filnavn, data).await {
            return Err(DomainError::VirusFunnet(filnavn.to_owned()));
        }
        Ok(())
    }
}
