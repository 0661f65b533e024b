use std::time::Duration;

use serde::Deserialize;

use crate::domain::error::FiksError;
use crate::domain::util::mask_fnr;

pub const HEADER_INTEGRASJON_ID: &str = "IntegrasjonId";
pub const HEADER_INTEGRASJON_PASSORD: &str = "IntegrasjonPassord";
pub const HEADER_CALL_ID: &str = "Nav-Call-Id";
pub const HEADER_BEHANDLINGSNUMMER: &str = "behandlingsnummer";

/// Shared client settings for every upstream.
///
/// # Errors
/// Returns error if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(15))
        .user_agent(concat!("innsyn/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[must_use]
pub fn call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

/// Error text of a failed response with fødselsnummer masked. Fiks wraps
/// errors as `{"message": ...}`; other bodies are used as they are.
pub async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorMessage>(&body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or(body);
    mask_fnr(&message)
}

#[must_use]
pub fn transport_message(e: &reqwest::Error) -> String {
    mask_fnr(&e.to_string())
}

/// Turns a non-success response into the matching [`FiksError`].
pub async fn fiks_error(operasjon: &str, response: reqwest::Response) -> FiksError {
    let status = response.status().as_u16();
    let message = error_message(response).await;
    tracing::warn!(status, %message, "Fiks - {operasjon} feilet");
    FiksError::from_status(status, format!("Fiks - {operasjon} feilet - {message}"))
}

#[must_use]
pub fn fiks_transport_error(operasjon: &str, e: &reqwest::Error) -> FiksError {
    let message = transport_message(e);
    tracing::warn!(%message, "Fiks - {operasjon} feilet");
    FiksError::Transport(format!("Fiks - {operasjon} feilet - {message}"))
}
