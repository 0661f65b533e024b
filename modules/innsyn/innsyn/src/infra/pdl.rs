use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::http::{HEADER_BEHANDLINGSNUMMER, HEADER_CALL_ID, bearer, build_client, call_id, error_message, transport_message};
use crate::config::PdlConfig;
use crate::domain::error::PdlError;
use crate::domain::ports::{PdlClient, PdlPerson, TokenSource};

const BEHANDLINGSNUMMER_INNSYN: &str = "B563";

const HENT_PERSON: &str = "query($ident: ID!) { \
    hentPerson(ident: $ident) { \
        adressebeskyttelse(historikk: false) { gradering } \
        navn(historikk: false) { fornavn } \
    } \
}";

const HENT_IDENTER: &str = "query($ident: ID!) { \
    hentIdenter(ident: $ident, historikk: true) { identer { ident } } \
}";

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    extensions: Option<GraphQlExtensions>,
}

#[derive(Deserialize)]
struct GraphQlExtensions {
    code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HentPersonData {
    hent_person: Option<PdlPerson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HentIdenterData {
    hent_identer: Option<Identliste>,
}

#[derive(Deserialize)]
struct Identliste {
    identer: Vec<Ident>,
}

#[derive(Deserialize)]
struct Ident {
    ident: String,
}

/// PDL GraphQL, called with a TokenX token exchanged from the citizen's.
pub struct HttpPdlClient {
    client: reqwest::Client,
    url: String,
    audience: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpPdlClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &PdlConfig, tokens: Arc<dyn TokenSource>) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            url: cfg.url.clone(),
            audience: cfg.audience.clone(),
            tokens,
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, ident: &str, token: &str) -> Result<Option<T>, PdlError> {
        let token = self
            .tokens
            .exchange(token, &self.audience)
            .await
            .map_err(|e| PdlError::Transport(e.to_string()))?;
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, bearer(&token))
            .header(HEADER_BEHANDLINGSNUMMER, BEHANDLINGSNUMMER_INNSYN)
            .header(HEADER_CALL_ID, call_id())
            .json(&json!({"query": query, "variables": {"ident": ident}}))
            .send()
            .await
            .map_err(|e| PdlError::Transport(transport_message(&e)))?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::error!(status = status.as_u16(), %message, "PDL - noe feilet");
            return Err(PdlError::Transport(format!("PDL svarte {}: {message}", status.as_u16())));
        }
        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| PdlError::Response(format!("Ugyldig svar fra PDL: {e}")))?;
        if !body.errors.is_empty() {
            let feil: Vec<String> = body
                .errors
                .iter()
                .map(|e| {
                    let code = e.extensions.as_ref().and_then(|x| x.code.as_deref()).unwrap_or("ukjent");
                    format!("{}(feilkode: {code})", e.message)
                })
                .collect();
            return Err(PdlError::Response(format!(
                "Error i respons fra pdl-api: {}",
                feil.join(", ")
            )));
        }
        Ok(body.data)
    }
}

#[async_trait]
impl PdlClient for HttpPdlClient {
    #[tracing::instrument(skip_all)]
    async fn hent_person(&self, ident: &str, token: &str) -> Result<Option<PdlPerson>, PdlError> {
        let data: Option<HentPersonData> = self.query(HENT_PERSON, ident, token).await?;
        Ok(data.and_then(|d| d.hent_person))
    }

    #[tracing::instrument(skip_all)]
    async fn hent_identer(&self, ident: &str, token: &str) -> Result<Vec<String>, PdlError> {
        let data: Option<HentIdenterData> = self.query(HENT_IDENTER, ident, token).await?;
        Ok(data
            .and_then(|d| d.hent_identer)
            .map_or_else(Vec::new, |l| l.identer.into_iter().map(|i| i.ident).collect()))
    }
}
