use async_trait::async_trait;
use innsyn_sdk::{DigisosSak, JsonVedleggSpesifikasjon};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use super::http::{
    HEADER_INTEGRASJON_ID, HEADER_INTEGRASJON_PASSORD, bearer, build_client, error_message, fiks_error,
    fiks_transport_error,
};
use crate::config::{FiksConfig, Secret};
use crate::domain::error::{DomainError, FiksError};
use crate::domain::ports::{FiksClient, FilForOpplasting};

/// Ålesund stores ettersendelser outside Fiks; uploads there are refused.
const KOMMUNE_UTEN_ETTERSENDELSE: &str = "1507";

#[derive(Serialize)]
struct VedleggMetadata<'a> {
    filnavn: &'a str,
    mimetype: &'a str,
    storrelse: u64,
}

/// The Fiks digisos api, called with the citizen's token and the
/// integration credentials.
pub struct HttpFiksClient {
    client: reqwest::Client,
    base_url: String,
    integrasjonsid: String,
    integrasjonpassord: Secret,
}

impl HttpFiksClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &FiksConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(cfg.timeout)?,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            integrasjonsid: cfg.integrasjonsid.clone(),
            integrasjonpassord: cfg.integrasjonpassord.clone(),
        })
    }

    fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .header(HEADER_INTEGRASJON_ID, &self.integrasjonsid)
            .header(HEADER_INTEGRASJON_PASSORD, self.integrasjonpassord.expose())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operasjon: &str,
        path: &str,
        token: &str,
    ) -> Result<T, FiksError> {
        let response = self
            .get(path, token)
            .send()
            .await
            .map_err(|e| fiks_transport_error(operasjon, &e))?;
        if !response.status().is_success() {
            return Err(fiks_error(operasjon, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| FiksError::Decode(format!("Fiks - {operasjon}: {e}")))
    }
}

fn upload_form(spesifikasjon: &JsonVedleggSpesifikasjon, filer: Vec<FilForOpplasting>) -> Result<Form, DomainError> {
    let text_part = |value: String| Part::text(value).mime_str("text/plain;charset=UTF-8");
    let mut form = Form::new().part(
        "vedlegg.json",
        text_part(serde_json::to_string(spesifikasjon).map_err(anyhow::Error::from)?).map_err(anyhow::Error::from)?,
    );
    for (i, fil) in filer.into_iter().enumerate() {
        let metadata = VedleggMetadata {
            filnavn: &fil.filnavn,
            mimetype: &fil.mimetype,
            storrelse: fil.storrelse,
        };
        let metadata = serde_json::to_string(&metadata).map_err(anyhow::Error::from)?;
        let dokument = Part::bytes(fil.data.to_vec())
            .file_name(fil.filnavn)
            .mime_str("application/octet-stream")
            .map_err(anyhow::Error::from)?;
        form = form
            .part(format!("vedleggSpesifikasjon:{i}"), text_part(metadata).map_err(anyhow::Error::from)?)
            .part(format!("dokument:{i}"), dokument);
    }
    Ok(form)
}

fn er_allerede_lastet_opp(message: &str, digisos_id: &str) -> bool {
    message.contains("Ettersendelse med tilh\u{f8}rende navEksternRefId ")
        && message.ends_with(&format!(" finnes allerde for oppgitt DigisosId {digisos_id}"))
}

#[async_trait]
impl FiksClient for HttpFiksClient {
    #[tracing::instrument(skip(self, token))]
    async fn hent_digisos_sak(&self, digisos_id: &str, token: &str) -> Result<DigisosSak, DomainError> {
        tracing::debug!("Henter digisosSak fra Fiks");
        let path = format!("/digisos/api/v1/soknader/{digisos_id}");
        Ok(self.get_json("hentDigisosSak", &path, token).await?)
    }

    #[tracing::instrument(skip_all)]
    async fn hent_alle_digisos_saker(&self, token: &str) -> Result<Vec<DigisosSak>, DomainError> {
        Ok(self
            .get_json("hentAlleDigisosSaker", "/digisos/api/v1/soknader/soknader", token)
            .await?)
    }

    #[tracing::instrument(skip(self, token))]
    async fn hent_dokument(&self, digisos_id: &str, dokumentlager_id: &str, token: &str) -> Result<Value, DomainError> {
        let path = format!("/digisos/api/v1/soknader/{digisos_id}/dokumenter/{dokumentlager_id}");
        let dokument = self.get_json("hentDokument", &path, token).await?;
        tracing::debug!("Hentet dokument fra Fiks");
        Ok(dokument)
    }

    #[tracing::instrument(skip(self, spesifikasjon, filer, token), fields(antall_filer = filer.len()))]
    async fn last_opp_ny_ettersendelse(
        &self,
        kommunenummer: &str,
        digisos_id: &str,
        nav_ekstern_ref_id: &str,
        spesifikasjon: &JsonVedleggSpesifikasjon,
        filer: Vec<FilForOpplasting>,
        token: &str,
    ) -> Result<(), DomainError> {
        if kommunenummer == KOMMUNE_UTEN_ETTERSENDELSE {
            return Err(anyhow::anyhow!("Kan ikke laste opp vedlegg p\u{e5} s\u{f8}knad fra \u{c5}lesund kommune").into());
        }
        let form = upload_form(spesifikasjon, filer)?;
        let url = format!(
            "{}/digisos/api/v1/soknader/{kommunenummer}/{digisos_id}/{nav_ekstern_ref_id}",
            self.base_url
        );
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .header(HEADER_INTEGRASJON_ID, &self.integrasjonsid)
            .header(HEADER_INTEGRASJON_PASSORD, self.integrasjonpassord.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| fiks_transport_error("lastOppNyEttersendelse", &e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), "Sendte ettersendelse til kommune i Fiks");
            return Ok(());
        }
        let message = error_message(response).await;
        if status == reqwest::StatusCode::BAD_REQUEST && er_allerede_lastet_opp(&message, digisos_id) {
            return Err(FiksError::FileExists(message).into());
        }
        tracing::warn!(status = status.as_u16(), %message, "Fiks - lastOppNyEttersendelse feilet");
        Err(FiksError::from_status(status.as_u16(), format!("Fiks - lastOppNyEttersendelse feilet - {message}")).into())
    }
}
