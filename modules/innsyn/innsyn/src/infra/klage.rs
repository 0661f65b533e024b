use async_trait::async_trait;
use innsyn_sdk::{FiksKlage, JsonVedleggSpesifikasjon};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use uuid::Uuid;

use super::http::{
    HEADER_INTEGRASJON_ID, HEADER_INTEGRASJON_PASSORD, bearer, build_client, fiks_error, fiks_transport_error,
};
use crate::config::{FiksConfig, Secret};
use crate::domain::error::{DomainError, FiksError};
use crate::domain::ports::KlageClient;

/// The Fiks klage api.
pub struct HttpKlageClient {
    client: reqwest::Client,
    base_url: String,
    integrasjonsid: String,
    integrasjonpassord: Secret,
}

impl HttpKlageClient {
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

    fn request(&self, method: reqwest::Method, url: String, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .header(HEADER_INTEGRASJON_ID, &self.integrasjonsid)
            .header(HEADER_INTEGRASJON_PASSORD, self.integrasjonpassord.expose())
    }
}

fn json_part(filnavn: &'static str, body: String) -> Result<Part, DomainError> {
    Part::text(body)
        .file_name(filnavn)
        .mime_str("application/json")
        .map_err(|e| anyhow::Error::from(e).into())
}

#[async_trait]
impl KlageClient for HttpKlageClient {
    #[tracing::instrument(skip(self, klage_json, vedlegg, token))]
    async fn send_klage(
        &self,
        digisos_id: &str,
        klage_id: Uuid,
        vedtak_id: &str,
        klage_json: Value,
        vedlegg: &JsonVedleggSpesifikasjon,
        token: &str,
    ) -> Result<(), DomainError> {
        let form = Form::new()
            .part("klage.json", json_part("klage.json", klage_json.to_string())?)
            .part(
                "vedlegg.json",
                json_part("vedlegg.json", serde_json::to_string(vedlegg).map_err(anyhow::Error::from)?)?,
            );
        // The klage id doubles as navEksternRefId.
        let url = format!(
            "{}/digisos/klage/api/v1/{digisos_id}/{klage_id}/{klage_id}/{vedtak_id}",
            self.base_url
        );
        let response = self
            .request(reqwest::Method::POST, url, token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| fiks_transport_error("sendKlage", &e))?;
        if !response.status().is_success() {
            return Err(fiks_error("sendKlage", response).await.into());
        }
        tracing::info!("Klage sendt til Fiks");
        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    async fn hent_klager(&self, digisos_id: &str, token: &str) -> Result<Vec<FiksKlage>, DomainError> {
        let url = format!(
            "{}/digisos/klage/api/v1/klager?digisosId={}",
            self.base_url,
            urlencoding::encode(digisos_id)
        );
        let response = self
            .request(reqwest::Method::GET, url, token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| fiks_transport_error("hentKlager", &e))?;
        if !response.status().is_success() {
            return Err(fiks_error("hentKlager", response).await.into());
        }
        response
            .json()
            .await
            .map_err(|e| FiksError::Decode(format!("klager: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> HttpKlageClient {
        HttpKlageClient::new(&FiksConfig {
            base_url: server.base_url(),
            integrasjonsid: "id".to_owned(),
            integrasjonpassord: Secret::new("pw"),
            ..FiksConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_klage_json_and_vedlegg_json() {
        let server = MockServer::start();
        let klage_id = Uuid::new_v4();
        let path = format!("/digisos/klage/api/v1/sak-1/{klage_id}/{klage_id}/vedtak-1");
        let m = server.mock(|when, then| {
            when.method(Method::POST)
                .path(path)
                .header("IntegrasjonId", "id")
                .body_includes("filename=\"klage.json\"")
                .body_includes("filename=\"vedlegg.json\"")
                .body_includes("\"klageTekst\":\"uenig\"");
            then.status(200);
        });

        client(&server)
            .send_klage(
                "sak-1",
                klage_id,
                "vedtak-1",
                json!({"begrunnelse": {"klageTekst": "uenig"}}),
                &JsonVedleggSpesifikasjon::default(),
                "token",
            )
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn lists_klager_for_case() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/digisos/klage/api/v1/klager")
                .query_param("digisosId", "sak-1");
            then.status(200).json_body(json!([{
                "fiksOrgId": "org",
                "digisosId": "sak-1",
                "klageId": "k1",
                "vedtakId": "v1",
                "navEksternRefId": "k1",
                "klageMetadata": "meta",
                "vedleggMetadata": "vmeta",
                "klageDokument": null,
                "sendtKvittering": {"sendtStatus": {"status": "SENDT", "timestamp": 1_539_296_542_000_i64}}
            }]));
        });

        let klager = client(&server).hent_klager("sak-1", "token").await.unwrap();
        assert_eq!(klager.len(), 1);
        assert_eq!(klager[0].klage_id, "k1");
        assert_eq!(klager[0].trukket, None);
    }

    #[tokio::test]
    async fn failed_send_is_fiks_error() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::POST);
            then.status(500).body("feil");
        });

        let err = client(&server)
            .send_klage(
                "sak-1",
                Uuid::new_v4(),
                "vedtak-1",
                json!({}),
                &JsonVedleggSpesifikasjon::default(),
                "token",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Fiks(FiksError::Server { status: 500, .. })));
    }
}
