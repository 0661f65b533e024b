use std::sync::Arc;

use async_trait::async_trait;
use innsyn_sdk::KommuneInfo;

use super::http::{
    HEADER_INTEGRASJON_ID, HEADER_INTEGRASJON_PASSORD, bearer, build_client, fiks_error, transport_message,
};
use crate::config::{FiksConfig, Secret};
use crate::domain::error::{DomainError, FiksError};
use crate::domain::ports::{KommuneInfoClient, TokenSource};

/// Municipality settings from Fiks, read with a Maskinporten token.
pub struct HttpKommuneInfoClient {
    client: reqwest::Client,
    base_url: String,
    integrasjonsid: String,
    integrasjonpassord: Secret,
    tokens: Arc<dyn TokenSource>,
}

impl HttpKommuneInfoClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &FiksConfig, tokens: Arc<dyn TokenSource>) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(cfg.timeout)?,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            integrasjonsid: cfg.integrasjonsid.clone(),
            integrasjonpassord: cfg.integrasjonpassord.clone(),
            tokens,
        })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, DomainError> {
        let token = self.tokens.maskinporten_token().await?;
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, bearer(&token))
            .header(HEADER_INTEGRASJON_ID, &self.integrasjonsid)
            .header(HEADER_INTEGRASJON_PASSORD, self.integrasjonpassord.expose())
            .send()
            .await
            .map_err(|e| FiksError::Transport(transport_message(&e)).into())
    }
}

#[async_trait]
impl KommuneInfoClient for HttpKommuneInfoClient {
    #[tracing::instrument(skip(self))]
    async fn get_kommune_info(&self, kommunenummer: &str) -> Result<KommuneInfo, DomainError> {
        let response = self.get(&format!("/digisos/api/v1/nav/kommuner/{kommunenummer}")).await?;
        if !response.status().is_success() {
            return Err(fiks_error("hentKommuneInfo", response).await.into());
        }
        response
            .json()
            .await
            .map_err(|e| FiksError::Decode(format!("kommuneinfo {kommunenummer}: {e}")).into())
    }

    /// Transport failures yield an empty list; HTTP errors are returned.
    async fn get_all(&self) -> Result<Vec<KommuneInfo>, DomainError> {
        let response = match self.get("/digisos/api/v1/nav/kommuner").await {
            Ok(response) => response,
            Err(DomainError::Fiks(FiksError::Transport(message))) => {
                tracing::warn!(%message, "Fiks - hentKommuneInfoForAlle feilet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        if !response.status().is_success() {
            return Err(fiks_error("hentKommuneInfoForAlle", response).await.into());
        }
        response
            .json()
            .await
            .map_err(|e| FiksError::Decode(format!("kommuneinfo: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::TokenError;
    use httpmock::prelude::*;
    use serde_json::json;

    struct StaticToken;

    #[async_trait]
    impl TokenSource for StaticToken {
        async fn maskinporten_token(&self) -> Result<String, TokenError> {
            Ok("maskinporten".to_owned())
        }

        async fn exchange(&self, _user_token: &str, _audience: &str) -> Result<String, TokenError> {
            Ok("tokenx".to_owned())
        }
    }

    fn info_json(nr: &str) -> serde_json::Value {
        json!({
            "kommunenummer": nr,
            "kanMottaSoknader": true,
            "kanOppdatereStatus": false,
            "harMidlertidigDeaktivertMottak": false,
            "harMidlertidigDeaktivertOppdateringer": false,
            "behandlingsansvarlig": null
        })
    }

    fn client(base_url: String) -> HttpKommuneInfoClient {
        let cfg = FiksConfig {
            base_url,
            ..FiksConfig::default()
        };
        HttpKommuneInfoClient::new(&cfg, Arc::new(StaticToken)).unwrap()
    }

    #[tokio::test]
    async fn reads_kommune_info_with_maskinporten_token() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/digisos/api/v1/nav/kommuner/0301")
                .header("authorization", "Bearer maskinporten");
            then.status(200).json_body(info_json("0301"));
        });

        let info = client(server.base_url()).get_kommune_info("0301").await.unwrap();
        assert_eq!(info.kommunenummer, "0301");
        assert!(!info.kan_oppdatere_status);
        assert!(!info.har_nks_tilgang);
    }

    #[tokio::test]
    async fn lists_all_and_maps_http_errors() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/digisos/api/v1/nav/kommuner");
            then.status(200).json_body(json!([info_json("0301"), info_json("4601")]));
        });
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/digisos/api/v1/nav/kommuner/9999");
            then.status(404);
        });
        let client = client(server.base_url());

        assert_eq!(client.get_all().await.unwrap().len(), 2);
        let err = client.get_kommune_info("9999").await.unwrap_err();
        assert!(matches!(err, DomainError::Fiks(FiksError::NotFound(_))));
    }

    #[tokio::test]
    async fn unreachable_fiks_gives_empty_list() {
        let client = client("http://127.0.0.1:1".to_owned());
        assert!(client.get_all().await.unwrap().is_empty());
    }
}
