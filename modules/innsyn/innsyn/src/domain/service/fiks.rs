use std::sync::Arc;

use innsyn_sdk::{DigisosSak, JsonVedleggSpesifikasjon};
use serde::de::DeserializeOwned;

use crate::auth::InnloggetBruker;
use crate::domain::cache::InnsynCache;
use crate::domain::error::{DomainError, FiksError};
use crate::domain::ports::{FiksClient, FilForOpplasting};
use crate::domain::service::tilgang::TilgangskontrollService;

/// Cached, ownership-checked access to Fiks.
///
/// Every case read goes through here so no handler can hand out a case that
/// belongs to someone else.
pub struct FiksService {
    client: Arc<dyn FiksClient>,
    tilgang: Arc<TilgangskontrollService>,
    cache: Arc<InnsynCache>,
}

impl FiksService {
    #[must_use]
    pub fn new(client: Arc<dyn FiksClient>, tilgang: Arc<TilgangskontrollService>, cache: Arc<InnsynCache>) -> Self {
        Self { client, tilgang, cache }
    }

    /// # Errors
    /// `FiksError` from upstream, or `DomainError::Tilgang` when the case
    /// belongs to another person.
    #[tracing::instrument(skip_all, fields(fiks_digisos_id = %digisos_id))]
    pub async fn hent_digisos_sak(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<DigisosSak, DomainError> {
        if let Some(sak) = self.cache.digisos_sak(digisos_id).await {
            self.tilgang.verify_digisos_sak_is_for_correct_user(&sak, bruker).await?;
            return Ok(sak);
        }
        let sak = self.client.hent_digisos_sak(digisos_id, &bruker.token).await?;
        self.tilgang.verify_digisos_sak_is_for_correct_user(&sak, bruker).await?;
        self.cache.put_digisos_sak(&sak).await;
        Ok(sak)
    }

    /// # Errors
    /// `FiksError` from upstream.
    pub async fn hent_alle_digisos_saker(&self, bruker: &InnloggetBruker) -> Result<Vec<DigisosSak>, DomainError> {
        self.client.hent_alle_digisos_saker(&bruker.token).await
    }

    /// A JSON document from dokumentlager, decoded as `T`.
    ///
    /// # Errors
    /// `FiksError::Decode` when the document does not match `T`.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_dokument<T: DeserializeOwned>(
        &self,
        digisos_id: &str,
        dokumentlager_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<T, DomainError> {
        let dokument = if let Some(dokument) = self.cache.dokument(dokumentlager_id).await {
            dokument
        } else {
            let dokument = self
                .client
                .hent_dokument(digisos_id, dokumentlager_id, &bruker.token)
                .await?;
            self.cache.put_dokument(dokumentlager_id.to_owned(), dokument.clone()).await;
            dokument
        };
        serde_json::from_value(dokument)
            .map_err(|e| FiksError::Decode(format!("dokument {dokumentlager_id}: {e}")).into())
    }

    /// Uploads an ettersendelse and drops the cached case so the next read
    /// sees it.
    ///
    /// # Errors
    /// `FiksError` from upstream. An ettersendelse that already exists is
    /// treated as success.
    pub async fn last_opp_ny_ettersendelse(
        &self,
        sak: &DigisosSak,
        nav_ekstern_ref_id: &str,
        spesifikasjon: &JsonVedleggSpesifikasjon,
        filer: Vec<FilForOpplasting>,
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        let result = self
            .client
            .last_opp_ny_ettersendelse(
                &sak.kommunenummer,
                &sak.fiks_digisos_id,
                nav_ekstern_ref_id,
                spesifikasjon,
                filer,
                &bruker.token,
            )
            .await;
        match result {
            Ok(()) => {}
            Err(DomainError::Fiks(FiksError::FileExists(message))) => {
                tracing::warn!(%nav_ekstern_ref_id, %message, "Ettersendelsen var allerede lastet opp");
            }
            Err(e) => return Err(e),
        }
        self.cache.evict_digisos_sak(&sak.fiks_digisos_id).await;
        tracing::info!(fiks_digisos_id = %sak.fiks_digisos_id, "Fjernet digisosSak fra cache etter opplasting");
        Ok(())
    }
}
