use std::sync::Arc;

use innsyn_sdk::{DigisosSak, JsonDigisosSoker, JsonSoknad};

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::service::fiks::FiksService;
use crate::domain::service::kommune::KommuneService;

/// Fetches the two JSON documents a case model is built from.
pub struct InnsynService {
    fiks: Arc<FiksService>,
    kommune: Arc<KommuneService>,
}

impl InnsynService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, kommune: Arc<KommuneService>) -> Self {
        Self { fiks, kommune }
    }

    /// The caseworker event document, or `None` when the municipality has
    /// innsyn turned off or no events were written yet.
    ///
    /// # Errors
    /// Upstream failures from Fiks.
    pub async fn hent_json_digisos_soker(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<Option<JsonDigisosSoker>, DomainError> {
        if self.kommune.er_innsyn_deaktivert_for_kommune(sak).await? {
            tracing::info!(kommunenummer = %sak.kommunenummer, "Innsyn er deaktivert for kommunen");
            return Ok(None);
        }
        let Some(metadata) = sak.digisos_soker.as_ref().map(|d| d.metadata.as_str()) else {
            return Ok(None);
        };
        self.fiks
            .hent_dokument(&sak.fiks_digisos_id, metadata, bruker)
            .await
            .map(Some)
    }

    /// # Errors
    /// Upstream failures from Fiks.
    pub async fn hent_original_soknad(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<Option<JsonSoknad>, DomainError> {
        let Some(original) = &sak.original_soknad_nav else {
            return Ok(None);
        };
        self.fiks
            .hent_dokument(&sak.fiks_digisos_id, &original.metadata, bruker)
            .await
            .map(Some)
    }
}
