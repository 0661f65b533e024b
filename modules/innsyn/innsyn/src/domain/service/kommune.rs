use std::sync::Arc;

use chrono::NaiveDateTime;
use innsyn_sdk::{DigisosSak, KommuneInfo};
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::cache::InnsynCache;
use crate::domain::error::DomainError;
use crate::domain::ports::KommuneInfoClient;
use crate::domain::service::fiks::FiksService;
use crate::domain::util::now_oslo;

/// Municipality switches as the frontend sees them. Every flag is `true`
/// (deactivated) when Fiks has no info for the municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct KommuneResponse {
    pub er_innsyn_deaktivert: bool,
    pub er_innsyn_midlertidig_deaktivert: bool,
    pub er_innsending_ettersendelse_deaktivert: bool,
    pub er_innsending_ettersendelse_midlertidig_deaktivert: bool,
    pub tidspunkt: NaiveDateTime,
    pub kommunenummer: Option<String>,
}

impl KommuneResponse {
    #[must_use]
    pub fn from_info(info: Option<&KommuneInfo>) -> Self {
        Self {
            er_innsyn_deaktivert: er_innsyn_deaktivert(info),
            er_innsyn_midlertidig_deaktivert: info.is_none_or(|i| i.har_midlertidig_deaktivert_oppdateringer),
            er_innsending_ettersendelse_deaktivert: info.is_none_or(|i| !i.kan_motta_soknader),
            er_innsending_ettersendelse_midlertidig_deaktivert: info.is_none_or(|i| i.har_midlertidig_deaktivert_mottak),
            tidspunkt: now_oslo(),
            kommunenummer: info.map(|i| i.kommunenummer.clone()),
        }
    }
}

/// Innsyn is off for unknown municipalities and those that do not publish
/// status updates.
#[must_use]
pub fn er_innsyn_deaktivert(info: Option<&KommuneInfo>) -> bool {
    info.is_none_or(|i| !i.kan_oppdatere_status)
}

pub struct KommuneService {
    fiks: Arc<FiksService>,
    client: Arc<dyn KommuneInfoClient>,
    cache: Arc<InnsynCache>,
}

impl KommuneService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, client: Arc<dyn KommuneInfoClient>, cache: Arc<InnsynCache>) -> Self {
        Self { fiks, client, cache }
    }

    /// # Errors
    /// Failures reading the case. Fiks errors on the kommune lookup itself
    /// yield `Ok(None)`.
    pub async fn hent_kommune_info(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Option<KommuneInfo>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        self.kommune_info_for_sak(&sak).await
    }

    /// # Errors
    /// `DomainError::Unexpected` when the case has no kommunenummer.
    pub async fn kommune_info_for_sak(&self, sak: &DigisosSak) -> Result<Option<KommuneInfo>, DomainError> {
        if sak.kommunenummer.trim().is_empty() {
            tracing::warn!(fiks_digisos_id = %sak.fiks_digisos_id, "Fors\u{f8}kte \u{e5} hente kommuneInfo, men kommunenummer er tomt");
            return Err(DomainError::Unexpected(anyhow::anyhow!(
                "KommuneInfo kan ikke hentes fordi DigisosSak mangler kommunenummer"
            )));
        }
        Ok(self.hent_kommune_info_for_nummer(&sak.kommunenummer).await)
    }

    pub async fn hent_kommune_info_for_nummer(&self, kommunenummer: &str) -> Option<KommuneInfo> {
        if let Some(info) = self.cache.kommune_info(kommunenummer).await {
            return Some(info);
        }
        match self.client.get_kommune_info(kommunenummer).await {
            Ok(info) => {
                self.cache.put_kommune_info(&info).await;
                Some(info)
            }
            Err(e) => {
                tracing::warn!(%kommunenummer, error = %e, "Kunne ikke hente kommuneInfo");
                None
            }
        }
    }

    /// # Errors
    /// As [`Self::kommune_info_for_sak`].
    pub async fn er_innsyn_deaktivert_for_kommune(&self, sak: &DigisosSak) -> Result<bool, DomainError> {
        Ok(er_innsyn_deaktivert(self.kommune_info_for_sak(sak).await?.as_ref()))
    }

    /// # Errors
    /// As [`Self::hent_kommune_info`].
    pub async fn hent_kommune_response(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<KommuneResponse, DomainError> {
        let info = self.hent_kommune_info(digisos_id, bruker).await?;
        Ok(KommuneResponse::from_info(info.as_ref()))
    }
}
