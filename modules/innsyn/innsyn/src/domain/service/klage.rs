use std::sync::Arc;

use innsyn_sdk::{FiksKlage, JsonVedleggSpesifikasjon, KlageInput};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::Lenker;
use crate::domain::model::{FilUrl, KlageStatus, KlageUtkast};
use crate::domain::ports::{KlageClient, KlageUtkastRepository};
use crate::domain::service::fiks::FiksService;
use crate::domain::util::{now_oslo, today_oslo, unix_millis_to_local};

/// A klage as shown to the citizen: either sent to Fiks or still a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KlageDto {
    Sendt(SendtKlageDto),
    Utkast(KlageUtkastDto),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendtKlageDto {
    pub uuid: String,
    pub fiks_digisos_id: String,
    pub klage_url: Option<FilUrl>,
    pub status: KlageStatus,
    pub paaklaget_vedtak_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlageUtkastDto {
    pub uuid: Uuid,
    pub fiks_digisos_id: String,
    pub klage_tekst: Option<String>,
    pub vedtak_refs: Vec<String>,
}

impl From<KlageUtkast> for KlageUtkastDto {
    fn from(utkast: KlageUtkast) -> Self {
        Self {
            uuid: utkast.id,
            fiks_digisos_id: utkast.fiks_digisos_id,
            klage_tekst: utkast.klage_tekst,
            vedtak_refs: utkast.vedtak_refs,
        }
    }
}

pub struct KlageService {
    fiks: Arc<FiksService>,
    klient: Arc<dyn KlageClient>,
    utkast: Arc<dyn KlageUtkastRepository>,
    lenker: Lenker,
}

impl KlageService {
    #[must_use]
    pub fn new(
        fiks: Arc<FiksService>,
        klient: Arc<dyn KlageClient>,
        utkast: Arc<dyn KlageUtkastRepository>,
        lenker: Lenker,
    ) -> Self {
        Self {
            fiks,
            klient,
            utkast,
            lenker,
        }
    }

    /// Starts an empty draft on a case the citizen owns.
    ///
    /// # Errors
    /// Fiks or tilgang failures, or `Unexpected` when the draft cannot be
    /// stored.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn opprett_klage(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Uuid, DomainError> {
        self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let utkast = KlageUtkast::new(digisos_id);
        self.utkast.insert(&utkast).await?;
        tracing::info!(klage_id = %utkast.id, "Opprettet klageutkast");
        Ok(utkast.id)
    }

    /// # Errors
    /// `NotFound` when the draft does not exist on this case, `BadRequest`
    /// when the body names another case.
    #[tracing::instrument(skip(self, input, bruker))]
    pub async fn oppdater_klage(
        &self,
        digisos_id: &str,
        klage_id: Uuid,
        input: KlageInput,
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        if input.fiks_digisos_id != digisos_id {
            return Err(DomainError::bad_request("fiksDigisosId i body matcher ikke path"));
        }
        let mut utkast = self.hent_utkast(digisos_id, klage_id, bruker).await?;
        utkast.klage_tekst = Some(input.klage_tekst);
        utkast.vedtak_refs = input.vedtaks_ids;
        utkast.updated_at = chrono::Utc::now();
        if !self.utkast.update(&utkast).await? {
            return Err(DomainError::not_found(format!("Klageutkast {klage_id} finnes ikke")));
        }
        Ok(())
    }

    /// # Errors
    /// `NotFound` when the draft does not exist on this case.
    pub async fn hent_klage_utkast(
        &self,
        digisos_id: &str,
        klage_id: Uuid,
        bruker: &InnloggetBruker,
    ) -> Result<KlageUtkastDto, DomainError> {
        self.hent_utkast(digisos_id, klage_id, bruker).await.map(KlageUtkastDto::from)
    }

    /// Sent klager from Fiks followed by the drafts still being written.
    ///
    /// # Errors
    /// Fiks failures or `Unexpected` from draft storage.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_klager(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Vec<KlageDto>, DomainError> {
        self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let sendte = self.klient.hent_klager(digisos_id, &bruker.token).await?;
        let utkast = self.utkast.list_for_sak(digisos_id).await?;

        let mut klager: Vec<KlageDto> = sendte
            .into_iter()
            .map(|k| KlageDto::Sendt(self.sendt_klage_dto(k)))
            .collect();
        klager.extend(utkast.into_iter().map(|u| KlageDto::Utkast(u.into())));
        tracing::info!(antall = klager.len(), "Hentet klager");
        Ok(klager)
    }

    /// Sends a finished draft to Fiks and removes it.
    ///
    /// # Errors
    /// `BadRequest` when the draft has no text or no vedtak, Fiks failures
    /// otherwise.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn send_klage(&self, digisos_id: &str, klage_id: Uuid, bruker: &InnloggetBruker) -> Result<(), DomainError> {
        let utkast = self.hent_utkast(digisos_id, klage_id, bruker).await?;
        let klage_tekst = utkast
            .klage_tekst
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::bad_request("Klagen mangler begrunnelse"))?;
        let Some(vedtak_id) = utkast.vedtak_refs.first() else {
            return Err(DomainError::bad_request("Klagen mangler vedtak"));
        };

        let klage_json = json!({
            "klageId": klage_id,
            "vedtakId": vedtak_id,
            "digisosId": digisos_id,
            "innsendingstidspunkt": now_oslo(),
            "begrunnelse": { "klageTekst": klage_tekst },
            "personIdentifikator": bruker.fnr,
        });
        self.klient
            .send_klage(
                digisos_id,
                klage_id,
                vedtak_id,
                klage_json,
                &JsonVedleggSpesifikasjon::default(),
                &bruker.token,
            )
            .await?;

        if !self.utkast.delete(klage_id).await? {
            tracing::warn!(%klage_id, "Klageutkast var allerede slettet");
        }
        tracing::info!(%klage_id, "Sendt klage");
        Ok(())
    }

    async fn hent_utkast(&self, digisos_id: &str, klage_id: Uuid, bruker: &InnloggetBruker) -> Result<KlageUtkast, DomainError> {
        self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        self.utkast
            .find(klage_id)
            .await?
            .filter(|u| u.fiks_digisos_id == digisos_id)
            .ok_or_else(|| DomainError::not_found(format!("Klageutkast {klage_id} finnes ikke")))
    }

    fn sendt_klage_dto(&self, klage: FiksKlage) -> SendtKlageDto {
        let sendt_status = klage.sendt_kvittering.as_ref().map(|k| &k.sendt_status);
        let dato = sendt_status
            .and_then(|s| unix_millis_to_local(s.timestamp))
            .map_or_else(today_oslo, |t| t.date());
        let klage_url = klage.klage_dokument.as_ref().map(|d| FilUrl {
            dato,
            url: self.lenker.dokumentlager(&d.dokumentlager_dokument_id),
            id: d.dokumentlager_dokument_id.clone(),
        });
        SendtKlageDto {
            uuid: klage.klage_id,
            fiks_digisos_id: klage.digisos_id,
            klage_url,
            status: klage_status(sendt_status.map(|s| s.status.as_str())),
            paaklaget_vedtak_refs: vec![klage.vedtak_id],
        }
    }
}

/// Fiks only reports delivery; a confirmed delivery means the office has
/// received the klage.
fn klage_status(sendt_status: Option<&str>) -> KlageStatus {
    match sendt_status {
        Some("BEKREFTET") => KlageStatus::Mottatt,
        _ => KlageStatus::Sendt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_delivery_is_mottatt() {
        assert_eq!(klage_status(Some("BEKREFTET")), KlageStatus::Mottatt);
        assert_eq!(klage_status(Some("SENDT")), KlageStatus::Sendt);
        assert_eq!(klage_status(Some("SVARUT_FEIL")), KlageStatus::Sendt);
        assert_eq!(klage_status(None), KlageStatus::Sendt);
    }
}
