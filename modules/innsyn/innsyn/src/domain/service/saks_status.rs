use std::sync::Arc;

use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::model::{DEFAULT_SAK_TITTEL, FilUrl, Sak, SaksStatus, UtfallVedtak};
use crate::domain::ports::KlageClient;
use crate::domain::service::fiks::FiksService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaksStatusResponse {
    pub tittel: String,
    pub status: SaksStatus,
    pub skal_vise_vedtak_info_panel: bool,
    pub vedtaksfil_url_list: Option<Vec<FilUrl>>,
    pub utfall_vedtak: Option<UtfallVedtak>,
    pub referanse: String,
    pub vedtak_id_list: Vec<String>,
    pub klage_ref: Option<KlageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlageRef {
    pub klage_id: String,
    pub vedtak_id: String,
}

pub struct SaksStatusService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    klager: Arc<dyn KlageClient>,
}

impl SaksStatusService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>, klager: Arc<dyn KlageClient>) -> Self {
        Self { fiks, events, klager }
    }

    /// Every sak except FEILREGISTRERT ones. An empty list means the
    /// municipality has not opened any sak yet.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_saks_statuser(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<SaksStatusResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        if model.saker.is_empty() {
            tracing::info!("Fant ingen saker");
            return Ok(Vec::new());
        }

        let vedtak_ids: Vec<&str> = model
            .saker
            .iter()
            .flat_map(|s| s.vedtak.iter().map(|v| v.id.as_str()))
            .collect();
        let klage_ref = self.hent_klage_ref(digisos_id, &vedtak_ids, bruker).await;

        let responses: Vec<SaksStatusResponse> = model
            .saker
            .iter()
            .filter(|s| s.saks_status != Some(SaksStatus::Feilregistrert))
            .map(|s| map_to_response(s, klage_ref.clone()))
            .collect();
        tracing::info!(antall = responses.len(), "Hentet saker");
        Ok(responses)
    }

    /// Only the latest vedtak of a sak can be appealed, so the first klage
    /// on any of the case's vedtak is the one to show.
    async fn hent_klage_ref(&self, digisos_id: &str, vedtak_ids: &[&str], bruker: &InnloggetBruker) -> Option<KlageRef> {
        if vedtak_ids.is_empty() {
            return None;
        }
        match self.klager.hent_klager(digisos_id, &bruker.token).await {
            Ok(klager) => klager
                .into_iter()
                .find(|k| vedtak_ids.contains(&k.vedtak_id.as_str()))
                .map(|k| KlageRef {
                    klage_id: k.klage_id,
                    vedtak_id: k.vedtak_id,
                }),
            Err(e) => {
                tracing::warn!(error = %e, "Kunne ikke hente klager for saken");
                None
            }
        }
    }
}

fn map_to_response(sak: &Sak, klage_ref: Option<KlageRef>) -> SaksStatusResponse {
    let status = if sak.vedtak.is_empty() {
        sak.saks_status.unwrap_or(SaksStatus::UnderBehandling)
    } else {
        SaksStatus::Ferdigbehandlet
    };
    let vedtaksfiler: Vec<FilUrl> = sak
        .vedtak
        .iter()
        .map(|v| FilUrl {
            dato: v.dato,
            url: v.vedtaksfil_url.clone(),
            id: v.id.clone(),
        })
        .collect();
    SaksStatusResponse {
        tittel: sak.tittel.clone().unwrap_or_else(|| DEFAULT_SAK_TITTEL.to_owned()),
        status,
        skal_vise_vedtak_info_panel: skal_vise_vedtak_info_panel(sak),
        vedtaksfil_url_list: if vedtaksfiler.is_empty() { None } else { Some(vedtaksfiler) },
        utfall_vedtak: sak.vedtak.last().and_then(|v| v.utfall),
        referanse: sak.referanse.clone(),
        vedtak_id_list: sak.vedtak.iter().map(|v| v.id.clone()).collect(),
        klage_ref,
    }
}

/// The info panel is shown when the latest vedtak grants (some of) the
/// application.
#[must_use]
pub fn skal_vise_vedtak_info_panel(sak: &Sak) -> bool {
    sak.vedtak
        .last()
        .and_then(|v| v.utfall)
        .is_some_and(|u| matches!(u, UtfallVedtak::Innvilget | UtfallVedtak::DelvisInnvilget))
}
