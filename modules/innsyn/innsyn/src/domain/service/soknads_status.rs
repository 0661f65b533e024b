use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::{EventService, Lenker};
use crate::domain::model::{HendelseTekstType, InternalDigisosSoker, SaksStatus, SoknadsStatus, UrlResponse};
use crate::domain::service::fiks::FiksService;
use crate::domain::service::kommune::KommuneService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtvidetSoknadsStatus {
    pub status: SoknadsStatus,
    pub tidspunkt_sendt: Option<NaiveDateTime>,
    /// Only shown when the municipality has innsyn turned off.
    pub nav_kontor: Option<String>,
    /// Only shown when the municipality has innsyn turned off.
    pub soknad_url: Option<UrlResponse>,
    pub kommunenummer: String,
    pub nav_ekstern_ref_id: Option<String>,
    pub tittel: Option<String>,
}

pub struct SoknadsStatusService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    kommune: Arc<KommuneService>,
    lenker: Lenker,
}

impl SoknadsStatusService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>, kommune: Arc<KommuneService>, lenker: Lenker) -> Self {
        Self {
            fiks,
            events,
            kommune,
            lenker,
        }
    }

    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_soknads_status(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<UtvidetSoknadsStatus, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        tracing::info!(status = ?model.status, "Hentet n\u{e5}v\u{e6}rende s\u{f8}knadsstatus");

        let deaktivert = self.kommune.er_innsyn_deaktivert_for_kommune(&sak).await?;
        let soknad_url = sak
            .original_soknad_nav
            .as_ref()
            .map(|o| UrlResponse {
                lenketekst: HendelseTekstType::VisBrevetLenketekst,
                link: self.lenker.dokumentlager(&o.soknad_dokument.dokumentlager_dokument_id),
            })
            .filter(|_| deaktivert);

        Ok(UtvidetSoknadsStatus {
            status: model.status,
            tidspunkt_sendt: model.tidspunkt_sendt,
            nav_kontor: model
                .soknadsmottaker
                .as_ref()
                .map(|m| m.nav_enhetsnavn.clone())
                .filter(|_| deaktivert),
            soknad_url,
            kommunenummer: sak.kommunenummer.clone(),
            nav_ekstern_ref_id: sak.original_soknad_nav.as_ref().map(|o| o.nav_ekstern_ref_id.clone()),
            tittel: saks_titler(&model),
        })
    }
}

/// Titles of all live saker, comma separated.
fn saks_titler(model: &InternalDigisosSoker) -> Option<String> {
    let titler: Vec<&str> = model
        .saker
        .iter()
        .filter(|s| s.saks_status != Some(SaksStatus::Feilregistrert))
        .filter_map(|s| s.tittel.as_deref())
        .collect();
    if titler.is_empty() { None } else { Some(titler.join(", ")) }
}
