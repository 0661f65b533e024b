use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::model::{
    Hendelse, HendelseTekstType, HistorikkType, InternalDigisosSoker, UrlResponse, UtbetalingsStatus,
};
use crate::domain::ports::FeatureToggles;
use crate::domain::service::fiks::FiksService;
use crate::domain::service::vedlegg::{InternalVedlegg, VedleggService};
use crate::domain::util::{group_by, unix_millis_to_local};

/// Toggle for the VILKAR_OPPDATERT history line.
pub const VILKAR_ENABLED: &str = "sosialhjelp.innsyn.vilkar_enabled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HendelseResponse {
    pub tidspunkt: NaiveDateTime,
    pub hendelse_type: HendelseTekstType,
    pub url: Option<UrlResponse>,
    pub tekst_argument: Option<String>,
    pub saks_referanse: Option<String>,
    #[serde(rename = "type")]
    pub historikk_type: Option<HistorikkType>,
}

impl From<Hendelse> for HendelseResponse {
    fn from(h: Hendelse) -> Self {
        Self {
            tidspunkt: h.tidspunkt,
            hendelse_type: h.hendelse_type,
            url: h.url,
            tekst_argument: h.tekst_argument,
            saks_referanse: h.saks_referanse,
            historikk_type: h.historikk_type,
        }
    }
}

pub struct HendelseService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    vedlegg: Arc<VedleggService>,
    toggles: Arc<dyn FeatureToggles>,
}

impl HendelseService {
    #[must_use]
    pub fn new(
        fiks: Arc<FiksService>,
        events: Arc<EventService>,
        vedlegg: Arc<VedleggService>,
        toggles: Arc<dyn FeatureToggles>,
    ) -> Self {
        Self {
            fiks,
            events,
            vedlegg,
            toggles,
        }
    }

    /// The case history in time order, with lines for uploads, payment
    /// updates and (when toggled on) vilkar updates.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_hendelser(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Vec<HendelseResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let mut model = self.events.create_model(&sak, bruker).await?;

        let vedlegg = self.vedlegg.hent_ettersendte_vedlegg(&sak, &model, bruker).await?;
        if let Some(sendt) = sak
            .original_soknad_nav
            .as_ref()
            .and_then(|o| unix_millis_to_local(o.timestamp_sendt))
        {
            legg_til_hendelser_for_opplastinger(&mut model, sendt, &vedlegg);
        }
        legg_til_hendelser_for_utbetalinger(&mut model);
        if self.toggles.is_enabled(VILKAR_ENABLED, Some(&bruker.fnr), false) {
            legg_til_hendelser_for_vilkar(&mut model);
        }

        let mut historikk = model.historikk;
        historikk.sort_by_key(|h| h.tidspunkt);
        let responses: Vec<HendelseResponse> = historikk.into_iter().map(HendelseResponse::from).collect();
        tracing::info!(antall = responses.len(), "Hentet historikk");
        Ok(responses)
    }
}

/// One line per upload time, counting the files sent then.
fn legg_til_hendelser_for_opplastinger(
    model: &mut InternalDigisosSoker,
    soknad_sendt: NaiveDateTime,
    vedlegg: &[InternalVedlegg],
) {
    let etter_soknad = vedlegg
        .iter()
        .filter(|v| v.tidspunkt_lastet_opp > soknad_sendt && !v.dokument_info_list.is_empty());
    for (tidspunkt, samtidige) in group_by(etter_soknad, |v| v.tidspunkt_lastet_opp) {
        let antall: usize = samtidige.iter().map(|v| v.dokument_info_list.len()).sum();
        model.historikk.push(
            Hendelse::new(HendelseTekstType::AntallSendteVedlegg, tidspunkt).with_tekst_argument(Some(antall.to_string())),
        );
    }
}

fn legg_til_hendelser_for_utbetalinger(model: &mut InternalDigisosSoker) {
    let aktive = model
        .utbetalinger
        .iter()
        .filter(|u| u.status != UtbetalingsStatus::Annullert)
        .map(|u| u.dato_hendelse);
    let linjer: Vec<Hendelse> = group_by(aktive, |t| rund_ned_til_naermeste_5_minutt(*t))
        .into_iter()
        .filter_map(|(_, tider)| tider.first().copied())
        .map(|t| Hendelse::new(HendelseTekstType::UtbetalingerOppdatert, t))
        .collect();
    model.historikk.extend(linjer);
}

fn legg_til_hendelser_for_vilkar(model: &mut InternalDigisosSoker) {
    let endret = model
        .utbetalinger
        .iter()
        .flat_map(|u| u.vilkar.iter())
        .map(|v| v.dato_sist_endret);
    let linjer: Vec<Hendelse> = group_by(endret, |t| rund_ned_til_naermeste_5_minutt(*t))
        .into_iter()
        .filter_map(|(_, tider)| tider.first().copied())
        .map(|t| Hendelse::new(HendelseTekstType::VilkarOppdatert, t))
        .collect();
    model.historikk.extend(linjer);
}

fn rund_ned_til_naermeste_5_minutt(tidspunkt: NaiveDateTime) -> NaiveDateTime {
    let minutt = tidspunkt.minute() - tidspunkt.minute() % 5;
    tidspunkt
        .with_minute(minutt)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(tidspunkt)
}
