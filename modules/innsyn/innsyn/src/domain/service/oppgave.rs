use std::sync::Arc;

use chrono::NaiveDate;
use innsyn_sdk::VedleggHendelseType;
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::model::{Dokumentasjonkrav, Oppgave, Oppgavestatus, SoknadsStatus};
use crate::domain::service::fiks::FiksService;
use crate::domain::service::vedlegg::{InternalVedlegg, VedleggService};
use crate::domain::util::group_by;

/// Oppgaver sharing one deadline. The oppgave id and the deadline are
/// always one to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OppgaveResponse {
    pub innsendelsesfrist: Option<NaiveDate>,
    pub oppgave_id: String,
    pub oppgave_elementer: Vec<OppgaveElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OppgaveElement {
    pub dokumenttype: String,
    pub tilleggsinformasjon: Option<String>,
    pub hendelsetype: Option<VedleggHendelseType>,
    pub hendelsereferanse: Option<String>,
    pub er_fra_innsyn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VilkarResponse {
    pub hendelsetidspunkt: NaiveDate,
    pub vilkar_referanse: String,
    pub tittel: String,
    pub beskrivelse: Option<String>,
    pub status: Oppgavestatus,
    pub utbetalings_referanse: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DokumentasjonkravResponse {
    pub dokumentasjonkrav_id: String,
    pub frist: Option<NaiveDate>,
    pub dokumentasjonkrav_elementer: Vec<DokumentasjonkravElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DokumentasjonkravElement {
    pub hendelsetidspunkt: NaiveDate,
    pub hendelsetype: VedleggHendelseType,
    pub dokumentasjonkrav_referanse: String,
    pub tittel: String,
    pub beskrivelse: Option<String>,
    pub status: Oppgavestatus,
    pub utbetalings_referanse: Vec<String>,
}

pub struct OppgaveService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    vedlegg: Arc<VedleggService>,
}

impl OppgaveService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>, vedlegg: Arc<VedleggService>) -> Self {
        Self { fiks, events, vedlegg }
    }

    /// Open oppgaver grouped by deadline, earliest first. Oppgaver already
    /// answered by an ettersendelse are left out.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_oppgaver(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Vec<OppgaveResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        if model.status == SoknadsStatus::Ferdigbehandlet || model.oppgaver.is_empty() {
            return Ok(Vec::new());
        }

        let ettersendte = self.vedlegg.hent_ettersendte_vedlegg(&sak, &model, bruker).await?;
        let apne: Vec<&Oppgave> = model
            .oppgaver
            .iter()
            .filter(|o| !oppgave_er_lastet_opp(o, &ettersendte))
            .collect();

        let mut responses: Vec<OppgaveResponse> = group_by(apne, |o| o.innsendelsesfrist.map(|f| f.date()))
            .into_iter()
            .map(|(frist, oppgaver)| OppgaveResponse {
                innsendelsesfrist: frist,
                oppgave_id: oppgaver.first().map(|o| o.oppgave_id.clone()).unwrap_or_default(),
                oppgave_elementer: oppgaver
                    .into_iter()
                    .map(|o| OppgaveElement {
                        dokumenttype: o.tittel.clone(),
                        tilleggsinformasjon: o.tilleggsinfo.clone(),
                        hendelsetype: o.hendelsetype,
                        hendelsereferanse: o.hendelsereferanse.clone(),
                        er_fra_innsyn: o.er_fra_innsyn,
                    })
                    .collect(),
            })
            .collect();
        responses.sort_by_key(|r| r.innsendelsesfrist);

        let antall: usize = responses.iter().map(|r| r.oppgave_elementer.len()).sum();
        tracing::info!(antall, "Hentet oppgaver");
        Ok(responses)
    }

    /// # Errors
    /// As [`Self::hent_oppgaver`].
    pub async fn hent_oppgaver_med_oppgave_id(
        &self,
        digisos_id: &str,
        oppgave_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<OppgaveResponse>, DomainError> {
        let mut oppgaver = self.hent_oppgaver(digisos_id, bruker).await?;
        oppgaver.retain(|o| o.oppgave_id == oppgave_id);
        Ok(oppgaver)
    }

    /// RELEVANT vilkar, oldest first.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn get_vilkar(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Vec<VilkarResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;

        let mut responses: Vec<VilkarResponse> = model
            .vilkar
            .iter()
            .filter(|v| {
                if v.is_empty() {
                    tracing::error!("Tittel og beskrivelse p\u{e5} vilk\u{e5}r er tomt");
                }
                !v.is_empty()
            })
            .filter(|v| v.status == Oppgavestatus::Relevant)
            .map(|v| {
                let (tittel, beskrivelse) = v.tittel_og_beskrivelse();
                VilkarResponse {
                    hendelsetidspunkt: v.dato_lagt_til.date(),
                    vilkar_referanse: v.referanse.clone(),
                    tittel,
                    beskrivelse,
                    status: v.status,
                    utbetalings_referanse: v.utbetalings_referanse.clone(),
                }
            })
            .collect();
        responses.sort_by_key(|v| v.hendelsetidspunkt);
        tracing::info!(antall = responses.len(), "Hentet vilkar");
        Ok(responses)
    }

    /// RELEVANT dokumentasjonkrav not yet answered, grouped by deadline.
    /// Krav without deadline come last.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn get_dokumentasjonkrav(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<DokumentasjonkravResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        if model.dokumentasjonkrav.is_empty() {
            return Ok(Vec::new());
        }

        let ettersendte = self.vedlegg.hent_ettersendte_vedlegg(&sak, &model, bruker).await?;
        let apne: Vec<&Dokumentasjonkrav> = ikke_tomme(&model.dokumentasjonkrav)
            .filter(|k| !dokumentasjonkrav_er_lastet_opp(k, &ettersendte))
            .filter(|k| k.status == Oppgavestatus::Relevant)
            .collect();

        let mut responses: Vec<DokumentasjonkravResponse> = group_by(apne, |k| k.frist)
            .into_iter()
            .map(|(frist, krav)| DokumentasjonkravResponse {
                dokumentasjonkrav_id: krav
                    .first()
                    .map(|k| k.dokumentasjonkrav_id.clone())
                    .unwrap_or_default(),
                frist,
                dokumentasjonkrav_elementer: krav.into_iter().map(dokumentasjonkrav_element).collect(),
            })
            .collect();
        responses.sort_by_key(|r| (r.frist.is_none(), r.frist));

        let antall: usize = responses.iter().map(|r| r.dokumentasjonkrav_elementer.len()).sum();
        tracing::info!(antall, "Hentet dokumentasjonkrav");
        Ok(responses)
    }

    /// # Errors
    /// As [`Self::get_dokumentasjonkrav`].
    pub async fn get_dokumentasjonkrav_med_id(
        &self,
        digisos_id: &str,
        dokumentasjonkrav_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<DokumentasjonkravResponse>, DomainError> {
        let mut krav = self.get_dokumentasjonkrav(digisos_id, bruker).await?;
        krav.retain(|k| k.dokumentasjonkrav_id == dokumentasjonkrav_id);
        Ok(krav)
    }

    /// Whether any dokumentasjonkrav has been answered by an ettersendelse.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    pub async fn har_levert_dokumentasjonkrav(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<bool, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        if model.dokumentasjonkrav.is_empty() {
            return Ok(false);
        }
        let ettersendte = self.vedlegg.hent_ettersendte_vedlegg(&sak, &model, bruker).await?;
        let levert = ikke_tomme(&model.dokumentasjonkrav).any(|k| dokumentasjonkrav_er_lastet_opp(k, &ettersendte));
        Ok(levert)
    }
}

fn ikke_tomme(krav: &[Dokumentasjonkrav]) -> impl Iterator<Item = &Dokumentasjonkrav> {
    krav.iter().filter(|k| {
        if k.is_empty() {
            tracing::error!("Tittel og beskrivelse p\u{e5} dokumentasjonkrav er tomt");
        }
        !k.is_empty()
    })
}

fn dokumentasjonkrav_element(krav: &Dokumentasjonkrav) -> DokumentasjonkravElement {
    let (tittel, beskrivelse) = krav.tittel_og_beskrivelse();
    DokumentasjonkravElement {
        hendelsetidspunkt: krav.dato_lagt_til.date(),
        hendelsetype: krav.hendelsetype,
        dokumentasjonkrav_referanse: krav.referanse.clone(),
        tittel,
        beskrivelse,
        status: krav.status,
        utbetalings_referanse: krav.utbetalings_referanse.clone(),
    }
}

/// An oppgave is answered by a vedlegg of the same type sent after the
/// request was made.
fn oppgave_er_lastet_opp(oppgave: &Oppgave, vedlegg: &[InternalVedlegg]) -> bool {
    vedlegg
        .iter()
        .filter(|v| v.vedlegg_type == oppgave.tittel && v.tilleggsinfo == oppgave.tilleggsinfo)
        .any(|v| v.tidspunkt_lastet_opp > oppgave.tidspunkt_for_krav)
}

fn dokumentasjonkrav_er_lastet_opp(krav: &Dokumentasjonkrav, vedlegg: &[InternalVedlegg]) -> bool {
    vedlegg
        .iter()
        .filter(|v| Some(&v.vedlegg_type) == krav.tittel.as_ref() && v.tilleggsinfo == krav.beskrivelse)
        .any(|v| krav.frist.is_none() || v.tidspunkt_lastet_opp > krav.dato_lagt_til)
}
