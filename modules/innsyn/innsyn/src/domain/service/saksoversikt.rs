use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::model::{DEFAULT_SAK_TITTEL, InternalDigisosSoker, SaksStatus, SoknadsStatus, UtbetalingsStatus};
use crate::domain::service::fiks::FiksService;
use crate::domain::service::oppgave::OppgaveService;
use crate::domain::util::{today_oslo, unix_millis_to_local};

pub const KILDE_INNSYN_API: &str = "innsyn-api";

/// Translation key the frontend replaces with a generic title.
const DEFAULT_SOKNAD_TITTEL: &str = "saker.default_tittel";

/// Vilkar and dokumentasjonkrav are hidden once every payment period ended
/// this many days ago.
const UTBETALINGSPERIODE_GRACE_DAGER: u64 = 21;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaksListeResponse {
    pub fiks_digisos_id: String,
    pub soknad_tittel: String,
    pub sist_oppdatert: NaiveDateTime,
    pub kilde: String,
    pub url: Option<String>,
    pub kommunenummer: String,
    pub is_broken_soknad: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaksDetaljerResponse {
    pub fiks_digisos_id: String,
    pub soknad_tittel: String,
    pub status: SoknadsStatus,
    pub antall_nye_oppgaver: usize,
    pub dokumentasjon_etterspurt: bool,
    pub vilkar: bool,
    pub dokumentasjonkrav: bool,
}

pub struct SaksOversiktService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    oppgaver: Arc<OppgaveService>,
}

impl SaksOversiktService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>, oppgaver: Arc<OppgaveService>) -> Self {
        Self { fiks, events, oppgaver }
    }

    /// Every non-empty case of the user, most recently changed first. Empty
    /// cases are usually misregistrations and are left out.
    ///
    /// # Errors
    /// Upstream failures from Fiks.
    #[tracing::instrument(skip_all)]
    pub async fn hent_alle_saker(&self, bruker: &InnloggetBruker) -> Result<Vec<SaksListeResponse>, DomainError> {
        let saker = self.fiks.hent_alle_digisos_saker(bruker).await?;
        let (tomme, gyldige): (Vec<_>, Vec<_>) = saker.into_iter().partition(innsyn_sdk::DigisosSak::is_empty);
        tracing::info!(
            tomme = tomme.len(),
            gyldige = gyldige.len(),
            tomme_ider = ?tomme.iter().map(|s| s.fiks_digisos_id.as_str()).collect::<Vec<_>>(),
            "Hentet s\u{f8}knader"
        );

        let mut responses: Vec<SaksListeResponse> = gyldige
            .into_iter()
            .map(|s| SaksListeResponse {
                sist_oppdatert: unix_millis_to_local(s.sist_endret).unwrap_or_default(),
                fiks_digisos_id: s.fiks_digisos_id,
                soknad_tittel: DEFAULT_SOKNAD_TITTEL.to_owned(),
                kilde: KILDE_INNSYN_API.to_owned(),
                url: None,
                kommunenummer: s.kommunenummer,
                is_broken_soknad: false,
            })
            .collect();
        responses.sort_by(|a, b| b.sist_oppdatert.cmp(&a.sist_oppdatert));
        Ok(responses)
    }

    /// Summary card for one case: titles, status and how much the citizen
    /// still has to answer.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_saks_detaljer(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<SaksDetaljerResponse, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_saksoversikt_model(&sak, bruker).await?;

        let antall_oppgaver = self.antall_nye_oppgaver(&model, digisos_id, bruker).await?;
        let (antall_vilkar, antall_dokumentasjonkrav) = if alle_utbetalinger_er_avsluttet(&model, today_oslo()) {
            (0, 0)
        } else {
            (
                self.antall_nye_vilkar(&model, digisos_id, bruker).await?,
                self.antall_nye_dokumentasjonkrav(&model, digisos_id, bruker).await?,
            )
        };

        Ok(SaksDetaljerResponse {
            fiks_digisos_id: sak.fiks_digisos_id.clone(),
            soknad_tittel: saks_navn(&model),
            status: model.status,
            antall_nye_oppgaver: antall_oppgaver + antall_vilkar + antall_dokumentasjonkrav,
            dokumentasjon_etterspurt: antall_oppgaver > 0,
            vilkar: antall_vilkar > 0,
            dokumentasjonkrav: antall_dokumentasjonkrav > 0,
        })
    }

    async fn antall_nye_oppgaver(
        &self,
        model: &InternalDigisosSoker,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<usize, DomainError> {
        if model.oppgaver.is_empty() {
            return Ok(0);
        }
        let oppgaver = self.oppgaver.hent_oppgaver(digisos_id, bruker).await?;
        Ok(oppgaver.iter().map(|o| o.oppgave_elementer.len()).sum())
    }

    async fn antall_nye_vilkar(
        &self,
        model: &InternalDigisosSoker,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<usize, DomainError> {
        if model.vilkar.is_empty() {
            return Ok(0);
        }
        Ok(self.oppgaver.get_vilkar(digisos_id, bruker).await?.len())
    }

    async fn antall_nye_dokumentasjonkrav(
        &self,
        model: &InternalDigisosSoker,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<usize, DomainError> {
        if model.dokumentasjonkrav.is_empty() {
            return Ok(0);
        }
        let krav = self.oppgaver.get_dokumentasjonkrav(digisos_id, bruker).await?;
        Ok(krav.iter().map(|k| k.dokumentasjonkrav_elementer.len()).sum())
    }
}

fn saks_navn(model: &InternalDigisosSoker) -> String {
    let titler: Vec<&str> = model
        .saker
        .iter()
        .filter(|s| s.saks_status != Some(SaksStatus::Feilregistrert))
        .map(|s| s.tittel.as_deref().unwrap_or(DEFAULT_SAK_TITTEL))
        .collect();
    if titler.is_empty() {
        DEFAULT_SOKNAD_TITTEL.to_owned()
    } else {
        titler.join(", ")
    }
}

/// True when there are utbetalinger and all of them are paid out or
/// cancelled with a period that ended more than three weeks ago.
fn alle_utbetalinger_er_avsluttet(model: &InternalDigisosSoker, today: NaiveDate) -> bool {
    let Some(grense) = today.checked_sub_days(Days::new(UTBETALINGSPERIODE_GRACE_DAGER)) else {
        return false;
    };
    !model.utbetalinger.is_empty()
        && model.utbetalinger.iter().all(|u| {
            matches!(u.status, UtbetalingsStatus::Utbetalt | UtbetalingsStatus::Annullert)
                && u.tom.is_some_and(|tom| tom < grense)
        })
}
