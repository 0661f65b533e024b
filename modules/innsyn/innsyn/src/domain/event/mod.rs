//! Builds the internal model of an application by replaying the case
//! system's hendelser in order.

mod dokumentasjon_etterspurt;
mod dokumentasjonkrav;
mod forelopig_svar;
mod saks_status;
mod soknads_status;
mod tildelt_nav_kontor;
mod utbetaling;
mod vedtak_fattet;
mod vilkar;


use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use innsyn_sdk::{
    DigisosSak, JsonDigisosSoker, JsonFilreferanse, JsonHendelse, JsonSoknadsStatusStatus, JsonVedleggSpesifikasjon,
    VEDLEGG_KREVES_STATUS, VedleggHendelseType,
};

use crate::auth::InnloggetBruker;
use crate::config::FiksConfig;
use crate::domain::error::DomainError;
use crate::domain::model::{
    Fagsystem, Hendelse, HendelseTekstType, InternalDigisosSoker, Oppgave, SaksStatus, Soknadsmottaker,
    SoknadsStatus, UrlResponse,
};
use crate::domain::ports::{FeatureToggles, NorgClient};
use crate::domain::service::fiks::FiksService;
use crate::domain::service::innsyn::InnsynService;
use crate::domain::util::{
    dokumentlager_url, sha256_hex, to_local_date_time, today_oslo, unix_millis_to_local, url_fra_filreferanse,
};

/// Toggle for the DOKUMENTASJONKRAV history line.
pub const DOKUMENTASJONKRAV_ENABLED: &str = "sosialhjelp.innsyn.dokumentasjonkrav_enabled";

/// Oppgaver from the application itself are only shown this long.
const SOKNAD_KRAV_MAKS_ALDER_DAGER: u64 = 30;

/// Public link bases for documents referenced by hendelser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lenker {
    pub dokumentlager_url: String,
    pub svarut_url: String,
}

impl Lenker {
    #[must_use]
    pub fn from_config(cfg: &FiksConfig) -> Self {
        Self {
            dokumentlager_url: cfg.dokumentlager_url.clone(),
            svarut_url: cfg.svarut_url.clone(),
        }
    }

    #[must_use]
    pub fn dokumentlager(&self, dokumentlager_id: &str) -> String {
        dokumentlager_url(&self.dokumentlager_url, dokumentlager_id)
    }

    #[must_use]
    pub fn filreferanse(&self, referanse: &JsonFilreferanse) -> String {
        url_fra_filreferanse(&self.dokumentlager_url, &self.svarut_url, referanse)
    }
}

/// What the appliers need besides the model and the hendelse.
pub struct ApplyContext<'a> {
    pub lenker: &'a Lenker,
    pub norg: &'a dyn NorgClient,
    pub toggles: &'a dyn FeatureToggles,
    /// Fnr of the logged-in citizen, for user-targeted toggles.
    pub fnr: &'a str,
    /// Paper applications have no `originalSoknadNAV`.
    pub is_papir_soknad: bool,
}

/// Applies one hendelse to `model`.
///
/// # Errors
/// `DomainError::Unexpected` when the hendelse carries unparseable dates.
pub async fn apply_hendelse(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonHendelse,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    match hendelse {
        JsonHendelse::SoknadsStatus(h) => soknads_status::apply(model, h),
        JsonHendelse::TildeltNavKontor(h) => tildelt_nav_kontor::apply(model, h, ctx).await,
        JsonHendelse::SaksStatus(h) => saks_status::apply(model, h),
        JsonHendelse::VedtakFattet(h) => vedtak_fattet::apply(model, h, ctx),
        JsonHendelse::DokumentasjonEtterspurt(h) => dokumentasjon_etterspurt::apply(model, h, ctx),
        JsonHendelse::ForelopigSvar(h) => forelopig_svar::apply(model, h, ctx),
        JsonHendelse::Utbetaling(h) => utbetaling::apply(model, h),
        JsonHendelse::Vilkar(h) => vilkar::apply(model, h),
        JsonHendelse::Dokumentasjonkrav(h) => dokumentasjonkrav::apply(model, h, ctx),
        JsonHendelse::Rammevedtak(_) => Ok(()),
    }
}

/// Orders hendelser by timestamp. On ties an utbetaling comes before the
/// vilkar and dokumentasjonkrav that point at it, and MOTTATT comes before
/// UNDER_BEHANDLING.
#[must_use]
pub fn hendelse_ordering(a: &JsonHendelse, b: &JsonHendelse) -> Ordering {
    a.hendelsestidspunkt()
        .cmp(b.hendelsestidspunkt())
        .then_with(|| utbetaling_first(a, b))
        .then_with(|| mottatt_first(a, b))
}

fn utbetaling_first(a: &JsonHendelse, b: &JsonHendelse) -> Ordering {
    let refers_to_utbetaling = |h: &JsonHendelse| matches!(h, JsonHendelse::Vilkar(_) | JsonHendelse::Dokumentasjonkrav(_));
    match (a, b) {
        (JsonHendelse::Utbetaling(_), other) if refers_to_utbetaling(other) => Ordering::Less,
        (other, JsonHendelse::Utbetaling(_)) if refers_to_utbetaling(other) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn mottatt_first(a: &JsonHendelse, b: &JsonHendelse) -> Ordering {
    use JsonSoknadsStatusStatus::{Mottatt, UnderBehandling};
    let (JsonHendelse::SoknadsStatus(a), JsonHendelse::SoknadsStatus(b)) = (a, b) else {
        return Ordering::Equal;
    };
    match (a.status, b.status) {
        (Mottatt, UnderBehandling) => Ordering::Less,
        (UnderBehandling, Mottatt) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// "NAV Sandnes kommune" is shown as "NAV Sandnes".
#[must_use]
pub fn strip_enhetsnavn_for_kommune(navn: &str) -> String {
    navn.replace(" kommune", "")
}

pub struct EventService {
    innsyn: Arc<InnsynService>,
    fiks: Arc<FiksService>,
    norg: Arc<dyn NorgClient>,
    toggles: Arc<dyn FeatureToggles>,
    lenker: Lenker,
}

impl EventService {
    #[must_use]
    pub fn new(
        innsyn: Arc<InnsynService>,
        fiks: Arc<FiksService>,
        norg: Arc<dyn NorgClient>,
        toggles: Arc<dyn FeatureToggles>,
        lenker: Lenker,
    ) -> Self {
        Self {
            innsyn,
            fiks,
            norg,
            toggles,
            lenker,
        }
    }

    fn context<'a>(&'a self, sak: &DigisosSak, bruker: &'a InnloggetBruker) -> ApplyContext<'a> {
        ApplyContext {
            lenker: &self.lenker,
            norg: self.norg.as_ref(),
            toggles: self.toggles.as_ref(),
            fnr: &bruker.fnr,
            is_papir_soknad: sak.is_papir_soknad(),
        }
    }

    /// Full model of one application, including the "sent to office" line
    /// built from the original application.
    ///
    /// # Errors
    /// Upstream failures from Fiks, or malformed hendelser.
    #[tracing::instrument(skip_all, fields(fiks_digisos_id = %sak.fiks_digisos_id))]
    pub async fn create_model(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<InternalDigisosSoker, DomainError> {
        let json_digisos_soker = self.innsyn.hent_json_digisos_soker(sak, bruker).await?;
        let json_soknad = self.innsyn.hent_original_soknad(sak, bruker).await?;

        let mut model = InternalDigisosSoker::default();
        if let Some(avsender) = json_digisos_soker.as_ref().and_then(|j| j.avsender.as_ref()) {
            model.fagsystem = Some(Fagsystem {
                systemnavn: avsender.systemnavn.clone(),
                systemversjon: avsender.systemversjon.clone(),
            });
        }

        if let Some(original) = &sak.original_soknad_nav {
            set_tidspunkt_sendt_if_not_zero(&mut model, original.timestamp_sendt);
            model.referanse = Some(original.nav_ekstern_ref_id.clone());
            model.fiks_digisos_id = Some(sak.fiks_digisos_id.clone());

            let mottaker = json_soknad.as_ref().and_then(|s| s.mottaker.as_ref());
            if let (Some(mottaker), Some(tidspunkt)) = (mottaker, unix_millis_to_local(original.timestamp_sendt)) {
                model.soknadsmottaker = Some(Soknadsmottaker {
                    nav_enhetsnummer: mottaker.enhetsnummer.clone(),
                    nav_enhetsnavn: mottaker.nav_enhetsnavn.clone(),
                });
                model.historikk.push(
                    Hendelse::new(HendelseTekstType::SoknadSendTilKontor, tidspunkt)
                        .with_url(UrlResponse {
                            lenketekst: HendelseTekstType::SoknadSendTilKontorLenketekst,
                            link: self.lenker.dokumentlager(&original.soknad_dokument.dokumentlager_dokument_id),
                        })
                        .with_tekst_argument(Some(strip_enhetsnavn_for_kommune(&mottaker.nav_enhetsnavn))),
                );
            }
        }

        self.apply_hendelser_og_soknad_krav(json_digisos_soker.as_ref(), &mut model, sak, bruker)
            .await?;
        Ok(model)
    }

    /// Lighter model for the case list: no original application lookup.
    ///
    /// # Errors
    /// Upstream failures from Fiks, or malformed hendelser.
    #[tracing::instrument(skip_all, fields(fiks_digisos_id = %sak.fiks_digisos_id))]
    pub async fn create_saksoversikt_model(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<InternalDigisosSoker, DomainError> {
        let json_digisos_soker = self.innsyn.hent_json_digisos_soker(sak, bruker).await?;
        let mut model = InternalDigisosSoker {
            status: SoknadsStatus::Sendt,
            ..InternalDigisosSoker::default()
        };
        self.apply_hendelser_og_soknad_krav(json_digisos_soker.as_ref(), &mut model, sak, bruker)
            .await?;
        log_teknisk_sperre(json_digisos_soker.as_ref(), &model, sak);
        Ok(model)
    }

    /// Only the utbetaling hendelser, in timestamp order.
    ///
    /// # Errors
    /// Upstream failures from Fiks, or malformed hendelser.
    pub async fn hent_alle_utbetalinger(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<InternalDigisosSoker, DomainError> {
        let mut model = InternalDigisosSoker {
            fiks_digisos_id: Some(sak.fiks_digisos_id.clone()),
            ..InternalDigisosSoker::default()
        };
        let Some(json_digisos_soker) = self.innsyn.hent_json_digisos_soker(sak, bruker).await? else {
            return Ok(model);
        };
        let mut utbetalinger: Vec<&JsonHendelse> = json_digisos_soker
            .hendelser
            .iter()
            .filter(|h| matches!(h, JsonHendelse::Utbetaling(_)))
            .collect();
        utbetalinger.sort_by(|a, b| a.hendelsestidspunkt().cmp(b.hendelsestidspunkt()));

        let ctx = self.context(sak, bruker);
        for hendelse in utbetalinger {
            apply_hendelse(&mut model, hendelse, &ctx).await?;
        }
        Ok(model)
    }

    async fn apply_hendelser_og_soknad_krav(
        &self,
        json_digisos_soker: Option<&JsonDigisosSoker>,
        model: &mut InternalDigisosSoker,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        let mut hendelser: Vec<&JsonHendelse> = json_digisos_soker.map(|j| j.hendelser.iter().collect()).unwrap_or_default();
        hendelser.sort_by(|a, b| hendelse_ordering(a, b));

        let ctx = self.context(sak, bruker);
        for hendelse in &hendelser {
            apply_hendelse(model, hendelse, &ctx).await?;
        }

        let ingen_dokumentasjon_etterspurt = !hendelser
            .iter()
            .any(|h| matches!(h, JsonHendelse::DokumentasjonEtterspurt(_)));
        if let Some(original) = &sak.original_soknad_nav
            && ingen_dokumentasjon_etterspurt
            && sendt_for_mindre_enn_30_dager_siden(original.timestamp_sendt, today_oslo())
        {
            self.apply_soknad_krav(model, sak, bruker).await?;
        }

        override_soknadsstatus_if_active_saker_exists(model);
        Ok(())
    }

    /// Attachments the application itself declared as missing become oppgaver.
    async fn apply_soknad_krav(
        &self,
        model: &mut InternalDigisosSoker,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        let Some(original) = &sak.original_soknad_nav else {
            return Ok(());
        };
        let Some(tidspunkt) = unix_millis_to_local(original.timestamp_sendt) else {
            return Ok(());
        };
        let spesifikasjon: JsonVedleggSpesifikasjon = self
            .fiks
            .hent_dokument(&sak.fiks_digisos_id, &original.vedlegg_metadata, bruker)
            .await?;
        let oppgave_id = sha256_hex(&original.timestamp_sendt.to_string());

        model.oppgaver = spesifikasjon
            .vedlegg
            .into_iter()
            .filter(|v| v.status == VEDLEGG_KREVES_STATUS)
            .filter(|v| !(v.vedlegg_type == "annet" && v.tilleggsinfo.as_deref() == Some("annet")))
            .map(|v| Oppgave {
                oppgave_id: oppgave_id.clone(),
                tittel: v.vedlegg_type,
                tilleggsinfo: v.tilleggsinfo,
                hendelsetype: Some(VedleggHendelseType::Soknad),
                hendelsereferanse: None,
                innsendelsesfrist: None,
                tidspunkt_for_krav: tidspunkt,
                er_fra_innsyn: false,
            })
            .collect();
        Ok(())
    }
}

fn set_tidspunkt_sendt_if_not_zero(model: &mut InternalDigisosSoker, timestamp_sendt: i64) {
    if timestamp_sendt == 0 {
        tracing::error!("S\u{f8}knadens timestampSendt er 0");
    } else {
        model.tidspunkt_sendt = unix_millis_to_local(timestamp_sendt);
    }
}

fn sendt_for_mindre_enn_30_dager_siden(timestamp_sendt: i64, today: NaiveDate) -> bool {
    let Some(sendt) = unix_millis_to_local(timestamp_sendt) else {
        return false;
    };
    today
        .checked_sub_days(Days::new(SOKNAD_KRAV_MAKS_ALDER_DAGER))
        .is_some_and(|grense| sendt.date() > grense)
}

/// A sak without vedtak keeps the application open even after the
/// municipality marked it FERDIGBEHANDLET, so its oppgaver stay visible.
fn override_soknadsstatus_if_active_saker_exists(model: &mut InternalDigisosSoker) {
    if model.status != SoknadsStatus::Ferdigbehandlet {
        return;
    }
    let har_aktive_saker = model
        .saker
        .iter()
        .any(|s| s.vedtak.is_empty() && s.saks_status == Some(SaksStatus::UnderBehandling));
    if har_aktive_saker {
        tracing::info!("Overstyrer s\u{f8}knadsstatus fra FERDIGBEHANDLET til UNDER_BEHANDLING pga aktive saker");
        model.status = SoknadsStatus::UnderBehandling;
    }
}

/// Logs utbetalinger that are overdue so stuck payments can be followed up.
fn log_teknisk_sperre(json_digisos_soker: Option<&JsonDigisosSoker>, model: &InternalDigisosSoker, sak: &DigisosSak) {
    let today = today_oslo();
    let Some(i_gar) = today.pred_opt() else {
        return;
    };
    for utbetaling in &model.utbetalinger {
        let Some(forfallsdato) = utbetaling.forfallsdato.filter(|d| *d < i_gar) else {
            continue;
        };
        let sluttdato = utbetaling.utbetalingsdato.or(utbetaling.stoppetdato).unwrap_or(today);
        let mut opprettelsesdato = today;
        let mut eventer = Vec::new();
        for hendelse in json_digisos_soker.map(|j| j.hendelser.as_slice()).unwrap_or_default() {
            if let JsonHendelse::Utbetaling(h) = hendelse
                && h.utbetalingsreferanse == utbetaling.referanse
            {
                eventer.push((h.hendelsestidspunkt.as_str(), h.status));
                if let Ok(tidspunkt) = to_local_date_time(&h.hendelsestidspunkt) {
                    opprettelsesdato = opprettelsesdato.min(tidspunkt.date());
                }
            }
        }
        let startdato = forfallsdato.max(opprettelsesdato);
        tracing::info!(
            referanse = %utbetaling.referanse,
            fiks_digisos_id = %sak.fiks_digisos_id,
            status = ?utbetaling.status,
            tilbakevirkende = opprettelsesdato > forfallsdato,
            overdue_days = sluttdato.signed_duration_since(startdato).num_days(),
            utbetalingsdato = ?utbetaling.utbetalingsdato,
            forfallsdato = %forfallsdato,
            kommunenummer = %sak.kommunenummer,
            eventer = ?eventer,
            "Utbetaling p\u{e5} overtid"
        );
    }
}
