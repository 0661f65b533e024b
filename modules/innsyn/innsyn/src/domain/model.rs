//! Internal model of one application, built by replaying its event stream.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use innsyn_sdk::VedleggHendelseType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::util::sha256_hex;

/// Title given to a sak that had to be created implicitly.
pub const DEFAULT_SAK_TITTEL: &str = "default_sak_tittel";

/// Referanse of the sak used when a hendelse names no known sak.
pub const DEFAULT_SAK_REFERANSE: &str = "default";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalDigisosSoker {
    pub referanse: Option<String>,
    pub status: SoknadsStatus,
    pub fiks_digisos_id: Option<String>,
    pub tidspunkt_sendt: Option<NaiveDateTime>,
    pub soknadsmottaker: Option<Soknadsmottaker>,
    pub tildelt_nav_kontor: Option<String>,
    pub saker: Vec<Sak>,
    /// Every utbetaling on the application; `saksreferanse` ties it to a sak.
    pub utbetalinger: Vec<Utbetaling>,
    pub forvaltningsbrev: Vec<Forvaltningsbrev>,
    pub oppgaver: Vec<Oppgave>,
    pub historikk: Vec<Hendelse>,
    pub vilkar: Vec<Vilkar>,
    pub dokumentasjonkrav: Vec<Dokumentasjonkrav>,
    pub forelopig_svar: ForelopigSvar,
    pub fagsystem: Option<Fagsystem>,
}

impl InternalDigisosSoker {
    #[must_use]
    pub fn sak(&self, referanse: &str) -> Option<&Sak> {
        self.saker.iter().find(|s| s.referanse == referanse)
    }

    /// Utbetalinger attached to the sak with `referanse`.
    pub fn utbetalinger_for_sak<'a>(&'a self, referanse: &'a str) -> impl Iterator<Item = &'a Utbetaling> + 'a {
        self.utbetalinger
            .iter()
            .filter(move |u| u.saksreferanse.as_deref() == Some(referanse))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soknadsmottaker {
    pub nav_enhetsnummer: String,
    pub nav_enhetsnavn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forvaltningsbrev {
    pub referanse: String,
    pub tittel: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fagsystem {
    pub systemnavn: String,
    pub systemversjon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForelopigSvar {
    pub har_mottatt_forelopig_svar: bool,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sak {
    pub referanse: String,
    pub saks_status: Option<SaksStatus>,
    pub tittel: Option<String>,
    pub vedtak: Vec<Vedtak>,
}

impl Sak {
    #[must_use]
    pub fn new(referanse: impl Into<String>, saks_status: Option<SaksStatus>, tittel: Option<String>) -> Self {
        Self {
            referanse: referanse.into(),
            saks_status,
            tittel,
            vedtak: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vedtak {
    pub id: String,
    pub utfall: Option<UtfallVedtak>,
    pub vedtaksfil_url: String,
    pub dato: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utbetaling {
    pub referanse: String,
    pub saksreferanse: Option<String>,
    pub status: UtbetalingsStatus,
    pub belop: rust_decimal::Decimal,
    pub beskrivelse: Option<String>,
    pub forfallsdato: Option<NaiveDate>,
    pub utbetalingsdato: Option<NaiveDate>,
    pub stoppetdato: Option<NaiveDate>,
    pub fom: Option<NaiveDate>,
    pub tom: Option<NaiveDate>,
    pub mottaker: Option<String>,
    pub annen_mottaker: bool,
    pub kontonummer: Option<String>,
    pub utbetalingsmetode: Option<String>,
    pub vilkar: Vec<Vilkar>,
    pub dokumentasjonkrav: Vec<Dokumentasjonkrav>,
    pub dato_hendelse: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vilkar {
    pub referanse: String,
    pub tittel: Option<String>,
    pub beskrivelse: Option<String>,
    pub status: Oppgavestatus,
    pub dato_lagt_til: NaiveDateTime,
    pub dato_sist_endret: NaiveDateTime,
    pub utbetalings_referanse: Vec<String>,
}

impl Vilkar {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        is_blank(self.tittel.as_deref()) && is_blank(self.beskrivelse.as_deref())
    }

    #[must_use]
    pub fn tittel_og_beskrivelse(&self) -> (String, Option<String>) {
        tittel_og_beskrivelse(self.tittel.as_deref(), self.beskrivelse.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dokumentasjonkrav {
    pub dokumentasjonkrav_id: String,
    pub referanse: String,
    pub hendelsetype: VedleggHendelseType,
    pub tittel: Option<String>,
    pub beskrivelse: Option<String>,
    pub status: Oppgavestatus,
    pub dato_lagt_til: NaiveDateTime,
    pub frist: Option<NaiveDate>,
    pub utbetalings_referanse: Vec<String>,
}

impl Dokumentasjonkrav {
    /// Id shared by all krav with the same deadline.
    #[must_use]
    pub fn id_for_frist(frist: Option<NaiveDate>) -> String {
        sha256_hex(&frist.map(|f| f.to_string()).unwrap_or_default())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        is_blank(self.tittel.as_deref()) && is_blank(self.beskrivelse.as_deref())
    }

    #[must_use]
    pub fn tittel_og_beskrivelse(&self) -> (String, Option<String>) {
        tittel_og_beskrivelse(self.tittel.as_deref(), self.beskrivelse.as_deref())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Caseworker systems sometimes put the whole text in `beskrivelse`; promote
/// it to the title then.
fn tittel_og_beskrivelse(tittel: Option<&str>, beskrivelse: Option<&str>) -> (String, Option<String>) {
    match tittel {
        Some(t) if !t.trim().is_empty() => (t.to_owned(), beskrivelse.map(ToOwned::to_owned)),
        _ => (beskrivelse.unwrap_or_default().to_owned(), None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oppgave {
    pub oppgave_id: String,
    pub tittel: String,
    pub tilleggsinfo: Option<String>,
    pub hendelsetype: Option<VedleggHendelseType>,
    pub hendelsereferanse: Option<String>,
    pub innsendelsesfrist: Option<NaiveDateTime>,
    pub tidspunkt_for_krav: NaiveDateTime,
    pub er_fra_innsyn: bool,
}

/// One line in the citizen-facing history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hendelse {
    pub hendelse_type: HendelseTekstType,
    pub tidspunkt: NaiveDateTime,
    pub url: Option<UrlResponse>,
    pub tekst_argument: Option<String>,
    pub saks_referanse: Option<String>,
    pub historikk_type: Option<HistorikkType>,
}

impl Hendelse {
    #[must_use]
    pub fn new(hendelse_type: HendelseTekstType, tidspunkt: NaiveDateTime) -> Self {
        Self {
            hendelse_type,
            tidspunkt,
            url: None,
            tekst_argument: None,
            saks_referanse: None,
            historikk_type: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: UrlResponse) -> Self {
        self.url = Some(url);
        self
    }

    #[must_use]
    pub fn with_tekst_argument(mut self, argument: Option<String>) -> Self {
        self.tekst_argument = argument;
        self
    }

    #[must_use]
    pub fn with_saks_referanse(mut self, referanse: Option<String>) -> Self {
        self.saks_referanse = referanse;
        self
    }

    #[must_use]
    pub fn with_historikk_type(mut self, historikk_type: HistorikkType) -> Self {
        self.historikk_type = Some(historikk_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResponse {
    pub lenketekst: HendelseTekstType,
    pub link: String,
}

/// A dated link to a document, with the id it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilUrl {
    pub dato: NaiveDate,
    pub url: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistorikkType {
    TildeltNavKontor,
}

/// Text keys the frontend translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HendelseTekstType {
    SoknadSendTilKontor,
    SoknadSendTilKontorLenketekst,
    SoknadMottattHosKommune,
    SoknadMottattMedKommunenavn,
    SoknadMottattUtenKommunenavn,
    SoknadUnderBehandling,
    SoknadFerdigbehandlet,
    SoknadBehandlesIkke,
    SoknadVideresendtMedNorgEnhet,
    SoknadVideresendtUtenNorgEnhet,
    SoknadVideresendtPapirsoknadMedNorgEnhet,
    SoknadVideresendtPapirsoknadUtenNorgEnhet,
    SoknadKanIkkeViseStatusMedTittel,
    SoknadKanIkkeViseStatusUtenTittel,
    SakUnderBehandlingMedTittel,
    SakUnderBehandlingUtenTittel,
    SakKanIkkeViseStatusMedTittel,
    SakKanIkkeViseStatusUtenTittel,
    SakFerdigbehandletMedTittel,
    SakFerdigbehandletUtenTittel,
    VisBrevetLenketekst,
    EttersporMerDokumentasjon,
    EttersporIkkeMerDokumentasjon,
    BrevOmSaksbeandlingstid,
    Dokumentasjonkrav,
    AntallSendteVedlegg,
    UtbetalingerOppdatert,
    VilkarOppdatert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoknadsStatus {
    #[default]
    Sendt,
    Mottatt,
    UnderBehandling,
    Ferdigbehandlet,
    BehandlesIkke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaksStatus {
    UnderBehandling,
    IkkeInnsyn,
    Ferdigbehandlet,
    BehandlesIkke,
    Feilregistrert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtbetalingsStatus {
    PlanlagtUtbetaling,
    Utbetalt,
    Stoppet,
    Annullert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtfallVedtak {
    Innvilget,
    DelvisInnvilget,
    Avslatt,
    Avvist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Oppgavestatus {
    Relevant,
    Annullert,
    Oppfylt,
    IkkeOppfylt,
    LevertTidligere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KlageStatus {
    Sendt,
    Mottatt,
    UnderBehandling,
    FerdigBehandlet,
    HosStatsforvalter,
}

/// A klage the citizen is still writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlageUtkast {
    pub id: Uuid,
    pub fiks_digisos_id: String,
    pub klage_tekst: Option<String>,
    pub vedtak_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KlageUtkast {
    #[must_use]
    pub fn new(fiks_digisos_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fiks_digisos_id: fiks_digisos_id.into(),
            klage_tekst: None,
            vedtak_refs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

mod conversions {
    use innsyn_sdk::{
        JsonOppgaveStatus, JsonSaksStatusStatus, JsonSoknadsStatusStatus, JsonUtbetalingStatus, JsonUtfall,
    };

    use super::{Oppgavestatus, SaksStatus, SoknadsStatus, UtbetalingsStatus, UtfallVedtak};

    impl From<JsonSoknadsStatusStatus> for SoknadsStatus {
        fn from(value: JsonSoknadsStatusStatus) -> Self {
            match value {
                JsonSoknadsStatusStatus::Mottatt => Self::Mottatt,
                JsonSoknadsStatusStatus::UnderBehandling => Self::UnderBehandling,
                JsonSoknadsStatusStatus::Ferdigbehandlet => Self::Ferdigbehandlet,
                JsonSoknadsStatusStatus::BehandlesIkke => Self::BehandlesIkke,
            }
        }
    }

    impl From<JsonSaksStatusStatus> for SaksStatus {
        fn from(value: JsonSaksStatusStatus) -> Self {
            match value {
                JsonSaksStatusStatus::UnderBehandling => Self::UnderBehandling,
                JsonSaksStatusStatus::IkkeInnsyn => Self::IkkeInnsyn,
                JsonSaksStatusStatus::Ferdigbehandlet => Self::Ferdigbehandlet,
                JsonSaksStatusStatus::BehandlesIkke => Self::BehandlesIkke,
                JsonSaksStatusStatus::Feilregistrert => Self::Feilregistrert,
            }
        }
    }

    impl From<JsonUtbetalingStatus> for UtbetalingsStatus {
        fn from(value: JsonUtbetalingStatus) -> Self {
            match value {
                JsonUtbetalingStatus::PlanlagtUtbetaling => Self::PlanlagtUtbetaling,
                JsonUtbetalingStatus::Utbetalt => Self::Utbetalt,
                JsonUtbetalingStatus::Stoppet => Self::Stoppet,
                JsonUtbetalingStatus::Annullert => Self::Annullert,
            }
        }
    }

    impl From<JsonUtfall> for UtfallVedtak {
        fn from(value: JsonUtfall) -> Self {
            match value {
                JsonUtfall::Innvilget => Self::Innvilget,
                JsonUtfall::DelvisInnvilget => Self::DelvisInnvilget,
                JsonUtfall::Avslatt => Self::Avslatt,
                JsonUtfall::Avvist => Self::Avvist,
            }
        }
    }

    impl From<JsonOppgaveStatus> for Oppgavestatus {
        fn from(value: JsonOppgaveStatus) -> Self {
            match value {
                JsonOppgaveStatus::Relevant => Self::Relevant,
                JsonOppgaveStatus::Annullert => Self::Annullert,
                JsonOppgaveStatus::Oppfylt => Self::Oppfylt,
                JsonOppgaveStatus::IkkeOppfylt => Self::IkkeOppfylt,
                JsonOppgaveStatus::LevertTidligere => Self::LevertTidligere,
            }
        }
    }
}
