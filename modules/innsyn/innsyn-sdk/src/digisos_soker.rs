//! Caseworker event document (`digisos-soker.json`) written by the
//! municipality's case system and stored in the Fiks dokumentlager.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDigisosSoker {
    #[serde(default)]
    pub version: Option<String>,
    pub avsender: Option<JsonAvsender>,
    #[serde(default)]
    pub hendelser: Vec<JsonHendelse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonAvsender {
    pub systemnavn: String,
    pub systemversjon: String,
}

/// One event in the case history, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JsonHendelse {
    SoknadsStatus(JsonSoknadsStatus),
    TildeltNavKontor(JsonTildeltNavKontor),
    SaksStatus(JsonSaksStatus),
    VedtakFattet(JsonVedtakFattet),
    DokumentasjonEtterspurt(JsonDokumentasjonEtterspurt),
    ForelopigSvar(JsonForelopigSvar),
    Utbetaling(JsonUtbetaling),
    Vilkar(JsonVilkar),
    Dokumentasjonkrav(JsonDokumentasjonkrav),
    Rammevedtak(JsonRammevedtak),
}

impl JsonHendelse {
    /// ISO-8601 timestamp with offset, as written by the case system.
    #[must_use]
    pub fn hendelsestidspunkt(&self) -> &str {
        match self {
            Self::SoknadsStatus(h) => &h.hendelsestidspunkt,
            Self::TildeltNavKontor(h) => &h.hendelsestidspunkt,
            Self::SaksStatus(h) => &h.hendelsestidspunkt,
            Self::VedtakFattet(h) => &h.hendelsestidspunkt,
            Self::DokumentasjonEtterspurt(h) => &h.hendelsestidspunkt,
            Self::ForelopigSvar(h) => &h.hendelsestidspunkt,
            Self::Utbetaling(h) => &h.hendelsestidspunkt,
            Self::Vilkar(h) => &h.hendelsestidspunkt,
            Self::Dokumentasjonkrav(h) => &h.hendelsestidspunkt,
            Self::Rammevedtak(h) => &h.hendelsestidspunkt,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SoknadsStatus(_) => "soknadsStatus",
            Self::TildeltNavKontor(_) => "tildeltNavKontor",
            Self::SaksStatus(_) => "saksStatus",
            Self::VedtakFattet(_) => "vedtakFattet",
            Self::DokumentasjonEtterspurt(_) => "dokumentasjonEtterspurt",
            Self::ForelopigSvar(_) => "forelopigSvar",
            Self::Utbetaling(_) => "utbetaling",
            Self::Vilkar(_) => "vilkar",
            Self::Dokumentasjonkrav(_) => "dokumentasjonkrav",
            Self::Rammevedtak(_) => "rammevedtak",
        }
    }
}

/// Pointer to a file, either in the Fiks dokumentlager or in SvarUt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JsonFilreferanse {
    Dokumentlager { id: String },
    Svarut { id: String, nr: i32 },
}

impl JsonFilreferanse {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Dokumentlager { id } | Self::Svarut { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonSoknadsStatusStatus {
    Mottatt,
    UnderBehandling,
    Ferdigbehandlet,
    BehandlesIkke,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSoknadsStatus {
    pub hendelsestidspunkt: String,
    pub status: JsonSoknadsStatusStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonTildeltNavKontor {
    pub hendelsestidspunkt: String,
    pub nav_kontor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonSaksStatusStatus {
    UnderBehandling,
    IkkeInnsyn,
    Ferdigbehandlet,
    BehandlesIkke,
    Feilregistrert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSaksStatus {
    pub hendelsestidspunkt: String,
    pub referanse: String,
    pub tittel: Option<String>,
    pub status: Option<JsonSaksStatusStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonUtfall {
    Innvilget,
    DelvisInnvilget,
    Avslatt,
    Avvist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonVedtaksfil {
    pub referanse: JsonFilreferanse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonVedtakFattet {
    pub hendelsestidspunkt: String,
    pub saksreferanse: Option<String>,
    pub utfall: Option<JsonUtfall>,
    pub vedtaksfil: JsonVedtaksfil,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonForvaltningsbrev {
    pub referanse: JsonFilreferanse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDokumenter {
    pub dokumenttype: String,
    pub tilleggsinformasjon: Option<String>,
    pub innsendelsesfrist: Option<String>,
    pub dokumentreferanse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDokumentasjonEtterspurt {
    pub hendelsestidspunkt: String,
    pub forvaltningsbrev: Option<JsonForvaltningsbrev>,
    #[serde(default)]
    pub dokumenter: Vec<JsonDokumenter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonForelopigSvar {
    pub hendelsestidspunkt: String,
    pub forvaltningsbrev: JsonForvaltningsbrev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonUtbetalingStatus {
    PlanlagtUtbetaling,
    Utbetalt,
    Stoppet,
    Annullert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonUtbetaling {
    pub hendelsestidspunkt: String,
    pub utbetalingsreferanse: String,
    pub saksreferanse: Option<String>,
    pub status: Option<JsonUtbetalingStatus>,
    pub belop: Option<f64>,
    pub beskrivelse: Option<String>,
    pub forfallsdato: Option<String>,
    pub utbetalingsdato: Option<String>,
    pub stoppetdato: Option<String>,
    pub fom: Option<String>,
    pub tom: Option<String>,
    pub annen_mottaker: Option<bool>,
    pub mottaker: Option<String>,
    pub kontonummer: Option<String>,
    pub utbetalingsmetode: Option<String>,
}

/// Shared status vocabulary of vilkar and dokumentasjonkrav.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonOppgaveStatus {
    Relevant,
    Annullert,
    Oppfylt,
    IkkeOppfylt,
    LevertTidligere,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonVilkar {
    pub hendelsestidspunkt: String,
    pub vilkarreferanse: String,
    #[serde(default)]
    pub utbetalingsreferanse: Vec<String>,
    pub saksreferanse: Option<String>,
    pub tittel: Option<String>,
    pub beskrivelse: Option<String>,
    pub status: JsonOppgaveStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonDokumentasjonkrav {
    pub hendelsestidspunkt: String,
    pub dokumentasjonkravreferanse: String,
    #[serde(default)]
    pub utbetalingsreferanse: Vec<String>,
    pub saksreferanse: Option<String>,
    pub tittel: Option<String>,
    pub beskrivelse: Option<String>,
    pub status: JsonOppgaveStatus,
    pub frist: Option<String>,
}

/// Framework decisions are accepted on the wire but carry nothing the
/// citizen view uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonRammevedtak {
    pub hendelsestidspunkt: String,
    pub rammevedtaksreferanse: Option<String>,
    pub saksreferanse: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_hendelser() {
        let json = r#"{
            "version": "1.0.0",
            "avsender": {"systemnavn": "Testsystemet", "systemversjon": "1.0.0"},
            "hendelser": [
                {"type": "soknadsStatus", "hendelsestidspunkt": "2018-10-04T13:37:00.134Z", "status": "MOTTATT"},
                {"type": "vedtakFattet", "hendelsestidspunkt": "2018-10-12T13:37:00.134Z",
                 "saksreferanse": "SAK1", "utfall": "INNVILGET",
                 "vedtaksfil": {"referanse": {"type": "svarut", "id": "abc", "nr": 1}}},
                {"type": "utbetaling", "hendelsestidspunkt": "2018-10-12T13:37:00.134Z",
                 "utbetalingsreferanse": "Betaling 1", "belop": 1234.5, "status": "UTBETALT"}
            ]
        }"#;
        let soker: JsonDigisosSoker = serde_json::from_str(json).unwrap();
        assert_eq!(soker.hendelser.len(), 3);
        assert_eq!(soker.hendelser[0].type_name(), "soknadsStatus");
        let JsonHendelse::VedtakFattet(vedtak) = &soker.hendelser[1] else {
            panic!("expected vedtakFattet");
        };
        assert_eq!(
            vedtak.vedtaksfil.referanse,
            JsonFilreferanse::Svarut {
                id: "abc".to_owned(),
                nr: 1
            }
        );
        assert_eq!(soker.hendelser[2].hendelsestidspunkt(), "2018-10-12T13:37:00.134Z");
    }

    #[test]
    fn unknown_hendelse_type_is_rejected() {
        let json = r#"{"hendelser": [{"type": "noeNytt", "hendelsestidspunkt": "2018-10-04T13:37:00.134Z"}]}"#;
        assert!(serde_json::from_str::<JsonDigisosSoker>(json).is_err());
    }
}
