//! Case envelope returned by `GET /digisos/api/v1/soknader/{digisosId}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigisosSak {
    pub fiks_digisos_id: String,
    pub soker_fnr: String,
    pub fiks_org_id: String,
    pub kommunenummer: String,
    /// Unix millis of the last change on the case.
    pub sist_endret: i64,
    #[serde(rename = "originalSoknadNAV")]
    pub original_soknad_nav: Option<OriginalSoknadNav>,
    #[serde(rename = "ettersendtInfoNAV")]
    pub ettersendt_info_nav: Option<EttersendtInfoNav>,
    pub digisos_soker: Option<DigisosSoker>,
    pub tilleggsinformasjon: Option<Tilleggsinformasjon>,
}

impl DigisosSak {
    /// A case is "empty" when neither the citizen's application nor any
    /// caseworker event document has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.original_soknad_nav.is_none() && self.digisos_soker.is_none()
    }

    /// Paper applications are registered without an `originalSoknadNAV`.
    #[must_use]
    pub fn is_papir_soknad(&self) -> bool {
        self.original_soknad_nav.is_none()
    }

    #[must_use]
    pub fn ettersendelser(&self) -> &[Ettersendelse] {
        self.ettersendt_info_nav
            .as_ref()
            .map_or(&[], |info| info.ettersendelser.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalSoknadNav {
    pub nav_ekstern_ref_id: String,
    pub metadata: String,
    pub vedlegg_metadata: String,
    pub soknad_dokument: DokumentInfo,
    #[serde(default)]
    pub vedlegg: Vec<DokumentInfo>,
    pub timestamp_sendt: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DokumentInfo {
    pub filnavn: String,
    pub dokumentlager_dokument_id: String,
    pub storrelse: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EttersendtInfoNav {
    #[serde(default)]
    pub ettersendelser: Vec<Ettersendelse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ettersendelse {
    pub nav_ekstern_ref_id: String,
    pub vedlegg_metadata: String,
    #[serde(default)]
    pub vedlegg: Vec<DokumentInfo>,
    pub timestamp_sendt: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigisosSoker {
    pub metadata: String,
    #[serde(default)]
    pub dokumenter: Vec<DokumentInfo>,
    pub timestamp_sist_oppdatert: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tilleggsinformasjon {
    pub enhetsnummer: Option<String>,
}
