//! Complaint (klage) contracts toward the Fiks klage API.

use serde::{Deserialize, Serialize};

/// Body of `klage.json` as submitted for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlageInput {
    pub fiks_digisos_id: String,
    pub klage_tekst: String,
    pub vedtaks_ids: Vec<String>,
}

/// A complaint as listed by `GET /digisos/klage/api/v1/klager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiksKlage {
    pub fiks_org_id: String,
    pub digisos_id: String,
    pub klage_id: String,
    pub vedtak_id: String,
    pub nav_ekstern_ref_id: String,
    pub klage_metadata: String,
    pub vedlegg_metadata: String,
    pub klage_dokument: Option<FiksKlageDokument>,
    #[serde(default)]
    pub trukket: Option<bool>,
    pub sendt_kvittering: Option<SendtKvittering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiksKlageDokument {
    pub filnavn: String,
    pub dokumentlager_dokument_id: String,
    pub storrelse: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendtKvittering {
    pub sendt_status: SendtStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendtStatus {
    pub status: String,
    pub timestamp: i64,
}
