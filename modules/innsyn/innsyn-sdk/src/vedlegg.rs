//! Attachment specification (`vedlegg.json`) shipped with every application
//! and every ettersendelse.

use serde::{Deserialize, Serialize};

/// Status written for files the citizen has uploaded.
pub const LASTET_OPP_STATUS: &str = "LastetOpp";
/// Status for attachments the application declared as required but not sent.
pub const VEDLEGG_KREVES_STATUS: &str = "VedleggKreves";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonVedleggSpesifikasjon {
    #[serde(default)]
    pub vedlegg: Vec<JsonVedlegg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonVedlegg {
    #[serde(rename = "type")]
    pub vedlegg_type: String,
    pub tilleggsinfo: Option<String>,
    pub status: String,
    #[serde(default)]
    pub filer: Vec<JsonFiler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hendelse_type: Option<VedleggHendelseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hendelse_referanse: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFiler {
    pub filnavn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
}

/// Which kind of request an uploaded attachment answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VedleggHendelseType {
    DokumentasjonEtterspurt,
    Dokumentasjonkrav,
    Soknad,
    Bruker,
}
