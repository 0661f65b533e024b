//! Seams between the domain and the outside world.
//!
//! Each upstream system gets a trait; `infra` provides the HTTP and database
//! implementations and tests plug in fakes.

use async_trait::async_trait;
use bytes::Bytes;
use innsyn_sdk::{DigisosSak, FiksKlage, JsonVedleggSpesifikasjon, KommuneInfo};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{DomainError, NorgError, PdlError, TokenError};
use crate::domain::model::KlageUtkast;

#[async_trait]
pub trait FiksClient: Send + Sync {
    /// Raw case envelope; ownership is checked by the caller.
    async fn hent_digisos_sak(&self, digisos_id: &str, token: &str) -> Result<DigisosSak, DomainError>;

    async fn hent_alle_digisos_saker(&self, token: &str) -> Result<Vec<DigisosSak>, DomainError>;

    /// A JSON document from dokumentlager, undecoded.
    async fn hent_dokument(
        &self,
        digisos_id: &str,
        dokumentlager_id: &str,
        token: &str,
    ) -> Result<serde_json::Value, DomainError>;

    async fn last_opp_ny_ettersendelse(
        &self,
        kommunenummer: &str,
        digisos_id: &str,
        nav_ekstern_ref_id: &str,
        spesifikasjon: &JsonVedleggSpesifikasjon,
        filer: Vec<FilForOpplasting>,
        token: &str,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait KommuneInfoClient: Send + Sync {
    async fn get_kommune_info(&self, kommunenummer: &str) -> Result<KommuneInfo, DomainError>;

    async fn get_all(&self) -> Result<Vec<KommuneInfo>, DomainError>;
}

#[async_trait]
pub trait PdlClient: Send + Sync {
    /// `Ok(None)` when PDL knows no such person.
    async fn hent_person(&self, ident: &str, token: &str) -> Result<Option<PdlPerson>, PdlError>;

    /// All identities (current and historic) of the person.
    async fn hent_identer(&self, ident: &str, token: &str) -> Result<Vec<String>, PdlError>;
}

#[async_trait]
pub trait NorgClient: Send + Sync {
    async fn hent_nav_enhet(&self, enhetsnr: &str) -> Result<NavEnhet, NorgError>;
}

#[async_trait]
pub trait VirusScan: Send + Sync {
    /// `Err(DomainError::VirusFunnet)` when the file must be rejected.
    async fn scan(&self, filnavn: &str, data: &[u8]) -> Result<(), DomainError>;
}

pub trait FeatureToggles: Send + Sync {
    /// `user_id` is the citizen's fnr; user-targeted strategies match on it.
    fn is_enabled(&self, name: &str, user_id: Option<&str>, default: bool) -> bool;
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn maskinporten_token(&self) -> Result<String, TokenError>;

    /// TokenX exchange of the citizen token for `audience`.
    async fn exchange(&self, user_token: &str, audience: &str) -> Result<String, TokenError>;
}

#[async_trait]
pub trait KlageClient: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn send_klage(
        &self,
        digisos_id: &str,
        klage_id: Uuid,
        vedtak_id: &str,
        klage_json: serde_json::Value,
        vedlegg: &JsonVedleggSpesifikasjon,
        token: &str,
    ) -> Result<(), DomainError>;

    async fn hent_klager(&self, digisos_id: &str, token: &str) -> Result<Vec<FiksKlage>, DomainError>;
}

#[async_trait]
pub trait KlageUtkastRepository: Send + Sync {
    async fn insert(&self, utkast: &KlageUtkast) -> anyhow::Result<()>;

    /// Returns `false` when no draft with that id exists.
    async fn update(&self, utkast: &KlageUtkast) -> anyhow::Result<bool>;

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<KlageUtkast>>;

    async fn list_for_sak(&self, fiks_digisos_id: &str) -> anyhow::Result<Vec<KlageUtkast>>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// One file of an ettersendelse, renamed and validated.
#[derive(Debug, Clone)]
pub struct FilForOpplasting {
    pub filnavn: String,
    pub mimetype: String,
    pub storrelse: u64,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdlPerson {
    #[serde(default)]
    pub adressebeskyttelse: Vec<Adressebeskyttelse>,
    #[serde(default)]
    pub navn: Vec<PdlNavn>,
}

impl PdlPerson {
    /// Persons with protected addresses ("kode 6/7") get no innsyn.
    #[must_use]
    pub fn is_kode6_or_7(&self) -> bool {
        self.adressebeskyttelse.iter().any(|a| {
            matches!(
                a.gradering,
                Gradering::Fortrolig | Gradering::StrengtFortrolig | Gradering::StrengtFortroligUtland
            )
        })
    }

    /// First given name, capitalized; empty when PDL has none.
    #[must_use]
    pub fn fornavn(&self) -> String {
        let Some(fornavn) = self.navn.first().map(|n| n.fornavn.to_lowercase()) else {
            return String::new();
        };
        let mut chars = fornavn.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adressebeskyttelse {
    pub gradering: Gradering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gradering {
    StrengtFortroligUtland,
    StrengtFortrolig,
    Fortrolig,
    Ugradert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdlNavn {
    pub fornavn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEnhet {
    pub enhet_id: i64,
    pub navn: String,
    pub enhet_nr: String,
    #[serde(default)]
    pub sosiale_tjenester: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kode6_and_7_are_detected() {
        let person = PdlPerson {
            adressebeskyttelse: vec![Adressebeskyttelse {
                gradering: Gradering::StrengtFortrolig,
            }],
            navn: Vec::new(),
        };
        assert!(person.is_kode6_or_7());

        let ugradert = PdlPerson {
            adressebeskyttelse: vec![Adressebeskyttelse {
                gradering: Gradering::Ugradert,
            }],
            navn: Vec::new(),
        };
        assert!(!ugradert.is_kode6_or_7());
    }

    #[test]
    fn fornavn_is_capitalized() {
        let person = PdlPerson {
            adressebeskyttelse: Vec::new(),
            navn: vec![PdlNavn {
                fornavn: "KARI".to_owned(),
            }],
        };
        assert_eq!(person.fornavn(), "Kari");
        assert_eq!(PdlPerson::default().fornavn(), "");
    }
}
