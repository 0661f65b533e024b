use std::sync::Arc;

use innsyn_sdk::DigisosSak;
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::config::AuthConfig;
use crate::domain::cache::InnsynCache;
use crate::domain::error::DomainError;
use crate::domain::ports::{PdlClient, PdlPerson};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tilgang {
    pub har_tilgang: bool,
    pub fornavn: String,
}

/// Access control: only the applicant, and only without a protected address.
pub struct TilgangskontrollService {
    pdl: Arc<dyn PdlClient>,
    cache: Arc<InnsynCache>,
    login_client_id: String,
    check_client_id: bool,
}

impl TilgangskontrollService {
    #[must_use]
    pub fn new(pdl: Arc<dyn PdlClient>, cache: Arc<InnsynCache>, cfg: &AuthConfig) -> Self {
        Self {
            pdl,
            cache,
            login_client_id: cfg.login_client_id.clone(),
            check_client_id: cfg.check_client_id,
        }
    }

    /// # Errors
    /// `DomainError::Tilgang` for tokens from another client or persons with
    /// kode 6/7. A PDL outage lets the request through.
    pub async fn sjekk_tilgang(&self, bruker: &InnloggetBruker) -> Result<(), DomainError> {
        if self.check_client_id && bruker.client_id.as_deref() != Some(self.login_client_id.as_str()) {
            return Err(DomainError::tilgang("Feil clientId"));
        }
        match self.hent_person(bruker).await {
            Some(person) if person.is_kode6_or_7() => Err(DomainError::tilgang("Bruker har ikke tilgang til innsyn")),
            _ => Ok(()),
        }
    }

    pub async fn hent_tilgang(&self, bruker: &InnloggetBruker) -> Tilgang {
        let Some(person) = self.hent_person(bruker).await else {
            return Tilgang {
                har_tilgang: false,
                fornavn: String::new(),
            };
        };
        Tilgang {
            har_tilgang: !person.is_kode6_or_7(),
            fornavn: fornavn(&person),
        }
    }

    /// First name and address protection for the session endpoint.
    pub async fn hent_session_person(&self, bruker: &InnloggetBruker) -> (String, bool) {
        self.hent_person(bruker)
            .await
            .map_or((String::new(), false), |p| (fornavn(&p), p.is_kode6_or_7()))
    }

    /// # Errors
    /// `DomainError::Tilgang` when the applicant on the case is none of the
    /// user's identities; `PdlError` when identities cannot be looked up.
    pub async fn verify_digisos_sak_is_for_correct_user(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        if sak.soker_fnr == bruker.fnr {
            return Ok(());
        }
        let identer = if let Some(identer) = self.cache.pdl_identer(&bruker.fnr).await {
            identer
        } else {
            let identer = self.pdl.hent_identer(&bruker.fnr, &bruker.token).await?;
            self.cache.put_pdl_identer(bruker.fnr.clone(), identer.clone()).await;
            identer
        };
        if identer.contains(&sak.soker_fnr) {
            Ok(())
        } else {
            Err(DomainError::tilgang("digisosSak h\u{f8}rer ikke til rett person"))
        }
    }

    async fn hent_person(&self, bruker: &InnloggetBruker) -> Option<PdlPerson> {
        if let Some(person) = self.cache.pdl_person(&bruker.fnr).await {
            return Some(person);
        }
        match self.pdl.hent_person(&bruker.fnr, &bruker.token).await {
            Ok(Some(person)) => {
                self.cache.put_pdl_person(bruker.fnr.clone(), person.clone()).await;
                Some(person)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "PDL kaster feil -> midlertidig ikke tilgang");
                None
            }
        }
    }
}

fn fornavn(person: &PdlPerson) -> String {
    let fornavn = person.fornavn();
    if fornavn.is_empty() {
        tracing::warn!("PDL har ingen fornavn p\u{e5} brukeren");
    }
    fornavn
}
