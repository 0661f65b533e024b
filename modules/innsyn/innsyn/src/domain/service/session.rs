use std::sync::Arc;

use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::service::tilgang::TilgangskontrollService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub fornavn: String,
    /// The frontend shows an error page instead of the service when set.
    pub har_adressebeskyttelse: bool,
}

pub struct SessionService {
    tilgang: Arc<TilgangskontrollService>,
}

impl SessionService {
    #[must_use]
    pub fn new(tilgang: Arc<TilgangskontrollService>) -> Self {
        Self { tilgang }
    }

    pub async fn hent_session_metadata(&self, bruker: &InnloggetBruker) -> SessionMetadata {
        let (fornavn, har_adressebeskyttelse) = self.tilgang.hent_session_person(bruker).await;
        SessionMetadata {
            fornavn,
            har_adressebeskyttelse,
        }
    }
}
