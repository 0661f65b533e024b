use std::sync::Arc;

use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::service::fiks::FiksService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForelopigSvarResponse {
    pub har_mottatt_forelopig_svar: bool,
    pub link: Option<String>,
}

pub struct ForelopigSvarService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
}

impl ForelopigSvarService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>) -> Self {
        Self { fiks, events }
    }

    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    pub async fn hent_forelopig_svar_status(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<ForelopigSvarResponse, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        Ok(ForelopigSvarResponse {
            har_mottatt_forelopig_svar: model.forelopig_svar.har_mottatt_forelopig_svar,
            link: model.forelopig_svar.link,
        })
    }
}
