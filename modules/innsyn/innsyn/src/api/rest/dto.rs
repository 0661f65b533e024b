use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::model::{SoknadsStatus, UrlResponse};
use crate::domain::service::soknads_status::UtvidetSoknadsStatus;
use crate::domain::util::soknadsalder_i_minutter;

const DEFAULT_MONTHS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoknadsStatusResponse {
    pub status: SoknadsStatus,
    pub kommunenummer: String,
    pub tidspunkt_sendt: Option<NaiveDateTime>,
    pub soknadsalder_i_minutter: i64,
    pub nav_kontor: Option<String>,
    pub fil_url: Option<UrlResponse>,
    pub nav_ekstern_ref_id: Option<String>,
    pub tittel: Option<String>,
}

impl From<UtvidetSoknadsStatus> for SoknadsStatusResponse {
    fn from(s: UtvidetSoknadsStatus) -> Self {
        Self {
            status: s.status,
            kommunenummer: s.kommunenummer,
            soknadsalder_i_minutter: soknadsalder_i_minutter(s.tidspunkt_sendt),
            tidspunkt_sendt: s.tidspunkt_sendt,
            nav_kontor: s.nav_kontor,
            fil_url: s.soknad_url,
            nav_ekstern_ref_id: s.nav_ekstern_ref_id,
            tittel: s.tittel,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaksDetaljerQuery {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtbetalingerQuery {
    #[serde(default = "default_months")]
    pub month: u32,
}

fn default_months() -> u32 {
    DEFAULT_MONTHS
}

/// Names the draft to send.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendKlageRequest {
    pub klage_id: Uuid,
}
