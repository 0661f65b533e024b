use serde::{Deserialize, Serialize};

/// Per-municipality switches published by Fiks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct KommuneInfo {
    pub kommunenummer: String,
    pub kan_motta_soknader: bool,
    pub kan_oppdatere_status: bool,
    pub har_midlertidig_deaktivert_mottak: bool,
    pub har_midlertidig_deaktivert_oppdateringer: bool,
    #[serde(default)]
    pub har_nks_tilgang: bool,
    pub behandlingsansvarlig: Option<String>,
}
