//! The citizen's original application (`soknad.json`), reduced to the parts
//! the innsyn view reads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSoknad {
    #[serde(default)]
    pub version: Option<String>,
    pub mottaker: Option<JsonSoknadsmottaker>,
    /// Application body; kept opaque.
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSoknadsmottaker {
    pub nav_enhetsnavn: String,
    pub enhetsnummer: String,
    pub kommunenummer: Option<String>,
}
