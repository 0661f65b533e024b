//! Configuration of the innsyn module.
//!
//! Every section deserializes with defaults so a partial YAML file (or none at
//! all) yields a usable local setup. Secrets default to empty and must be
//! supplied through the environment in real deployments.

pub mod duration;
mod secret;

pub use secret::Secret;

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InnsynConfig {
    pub auth: AuthConfig,
    pub fiks: FiksConfig,
    pub pdl: PdlConfig,
    pub norg: NorgConfig,
    pub texas: TexasConfig,
    pub virusscan: VirusScanConfig,
    pub unleash: UnleashConfig,
    pub xsrf: XsrfConfig,
    pub cors: CorsConfig,
    pub cache: CacheConfig,
    /// Production disables test affordances such as the `virustest` filename.
    pub is_prod: bool,
}

/// Bearer token validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub jwks_url: String,
    /// Accepted `iss` values.
    pub issuers: Vec<String>,
    /// Accepted `aud` values; empty skips the audience check.
    pub audiences: Vec<String>,
    pub leeway_seconds: u64,
    #[serde(with = "duration")]
    pub jwks_refresh_interval: Duration,
    /// Client id of the login api; tokens from other clients are refused
    /// when `check_client_id` is set.
    pub login_client_id: String,
    pub check_client_id: bool,
    /// Returned to the frontend in 401 responses.
    pub login_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: "http://localhost:8080/idporten/jwks".to_owned(),
            issuers: vec!["selvbetjening".to_owned()],
            audiences: Vec::new(),
            leeway_seconds: 60,
            jwks_refresh_interval: Duration::from_secs(300),
            login_client_id: String::new(),
            check_client_id: false,
            login_url: "http://localhost:3000/sosialhjelp/innsyn/oauth2/login".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiksConfig {
    /// Base url of the digisos api, e.g. `https://api.fiks.ks.no`.
    pub base_url: String,
    pub integrasjonsid: String,
    pub integrasjonpassord: Secret,
    /// Public base of dokumentlager; document links are built on top of it.
    pub dokumentlager_url: String,
    pub svarut_url: String,
    #[serde(with = "duration")]
    pub timeout: Duration,
}

impl Default for FiksConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            integrasjonsid: String::new(),
            integrasjonpassord: Secret::default(),
            dokumentlager_url: "http://localhost:8080".to_owned(),
            svarut_url: "http://localhost:8080".to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdlConfig {
    pub url: String,
    /// TokenX audience of PDL, e.g. `prod-fss:pdl:pdl-api`.
    pub audience: String,
}

impl Default for PdlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/pdl/graphql".to_owned(),
            audience: "local:pdl:pdl-api".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NorgConfig {
    pub url: String,
}

impl Default for NorgConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/norg2/api/v1".to_owned(),
        }
    }
}

/// Token sidecar endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TexasConfig {
    pub token_endpoint: String,
    pub exchange_endpoint: String,
    pub maskinporten_target: String,
    /// Cached tokens are refreshed this long before they expire.
    #[serde(with = "duration")]
    pub expiry_margin: Duration,
}

impl Default for TexasConfig {
    fn default() -> Self {
        Self {
            token_endpoint: "http://localhost:7164/api/v1/token".to_owned(),
            exchange_endpoint: "http://localhost:7164/api/v1/token/exchange".to_owned(),
            maskinporten_target: "ks:fiks".to_owned(),
            expiry_margin: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirusScanConfig {
    pub url: String,
    pub enabled: bool,
}

impl Default for VirusScanConfig {
    fn default() -> Self {
        Self {
            url: "http://clamav.nais-system/scan".to_owned(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnleashConfig {
    /// Empty disables fetching; every toggle then reports its default.
    pub url: String,
    pub api_token: Secret,
    pub instance_id: String,
    pub environment: String,
    #[serde(with = "duration")]
    pub refresh_interval: Duration,
}

impl Default for UnleashConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_token: Secret::default(),
            instance_id: "local".to_owned(),
            environment: "development".to_owned(),
            refresh_interval: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XsrfConfig {
    pub secret: Secret,
    #[serde(with = "duration")]
    pub time_to_live: Duration,
}

impl Default for XsrfConfig {
    fn default() -> Self {
        Self {
            secret: Secret::default(),
            time_to_live: Duration::from_secs(8 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(with = "duration")]
    pub time_to_live: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(10),
            max_capacity: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: InnsynConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.cache.time_to_live, Duration::from_secs(10));
        assert_eq!(cfg.xsrf.time_to_live, Duration::from_secs(8 * 60 * 60));
        assert!(cfg.virusscan.enabled);
        assert!(!cfg.is_prod);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: InnsynConfig =
            serde_json::from_str(r#"{"fiks": {"base_url": "https://fiks.example", "integrasjonpassord": "pw"}}"#)
                .unwrap();
        assert_eq!(cfg.fiks.base_url, "https://fiks.example");
        assert_eq!(cfg.fiks.integrasjonpassord.expose(), "pw");
        assert_eq!(cfg.fiks.timeout, Duration::from_secs(30));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<InnsynConfig>(r#"{"fiks": {"bogus": 1}}"#).is_err());
    }

    #[test]
    fn secrets_are_redacted_when_serialized() {
        let mut cfg = InnsynConfig::default();
        cfg.xsrf.secret = Secret::new("topsecret");
        let out = serde_json::to_string(&cfg).unwrap();
        assert!(!out.contains("topsecret"));
    }
}
