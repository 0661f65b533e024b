use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::http::{build_client, transport_message};
use crate::config::{Secret, UnleashConfig};
use crate::domain::ports::FeatureToggles;

const APP_NAME: &str = "sosialhjelp-innsyn-api";

#[derive(Debug, Clone, Deserialize)]
struct FeaturesResponse {
    #[serde(default)]
    features: Vec<FeatureToggle>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeatureToggle {
    name: String,
    enabled: bool,
    #[serde(default)]
    strategies: Vec<Strategy>,
}

#[derive(Debug, Clone, Deserialize)]
struct Strategy {
    name: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
    #[serde(default)]
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Constraint {
    context_name: String,
    operator: String,
    #[serde(default)]
    values: Vec<String>,
}

/// What a toggle is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct UnleashContext<'a> {
    pub instance_id: &'a str,
    pub environment: &'a str,
    pub user_id: Option<&'a str>,
}

impl UnleashContext<'_> {
    fn value(&self, name: &str) -> Option<&str> {
        match name {
            "instanceId" | "appName" => Some(self.instance_id),
            "environment" => Some(self.environment),
            "userId" => self.user_id,
            _ => None,
        }
    }
}

fn list_contains(list: Option<&String>, value: &str) -> bool {
    list.is_some_and(|l| l.split(',').any(|v| v.trim() == value))
}

impl Constraint {
    fn matches(&self, ctx: &UnleashContext<'_>) -> bool {
        let inn = ctx
            .value(&self.context_name)
            .is_some_and(|v| self.values.iter().any(|x| x == v));
        match self.operator.as_str() {
            "IN" => inn,
            "NOT_IN" => !inn,
            _ => false,
        }
    }
}

impl Strategy {
    fn matches(&self, ctx: &UnleashContext<'_>) -> bool {
        if !self.constraints.iter().all(|c| c.matches(ctx)) {
            return false;
        }
        match self.name.as_str() {
            "default" => true,
            "byInstanceId" => list_contains(self.parameters.get("instanceId"), ctx.instance_id),
            "userWithId" => ctx
                .user_id
                .is_some_and(|user| list_contains(self.parameters.get("userIds"), user)),
            _ => false,
        }
    }
}

impl FeatureToggle {
    fn is_on(&self, ctx: &UnleashContext<'_>) -> bool {
        self.enabled && (self.strategies.is_empty() || self.strategies.iter().any(|s| s.matches(ctx)))
    }
}

/// Feature toggles polled from Unleash.
///
/// Definitions are swapped in atomically after each fetch; until the first
/// successful fetch every toggle reports its default.
pub struct UnleashToggles {
    client: reqwest::Client,
    features_url: Option<String>,
    api_token: Secret,
    instance_id: String,
    environment: String,
    refresh_interval: Duration,
    features: ArcSwapOption<HashMap<String, FeatureToggle>>,
}

impl UnleashToggles {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(cfg: &UnleashConfig) -> reqwest::Result<Self> {
        let url = cfg.url.trim_end_matches('/');
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            features_url: (!url.is_empty()).then(|| format!("{url}/api/client/features")),
            api_token: cfg.api_token.clone(),
            instance_id: cfg.instance_id.clone(),
            environment: cfg.environment.clone(),
            refresh_interval: cfg.refresh_interval,
            features: ArcSwapOption::empty(),
        })
    }

    /// Fetches toggle definitions once. A no-op when no url is configured.
    ///
    /// # Errors
    /// Transport, status or decode failures; the previous definitions stay
    /// in place.
    pub async fn refresh(&self) -> anyhow::Result<()> {
        let Some(url) = &self.features_url else {
            return Ok(());
        };
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.api_token.expose())
            .header("UNLEASH-APPNAME", APP_NAME)
            .header("UNLEASH-INSTANCEID", &self.instance_id)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Unleash: {}", transport_message(&e)))?;
        if !response.status().is_success() {
            anyhow::bail!("Unleash svarte {}", response.status().as_u16());
        }
        let body: FeaturesResponse = response.json().await?;
        let features: HashMap<String, FeatureToggle> =
            body.features.into_iter().map(|f| (f.name.clone(), f)).collect();
        tracing::debug!(antall = features.len(), "Hentet feature toggles fra Unleash");
        self.features.store(Some(Arc::new(features)));
        Ok(())
    }
}

impl FeatureToggles for UnleashToggles {
    fn is_enabled(&self, name: &str, user_id: Option<&str>, default: bool) -> bool {
        let guard = self.features.load();
        let Some(toggle) = guard.as_ref().and_then(|f| f.get(name)) else {
            return default;
        };
        toggle.is_on(&UnleashContext {
            instance_id: &self.instance_id,
            environment: &self.environment,
            user_id,
        })
    }
}

/// Polls Unleash at the configured interval until cancelled.
pub async fn run_unleash_refresh_task(toggles: Arc<UnleashToggles>, cancel: CancellationToken) {
    if toggles.features_url.is_none() {
        tracing::info!("Unleash url er ikke satt, bruker standardverdier for feature toggles");
        return;
    }
    let mut interval = tokio::time::interval(toggles.refresh_interval);
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Unleash refresh task shutting down");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = toggles.refresh().await {
                    tracing::warn!(error = %e, "Henting av feature toggles feilet");
                }
            }
        }
    }
}
