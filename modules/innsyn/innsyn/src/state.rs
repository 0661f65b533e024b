//! Everything a request handler needs, built once at startup.

use std::sync::Arc;

use crate::auth::{AuthState, KeyProvider};
use crate::config::InnsynConfig;
use crate::domain::cache::InnsynCache;
use crate::domain::service::{Ports, Services};
use crate::domain::xsrf::XsrfGenerator;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthState,
    pub xsrf: Arc<XsrfGenerator>,
    pub cfg: Arc<InnsynConfig>,
}

impl AppState {
    /// Wires the service graph on top of `ports`.
    #[must_use]
    pub fn new(ports: &Ports, keys: Arc<dyn KeyProvider>, cfg: InnsynConfig) -> Self {
        let cache = Arc::new(InnsynCache::new(&cfg.cache));
        let services = Services::new(ports, &cfg, cache);
        let auth = AuthState {
            keys,
            cfg: Arc::new(cfg.auth.clone()),
        };
        Self {
            services,
            auth,
            xsrf: Arc::new(XsrfGenerator::new(&cfg.xsrf)),
            cfg: Arc::new(cfg),
        }
    }
}
