//! In-process TTL caches for upstream lookups.

use std::time::Duration;

use innsyn_sdk::{DigisosSak, KommuneInfo};
use moka::future::Cache;

use crate::config::CacheConfig;
use crate::domain::ports::{NavEnhet, PdlPerson};

/// Kommune info and Norg units change rarely; keep them longer than case data.
const SLOW_DATA_TTL: Duration = Duration::from_secs(60 * 60);

pub struct InnsynCache {
    digisos_saker: Cache<String, DigisosSak>,
    dokumenter: Cache<String, serde_json::Value>,
    kommune_info: Cache<String, KommuneInfo>,
    pdl_personer: Cache<String, PdlPerson>,
    pdl_identer: Cache<String, Vec<String>>,
    nav_enheter: Cache<String, NavEnhet>,
}

impl InnsynCache {
    #[must_use]
    pub fn new(cfg: &CacheConfig) -> Self {
        Self::with_ttl(cfg.time_to_live, cfg.max_capacity)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration, max_capacity: u64) -> Self {
        fn build<V: Clone + Send + Sync + 'static>(ttl: Duration, max: u64) -> Cache<String, V> {
            Cache::builder().max_capacity(max).time_to_live(ttl).build()
        }
        let slow = ttl.max(SLOW_DATA_TTL);
        Self {
            digisos_saker: build(ttl, max_capacity),
            dokumenter: build(ttl.max(Duration::from_secs(60 * 10)), max_capacity),
            kommune_info: build(slow, max_capacity),
            pdl_personer: build(ttl, max_capacity),
            pdl_identer: build(ttl, max_capacity),
            nav_enheter: build(slow, max_capacity),
        }
    }

    pub async fn digisos_sak(&self, digisos_id: &str) -> Option<DigisosSak> {
        self.digisos_saker.get(digisos_id).await
    }

    pub async fn put_digisos_sak(&self, sak: &DigisosSak) {
        self.digisos_saker
            .insert(sak.fiks_digisos_id.clone(), sak.clone())
            .await;
    }

    /// Dropped after an upload so the next read sees the new ettersendelse.
    pub async fn evict_digisos_sak(&self, digisos_id: &str) {
        self.digisos_saker.invalidate(digisos_id).await;
    }

    pub async fn dokument(&self, key: &str) -> Option<serde_json::Value> {
        self.dokumenter.get(key).await
    }

    pub async fn put_dokument(&self, key: String, dokument: serde_json::Value) {
        self.dokumenter.insert(key, dokument).await;
    }

    pub async fn kommune_info(&self, kommunenummer: &str) -> Option<KommuneInfo> {
        self.kommune_info.get(kommunenummer).await
    }

    pub async fn put_kommune_info(&self, info: &KommuneInfo) {
        self.kommune_info
            .insert(info.kommunenummer.clone(), info.clone())
            .await;
    }

    pub async fn pdl_person(&self, ident: &str) -> Option<PdlPerson> {
        self.pdl_personer.get(ident).await
    }

    pub async fn put_pdl_person(&self, ident: String, person: PdlPerson) {
        self.pdl_personer.insert(ident, person).await;
    }

    pub async fn pdl_identer(&self, ident: &str) -> Option<Vec<String>> {
        self.pdl_identer.get(ident).await
    }

    pub async fn put_pdl_identer(&self, ident: String, identer: Vec<String>) {
        self.pdl_identer.insert(ident, identer).await;
    }

    pub async fn nav_enhet(&self, enhetsnr: &str) -> Option<NavEnhet> {
        self.nav_enheter.get(enhetsnr).await
    }

    pub async fn put_nav_enhet(&self, enhet: &NavEnhet) {
        self.nav_enheter.insert(enhet.enhet_nr.clone(), enhet.clone()).await;
    }
}

impl Default for InnsynCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
