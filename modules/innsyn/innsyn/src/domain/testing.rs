//! In-memory fakes of the ports and small fixture builders shared by the
//! domain tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use innsyn_sdk::{
    DigisosSak, DigisosSoker, DokumentInfo, FiksKlage, JsonVedleggSpesifikasjon, KommuneInfo, OriginalSoknadNav,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::InnloggetBruker;
use crate::config::InnsynConfig;
use crate::domain::cache::InnsynCache;
use crate::domain::error::{DomainError, FiksError, NorgError, PdlError};
use crate::domain::event::Lenker;
use crate::domain::model::{KlageUtkast, Utbetaling, UtbetalingsStatus};
use crate::domain::ports::{
    FeatureToggles, FiksClient, FilForOpplasting, KlageClient, KlageUtkastRepository, KommuneInfoClient, NavEnhet,
    NorgClient, PdlClient, PdlPerson, VirusScan,
};
use crate::domain::service::{Ports, Services};

pub const FNR: &str = "12345678910";
pub const TOKEN: &str = "token";
pub const SOKNAD_SENDT_MILLIS: i64 = 1_539_296_542_000;

pub fn bruker() -> InnloggetBruker {
    InnloggetBruker::new(FNR, TOKEN)
}

/// A one-page PDF that a real parser accepts.
pub fn pdf_document() -> lopdf::Document {
    use lopdf::{Document, Object, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn pdf_bytes() -> bytes::Bytes {
    let mut buf = Vec::new();
    pdf_document().save_to(&mut buf).unwrap();
    bytes::Bytes::from(buf)
}

pub fn lenker() -> Lenker {
    Lenker {
        dokumentlager_url: "https://dokumentlager.test".to_owned(),
        svarut_url: "https://svarut.test".to_owned(),
    }
}

pub fn dato(ar: i32, maned: u32, dag: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(ar, maned, dag).unwrap()
}

pub fn utbetaling(referanse: &str, saksreferanse: Option<&str>) -> Utbetaling {
    Utbetaling {
        referanse: referanse.to_owned(),
        saksreferanse: saksreferanse.map(str::to_owned),
        status: UtbetalingsStatus::Utbetalt,
        belop: rust_decimal::Decimal::new(10_000, 2),
        beskrivelse: Some("Livsopphold".to_owned()),
        forfallsdato: None,
        utbetalingsdato: Some(dato(2020, 1, 15)),
        stoppetdato: None,
        fom: None,
        tom: None,
        mottaker: None,
        annen_mottaker: false,
        kontonummer: None,
        utbetalingsmetode: None,
        vilkar: Vec::new(),
        dokumentasjonkrav: Vec::new(),
        dato_hendelse: dato(2020, 1, 10).and_hms_opt(12, 0, 0).unwrap(),
    }
}

/// A digital application owned by [`FNR`] in kommune 0301, with both the
/// original application and an event document registered.
pub fn digisos_sak(id: &str) -> DigisosSak {
    DigisosSak {
        fiks_digisos_id: id.to_owned(),
        soker_fnr: FNR.to_owned(),
        fiks_org_id: "org".to_owned(),
        kommunenummer: "0301".to_owned(),
        sist_endret: SOKNAD_SENDT_MILLIS,
        original_soknad_nav: Some(OriginalSoknadNav {
            nav_ekstern_ref_id: "11000001".to_owned(),
            metadata: "soknad-meta".to_owned(),
            vedlegg_metadata: "vedlegg-meta".to_owned(),
            soknad_dokument: DokumentInfo {
                filnavn: "soknad.pdf".to_owned(),
                dokumentlager_dokument_id: "soknad-pdf".to_owned(),
                storrelse: 42,
            },
            vedlegg: Vec::new(),
            timestamp_sendt: SOKNAD_SENDT_MILLIS,
        }),
        ettersendt_info_nav: None,
        digisos_soker: Some(DigisosSoker {
            metadata: "soker-meta".to_owned(),
            dokumenter: Vec::new(),
            timestamp_sist_oppdatert: SOKNAD_SENDT_MILLIS,
        }),
        tilleggsinformasjon: None,
    }
}

pub fn kommune_info(kommunenummer: &str) -> KommuneInfo {
    KommuneInfo {
        kommunenummer: kommunenummer.to_owned(),
        kan_motta_soknader: true,
        kan_oppdatere_status: true,
        har_midlertidig_deaktivert_mottak: false,
        har_midlertidig_deaktivert_oppdateringer: false,
        har_nks_tilgang: false,
        behandlingsansvarlig: None,
    }
}

/// One ettersendelse as the fake records it.
#[derive(Debug, Clone)]
pub struct Opplasting {
    pub digisos_id: String,
    pub nav_ekstern_ref_id: String,
    pub spesifikasjon: JsonVedleggSpesifikasjon,
    pub filnavn: Vec<String>,
}

#[derive(Default)]
pub struct FakeFiks {
    saker: Mutex<HashMap<String, DigisosSak>>,
    dokumenter: Mutex<HashMap<String, Value>>,
    opplastinger: Mutex<Vec<Opplasting>>,
    sak_kall: AtomicUsize,
    file_exists: AtomicBool,
}

impl FakeFiks {
    pub fn add_sak(&self, sak: DigisosSak) {
        self.saker.lock().unwrap().insert(sak.fiks_digisos_id.clone(), sak);
    }

    pub fn add_dokument(&self, id: &str, dokument: Value) {
        self.dokumenter.lock().unwrap().insert(id.to_owned(), dokument);
    }

    pub fn opplastinger(&self) -> Vec<Opplasting> {
        self.opplastinger.lock().unwrap().clone()
    }

    /// Number of case reads that reached the fake.
    pub fn sak_kall(&self) -> usize {
        self.sak_kall.load(Ordering::SeqCst)
    }

    pub fn svar_file_exists(&self) {
        self.file_exists.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FiksClient for FakeFiks {
    async fn hent_digisos_sak(&self, digisos_id: &str, _token: &str) -> Result<DigisosSak, DomainError> {
        self.sak_kall.fetch_add(1, Ordering::SeqCst);
        self.saker
            .lock()
            .unwrap()
            .get(digisos_id)
            .cloned()
            .ok_or_else(|| FiksError::NotFound(digisos_id.to_owned()).into())
    }

    async fn hent_alle_digisos_saker(&self, _token: &str) -> Result<Vec<DigisosSak>, DomainError> {
        Ok(self.saker.lock().unwrap().values().cloned().collect())
    }

    async fn hent_dokument(&self, _digisos_id: &str, dokumentlager_id: &str, _token: &str) -> Result<Value, DomainError> {
        self.dokumenter
            .lock()
            .unwrap()
            .get(dokumentlager_id)
            .cloned()
            .ok_or_else(|| FiksError::NotFound(dokumentlager_id.to_owned()).into())
    }

    async fn last_opp_ny_ettersendelse(
        &self,
        _kommunenummer: &str,
        digisos_id: &str,
        nav_ekstern_ref_id: &str,
        spesifikasjon: &JsonVedleggSpesifikasjon,
        filer: Vec<FilForOpplasting>,
        _token: &str,
    ) -> Result<(), DomainError> {
        self.opplastinger.lock().unwrap().push(Opplasting {
            digisos_id: digisos_id.to_owned(),
            nav_ekstern_ref_id: nav_ekstern_ref_id.to_owned(),
            spesifikasjon: spesifikasjon.clone(),
            filnavn: filer.into_iter().map(|f| f.filnavn).collect(),
        });
        if self.file_exists.load(Ordering::SeqCst) {
            return Err(FiksError::FileExists(nav_ekstern_ref_id.to_owned()).into());
        }
        Ok(())
    }
}

/// Every kommune has innsyn turned on unless listed as deactivated.
#[derive(Default)]
pub struct FakeKommuneInfo {
    deaktivert: Mutex<HashSet<String>>,
}

impl FakeKommuneInfo {
    pub fn deaktiver(&self, kommunenummer: &str) {
        self.deaktivert.lock().unwrap().insert(kommunenummer.to_owned());
    }
}

#[async_trait]
impl KommuneInfoClient for FakeKommuneInfo {
    async fn get_kommune_info(&self, kommunenummer: &str) -> Result<KommuneInfo, DomainError> {
        let mut info = kommune_info(kommunenummer);
        info.kan_oppdatere_status = !self.deaktivert.lock().unwrap().contains(kommunenummer);
        Ok(info)
    }

    async fn get_all(&self) -> Result<Vec<KommuneInfo>, DomainError> {
        Ok(vec![kommune_info("0301")])
    }
}

#[derive(Default)]
pub struct FakePdl {
    person: Mutex<Option<PdlPerson>>,
    identer: Mutex<Vec<String>>,
    feiler: AtomicBool,
}

impl FakePdl {
    pub fn set_person(&self, person: PdlPerson) {
        *self.person.lock().unwrap() = Some(person);
    }

    pub fn set_identer(&self, identer: &[&str]) {
        *self.identer.lock().unwrap() = identer.iter().map(|i| (*i).to_owned()).collect();
    }

    pub fn set_feiler(&self) {
        self.feiler.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PdlClient for FakePdl {
    async fn hent_person(&self, _ident: &str, _token: &str) -> Result<Option<PdlPerson>, PdlError> {
        if self.feiler.load(Ordering::SeqCst) {
            return Err(PdlError::Transport("nede".to_owned()));
        }
        Ok(self.person.lock().unwrap().clone())
    }

    async fn hent_identer(&self, _ident: &str, _token: &str) -> Result<Vec<String>, PdlError> {
        if self.feiler.load(Ordering::SeqCst) {
            return Err(PdlError::Transport("nede".to_owned()));
        }
        Ok(self.identer.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeNorg {
    enheter: HashMap<String, NavEnhet>,
}

impl FakeNorg {
    pub fn with_enhet(enhetsnr: &str, navn: &str) -> Self {
        let enhet = NavEnhet {
            enhet_id: 100,
            navn: navn.to_owned(),
            enhet_nr: enhetsnr.to_owned(),
            sosiale_tjenester: None,
        };
        Self {
            enheter: HashMap::from([(enhetsnr.to_owned(), enhet)]),
        }
    }
}

#[async_trait]
impl NorgClient for FakeNorg {
    async fn hent_nav_enhet(&self, enhetsnr: &str) -> Result<NavEnhet, NorgError> {
        self.enheter
            .get(enhetsnr)
            .cloned()
            .ok_or_else(|| NorgError::NotFound(enhetsnr.to_owned()))
    }
}

#[derive(Default)]
pub struct FakeToggles {
    enabled: Mutex<HashSet<String>>,
    enabled_for_user: Mutex<HashSet<(String, String)>>,
}

impl FakeToggles {
    pub fn with_enabled(name: &str) -> Self {
        let toggles = Self::default();
        toggles.enable(name);
        toggles
    }

    pub fn enable(&self, name: &str) {
        self.enabled.lock().unwrap().insert(name.to_owned());
    }

    pub fn enable_for(&self, name: &str, user_id: &str) {
        self.enabled_for_user
            .lock()
            .unwrap()
            .insert((name.to_owned(), user_id.to_owned()));
    }
}

impl FeatureToggles for FakeToggles {
    fn is_enabled(&self, name: &str, user_id: Option<&str>, default: bool) -> bool {
        let for_user = user_id.is_some_and(|user| {
            self.enabled_for_user
                .lock()
                .unwrap()
                .contains(&(name.to_owned(), user.to_owned()))
        });
        for_user || self.enabled.lock().unwrap().contains(name) || default
    }
}

#[derive(Default)]
pub struct FakeVirusScan {
    infisert: AtomicBool,
}

impl FakeVirusScan {
    pub fn set_infisert(&self) {
        self.infisert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VirusScan for FakeVirusScan {
    async fn scan(&self, filnavn: &str, _data: &[u8]) -> Result<(), DomainError> {
        if self.infisert.load(Ordering::SeqCst) {
            return Err(DomainError::VirusFunnet(filnavn.to_owned()));
        }
        Ok(())
    }
}

/// A klage as the fake received it.
#[derive(Debug, Clone)]
pub struct SendtKlage {
    pub digisos_id: String,
    pub klage_id: Uuid,
    pub vedtak_id: String,
    pub klage_json: Value,
}

#[derive(Default)]
pub struct FakeKlageClient {
    klager: Mutex<Vec<FiksKlage>>,
    sendt: Mutex<Vec<SendtKlage>>,
    feiler: AtomicBool,
}

impl FakeKlageClient {
    pub fn add_klage(&self, klage: FiksKlage) {
        self.klager.lock().unwrap().push(klage);
    }

    pub fn sendt(&self) -> Vec<SendtKlage> {
        self.sendt.lock().unwrap().clone()
    }

    pub fn set_feiler(&self) {
        self.feiler.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KlageClient for FakeKlageClient {
    async fn send_klage(
        &self,
        digisos_id: &str,
        klage_id: Uuid,
        vedtak_id: &str,
        klage_json: Value,
        _vedlegg: &JsonVedleggSpesifikasjon,
        _token: &str,
    ) -> Result<(), DomainError> {
        if self.feiler.load(Ordering::SeqCst) {
            return Err(FiksError::Server {
                status: 500,
                message: "klage feilet".to_owned(),
            }
            .into());
        }
        self.sendt.lock().unwrap().push(SendtKlage {
            digisos_id: digisos_id.to_owned(),
            klage_id,
            vedtak_id: vedtak_id.to_owned(),
            klage_json,
        });
        Ok(())
    }

    async fn hent_klager(&self, digisos_id: &str, _token: &str) -> Result<Vec<FiksKlage>, DomainError> {
        if self.feiler.load(Ordering::SeqCst) {
            return Err(FiksError::Server {
                status: 500,
                message: "klage feilet".to_owned(),
            }
            .into());
        }
        Ok(self
            .klager
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.digisos_id == digisos_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryKlageUtkastRepository {
    utkast: Mutex<HashMap<Uuid, KlageUtkast>>,
}

#[async_trait]
impl KlageUtkastRepository for InMemoryKlageUtkastRepository {
    async fn insert(&self, utkast: &KlageUtkast) -> anyhow::Result<()> {
        self.utkast.lock().unwrap().insert(utkast.id, utkast.clone());
        Ok(())
    }

    async fn update(&self, utkast: &KlageUtkast) -> anyhow::Result<bool> {
        let mut alle = self.utkast.lock().unwrap();
        if !alle.contains_key(&utkast.id) {
            return Ok(false);
        }
        alle.insert(utkast.id, utkast.clone());
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<KlageUtkast>> {
        Ok(self.utkast.lock().unwrap().get(&id).cloned())
    }

    async fn list_for_sak(&self, fiks_digisos_id: &str) -> anyhow::Result<Vec<KlageUtkast>> {
        let mut liste: Vec<KlageUtkast> = self
            .utkast
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.fiks_digisos_id == fiks_digisos_id)
            .cloned()
            .collect();
        liste.sort_by_key(|u| u.created_at);
        Ok(liste)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.utkast.lock().unwrap().remove(&id).is_some())
    }
}

/// Every fake behind one handle, so a test can arrange upstream state and
/// then exercise the real service graph.
#[derive(Default)]
pub struct Fakes {
    pub fiks: Arc<FakeFiks>,
    pub kommune_info: Arc<FakeKommuneInfo>,
    pub pdl: Arc<FakePdl>,
    pub norg: Arc<FakeNorg>,
    pub virus_scan: Arc<FakeVirusScan>,
    pub toggles: Arc<FakeToggles>,
    pub klage: Arc<FakeKlageClient>,
    pub klage_utkast: Arc<InMemoryKlageUtkastRepository>,
}

impl Fakes {
    /// Registers `sak` with an event document holding `hendelser` and an
    /// original application without mottaker.
    pub fn add_sak_med_hendelser(&self, sak: DigisosSak, hendelser: Value) {
        if let Some(soker) = &sak.digisos_soker {
            self.fiks.add_dokument(
                &soker.metadata,
                json!({
                    "version": "1.0.0",
                    "avsender": {"systemnavn": "Testsystemet", "systemversjon": "1.0.0"},
                    "hendelser": hendelser
                }),
            );
        }
        if let Some(original) = &sak.original_soknad_nav {
            self.fiks.add_dokument(&original.metadata, json!({"version": "1.0.0"}));
            self.fiks.add_dokument(&original.vedlegg_metadata, json!({"vedlegg": []}));
        }
        self.fiks.add_sak(sak);
    }

    pub fn ports(&self) -> Ports {
        Ports {
            fiks: self.fiks.clone(),
            kommune_info: self.kommune_info.clone(),
            pdl: self.pdl.clone(),
            norg: self.norg.clone(),
            virus_scan: self.virus_scan.clone(),
            toggles: self.toggles.clone(),
            klage: self.klage.clone(),
            klage_utkast: self.klage_utkast.clone(),
        }
    }

    pub fn services(&self) -> Services {
        let mut cfg = InnsynConfig::default();
        cfg.fiks.dokumentlager_url = lenker().dokumentlager_url;
        cfg.fiks.svarut_url = lenker().svarut_url;
        let cache = Arc::new(InnsynCache::new(&cfg.cache));
        Services::new(&self.ports(), &cfg, cache)
    }
}
