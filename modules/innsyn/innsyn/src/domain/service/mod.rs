//! Use cases behind the REST surface.
//!
//! Services hold `Arc`s of each other and of the ports; [`Services::new`]
//! wires the whole graph once at startup.

pub mod fiks;
pub mod forelopig_svar;
pub mod hendelse;
pub mod innsyn;
pub mod klage;
pub mod kommune;
pub mod oppgave;
pub mod opplasting;
pub mod saks_status;
pub mod saksoversikt;
pub mod session;
pub mod soknads_status;
pub mod tilgang;
pub mod utbetalinger;
pub mod vedlegg;


use std::sync::Arc;

use crate::config::InnsynConfig;
use crate::domain::cache::InnsynCache;
use crate::domain::event::{EventService, Lenker};
use crate::domain::ports::{
    FeatureToggles, FiksClient, KlageClient, KlageUtkastRepository, KommuneInfoClient, NorgClient, PdlClient, VirusScan,
};

use self::fiks::FiksService;
use self::forelopig_svar::ForelopigSvarService;
use self::hendelse::HendelseService;
use self::innsyn::InnsynService;
use self::klage::KlageService;
use self::kommune::KommuneService;
use self::oppgave::OppgaveService;
use self::opplasting::VedleggOpplastingService;
use self::saks_status::SaksStatusService;
use self::saksoversikt::SaksOversiktService;
use self::session::SessionService;
use self::soknads_status::SoknadsStatusService;
use self::tilgang::TilgangskontrollService;
use self::utbetalinger::UtbetalingerService;
use self::vedlegg::VedleggService;

/// The upstream implementations the services run against.
#[derive(Clone)]
pub struct Ports {
    pub fiks: Arc<dyn FiksClient>,
    pub kommune_info: Arc<dyn KommuneInfoClient>,
    pub pdl: Arc<dyn PdlClient>,
    pub norg: Arc<dyn NorgClient>,
    pub virus_scan: Arc<dyn VirusScan>,
    pub toggles: Arc<dyn FeatureToggles>,
    pub klage: Arc<dyn KlageClient>,
    pub klage_utkast: Arc<dyn KlageUtkastRepository>,
}

#[derive(Clone)]
pub struct Services {
    pub tilgang: Arc<TilgangskontrollService>,
    pub fiks: Arc<FiksService>,
    pub kommune: Arc<KommuneService>,
    pub innsyn: Arc<InnsynService>,
    pub events: Arc<EventService>,
    pub session: Arc<SessionService>,
    pub soknads_status: Arc<SoknadsStatusService>,
    pub saks_status: Arc<SaksStatusService>,
    pub forelopig_svar: Arc<ForelopigSvarService>,
    pub vedlegg: Arc<VedleggService>,
    pub oppgaver: Arc<OppgaveService>,
    pub hendelser: Arc<HendelseService>,
    pub utbetalinger: Arc<UtbetalingerService>,
    pub saksoversikt: Arc<SaksOversiktService>,
    pub opplasting: Arc<VedleggOpplastingService>,
    pub klage: Arc<KlageService>,
}

impl Services {
    #[must_use]
    pub fn new(ports: &Ports, cfg: &InnsynConfig, cache: Arc<InnsynCache>) -> Self {
        let lenker = Lenker::from_config(&cfg.fiks);

        let tilgang = Arc::new(TilgangskontrollService::new(ports.pdl.clone(), cache.clone(), &cfg.auth));
        let fiks = Arc::new(FiksService::new(ports.fiks.clone(), tilgang.clone(), cache.clone()));
        let kommune = Arc::new(KommuneService::new(fiks.clone(), ports.kommune_info.clone(), cache));
        let innsyn = Arc::new(InnsynService::new(fiks.clone(), kommune.clone()));
        let events = Arc::new(EventService::new(
            innsyn.clone(),
            fiks.clone(),
            ports.norg.clone(),
            ports.toggles.clone(),
            lenker.clone(),
        ));
        let vedlegg = Arc::new(VedleggService::new(fiks.clone(), events.clone(), lenker.clone()));
        let oppgaver = Arc::new(OppgaveService::new(fiks.clone(), events.clone(), vedlegg.clone()));

        Self {
            session: Arc::new(SessionService::new(tilgang.clone())),
            soknads_status: Arc::new(SoknadsStatusService::new(
                fiks.clone(),
                events.clone(),
                kommune.clone(),
                lenker.clone(),
            )),
            saks_status: Arc::new(SaksStatusService::new(fiks.clone(), events.clone(), ports.klage.clone())),
            forelopig_svar: Arc::new(ForelopigSvarService::new(fiks.clone(), events.clone())),
            hendelser: Arc::new(HendelseService::new(
                fiks.clone(),
                events.clone(),
                vedlegg.clone(),
                ports.toggles.clone(),
            )),
            utbetalinger: Arc::new(UtbetalingerService::new(fiks.clone(), events.clone())),
            saksoversikt: Arc::new(SaksOversiktService::new(fiks.clone(), events.clone(), oppgaver.clone())),
            opplasting: Arc::new(VedleggOpplastingService::new(fiks.clone(), ports.virus_scan.clone())),
            klage: Arc::new(KlageService::new(
                fiks.clone(),
                ports.klage.clone(),
                ports.klage_utkast.clone(),
                lenker,
            )),
            tilgang,
            fiks,
            kommune,
            innsyn,
            events,
            vedlegg,
            oppgaver,
        }
    }
}
