//! Innsyn SDK
//!
//! Serde models for the documents exchanged with Fiks: the case envelope
//! (`DigisosSak`), the caseworker event stream (`JsonDigisosSoker`), the
//! original application (`JsonSoknad`), attachment specifications and
//! municipality configuration.
//!
//! These types mirror external JSON contracts. They carry no behavior beyond
//! small accessors; the innsyn module owns all interpretation.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod digisos_sak;
pub mod digisos_soker;
pub mod klage;
pub mod kommune_info;
pub mod soknad;
pub mod vedlegg;

pub use digisos_sak::{
    DigisosSak, DigisosSoker, DokumentInfo, Ettersendelse, EttersendtInfoNav, OriginalSoknadNav,
    Tilleggsinformasjon,
};
pub use digisos_soker::{
    JsonAvsender, JsonDigisosSoker, JsonDokumentasjonEtterspurt, JsonDokumentasjonkrav,
    JsonDokumenter, JsonFilreferanse, JsonForelopigSvar, JsonForvaltningsbrev, JsonHendelse,
    JsonSaksStatus, JsonSaksStatusStatus, JsonSoknadsStatus, JsonSoknadsStatusStatus,
    JsonTildeltNavKontor, JsonUtbetaling, JsonUtbetalingStatus, JsonUtfall, JsonVedtakFattet,
    JsonOppgaveStatus, JsonRammevedtak, JsonVedtaksfil, JsonVilkar,
};
pub use klage::{FiksKlage, FiksKlageDokument, KlageInput, SendtKvittering, SendtStatus};
pub use kommune_info::KommuneInfo;
pub use soknad::{JsonSoknad, JsonSoknadsmottaker};
pub use vedlegg::{
    JsonFiler, JsonVedlegg, JsonVedleggSpesifikasjon, LASTET_OPP_STATUS, VEDLEGG_KREVES_STATUS,
    VedleggHendelseType,
};
