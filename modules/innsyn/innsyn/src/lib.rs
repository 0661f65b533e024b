//! Innsyn
//!
//! Lets citizens follow their sosialhjelp application: status, case
//! history, decisions, payments and requested documentation. Data comes
//! from Fiks (case and documents), PDL (identity and address protection),
//! Norg (NAV offices) and Unleash (feature toggles); attachments are
//! virus-scanned before they are forwarded to the municipality.
//!
//! The wire contracts live in `innsyn-sdk` and are re-exported here.

pub use innsyn_sdk as sdk;

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infra;
pub mod state;

pub use config::InnsynConfig;
pub use state::AppState;
