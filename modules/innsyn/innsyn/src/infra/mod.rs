//! Adapters behind the domain ports: reqwest clients for the upstream
//! systems, the Unleash poller and SeaORM storage for klage drafts.

pub mod fiks;
pub mod http;
pub mod klage;
pub mod kommune_info;
pub mod norg;
pub mod pdl;
pub mod storage;
pub mod texas;
pub mod unleash;
pub mod virusscan;
