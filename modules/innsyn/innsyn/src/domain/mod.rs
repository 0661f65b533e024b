pub mod cache;
pub mod error;
pub mod event;
pub mod model;
pub mod ports;
pub mod service;
pub mod util;
pub mod xsrf;

#[cfg(test)]
pub(crate) mod testing;
