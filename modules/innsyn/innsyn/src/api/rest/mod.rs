//! REST surface under `/api/v1/innsyn`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

#[cfg(test)]
mod handlers_test;
