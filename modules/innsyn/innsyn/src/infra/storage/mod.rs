//! Storage of klage drafts.

pub mod entity;
pub mod klage_utkast_repo;
pub mod mapper;
pub mod migrations;
