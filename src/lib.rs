pub mod adduct;
pub mod classify;
pub mod clean;
pub mod config;
pub mod database;
pub mod dataset;
pub mod descriptors;
pub mod domain;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod smiles;
