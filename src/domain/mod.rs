//! Core domain types and logic.

pub mod hyperparams;
pub mod dna;
pub mod metrics_record;
pub mod extract;
pub mod aggregate;
pub mod score;
pub mod routes;
pub mod config_validation;
pub mod error;
