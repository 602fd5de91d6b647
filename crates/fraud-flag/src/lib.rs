//! Feature encoding, inference and label decoding for the claim fraud
//! investigation flag model.

pub mod config;
pub mod error;
pub mod prediction;
pub mod telemetry;
