//! Claim fraud investigation flag prediction.
//!
//! A request's categorical fields are resolved through the training-time
//! vocabularies, its range buckets become one-hot column names, and the result
//! is projected onto the fitted column order before inference. The model's
//! class index is decoded back to its label through the inverted output mapping.

pub mod artifacts;
pub mod decoder;
pub mod domain;
pub mod encoder;
pub mod mapping;
pub mod model;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use artifacts::{ArtifactError, ArtifactSummary, ModelArtifacts};
pub use decoder::{LabelDecoder, UNKNOWN_LABEL};
pub use domain::{BucketField, ClaimField, FeatureVector, PredictionRequest};
pub use encoder::{CategoryResolutions, FeatureEncoder, InvalidCategory};
pub use mapping::{CategoryMapping, CategoryTables, FeatureColumnOrder, ReverseLabelMapping};
pub use model::{ClassifierModel, DecisionForest, InferenceError, ModelFormatError};
pub use router::{prediction_router, PredictionState};
pub use service::{Prediction, PredictionError, PredictionResponse, PredictionService};
