use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use super::artifacts::ModelArtifacts;
use super::decoder::LabelDecoder;
use super::domain::{FeatureVector, PredictionRequest};
use super::encoder::{CategoryResolutions, FeatureEncoder, InvalidCategory};
use super::model::{ClassifierModel, DecisionForest, InferenceError};

/// Decoded model output for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub class_index: i64,
    pub label: String,
}

/// Error raised by the prediction service.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategory),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Body returned by the prediction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Prediction {
        prediction: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<CategoryResolutions>,
    },
}

impl From<Result<Prediction, PredictionError>> for PredictionResponse {
    fn from(result: Result<Prediction, PredictionError>) -> Self {
        match result {
            Ok(prediction) => PredictionResponse::Prediction {
                prediction: prediction.label,
            },
            Err(PredictionError::InvalidCategory(invalid)) => PredictionResponse::Error {
                error: invalid.to_string(),
                details: Some(invalid.resolutions),
            },
            Err(PredictionError::Inference(err)) => PredictionResponse::Error {
                error: err.to_string(),
                details: None,
            },
        }
    }
}

/// Sequences encoding, inference and decoding over immutable shared tables.
pub struct PredictionService<M> {
    encoder: FeatureEncoder,
    decoder: LabelDecoder,
    model: Arc<M>,
}

impl<M> PredictionService<M>
where
    M: ClassifierModel + 'static,
{
    pub fn new(encoder: FeatureEncoder, decoder: LabelDecoder, model: Arc<M>) -> Self {
        Self {
            encoder,
            decoder,
            model,
        }
    }

    /// Encode a request without running the model.
    pub fn encode(&self, request: &PredictionRequest) -> Result<FeatureVector, InvalidCategory> {
        self.encoder.encode(request)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictionError> {
        let features = match self.encoder.encode(request) {
            Ok(features) => features,
            Err(invalid) => {
                let fields: Vec<&str> = invalid.fields().into_iter().map(|f| f.key()).collect();
                warn!(fields = ?fields, "rejected prediction with unknown categories");
                return Err(invalid.into());
            }
        };

        let unrecognized = self.encoder.unrecognized_buckets(request);
        if !unrecognized.is_empty() {
            let fields: Vec<&str> = unrecognized.into_iter().map(|f| f.key()).collect();
            warn!(
                fields = ?fields,
                "bucket value has no trained column; one-hot group left at zero"
            );
        }

        let class_index = self.infer(&features).map_err(|err| {
            error!(error = %err, "model inference failed");
            err
        })?;

        let label = self.decoder.decode(class_index).to_string();
        debug!(class_index, label = %label, "prediction decoded");

        Ok(Prediction { class_index, label })
    }

    /// Run the model, converting a panic inside it into an error.
    fn infer(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        let model = &self.model;
        panic::catch_unwind(AssertUnwindSafe(|| model.predict(features))).unwrap_or_else(
            |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(InferenceError::Panicked(message))
            },
        )
    }

    pub fn respond(&self, request: &PredictionRequest) -> PredictionResponse {
        self.predict(request).into()
    }
}

impl PredictionService<DecisionForest> {
    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        let ModelArtifacts {
            categories,
            labels,
            columns,
            model,
            ..
        } = artifacts;

        Self::new(
            FeatureEncoder::new(categories, columns),
            LabelDecoder::new(labels),
            Arc::new(model),
        )
    }
}
