use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::prediction::domain::{FeatureVector, PredictionRequest};
use crate::prediction::mapping::{
    CategoryMapping, CategoryTables, FeatureColumnOrder, ReverseLabelMapping,
};
use crate::prediction::model::{ClassifierModel, InferenceError};
use crate::prediction::{
    prediction_router, FeatureEncoder, LabelDecoder, PredictionService, PredictionState,
};

pub(super) const COLUMNS: [&str; 10] = [
    "Claim Rejection Reason",
    "ICD-10 Severity Score",
    "Payment Method",
    "Prior Authorization",
    "Length of Stay_1-5",
    "Length of Stay_6-10",
    "Length of Stay_11-15",
    "days_taken_to_claim_1-10",
    "days_taken_to_claim_11-15",
    "days_taken_to_claim_16-30",
];

pub(super) fn categories() -> CategoryTables {
    CategoryTables {
        claim_rejection_reason: CategoryMapping::from([
            ("Coding Error", 0),
            ("Duplicate Claim", 1),
            ("Incomplete Documentation", 2),
            ("Policy Lapse", 3),
        ]),
        payment_method: CategoryMapping::from([
            ("Insurance", 0),
            ("Self-Pay", 1),
            ("Medicare", 2),
        ]),
        prior_authorization: CategoryMapping::from([("Yes", 0), ("No", 1)]),
    }
}

pub(super) fn columns() -> FeatureColumnOrder {
    FeatureColumnOrder::new(COLUMNS.iter().map(|name| name.to_string()).collect())
        .expect("valid columns")
}

pub(super) fn encoder() -> FeatureEncoder {
    FeatureEncoder::new(categories(), columns())
}

pub(super) fn decoder() -> LabelDecoder {
    LabelDecoder::new(ReverseLabelMapping::invert(&CategoryMapping::from([
        ("No", 0),
        ("Yes", 1),
    ])))
}

pub(super) fn request() -> PredictionRequest {
    PredictionRequest {
        claim_rejection_reason: "Incomplete Documentation".to_string(),
        icd10_severity_score: 5,
        payment_method: "Self-Pay".to_string(),
        length_of_stay: "6-10".to_string(),
        days_taken_to_claim: "11-15".to_string(),
        prior_authorization: "Yes".to_string(),
    }
}

/// Returns a fixed class and records every row it receives.
#[derive(Default)]
pub(super) struct RecordingModel {
    pub(super) class_index: i64,
    pub(super) calls: AtomicUsize,
    pub(super) last_row: std::sync::Mutex<Option<FeatureVector>>,
}

impl RecordingModel {
    pub(super) fn returning(class_index: i64) -> Self {
        Self {
            class_index,
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassifierModel for RecordingModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_row.lock().expect("row mutex poisoned") = Some(features.clone());
        Ok(self.class_index)
    }
}

pub(super) struct FailingModel;

impl ClassifierModel for FailingModel {
    fn predict(&self, _features: &FeatureVector) -> Result<i64, InferenceError> {
        Err(InferenceError::Model(
            "expected 12 input columns, got 10".to_string(),
        ))
    }
}

pub(super) struct PanickingModel;

impl ClassifierModel for PanickingModel {
    fn predict(&self, _features: &FeatureVector) -> Result<i64, InferenceError> {
        panic!("tensor dtype mismatch")
    }
}

pub(super) fn service_with<M: ClassifierModel + 'static>(model: Arc<M>) -> PredictionService<M> {
    PredictionService::new(encoder(), decoder(), model)
}

pub(super) fn router_with<M: ClassifierModel + 'static>(model: Arc<M>) -> axum::Router {
    prediction_router(Arc::new(PredictionState {
        service: service_with(model),
        summary: None,
    }))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
