use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::artifacts::ArtifactSummary;
use super::domain::PredictionRequest;
use super::model::ClassifierModel;
use super::service::{PredictionError, PredictionResponse, PredictionService};

/// Shared state behind the prediction routes.
pub struct PredictionState<M> {
    pub service: PredictionService<M>,
    pub summary: Option<ArtifactSummary>,
}

/// Router exposing the prediction endpoint and the root status route.
pub fn prediction_router<M>(state: Arc<PredictionState<M>>) -> Router
where
    M: ClassifierModel + 'static,
{
    Router::new()
        .route("/", get(root_handler::<M>))
        .route("/predict", post(predict_handler::<M>))
        .with_state(state)
}

pub(crate) async fn root_handler<M>(State(state): State<Arc<PredictionState<M>>>) -> Response
where
    M: ClassifierModel + 'static,
{
    let payload = json!({
        "message": "Fraud investigation flag prediction API is running",
        "artifacts": state.summary,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn predict_handler<M>(
    State(state): State<Arc<PredictionState<M>>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response
where
    M: ClassifierModel + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let body = json!({ "error": rejection.body_text() });
            return (rejection.status(), Json(body)).into_response();
        }
    };

    let result = state.service.predict(&request);
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(PredictionError::InvalidCategory(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(PredictionError::Inference(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(PredictionResponse::from(result))).into_response()
}
