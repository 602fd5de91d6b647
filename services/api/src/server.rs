use crate::cli::ServeArgs;
use crate::infra::{cors_layer, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fraud_flag::config::AppConfig;
use fraud_flag::error::AppError;
use fraud_flag::prediction::{prediction_router, ModelArtifacts, PredictionService, PredictionState};
use fraud_flag::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(dir) = args.artifacts.take() {
        config.artifacts.dir = dir;
    }

    telemetry::init(&config.telemetry)?;

    let artifacts = ModelArtifacts::load_dir(&config.artifacts.dir)?;
    let summary = artifacts.summary();
    let state = Arc::new(PredictionState {
        service: PredictionService::from_artifacts(artifacts),
        summary: Some(summary),
    });

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_operational_routes(prediction_router(state))
        .layer(Extension(app_state))
        .layer(cors_layer(&config.cors))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        artifacts = %config.artifacts.dir.display(),
        "fraud investigation flag service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
