use clap::Args;
use fraud_flag::config::AppConfig;
use fraud_flag::error::AppError;
use fraud_flag::prediction::{ModelArtifacts, PredictionRequest, PredictionService};
use fraud_flag::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Directory holding the model and mapping files (defaults to APP_ARTIFACT_DIR)
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
    #[arg(long)]
    pub(crate) claim_rejection_reason: String,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) icd10_severity_score: i64,
    #[arg(long)]
    pub(crate) payment_method: String,
    /// Length of stay bucket, e.g. 6-10
    #[arg(long)]
    pub(crate) length_of_stay: String,
    /// Claim delay bucket, e.g. 11-15
    #[arg(long)]
    pub(crate) days_taken_to_claim: String,
    #[arg(long)]
    pub(crate) prior_authorization: String,
    /// Print the encoded feature row before the prediction
    #[arg(long)]
    pub(crate) show_features: bool,
}

impl PredictArgs {
    pub(crate) fn request(&self) -> PredictionRequest {
        PredictionRequest {
            claim_rejection_reason: self.claim_rejection_reason.clone(),
            icd10_severity_score: self.icd10_severity_score,
            payment_method: self.payment_method.clone(),
            length_of_stay: self.length_of_stay.clone(),
            days_taken_to_claim: self.days_taken_to_claim.clone(),
            prior_authorization: self.prior_authorization.clone(),
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct InspectArgs {
    /// Directory holding the model and mapping files (defaults to APP_ARTIFACT_DIR)
    #[arg(long)]
    pub(crate) artifacts: Option<PathBuf>,
}

fn load_artifacts(dir: Option<PathBuf>) -> Result<ModelArtifacts, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let dir = dir.unwrap_or(config.artifacts.dir);
    Ok(ModelArtifacts::load_dir(dir)?)
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let request = args.request();
    let service = PredictionService::from_artifacts(load_artifacts(args.artifacts)?);

    if args.show_features {
        match service.encode(&request) {
            Ok(features) => {
                println!("Encoded features");
                for (name, value) in features.iter() {
                    println!("- {}: {}", name, value);
                }
            }
            Err(invalid) => println!("Encoded features unavailable: {}", invalid),
        }
    }

    let response = service.respond(&request);
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("Response payload unavailable: {}", err),
    }

    Ok(())
}

pub(crate) fn run_inspect(args: InspectArgs) -> Result<(), AppError> {
    let artifacts = load_artifacts(args.artifacts)?;
    let summary = artifacts.summary();

    println!("Model artifacts (loaded {})", summary.loaded_at.to_rfc3339());
    println!("\nCategory vocabularies");
    for entry in &summary.vocabulary {
        let mapping = artifacts.categories.for_field(entry.field);
        let labels: Vec<&str> = mapping.labels().collect();
        println!(
            "- {}: {} values ({})",
            entry.field,
            entry.categories,
            labels.join(", ")
        );
    }

    println!("\nFeature columns ({})", summary.feature_columns);
    for (position, column) in artifacts.columns.iter().enumerate() {
        println!("  {:>2}. {}", position, column);
    }

    println!("\nOutput classes");
    for (code, label) in artifacts.labels.labels() {
        println!("- {} -> {}", code, label);
    }

    println!("\nDecision forest: {} trees", summary.trees);
    Ok(())
}
