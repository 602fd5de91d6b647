use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::ClaimField;
use super::mapping::{
    CategoryMapping, CategoryTables, ColumnOrderError, FeatureColumnOrder, ReverseLabelMapping,
};
use super::model::{DecisionForest, ModelFormatError};

/// Stem of the output-class mapping artifact.
pub const LABEL_MAPPING_STEM: &str = "fraud_investigation_flag";
pub const COLUMNS_FILE: &str = "model_columns.json";
pub const MODEL_FILE: &str = "model.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(
        "no mapping for '{stem}' in {} (expected {stem}_mapping.json or {stem}_mapping.csv)",
        dir.display()
    )]
    MissingMapping { dir: PathBuf, stem: String },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid CSV in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[error("invalid feature columns in {}: {source}", path.display())]
    Columns {
        path: PathBuf,
        source: ColumnOrderError,
    },
    #[error("invalid model in {}: {source}", path.display())]
    Model {
        path: PathBuf,
        source: ModelFormatError,
    },
}

/// Everything the prediction path needs, loaded once before serving.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub categories: CategoryTables,
    pub labels: ReverseLabelMapping,
    pub columns: FeatureColumnOrder,
    pub model: DecisionForest,
    pub loaded_at: DateTime<Utc>,
}

impl ModelArtifacts {
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();

        let categories = CategoryTables {
            claim_rejection_reason: load_mapping(dir, ClaimField::ClaimRejectionReason.key())?,
            payment_method: load_mapping(dir, ClaimField::PaymentMethod.key())?,
            prior_authorization: load_mapping(dir, ClaimField::PriorAuthorization.key())?,
        };
        let labels = ReverseLabelMapping::invert(&load_mapping(dir, LABEL_MAPPING_STEM)?);
        let columns = load_columns(&dir.join(COLUMNS_FILE))?;
        let model = load_model(&dir.join(MODEL_FILE))?;

        let artifacts = Self {
            categories,
            labels,
            columns,
            model,
            loaded_at: Utc::now(),
        };

        info!(
            dir = %dir.display(),
            columns = artifacts.columns.len(),
            classes = artifacts.labels.len(),
            trees = artifacts.model.tree_count(),
            "model artifacts loaded"
        );

        Ok(artifacts)
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            loaded_at: self.loaded_at,
            feature_columns: self.columns.len(),
            trees: self.model.tree_count(),
            vocabulary: ClaimField::ALL
                .into_iter()
                .map(|field| VocabularySize {
                    field,
                    categories: self.categories.for_field(field).len(),
                })
                .collect(),
            labels: self
                .labels
                .labels()
                .into_iter()
                .map(|(_, label)| label.to_string())
                .collect(),
        }
    }
}

/// Public description of the loaded artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub loaded_at: DateTime<Utc>,
    pub feature_columns: usize,
    pub trees: usize,
    pub vocabulary: Vec<VocabularySize>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VocabularySize {
    pub field: ClaimField,
    pub categories: usize,
}

fn open(path: &Path) -> Result<BufReader<File>, ArtifactError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Prefer `<stem>_mapping.json`, fall back to `<stem>_mapping.csv`.
fn load_mapping(dir: &Path, stem: &str) -> Result<CategoryMapping, ArtifactError> {
    let json_path = dir.join(format!("{stem}_mapping.json"));
    if json_path.is_file() {
        return CategoryMapping::from_json_reader(open(&json_path)?).map_err(|source| {
            ArtifactError::Json {
                path: json_path,
                source,
            }
        });
    }

    let csv_path = dir.join(format!("{stem}_mapping.csv"));
    if csv_path.is_file() {
        return CategoryMapping::from_csv_reader(open(&csv_path)?).map_err(|source| {
            ArtifactError::Csv {
                path: csv_path,
                source,
            }
        });
    }

    Err(ArtifactError::MissingMapping {
        dir: dir.to_path_buf(),
        stem: stem.to_string(),
    })
}

fn load_columns(path: &Path) -> Result<FeatureColumnOrder, ArtifactError> {
    let columns: Vec<String> =
        serde_json::from_reader(open(path)?).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    FeatureColumnOrder::new(columns).map_err(|source| ArtifactError::Columns {
        path: path.to_path_buf(),
        source,
    })
}

fn load_model(path: &Path) -> Result<DecisionForest, ArtifactError> {
    DecisionForest::from_json_reader(open(path)?).map_err(|source| ArtifactError::Model {
        path: path.to_path_buf(),
        source,
    })
}
