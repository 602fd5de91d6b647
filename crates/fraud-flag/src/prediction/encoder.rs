use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::domain::{BucketField, ClaimField, FeatureVector, PredictionRequest, SEVERITY_COLUMN};
use super::mapping::{CategoryTables, FeatureColumnOrder};

/// Per-field lookup results; `None` marks a value outside the training vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryResolutions {
    pub claim_rejection_reason: Option<u32>,
    pub payment_method: Option<u32>,
    pub prior_authorization: Option<u32>,
}

impl CategoryResolutions {
    pub fn get(&self, field: ClaimField) -> Option<u32> {
        match field {
            ClaimField::ClaimRejectionReason => self.claim_rejection_reason,
            ClaimField::PaymentMethod => self.payment_method,
            ClaimField::PriorAuthorization => self.prior_authorization,
        }
    }

    pub fn unresolved(&self) -> Vec<ClaimField> {
        ClaimField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }
}

/// One or more categorical values have no code in their mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCategory {
    pub resolutions: CategoryResolutions,
}

impl InvalidCategory {
    pub fn fields(&self) -> Vec<ClaimField> {
        self.resolutions.unresolved()
    }
}

impl fmt::Display for InvalidCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields().into_iter().map(ClaimField::key).collect();
        write!(
            f,
            "Invalid input values. Please use consistent categories from training data. Unrecognized: {}",
            fields.join(", ")
        )
    }
}

impl std::error::Error for InvalidCategory {}

/// Turns a request into the exact row the model was fitted on.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    categories: CategoryTables,
    columns: FeatureColumnOrder,
}

impl FeatureEncoder {
    pub fn new(categories: CategoryTables, columns: FeatureColumnOrder) -> Self {
        Self {
            categories,
            columns,
        }
    }

    /// Look up each categorical field after trimming surrounding whitespace.
    pub fn resolve(&self, request: &PredictionRequest) -> CategoryResolutions {
        let lookup = |field: ClaimField| {
            self.categories
                .for_field(field)
                .get(request.category_value(field).trim())
        };

        CategoryResolutions {
            claim_rejection_reason: lookup(ClaimField::ClaimRejectionReason),
            payment_method: lookup(ClaimField::PaymentMethod),
            prior_authorization: lookup(ClaimField::PriorAuthorization),
        }
    }

    /// Encode a request into a dense feature row.
    ///
    /// Fails before any row is built when a categorical value is unknown.
    /// Bucket labels are never validated: an unseen label names a column the
    /// model does not have, so that one-hot group stays all zero.
    pub fn encode(&self, request: &PredictionRequest) -> Result<FeatureVector, InvalidCategory> {
        let resolutions = self.resolve(request);
        let (Some(claim), Some(payment), Some(prior_auth)) = (
            resolutions.claim_rejection_reason,
            resolutions.payment_method,
            resolutions.prior_authorization,
        ) else {
            return Err(InvalidCategory { resolutions });
        };

        let mut sparse: HashMap<String, f64> = HashMap::with_capacity(6);
        sparse.insert(
            ClaimField::ClaimRejectionReason.column().to_string(),
            f64::from(claim),
        );
        sparse.insert(
            SEVERITY_COLUMN.to_string(),
            request.icd10_severity_score as f64,
        );
        sparse.insert(
            ClaimField::PaymentMethod.column().to_string(),
            f64::from(payment),
        );
        sparse.insert(
            ClaimField::PriorAuthorization.column().to_string(),
            f64::from(prior_auth),
        );
        for field in BucketField::ALL {
            sparse.insert(bucket_column(request, field), 1.0);
        }

        let entries = self
            .columns
            .iter()
            .map(|column| (column.to_string(), sparse.get(column).copied().unwrap_or(0.0)))
            .collect();

        Ok(FeatureVector::from_entries(entries))
    }

    /// Bucket fields whose one-hot column is missing from the trained columns.
    pub fn unrecognized_buckets(&self, request: &PredictionRequest) -> Vec<BucketField> {
        BucketField::ALL
            .into_iter()
            .filter(|field| !self.columns.contains(&bucket_column(request, *field)))
            .collect()
    }
}

fn bucket_column(request: &PredictionRequest, field: BucketField) -> String {
    field.column_for(request.bucket_value(field).trim())
}
