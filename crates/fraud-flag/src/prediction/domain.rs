use std::fmt;

use serde::{Deserialize, Serialize};

/// Column the severity score is written to, exactly as the model was fitted.
pub const SEVERITY_COLUMN: &str = "ICD-10 Severity Score";

/// Claim attributes submitted for a fraud investigation flag prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub claim_rejection_reason: String,
    pub icd10_severity_score: i64,
    pub payment_method: String,
    /// Range label such as `"6-10"`.
    pub length_of_stay: String,
    /// Range label such as `"11-15"`.
    pub days_taken_to_claim: String,
    /// Usually `"Yes"` or `"No"`.
    pub prior_authorization: String,
}

impl PredictionRequest {
    pub fn category_value(&self, field: ClaimField) -> &str {
        match field {
            ClaimField::ClaimRejectionReason => &self.claim_rejection_reason,
            ClaimField::PaymentMethod => &self.payment_method,
            ClaimField::PriorAuthorization => &self.prior_authorization,
        }
    }

    pub fn bucket_value(&self, field: BucketField) -> &str {
        match field {
            BucketField::DaysTakenToClaim => &self.days_taken_to_claim,
            BucketField::LengthOfStay => &self.length_of_stay,
        }
    }
}

/// Categorical request fields resolved through a trained category mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimField {
    ClaimRejectionReason,
    PaymentMethod,
    PriorAuthorization,
}

impl ClaimField {
    pub const ALL: [ClaimField; 3] = [
        ClaimField::ClaimRejectionReason,
        ClaimField::PaymentMethod,
        ClaimField::PriorAuthorization,
    ];

    /// Request field name, also the stem of the mapping artifact.
    pub fn key(self) -> &'static str {
        match self {
            ClaimField::ClaimRejectionReason => "claim_rejection_reason",
            ClaimField::PaymentMethod => "payment_method",
            ClaimField::PriorAuthorization => "prior_authorization",
        }
    }

    /// Feature column holding the encoded value.
    pub fn column(self) -> &'static str {
        match self {
            ClaimField::ClaimRejectionReason => "Claim Rejection Reason",
            ClaimField::PaymentMethod => "Payment Method",
            ClaimField::PriorAuthorization => "Prior Authorization",
        }
    }
}

impl fmt::Display for ClaimField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Range fields that become one-hot column names instead of encoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketField {
    DaysTakenToClaim,
    LengthOfStay,
}

impl BucketField {
    pub const ALL: [BucketField; 2] = [BucketField::DaysTakenToClaim, BucketField::LengthOfStay];

    pub fn key(self) -> &'static str {
        match self {
            BucketField::DaysTakenToClaim => "days_taken_to_claim",
            BucketField::LengthOfStay => "length_of_stay",
        }
    }

    pub fn column_prefix(self) -> &'static str {
        match self {
            BucketField::DaysTakenToClaim => "days_taken_to_claim_",
            BucketField::LengthOfStay => "Length of Stay_",
        }
    }

    /// One-hot column name for a bucket label, e.g. `Length of Stay_6-10`.
    pub fn column_for(self, bucket: &str) -> String {
        format!("{}{}", self.column_prefix(), bucket)
    }
}

impl fmt::Display for BucketField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Dense model input row; names and order always match the trained column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub(crate) fn from_entries(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_columns_concatenate_prefix_and_label() {
        assert_eq!(
            BucketField::LengthOfStay.column_for("6-10"),
            "Length of Stay_6-10"
        );
        assert_eq!(
            BucketField::DaysTakenToClaim.column_for("11-15"),
            "days_taken_to_claim_11-15"
        );
    }

    #[test]
    fn feature_vector_serializes_in_column_order() {
        let vector = FeatureVector::from_entries(vec![
            ("b".to_string(), 2.0),
            ("a".to_string(), 1.0),
        ]);
        let json = serde_json::to_string(&vector).expect("serializes");
        assert_eq!(json, r#"{"b":2.0,"a":1.0}"#);
        assert_eq!(vector.get("a"), Some(1.0));
        assert_eq!(vector.get("c"), None);
    }
}
