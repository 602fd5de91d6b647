use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::domain::ClaimField;

/// Training-time vocabulary for one categorical field: label -> code.
///
/// Lookups are exact and case-sensitive; anything not present as a key is an
/// invalid value for the field. Entries keep the order of the source file; a
/// repeated label keeps its first position and takes the last code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMapping {
    entries: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl CategoryMapping {
    fn insert(&mut self, label: String, code: u32) {
        match self.index.get(&label) {
            Some(position) => self.entries[*position].1 = code,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, code));
            }
        }
    }

    /// Parse a JSON object of `{"label": code}` pairs.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Parse a CSV export with a `label,code` header.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut mapping = Self::default();

        for row in csv_reader.deserialize::<MappingRow>() {
            let row = row?;
            mapping.insert(row.label, row.code);
        }

        Ok(mapping)
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.index
            .get(label)
            .map(|position| self.entries[*position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.entries
            .iter()
            .map(|(label, code)| (label.as_str(), *code))
    }
}

impl<const N: usize> From<[(&str, u32); N]> for CategoryMapping {
    fn from(pairs: [(&str, u32); N]) -> Self {
        let mut mapping = Self::default();
        for (label, code) in pairs {
            mapping.insert(label.to_string(), code);
        }
        mapping
    }
}

impl<'de> Deserialize<'de> for CategoryMapping {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = CategoryMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of label -> non-negative integer code")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut mapping = CategoryMapping::default();
                while let Some((label, code)) = access.next_entry::<String, u32>()? {
                    mapping.insert(label, code);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

#[derive(Debug, Deserialize)]
struct MappingRow {
    label: String,
    code: u32,
}

/// The three categorical vocabularies consumed by the encoder.
#[derive(Debug, Clone, Default)]
pub struct CategoryTables {
    pub claim_rejection_reason: CategoryMapping,
    pub payment_method: CategoryMapping,
    pub prior_authorization: CategoryMapping,
}

impl CategoryTables {
    pub fn for_field(&self, field: ClaimField) -> &CategoryMapping {
        match field {
            ClaimField::ClaimRejectionReason => &self.claim_rejection_reason,
            ClaimField::PaymentMethod => &self.payment_method,
            ClaimField::PriorAuthorization => &self.prior_authorization,
        }
    }
}

/// Model class index -> label, derived by inverting the output mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseLabelMapping {
    labels: HashMap<u32, String>,
}

impl ReverseLabelMapping {
    /// Invert a label -> code mapping.
    ///
    /// Labels are visited in file order and a later label overwrites an
    /// earlier one that shares its code. Every overwrite is logged.
    pub fn invert(forward: &CategoryMapping) -> Self {
        let mut labels = HashMap::with_capacity(forward.len());
        for (label, code) in forward.iter() {
            if let Some(previous) = labels.insert(code, label.to_string()) {
                warn!(
                    code,
                    kept = label,
                    dropped = %previous,
                    "output label mapping is not bijective; keeping the last label"
                );
            }
        }
        Self { labels }
    }

    pub fn get(&self, class_index: i64) -> Option<&str> {
        let code = u32::try_from(class_index).ok()?;
        self.labels.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels ordered by class index.
    pub fn labels(&self) -> Vec<(u32, &str)> {
        let mut labels: Vec<_> = self
            .labels
            .iter()
            .map(|(code, label)| (*code, label.as_str()))
            .collect();
        labels.sort_by_key(|(code, _)| *code);
        labels
    }
}

/// Ordered column names of the model's input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureColumnOrder {
    columns: Vec<String>,
}

/// Reasons a column list cannot describe a model row.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ColumnOrderError {
    #[error("feature column list is empty")]
    Empty,
    #[error("feature column '{0}' appears more than once")]
    Duplicate(String),
}

impl FeatureColumnOrder {
    pub fn new(columns: Vec<String>) -> Result<Self, ColumnOrderError> {
        if columns.is_empty() {
            return Err(ColumnOrderError::Empty);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ColumnOrderError::Duplicate(column.clone()));
            }
        }

        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(String::as_str)
    }
}
