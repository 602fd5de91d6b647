use super::mapping::ReverseLabelMapping;

/// Label returned for class indices the output mapping does not cover.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Default)]
pub struct LabelDecoder {
    labels: ReverseLabelMapping,
}

impl LabelDecoder {
    pub fn new(labels: ReverseLabelMapping) -> Self {
        Self { labels }
    }

    /// Never fails; unmapped indices decode to [`UNKNOWN_LABEL`].
    pub fn decode(&self, class_index: i64) -> &str {
        self.labels.get(class_index).unwrap_or(UNKNOWN_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::mapping::CategoryMapping;

    fn decoder() -> LabelDecoder {
        LabelDecoder::new(ReverseLabelMapping::invert(&CategoryMapping::from([
            ("No", 0),
            ("Yes", 1),
        ])))
    }

    #[test]
    fn decodes_known_indices() {
        let decoder = decoder();
        assert_eq!(decoder.decode(0), "No");
        assert_eq!(decoder.decode(1), "Yes");
    }

    #[test]
    fn unknown_indices_fall_back_to_sentinel() {
        let decoder = decoder();
        assert_eq!(decoder.decode(2), UNKNOWN_LABEL);
        assert_eq!(decoder.decode(-3), UNKNOWN_LABEL);
        assert_eq!(decoder.decode(i64::MAX), UNKNOWN_LABEL);
    }
}
