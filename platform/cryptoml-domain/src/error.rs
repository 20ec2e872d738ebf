/// Failure modes of the feature/target assembly pipeline.
///
/// Every variant aborts the build it occurs in; there is no partial output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    /// A transform needs more observations than the input carries.
    #[error("insufficient history for {stage}: required {required} rows, got {available}")]
    InsufficientHistory {
        stage: String,
        required: usize,
        available: usize,
    },

    /// Two facets produced the same column name during a join.
    #[error("integrity violation: duplicate column '{column}'")]
    IntegrityViolation { column: String },

    /// Invalid parameters, rejected when a config struct is constructed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input series violate a precondition (ordering, duplicates, shape, non-finite values).
    #[error("upstream data error: {0}")]
    UpstreamData(String),

    /// No feature column carries a single value.
    #[error("feature table has no non-missing column")]
    EmptyFeatureSet,
}

impl DatasetError {
    pub fn insufficient(stage: impl Into<String>, required: usize, available: usize) -> Self {
        Self::InsufficientHistory {
            stage: stage.into(),
            required,
            available,
        }
    }
}

pub type DatasetResult<T> = Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::DatasetError;

    #[test]
    fn messages_name_the_offending_stage() {
        let err = DatasetError::insufficient("stl(close)", 14, 9);
        assert_eq!(
            err.to_string(),
            "insufficient history for stl(close): required 14 rows, got 9"
        );
        let err = DatasetError::IntegrityViolation {
            column: "close".to_string(),
        };
        assert!(err.to_string().contains("'close'"));
    }
}
