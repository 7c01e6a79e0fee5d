use rosterlink_core::SchemaError;
use thiserror::Error;

/// Invalid call parameters, caught before any row is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Unrecognised join mode name.
    #[error("unknown join mode '{0}' (expected one of: inner, left_only, right_only, left_outer, right_outer, full_outer)")]
    UnknownJoinMode(String),
    /// Threshold outside `(0, 100]` or not a finite number.
    #[error("match threshold must be in (0, 100], got {0}")]
    ThresholdOutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum ReconError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate source, unknown reference, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A configured source has no table in the input.
    #[error("source '{0}' has no data")]
    MissingSource(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_pass_through_unchanged() {
        let inner = SchemaError::DuplicateField("team".into());
        let err: ReconError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(matches!(err, ReconError::Schema(e) if e == inner));
    }

    #[test]
    fn threshold_message() {
        let err = ConfigurationError::ThresholdOutOfRange(0.0);
        assert_eq!(err.to_string(), "match threshold must be in (0, 100], got 0");
    }
}
