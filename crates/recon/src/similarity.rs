use std::fmt;

use rapidfuzz::fuzz;
use serde::Serialize;

use crate::error::ConfigurationError;

/// Normalized Indel similarity of two strings on a 0–100 scale.
///
/// `100.0` for identical strings, `0.0` when nothing lines up.
pub fn ratio(a: &str, b: &str) -> f64 {
    // rapidfuzz reports a normalized similarity in [0, 1]
    fuzz::ratio(a.chars(), b.chars()) * 100.0
}

/// Similarity cutoff for fuzzy matches. A pair matches only when its score is
/// strictly greater than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    pub const DEFAULT: MatchThreshold = MatchThreshold(90.0);

    /// Valid thresholds lie in `(0, 100]`.
    pub fn new(value: f64) -> Result<Self, ConfigurationError> {
        if value.is_finite() && value > 0.0 && value <= 100.0 {
            Ok(Self(value))
        } else {
            Err(ConfigurationError::ThresholdOutOfRange(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn accepts(self, score: f64) -> bool {
        score > self.0
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for MatchThreshold {
    type Error = ConfigurationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MatchThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
