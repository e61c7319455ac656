use serde::Deserialize;

use crate::error::ReconcileError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation knobs. All carry documented defaults; `validate` runs at
/// load so misuse fails at startup, never mid-operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// A pair matches only at or above this confidence. Deliberately strict:
    /// auto-match is the sole fraud gate.
    pub match_threshold: f64,
    /// Payment and notification timestamps must agree within this window,
    /// and auto-match only considers payments created within it.
    pub time_window_minutes: i64,
    /// Relative amount tolerance against the larger amount.
    pub amount_tolerance: f64,
    pub weights: MatchWeights,
    pub validity: ValidityConfig,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.95,
            time_window_minutes: 10,
            amount_tolerance: 0.01,
            weights: MatchWeights::default(),
            validity: ValidityConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Agreement weights
// ---------------------------------------------------------------------------

/// Weights for the pairwise confidence sum. Amount dominates: it is the one
/// field whose error is financially asymmetric.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub amount: f64,
    pub time: f64,
    pub reference: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            amount: 0.6,
            time: 0.3,
            reference: 0.1,
        }
    }
}

impl MatchWeights {
    fn sum(&self) -> f64 {
        self.amount + self.time + self.reference
    }
}

// ---------------------------------------------------------------------------
// Validity
// ---------------------------------------------------------------------------

/// Single-source acceptance knobs.
///
/// How strict to be on timestamps and the OCR floor is a deployment policy
/// decision, not an algorithm constant — both are exposed here.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ValidityConfig {
    /// Floor on recognizer confidence. Documented deployment range is
    /// roughly 0.25 (lenient) to 0.7 (strict).
    pub min_ocr_confidence: f64,
    /// Floor on the combined image-quality score.
    pub min_image_quality: f64,
    /// A timestamp older than this no longer counts as valid.
    pub recency_window_hours: i64,
    /// When false, a missing or stale timestamp blocks the timestamp boost
    /// but not acceptance.
    pub require_timestamp: bool,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            min_ocr_confidence: 0.7,
            min_image_quality: 0.5,
            recency_window_hours: 24,
            require_timestamp: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconcileConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconcileError> {
        let config: ReconcileConfig =
            toml::from_str(input).map_err(|e| ReconcileError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        fn unit_range(name: &str, value: f64) -> Result<(), ReconcileError> {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconcileError::ConfigValidation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
            Ok(())
        }

        unit_range("match_threshold", self.match_threshold)?;
        unit_range("amount_tolerance", self.amount_tolerance)?;
        unit_range("weights.amount", self.weights.amount)?;
        unit_range("weights.time", self.weights.time)?;
        unit_range("weights.reference", self.weights.reference)?;
        unit_range("validity.min_ocr_confidence", self.validity.min_ocr_confidence)?;
        unit_range("validity.min_image_quality", self.validity.min_image_quality)?;

        if self.time_window_minutes <= 0 {
            return Err(ReconcileError::ConfigValidation(format!(
                "time_window_minutes must be positive, got {}",
                self.time_window_minutes
            )));
        }
        if self.validity.recency_window_hours <= 0 {
            return Err(ReconcileError::ConfigValidation(format!(
                "validity.recency_window_hours must be positive, got {}",
                self.validity.recency_window_hours
            )));
        }
        if (self.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(ReconcileError::ConfigValidation(format!(
                "weights must sum to 1, got {}",
                self.weights.sum()
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config = ReconcileConfig::default();
        assert_eq!(config.match_threshold, 0.95);
        assert_eq!(config.time_window_minutes, 10);
        assert_eq!(config.amount_tolerance, 0.01);
        assert_eq!(config.weights.amount, 0.6);
        assert_eq!(config.weights.time, 0.3);
        assert_eq!(config.weights.reference, 0.1);
        assert_eq!(config.validity.min_ocr_confidence, 0.7);
        assert_eq!(config.validity.recency_window_hours, 24);
        assert!(config.validity.require_timestamp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let config = ReconcileConfig::from_toml(
            r#"
match_threshold = 0.85

[validity]
min_ocr_confidence = 0.25
require_timestamp = false
"#,
        )
        .unwrap();
        assert_eq!(config.match_threshold, 0.85);
        assert_eq!(config.time_window_minutes, 10);
        assert_eq!(config.validity.min_ocr_confidence, 0.25);
        assert!(!config.validity.require_timestamp);
        assert_eq!(config.validity.min_image_quality, 0.5);
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let err = ReconcileConfig::from_toml("match_threshold = 1.5").unwrap_err();
        assert!(err.to_string().contains("match_threshold"));
    }

    #[test]
    fn reject_negative_window() {
        let err = ReconcileConfig::from_toml("time_window_minutes = -10").unwrap_err();
        assert!(err.to_string().contains("time_window_minutes"));
    }

    #[test]
    fn reject_weights_not_summing_to_one() {
        let err = ReconcileConfig::from_toml(
            r#"
[weights]
amount = 0.6
time = 0.3
reference = 0.3
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
    }

    #[test]
    fn reject_malformed_toml() {
        let err = ReconcileConfig::from_toml("match_threshold = ").unwrap_err();
        assert!(matches!(err, ReconcileError::ConfigParse(_)));
    }
}
