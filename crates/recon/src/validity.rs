//! Single-source acceptance scoring for QRIS-style payments.
//!
//! When no counterpart notification exists yet, the screenshot alone has to
//! carry the decision. The policy is strict on amount and the OCR floor
//! (accepting a wrong amount is the costly failure mode) and configurable on
//! timestamp and method, which act as boosts. The confidence score is
//! computed independently of the accept bit so callers can surface
//! "accepted, but low confidence — recommend review".

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::config::ValidityConfig;
use lunas_extract::ExtractedFields;

/// Payment-system keywords accepted in place of a resolved method.
const PAYMENT_INDICATORS: &[&str] = &[
    "qris", "qr", "gopay", "ovo", "dana", "linkaja", "shopeepay", "mandiri", "bca", "bni", "bri",
];

// Fixed confidence weights, summing to 1. These are part of the scoring
// algorithm, not deployment policy — the policy knobs live in ValidityConfig.
const WEIGHT_OCR: f64 = 0.30;
const WEIGHT_AMOUNT: f64 = 0.25;
const WEIGHT_TIMESTAMP: f64 = 0.20;
const WEIGHT_METHOD: f64 = 0.15;
const WEIGHT_QUALITY: f64 = 0.10;

// ---------------------------------------------------------------------------
// Image quality
// ---------------------------------------------------------------------------

/// Normalized image-quality signals, each in [0, 1]: blur via edge-energy
/// variance, brightness within an acceptable band, contrast via intensity
/// spread. Produced by the imaging collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImageQuality {
    pub blur: f64,
    pub brightness: f64,
    pub contrast: f64,
}

impl ImageQuality {
    /// Combined quality score. Blur carries the largest weight: a sharp
    /// image is the main prerequisite for reliable recognition.
    pub fn score(&self) -> f64 {
        self.blur.clamp(0.0, 1.0) * 0.4
            + self.brightness.clamp(0.0, 1.0) * 0.3
            + self.contrast.clamp(0.0, 1.0) * 0.3
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Per-check booleans backing the decision, exposed for display.
#[derive(Debug, Clone, Serialize)]
pub struct ValidityDetails {
    pub amount_valid: bool,
    pub timestamp_valid: bool,
    pub method_detected: bool,
    pub payment_indicators_found: bool,
    pub image_quality: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidityReport {
    pub is_valid: bool,
    /// Weighted score in [0, 1], independent of `is_valid`.
    pub confidence: f64,
    pub ocr_confidence: f64,
    pub details: ValidityDetails,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score one extraction for automatic acceptance.
///
/// `now` anchors the recency check; callers pass the wall clock (or a fixed
/// reference in tests).
pub fn score_validity(
    fields: &ExtractedFields,
    ocr_confidence: f64,
    quality: ImageQuality,
    config: &ValidityConfig,
    now: NaiveDateTime,
) -> ValidityReport {
    let amount_valid = fields.amount.is_some_and(|a| a > 0.0);
    let timestamp_valid = fields
        .timestamp
        .is_some_and(|ts| timestamp_recent(ts, now, config.recency_window_hours));
    let method_detected = fields.method.is_known();
    let payment_indicators_found = indicators_found(fields);
    let image_quality = quality.score();

    let is_valid = amount_valid
        && (timestamp_valid || !config.require_timestamp)
        && (method_detected || payment_indicators_found)
        && image_quality >= config.min_image_quality
        && ocr_confidence >= config.min_ocr_confidence;

    let confidence = ocr_confidence.clamp(0.0, 1.0) * WEIGHT_OCR
        + weight_if(amount_valid, WEIGHT_AMOUNT)
        + weight_if(timestamp_valid, WEIGHT_TIMESTAMP)
        + weight_if(method_detected || payment_indicators_found, WEIGHT_METHOD)
        + image_quality * WEIGHT_QUALITY;

    debug!(
        is_valid,
        confidence, amount_valid, timestamp_valid, method_detected, "scored payment validity"
    );

    ValidityReport {
        is_valid,
        confidence,
        ocr_confidence,
        details: ValidityDetails {
            amount_valid,
            timestamp_valid,
            method_detected,
            payment_indicators_found,
            image_quality,
        },
    }
}

fn weight_if(flag: bool, weight: f64) -> f64 {
    if flag {
        weight
    } else {
        0.0
    }
}

/// Within the recency window looking backwards; a timestamp slightly in the
/// future (clock skew between devices) is not penalized.
fn timestamp_recent(ts: NaiveDateTime, now: NaiveDateTime, window_hours: i64) -> bool {
    now.signed_duration_since(ts).num_seconds() < window_hours * 3600
}

fn indicators_found(fields: &ExtractedFields) -> bool {
    let method = fields.method.label().to_lowercase();
    let reference = fields
        .reference
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    PAYMENT_INDICATORS
        .iter()
        .any(|k| method.contains(k) || reference.contains(k))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
