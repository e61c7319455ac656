//! Pairwise payment ↔ notification agreement scoring.
//!
//! Each agreement rule is an independent boolean; confidence is their
//! weighted sum scaled by the payment's own OCR confidence, so a shaky
//! extraction can never produce a high-confidence match even with perfect
//! field agreement. Deterministic for a fixed pair of inputs.

use crate::config::ReconcileConfig;
use crate::model::{MatchResult, NotificationRecord, PaymentRecord};

/// Relative difference within `tolerance` of the larger amount. Absence of
/// either amount is no agreement — never an error.
pub fn amounts_agree(a: Option<f64>, b: Option<f64>, tolerance: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if a > 0.0 && b > 0.0 => (a - b).abs() <= a.max(b) * tolerance,
        _ => false,
    }
}

/// Absolute difference within the window. Absence of either timestamp is no
/// agreement.
pub fn times_agree(
    a: Option<chrono::NaiveDateTime>,
    b: Option<chrono::NaiveDateTime>,
    window_minutes: i64,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let diff = a.signed_duration_since(b).num_seconds().abs();
            diff <= window_minutes * 60
        }
        _ => false,
    }
}

/// Case-insensitive exact match when both present; absence is just no bonus.
pub fn references_agree(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Score one payment against one notification.
pub fn match_payment(
    payment: &PaymentRecord,
    notification: &NotificationRecord,
    config: &ReconcileConfig,
) -> MatchResult {
    let amount = amounts_agree(
        payment.ocr_amount,
        notification.amount,
        config.amount_tolerance,
    );
    let time = times_agree(
        payment.ocr_timestamp,
        notification.transaction_date,
        config.time_window_minutes,
    );
    let reference = references_agree(
        payment.ocr_reference.as_deref(),
        notification.reference.as_deref(),
    );

    let mut confidence = 0.0;
    if amount {
        confidence += config.weights.amount;
    }
    if time {
        confidence += config.weights.time;
    }
    if reference {
        confidence += config.weights.reference;
    }
    confidence *= payment.ocr_confidence.clamp(0.0, 1.0);

    MatchResult {
        is_match: confidence >= config.match_threshold,
        confidence,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
