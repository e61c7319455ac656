use chrono::NaiveDateTime;
use lunas_extract::{ExtractedFields, PaymentMethod};
use serde::Serialize;

pub type PaymentId = i64;
pub type NotificationId = i64;

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A submitted payment screenshot with its OCR-derived fields.
///
/// Created unverified; `is_verified` transitions false→true at most once,
/// through the engine's conditional claim. After that the record is
/// immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub ocr_amount: Option<f64>,
    pub ocr_timestamp: Option<NaiveDateTime>,
    pub ocr_reference: Option<String>,
    pub method: PaymentMethod,
    pub ocr_confidence: f64,
    pub is_verified: bool,
    pub verified_at: Option<NaiveDateTime>,
    pub notification_id: Option<NotificationId>,
    pub created_at: NaiveDateTime,
}

impl PaymentRecord {
    /// New unverified record from one extraction result.
    pub fn from_fields(id: PaymentId, fields: &ExtractedFields, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            ocr_amount: fields.amount,
            ocr_timestamp: fields.timestamp,
            ocr_reference: fields.reference.clone(),
            method: fields.method,
            ocr_confidence: fields.source_confidence,
            is_verified: false,
            verified_at: None,
            notification_id: None,
            created_at,
        }
    }
}

/// An ingested bank / e-wallet notification.
///
/// `is_matched` transitions false→true at most once; a matched notification
/// is never offered to another payment.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub source: String,
    pub amount: Option<f64>,
    pub transaction_date: Option<NaiveDateTime>,
    pub reference: Option<String>,
    pub sender: Option<String>,
    pub is_matched: bool,
    pub matched_at: Option<NaiveDateTime>,
    pub received_at: NaiveDateTime,
}

impl NotificationRecord {
    /// New unmatched record from one parsed notification.
    pub fn from_parsed(
        id: NotificationId,
        parsed: &lunas_extract::ParsedNotification,
        received_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            source: parsed.source.clone(),
            amount: parsed.fields.amount,
            transaction_date: parsed.fields.timestamp,
            reference: parsed.fields.reference.clone(),
            sender: parsed.sender.clone(),
            is_matched: false,
            matched_at: None,
            received_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Match outcomes
// ---------------------------------------------------------------------------

/// Outcome of one pairwise comparison. Transient: callers persist its effect
/// on the records, never the result itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub is_match: bool,
    pub confidence: f64,
}

/// Outcome of searching all pending payments for one notification.
#[derive(Debug, Clone, Serialize)]
pub struct AutoMatchOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// How many pending candidates were evaluated — observability for the
    /// no-match case, not an error signal.
    pub candidates_checked: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AutoMatchOutcome {
    pub(crate) fn unmatched(candidates_checked: usize, reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            payment_id: None,
            confidence: None,
            candidates_checked,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn payment_from_fields_starts_unverified() {
        let fields = ExtractedFields {
            amount: Some(50000.0),
            timestamp: None,
            reference: Some("BCX123456".into()),
            method: PaymentMethod::Bca,
            source_confidence: 0.9,
        };
        let created = NaiveDate::from_ymd_opt(2023, 12, 4)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let payment = PaymentRecord::from_fields(7, &fields, created);
        assert_eq!(payment.id, 7);
        assert_eq!(payment.ocr_amount, Some(50000.0));
        assert!(!payment.is_verified);
        assert!(payment.verified_at.is_none());
        assert!(payment.notification_id.is_none());
    }

    #[test]
    fn outcome_serializes_without_absent_fields() {
        let outcome = AutoMatchOutcome::unmatched(3, "no matching payment found");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["matched"], false);
        assert_eq!(json["candidates_checked"], 3);
        assert!(json.get("payment_id").is_none());
        assert!(json.get("confidence").is_none());
    }
}
