//! Reconciliation entry points: pairwise scoring by id and the auto-match
//! search for an incoming notification.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::matcher::match_payment;
use crate::model::{AutoMatchOutcome, MatchResult, NotificationId, PaymentId, PaymentRecord};
use crate::store::RecordStore;

/// Score one stored payment against one stored notification. Read-only.
pub fn match_by_ids(
    store: &dyn RecordStore,
    payment_id: PaymentId,
    notification_id: NotificationId,
    config: &ReconcileConfig,
) -> Result<MatchResult, ReconcileError> {
    let payment = store
        .payment(payment_id)?
        .ok_or(ReconcileError::UnknownPayment(payment_id))?;
    let notification = store
        .notification(notification_id)?
        .ok_or(ReconcileError::UnknownNotification(notification_id))?;

    Ok(match_payment(&payment, &notification, config))
}

/// Search all pending payments inside the time window for the given
/// notification and claim the best one that clears the threshold.
///
/// The claim is a conditional write guarded on `is_verified == false`; a
/// failed guard means another run got there first, and the search simply
/// continues with the next-best candidate. Finding nothing is a normal
/// outcome, reported with the number of candidates checked.
pub fn auto_match(
    store: &mut dyn RecordStore,
    notification_id: NotificationId,
    config: &ReconcileConfig,
    now: NaiveDateTime,
) -> Result<AutoMatchOutcome, ReconcileError> {
    let notification = store
        .notification(notification_id)?
        .ok_or(ReconcileError::UnknownNotification(notification_id))?;

    if notification.is_matched {
        return Ok(AutoMatchOutcome::unmatched(
            0,
            "notification is already matched",
        ));
    }

    let cutoff = now - Duration::minutes(config.time_window_minutes);
    let candidates = store.unverified_payments_since(cutoff)?;
    if candidates.is_empty() {
        return Ok(AutoMatchOutcome::unmatched(
            0,
            "no pending payments in time window",
        ));
    }

    let candidates_checked = candidates.len();
    let mut ranked: Vec<(&PaymentRecord, f64)> = Vec::new();
    for payment in &candidates {
        let result = match_payment(payment, &notification, config);
        debug!(
            payment_id = payment.id,
            confidence = result.confidence,
            is_match = result.is_match,
            "evaluated candidate"
        );
        if result.is_match {
            ranked.push((payment, result.confidence));
        }
    }
    // Stable sort: equal confidences keep store order, so ties go to the
    // first candidate encountered.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (payment, confidence) in ranked {
        if !store.claim_payment(payment.id, notification_id, now)? {
            debug!(
                payment_id = payment.id,
                "payment claimed concurrently; trying next candidate"
            );
            continue;
        }
        store.mark_notification_matched(notification_id, now)?;
        info!(
            notification_id,
            payment_id = payment.id,
            confidence,
            candidates_checked,
            "auto-matched payment"
        );
        return Ok(AutoMatchOutcome {
            matched: true,
            payment_id: Some(payment.id),
            confidence: Some(confidence),
            candidates_checked,
            reason: None,
        });
    }

    info!(notification_id, candidates_checked, "no matching payment");
    Ok(AutoMatchOutcome::unmatched(
        candidates_checked,
        format!("no matching payment found; checked {candidates_checked} pending payments"),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotificationRecord;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use lunas_extract::PaymentMethod;

    fn ts(h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, 4)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn payment(id: PaymentId, amount: f64, at: NaiveDateTime, conf: f64) -> PaymentRecord {
        PaymentRecord {
            id,
            ocr_amount: Some(amount),
            ocr_timestamp: Some(at),
            ocr_reference: Some("BCX123456".into()),
            method: PaymentMethod::Bca,
            ocr_confidence: conf,
            is_verified: false,
            verified_at: None,
            notification_id: None,
            created_at: at,
        }
    }

    fn notification(id: NotificationId, amount: f64, at: NaiveDateTime) -> NotificationRecord {
        NotificationRecord {
            id,
            source: "BCA".into(),
            amount: Some(amount),
            transaction_date: Some(at),
            reference: Some("BCX123456".into()),
            sender: None,
            is_matched: false,
            matched_at: None,
            received_at: at,
        }
    }

    #[test]
    fn auto_match_claims_best_candidate() {
        let mut store = MemoryStore::new();
        store.insert_payment(payment(1, 50000.0, ts(14, 33), 0.96));
        store.insert_payment(payment(2, 99000.0, ts(14, 34), 0.97));
        store.insert_notification(notification(10, 50000.0, ts(14, 35)));

        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.payment_id, Some(1));
        assert_eq!(outcome.candidates_checked, 2);

        let claimed = store.payment(1).unwrap().unwrap();
        assert!(claimed.is_verified);
        assert_eq!(claimed.notification_id, Some(10));
        assert!(store.notification(10).unwrap().unwrap().is_matched);
    }

    #[test]
    fn payments_outside_window_are_not_considered() {
        let mut store = MemoryStore::new();
        store.insert_payment(payment(1, 50000.0, ts(13, 0), 0.96));
        store.insert_notification(notification(10, 50000.0, ts(14, 35)));

        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.candidates_checked, 0);
        assert_eq!(
            outcome.reason.as_deref(),
            Some("no pending payments in time window")
        );
    }

    #[test]
    fn below_threshold_candidates_report_count() {
        let mut store = MemoryStore::new();
        store.insert_payment(payment(1, 50000.0, ts(14, 33), 0.5));
        store.insert_notification(notification(10, 50000.0, ts(14, 35)));

        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.candidates_checked, 1);
        assert!(outcome.reason.unwrap().contains("checked 1"));
    }

    #[test]
    fn matched_notification_is_never_reused() {
        let mut store = MemoryStore::new();
        store.insert_payment(payment(1, 50000.0, ts(14, 33), 0.96));
        let mut already = notification(10, 50000.0, ts(14, 35));
        already.is_matched = true;
        store.insert_notification(already);

        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert!(!outcome.matched);
        assert!(!store.payment(1).unwrap().unwrap().is_verified);
    }

    /// Serves a pre-captured window snapshot while delegating claims to the
    /// live store — the shape of a competing run committing between the
    /// query and the claim.
    struct StaleSnapshotStore {
        inner: MemoryStore,
        snapshot: Vec<PaymentRecord>,
    }

    impl RecordStore for StaleSnapshotStore {
        fn payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, ReconcileError> {
            self.inner.payment(id)
        }

        fn notification(
            &self,
            id: NotificationId,
        ) -> Result<Option<NotificationRecord>, ReconcileError> {
            self.inner.notification(id)
        }

        fn unverified_payments_since(
            &self,
            _cutoff: NaiveDateTime,
        ) -> Result<Vec<PaymentRecord>, ReconcileError> {
            Ok(self.snapshot.clone())
        }

        fn claim_payment(
            &mut self,
            id: PaymentId,
            notification_id: NotificationId,
            verified_at: NaiveDateTime,
        ) -> Result<bool, ReconcileError> {
            self.inner.claim_payment(id, notification_id, verified_at)
        }

        fn mark_notification_matched(
            &mut self,
            id: NotificationId,
            matched_at: NaiveDateTime,
        ) -> Result<bool, ReconcileError> {
            self.inner.mark_notification_matched(id, matched_at)
        }
    }

    #[test]
    fn claim_conflict_falls_through_to_next_candidate() {
        // Two equally-plausible candidates; the first was claimed by a
        // competing run after our window snapshot was taken.
        let snapshot = vec![
            payment(1, 50000.0, ts(14, 33), 0.96),
            payment(2, 50000.0, ts(14, 34), 0.96),
        ];
        let mut inner = MemoryStore::new();
        inner.insert_payment(payment(1, 50000.0, ts(14, 33), 0.96));
        inner.insert_payment(payment(2, 50000.0, ts(14, 34), 0.96));
        inner.insert_notification(notification(10, 50000.0, ts(14, 35)));
        inner.claim_payment(1, 99, ts(14, 35)).unwrap();

        let mut store = StaleSnapshotStore { inner, snapshot };
        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.payment_id, Some(2));
        // The competitor's link on payment 1 is untouched.
        let first = store.inner.payment(1).unwrap().unwrap();
        assert_eq!(first.notification_id, Some(99));
    }

    #[test]
    fn tie_goes_to_first_encountered() {
        let mut store = MemoryStore::new();
        store.insert_payment(payment(1, 50000.0, ts(14, 33), 0.96));
        store.insert_payment(payment(2, 50000.0, ts(14, 34), 0.96));
        store.insert_notification(notification(10, 50000.0, ts(14, 35)));

        let config = ReconcileConfig::default();
        let outcome = auto_match(&mut store, 10, &config, ts(14, 36)).unwrap();
        assert_eq!(outcome.payment_id, Some(1));
    }

    #[test]
    fn match_by_ids_rejects_unknown_records() {
        let store = MemoryStore::new();
        let config = ReconcileConfig::default();
        assert!(matches!(
            match_by_ids(&store, 1, 2, &config),
            Err(ReconcileError::UnknownPayment(1))
        ));
    }
}
