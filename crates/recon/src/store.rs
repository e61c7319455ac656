//! Persistence collaborator contract.
//!
//! The engine never talks to a database directly; it sees this trait. The
//! one hard requirement is the conditional claim: two auto-match runs racing
//! for the same pending payment must resolve through a single atomic
//! read-modify-write guarded on `is_verified == false`.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::error::ReconcileError;
use crate::model::{NotificationId, NotificationRecord, PaymentId, PaymentRecord};

pub trait RecordStore {
    fn payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, ReconcileError>;

    fn notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<NotificationRecord>, ReconcileError>;

    /// All payments with `is_verified == false` created at or after `cutoff`,
    /// in stable (insertion) order.
    fn unverified_payments_since(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<PaymentRecord>, ReconcileError>;

    /// Conditionally verify a payment and link it to a notification.
    ///
    /// Returns `true` only when the stored record still had
    /// `is_verified == false`; a `false` return means another run claimed it
    /// first and the caller should move on to its next candidate.
    fn claim_payment(
        &mut self,
        id: PaymentId,
        notification_id: NotificationId,
        verified_at: NaiveDateTime,
    ) -> Result<bool, ReconcileError>;

    /// Same guard for the notification side: `true` only on the first claim.
    fn mark_notification_matched(
        &mut self,
        id: NotificationId,
        matched_at: NaiveDateTime,
    ) -> Result<bool, ReconcileError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Reference implementation of the store contract, also used by the
/// integration tests. BTreeMaps keep iteration order deterministic, which
/// makes tie-breaking ("first encountered wins") reproducible.
#[derive(Debug, Default)]
pub struct MemoryStore {
    payments: BTreeMap<PaymentId, PaymentRecord>,
    notifications: BTreeMap<NotificationId, NotificationRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_payment(&mut self, payment: PaymentRecord) {
        self.payments.insert(payment.id, payment);
    }

    pub fn insert_notification(&mut self, notification: NotificationRecord) {
        self.notifications.insert(notification.id, notification);
    }
}

impl RecordStore for MemoryStore {
    fn payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, ReconcileError> {
        Ok(self.payments.get(&id).cloned())
    }

    fn notification(
        &self,
        id: NotificationId,
    ) -> Result<Option<NotificationRecord>, ReconcileError> {
        Ok(self.notifications.get(&id).cloned())
    }

    fn unverified_payments_since(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<PaymentRecord>, ReconcileError> {
        Ok(self
            .payments
            .values()
            .filter(|p| !p.is_verified && p.created_at >= cutoff)
            .cloned()
            .collect())
    }

    fn claim_payment(
        &mut self,
        id: PaymentId,
        notification_id: NotificationId,
        verified_at: NaiveDateTime,
    ) -> Result<bool, ReconcileError> {
        let Some(payment) = self.payments.get_mut(&id) else {
            return Err(ReconcileError::UnknownPayment(id));
        };
        if payment.is_verified {
            return Ok(false);
        }
        payment.is_verified = true;
        payment.verified_at = Some(verified_at);
        payment.notification_id = Some(notification_id);
        Ok(true)
    }

    fn mark_notification_matched(
        &mut self,
        id: NotificationId,
        matched_at: NaiveDateTime,
    ) -> Result<bool, ReconcileError> {
        let Some(notification) = self.notifications.get_mut(&id) else {
            return Err(ReconcileError::UnknownNotification(id));
        };
        if notification.is_matched {
            return Ok(false);
        }
        notification.is_matched = true;
        notification.matched_at = Some(matched_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lunas_extract::PaymentMethod;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn pending(id: PaymentId, created_at: NaiveDateTime) -> PaymentRecord {
        PaymentRecord {
            id,
            ocr_amount: Some(50000.0),
            ocr_timestamp: Some(created_at),
            ocr_reference: None,
            method: PaymentMethod::Unknown,
            ocr_confidence: 0.9,
            is_verified: false,
            verified_at: None,
            notification_id: None,
            created_at,
        }
    }

    #[test]
    fn window_query_excludes_old_and_verified() {
        let mut store = MemoryStore::new();
        store.insert_payment(pending(1, ts(4, 10)));
        store.insert_payment(pending(2, ts(4, 14)));
        let mut verified = pending(3, ts(4, 14));
        verified.is_verified = true;
        store.insert_payment(verified);

        let found = store.unverified_payments_since(ts(4, 12)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[test]
    fn claim_guard_holds_exactly_once() {
        let mut store = MemoryStore::new();
        store.insert_payment(pending(1, ts(4, 14)));

        assert!(store.claim_payment(1, 77, ts(4, 15)).unwrap());
        assert!(!store.claim_payment(1, 88, ts(4, 16)).unwrap());

        let payment = store.payment(1).unwrap().unwrap();
        assert!(payment.is_verified);
        assert_eq!(payment.notification_id, Some(77));
        assert_eq!(payment.verified_at, Some(ts(4, 15)));
    }

    #[test]
    fn claiming_missing_payment_is_an_error() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.claim_payment(9, 1, ts(4, 15)),
            Err(ReconcileError::UnknownPayment(9))
        ));
    }
}
