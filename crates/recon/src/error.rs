use std::fmt;

use crate::model::{NotificationId, PaymentId};

#[derive(Debug)]
pub enum ReconcileError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, weights not summing to 1).
    ConfigValidation(String),
    /// A payment id resolved to no record.
    UnknownPayment(PaymentId),
    /// A notification id resolved to no record.
    UnknownNotification(NotificationId),
    /// Persistence collaborator failure.
    Store(String),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownPayment(id) => write!(f, "unknown payment: {id}"),
            Self::UnknownNotification(id) => write!(f, "unknown notification: {id}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for ReconcileError {}
