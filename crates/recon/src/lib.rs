//! `lunas-recon` — confidence-scored payment reconciliation engine.
//!
//! Pure engine crate: scores payment screenshots against bank / e-wallet
//! notifications and claims matches through the storage trait. No direct IO
//! dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod store;
pub mod validity;

pub use config::{MatchWeights, ReconcileConfig, ValidityConfig};
pub use engine::{auto_match, match_by_ids};
pub use error::ReconcileError;
pub use matcher::match_payment;
pub use model::{
    AutoMatchOutcome, MatchResult, NotificationId, NotificationRecord, PaymentId, PaymentRecord,
};
pub use store::{MemoryStore, RecordStore};
pub use validity::{score_validity, ImageQuality, ValidityReport};
