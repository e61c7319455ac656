//! `lunas-extract` — structure recovery from noisy OCR output.
//!
//! Pure computation crate: receives recognizer fragments or raw notification
//! text, returns structured payment fields, table grids, or invoice lines.
//! No IO dependencies.

mod datetime;

pub mod error;
pub mod extract;
pub mod fragment;
pub mod invoice;
pub mod model;
pub mod notification;
pub mod table;

pub use error::ExtractError;
pub use extract::extract_fields;
pub use fragment::Fragment;
pub use model::{ExtractedFields, ParsedNotification, PaymentMethod};
pub use notification::parse_notification;
pub use table::{recover_table, TableGrid};
