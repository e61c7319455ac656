//! Invoice line extraction: an external text oracle with a deterministic
//! pattern fallback.
//!
//! The oracle (typically a language model) is a collaborator outside this
//! crate; when it fails or returns nothing, lines of the shape
//! "50 kg Gula Pasir" are recovered with a fixed pattern instead.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// One supplied item recovered from invoice text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// External text-to-structured-data collaborator.
pub trait InvoiceOracle {
    fn parse(&self, text: &str) -> Result<Vec<InvoiceItem>, String>;
}

/// `quantity unit name`, decimal comma accepted in the quantity.
static INVOICE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(kg|gram|liter|pcs|box|karton|pack)\s+([A-Za-z][A-Za-z ]*)")
        .unwrap()
});

/// Deterministic fallback parser over free invoice text.
pub fn parse_invoice_lines(text: &str) -> Vec<InvoiceItem> {
    INVOICE_LINE
        .captures_iter(text)
        .filter_map(|caps| {
            let quantity = caps[1].replace(',', ".").parse::<f64>().ok()?;
            Some(InvoiceItem {
                name: caps[3].trim().to_string(),
                quantity,
                unit: caps[2].to_lowercase(),
            })
        })
        .collect()
}

/// Ask the oracle first; fall back to the pattern parser when it errors or
/// comes back empty.
pub fn parse_with_oracle(oracle: &dyn InvoiceOracle, text: &str) -> Vec<InvoiceItem> {
    match oracle.parse(text) {
        Ok(items) if !items.is_empty() => items,
        Ok(_) => {
            debug!("invoice oracle returned no items; using pattern fallback");
            parse_invoice_lines(text)
        }
        Err(reason) => {
            warn!(%reason, "invoice oracle failed; using pattern fallback");
            parse_invoice_lines(text)
        }
    }
}
