//! Field extraction from recognized screenshot fragments.
//!
//! The recognizer hands us a confidence-ordered bag of text spans; this
//! module turns it into candidate amount / timestamp / reference / method
//! values. Missing fields stay `None` — downstream scoring treats absence as
//! a weaker signal, not a failure.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::datetime::parse_date_time;
use crate::error::ExtractError;
use crate::fragment::{dedup_by_text, Fragment};
use crate::model::{ExtractedFields, PaymentMethod};

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// Currency markers that anchor an amount fragment.
const CURRENCY_MARKERS: &[&str] = &["idr", "rp"];

/// Payment-semantic keywords: a fragment carrying one of these is treated as
/// amount-bearing even when the currency marker was mangled.
const PAYMENT_KEYWORDS: &[&str] = &["diterima", "transfer", "masuk", "bayar"];

/// Label keywords that precede a reference / transaction number.
const REFERENCE_KEYWORDS: &[&str] = &["ref", "no", "trx", "id"];

/// Bank / e-wallet name variants, first match wins.
const METHOD_VARIANTS: &[(PaymentMethod, &[&str])] = &[
    (PaymentMethod::Bca, &["bca", "bank central asia"]),
    (PaymentMethod::Mandiri, &["mandiri", "bank mandiri"]),
    (PaymentMethod::Bni, &["bni", "bank negara indonesia"]),
    (PaymentMethod::Bri, &["bri", "bank rakyat indonesia"]),
    (PaymentMethod::GoPay, &["gopay", "gojek"]),
    (PaymentMethod::Ovo, &["ovo"]),
    (PaymentMethod::Dana, &["dana"]),
    (PaymentMethod::ShopeePay, &["shopeepay", "shopee"]),
    (PaymentMethod::LinkAja, &["linkaja", "link aja"]),
    (PaymentMethod::Qris, &["qris"]),
];

/// Glyphs the recognizer commonly reports in place of digits.
const CONFUSABLE_DIGITS: &[(char, char)] = &[
    ('G', '1'),
    ('g', '1'),
    ('L', '1'),
    ('l', '1'),
    ('I', '1'),
    ('i', '1'),
    ('O', '0'),
    ('o', '0'),
    ('S', '5'),
    ('s', '5'),
    ('Z', '2'),
    ('z', '2'),
    ('B', '8'),
];

/// Glyph repair stays within this many characters after the currency marker
/// to avoid rewriting trailing prose into digits.
const REPAIR_WINDOW: usize = 8;

/// Confidence is averaged over at most this many of the strongest fragments,
/// so one noise token cannot drag the whole extraction down.
const TOP_CONFIDENCE_SAMPLE: usize = 10;

/// Degraded-case amount when a payment keyword is present but no digit run
/// parses. Callers see a positive amount with low confidence, not a silent
/// success.
const PLACEHOLDER_AMOUNT: f64 = 1.0;

static AMOUNT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d.,]*").unwrap());
static DATE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b").unwrap());
static DATE_MONTH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\s+[A-Za-z]+\s+\d{2,4}\b").unwrap());
static TIME_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}(?::\d{2})?\b").unwrap());
static REF_RUN_SHORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9]{6,}").unwrap());
static REF_RUN_LONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9]{8,}").unwrap());

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Extract structured payment fields from one screenshot's fragments.
///
/// Fragments are de-duplicated by normalized text first (multi-pass OCR),
/// keeping the highest-confidence instance, so extraction is idempotent and
/// independent of preprocessing order. An empty fragment list is the only
/// terminal failure.
pub fn extract_fields(fragments: &[Fragment]) -> Result<ExtractedFields, ExtractError> {
    if fragments.is_empty() {
        return Err(ExtractError::EmptyOcr);
    }

    let fragments = dedup_by_text(fragments);

    Ok(ExtractedFields {
        amount: scan_amount(&fragments),
        timestamp: scan_timestamp(&fragments),
        reference: scan_reference(&fragments),
        method: detect_method(&fragments),
        source_confidence: mean_top_confidence(&fragments),
    })
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Parse an Indonesian-formatted number: thousands '.', decimal ','.
/// Only strictly positive values are accepted.
pub(crate) fn parse_idr_number(text: &str) -> Option<f64> {
    let run = AMOUNT_RUN.find(text)?;
    let normalized = run.as_str().replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok().filter(|a| *a > 0.0)
}

fn scan_amount(fragments: &[Fragment]) -> Option<f64> {
    let mut payment_signal_seen = false;

    for fragment in fragments {
        let lower = fragment.text.to_lowercase();
        let has_marker = CURRENCY_MARKERS.iter().any(|m| lower.contains(m));
        let has_keyword = PAYMENT_KEYWORDS.iter().any(|k| lower.contains(k));
        if !has_marker && !has_keyword {
            continue;
        }
        payment_signal_seen = true;

        if let Some(amount) = parse_idr_number(&fragment.text) {
            return Some(amount);
        }

        // No clean digit run — repair confusable glyphs right after the
        // currency marker and retry.
        if let Some(repaired) = repair_after_marker(&fragment.text) {
            if let Some(amount) = parse_idr_number(&repaired) {
                debug!(original = %fragment.text, repaired = %repaired, "amount recovered via glyph repair");
                return Some(amount);
            }
        }
    }

    if payment_signal_seen {
        warn!("payment keyword present but no amount parsed; using placeholder amount");
        return Some(PLACEHOLDER_AMOUNT);
    }

    None
}

/// Substitute confusable glyphs with digits in the first few characters after
/// the currency marker. Returns `None` when no marker is present.
fn repair_after_marker(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let lower: Vec<char> = chars.iter().map(|c| c.to_ascii_lowercase()).collect();
    let start = CURRENCY_MARKERS.iter().find_map(|marker| {
        let pattern: Vec<char> = marker.chars().collect();
        lower
            .windows(pattern.len())
            .position(|w| w == pattern.as_slice())
            .map(|pos| pos + pattern.len())
    })?;

    let repaired: String = chars[start..]
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i < REPAIR_WINDOW {
                CONFUSABLE_DIGITS
                    .iter()
                    .find(|(from, _)| *from == c)
                    .map(|(_, to)| *to)
                    .unwrap_or(c)
            } else {
                c
            }
        })
        .collect();

    Some(repaired)
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// First date match and first time match, found independently, combined into
/// one candidate. A date without a time still yields a (midnight) timestamp.
fn scan_timestamp(fragments: &[Fragment]) -> Option<chrono::NaiveDateTime> {
    let mut date: Option<String> = None;
    let mut time: Option<String> = None;

    for fragment in fragments {
        if date.is_none() {
            if let Some(m) = DATE_NUMERIC
                .find(&fragment.text)
                .or_else(|| DATE_MONTH_NAME.find(&fragment.text))
            {
                date = Some(m.as_str().to_string());
            }
        }
        if time.is_none() {
            if let Some(m) = TIME_RUN.find(&fragment.text) {
                time = Some(m.as_str().to_string());
            }
        }
        if date.is_some() && time.is_some() {
            break;
        }
    }

    parse_date_time(date.as_deref()?, time.as_deref())
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// The recognizer often splits a "Ref:" label and its value into separate
/// detections, so the fragment after a label keyword is preferred; a longer
/// run in the label fragment itself is the fallback.
fn scan_reference(fragments: &[Fragment]) -> Option<String> {
    for (i, fragment) in fragments.iter().enumerate() {
        let lower = fragment.text.to_lowercase();
        if !REFERENCE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }

        if let Some(next) = fragments.get(i + 1) {
            if let Some(m) = REF_RUN_SHORT.find(&next.text) {
                return Some(m.as_str().to_string());
            }
        }
        if let Some(m) = REF_RUN_LONG.find(&fragment.text) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

fn detect_method(fragments: &[Fragment]) -> PaymentMethod {
    let joined = fragments
        .iter()
        .map(|f| f.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    for (method, variants) in METHOD_VARIANTS {
        if variants.iter().any(|v| joined.contains(v)) {
            return *method;
        }
    }
    PaymentMethod::Unknown
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

fn mean_top_confidence(fragments: &[Fragment]) -> f64 {
    if fragments.is_empty() {
        return 0.0;
    }
    let mut confidences: Vec<f64> = fragments.iter().map(|f| f.confidence).collect();
    confidences.sort_by(|a, b| b.total_cmp(a));
    let top = &confidences[..confidences.len().min(TOP_CONFIDENCE_SAMPLE)];
    top.iter().sum::<f64>() / top.len() as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
