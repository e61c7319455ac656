//! Source-specific parsing of bank / e-wallet notification text.
//!
//! Each supported source carries its own pattern set (providers disagree on
//! date separators, time separators, and reference labels). Detection walks
//! the table in order: a keyword hit selects the source, a bare source-name
//! hit is the fallback, and anything else gets the generic amount-only parse.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::datetime::parse_date_time;
use crate::extract::parse_idr_number;
use crate::model::{ExtractedFields, ParsedNotification, PaymentMethod};

// ---------------------------------------------------------------------------
// Source pattern table
// ---------------------------------------------------------------------------

struct SourcePatterns {
    source: &'static str,
    amount: Regex,
    date: Regex,
    time: Regex,
    reference: Regex,
    /// Lowercase phrases that identify this source's notification wording.
    keywords: &'static [&'static str],
}

fn patterns(
    source: &'static str,
    date: &str,
    time: &str,
    reference: &str,
    keywords: &'static [&'static str],
) -> SourcePatterns {
    SourcePatterns {
        source,
        amount: Regex::new(r"(?i)(?:Rp|IDR)\s*([0-9][0-9.,]*)").unwrap(),
        date: Regex::new(date).unwrap(),
        time: Regex::new(time).unwrap(),
        reference: Regex::new(reference).unwrap(),
        keywords,
    }
}

static SOURCE_TABLE: Lazy<Vec<SourcePatterns>> = Lazy::new(|| {
    vec![
        patterns(
            "BCA",
            r"\d{2}/\d{2}/\d{2,4}",
            r"\d{2}:\d{2}:\d{2}",
            r"(?i)Ref\s*:\s*([A-Z0-9]+)",
            &["dana masuk", "transfer", "kredit"],
        ),
        patterns(
            "Mandiri",
            r"\d{2}/\d{2}/\d{2,4}",
            r"\d{2}:\d{2}",
            r"(?i)(?:Ref|No)\s*[:.]\s*([A-Z0-9]+)",
            &["mutasi kredit", "transfer masuk"],
        ),
        patterns(
            "BNI",
            r"\d{2}-\d{2}-\d{2,4}",
            r"\d{2}:\d{2}",
            r"(?i)Ref\s*:\s*([A-Z0-9]+)",
            &["dana masuk", "kredit"],
        ),
        patterns(
            "GoPay",
            r"\d{1,2}\s+\w+\s+\d{4}",
            r"\d{2}:\d{2}",
            r"(?i)ID\s*:\s*([A-Z0-9-]+)",
            &["dana masuk", "terima"],
        ),
        patterns(
            "Dana",
            r"\d{1,2}\s+\w+\s+\d{4}",
            r"\d{2}\.\d{2}",
            r"(?i)(?:Ref|ID)\s*:\s*([A-Z0-9-]+)",
            &["dana masuk", "terima uang"],
        ),
        patterns(
            "OVO",
            r"\d{1,2}/\d{1,2}/\d{4}",
            r"\d{2}:\d{2}",
            r"(?i)TRX\s*ID\s*:\s*([A-Z0-9-]+)",
            &["dana masuk", "terima"],
        ),
        patterns(
            "QRIS",
            r"\d{2}/\d{2}/\d{4}",
            r"\d{2}:\d{2}",
            r"(?i)(?:NMID|Ref)\s*:\s*([A-Z0-9-]+)",
            &["pembayaran", "qris", "berhasil"],
        ),
    ]
});

/// Bare source names checked when no keyword matched.
const SOURCE_NAMES: &[&str] = &["bca", "mandiri", "bni", "gopay", "dana", "ovo", "qris"];

static SENDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:dari|from)\s+([A-Za-z][A-Za-z ]*)").unwrap());
static GENERIC_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:Rp|IDR)\s*([0-9][0-9.,]*)").unwrap());

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse a notification, auto-detecting the source when none is declared.
///
/// Never fails: an unrecognized source degrades to the generic parser, an
/// unparseable date degrades to the current time. Downstream matching treats
/// both as weaker signals, not errors.
pub fn parse_notification(raw_text: &str, declared_source: Option<&str>) -> ParsedNotification {
    let source = declared_source
        .map(str::to_string)
        .or_else(|| detect_source(raw_text));

    let Some(patterns) = source
        .as_deref()
        .and_then(|s| SOURCE_TABLE.iter().find(|p| p.source.eq_ignore_ascii_case(s)))
    else {
        debug!("no source patterns applied; using generic parse");
        return parse_generic(raw_text);
    };

    let amount = parse_amount(raw_text, &patterns.amount);
    let timestamp = parse_timestamp(raw_text, &patterns.date, &patterns.time);
    let reference = patterns
        .reference
        .captures(raw_text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let sender = parse_sender(raw_text);

    ParsedNotification {
        source: patterns.source.to_string(),
        parsed: amount.is_some(),
        sender,
        fields: ExtractedFields {
            amount,
            timestamp: Some(timestamp),
            reference,
            method: PaymentMethod::from_label(patterns.source),
            // Notification text arrives verbatim, not through a recognizer.
            source_confidence: 1.0,
        },
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

fn detect_source(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    for patterns in SOURCE_TABLE.iter() {
        if patterns.keywords.iter().any(|k| lower.contains(k)) {
            return Some(patterns.source.to_string());
        }
    }

    for name in SOURCE_NAMES {
        if lower.contains(name) {
            let method = PaymentMethod::from_label(name);
            return Some(method.label().to_string());
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// All amount matches are parsed and the largest wins: notification
/// boilerplate often repeats a smaller reference or fee figure near the real
/// amount.
fn parse_amount(text: &str, pattern: &Regex) -> Option<f64> {
    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_idr_number(m.as_str()))
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |b| b.max(value)))
        })
}

fn parse_timestamp(text: &str, date: &Regex, time: &Regex) -> chrono::NaiveDateTime {
    let date_match = date.find(text).map(|m| m.as_str().to_string());
    let time_match = time.find(text).map(|m| m.as_str().to_string());

    let parsed = date_match
        .as_deref()
        .and_then(|d| parse_date_time(d, time_match.as_deref()));

    match parsed {
        Some(ts) => ts,
        None => {
            warn!("notification date unparseable; falling back to current time");
            Utc::now().naive_utc()
        }
    }
}

fn parse_sender(text: &str) -> Option<String> {
    SENDER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_generic(text: &str) -> ParsedNotification {
    let amount = parse_amount(text, &GENERIC_AMOUNT);

    ParsedNotification {
        source: "Unknown".to_string(),
        parsed: amount.is_some(),
        sender: parse_sender(text),
        fields: ExtractedFields {
            amount,
            timestamp: Some(Utc::now().naive_utc()),
            reference: None,
            method: PaymentMethod::Unknown,
            source_confidence: 1.0,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    const BCA_TEXT: &str = "Dana Masuk Rp 50.000,00 dari Budi. 04/12/23 14:35:20 Ref: BCX123456";

    #[test]
    fn bca_notification_with_declared_source() {
        let parsed = parse_notification(BCA_TEXT, Some("BCA"));
        assert_eq!(parsed.source, "BCA");
        assert!(parsed.parsed);
        assert_eq!(parsed.fields.amount, Some(50000.0));
        assert_eq!(parsed.fields.timestamp, Some(ts(2023, 12, 4, 14, 35, 20)));
        assert_eq!(parsed.fields.reference.as_deref(), Some("BCX123456"));
        assert_eq!(parsed.fields.method, PaymentMethod::Bca);
        assert_eq!(parsed.sender.as_deref(), Some("Budi"));
    }

    #[test]
    fn bca_notification_auto_detected() {
        let parsed = parse_notification(BCA_TEXT, None);
        assert_eq!(parsed.source, "BCA");
        assert_eq!(parsed.fields.amount, Some(50000.0));
    }

    #[test]
    fn gopay_notification() {
        let text = "Dana masuk Rp 75.500 dari Pembeli 4 Des 2023 15:20 ID: GP-2023-ABC123";
        let parsed = parse_notification(text, Some("GoPay"));
        assert_eq!(parsed.fields.amount, Some(75500.0));
        assert_eq!(parsed.fields.timestamp, Some(ts(2023, 12, 4, 15, 20, 0)));
        assert_eq!(parsed.fields.reference.as_deref(), Some("GP-2023-ABC123"));
        assert_eq!(parsed.fields.method, PaymentMethod::GoPay);
    }

    #[test]
    fn qris_notification_auto_detected() {
        let text = "Pembayaran QRIS berhasil Rp 100.000 04/12/2023 16:45 NMID: QRIS123456";
        let parsed = parse_notification(text, None);
        assert_eq!(parsed.source, "QRIS");
        assert_eq!(parsed.fields.amount, Some(100000.0));
        assert_eq!(parsed.fields.timestamp, Some(ts(2023, 12, 4, 16, 45, 0)));
        assert_eq!(parsed.fields.reference.as_deref(), Some("QRIS123456"));
    }

    #[test]
    fn bni_dashed_date() {
        let text = "Dana Masuk Kredit Rp 20.000 04-12-2023 09:15 Ref: BN777888";
        let parsed = parse_notification(text, Some("BNI"));
        assert_eq!(parsed.fields.timestamp, Some(ts(2023, 12, 4, 9, 15, 0)));
        assert_eq!(parsed.fields.reference.as_deref(), Some("BN777888"));
    }

    #[test]
    fn largest_amount_wins() {
        // The smaller figure is an admin-fee line; the credited amount wins.
        let text = "Transfer Rp 2.500 biaya admin, diterima Rp 150.000 04/12/23 10:00:00";
        let parsed = parse_notification(text, Some("BCA"));
        assert_eq!(parsed.fields.amount, Some(150000.0));
    }

    #[test]
    fn unknown_source_uses_generic_parse() {
        let text = "Saldo bertambah Rp 42.000 di dompet anda";
        let parsed = parse_notification(text, None);
        assert_eq!(parsed.source, "Unknown");
        assert!(parsed.parsed);
        assert_eq!(parsed.fields.amount, Some(42000.0));
        assert!(parsed.fields.reference.is_none());
        assert_eq!(parsed.fields.method, PaymentMethod::Unknown);
    }

    #[test]
    fn no_amount_is_degraded_not_error() {
        let parsed = parse_notification("promo spesial untuk anda", None);
        assert!(!parsed.parsed);
        assert!(parsed.fields.amount.is_none());
    }

    #[test]
    fn unparseable_date_falls_back_to_now() {
        // Keyword selects BCA but the text carries no date; the timestamp is
        // still present (parse time) so matching can proceed degraded.
        let parsed = parse_notification("Dana Masuk Rp 10.000 Ref: AA11BB22", None);
        assert_eq!(parsed.source, "BCA");
        assert!(parsed.fields.timestamp.is_some());
    }

    #[test]
    fn sender_absence_is_valid() {
        let parsed = parse_notification("Dana Masuk Rp 10.000 04/12/23 10:00:00", None);
        assert!(parsed.sender.is_none());
    }

    #[test]
    fn mandiri_label_variant_reference() {
        let text = "Mutasi Kredit Rp 80.000 04/12/2023 11:30 No. MDR556677";
        let parsed = parse_notification(text, Some("Mandiri"));
        assert_eq!(parsed.source, "Mandiri");
        assert_eq!(parsed.fields.reference.as_deref(), Some("MDR556677"));
    }

    #[test]
    fn shared_keyword_resolves_in_table_order() {
        // "kredit" appears in both the BCA and BNI keyword lists; the ordered
        // table makes the earlier source win when none is declared.
        let parsed = parse_notification("Mutasi Kredit Rp 80.000", None);
        assert_eq!(parsed.source, "BCA");
    }
}
