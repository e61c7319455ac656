use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Payment method
// ---------------------------------------------------------------------------

/// Known bank / e-wallet labels, plus `Unknown` for anything unrecognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Bca,
    Mandiri,
    Bni,
    Bri,
    GoPay,
    Ovo,
    Dana,
    ShopeePay,
    LinkAja,
    Qris,
    #[default]
    Unknown,
}

impl PaymentMethod {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Display label as it appears in merchant-facing output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bca => "BCA",
            Self::Mandiri => "Mandiri",
            Self::Bni => "BNI",
            Self::Bri => "BRI",
            Self::GoPay => "GoPay",
            Self::Ovo => "OVO",
            Self::Dana => "Dana",
            Self::ShopeePay => "ShopeePay",
            Self::LinkAja => "LinkAja",
            Self::Qris => "QRIS",
            Self::Unknown => "Unknown",
        }
    }

    /// Resolve a source label back to a method. Case-insensitive; unknown
    /// labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "bca" => Self::Bca,
            "mandiri" => Self::Mandiri,
            "bni" => Self::Bni,
            "bri" => Self::Bri,
            "gopay" => Self::GoPay,
            "ovo" => Self::Ovo,
            "dana" => Self::Dana,
            "shopeepay" => Self::ShopeePay,
            "linkaja" => Self::LinkAja,
            "qris" => Self::Qris,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Extracted fields
// ---------------------------------------------------------------------------

/// Structured fields recovered from one extraction pass.
///
/// Any field may be absent: absence is an expected state propagated as lower
/// confidence downstream, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    pub amount: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
    pub reference: Option<String>,
    pub method: PaymentMethod,
    /// Mean of the strongest fragment confidences, in [0, 1].
    pub source_confidence: f64,
}

// ---------------------------------------------------------------------------
// Parsed notification
// ---------------------------------------------------------------------------

/// Result of parsing one bank / e-wallet notification text.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedNotification {
    /// Detected (or declared) source label, e.g. "BCA"; "Unknown" when no
    /// source pattern set applied.
    pub source: String,
    pub fields: ExtractedFields,
    pub sender: Option<String>,
    /// Whether an amount was recovered — the minimum for the notification to
    /// be usable in matching.
    pub parsed: bool,
}
