//! Date/time assembly shared by the screenshot and notification paths.
//!
//! Providers disagree on separators and month spelling, so parsing walks an
//! ordered format list and accepts the first that fits. Indonesian month
//! names are mapped to numbers before the walk.

use chrono::NaiveDateTime;

/// Month names as they appear in Indonesian notifications. Long forms first:
/// replacement is textual, and "Jan" must not clip "Januari".
const MONTHS: &[(&str, &str)] = &[
    ("Januari", "01"),
    ("Februari", "02"),
    ("Maret", "03"),
    ("April", "04"),
    ("Agustus", "08"),
    ("September", "09"),
    ("Oktober", "10"),
    ("November", "11"),
    ("Desember", "12"),
    ("Jan", "01"),
    ("Feb", "02"),
    ("Mar", "03"),
    ("Apr", "04"),
    ("Mei", "05"),
    ("Juni", "06"),
    ("Jun", "06"),
    ("Juli", "07"),
    ("Jul", "07"),
    ("Agu", "08"),
    ("Aug", "08"),
    ("Sep", "09"),
    ("Okt", "10"),
    ("Oct", "10"),
    ("Nov", "11"),
    ("Des", "12"),
    ("Dec", "12"),
];

/// Ordered datetime formats across the supported providers.
///
/// Two-digit-year formats come first: `%y` fails cleanly on a four-digit
/// year, but `%Y` would accept "23" as the year 23.
const FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d %m %Y %H:%M:%S",
    "%d %m %Y %H:%M",
    "%d %m %Y %H.%M",
];

/// Combine a date string and an optional time string into a timestamp.
///
/// A missing time yields midnight — a date-only detection is still a usable,
/// lower-precision signal. Returns `None` when no format fits.
pub(crate) fn parse_date_time(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let mut candidate = format!("{} {}", date.trim(), time.unwrap_or("00:00").trim());
    for (name, number) in MONTHS {
        if candidate.contains(name) {
            candidate = candidate.replace(name, number);
        }
    }

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&candidate, fmt).ok())
}
