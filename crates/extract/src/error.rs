use std::fmt;

/// Terminal extraction failures.
///
/// These cover only truly unreadable input. A missing amount, timestamp, or
/// reference is represented as an absent field on the result, never as an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// The recognizer produced no fragments for the image.
    EmptyOcr,
    /// Fragments were present but none survived filtering into a structure.
    NoStructure,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyOcr => write!(f, "no text detected in image"),
            Self::NoStructure => write!(f, "could not recover a structure from detected text"),
        }
    }
}

impl std::error::Error for ExtractError {}
