use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One recognized text span from the external OCR collaborator.
///
/// Position is the (y, x) pixel center of the detection box. Fragments are
/// consumed read-only; extraction never mutates them.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub position: (f32, f32),
    pub confidence: f64,
}

impl Fragment {
    pub fn new(text: impl Into<String>, y: f32, x: f32, confidence: f64) -> Self {
        Self {
            text: text.into(),
            position: (y, x),
            confidence,
        }
    }

    /// Build from the recognizer's four corner points; the consumed position
    /// is the mean of the corners.
    pub fn from_corners(
        text: impl Into<String>,
        corners: [(f32, f32); 4],
        confidence: f64,
    ) -> Self {
        let y = corners.iter().map(|c| c.0).sum::<f32>() / 4.0;
        let x = corners.iter().map(|c| c.1).sum::<f32>() / 4.0;
        Self::new(text, y, x, confidence)
    }

    /// Text key for duplicate detection: trimmed, lowercased, inner
    /// whitespace collapsed.
    pub(crate) fn normalized_text(&self) -> String {
        self.text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// De-duplication
// ---------------------------------------------------------------------------

/// Keep the highest-confidence instance per unique normalized text,
/// preserving the input order of the surviving fragments.
///
/// Multi-pass OCR (several preprocessing variants over one image) detects the
/// same span more than once; without this step the amount and reference scans
/// double-count and the result depends on pass order.
pub fn dedup_by_text(fragments: &[Fragment]) -> Vec<Fragment> {
    let mut best: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        let key = fragment.normalized_text();
        match best.get(&key) {
            Some(&idx) => {
                if fragment.confidence > kept[idx].confidence {
                    kept[idx] = fragment.clone();
                }
            }
            None => {
                best.insert(key, kept.len());
                kept.push(fragment.clone());
            }
        }
    }

    kept
}

/// Cluster fragments onto a coarse pixel grid and keep the best detection per
/// occupied cell. Catches the same glyph reported twice at slightly different
/// positions across OCR passes, where the text itself may also differ.
pub fn dedup_by_cell(fragments: &[Fragment], cell_px: f32) -> Vec<Fragment> {
    let mut best: HashMap<(i64, i64), usize> = HashMap::new();
    let mut kept: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        let key = (
            (fragment.position.0 / cell_px).floor() as i64,
            (fragment.position.1 / cell_px).floor() as i64,
        );
        match best.get(&key) {
            Some(&idx) => {
                if fragment.confidence > kept[idx].confidence {
                    kept[idx] = fragment.clone();
                }
            }
            None => {
                best.insert(key, kept.len());
                kept.push(fragment.clone());
            }
        }
    }

    kept
}
