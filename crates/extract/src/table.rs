//! Positional-text-to-table reconstruction.
//!
//! Clusters positioned, confidence-scored tokens into rows and columns.
//! Thresholds are derived from the gap distribution of the document itself
//! rather than fixed pixel constants: photographed and handwritten pages vary
//! too much in scale for a constant to hold.

use tracing::debug;

use crate::error::ExtractError;
use crate::fragment::{dedup_by_cell, Fragment};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Tokens below this confidence are dropped before clustering.
const MIN_TOKEN_CONFIDENCE: f64 = 0.3;
/// Single-character tokens carry a much higher noise rate.
const MIN_SINGLE_CHAR_CONFIDENCE: f64 = 0.6;
/// Coarse grid cell for merging duplicate detections of the same glyph.
const DEDUP_CELL_PX: f32 = 6.0;
/// Same-row threshold is this fraction of the median consecutive-y gap,
/// clamped below. A fraction splits rows cleanly whether or not tokens in a
/// row share an exact baseline.
const ROW_GAP_FACTOR: f32 = 0.5;
const MIN_ROW_THRESHOLD: f32 = 8.0;
const MAX_ROW_THRESHOLD: f32 = 25.0;
/// Column boundaries need a gap meaningfully larger than intra-word spacing.
const COLUMN_GAP_FACTOR: f32 = 2.5;
const MIN_COLUMN_GAP: f32 = 30.0;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Rectangular grid of cell strings. The first row is treated as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    pub rows: Vec<Vec<String>>,
}

impl TableGrid {
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn body(&self) -> &[Vec<String>] {
        if self.rows.len() > 1 {
            &self.rows[1..]
        } else {
            &[]
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Render the grid as CSV for hand-off to any tabular consumer.
    pub fn to_csv(&self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            let _ = writer.write_record(row);
        }
        writer
            .into_inner()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Recover a rectangular table from one image's positioned fragments.
pub fn recover_table(fragments: &[Fragment]) -> Result<TableGrid, ExtractError> {
    if fragments.is_empty() {
        return Err(ExtractError::EmptyOcr);
    }

    let tokens: Vec<Fragment> = fragments
        .iter()
        .filter(|f| {
            let floor = if f.text.trim().chars().count() <= 1 {
                MIN_SINGLE_CHAR_CONFIDENCE
            } else {
                MIN_TOKEN_CONFIDENCE
            };
            f.confidence >= floor
        })
        .cloned()
        .collect();

    let mut tokens = dedup_by_cell(&tokens, DEDUP_CELL_PX);
    if tokens.is_empty() {
        return Err(ExtractError::NoStructure);
    }

    tokens.sort_by(|a, b| {
        a.position
            .0
            .total_cmp(&b.position.0)
            .then(a.position.1.total_cmp(&b.position.1))
    });

    let threshold = row_threshold(&tokens);
    let rows = group_rows(&tokens, threshold);

    let centers = detect_column_centers(&tokens);
    let mut cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| match &centers {
            // Re-align only rows the raw grouping split into more cells than
            // there are columns; an already-correct row is left alone.
            Some(centers) if centers.len() < row.len() => align_row(row, centers),
            _ => row.iter().map(|t| t.text.clone()).collect(),
        })
        .collect();

    let width = modal_len(&cells);
    debug!(
        rows = cells.len(),
        columns = width,
        row_threshold = threshold,
        "recovered table structure"
    );
    for row in &mut cells {
        row.resize(width, String::new());
    }

    Ok(TableGrid { rows: cells })
}

// ---------------------------------------------------------------------------
// Row grouping
// ---------------------------------------------------------------------------

fn median(sorted: &[f32]) -> f32 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn row_threshold(tokens: &[Fragment]) -> f32 {
    let mut ys: Vec<f32> = tokens.iter().map(|t| t.position.0).collect();
    ys.sort_by(f32::total_cmp);
    ys.dedup_by(|a, b| (*a - *b).abs() < f32::EPSILON);

    let mut gaps: Vec<f32> = ys.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return MIN_ROW_THRESHOLD;
    }
    gaps.sort_by(f32::total_cmp);

    (median(&gaps) * ROW_GAP_FACTOR).clamp(MIN_ROW_THRESHOLD, MAX_ROW_THRESHOLD)
}

/// Walk tokens in (y, x) order; a token within `threshold` of the running
/// previous y joins the current row, anything further starts a new one.
/// Rows come out sorted left-to-right.
fn group_rows(tokens: &[Fragment], threshold: f32) -> Vec<Vec<Fragment>> {
    let mut rows: Vec<Vec<Fragment>> = Vec::new();
    let mut current: Vec<Fragment> = Vec::new();
    let mut previous_y: Option<f32> = None;

    for token in tokens {
        let y = token.position.0;
        if let Some(py) = previous_y {
            if (y - py).abs() >= threshold {
                if !current.is_empty() {
                    current.sort_by(|a, b| a.position.1.total_cmp(&b.position.1));
                    rows.push(std::mem::take(&mut current));
                }
            }
        }
        current.push(token.clone());
        previous_y = Some(y);
    }
    if !current.is_empty() {
        current.sort_by(|a, b| a.position.1.total_cmp(&b.position.1));
        rows.push(current);
    }

    rows
}

// ---------------------------------------------------------------------------
// Column alignment
// ---------------------------------------------------------------------------

/// Cluster x-positions into column centers, splitting where the gap is
/// meaningfully larger than typical intra-word spacing. `None` when the
/// distribution does not support at least two columns.
fn detect_column_centers(tokens: &[Fragment]) -> Option<Vec<f32>> {
    let mut xs: Vec<f32> = tokens.iter().map(|t| t.position.1).collect();
    xs.sort_by(f32::total_cmp);

    let mut gaps: Vec<f32> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f32::total_cmp);
    let split_gap = (median(&gaps) * COLUMN_GAP_FACTOR).max(MIN_COLUMN_GAP);

    let mut clusters: Vec<Vec<f32>> = vec![vec![xs[0]]];
    for pair in xs.windows(2) {
        if pair[1] - pair[0] > split_gap {
            clusters.push(Vec::new());
        }
        if let Some(cluster) = clusters.last_mut() {
            cluster.push(pair[1]);
        }
    }

    if clusters.len() < 2 {
        return None;
    }
    Some(
        clusters
            .iter()
            .map(|c| c.iter().sum::<f32>() / c.len() as f32)
            .collect(),
    )
}

/// Snap each token of an over-fragmented row onto its nearest column center;
/// tokens landing on the same column are joined with a space.
fn align_row(row: &[Fragment], centers: &[f32]) -> Vec<String> {
    let mut cells = vec![String::new(); centers.len()];
    for token in row {
        let idx = nearest_center(centers, token.position.1);
        if cells[idx].is_empty() {
            cells[idx] = token.text.clone();
        } else {
            cells[idx].push(' ');
            cells[idx].push_str(&token.text);
        }
    }
    cells
}

fn nearest_center(centers: &[f32], x: f32) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, center) in centers.iter().enumerate() {
        let dist = (center - x).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Most common row length; ties go to the longer row so data is not clipped.
fn modal_len(rows: &[Vec<String>]) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for row in rows {
        match counts.iter_mut().find(|(len, _)| *len == row.len()) {
            Some((_, count)) => *count += 1,
            None => counts.push((row.len(), 1)),
        }
    }
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map_or(0, |(len, _)| *len)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
