//! Spatial context resolution.
//!
//! For each form field, searches the positioned-text list for the text
//! most likely to be its human-readable label, using geometry alone.
//! Purely computational: malformed geometry skips a directional slot
//! (empty string), it never drops the field.

use std::cmp::Ordering;

use crate::types::{FieldContext, FormField, TextRun};

/// Tunable tolerances and radii for the directional search.
///
/// All values are in the PDF's native coordinate space, the same scale as
/// field dimensions.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Two Y coordinates within this distance count as the same row.
    pub row_tolerance: f32,
    /// Column alignment slack added to the field width for above/below.
    pub column_slack: f32,
    /// Maximum gap between a run and the field edge, per direction.
    pub radius: f32,
    /// Maximum center-to-center distance for the `nearby` list.
    pub nearby_radius: f32,
    /// Candidate caps per direction.
    pub max_before: usize,
    pub max_after: usize,
    pub max_above: usize,
    pub max_below: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 2.0,
            column_slack: 2.0,
            radius: 10.0,
            nearby_radius: 10.0,
            max_before: 5,
            max_after: 3,
            max_above: 3,
            max_below: 3,
        }
    }
}

/// Small overlap tolerance: widget borders frequently overlap the label
/// text box by a fraction of a unit.
const OVERLAP_SLACK: f32 = 0.5;

/// A run whose geometry cannot be trusted is skipped for directional
/// search only.
fn run_is_malformed(run: &TextRun) -> bool {
    run.x.is_nan()
        || run.y.is_nan()
        || run.width.is_nan()
        || run.height.is_nan()
        || run.width < 0.0
        || run.height < 0.0
}

/// Resolve the directional context for every field against the same run
/// list. Output order matches input field order.
pub fn resolve_contexts(
    fields: &[FormField],
    runs: &[TextRun],
    config: &SearchConfig,
) -> Vec<FieldContext> {
    fields
        .iter()
        .map(|f| resolve_context(f.clone(), runs, config))
        .collect()
}

/// Resolve the four directional snippets and the nearby list for one field.
pub fn resolve_context(field: FormField, runs: &[TextRun], config: &SearchConfig) -> FieldContext {
    if field.rect.is_malformed() {
        return FieldContext {
            field,
            before: String::new(),
            after: String::new(),
            above: String::new(),
            below: String::new(),
            nearby: Vec::new(),
        };
    }

    let page_runs: Vec<&TextRun> = runs
        .iter()
        .filter(|r| r.page == field.page && !run_is_malformed(r))
        .collect();

    let rect = field.rect;

    // -- before: same row, right edge to the left of the field ------------
    let mut before: Vec<(f32, &TextRun)> = page_runs
        .iter()
        .filter(|r| (r.y - rect.y).abs() < config.row_tolerance)
        .filter_map(|r| {
            let gap = rect.x - (r.x + r.width);
            (gap > -OVERLAP_SLACK && gap < config.radius).then_some((gap, *r))
        })
        .collect();
    sort_by_distance(&mut before);
    before.truncate(config.max_before);
    // Concatenate left-to-right so the label reads naturally.
    before.sort_by(|a, b| cmp_f32(a.1.x, b.1.x));
    let before = join_texts(&before);

    // -- after: same row, to the right --------------------------------------
    let mut after: Vec<(f32, &TextRun)> = page_runs
        .iter()
        .filter(|r| (r.y - rect.y).abs() < config.row_tolerance)
        .filter_map(|r| {
            let gap = r.x - rect.right();
            (gap > -OVERLAP_SLACK && gap < config.radius).then_some((gap, *r))
        })
        .collect();
    sort_by_distance(&mut after);
    after.truncate(config.max_after);
    after.sort_by(|a, b| cmp_f32(a.1.x, b.1.x));
    let after = join_texts(&after);

    // -- above / below: column-aligned, nearest first ------------------------
    let column_aligned = |r: &TextRun| (r.x - rect.x).abs() < rect.width + config.column_slack;

    let mut above: Vec<(f32, &TextRun)> = page_runs
        .iter()
        .filter_map(|r| {
            let gap = r.y - rect.top();
            (column_aligned(r) && gap > -OVERLAP_SLACK && gap < config.radius).then_some((gap, *r))
        })
        .collect();
    sort_by_distance(&mut above);
    above.truncate(config.max_above);
    let above = join_texts(&above);

    let mut below: Vec<(f32, &TextRun)> = page_runs
        .iter()
        .filter_map(|r| {
            let gap = rect.y - (r.y + r.height);
            (column_aligned(r) && gap > -OVERLAP_SLACK && gap < config.radius).then_some((gap, *r))
        })
        .collect();
    sort_by_distance(&mut below);
    below.truncate(config.max_below);
    let below = join_texts(&below);

    // -- nearby: any direction, center-to-center ------------------------------
    let (cx, cy) = rect.center();
    let mut nearby: Vec<(f32, &TextRun)> = page_runs
        .iter()
        .filter_map(|r| {
            let rx = r.x + r.width / 2.0;
            let ry = r.y + r.height / 2.0;
            let dist = ((rx - cx).powi(2) + (ry - cy).powi(2)).sqrt();
            (dist < config.nearby_radius).then_some((dist, *r))
        })
        .collect();
    sort_by_distance(&mut nearby);
    let nearby = nearby.into_iter().map(|(_, r)| r.text.clone()).collect();

    FieldContext {
        field,
        before,
        after,
        above,
        below,
        nearby,
    }
}

/// Stable proximity ordering: distance first, then x, then y, so equal
/// distances resolve identically regardless of input run order.
fn sort_by_distance(candidates: &mut [(f32, &TextRun)]) {
    candidates.sort_by(|a, b| {
        cmp_f32(a.0, b.0)
            .then_with(|| cmp_f32(a.1.x, b.1.x))
            .then_with(|| cmp_f32(a.1.y, b.1.y))
    });
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn join_texts(candidates: &[(f32, &TextRun)]) -> String {
    candidates
        .iter()
        .map(|(_, r)| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
