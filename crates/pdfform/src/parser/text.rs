//! Coordinate text extraction.
//!
//! Walks each page's content stream with a simplified PDF text-rendering
//! state machine and emits a flat, page-indexed list of positioned
//! [`TextRun`]s. Side effects (I/O) live behind the [`PdfBackend`] trait
//! provided by the caller; everything here is a pure transformation over
//! decoded content operations.

use unicode_normalization::UnicodeNormalization;

use super::backend::{get_number_from_value, PageId, PdfBackend, PdfValue};
use crate::types::TextRun;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate character width as a fraction of font size when no better
/// metric is available. 0.5 is a reasonable default for proportional fonts.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// The identity 2x3 text matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Mutable state tracked while walking a page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key, not the full name).
    font_key: Vec<u8>,
    /// Current font size in text-space units.
    font_size: f32,
    /// Elements [a, b, c, d, tx, ty] of the current text matrix.
    text_matrix: [f32; 6],
    /// Text line matrix -- set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100). Default 1.0.
    horiz_scale: f32,
    /// Character spacing (Tc).
    char_spacing: f32,
    /// Word spacing (Tw).
    word_spacing: f32,
    /// Text rise (Ts).
    text_rise: f32,
    /// Leading (TL).
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Effective font size accounting for the text matrix vertical scale.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let new_tx = self.line_matrix[0] * tx + self.line_matrix[2] * ty + self.line_matrix[4];
        let new_ty = self.line_matrix[1] * tx + self.line_matrix[3] * ty + self.line_matrix[5];
        self.line_matrix[4] = new_tx;
        self.line_matrix[5] = new_ty;
        self.text_matrix = self.line_matrix;
    }
}

/// Estimate the rendered width of a text string given the current state.
///
/// Glyph metrics are not available in the functional core, so each
/// character contributes `font_size * APPROX_CHAR_WIDTH_RATIO * horiz_scale`.
fn estimate_text_width(text: &str, state: &TextState) -> f32 {
    let n = text.chars().count() as f32;
    n * state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale
}

/// Advance the text matrix after rendering `text`.
fn advance_after_show(text: &str, state: &mut TextState) {
    let mut total_dx: f32 = 0.0;
    for ch in text.chars() {
        let char_w = state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale;
        total_dx += char_w + state.char_spacing;
        if ch == ' ' {
            total_dx += state.word_spacing;
        }
    }
    state.advance_x(total_dx);
}

/// Decode a single [`PdfValue::Str`] operand into a `String`, using the
/// backend's font-aware decoder.
fn decode_string(
    val: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    font_key: &[u8],
) -> String {
    match val {
        PdfValue::Str(bytes) => {
            let decoded = backend.decode_text(page_id, font_key, bytes);
            if decoded.is_empty() {
                super::backend::decode_text_simple(bytes)
            } else {
                decoded
            }
        }
        _ => String::new(),
    }
}

/// Normalize decoded run text: fold URL-style escapes (`%20` and friends)
/// back to literal characters and apply Unicode NFC so that composed and
/// decomposed accents compare equal downstream.
pub fn clean_text(raw: &str) -> String {
    let unescaped = if raw.contains('%') {
        match urlencoding::decode(raw) {
            Ok(cow) => cow.into_owned(),
            // Stray percent signs are legitimate page text.
            Err(_) => raw.to_string(),
        }
    } else {
        raw.to_string()
    };
    unescaped.nfc().collect()
}

// ---------------------------------------------------------------------------
// Public API: run extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and produce positioned [`TextRun`]s.
///
/// Implements a simplified PDF text-rendering state machine handling the
/// operators `BT`/`ET`, `Tf`, `Tm`, `Td`/`TD`/`T*`/`TL`, `Tc`/`Tw`/`Tz`/`Ts`,
/// and the show operators `Tj`, `TJ`, `'`, `"`.
pub fn extract_page_runs(
    backend: &dyn PdfBackend,
    page_id: PageId,
    page_num: usize,
) -> Result<Vec<TextRun>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;

    let mut state = TextState::default();
    let mut runs: Vec<TextRun> = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {
                // Font state is kept across text objects because some PDFs
                // reuse the font set earlier.
            }

            "Tf" => {
                if op.operands.len() >= 2 {
                    let key = match &op.operands[0] {
                        PdfValue::Name(n) => n.clone(),
                        PdfValue::Str(s) => s.clone(),
                        _ => continue,
                    };
                    state.font_size = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.font_key = key;
                }
            }

            "Tm" => {
                if op.operands.len() >= 6 {
                    let vals: Vec<f32> = op
                        .operands
                        .iter()
                        .take(6)
                        .filter_map(get_number_from_value)
                        .collect();
                    if vals.len() == 6 {
                        state.text_matrix = [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]];
                        state.line_matrix = state.text_matrix;
                    }
                }
            }
            "Td" => {
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                // TD is equivalent to: -ty TL ; tx ty Td
                if op.operands.len() >= 2 {
                    let tx = get_number_from_value(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number_from_value(&op.operands[1]).unwrap_or(0.0);
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => {
                state.translate_line(0.0, -state.leading);
            }
            "TL" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.leading = v;
                }
            }

            "Tc" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.operands.first().and_then(get_number_from_value) {
                    state.text_rise = v;
                }
            }

            "Tj" => {
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, page_num, &mut state, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(arr)) = op.operands.first() {
                    handle_tj_array(arr, backend, page_id, page_num, &mut state, &mut runs);
                }
            }

            "'" => {
                state.translate_line(0.0, -state.leading);
                if let Some(first) = op.operands.first() {
                    emit_show_string(first, backend, page_id, page_num, &mut state, &mut runs);
                }
            }
            "\"" => {
                // " aw ac string  =>  set Tw, Tc, T*, Tj
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        state.char_spacing = ac;
                    }
                    state.translate_line(0.0, -state.leading);
                    emit_show_string(
                        &op.operands[2],
                        backend,
                        page_id,
                        page_num,
                        &mut state,
                        &mut runs,
                    );
                }
            }

            _ => { /* Ignore non-text operators */ }
        }
    }

    Ok(runs)
}

/// Decode an operand as a string, create a [`TextRun`], and advance the
/// text position. Shared by `Tj`, `'`, and `"` operators.
fn emit_show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page_id: PageId,
    page_num: usize,
    state: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let text = decode_string(operand, backend, page_id, &state.font_key);
    if text.is_empty() {
        return;
    }
    let cleaned = clean_text(&text);
    if !cleaned.trim().is_empty() {
        runs.push(TextRun {
            text: cleaned,
            x: state.x(),
            y: state.y() + state.text_rise,
            width: estimate_text_width(&text, state),
            height: state.effective_font_size(),
            page: page_num,
        });
    }
    advance_after_show(&text, state);
}

/// Process a `TJ` array: elements are either strings to render or numeric
/// kerning adjustments (in thousandths of a unit of text space).
fn handle_tj_array(
    arr: &[PdfValue],
    backend: &dyn PdfBackend,
    page_id: PageId,
    page_num: usize,
    state: &mut TextState,
    runs: &mut Vec<TextRun>,
) {
    let mut buf = String::new();
    let mut run_x = state.x();
    let run_y = state.y() + state.text_rise;

    for elem in arr {
        match elem {
            PdfValue::Str(_) => {
                let fragment = decode_string(elem, backend, page_id, &state.font_key);
                if buf.is_empty() {
                    run_x = state.x();
                }
                buf.push_str(&fragment);
                advance_after_show(&fragment, state);
            }
            val => {
                // Numeric kerning: negative value = move right, positive =
                // move left (in thousandths of a text-space unit).
                if let Some(adj) = get_number_from_value(val) {
                    let dx = -adj / 1000.0 * state.font_size * state.horiz_scale;

                    // A displacement large enough to look like a word gap
                    // becomes a space in the accumulated buffer.
                    let gap_threshold =
                        state.font_size * APPROX_CHAR_WIDTH_RATIO * state.horiz_scale * 0.3;
                    if dx > gap_threshold && !buf.is_empty() {
                        buf.push(' ');
                    }

                    state.advance_x(dx);
                }
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        let cleaned = clean_text(trimmed);
        if !cleaned.trim().is_empty() {
            runs.push(TextRun {
                text: cleaned,
                x: run_x,
                y: run_y,
                width: estimate_text_width(trimmed, state),
                height: state.effective_font_size(),
                page: page_num,
            });
        }
    }
}

/// Extract positioned text runs from every page in the document.
///
/// Returns a flat list; each run carries its 1-based page number. A page
/// whose content stream cannot be read contributes no runs -- a parseable
/// document with no extractable text yields an empty list, which callers
/// must treat as "no context available", not as a failure.
pub fn extract_all_runs(backend: &dyn PdfBackend) -> Result<Vec<TextRun>, PdfError> {
    let page_map = backend.pages();
    let mut runs: Vec<TextRun> = Vec::new();

    for (&page_num, &page_id) in &page_map {
        match extract_page_runs(backend, page_id, page_num as usize) {
            Ok(page_runs) => runs.extend(page_runs),
            // A single unreadable page degrades context quality only.
            Err(_) => continue,
        }
    }

    Ok(runs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
