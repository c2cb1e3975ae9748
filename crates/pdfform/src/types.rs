use serde::{Deserialize, Serialize};

/// A single run of text at a specific position on a page.
///
/// Produced once per parse by the coordinate text extractor; carries no
/// identity beyond its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// 1-based page number, matching the backend's page map.
    pub page: usize,
}

/// An axis-aligned rectangle in PDF user-space coordinates.
///
/// Always normalized: `x`/`y` are the lower-left corner and
/// `width`/`height` are non-negative when constructed via
/// [`Rect::from_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Build a normalized rectangle from two opposite corners as they
    /// appear in a `/Rect` array.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Rect {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// A rectangle is malformed when any component is NaN or an extent
    /// is negative. Malformed geometry skips context search but never
    /// drops the field itself.
    pub fn is_malformed(&self) -> bool {
        self.x.is_nan()
            || self.y.is_nan()
            || self.width.is_nan()
            || self.height.is_nan()
            || self.width < 0.0
            || self.height < 0.0
    }
}

/// Interactive form field kind, derived from the AcroForm `/FT` entry
/// and the `/Ff` flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    CheckBox,
    RadioGroup,
    PushButton,
    ComboBox,
    ListBox,
    Signature,
    Unknown,
}

impl FieldKind {
    /// Wire/prompt spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::CheckBox => "checkbox",
            FieldKind::RadioGroup => "radio_group",
            FieldKind::PushButton => "push_button",
            FieldKind::ComboBox => "combo_box",
            FieldKind::ListBox => "list_box",
            FieldKind::Signature => "signature",
            FieldKind::Unknown => "unknown",
        }
    }

    /// Button-style fields take an on-state name as their value instead
    /// of free text.
    pub fn is_button(&self) -> bool {
        matches!(self, FieldKind::CheckBox | FieldKind::RadioGroup)
    }
}

/// An interactive form field enumerated from the document's AcroForm
/// dictionary.
///
/// `name` is the fully-qualified dotted field name and is the stable key
/// used throughout the pipeline and in the final compiled mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    /// Rectangle of the field's first widget annotation. A field may
    /// carry multiple widgets; only the primary one is used for context
    /// search (documented limitation).
    pub rect: Rect,
    /// 1-based page number of the first widget.
    pub page: usize,
    pub max_length: Option<i64>,
    pub options: Option<Vec<String>>,
}

/// A [`FormField`] together with the page text found around it.
///
/// Created once per field per extraction run and never mutated
/// afterwards; re-extraction produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldContext {
    pub field: FormField,
    /// Text on the same row, to the left of the field.
    pub before: String,
    /// Text on the same row, to the right of the field.
    pub after: String,
    /// Column-aligned text above the field.
    pub above: String,
    /// Column-aligned text below the field.
    pub below: String,
    /// All runs within the nearby radius, nearest first.
    pub nearby: Vec<String>,
}

impl FieldContext {
    /// The single compact context string handed to the classifier: the
    /// first non-empty directional snippet, else the nearest runs.
    pub fn summary(&self) -> String {
        for s in [&self.before, &self.above, &self.after, &self.below] {
            if !s.is_empty() {
                return s.clone();
            }
        }
        self.nearby
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A resolved value ready to be written into an interactive field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub field_name: String,
    pub value: String,
}
