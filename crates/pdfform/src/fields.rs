//! Interactive form field enumeration.
//!
//! Walks `Catalog -> AcroForm -> Fields`, recursing through `/Kids`, and
//! produces the ordered list of [`FormField`]s. A document without an
//! AcroForm dictionary yields an empty list; flat-layout detection for
//! such documents is an external collaborator, not handled here.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::parser::backend::decode_text_simple;
use crate::parser::text::clean_text;
use crate::types::{FieldKind, FormField, Rect};
use crate::PdfError;

// Field flag bits from the PDF specification (1-based bit positions).
const FLAG_RADIO: i64 = 1 << 15; // bit 16
const FLAG_PUSHBUTTON: i64 = 1 << 16; // bit 17
const FLAG_COMBO: i64 = 1 << 17; // bit 18

/// A terminal field as found in the AcroForm tree, before page resolution.
///
/// Shared with the compiler, which needs the object identities to write
/// values back.
#[derive(Debug, Clone)]
pub(crate) struct FieldNode {
    pub name: String,
    pub field_id: ObjectId,
    pub kind: FieldKind,
    /// Widget annotation ids, document order. The first is the primary
    /// widget; it may be the field object itself (merged field/widget).
    pub widget_ids: Vec<ObjectId>,
    pub rect: Option<Rect>,
    pub max_length: Option<i64>,
    pub options: Option<Vec<String>>,
}

/// Enumerate the document's interactive form fields.
///
/// For each field the **first** widget annotation's rectangle is used as
/// the field's position. Duplicate fully-qualified names keep the first
/// occurrence so that the name remains a stable unique key.
pub fn enumerate_fields(doc: &Document) -> Result<Vec<FormField>, PdfError> {
    let nodes = collect_field_nodes(doc)?;
    let page_of = annotation_page_map(doc);

    let mut seen: HashSet<String> = HashSet::new();
    let mut fields = Vec::with_capacity(nodes.len());

    for node in nodes {
        if !seen.insert(node.name.clone()) {
            continue;
        }
        let page = node
            .widget_ids
            .first()
            .and_then(|id| page_of.get(id))
            .copied()
            .unwrap_or(1);
        fields.push(FormField {
            name: node.name,
            kind: node.kind,
            rect: node.rect.unwrap_or(Rect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            }),
            page,
            max_length: node.max_length,
            options: node.options,
        });
    }

    Ok(fields)
}

/// Walk the AcroForm tree and collect terminal field nodes.
pub(crate) fn collect_field_nodes(doc: &Document) -> Result<Vec<FieldNode>, PdfError> {
    let catalog = doc
        .catalog()
        .map_err(|e| PdfError::Malformed(format!("cannot read document catalog: {}", e)))?;

    let acro_form = match catalog.get(b"AcroForm") {
        Ok(obj) => match resolve_dict(doc, obj) {
            Some(dict) => dict,
            None => return Ok(Vec::new()),
        },
        // No AcroForm dictionary at all: a pure flat layout.
        Err(_) => return Ok(Vec::new()),
    };

    let field_refs = match acro_form.get(b"Fields").ok().and_then(|o| resolve_array(doc, o)) {
        Some(arr) => arr,
        None => return Ok(Vec::new()),
    };

    let mut nodes = Vec::new();
    for obj in &field_refs {
        if let Ok(id) = obj.as_reference() {
            walk_field(doc, id, None, None, None, &mut nodes);
        }
    }

    Ok(nodes)
}

/// Recursive descent over a field and its `/Kids`.
///
/// `/FT` and `/Ff` are inheritable; `/T` builds the fully-qualified
/// dotted name. Kids that carry their own `/T` are sub-fields; kids
/// without one are widget annotations of the current field.
fn walk_field(
    doc: &Document,
    field_id: ObjectId,
    parent_name: Option<&str>,
    inherited_ft: Option<Vec<u8>>,
    inherited_ff: Option<i64>,
    out: &mut Vec<FieldNode>,
) {
    let dict = match doc.get_object(field_id).ok().and_then(|o| o.as_dict().ok()) {
        Some(d) => d,
        None => return,
    };

    let partial = dict
        .get(b"T")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| match o {
            Object::String(bytes, _) => Some(clean_text(&decode_text_simple(bytes))),
            _ => None,
        });

    let name = match (parent_name, partial.as_deref()) {
        (Some(p), Some(t)) => Some(format!("{}.{}", p, t)),
        (Some(p), None) => Some(p.to_string()),
        (None, Some(t)) => Some(t.to_string()),
        (None, None) => None,
    };

    let ft = dict
        .get(b"FT")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| n.to_vec())
        .or(inherited_ft);
    let ff = dict
        .get(b"Ff")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_i64().ok())
        .or(inherited_ff);

    let kids = dict.get(b"Kids").ok().and_then(|o| resolve_array(doc, o));

    // Sub-fields are kids with their own partial name.
    if let Some(kid_objs) = &kids {
        let kid_ids: Vec<ObjectId> = kid_objs.iter().filter_map(|o| o.as_reference().ok()).collect();
        let has_subfields = kid_ids.iter().any(|&id| {
            doc.get_object(id)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.has(b"T"))
        });

        if has_subfields {
            for id in kid_ids {
                walk_field(doc, id, name.as_deref(), ft.clone(), ff, out);
            }
            return;
        }
    }

    // Terminal field. A node without any name cannot be keyed and is skipped.
    let name = match name {
        Some(n) if !n.is_empty() => n,
        _ => return,
    };

    let widget_ids: Vec<ObjectId> = match &kids {
        Some(kid_objs) => kid_objs.iter().filter_map(|o| o.as_reference().ok()).collect(),
        // Merged field/widget: the field object is its own annotation.
        None => vec![field_id],
    };

    let rect = widget_ids.first().and_then(|&id| widget_rect(doc, id));
    let kind = field_kind(ft.as_deref(), ff.unwrap_or(0));

    let max_length = match kind {
        FieldKind::Text => dict
            .get(b"MaxLen")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_i64().ok()),
        _ => None,
    };

    let options = dict
        .get(b"Opt")
        .ok()
        .and_then(|o| resolve_array(doc, o))
        .map(|arr| arr.iter().filter_map(|o| option_label(doc, o)).collect::<Vec<_>>())
        .filter(|v: &Vec<String>| !v.is_empty());

    out.push(FieldNode {
        name,
        field_id,
        kind,
        widget_ids,
        rect,
        max_length,
        options,
    });
}

/// Map `/FT` plus flag bits to a [`FieldKind`].
fn field_kind(ft: Option<&[u8]>, ff: i64) -> FieldKind {
    match ft {
        Some(b"Tx") => FieldKind::Text,
        Some(b"Btn") => {
            if ff & FLAG_PUSHBUTTON != 0 {
                FieldKind::PushButton
            } else if ff & FLAG_RADIO != 0 {
                FieldKind::RadioGroup
            } else {
                FieldKind::CheckBox
            }
        }
        Some(b"Ch") => {
            if ff & FLAG_COMBO != 0 {
                FieldKind::ComboBox
            } else {
                FieldKind::ListBox
            }
        }
        Some(b"Sig") => FieldKind::Signature,
        _ => FieldKind::Unknown,
    }
}

/// Read a widget annotation's `/Rect` as a normalized [`Rect`].
fn widget_rect(doc: &Document, widget_id: ObjectId) -> Option<Rect> {
    let dict = doc.get_object(widget_id).ok()?.as_dict().ok()?;
    let arr = dict.get(b"Rect").ok().and_then(|o| resolve_array(doc, o))?;
    if arr.len() < 4 {
        return None;
    }
    let nums: Vec<f32> = arr.iter().filter_map(|o| as_number(doc, o)).collect();
    if nums.len() < 4 {
        return None;
    }
    Some(Rect::from_corners(nums[0], nums[1], nums[2], nums[3]))
}

/// An `/Opt` element is either a display string or an
/// `[export, display]` pair.
fn option_label(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Array(pair) => pair.iter().rev().find_map(|o| match resolve(doc, o) {
            Some(Object::String(bytes, _)) => Some(decode_text_simple(bytes)),
            _ => None,
        }),
        _ => None,
    }
}

/// Build a map from annotation object id to its 1-based page number by
/// scanning every page's `/Annots` array.
fn annotation_page_map(doc: &Document) -> HashMap<ObjectId, usize> {
    let mut map = HashMap::new();
    for (page_num, page_id) in doc.get_pages() {
        let annots = doc
            .get_object(page_id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"Annots").ok())
            .and_then(|o| resolve_array(doc, o));
        if let Some(annots) = annots {
            for annot in annots {
                if let Ok(id) = annot.as_reference() {
                    map.entry(id).or_insert(page_num as usize);
                }
            }
        }
    }
    map
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Follow a reference to its target object (a single level suffices for
/// well-formed documents; chained references are walked to a small depth).
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..4 {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

fn resolve_array(doc: &Document, obj: &Object) -> Option<Vec<Object>> {
    match resolve(doc, obj)? {
        Object::Array(arr) => Some(arr.clone()),
        _ => None,
    }
}

fn as_number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
