//! Writing values into interactive form fields.
//!
//! The compiler takes resolved `field name -> value` assignments and
//! writes them into the document's AcroForm fields by name. Partial fill
//! is the accepted contract: an assignment for a name the document does
//! not carry is ignored, a field without an assignment stays blank, and
//! the compile never fails for data reasons.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::fields::{collect_field_nodes, FieldNode};
use crate::types::{FieldAssignment, FieldKind};
use crate::PdfError;

/// Outcome of a fill pass.
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    /// Field names that received a value.
    pub filled: Vec<String>,
    /// Assignment names with no matching field in the document.
    pub unmatched: Vec<String>,
}

/// Fill a PDF given as raw bytes and serialize the result.
pub fn fill_form(
    bytes: &[u8],
    assignments: &[FieldAssignment],
) -> Result<(Vec<u8>, FillReport), PdfError> {
    let mut doc =
        Document::load_mem(bytes).map_err(|e| PdfError::Malformed(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }

    let report = fill_document(&mut doc, assignments)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Malformed(format!("cannot serialize filled document: {}", e)))?;
    Ok((out, report))
}

/// Fill an already-parsed document in place.
pub fn fill_document(
    doc: &mut Document,
    assignments: &[FieldAssignment],
) -> Result<FillReport, PdfError> {
    let nodes = collect_field_nodes(doc)?;
    let mut report = FillReport::default();

    // Plan all writes against the immutable document first, then apply.
    let mut writes: Vec<WriteOp> = Vec::new();

    for assignment in assignments {
        let node = nodes.iter().find(|n| n.name == assignment.field_name);
        let node = match node {
            Some(n) => n,
            None => {
                report.unmatched.push(assignment.field_name.clone());
                continue;
            }
        };

        match node.kind {
            FieldKind::Text | FieldKind::ComboBox | FieldKind::ListBox | FieldKind::Unknown => {
                let value = match node.max_length {
                    Some(max) if max >= 0 => truncate_chars(&assignment.value, max as usize),
                    _ => assignment.value.clone(),
                };
                writes.push(WriteOp::Text {
                    field_id: node.field_id,
                    bytes: encode_pdf_string(&value),
                });
                report.filled.push(node.name.clone());
            }
            FieldKind::CheckBox | FieldKind::RadioGroup => {
                let state = button_state(doc, node, &assignment.value);
                let widgets = node
                    .widget_ids
                    .iter()
                    .map(|&wid| {
                        let on = widget_on_state(doc, wid);
                        let target = match (&state, on) {
                            (Some(s), Some(w)) if *s == w => s.clone(),
                            _ => b"Off".to_vec(),
                        };
                        (wid, target)
                    })
                    .collect();
                writes.push(WriteOp::Button {
                    field_id: node.field_id,
                    state: state.clone().unwrap_or_else(|| b"Off".to_vec()),
                    widgets,
                });
                if state.is_some() {
                    report.filled.push(node.name.clone());
                }
            }
            // Push buttons and signatures carry no fillable value.
            FieldKind::PushButton | FieldKind::Signature => {}
        }
    }

    let any_written = !writes.is_empty();
    for write in writes {
        apply_write(doc, write);
    }

    if any_written {
        set_need_appearances(doc);
    }

    Ok(report)
}

enum WriteOp {
    Text {
        field_id: ObjectId,
        bytes: Vec<u8>,
    },
    Button {
        field_id: ObjectId,
        state: Vec<u8>,
        widgets: Vec<(ObjectId, Vec<u8>)>,
    },
}

fn apply_write(doc: &mut Document, write: WriteOp) {
    match write {
        WriteOp::Text { field_id, bytes } => {
            if let Some(dict) = dict_mut(doc, field_id) {
                dict.set("V", Object::String(bytes, StringFormat::Literal));
            }
        }
        WriteOp::Button {
            field_id,
            state,
            widgets,
        } => {
            if let Some(dict) = dict_mut(doc, field_id) {
                dict.set("V", Object::Name(state));
            }
            for (wid, target) in widgets {
                if let Some(dict) = dict_mut(doc, wid) {
                    dict.set("AS", Object::Name(target));
                }
            }
        }
    }
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Option<&mut Dictionary> {
    doc.get_object_mut(id).ok()?.as_dict_mut().ok()
}

/// Decide the target on-state for a button field from the supplied value.
///
/// Radio groups first try to match the value against a widget's on-state
/// name (the enumerated coercion); both kinds then fall back to the
/// boolean coercion, which picks the first widget's on-state.
fn button_state(doc: &Document, node: &FieldNode, value: &str) -> Option<Vec<u8>> {
    let states: Vec<Vec<u8>> = node
        .widget_ids
        .iter()
        .filter_map(|&wid| widget_on_state(doc, wid))
        .collect();

    if node.kind == FieldKind::RadioGroup {
        if let Some(found) = states.iter().find(|s| s.as_slice() == value.as_bytes()) {
            return Some(found.clone());
        }
    }

    if truthy(value) {
        return Some(states.first().cloned().unwrap_or_else(|| b"Yes".to_vec()));
    }

    None
}

/// The first non-`Off` appearance name declared under the widget's
/// `/AP /N` dictionary.
fn widget_on_state(doc: &Document, widget_id: ObjectId) -> Option<Vec<u8>> {
    let dict = doc.get_object(widget_id).ok()?.as_dict().ok()?;
    let ap = resolve_dict(doc, dict.get(b"AP").ok()?)?;
    let normal = resolve_dict(doc, ap.get(b"N").ok()?)?;
    normal
        .iter()
        .map(|(k, _)| k.clone())
        .find(|k| k.as_slice() != b"Off")
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Boolean coercion for checkbox values.
fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "si" | "s\u{00EC}" | "x" | "on"
    )
}

/// Truncate to a character count without splitting a code point.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// PDF text string encoding: plain bytes for ASCII, UTF-16BE with BOM
/// otherwise.
fn encode_pdf_string(s: &str) -> Vec<u8> {
    if s.is_ascii() {
        return s.as_bytes().to_vec();
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

/// Mark the AcroForm so viewers regenerate field appearance streams.
fn set_need_appearances(doc: &mut Document) {
    let root_id = match doc.trailer.get(b"Root").and_then(|o| o.as_reference()) {
        Ok(id) => id,
        Err(_) => return,
    };

    let acro_ref = doc
        .get_object(root_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"AcroForm").ok())
        .and_then(|o| o.as_reference().ok());

    match acro_ref {
        Some(acro_id) => {
            if let Some(dict) = dict_mut(doc, acro_id) {
                dict.set("NeedAppearances", true);
            }
        }
        None => {
            // Inline AcroForm dictionary on the catalog.
            if let Some(catalog) = dict_mut(doc, root_id) {
                if let Ok(Object::Dictionary(acro)) = catalog.get_mut(b"AcroForm") {
                    acro.set("NeedAppearances", true);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use lopdf::dictionary;

    use super::*;

    fn assignment(name: &str, value: &str) -> FieldAssignment {
        FieldAssignment {
            field_name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Single-page document with the given merged field/widget ids.
    fn make_doc(doc: &mut Document, field_ids: &[ObjectId]) {
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => field_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let acro_id = doc.add_object(dictionary! {
            "Fields" => field_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acro_id,
        });
        doc.trailer.set("Root", catalog_id);
    }

    fn text_field(doc: &mut Document, name: &str, max_len: Option<i64>) -> ObjectId {
        let mut dict = dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal(name),
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![
                Object::Real(100.0),
                Object::Real(700.0),
                Object::Real(300.0),
                Object::Real(715.0),
            ],
        };
        if let Some(ml) = max_len {
            dict.set("MaxLen", ml);
        }
        doc.add_object(dict)
    }

    fn checkbox_field(doc: &mut Document, name: &str, on_state: &str) -> ObjectId {
        let ap_n = dictionary! {
            on_state => dictionary! {},
            "Off" => dictionary! {},
        };
        doc.add_object(dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal(name),
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![
                Object::Real(50.0),
                Object::Real(500.0),
                Object::Real(62.0),
                Object::Real(512.0),
            ],
            "AP" => dictionary! { "N" => Object::Dictionary(ap_n) },
        })
    }

    fn field_value(doc: &Document, id: ObjectId) -> Option<Object> {
        doc.get_object(id)
            .ok()?
            .as_dict()
            .ok()?
            .get(b"V")
            .ok()
            .cloned()
    }

    #[test]
    fn fills_text_field() {
        let mut doc = Document::with_version("1.5");
        let f = text_field(&mut doc, "cognome", None);
        make_doc(&mut doc, &[f]);

        let report = fill_document(&mut doc, &[assignment("cognome", "Rossi")]).unwrap();

        assert_eq!(report.filled, vec!["cognome"]);
        assert!(report.unmatched.is_empty());
        match field_value(&doc, f) {
            Some(Object::String(bytes, _)) => assert_eq!(bytes, b"Rossi"),
            other => panic!("expected string value, got {:?}", other),
        }
    }

    #[test]
    fn truncates_to_max_length() {
        let mut doc = Document::with_version("1.5");
        let f = text_field(&mut doc, "cap", Some(5));
        make_doc(&mut doc, &[f]);

        fill_document(&mut doc, &[assignment("cap", "001991234")]).unwrap();

        match field_value(&doc, f) {
            Some(Object::String(bytes, _)) => assert_eq!(bytes, b"00199"),
            other => panic!("expected string value, got {:?}", other),
        }
    }

    #[test]
    fn non_ascii_values_use_utf16be() {
        let mut doc = Document::with_version("1.5");
        let f = text_field(&mut doc, "comune", None);
        make_doc(&mut doc, &[f]);

        fill_document(&mut doc, &[assignment("comune", "Forl\u{00EC}")]).unwrap();

        match field_value(&doc, f) {
            Some(Object::String(bytes, _)) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
            }
            other => panic!("expected string value, got {:?}", other),
        }
    }

    #[test]
    fn checkbox_truthy_sets_on_state() {
        let mut doc = Document::with_version("1.5");
        let f = checkbox_field(&mut doc, "privacy", "Yes");
        make_doc(&mut doc, &[f]);

        let report = fill_document(&mut doc, &[assignment("privacy", "true")]).unwrap();

        assert_eq!(report.filled, vec!["privacy"]);
        assert_eq!(field_value(&doc, f), Some(Object::Name(b"Yes".to_vec())));
        let dict = doc.get_object(f).unwrap().as_dict().unwrap();
        assert_eq!(
            dict.get(b"AS").ok().cloned(),
            Some(Object::Name(b"Yes".to_vec()))
        );
    }

    #[test]
    fn checkbox_falsy_stays_off() {
        let mut doc = Document::with_version("1.5");
        let f = checkbox_field(&mut doc, "privacy", "Yes");
        make_doc(&mut doc, &[f]);

        let report = fill_document(&mut doc, &[assignment("privacy", "no")]).unwrap();

        assert!(report.filled.is_empty());
        assert_eq!(field_value(&doc, f), Some(Object::Name(b"Off".to_vec())));
    }

    #[test]
    fn radio_group_matches_state_name() {
        let mut doc = Document::with_version("1.5");
        let w_m = checkbox_field(&mut doc, "", "M");
        let w_f = checkbox_field(&mut doc, "", "F");
        // Strip the bogus names: radio widgets carry no /T of their own.
        for id in [w_m, w_f] {
            doc.get_object_mut(id)
                .unwrap()
                .as_dict_mut()
                .unwrap()
                .remove(b"T");
        }
        let group = doc.add_object(dictionary! {
            "FT" => "Btn",
            "T" => Object::string_literal("sesso"),
            "Ff" => 1_i64 << 15,
            "Kids" => vec![w_m.into(), w_f.into()],
        });
        make_doc(&mut doc, &[group]);

        fill_document(&mut doc, &[assignment("sesso", "F")]).unwrap();

        assert_eq!(
            field_value(&doc, group),
            Some(Object::Name(b"F".to_vec()))
        );
        let m_dict = doc.get_object(w_m).unwrap().as_dict().unwrap();
        assert_eq!(
            m_dict.get(b"AS").ok().cloned(),
            Some(Object::Name(b"Off".to_vec()))
        );
        let f_dict = doc.get_object(w_f).unwrap().as_dict().unwrap();
        assert_eq!(
            f_dict.get(b"AS").ok().cloned(),
            Some(Object::Name(b"F".to_vec()))
        );
    }

    #[test]
    fn unmatched_assignment_is_reported_not_fatal() {
        let mut doc = Document::with_version("1.5");
        let f = text_field(&mut doc, "cognome", None);
        make_doc(&mut doc, &[f]);

        let report = fill_document(
            &mut doc,
            &[assignment("cognome", "Rossi"), assignment("ghost", "boo")],
        )
        .unwrap();

        assert_eq!(report.filled, vec!["cognome"]);
        assert_eq!(report.unmatched, vec!["ghost"]);
    }

    #[test]
    fn partial_fill_round_trips_through_bytes() {
        let mut doc = Document::with_version("1.5");
        let a = text_field(&mut doc, "nome", None);
        let b = text_field(&mut doc, "cognome", None);
        make_doc(&mut doc, &[a, b]);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        // Only one of the two fields gets a value.
        let (out, report) = fill_form(&bytes, &[assignment("nome", "Mario")]).unwrap();

        assert_eq!(report.filled, vec!["nome"]);
        // Output must still be a valid, parseable document.
        let reloaded = Document::load_mem(&out).unwrap();
        let nodes = collect_field_nodes(&reloaded).unwrap();
        assert_eq!(nodes.len(), 2);
        let untouched = nodes.iter().find(|n| n.name == "cognome").unwrap();
        let dict = reloaded
            .get_object(untouched.field_id)
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(dict.get(b"V").is_err(), "unmatched field must stay blank");
    }

    #[test]
    fn sets_need_appearances() {
        let mut doc = Document::with_version("1.5");
        let f = text_field(&mut doc, "cognome", None);
        make_doc(&mut doc, &[f]);

        fill_document(&mut doc, &[assignment("cognome", "Rossi")]).unwrap();

        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let acro_id = doc
            .get_object(root_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"AcroForm")
            .unwrap()
            .as_reference()
            .unwrap();
        let acro = doc.get_object(acro_id).unwrap().as_dict().unwrap();
        assert_eq!(
            acro.get(b"NeedAppearances").ok().cloned(),
            Some(Object::Boolean(true))
        );
    }
}
