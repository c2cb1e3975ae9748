//! Parsing of AI classification responses.
//!
//! The provider is asked for a bare JSON array, but real replies arrive
//! wrapped in markdown fences or surrounded by prose. The parser strips
//! fences, extracts the first balanced `[...]` span, and tolerates
//! missing keys via serde defaults; anything that does not contain a
//! well-formed array of the expected shape is a parse error, which the
//! caller treats as a Tier-1 failure for the whole batch.

use serde::Deserialize;
use thiserror::Error;

use super::heuristics::{sanitize_mapping, title_case};
use super::types::{AnalyzedField, Category, DataType};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON array found in response")]
    MissingArray,
    #[error("malformed classification array: {0}")]
    Json(String),
    #[error("classification array contains no usable records")]
    Empty,
}

/// Loosely-typed record as the model returns it. Unknown `dataType` /
/// `category` strings and missing keys are normalized afterwards instead
/// of failing the batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    field_name: String,
    #[serde(default)]
    field_type: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    data_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    mapping_suggestion: String,
}

/// Parse a model response into normalized [`AnalyzedField`]s.
///
/// Records without a `fieldName` cannot be keyed and are dropped.
pub fn parse_classification_response(response: &str) -> Result<Vec<AnalyzedField>, ParseError> {
    let stripped = strip_fences(response);
    let array = extract_json_array(stripped).ok_or(ParseError::MissingArray)?;

    let raw: Vec<RawRecord> =
        serde_json::from_str(array).map_err(|e| ParseError::Json(e.to_string()))?;

    let fields: Vec<AnalyzedField> = raw
        .into_iter()
        .filter(|r| !r.field_name.trim().is_empty())
        .map(normalize_record)
        .collect();

    if fields.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(fields)
}

fn normalize_record(raw: RawRecord) -> AnalyzedField {
    let label = if raw.label.trim().is_empty() {
        title_case(&raw.field_name)
    } else {
        raw.label.trim().to_string()
    };
    let mapping_suggestion = if raw.mapping_suggestion.trim().is_empty() {
        sanitize_mapping(&raw.field_name)
    } else {
        sanitize_mapping(&raw.mapping_suggestion)
    };

    AnalyzedField {
        field_name: raw.field_name,
        field_type: raw.field_type,
        label,
        data_type: DataType::normalize(&raw.data_type),
        category: Category::normalize(&raw.category),
        description: raw.description,
        required: raw.required,
        mapping_suggestion,
    }
}

/// Remove a single markdown fence wrapper (```json ... ```), if present.
pub fn strip_fences(response: &str) -> &str {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        text = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Extract the first balanced top-level `[...]` span, skipping brackets
/// inside JSON string literals.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"[
        {"fieldName": "cognome", "label": "Cognome", "dataType": "text",
         "category": "anagrafica", "description": "Cognome del cliente",
         "required": true, "mappingSuggestion": "cognome"}
    ]"#;

    #[test]
    fn parses_plain_array() {
        let fields = parse_classification_response(VALID).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_name, "cognome");
        assert_eq!(fields[0].category, Category::Anagrafica);
        assert!(fields[0].required);
    }

    #[test]
    fn parses_markdown_fenced_array() {
        let response = format!("```json\n{}\n```", VALID);
        let fields = parse_classification_response(&response).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "Cognome");
    }

    #[test]
    fn parses_array_amid_prose() {
        let response = format!("Ecco la classificazione richiesta:\n{}\nSpero sia utile!", VALID);
        let fields = parse_classification_response(&response).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn brackets_inside_strings_do_not_confuse_extraction() {
        let response = r#"[{"fieldName": "x", "label": "uso [interno]", "description": "a ] b"}]"#;
        let fields = parse_classification_response(response).unwrap();
        assert_eq!(fields[0].label, "uso [interno]");
    }

    #[test]
    fn missing_array_is_an_error() {
        assert!(matches!(
            parse_classification_response("non posso aiutarti"),
            Err(ParseError::MissingArray)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_classification_response("[{\"fieldName\": }]"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn empty_array_is_an_error() {
        assert!(matches!(
            parse_classification_response("[]"),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn records_without_field_name_are_dropped() {
        let response = r#"[
            {"label": "Orfano"},
            {"fieldName": "pod", "dataType": "pod", "category": "dati_luce"}
        ]"#;
        let fields = parse_classification_response(response).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_name, "pod");
    }

    #[test]
    fn unknown_enums_normalize_to_defaults() {
        let response = r#"[{"fieldName": "x", "dataType": "galaxy", "category": "marziano"}]"#;
        let fields = parse_classification_response(response).unwrap();
        assert_eq!(fields[0].data_type, DataType::Text);
        assert_eq!(fields[0].category, Category::Altro);
    }

    #[test]
    fn missing_label_and_mapping_are_derived_from_name() {
        let response = r#"[{"fieldName": "numero_cliente"}]"#;
        let fields = parse_classification_response(response).unwrap();
        assert_eq!(fields[0].label, "Numero Cliente");
        assert_eq!(fields[0].mapping_suggestion, "numero_cliente");
    }

    #[test]
    fn strip_fences_handles_uppercase_info_string() {
        assert_eq!(strip_fences("```JSON\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("[1]"), "[1]");
    }

    #[test]
    fn extract_json_array_nested() {
        let text = "x [1, [2, 3], 4] y [5]";
        assert_eq!(extract_json_array(text), Some("[1, [2, 3], 4]"));
    }
}
