//! Reusable field templates and compile-time value resolution.
//!
//! A template describes one provider PDF's fields, their semantic labels,
//! and mapping suggestions. It has no relationship to any specific
//! contract instance: created on successful extraction+classification,
//! read repeatedly for compilation, deleted explicitly by an operator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::AnalyzedField;

/// A persisted, reusable description of a provider PDF's form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Store-assigned identity; `None` until persisted.
    pub id: Option<i64>,
    pub nome: String,
    pub fornitore: Option<String>,
    pub categoria: Option<String>,
    pub tipo_cliente: Option<String>,
    /// Every `FormField.name` of the source PDF appears exactly once here,
    /// even when classification degraded to the lowest heuristic tier.
    pub campi: BTreeMap<String, AnalyzedField>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn new(
        nome: String,
        fornitore: Option<String>,
        categoria: Option<String>,
        tipo_cliente: Option<String>,
        campi: BTreeMap<String, AnalyzedField>,
    ) -> Self {
        Template {
            id: None,
            nome,
            fornitore,
            categoria,
            tipo_cliente,
            campi,
            created_at: Utc::now(),
        }
    }
}

/// Wire/persistence shape of the `campi_estratti` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampiEstratti {
    pub campi: BTreeMap<String, AnalyzedField>,
}

/// A value resolved against a template field, ready for the PDF compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub field_name: String,
    pub value: String,
}

/// Resolve an externally supplied value map against a template.
///
/// Each field's `mapping_suggestion` is looked up first, then the raw
/// field name. Fields with no matching value are returned in the second
/// list and stay blank -- a missing value never fails the compile.
pub fn resolve_assignments(
    template: &Template,
    values: &serde_json::Map<String, serde_json::Value>,
) -> (Vec<ResolvedValue>, Vec<String>) {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();

    for (field_name, analyzed) in &template.campi {
        let value = values
            .get(&analyzed.mapping_suggestion)
            .or_else(|| values.get(field_name))
            .and_then(coerce_scalar);

        match value {
            Some(value) => resolved.push(ResolvedValue {
                field_name: field_name.clone(),
                value,
            }),
            None => unresolved.push(field_name.clone()),
        }
    }

    (resolved, unresolved)
}

/// String coercion of a supplied JSON scalar. Nulls and structured
/// values resolve to nothing.
fn coerce_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Category, DataType};

    fn analyzed(name: &str, mapping: &str) -> AnalyzedField {
        AnalyzedField {
            field_name: name.to_string(),
            field_type: "text".to_string(),
            label: name.to_string(),
            data_type: DataType::Text,
            category: Category::Altro,
            description: String::new(),
            required: false,
            mapping_suggestion: mapping.to_string(),
        }
    }

    fn template(fields: &[(&str, &str)]) -> Template {
        let campi = fields
            .iter()
            .map(|(name, mapping)| (name.to_string(), analyzed(name, mapping)))
            .collect();
        Template::new("test".into(), None, None, None, campi)
    }

    fn values(json: &str) -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_via_mapping_suggestion() {
        let t = template(&[("campo_1", "cognome")]);
        let (resolved, unresolved) = resolve_assignments(&t, &values(r#"{"cognome": "Rossi"}"#));

        assert_eq!(
            resolved,
            vec![ResolvedValue {
                field_name: "campo_1".into(),
                value: "Rossi".into()
            }]
        );
        assert!(unresolved.is_empty());
    }

    #[test]
    fn falls_back_to_raw_field_name() {
        let t = template(&[("campo_1", "cognome")]);
        let (resolved, _) = resolve_assignments(&t, &values(r#"{"campo_1": "Bianchi"}"#));
        assert_eq!(resolved[0].value, "Bianchi");
    }

    #[test]
    fn missing_values_stay_unresolved() {
        let t = template(&[("a", "alpha"), ("b", "beta")]);
        let (resolved, unresolved) = resolve_assignments(&t, &values(r#"{"alpha": "1"}"#));

        assert_eq!(resolved.len(), 1);
        assert_eq!(unresolved, vec!["b"]);
    }

    #[test]
    fn scalars_are_coerced_to_strings() {
        let t = template(&[("num", "numero"), ("flag", "privacy")]);
        let (resolved, _) =
            resolve_assignments(&t, &values(r#"{"numero": 42, "privacy": true}"#));

        let by_name: std::collections::HashMap<_, _> = resolved
            .into_iter()
            .map(|r| (r.field_name, r.value))
            .collect();
        assert_eq!(by_name["num"], "42");
        assert_eq!(by_name["flag"], "true");
    }

    #[test]
    fn null_and_structured_values_resolve_to_nothing() {
        let t = template(&[("a", "alpha"), ("b", "beta")]);
        let (resolved, unresolved) =
            resolve_assignments(&t, &values(r#"{"alpha": null, "beta": [1, 2]}"#));

        assert!(resolved.is_empty());
        assert_eq!(unresolved.len(), 2);
    }

    #[test]
    fn campi_estratti_round_trips() {
        let t = template(&[("cognome", "cognome")]);
        let wrapper = CampiEstratti {
            campi: t.campi.clone(),
        };
        let json = serde_json::to_string(&wrapper).unwrap();
        assert!(json.starts_with("{\"campi\":{"));

        let back: CampiEstratti = serde_json::from_str(&json).unwrap();
        assert_eq!(back.campi.len(), 1);
        assert!(back.campi.contains_key("cognome"));
    }
}
