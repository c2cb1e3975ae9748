//! Two-tier field classification: a batched AI pass with a deterministic
//! heuristic fallback.
//!
//! The pure parts live here and in the submodules; the HTTP call itself
//! belongs to the imperative shell. The fallback contract is visible in
//! the types: the shell produces a `Result<Vec<AnalyzedField>, E>` per
//! batch and [`with_fallback`] turns any outcome into a complete, ordered
//! classification of the batch.

pub mod heuristics;
pub mod parse;
pub mod prompt;
pub mod types;

pub use parse::{parse_classification_response, ParseError};
pub use prompt::build_batch_prompt;
pub use types::{AnalyzedField, Category, DataType};

use std::collections::HashMap;

/// Fields per AI batch, bounding prompt size and single-call latency.
pub const BATCH_SIZE: usize = 15;

/// Classifier-facing description of one form field.
///
/// Decoupled from the PDF crate so the classification core stays pure;
/// the shell maps each extracted field context into one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    /// Wire spelling of the PDF field kind ("text", "checkbox", ...).
    pub field_type: String,
    /// Width of the primary widget, for the short-name/size heuristic.
    pub width: f32,
    pub max_length: Option<i64>,
    /// Compact context string from the spatial resolver.
    pub context: String,
}

/// Partition fields into classification batches, preserving order.
pub fn partition(fields: &[FieldInfo]) -> Vec<&[FieldInfo]> {
    fields.chunks(BATCH_SIZE).collect()
}

/// Resolve a batch outcome into a complete classification.
///
/// - `Err(_)`: the whole batch is reprocessed by the heuristic tier.
/// - `Ok(parsed)`: parsed records are matched back to the batch by field
///   name; a missing `fieldType` is enriched from the source field, any
///   field the model omitted is classified heuristically, and records
///   for names not in the batch are dropped.
///
/// The output always contains exactly one record per batch field, in
/// batch order -- no field is ever silently lost.
pub fn with_fallback<E>(
    outcome: Result<Vec<AnalyzedField>, E>,
    batch: &[FieldInfo],
) -> Vec<AnalyzedField> {
    let parsed = match outcome {
        Ok(parsed) => parsed,
        Err(_) => return heuristics::classify_batch(batch),
    };

    let mut by_name: HashMap<String, AnalyzedField> = HashMap::new();
    for record in parsed {
        by_name.entry(record.field_name.clone()).or_insert(record);
    }

    batch
        .iter()
        .map(|info| match by_name.remove(&info.name) {
            Some(mut record) => {
                if record.field_type.trim().is_empty() {
                    record.field_type = info.field_type.clone();
                }
                record
            }
            None => heuristics::classify_field(info),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> FieldInfo {
        FieldInfo {
            name: name.to_string(),
            field_type: "text".to_string(),
            width: 100.0,
            max_length: None,
            context: String::new(),
        }
    }

    fn analyzed(name: &str) -> AnalyzedField {
        AnalyzedField {
            field_name: name.to_string(),
            field_type: "text".to_string(),
            label: name.to_string(),
            data_type: DataType::Text,
            category: Category::Altro,
            description: String::new(),
            required: false,
            mapping_suggestion: name.to_string(),
        }
    }

    #[test]
    fn partition_respects_batch_size() {
        let fields: Vec<FieldInfo> = (0..32).map(|i| info(&format!("f{}", i))).collect();
        let batches = partition(&fields);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 15);
        assert_eq!(batches[1].len(), 15);
        assert_eq!(batches[2].len(), 2);
    }

    #[test]
    fn partition_preserves_order() {
        let fields: Vec<FieldInfo> = (0..20).map(|i| info(&format!("f{}", i))).collect();
        let batches = partition(&fields);
        assert_eq!(batches[1][0].name, "f15");
    }

    #[test]
    fn err_outcome_falls_back_to_heuristics_for_whole_batch() {
        let batch = vec![info("cognome"), info("pod")];
        let result = with_fallback::<()>(Err(()), &batch);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].label, "Cognome");
        assert_eq!(result[1].data_type, DataType::Pod);
    }

    #[test]
    fn ok_outcome_is_reordered_to_batch_order() {
        let batch = vec![info("a_field"), info("b_field")];
        let result = with_fallback::<()>(Ok(vec![analyzed("b_field"), analyzed("a_field")]), &batch);

        assert_eq!(result[0].field_name, "a_field");
        assert_eq!(result[1].field_name, "b_field");
    }

    #[test]
    fn omitted_fields_are_repaired_heuristically() {
        let batch = vec![info("cognome"), info("misterioso")];
        let result = with_fallback::<()>(Ok(vec![analyzed("misterioso")]), &batch);

        assert_eq!(result.len(), 2);
        // The omitted field got the full heuristic treatment.
        assert_eq!(result[0].label, "Cognome");
        assert!(result[0].required);
    }

    #[test]
    fn hallucinated_fields_are_dropped() {
        let batch = vec![info("reale")];
        let result =
            with_fallback::<()>(Ok(vec![analyzed("reale"), analyzed("inventato")]), &batch);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].field_name, "reale");
    }

    #[test]
    fn missing_field_type_is_enriched_from_batch() {
        let batch = vec![FieldInfo {
            field_type: "checkbox".to_string(),
            ..info("privacy")
        }];
        let mut record = analyzed("privacy");
        record.field_type = String::new();

        let result = with_fallback::<()>(Ok(vec![record]), &batch);
        assert_eq!(result[0].field_type, "checkbox");
    }

    #[test]
    fn a_failed_batch_does_not_affect_the_others() {
        let fields: Vec<FieldInfo> = (0..30).map(|i| info(&format!("campo_{}", i))).collect();
        let batches = partition(&fields);

        // Batch 0 gets a valid AI reply, batch 1 fails outright.
        let ok: Vec<AnalyzedField> = batches[0].iter().map(|f| analyzed(&f.name)).collect();
        let first = with_fallback::<()>(Ok(ok.clone()), batches[0]);
        let second = with_fallback::<()>(Err(()), batches[1]);

        assert_eq!(first.len(), batches[0].len());
        assert_eq!(second.len(), batches[1].len());
        // The surviving batch keeps its AI labels untouched.
        assert_eq!(first[0].label, ok[0].label);
        // The failed batch is fully present, classified heuristically.
        assert!(second.iter().all(|f| f.field_name.starts_with("campo_")));
    }

    #[test]
    fn completeness_for_any_outcome() {
        let batch: Vec<FieldInfo> = (0..17).map(|i| info(&format!("campo_{}", i))).collect();

        let ok: Vec<AnalyzedField> = batch.iter().take(5).map(|f| analyzed(&f.name)).collect();
        assert_eq!(with_fallback::<()>(Ok(ok), &batch).len(), batch.len());
        assert_eq!(with_fallback::<()>(Err(()), &batch).len(), batch.len());
    }
}
