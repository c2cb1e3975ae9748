use super::FieldInfo;

/// Maximum characters of context carried per field in a prompt.
const MAX_CONTEXT_CHARS: usize = 100;

/// Fixed instruction set describing the expected output vocabulary.
const INSTRUCTION: &str = "\
You classify form fields extracted from an Italian energy contract PDF.
For EVERY field listed below return one JSON object with the keys:
fieldName, label, dataType, category, description, required, mappingSuggestion.

- fieldName: copy the field name exactly as given.
- label: short human-readable Italian label for the field.
- dataType: one of text, email, date, tel, number, fiscalcode, pod, pdr, iban.
- category: one of anagrafica, indirizzo_residenza, indirizzo_fornitura, dati_luce, dati_gas, contratto, pagamento, date, altro.
- description: one sentence describing what the field holds.
- required: true when the field is normally mandatory on a contract.
- mappingSuggestion: snake_case business-data key the field maps to (e.g. cognome, codice_fiscale, pod).

Respond with a single JSON array containing one object per field, in the
same order, and nothing else.";

/// Build the prompt for one batch of fields.
///
/// Each field contributes a single compact line: its name, inferred PDF
/// field type, and a truncated context string.
pub fn build_batch_prompt(batch: &[FieldInfo]) -> String {
    let mut parts = Vec::with_capacity(batch.len() + 2);
    parts.push(INSTRUCTION.to_string());
    parts.push("Fields:".to_string());

    for (i, field) in batch.iter().enumerate() {
        parts.push(format!(
            "{}. name=\"{}\" type={} context=\"{}\"",
            i + 1,
            field.name,
            field.field_type,
            truncate_context(&field.context),
        ));
    }

    parts.join("\n")
}

/// Collapse whitespace and bound the context to [`MAX_CONTEXT_CHARS`].
fn truncate_context(context: &str) -> String {
    let collapsed = context.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_CONTEXT_CHARS {
        collapsed
    } else {
        collapsed.chars().take(MAX_CONTEXT_CHARS).collect()
    }
}
