//! Deterministic fallback classification.
//!
//! The heuristic tier is total: it always produces a syntactically valid
//! [`AnalyzedField`] for every input, which is the pipeline's correctness
//! backstop when the AI tier is unavailable or returns garbage.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{AnalyzedField, Category, DataType};
use super::FieldInfo;

/// One vocabulary row: any of `keys` appearing as a substring of the
/// lowercased field name selects this classification.
struct VocabEntry {
    keys: &'static [&'static str],
    label: &'static str,
    category: Category,
    data_type: DataType,
    required: bool,
    mapping: &'static str,
}

/// Ordered vocabulary. More specific spellings come first: `cognome`
/// before `nome`, `luogo_nascita` before `nascita`, the fornitura
/// entries before the plain address ones.
const VOCABULARY: &[VocabEntry] = &[
    VocabEntry {
        keys: &["cognome"],
        label: "Cognome",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: true,
        mapping: "cognome",
    },
    VocabEntry {
        keys: &["ragione_sociale", "ragionesociale"],
        label: "Ragione sociale",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: false,
        mapping: "ragione_sociale",
    },
    VocabEntry {
        keys: &["codice_fiscale", "codicefiscale", "cod_fiscale", "fiscale"],
        label: "Codice fiscale",
        category: Category::Anagrafica,
        data_type: DataType::FiscalCode,
        required: true,
        mapping: "codice_fiscale",
    },
    VocabEntry {
        keys: &["partita_iva", "partitaiva", "p_iva", "piva"],
        label: "Partita IVA",
        category: Category::Anagrafica,
        data_type: DataType::Number,
        required: false,
        mapping: "partita_iva",
    },
    VocabEntry {
        keys: &["luogo_nascita", "luogonascita", "luogo_di_nascita"],
        label: "Luogo di nascita",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: false,
        mapping: "luogo_nascita",
    },
    VocabEntry {
        keys: &["nascita"],
        label: "Data di nascita",
        category: Category::Anagrafica,
        data_type: DataType::Date,
        required: true,
        mapping: "data_nascita",
    },
    VocabEntry {
        keys: &["email", "e_mail", "mail"],
        label: "Email",
        category: Category::Anagrafica,
        data_type: DataType::Email,
        required: true,
        mapping: "email",
    },
    VocabEntry {
        keys: &["cellulare"],
        label: "Cellulare",
        category: Category::Anagrafica,
        data_type: DataType::Tel,
        required: false,
        mapping: "cellulare",
    },
    VocabEntry {
        keys: &["telefono", "tel"],
        label: "Telefono",
        category: Category::Anagrafica,
        data_type: DataType::Tel,
        required: false,
        mapping: "telefono",
    },
    VocabEntry {
        keys: &["sesso"],
        label: "Sesso",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: false,
        mapping: "sesso",
    },
    VocabEntry {
        keys: &["documento"],
        label: "Numero documento",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: false,
        mapping: "numero_documento",
    },
    VocabEntry {
        keys: &["nome"],
        label: "Nome",
        category: Category::Anagrafica,
        data_type: DataType::Text,
        required: true,
        mapping: "nome",
    },
    VocabEntry {
        keys: &["pod"],
        label: "POD",
        category: Category::DatiLuce,
        data_type: DataType::Pod,
        required: true,
        mapping: "pod",
    },
    VocabEntry {
        keys: &["pdr"],
        label: "PDR",
        category: Category::DatiGas,
        data_type: DataType::Pdr,
        required: true,
        mapping: "pdr",
    },
    VocabEntry {
        keys: &["potenza"],
        label: "Potenza impegnata",
        category: Category::DatiLuce,
        data_type: DataType::Number,
        required: false,
        mapping: "potenza",
    },
    VocabEntry {
        keys: &["consumo_gas", "consumogas"],
        label: "Consumo annuo gas",
        category: Category::DatiGas,
        data_type: DataType::Number,
        required: false,
        mapping: "consumo_gas",
    },
    VocabEntry {
        keys: &["consumo"],
        label: "Consumo annuo",
        category: Category::DatiLuce,
        data_type: DataType::Number,
        required: false,
        mapping: "consumo",
    },
    VocabEntry {
        keys: &["matricola"],
        label: "Matricola contatore",
        category: Category::DatiGas,
        data_type: DataType::Text,
        required: false,
        mapping: "matricola",
    },
    VocabEntry {
        keys: &["iban"],
        label: "IBAN",
        category: Category::Pagamento,
        data_type: DataType::Iban,
        required: true,
        mapping: "iban",
    },
    VocabEntry {
        keys: &["pagamento"],
        label: "Modalit\u{00E0} di pagamento",
        category: Category::Pagamento,
        data_type: DataType::Text,
        required: false,
        mapping: "modalita_pagamento",
    },
    VocabEntry {
        keys: &["indirizzo_fornitura", "fornitura"],
        label: "Indirizzo di fornitura",
        category: Category::IndirizzoFornitura,
        data_type: DataType::Text,
        required: false,
        mapping: "indirizzo_fornitura",
    },
    VocabEntry {
        keys: &["residenza"],
        label: "Indirizzo di residenza",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Text,
        required: true,
        mapping: "indirizzo_residenza",
    },
    VocabEntry {
        keys: &["indirizzo"],
        label: "Indirizzo",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Text,
        required: true,
        mapping: "indirizzo",
    },
    VocabEntry {
        keys: &["civico"],
        label: "N. civico",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Text,
        required: false,
        mapping: "civico",
    },
    VocabEntry {
        keys: &["cap"],
        label: "CAP",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Number,
        required: false,
        mapping: "cap",
    },
    VocabEntry {
        keys: &["comune", "citta", "citt\u{00E0}", "localita", "localit\u{00E0}"],
        label: "Comune",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Text,
        required: false,
        mapping: "comune",
    },
    VocabEntry {
        keys: &["provincia", "prov"],
        label: "Provincia",
        category: Category::IndirizzoResidenza,
        data_type: DataType::Text,
        required: false,
        mapping: "provincia",
    },
    VocabEntry {
        keys: &["fornitore"],
        label: "Fornitore",
        category: Category::Contratto,
        data_type: DataType::Text,
        required: false,
        mapping: "fornitore",
    },
    VocabEntry {
        keys: &["offerta"],
        label: "Offerta",
        category: Category::Contratto,
        data_type: DataType::Text,
        required: false,
        mapping: "offerta",
    },
    VocabEntry {
        keys: &["contratto"],
        label: "Numero contratto",
        category: Category::Contratto,
        data_type: DataType::Text,
        required: false,
        mapping: "numero_contratto",
    },
    VocabEntry {
        keys: &["firma"],
        label: "Firma",
        category: Category::Contratto,
        data_type: DataType::Text,
        required: false,
        mapping: "firma",
    },
    VocabEntry {
        keys: &["scadenza"],
        label: "Data di scadenza",
        category: Category::Date,
        data_type: DataType::Date,
        required: false,
        mapping: "data_scadenza",
    },
    VocabEntry {
        keys: &["data", "date"],
        label: "Data",
        category: Category::Date,
        data_type: DataType::Date,
        required: false,
        mapping: "data",
    },
];

/// Widgets narrower than this are "small" for the short-name rule.
const NARROW_FIELD_WIDTH: f32 = 50.0;

/// Generic machine-assigned names that say nothing about the field.
fn generic_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(data_\d+|undefined_\d+|group\s*\d+)$").unwrap())
}

/// Classify a single field without any AI involvement.
///
/// Total over every input: the worst case is the `altro`/`text` backstop
/// with the raw name as label.
pub fn classify_field(info: &FieldInfo) -> AnalyzedField {
    let name = info.name.trim();
    let lower = name.to_lowercase();

    // (a) vocabulary substring match.
    for entry in VOCABULARY {
        if entry.keys.iter().any(|k| lower.contains(k)) {
            return AnalyzedField {
                field_name: info.name.clone(),
                field_type: info.field_type.clone(),
                label: entry.label.to_string(),
                data_type: entry.data_type,
                category: entry.category,
                description: String::new(),
                required: entry.required,
                mapping_suggestion: entry.mapping.to_string(),
            };
        }
    }

    // (b) short-name/size rule: the classic one-letter street-number box
    // ("N" next to the address line on a narrow widget).
    if lower.len() <= 2
        && lower.starts_with('n')
        && info.width > 0.0
        && info.width < NARROW_FIELD_WIDTH
    {
        return AnalyzedField {
            field_name: info.name.clone(),
            field_type: info.field_type.clone(),
            label: "N. civico".to_string(),
            data_type: DataType::Text,
            category: Category::IndirizzoResidenza,
            description: String::new(),
            required: false,
            mapping_suggestion: "civico".to_string(),
        };
    }

    let generic = generic_name_re().is_match(&lower);

    // (c) a descriptive name is its own label.
    if !generic && name.len() > 5 {
        return AnalyzedField {
            field_name: info.name.clone(),
            field_type: info.field_type.clone(),
            label: title_case(name),
            data_type: infer_data_type(&lower),
            category: Category::Altro,
            description: String::new(),
            required: false,
            mapping_suggestion: sanitize_mapping(name),
        };
    }

    // Generic names can still borrow their label from the page text
    // found next to the widget.
    let label = if generic && !info.context.trim().is_empty() {
        context_label(&info.context)
    } else {
        title_case(name)
    };

    // (d) backstop.
    AnalyzedField {
        field_name: info.name.clone(),
        field_type: info.field_type.clone(),
        label,
        data_type: DataType::Text,
        category: Category::Altro,
        description: String::new(),
        required: false,
        mapping_suggestion: sanitize_mapping(name),
    }
}

/// Classify every field of a batch heuristically, preserving order.
pub fn classify_batch(batch: &[FieldInfo]) -> Vec<AnalyzedField> {
    batch.iter().map(classify_field).collect()
}

/// `numero_cliente` -> `Numero Cliente`.
pub fn title_case(name: &str) -> String {
    name.split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased, alphanumeric-and-underscore mapping key derived from a
/// field name.
pub fn sanitize_mapping(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = true;
    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// Turn a directional context snippet into a usable label: whitespace
/// collapsed, trailing colon dropped, bounded length.
fn context_label(context: &str) -> String {
    let collapsed = context.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(':').trim().to_string();
    if trimmed.chars().count() > 60 {
        trimmed.chars().take(60).collect()
    } else {
        trimmed
    }
}

fn infer_data_type(lower: &str) -> DataType {
    if lower.contains("importo") || lower.contains("numero") || lower.contains("num_") {
        DataType::Number
    } else {
        DataType::Text
    }
}
