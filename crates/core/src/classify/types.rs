use serde::{Deserialize, Serialize};

/// Data type of a classified field value.
///
/// Closed vocabulary; anything a classifier produces outside of it is
/// normalized to [`DataType::Text`] at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Email,
    Date,
    Tel,
    Number,
    FiscalCode,
    Pod,
    Pdr,
    Iban,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Email => "email",
            DataType::Date => "date",
            DataType::Tel => "tel",
            DataType::Number => "number",
            DataType::FiscalCode => "fiscalcode",
            DataType::Pod => "pod",
            DataType::Pdr => "pdr",
            DataType::Iban => "iban",
        }
    }

    /// Lenient parsing of a wire spelling; unknown strings become `Text`.
    pub fn normalize(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "email" => DataType::Email,
            "date" => DataType::Date,
            "tel" | "phone" => DataType::Tel,
            "number" => DataType::Number,
            "fiscalcode" | "fiscal_code" => DataType::FiscalCode,
            "pod" => DataType::Pod,
            "pdr" => DataType::Pdr,
            "iban" => DataType::Iban,
            _ => DataType::Text,
        }
    }
}

/// Semantic category of a classified field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Anagrafica,
    IndirizzoResidenza,
    IndirizzoFornitura,
    DatiLuce,
    DatiGas,
    Contratto,
    Pagamento,
    Date,
    Altro,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Anagrafica => "anagrafica",
            Category::IndirizzoResidenza => "indirizzo_residenza",
            Category::IndirizzoFornitura => "indirizzo_fornitura",
            Category::DatiLuce => "dati_luce",
            Category::DatiGas => "dati_gas",
            Category::Contratto => "contratto",
            Category::Pagamento => "pagamento",
            Category::Date => "date",
            Category::Altro => "altro",
        }
    }

    /// Lenient parsing of a wire spelling; unknown strings become `Altro`.
    pub fn normalize(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "anagrafica" => Category::Anagrafica,
            "indirizzo_residenza" => Category::IndirizzoResidenza,
            "indirizzo_fornitura" => Category::IndirizzoFornitura,
            "dati_luce" => Category::DatiLuce,
            "dati_gas" => Category::DatiGas,
            "contratto" => Category::Contratto,
            "pagamento" => Category::Pagamento,
            "date" => Category::Date,
            _ => Category::Altro,
        }
    }
}

/// The durable semantic annotation for one form field.
///
/// `field_name` ties the record back 1:1 to the source `FormField`;
/// `mapping_suggestion` is the business-data key the field pulls its
/// value from at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedField {
    pub field_name: String,
    pub field_type: String,
    pub label: String,
    pub data_type: DataType,
    pub category: Category,
    pub description: String,
    pub required: bool,
    pub mapping_suggestion: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_wire_spellings() {
        assert_eq!(
            serde_json::to_string(&DataType::FiscalCode).unwrap(),
            "\"fiscalcode\""
        );
        assert_eq!(serde_json::to_string(&DataType::Pod).unwrap(), "\"pod\"");
    }

    #[test]
    fn category_wire_spellings() {
        assert_eq!(
            serde_json::to_string(&Category::IndirizzoResidenza).unwrap(),
            "\"indirizzo_residenza\""
        );
        assert_eq!(
            serde_json::to_string(&Category::DatiLuce).unwrap(),
            "\"dati_luce\""
        );
    }

    #[test]
    fn normalize_unknown_data_type_to_text() {
        assert_eq!(DataType::normalize("interi"), DataType::Text);
        assert_eq!(DataType::normalize(""), DataType::Text);
        assert_eq!(DataType::normalize("IBAN"), DataType::Iban);
    }

    #[test]
    fn normalize_unknown_category_to_altro() {
        assert_eq!(Category::normalize("boh"), Category::Altro);
        assert_eq!(Category::normalize("Anagrafica"), Category::Anagrafica);
        assert_eq!(
            Category::normalize(" dati_gas "),
            Category::DatiGas
        );
    }

    #[test]
    fn analyzed_field_serializes_camel_case() {
        let af = AnalyzedField {
            field_name: "cognome".into(),
            field_type: "text".into(),
            label: "Cognome".into(),
            data_type: DataType::Text,
            category: Category::Anagrafica,
            description: String::new(),
            required: true,
            mapping_suggestion: "cognome".into(),
        };
        let json = serde_json::to_string(&af).unwrap();
        assert!(json.contains("\"fieldName\":\"cognome\""));
        assert!(json.contains("\"mappingSuggestion\":\"cognome\""));
        assert!(json.contains("\"dataType\":\"text\""));
    }
}
