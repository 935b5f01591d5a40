//! Field schemas per card version and side.
//!
//! The schema decides which keys the post-processor is asked to fill, and
//! which keys survive in the final result.

use std::fmt::Write as _;

use serde_json::Value;

use crate::TRACING_TARGET_POSTPROCESS;
use crate::request::{DocumentSide, DocumentVersion};
use crate::result::Fields;

const V2018_RECTO: &[&str] = &[
    "nom",
    "prenom",
    "date_naissance",
    "lieu_naissance",
    "sexe",
    "taille",
    "profession",
];

const V2018_VERSO: &[&str] = &[
    "pere",
    "mere",
    "date_delivrance",
    "date_expiration",
    "adresse",
    "poste_identification",
    "identifiant_unique",
    "autorite",
    "numero_cni",
];

const V2025_VERSO: &[&str] = &[
    "numero_carte",
    "nom",
    "prenom",
    "date_naissance",
    "date_expiration",
    "sexe",
];

/// Ordered list of fields expected for one card face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    version: DocumentVersion,
    side: DocumentSide,
    fields: &'static [&'static str],
}

impl FieldSchema {
    /// Returns the schema for a card version and side.
    pub fn for_document(version: DocumentVersion, side: DocumentSide) -> Self {
        let fields = match (version, side) {
            // The 2025 front keeps the holder block of the 2018 front.
            (_, DocumentSide::Recto) => V2018_RECTO,
            (DocumentVersion::V2018, DocumentSide::Verso) => V2018_VERSO,
            (DocumentVersion::V2025, DocumentSide::Verso) => V2025_VERSO,
        };

        Self {
            version,
            side,
            fields,
        }
    }

    /// Field names in prompt order.
    #[inline]
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Builds the post-processor prompt for the recognized text.
    pub fn prompt(&self, ocr_text: &str) -> String {
        let mut prompt = String::with_capacity(ocr_text.len() + 512);

        let _ = writeln!(prompt, "Texte OCR :");
        let _ = writeln!(prompt, "{}", ocr_text.trim());
        let _ = writeln!(prompt);
        let _ = writeln!(
            prompt,
            "Extrais les informations de la carte nationale d'identité camerounaise \
             (version {}, {}) à partir du texte OCR ci-dessus.",
            self.version, self.side,
        );
        let _ = writeln!(
            prompt,
            "Réponds uniquement avec un objet JSON contenant exactement les clés \
             suivantes. Utilise null pour toute valeur absente du texte."
        );
        let _ = write!(prompt, "{}", self.skeleton());

        prompt
    }

    /// JSON object with every field set to null.
    pub fn skeleton(&self) -> String {
        let skeleton: Fields = self
            .fields
            .iter()
            .map(|name| ((*name).to_owned(), Value::Null))
            .collect();

        Value::Object(skeleton).to_string()
    }

    /// Keeps only schema fields, with missing ones set to null.
    pub fn project(&self, mut parsed: Fields) -> Fields {
        let dropped = parsed
            .keys()
            .filter(|key| !self.fields.contains(&key.as_str()))
            .count();

        if dropped > 0 {
            tracing::debug!(
                target: TRACING_TARGET_POSTPROCESS,
                version = %self.version,
                side = %self.side,
                dropped,
                "dropping fields outside the schema"
            );
        }

        self.fields
            .iter()
            .map(|name| {
                let value = parsed.remove(*name).unwrap_or(Value::Null);
                ((*name).to_owned(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn front_and_back_differ() {
        let recto = FieldSchema::for_document(DocumentVersion::V2018, DocumentSide::Recto);
        let verso = FieldSchema::for_document(DocumentVersion::V2018, DocumentSide::Verso);

        assert!(recto.fields().contains(&"profession"));
        assert!(verso.fields().contains(&"numero_cni"));
        assert!(!verso.fields().contains(&"profession"));
    }

    #[test]
    fn new_back_carries_card_number() {
        let schema = FieldSchema::for_document(DocumentVersion::V2025, DocumentSide::Verso);
        assert_eq!(schema.fields()[0], "numero_carte");
        assert_eq!(schema.fields().len(), 6);
    }

    #[test]
    fn prompt_contains_text_and_skeleton() {
        let schema = FieldSchema::for_document(DocumentVersion::V2018, DocumentSide::Recto);
        let prompt = schema.prompt("NOM/SURNAME NGONO");

        assert!(prompt.contains("NOM/SURNAME NGONO"));
        assert!(prompt.contains("version 2018, recto"));
        assert!(prompt.contains("\"profession\":null"));
    }

    #[test]
    fn projection_fills_missing_and_drops_unknown() {
        let schema = FieldSchema::for_document(DocumentVersion::V2025, DocumentSide::Verso);

        let mut parsed = Fields::new();
        parsed.insert("nom".to_owned(), json!("NGONO"));
        parsed.insert("signature".to_owned(), json!("scribble"));

        let projected = schema.project(parsed);
        assert_eq!(projected.len(), 6);
        assert_eq!(projected["nom"], json!("NGONO"));
        assert_eq!(projected["sexe"], Value::Null);
        assert!(!projected.contains_key("signature"));
    }
}
