//! Small payloads and engine outputs shared by tests.

use bytes::Bytes;
use carta_core::{ExtractionInput, Fields, InferenceOutput, RecognizedText, TextLine};
use serde_json::Value;

/// PNG signature followed by the start of an IHDR chunk.
pub const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

/// JPEG SOI marker followed by a JFIF APP0 segment start.
pub const JPEG_HEADER: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0\x01";

/// Returns a payload that passes image type sniffing.
pub fn png_bytes() -> Bytes {
    Bytes::from_static(PNG_HEADER)
}

/// Returns a valid 2018 recto submission.
pub fn front_input() -> ExtractionInput {
    ExtractionInput::new(png_bytes(), "2018", "recto")
}

/// Recognition output of a clear 2018 front side.
pub fn clear_front_text() -> RecognizedText {
    [
        ("REPUBLIQUE DU CAMEROUN", 0.98),
        ("REPUBLIC OF CAMEROON", 0.97),
        ("CARTE NATIONALE D'IDENTITE", 0.95),
        ("NOM/SURNAME", 0.93),
        ("NGONO", 0.91),
        ("PRENOMS/GIVEN NAMES", 0.89),
        ("MARIE CLAIRE", 0.88),
        ("DATE DE NAISSANCE", 0.86),
        ("12.04.1990", 0.84),
        ("LIEU DE NAISSANCE", 0.8),
        ("YAOUNDE", 0.79),
        ("SEXE F", 0.75),
        ("TAILLE 1,65", 0.7),
        ("PROFESSION ENSEIGNANTE", 0.66),
    ]
    .into_iter()
    .map(|(text, score)| TextLine::new(text, score))
    .collect()
}

/// Recognition output of a blurred photo.
pub fn blurry_text() -> RecognizedText {
    [("REPUB", 0.41), ("CAM", 0.35), ("N0M", 0.22)]
        .into_iter()
        .map(|(text, score)| TextLine::new(text, score))
        .collect()
}

/// Post-processor answer matching [`clear_front_text`].
pub const FRONT_COMPLETION: &str = r#"Voici les informations extraites :
{"nom": "NGONO", "prenom": "MARIE CLAIRE", "date_naissance": "12.04.1990",
 "lieu_naissance": "YAOUNDE", "sexe": "F", "taille": "1,65",
 "profession": "ENSEIGNANTE"}"#;

/// A successful worker output.
pub fn sample_output() -> InferenceOutput {
    let mut fields = Fields::new();
    fields.insert("nom".to_owned(), Value::from("NGONO"));
    fields.insert("prenom".to_owned(), Value::from("MARIE CLAIRE"));
    InferenceOutput::new("NOM/SURNAME NGONO PRENOMS/GIVEN NAMES MARIE CLAIRE", fields)
}
