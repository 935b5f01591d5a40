//! Language-model output parsing.

use serde_json::{Deserializer, Map, Value};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Removes every `<think>…</think>` block from a completion.
///
/// An unterminated block swallows the rest of the text.
pub fn strip_thinking(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(THINK_OPEN) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(end) => rest = &after_open[end + THINK_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }

    output.push_str(rest);
    output.trim().to_owned()
}

/// Returns the first JSON object embedded in free text.
///
/// Every `{` is tried as a start position and the first one that begins a
/// complete, well-formed object wins. Trailing prose after the object is
/// ignored.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let mut stream = Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(object))) => Some(object),
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_reasoning_blocks() {
        let text = "<think>the name is on line 3</think>\n{\"nom\": \"NGONO\"}";
        assert_eq!(strip_thinking(text), "{\"nom\": \"NGONO\"}");
    }

    #[test]
    fn unterminated_block_is_dropped() {
        assert_eq!(strip_thinking("answer <think>still going"), "answer");
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Voici le résultat : {\"nom\": \"NGONO\", \"sexe\": \"F\"} Merci.";
        let object = extract_json_object(text).unwrap();

        assert_eq!(object["nom"], json!("NGONO"));
        assert_eq!(object["sexe"], json!("F"));
    }

    #[test]
    fn handles_nested_objects() {
        let text = "{\"nom\": \"A\", \"extra\": {\"k\": 1}}";
        let object = extract_json_object(text).unwrap();
        assert_eq!(object["extra"]["k"], json!(1));
    }

    #[test]
    fn skips_broken_candidates() {
        let text = "{not json} then {\"prenom\": \"MARIE\"}";
        let object = extract_json_object(text).unwrap();
        assert_eq!(object["prenom"], json!("MARIE"));
    }

    #[test]
    fn returns_none_without_object() {
        assert!(extract_json_object("no structured answer").is_none());
        assert!(extract_json_object("{\"nom\": ").is_none());
    }
}
